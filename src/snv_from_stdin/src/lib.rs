//! Two-stage low-frequency SNV calling over a samtools mpileup stream.
//!
//! The pipeline first (optionally) drains the head of the stream into a
//! training sample and estimates a base-substitution [`errmod::ErrorModel`]
//! by expectation-maximization, buffering every parsed column. It then
//! replays the buffer chained with the rest of the stream through the
//! per-column callers, annotates surviving calls with strand-bias
//! statistics, and emits them in input order.

pub mod caller;
pub mod errmod;
pub mod output;
pub mod pileup;
pub mod sensitivity;
pub mod stats;

mod error;
pub use error::RunError;

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ahash::AHashSet;
use anyhow::{Context, Result};
use log::{debug, info, warn};

use lowvar_io::read::{open_pileup_source, read_exclude_positions};
use lowvar_io::write::{can_write_file, GenericWriter};
use parser::Call;

use caller::{
    AnnotatedCall, CallKind, Dp4, EmBasedCaller, QualBasedCaller, SigGate, SnvCall, StrandBias,
};
use errmod::{EmError, EmTrainer, ErrorModel, ModelShape, TrainingColumn};
use pileup::PileupColumn;
use stats::fisher_exact;

/// Base-call quality filter applied when counting observations, whichever
/// caller is active. Illumina marks unusable read segments with Q2; those
/// bases must never be used.
pub const MIN_BASE_QUAL: u8 = 3;

/// Cooperative cancellation token. The pipeline checks it between columns:
/// the column in flight is finished and no partial call is ever emitted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-run counters, reported on the log epilogue and surfaced to callers
/// for testing.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    /// Columns fed to the calling stage (buffered + streamed).
    pub columns       : u64,
    pub excluded      : u64,
    pub ambiguous_cons: u64,
    pub zero_coverage : u64,
    pub emitted       : u64,
}

/// Per-column calling machinery: consensus bookkeeping, the two callers
/// with their override semantics, and strand-bias annotation.
pub struct CallPipeline {
    em_caller  : Option<EmBasedCaller>,
    qual_caller: Option<QualBasedCaller>,
    excluded   : AHashSet<u64>,
    /// Quality filters used for the strand-bias / DP4 counts
    /// (reference allele, variant allele).
    ref_qf     : u8,
    var_qf     : u8,
    stats      : RunStats,
}

impl CallPipeline {
    #[must_use]
    pub fn new(
        em_caller: Option<EmBasedCaller>,
        qual_caller: Option<QualBasedCaller>,
        excluded: AHashSet<u64>,
        ign_bases_below_q: u8,
        noncons_filter_qual: u8,
    ) -> Self {
        // In quality-aware mode the annotation counts mirror the calling
        // filters; the agnostic caller never filtered on quality, so
        // neither does its annotation.
        let (ref_qf, var_qf) = match qual_caller.is_some() {
            true  => (ign_bases_below_q, ign_bases_below_q.max(noncons_filter_qual)),
            false => (0, 0),
        };
        Self { em_caller, qual_caller, excluded, ref_qf, var_qf, stats: RunStats::default() }
    }

    #[must_use]
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Run both calling stages on one column and return the annotated
    /// calls to emit, in lexicographic alt-base order.
    pub fn process_column(&mut self, column: &PileupColumn) -> Vec<AnnotatedCall> {
        self.stats.columns += 1;

        if self.excluded.contains(&column.coord) {
            debug!("Skipping col {} because of exclusion", column.coord + 1);
            self.stats.excluded += 1;
            return Vec::new();
        }
        let Some(cons) = column.cons_base else {
            info!("Skipping col {} because of ambiguous consensus", column.coord + 1);
            self.stats.ambiguous_cons += 1;
            return Vec::new();
        };

        let counts = column.base_counts(MIN_BASE_QUAL);
        let coverage = counts.coverage();
        if coverage == 0 {
            info!("Zero coverage in col {}", column.coord + 1);
            self.stats.zero_coverage += 1;
            return Vec::new();
        }

        // Consensus variant: the column's majority disagrees with the
        // reference. Calling always happens against the consensus; if the
        // reference allele itself comes out as a low-frequency call below,
        // it is dropped in favour of this record.
        let cons_var = match column.ref_base {
            Some(ref_base) if ref_base != cons => Some(SnvCall {
                coord   : column.coord,
                ref_base,
                alt_base: cons,
                freq    : f64::from(counts[cons]) / f64::from(coverage),
                pvalue  : None,
                coverage,
                kind    : CallKind::ConsensusVar,
            }),
            _ => None,
        };

        let mut candidates = Vec::new();
        if let Some(em_caller) = &self.em_caller {
            candidates = em_caller.call_in_column(column.coord, &counts, cons);
            for call in &candidates {
                info!(
                    "Quality-agnostic SNV on chrom {}: {}>{} at col {}",
                    column.chrom, call.ref_base, call.alt_base, call.coord + 1
                );
            }
        }
        // The quality-aware caller overrides (never augments) the
        // agnostic candidates, to avoid double-reporting; when the
        // agnostic caller is active it also acts as a pre-filter, so a
        // column it found empty is not re-tested.
        if let Some(qual_caller) = &self.qual_caller {
            if self.em_caller.is_none() || !candidates.is_empty() {
                let hist = column.qual_hist();
                candidates = qual_caller.call_in_column(column.coord, &hist, cons);
                for call in &candidates {
                    info!(
                        "Quality-aware SNV on chrom {}: {}>{} at col {}",
                        column.chrom, call.ref_base, call.alt_base, call.coord + 1
                    );
                }
            }
        }

        if let Some(cons_var) = cons_var {
            candidates.retain(|call| call.alt_base != cons_var.ref_base);
            candidates.push(cons_var);
            candidates.sort_by_key(|call| call.alt_base);
        }

        candidates
            .into_iter()
            .map(|call| self.annotate(column, call))
            .collect()
    }

    fn annotate(&self, column: &PileupColumn, call: SnvCall) -> AnnotatedCall {
        let (ref_fwd, ref_rev) = column.counts_for_base(call.ref_base, self.ref_qf);
        let (alt_fwd, alt_rev) = column.counts_for_base(call.alt_base, self.var_qf);
        let dp4 = Dp4 { ref_fwd, ref_rev, alt_fwd, alt_rev };

        let strand_bias = match fisher_exact(
            u64::from(ref_fwd),
            u64::from(ref_rev),
            u64::from(alt_fwd),
            u64::from(alt_rev),
        ) {
            Ok(pvalue) => StrandBias::from_pvalue(pvalue),
            Err(err) => {
                debug!("Strand-bias test failed in col {}: {err}", call.coord + 1);
                StrandBias::na()
            }
        };
        AnnotatedCall { chrom: column.chrom.clone(), call, dp4, strand_bias }
    }
}

/// Main entry point of the `call` subcommand.
///
/// # Errors
/// Any configuration, I/O, model-file or training failure is fatal;
/// per-column events are counted and skipped instead.
pub fn run(args: &Call) -> Result<RunStats> {
    run_with_cancel(args, &CancelToken::new())
}

/// [`run`], with an externally owned cancellation token.
///
/// # Errors
/// See [`run`].
pub fn run_with_cancel(args: &Call, cancel: &CancelToken) -> Result<RunStats> {
    // ----------------------------- Sanity checks
    args.check_callers()?;
    args.check_input()?;

    // ----------------------------- Prepare the output sink
    if let Some(out) = &args.out {
        can_write_file(args.overwrite, out)?;
    }
    let mut writer = GenericWriter::new(args.out.as_ref())?;
    output::write_header(&mut writer, args.outfmt)?;

    // ----------------------------- Parse exclusion positions
    let excluded = match &args.exclude {
        Some(path) => {
            let excluded = read_exclude_positions(path)?;
            info!("Ignoring {} position(s) found in '{}'", excluded.len(), path.display());
            excluded
        }
        None => AHashSet::default(),
    };

    // ----------------------------- Open pileup
    info!("Opening pileup...");
    let mut lines = open_pileup_source(args.pileup.as_deref())?.lines();

    // ----------------------------- Stage 1: error-model acquisition
    let gate = SigGate::new(args.sig_thresh, args.bonf);
    let mut buffer: Vec<PileupColumn> = Vec::new();
    let em_caller = match (args.em_on, &args.em_error_prob_file) {
        (false, _) => None,
        (true, Some(path)) => {
            info!("Skipping EM training and using error probabilities from '{}'", path.display());
            Some(EmBasedCaller::new(ErrorModel::from_path(path)?, gate))
        }
        (true, None) => {
            let model = train_error_model(&mut lines, &mut buffer, &excluded, args)?;
            Some(EmBasedCaller::new(model, gate))
        }
    };
    let qual_caller = args.qual_on().then(|| {
        QualBasedCaller::new(
            args.noncons_default_qual,
            args.noncons_filter_qual,
            args.ign_bases_below_q,
            gate,
        )
    });

    // ----------------------------- Stage 2: per-column calling
    info!("Processing pileup for variant calls");
    let mut pipeline = CallPipeline::new(
        em_caller,
        qual_caller,
        excluded,
        args.ign_bases_below_q,
        args.noncons_filter_qual,
    );

    for column in buffer.drain(..) {
        if cancel.is_cancelled() {
            break;
        }
        for annotated in pipeline.process_column(&column) {
            writer.write_line(output::format_call(&annotated, args.outfmt))?;
            pipeline.stats.emitted += 1;
        }
    }
    while !cancel.is_cancelled() {
        let Some(entry) = lines.next() else { break };
        let line = entry.context("Failed to read pileup line")?;
        let column = PileupColumn::parse(&line)
            .with_context(|| format!("Failed to parse pileup line: '{line}'"))?;
        for annotated in pipeline.process_column(&column) {
            writer.write_line(output::format_call(&annotated, args.outfmt))?;
            pipeline.stats.emitted += 1;
        }
    }
    writer.flush()?;
    if cancel.is_cancelled() {
        info!("Cancellation requested: finished the column in flight and stopped");
    }

    // ----------------------------- Epilogue
    let stats = pipeline.stats();
    if stats.columns == 0 && !cancel.is_cancelled() {
        return Err(RunError::EmptyPileup.into());
    }
    if stats.ambiguous_cons > 0 {
        warn!("{} position(s) skipped, because of an ambiguous consensus in pileup", stats.ambiguous_cons);
    }
    info!("{} variant call(s) written", stats.emitted);
    Ok(stats)
}

/// Stage 1: drain pileup columns into `buffer` until the training sample
/// is full or the stream ends, then run EM over the selected columns.
///
/// Selected columns have an unambiguous consensus, are not excluded, and
/// keep a coverage of at least [`errmod::TRAINING_MIN_COVERAGE`] once
/// observations below [`MIN_BASE_QUAL`] are dropped.
fn train_error_model(
    lines: &mut std::io::Lines<Box<dyn BufRead>>,
    buffer: &mut Vec<PileupColumn>,
    excluded: &AHashSet<u64>,
    args: &Call,
) -> Result<ErrorModel> {
    info!("Processing pileup for EM training");
    let mut sample: Vec<TrainingColumn> = Vec::new();
    let mut num_lines = 0u64;

    for entry in lines.by_ref() {
        let line = entry.context("Failed to read pileup line")?;
        num_lines += 1;
        let column = PileupColumn::parse(&line)
            .with_context(|| format!("Failed to parse pileup line: '{line}'"))?;

        if !excluded.contains(&column.coord) {
            if let Some(cons) = column.cons_base {
                let counts = column.base_counts(MIN_BASE_QUAL);
                if counts.coverage() >= errmod::TRAINING_MIN_COVERAGE {
                    sample.push(TrainingColumn::new(counts, cons));
                }
            } else {
                debug!("Skipping col {} for training: ambiguous consensus", column.coord + 1);
            }
        }
        buffer.push(column);

        if sample.len() >= errmod::TRAINING_SAMPLE_SIZE {
            break;
        }
    }

    if num_lines == 0 {
        return Err(RunError::EmptyPileup.into());
    }
    if sample.len() < errmod::TRAINING_SAMPLE_SIZE {
        warn!("Insufficient data ({} column(s)) acquired from pileup for EM training", sample.len());
    }
    if !sample.is_empty() {
        let avg_coverage: u64 = sample.iter().map(|column| u64::from(column.counts.coverage())).sum::<u64>()
            / sample.len() as u64;
        info!("Using {} column(s) with an avg. coverage of {avg_coverage} for EM training", sample.len());
    }

    let shape = ModelShape::try_from(args.em_num_param)?;
    match EmTrainer::new(shape).train(&sample) {
        Ok(model) => {
            info!("EM training completed.");
            Ok(model)
        }
        Err(err @ EmError::InsufficientTrainingData) if args.em_fallback_defaults => {
            warn!("{err}: falling back to uniform default error probabilities");
            Ok(ErrorModel::uniform(shape, errmod::DEFAULT_ERROR_PROB))
        }
        Err(err) => Err(err).context("EM training failed"),
    }
}
