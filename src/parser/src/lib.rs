use std::{
    ffi::OsStr,
    fmt::{self, Display, Formatter},
    fs::File,
    io::IsTerminal,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{ArgEnum, Parser, Subcommand};
use log::debug;
use serde::{Deserialize, Serialize};

mod error;
pub use error::ParserError;

/// lowvar-rs: ultra-sensitive detection of low-frequency single-nucleotide
/// variants from a samtools mpileup stream.
#[derive(Parser, Debug, Serialize, Deserialize)]
#[clap(name="lowvar-rs", version, about, long_about = None)]
#[clap(propagate_version = true)]
pub struct Cli {
    /// Set the verbosity level (-v -vv -vvv)
    ///
    /// Set the verbosity level of this program. Multiple levels allowed {n}
    ///
    /// -v: Info  |  -vv: Debug  | -vvv: Trace {n}
    ///
    /// Note that the program will still output warnings by default, even when
    /// this flag is off. Use --quiet/-q to disable them.
    #[clap(short='v', long, parse(from_occurrences), global=true)]
    pub verbose: u8,

    /// Disable warnings.
    ///
    /// By default, warnings are emitted and redirected to the console, even
    /// when verbose mode is off. Use this argument to disable this. Only
    /// errors will be displayed.
    #[clap(short='q', long, global=true)]
    pub quiet: bool,

    #[clap(subcommand)]
    pub commands: Commands,
}

impl Cli {
    /// Echo the parsed command line arguments, serialized to YAML, on the
    /// debug log. Keeps a re-runnable record of every invocation in the
    /// logs.
    ///
    /// # Errors
    /// If `serde_yaml` fails to serialize `Self` to a string.
    pub fn serialize(&self) -> Result<()> {
        let serialized = serde_yaml::to_string(&self)
            .context("Failed to serialize command line arguments")?;
        debug!("\n---- Command line args ----\n{serialized}\n---");
        Ok(())
    }

    /// Deserialize a `.yaml` file into command line arguments, allowing a
    /// previous run to be reproduced exactly.
    ///
    /// # Errors
    /// If the provided file is missing, unreadable, or fails to parse into
    /// `Self`.
    pub fn deserialize(yaml: &Path) -> Result<Self> {
        let file = File::open(yaml)
            .with_context(|| format!("Failed to open '{}'", yaml.display()))?;
        serde_yaml::from_reader(file)
            .with_context(|| format!("Unable to deserialize arguments from '{}'", yaml.display()))
    }
}

#[derive(Subcommand, Debug, Serialize, Deserialize)]
pub enum Commands {
    /// Call single-nucleotide variants from a pileup stream.
    Call {
        #[clap(flatten)]
        call: Box<Call>, // Box<T> to mitigate the large size difference between variants.
    },

    /// Probe the detection limits of the callers on synthetic columns.
    ///
    /// Builds fake pileup columns of uniform quality over a grid of
    /// coverages and quality values, and reports the smallest variant count
    /// each caller flags as significant.
    DetectionLimits {
        #[clap(flatten)]
        scan: Scan,
    },

    /// Run lowvar-rs using a previously serialized .yaml configuration file.
    ///
    /// This allows users to easily re-apply a command using the exact same
    /// parameters and arguments.
    FromYaml {
        yaml: PathBuf,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ArgEnum, Serialize, Deserialize)]
pub enum OutFormat { Snp, Vcf }

impl Default for OutFormat {
    fn default() -> Self { Self::Snp }
}

impl Display for OutFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snp => write!(f, "snp"),
            Self::Vcf => write!(f, "vcf"),
        }
    }
}

/// Call single-nucleotide variants from a pileup stream.
///
/// Input is a samtools mpileup. Give samtools a high depth cap (-d) so that
/// deeply covered columns are not truncated upstream, and consider
/// recalibrating base qualities beforehand.
#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug, Default, Serialize, Deserialize)]
pub struct Call {
    /// Pileup input file.
    ///
    /// In the absence of a '--pileup' argument, the program expects a data
    /// stream from the standard input. i.e:{n}
    ///
    ///     samtools mpileup -d 100000 [sample.bam] | lowvar-rs call [...]{n}
    #[clap(short='i', long, required(false), parse(try_from_os_str=valid_input_file))]
    pub pileup: Option<PathBuf>,

    /// Variant output file. Writes to stdout when unset.
    #[clap(short='o', long, required(false))]
    pub out: Option<PathBuf>,

    /// Output format.
    ///
    /// Note that 'snp' is unaware of chromosomes.
    #[clap(long, arg_enum, default_value("snp"))]
    pub outfmt: OutFormat,

    /// Exclude positions listed in this file from calling.
    ///
    /// Format is: 'start end [comment ...]', with 0-based, half-open
    /// coordinates. Lines starting with '#' are skipped.
    #[clap(short='e', long, required(false), parse(try_from_os_str=valid_input_file))]
    pub exclude: Option<PathBuf>,

    /// Overwrite existing output files.
    ///
    /// By default, lowvar-rs refuses to overwrite an already existing
    /// variant output file. Use this flag to force that behaviour.
    #[clap(short='w', long)]
    pub overwrite: bool,

    /// Bonferroni correction factor.
    ///
    /// The significance threshold is divided by this factor before gating
    /// (e.g. use 3x the sequence length to be stringent). Higher values can
    /// also speed the quality-aware caller up on deeply covered data, since
    /// tail computations bail out earlier. Reported p-values stay
    /// uncorrected.
    #[clap(short='b', long, default_value("1"), parse(try_from_str=parse_bonf))]
    pub bonf: u64,

    /// p-value significance threshold.
    #[clap(short='s', long, default_value("0.05"), parse(try_from_str=parse_sig_thresh))]
    pub sig_thresh: f64,

    /// Remove any base below this base-call quality from the pileup.
    ///
    /// The default of 3 drops bases flagged with Illumina's Read Segment
    /// Indicator (Q2), which are not meant to be used in any computation.
    #[clap(short='Q', long, default_value("3"))]
    pub ign_bases_below_q: u8,

    /// Base-call quality floor applied to non-consensus bases.
    ///
    /// Candidate-base observations surviving '--noncons-filter-qual' have
    /// their quality floored at this value when their error probability
    /// enters the significance computation. The floor deliberately applies
    /// to the candidate observations only, never to consensus ones.
    #[clap(long, default_value("20"))]
    pub noncons_default_qual: u8,

    /// Non-consensus bases below this quality threshold are discarded.
    #[clap(long, default_value("20"))]
    pub noncons_filter_qual: u8,

    /// De-activate quality-aware calling.
    #[clap(long)]
    pub qual_off: bool,

    /// Activate quality-agnostic, error-model-based calling.
    ///
    /// Unless '--em-error-prob-file' provides pre-computed probabilities,
    /// an expectation-maximization pass over the head of the pileup stream
    /// first estimates the base-to-base substitution error rates.
    #[clap(long)]
    pub em_on: bool,

    /// Use a 4- or 12-parameter substitution error model.
    #[clap(long, default_value("12"), parse(try_from_str=parse_num_param))]
    pub em_num_param: u8,

    /// Read substitution error probabilities from this file (skips training).
    ///
    /// General format is: '<ref-base> <snp-base-1> <eprob-1> ...'.{n}
    /// The 4-parameter model needs a single line: 'N A <eprob> C <eprob> G
    /// <eprob> T <eprob>'.{n}
    /// The 12-parameter model needs one line per nucleotide.
    #[clap(long, required(false), parse(try_from_os_str=valid_input_file))]
    pub em_error_prob_file: Option<PathBuf>,

    /// Fall back to uniform default error probabilities when the pileup
    /// does not provide enough usable training columns, instead of
    /// aborting.
    #[clap(long)]
    pub em_fallback_defaults: bool,
}

impl Call {
    /// Whether the quality-aware caller is active.
    #[must_use]
    pub fn qual_on(&self) -> bool {
        !self.qual_off
    }

    /// Sanity check: at least one of the two callers must be active.
    ///
    /// # Errors
    /// [`ParserError::InvalidCallerConfig`] when both are switched off.
    pub fn check_callers(&self) -> Result<(), ParserError> {
        if self.qual_off && !self.em_on {
            return Err(ParserError::InvalidCallerConfig);
        }
        Ok(())
    }

    /// Sanity check: the program should leave if the user did not provide
    /// any pileup input, either through '--pileup' or through stdin.
    /// Without this, it would wait indefinitely on the stdin buffer.
    ///
    /// # Errors
    /// [`ParserError::MissingPileupInput`] in the case described above.
    pub fn check_input(&self) -> Result<(), ParserError> {
        if std::io::stdin().is_terminal() && self.pileup.is_none() {
            return Err(ParserError::MissingPileupInput);
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ArgEnum, Serialize, Deserialize)]
pub enum ScanCaller { Qual, Em, Both }

impl Default for ScanCaller {
    fn default() -> Self { Self::Both }
}

/// Probe the detection limits of the callers on synthetic columns.
#[derive(Parser, Debug, Default, Serialize, Deserialize)]
pub struct Scan {
    /// Which caller(s) to probe.
    #[clap(long, arg_enum, default_value("both"))]
    pub caller: ScanCaller,
}

fn valid_input_file(s: &OsStr) -> Result<PathBuf, ParserError> {
    let path = Path::new(s);
    if !path.exists() {
        return Err(ParserError::MissingFile(path.display().to_string()));
    }
    if !path.is_file() {
        return Err(ParserError::NotAFile(path.display().to_string()));
    }
    Ok(path.to_path_buf())
}

fn parse_sig_thresh(s: &str) -> Result<f64, ParserError> {
    match s.parse::<f64>() {
        Ok(sig_thresh) if sig_thresh > 0.0 && sig_thresh <= 1.0 => Ok(sig_thresh),
        _ => Err(ParserError::ParseSigThresh(s.to_string())),
    }
}

fn parse_bonf(s: &str) -> Result<u64, ParserError> {
    match s.parse::<u64>() {
        Ok(bonf) if bonf >= 1 => Ok(bonf),
        _ => Err(ParserError::ParseBonf(s.to_string())),
    }
}

fn parse_num_param(s: &str) -> Result<u8, ParserError> {
    match s.parse::<u8>() {
        Ok(num_param @ (4 | 12)) => Ok(num_param),
        _ => Err(ParserError::ParseNumParam(s.to_string())),
    }
}
