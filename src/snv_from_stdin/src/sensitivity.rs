//! Detection-limit probing on synthetic pileup columns.
//!
//! Builds fake columns of uniform base quality over a coverage/quality
//! grid and reports, for each cell, the smallest variant count the caller
//! flags as significant under the default gate. Useful to pick a
//! sequencing depth before a run, and as a stability check: the reported
//! limits only depend on the configuration, never on run order.

use anyhow::Result;

use genome::{Base, BaseCounts, Phred, QualHist};
use parser::{Scan, ScanCaller};

use crate::caller::{EmBasedCaller, QualBasedCaller, SigGate};
use crate::errmod::{ErrorModel, ModelShape};

pub const SCAN_COVERAGES: [u32; 7] = [10, 50, 100, 500, 1000, 5000, 10_000];
pub const SCAN_QUALITIES: [u8; 5] = [20, 25, 30, 35, 40];

const SCAN_REF: Base = Base::A;
const SCAN_ALT: Base = Base::G;
const SCAN_SIG_THRESH: f64 = 0.05;
const SCAN_BONF: u64 = 1;

/// Run the scan(s) requested on the command line and print one table per
/// caller.
///
/// # Errors
/// Currently infallible; kept fallible for symmetry with the other
/// subcommand entry points.
pub fn run(scan: &Scan) -> Result<()> {
    let gate = SigGate::new(SCAN_SIG_THRESH, SCAN_BONF);
    if matches!(scan.caller, ScanCaller::Em | ScanCaller::Both) {
        print_table("quality-agnostic (error-model) caller", |coverage, qual| {
            min_detectable_em(gate, coverage, qual)
        });
    }
    if matches!(scan.caller, ScanCaller::Qual | ScanCaller::Both) {
        let caller = QualBasedCaller::new(20, 20, 3, gate);
        print_table("quality-aware caller", |coverage, qual| {
            min_detectable_qual(&caller, coverage, qual)
        });
    }
    Ok(())
}

fn print_table(label: &str, min_detectable: impl Fn(u32, u8) -> Option<u32>) {
    println!(
        "Detection limits of the {label} on fake pileup columns with uniform \
         quality (significance threshold = {SCAN_SIG_THRESH})"
    );
    print!("cov");
    for qual in SCAN_QUALITIES {
        print!("\tQ={qual}");
    }
    println!();

    for coverage in SCAN_COVERAGES {
        print!("{coverage}");
        for qual in SCAN_QUALITIES {
            match min_detectable(coverage, qual) {
                Some(count) => print!("\t{count}"),
                None        => print!("\t-"),
            }
        }
        println!();
    }
}

/// Smallest variant count the quality-aware caller reports at the given
/// coverage, with every base at the given quality. `None` when even a
/// column made entirely of variant observations stays silent.
#[must_use]
pub fn min_detectable_qual(caller: &QualBasedCaller, coverage: u32, qual: u8) -> Option<u32> {
    (1..coverage).find(|&count| {
        let mut hist = QualHist::new();
        for _ in 0..(coverage - count) {
            hist.record(SCAN_REF, Phred::from(qual));
        }
        for _ in 0..count {
            hist.record(SCAN_ALT, Phred::from(qual));
        }
        !caller.call_in_column(0, &hist, SCAN_REF).is_empty()
    })
}

/// Smallest variant count the error-model caller reports at the given
/// coverage, with the substitution error probability pinned to the
/// quality's error probability.
#[must_use]
pub fn min_detectable_em(gate: SigGate, coverage: u32, qual: u8) -> Option<u32> {
    let model = ErrorModel::uniform(ModelShape::TwelveParam, Phred::from(qual).as_prob());
    let caller = EmBasedCaller::new(model, gate);

    (1..coverage).find(|&count| {
        let mut counts = [0u32; 4];
        counts[SCAN_REF.index()] = coverage - count;
        counts[SCAN_ALT.index()] = count;
        !caller.call_in_column(0, &BaseCounts::from_counts(counts), SCAN_REF).is_empty()
    })
}
