use genome::{Base, Phred, QualHist};

use crate::stats::poisson_binomial_tail;

use super::{CallKind, SigGate, SnvCall};

/// Quality-aware caller: each base call's own Phred score is its
/// per-observation error probability.
///
/// For a candidate variant `v` at a column with consensus `c`, the trial
/// vector holds one Bernoulli trial per surviving observation:
/// - consensus observations with quality `q` enter with probability
///   `10^(-q/10)`: each of them could itself be a mis-called `v`;
/// - candidate observations below `noncons_filter_qual` are discarded
///   outright;
/// - candidate observations at or above it count as successes, their trial
///   probability taken at `10^(-max(q, noncons_default_qual)/10)`. The
///   quality floor applies to these successes only, not to the consensus
///   trials; the asymmetry is deliberate and mirrors how non-consensus
///   calls are requalified upstream;
/// - other non-consensus bases are irrelevant to the c-versus-v hypothesis
///   and contribute nothing.
///
/// Observations below `ign_bases_below_q` never enter the trial vector at
/// all.
#[derive(Debug, Clone, Copy)]
pub struct QualBasedCaller {
    noncons_default_qual: u8,
    noncons_filter_qual : u8,
    ign_bases_below_q   : u8,
    gate                : SigGate,
}

impl QualBasedCaller {
    #[must_use]
    pub fn new(
        noncons_default_qual: u8,
        noncons_filter_qual: u8,
        ign_bases_below_q: u8,
        gate: SigGate,
    ) -> Self {
        Self { noncons_default_qual, noncons_filter_qual, ign_bases_below_q, gate }
    }

    /// Test every candidate variant base at one column, in canonical
    /// A, C, G, T order. The coverage reported on a call is the number of
    /// trials that survived filtering, and the frequency is successes over
    /// that count.
    #[must_use]
    pub fn call_in_column(&self, coord: u64, hist: &QualHist, cons: Base) -> Vec<SnvCall> {
        let mut calls = Vec::new();

        let mut cons_trials = Vec::new();
        for (qual, count) in hist.iter_quals(cons) {
            if qual < self.ign_bases_below_q {
                continue;
            }
            let prob = Phred::from(qual).as_prob();
            cons_trials.extend(std::iter::repeat(prob).take(count as usize));
        }

        for alt in cons.others() {
            let mut trials = cons_trials.clone();
            let mut successes = 0usize;
            for (qual, count) in hist.iter_quals(alt) {
                if qual < self.ign_bases_below_q || qual < self.noncons_filter_qual {
                    continue;
                }
                let prob = Phred::from(qual).floored(self.noncons_default_qual).as_prob();
                successes += count as usize;
                trials.extend(std::iter::repeat(prob).take(count as usize));
            }
            // No successes cannot gate in; no consensus trial would report
            // a frequency of 1, which is a consensus matter, not a
            // low-frequency one.
            if successes == 0 || cons_trials.is_empty() {
                continue;
            }

            let pvalue = poisson_binomial_tail(&trials, successes, self.gate.threshold());
            if self.gate.admits(pvalue) {
                calls.push(SnvCall {
                    coord,
                    ref_base: cons,
                    alt_base: alt,
                    freq    : successes as f64 / trials.len() as f64,
                    pvalue  : Some(pvalue),
                    coverage: trials.len() as u32,
                    kind    : CallKind::LowFreqVar,
                });
            }
        }
        calls
    }
}
