use genome::{Base, BaseCounts};

use crate::errmod::ErrorModel;
use crate::stats::binomial_tail;

use super::{CallKind, SigGate, SnvCall};

/// Quality-agnostic caller, parameterised by a trained [`ErrorModel`].
///
/// Every observation at a column is treated as a Bernoulli trial with the
/// learned substitution probability `e(cons>alt)`; since the trials are
/// homogeneous the Poisson-binomial tail degenerates to an exact binomial
/// tail, which is what gets computed.
#[derive(Debug, Clone)]
pub struct EmBasedCaller {
    model: ErrorModel,
    gate : SigGate,
}

impl EmBasedCaller {
    #[must_use]
    pub fn new(model: ErrorModel, gate: SigGate) -> Self {
        Self { model, gate }
    }

    #[must_use]
    pub fn model(&self) -> &ErrorModel {
        &self.model
    }

    /// Test every candidate variant base at one column.
    ///
    /// Candidates are evaluated in canonical A, C, G, T order (skipping the
    /// consensus), so the returned calls are deterministic.
    #[must_use]
    pub fn call_in_column(&self, coord: u64, counts: &BaseCounts, cons: Base) -> Vec<SnvCall> {
        let coverage = counts.coverage();
        if coverage == 0 {
            return Vec::new();
        }

        let mut calls = Vec::new();
        for alt in cons.others() {
            let alt_count = counts[alt];
            if alt_count == 0 {
                continue;
            }
            let error_prob = self.model.get(cons, alt);
            let pvalue = binomial_tail(
                u64::from(coverage),
                u64::from(alt_count),
                error_prob,
                self.gate.threshold(),
            );
            if self.gate.admits(pvalue) {
                calls.push(SnvCall {
                    coord,
                    ref_base: cons,
                    alt_base: alt,
                    freq    : f64::from(alt_count) / f64::from(coverage),
                    pvalue  : Some(pvalue),
                    coverage,
                    kind    : CallKind::LowFreqVar,
                });
            }
        }
        calls
    }
}
