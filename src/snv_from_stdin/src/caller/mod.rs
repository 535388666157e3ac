use std::fmt::{self, Display, Formatter};

use genome::{prob_to_phred, Base};

mod em_based;
pub use em_based::EmBasedCaller;

mod qual_based;
pub use qual_based::QualBasedCaller;

/// Significance gate shared by both callers.
///
/// A tentative call with p-value `p` is reported iff
/// `p < sig_thresh / bonf`. The reported p-value stays uncorrected; the
/// Bonferroni factor only tightens the admission threshold. The threshold
/// doubles as the bail-out bound of the tail computations: once a partial
/// tail sum exceeds it, no further term can bring the call back under.
#[derive(Debug, Clone, Copy)]
pub struct SigGate {
    sig_thresh: f64,
    bonf      : u64,
}

impl SigGate {
    #[must_use]
    pub fn new(sig_thresh: f64, bonf: u64) -> Self {
        debug_assert!(sig_thresh > 0.0 && sig_thresh <= 1.0);
        debug_assert!(bonf >= 1);
        Self { sig_thresh, bonf }
    }

    /// Corrected admission threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.sig_thresh / self.bonf as f64
    }

    #[must_use]
    pub fn admits(&self, pvalue: f64) -> bool {
        pvalue < self.threshold()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind { LowFreqVar, ConsensusVar }

impl Display for CallKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowFreqVar   => write!(f, "low-freq-var"),
            Self::ConsensusVar => write!(f, "consensus-var"),
        }
    }
}

/// A tentative variant call at a single column, before strand-bias
/// annotation. `pvalue` is `None` for consensus variants, which are
/// declared rather than tested.
#[derive(Debug, Clone, Copy)]
pub struct SnvCall {
    pub coord   : u64,
    pub ref_base: Base,
    pub alt_base: Base,
    pub freq    : f64,
    pub pvalue  : Option<f64>,
    pub coverage: u32,
    pub kind    : CallKind,
}

/// Strand-split supporting read counts:
/// (ref forward, ref reverse, alt forward, alt reverse).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dp4 {
    pub ref_fwd: u32,
    pub ref_rev: u32,
    pub alt_fwd: u32,
    pub alt_rev: u32,
}

impl Display for Dp4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.ref_fwd, self.ref_rev, self.alt_fwd, self.alt_rev)
    }
}

/// Outcome of the strand-bias test. A failed (degenerate-table) test is
/// kept on the call as the `-1` sentinel and renders as "NA" on the Phred
/// scale.
#[derive(Debug, Clone, Copy)]
pub struct StrandBias {
    pvalue: f64,
}

impl StrandBias {
    const SENTINEL: f64 = -1.0;

    #[must_use]
    pub fn from_pvalue(pvalue: f64) -> Self {
        Self { pvalue }
    }

    #[must_use]
    pub fn na() -> Self {
        Self { pvalue: Self::SENTINEL }
    }

    #[must_use]
    pub fn is_na(&self) -> bool {
        self.pvalue < 0.0
    }

    /// Raw two-tailed p-value, or the `-1` sentinel.
    #[must_use]
    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }

    /// Phred-scaled p-value; `None` when the test failed.
    #[must_use]
    pub fn phred(&self) -> Option<u32> {
        match self.is_na() {
            true  => None,
            false => Some(prob_to_phred(self.pvalue)),
        }
    }
}

/// A call decorated with everything the output layer needs. Never mutated
/// after construction.
#[derive(Debug, Clone)]
pub struct AnnotatedCall {
    pub chrom      : String,
    pub call       : SnvCall,
    pub dp4        : Dp4,
    pub strand_bias: StrandBias,
}

impl AnnotatedCall {
    /// Phred-scaled calling p-value; `None` for consensus variants.
    #[must_use]
    pub fn pvalue_phred(&self) -> Option<u32> {
        self.call.pvalue.map(prob_to_phred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_threshold_is_corrected() {
        #![allow(clippy::float_cmp)]
        let gate = SigGate::new(0.05, 1);
        assert_eq!(gate.threshold(), 0.05);
        let gate = SigGate::new(0.05, 1000);
        assert_eq!(gate.threshold(), 5e-5);
    }

    #[test]
    fn gate_admission_is_strict() {
        let gate = SigGate::new(0.05, 1);
        assert!(gate.admits(0.049));
        assert!(!gate.admits(0.05));
        assert!(!gate.admits(1.0));
    }

    #[test]
    fn tightening_the_gate_never_admits_more() {
        let pvalues = [1e-12, 1e-6, 0.01, 0.049, 0.05, 0.2, 1.0];
        let loose = SigGate::new(0.05, 1);
        for (sig_thresh, bonf) in [(0.05, 10), (0.01, 1), (0.001, 1000)] {
            let tight = SigGate::new(sig_thresh, bonf);
            for pvalue in pvalues {
                assert!(!tight.admits(pvalue) || loose.admits(pvalue));
            }
        }
    }

    #[test]
    fn strand_bias_sentinel() {
        assert!(StrandBias::na().is_na());
        assert_eq!(StrandBias::na().phred(), None);
        let bias = StrandBias::from_pvalue(0.001);
        assert!(!bias.is_na());
        assert_eq!(bias.phred(), Some(30));
    }

    #[test]
    fn dp4_display() {
        let dp4 = Dp4 { ref_fwd: 50, ref_rev: 50, alt_fwd: 0, alt_rev: 20 };
        assert_eq!(dp4.to_string(), "50,50,0,20");
    }

    #[test]
    fn call_kind_display() {
        assert_eq!(CallKind::LowFreqVar.to_string(), "low-freq-var");
        assert_eq!(CallKind::ConsensusVar.to_string(), "consensus-var");
    }
}
