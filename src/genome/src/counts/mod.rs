use std::ops::Index;

use crate::base::Base;
use crate::nucleotide::Phred;
use crate::strand::Strand;

/// Per-base observation tallies at a single pileup column.
///
/// Known bases are kept in a fixed-size array indexed by [`Base::index()`],
/// keeping the per-column hot loop free of hashing. 'N' observations are
/// tallied apart and never participate in coverage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BaseCounts {
    counts: [u32; 4],
    n     : u32,
}

impl BaseCounts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from known-base tallies only (no 'N' observations).
    #[must_use]
    pub const fn from_counts(counts: [u32; 4]) -> Self {
        Self { counts, n: 0 }
    }

    pub fn record(&mut self, base: Option<Base>) {
        match base {
            Some(base) => self.counts[base.index()] += 1,
            None       => self.n += 1,
        }
    }

    /// Total number of known-base observations.
    #[must_use]
    pub fn coverage(&self) -> u32 {
        self.counts.iter().sum()
    }

    #[must_use]
    pub fn n_count(&self) -> u32 {
        self.n
    }

    /// (base, count) pairs in canonical A, C, G, T order.
    pub fn iter(&self) -> impl Iterator<Item = (Base, u32)> + '_ {
        Base::ALL.into_iter().map(|base| (base, self.counts[base.index()]))
    }

    /// The majority base among known observations, if any.
    /// Ties are broken in favor of `tie_break` when it is one of the
    /// tied leaders; any other tie is reported as ambiguous (`None`).
    #[must_use]
    pub fn majority(&self, tie_break: Option<Base>) -> Option<Base> {
        let best = self.counts.iter().copied().max().unwrap_or(0);
        if best == 0 {
            return None;
        }
        let mut leaders = Base::ALL.into_iter().filter(|base| self.counts[base.index()] == best);
        let first = leaders.next()?;
        match leaders.next() {
            None    => Some(first),
            Some(_) => tie_break.filter(|base| self.counts[base.index()] == best),
        }
    }
}

impl Index<Base> for BaseCounts {
    type Output = u32;

    fn index(&self, base: Base) -> &Self::Output {
        &self.counts[base.index()]
    }
}

/// Strand-split per-base tallies.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StrandBaseCounts {
    pub fwd: BaseCounts,
    pub rev: BaseCounts,
}

impl StrandBaseCounts {
    pub fn record(&mut self, base: Option<Base>, strand: Strand) {
        match strand {
            Strand::Forward => self.fwd.record(base),
            Strand::Reverse => self.rev.record(base),
        }
    }

    /// (forward, reverse) observation counts for a single base.
    #[must_use]
    pub fn for_base(&self, base: Base) -> (u32, u32) {
        (self.fwd[base], self.rev[base])
    }
}

const QUAL_BINS: usize = Phred::MAX_SCORE as usize + 1;

/// Per-base histogram of base-call qualities: for each known base, how many
/// observations were seen at each Phred value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualHist {
    bins: [[u32; QUAL_BINS]; 4],
}

impl Default for QualHist {
    fn default() -> Self {
        Self { bins: [[0; QUAL_BINS]; 4] }
    }
}

impl QualHist {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, base: Base, phred: Phred) {
        self.bins[base.index()][phred.score() as usize] += 1;
    }

    /// Non-empty (quality, count) bins for `base`, in ascending quality
    /// order.
    pub fn iter_quals(&self, base: Base) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.bins[base.index()]
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(score, &count)| (score as u8, count))
    }

    /// Total number of observations recorded for `base`.
    #[must_use]
    pub fn count(&self, base: Base) -> u32 {
        self.bins[base.index()].iter().sum()
    }
}
