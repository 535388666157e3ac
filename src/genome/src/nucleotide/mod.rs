use crate::base::Base;
use crate::strand::Strand;

pub mod error;
pub use error::NucleotideError;

pub mod phred;
pub use phred::{Phred, PHRED_ASCII_BASE};

/// A single read-base observation at a pileup column.
/// - base   : the called base; `None` when the basecaller emitted 'N'.
/// - phred  : base quality, Phred-33 scale.
/// - strand : strand of the read the observation came from.
#[derive(Debug, Clone, Copy)]
pub struct Nucleotide {
    pub base  : Option<Base>,
    pub phred : Phred,
    pub strand: Strand,
}

impl Nucleotide {
    #[must_use]
    pub fn new(base: Option<Base>, phred: impl Into<Phred>, strand: Strand) -> Self {
        Self { base, phred: phred.into(), strand }
    }

    /// Build an observation from raw pileup characters, validating the
    /// quality character against the Phred+33 printable range.
    ///
    /// # Errors
    /// - [`NucleotideError::ParseBase`] if `base` is not in [ACGTNacgtn]
    /// - [`NucleotideError::InvalidQuality`] if `score` is outside '!'..='~'
    pub fn try_new(base: char, score: char, strand: Strand) -> Result<Self, NucleotideError> {
        if !(PHRED_ASCII_BASE..=126).contains(&(score as u8)) || !score.is_ascii() {
            return Err(NucleotideError::InvalidQuality(score));
        }
        let base = Base::try_from_ambiguous(base)?;
        Ok(Self::new(base, score, strand))
    }

    /// Sequencing error probability of this observation.
    #[must_use]
    pub fn error_prob(&self) -> f64 {
        self.phred.as_prob()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn score_convert() -> Result<()> {
        for score in 0..=Phred::MAX_SCORE {
            let ascii_score = (score + PHRED_ASCII_BASE) as char;
            let nucleotide = Nucleotide::try_new('A', ascii_score, Strand::Forward)?;
            assert_eq!(nucleotide.phred, Phred::new(ascii_score));
        }
        Ok(())
    }

    #[test]
    fn reject_out_of_range_quality() {
        let got = Nucleotide::try_new('A', ' ', Strand::Forward);
        assert_eq!(got.err(), Some(NucleotideError::InvalidQuality(' ')));
    }

    #[test]
    fn ambiguous_base_is_none() -> Result<()> {
        let nucleotide = Nucleotide::try_new('N', 'I', Strand::Reverse)?;
        assert_eq!(nucleotide.base, None);
        Ok(())
    }

    #[test]
    fn compute_error_prob() -> Result<()> {
        use float_cmp::assert_approx_eq;
        let scores         = [0u8, 10,  20,   30,    40   ];
        let expected_probs = [1.0, 0.1, 0.01, 0.001, 0.0001];

        for (score, expected) in scores.iter().zip(expected_probs) {
            let ascii_score = (score + PHRED_ASCII_BASE) as char;
            let nucleotide = Nucleotide::try_new('A', ascii_score, Strand::Forward)?;
            assert_approx_eq!(f64, nucleotide.error_prob(), expected, epsilon = 1e-15);
        }
        Ok(())
    }
}
