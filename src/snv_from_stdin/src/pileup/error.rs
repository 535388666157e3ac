use thiserror::Error;

use genome::NucleotideError;

#[derive(Error, Debug)]
pub enum PileupError {
    #[error("Missing '{0}' field in pileup line")]
    MissingField(&'static str),

    #[error("Failed to parse position '{0}' (expected a 1-based integer coordinate)")]
    ParseCoord(String),

    #[error("Failed to parse depth '{0}'")]
    ParseDepth(String),

    #[error("Failed to parse reference base '{0}'")]
    ParseRefBase(String),

    #[error("Invalid pileup base character '{0}'")]
    InvalidBaseChar(char),

    #[error("Truncated indel record within pileup base string")]
    TruncatedIndel,

    #[error("Length of base and quality strings differ")]
    UnequalLength,

    #[error(transparent)]
    Nucleotide(#[from] NucleotideError),
}
