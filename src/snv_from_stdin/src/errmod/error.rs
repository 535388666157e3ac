use thiserror::Error;

use genome::Base;

#[derive(Error, Debug)]
pub enum ErrorModelError {
    #[error("Failed to read error-probability file '{0}'")]
    ReadFile(String, #[source] std::io::Error),

    #[error("Empty error-probability file")]
    EmptyModel,

    #[error("Line {line}: expected alternating '<target> <probability>' pairs")]
    MalformedPairs { line: usize },

    #[error("Line {line}: invalid source base '{token}'")]
    InvalidSource { line: usize, token: String },

    #[error("Line {line}: invalid target base '{token}'")]
    InvalidTarget { line: usize, token: String },

    #[error("Line {line}: could not parse probability '{token}'")]
    ParseProb { line: usize, token: String },

    #[error("Line {line}: probability {value} lies outside [0, 1)")]
    ProbOutOfRange { line: usize, value: f64 },

    #[error("Line {line}: a base may not substitute into itself ({base})")]
    SelfSubstitution { line: usize, base: Base },

    #[error("Line {line}: duplicate entry for substitution {from}>{to}")]
    DuplicateEntry { line: usize, from: Base, to: Base },

    #[error("Line {line}: the 4-parameter layout requires a single shared probability, found {a} and {b}")]
    UnequalSharedProb { line: usize, a: f64, b: f64 },

    #[error("File mixes the 4-parameter and 12-parameter layouts")]
    MixedShapes,

    #[error("Incomplete model: missing an entry for substitution {from}>{to}")]
    MissingEntry { from: Base, to: Base },

    #[error("'{0}' is not a valid parameter count (expected 4 or 12)")]
    InvalidParamCount(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmError {
    #[error("Insufficient training data: no usable pileup column was acquired")]
    InsufficientTrainingData,
}
