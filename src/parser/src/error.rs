use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Nothing to do: the quality-aware and quality-agnostic callers are both switched off")]
    InvalidCallerConfig,

    #[error("--sig-thresh must lie within (0, 1], got '{0}'")]
    ParseSigThresh(String),

    #[error("--bonf must be an integer greater than 0, got '{0}'")]
    ParseBonf(String),

    #[error("'{0}' is not a valid parameter count for --em-num-param (expected 4 or 12)")]
    ParseNumParam(String),

    #[error("Neither --pileup nor the stdin buffer provides any input")]
    MissingPileupInput,

    #[error("File {0} does not exist")]
    MissingFile(String),

    #[error("{0} is not a regular file")]
    NotAFile(String),
}
