use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExcludeError {
    #[error("Line {line}: expected at least '<start> <end>'")]
    MissingBound { line: usize },

    #[error("Line {line}: failed to parse coordinate '{token}'")]
    ParseBound { line: usize, token: String },

    #[error("Line {line}: empty or inverted range [{start}, {end})")]
    InvertedRange { line: usize, start: u64, end: u64 },
}
