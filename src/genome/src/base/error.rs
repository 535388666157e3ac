use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Failed to parse '{0}' into a valid nucleobase")]
pub struct ParseBaseError(pub char);
