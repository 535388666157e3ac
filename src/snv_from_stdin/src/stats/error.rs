use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FisherError {
    #[error("Every row and column margin of the 2x2 contingency table must be non-zero")]
    DegenerateTable,
}
