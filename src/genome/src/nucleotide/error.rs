use thiserror::Error;

use crate::base::ParseBaseError;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NucleotideError {
    #[error(transparent)]
    ParseBase(#[from] ParseBaseError),

    #[error("Invalid Phred+33 quality character '{0}'")]
    InvalidQuality(char),
}
