mod error;
pub use error::PileupError;

#[allow(clippy::module_inception)]
mod pileup;
pub use pileup::PileupColumn;
