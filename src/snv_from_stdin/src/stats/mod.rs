mod pbinom;
pub use pbinom::{binomial_tail, poisson_binomial_tail};

mod fisher;
pub use fisher::fisher_exact;

mod error;
pub use error::FisherError;
