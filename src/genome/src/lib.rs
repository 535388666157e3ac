pub mod base;
pub use base::{Base, ParseBaseError};

pub mod strand;
pub use strand::Strand;

pub mod nucleotide;
pub use nucleotide::{Nucleotide, NucleotideError};
pub use nucleotide::phred::{prob_to_phred, Phred, PHRED_ASCII_BASE};

pub mod counts;
pub use counts::{BaseCounts, QualHist, StrandBaseCounts};
