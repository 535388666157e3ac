use std::fmt::{self, Display, Formatter};

/// Strand of origin of a read base. Forward-strand observations come from
/// '.' and uppercase pileup characters, reverse-strand observations from
/// ',' and lowercase characters.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum Strand { Forward, Reverse }

impl Display for Strand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "+"),
            Self::Reverse => write!(f, "-"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(format!("{}{}", Strand::Forward, Strand::Reverse), "+-");
    }
}
