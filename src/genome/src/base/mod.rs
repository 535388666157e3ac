use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

mod error;
pub use error::ParseBaseError;

/// One of the four unambiguous nucleobases.
///
/// The ambiguity code 'N' is deliberately absent: observations which could
/// not be basecalled are carried as `Option<Base>::None`, and 'N' is never a
/// valid reference, consensus, or variant allele.
///
/// The declaration order (A, C, G, T) is the canonical iteration order used
/// throughout the calling engine, so that candidate evaluation and output
/// are deterministic.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Base { A, C, G, T }

impl Base {
    /// Every base, in canonical (alphabetical) order.
    pub const ALL: [Base; 4] = [Base::A, Base::C, Base::G, Base::T];

    /// Positional index of this base within [`Base::ALL`]. Used to address
    /// fixed-size per-base arrays without hashing.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::C => 1,
            Self::G => 2,
            Self::T => 3,
        }
    }

    /// The three bases this one may be mis-called as, in canonical order.
    #[must_use]
    pub const fn others(self) -> [Base; 3] {
        match self {
            Self::A => [Base::C, Base::G, Base::T],
            Self::C => [Base::A, Base::G, Base::T],
            Self::G => [Base::A, Base::C, Base::T],
            Self::T => [Base::A, Base::C, Base::G],
        }
    }

    /// Parse a pileup character into a maybe-ambiguous base.
    /// 'N' (or 'n') maps to `None`; anything else must be a valid base.
    ///
    /// # Errors
    /// Returns a [`ParseBaseError`] if `value` is neither a base nor 'N'.
    pub fn try_from_ambiguous(value: char) -> Result<Option<Base>, ParseBaseError> {
        match value {
            'N' | 'n' => Ok(None),
            _         => Ok(Some(Base::try_from(value)?)),
        }
    }
}

impl TryFrom<char> for Base {
    type Error = ParseBaseError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'A' | 'a' => Ok(Self::A),
            'C' | 'c' => Ok(Self::C),
            'G' | 'g' => Ok(Self::G),
            'T' | 't' => Ok(Self::T),
            _         => Err(ParseBaseError(value)),
        }
    }
}

impl FromStr for Base {
    type Err = ParseBaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let char = s.parse::<char>().map_err(|_| ParseBaseError('\0'))?;
        Self::try_from(char)
    }
}

impl From<Base> for char {
    fn from(value: Base) -> Self {
        match value {
            Base::A => 'A',
            Base::C => 'C',
            Base::G => 'G',
            Base::T => 'T',
        }
    }
}

impl Display for Base {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&char::from(*self), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_matches_indices() {
        for (i, base) in Base::ALL.iter().enumerate() {
            assert_eq!(base.index(), i);
        }
    }

    #[test]
    fn try_from_char() {
        for (char, want) in [('A', Base::A), ('c', Base::C), ('G', Base::G), ('t', Base::T)] {
            assert_eq!(Base::try_from(char).expect("valid base"), want);
        }
    }

    #[test]
    fn try_from_invalid_char() {
        for char in ['N', '*', '.', 'x'] {
            assert_eq!(Base::try_from(char), Err(ParseBaseError(char)));
        }
    }

    #[test]
    fn try_from_ambiguous() {
        assert_eq!(Base::try_from_ambiguous('N'), Ok(None));
        assert_eq!(Base::try_from_ambiguous('n'), Ok(None));
        assert_eq!(Base::try_from_ambiguous('g'), Ok(Some(Base::G)));
        assert!(Base::try_from_ambiguous('?').is_err());
    }

    #[test]
    fn others_skip_self() {
        for base in Base::ALL {
            let others = base.others();
            assert_eq!(others.len(), 3);
            assert!(!others.contains(&base));
        }
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}>{}", Base::A, Base::G), "A>G");
    }
}
