use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use genome::Base;

pub mod error;
pub use error::{EmError, ErrorModelError};

mod em;
pub use em::{EmTrainer, TrainingColumn};
pub use em::{
    DEFAULT_CONVERGENCE_EPSILON, DEFAULT_MAX_ITERATIONS, INITIAL_ERROR_PROB,
    TRAINING_MIN_COVERAGE, TRAINING_SAMPLE_SIZE,
};

/// Uniform substitution probability assumed when no training data is
/// available and the tolerant fallback is requested.
pub const DEFAULT_ERROR_PROB: f64 = 1e-3;

/// Number of free parameters of an [`ErrorModel`].
///
/// The 4-parameter layout shares one error probability across every
/// base-to-base substitution; the 12-parameter layout keeps an independent
/// probability per ordered (from, to) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelShape { FourParam, TwelveParam }

impl ModelShape {
    #[must_use]
    pub const fn num_param(self) -> u8 {
        match self {
            Self::FourParam   => 4,
            Self::TwelveParam => 12,
        }
    }
}

impl TryFrom<u8> for ModelShape {
    type Error = ErrorModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4  => Ok(Self::FourParam),
            12 => Ok(Self::TwelveParam),
            _  => Err(ErrorModelError::InvalidParamCount(value.to_string())),
        }
    }
}

/// Base-to-base substitution error probabilities.
///
/// Backed by a dense 4x4 matrix indexed by [`Base::index()`], diagonal
/// pinned to zero. Every off-diagonal entry is finite and lies in [0, 1).
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorModel {
    shape: ModelShape,
    probs: [[f64; 4]; 4],
}

impl ErrorModel {
    /// A model assigning the same error probability to all twelve
    /// substitutions.
    #[must_use]
    pub fn uniform(shape: ModelShape, prob: f64) -> Self {
        let mut model = Self { shape, probs: [[0.0; 4]; 4] };
        for from in Base::ALL {
            for to in from.others() {
                model.probs[from.index()][to.index()] = prob;
            }
        }
        model
    }

    #[must_use]
    pub const fn shape(&self) -> ModelShape {
        self.shape
    }

    /// Probability that a true `from` base is called as `to`.
    #[must_use]
    pub fn get(&self, from: Base, to: Base) -> f64 {
        self.probs[from.index()][to.index()]
    }

    pub fn set(&mut self, from: Base, to: Base, prob: f64) {
        debug_assert!(from != to, "the diagonal of an error model is pinned to zero");
        self.probs[from.index()][to.index()] = prob;
    }

    /// Whether every parameter of `self` and `other` agrees within
    /// `epsilon`.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        Base::ALL.into_iter().all(|from| {
            from.others()
                .into_iter()
                .all(|to| (self.get(from, to) - other.get(from, to)).abs() <= epsilon)
        })
    }

    /// Load a model from its whitespace-delimited text form.
    ///
    /// # Errors
    /// See [`ErrorModelError`]; any shape or range violation is fatal.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ErrorModelError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|err| ErrorModelError::ReadFile(path.display().to_string(), err))?;
        contents.parse()
    }

    /// Serialize this model into its text form at `path`.
    ///
    /// # Errors
    /// Forwards the underlying IO error.
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        fs::write(path, self.to_string())
    }

    fn parse_pairs(
        line_no: usize,
        tokens: &[&str],
    ) -> Result<Vec<(Base, f64)>, ErrorModelError> {
        if tokens.is_empty() || tokens.len() % 2 != 0 {
            return Err(ErrorModelError::MalformedPairs { line: line_no });
        }
        let mut pairs = Vec::with_capacity(tokens.len() / 2);
        for chunk in tokens.chunks_exact(2) {
            let target = chunk[0]
                .parse::<Base>()
                .map_err(|_| ErrorModelError::InvalidTarget { line: line_no, token: chunk[0].to_string() })?;
            let prob = chunk[1]
                .parse::<f64>()
                .map_err(|_| ErrorModelError::ParseProb { line: line_no, token: chunk[1].to_string() })?;
            if !prob.is_finite() || !(0.0..1.0).contains(&prob) {
                return Err(ErrorModelError::ProbOutOfRange { line: line_no, value: prob });
            }
            pairs.push((target, prob));
        }
        Ok(pairs)
    }
}

impl FromStr for ErrorModel {
    type Err = ErrorModelError;

    /// Parse the text form: one line per source base, each carrying
    /// alternating `<target> <probability>` pairs. A single line with
    /// source `N` denotes the 4-parameter layout, where every listed
    /// probability must be the shared value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut shape: Option<ModelShape> = None;
        let mut seen = [[false; 4]; 4];
        let mut probs = [[0.0f64; 4]; 4];

        for (idx, line) in s.lines().enumerate() {
            let line_no = idx + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let Some((&source, pairs)) = tokens.split_first() else {
                continue; // blank line
            };
            if source.starts_with('#') {
                continue;
            }

            if source == "N" || source == "n" {
                if shape.is_some() {
                    return Err(ErrorModelError::MixedShapes);
                }
                shape = Some(ModelShape::FourParam);

                let pairs = Self::parse_pairs(line_no, pairs)?;
                let shared = pairs[0].1;
                for &(_, prob) in &pairs {
                    if (prob - shared).abs() > 1e-12 {
                        return Err(ErrorModelError::UnequalSharedProb { line: line_no, a: shared, b: prob });
                    }
                }
                for from in Base::ALL {
                    for to in from.others() {
                        probs[from.index()][to.index()] = shared;
                        seen[from.index()][to.index()] = true;
                    }
                }
                continue;
            }

            let from = source
                .parse::<Base>()
                .map_err(|_| ErrorModelError::InvalidSource { line: line_no, token: source.to_string() })?;
            if shape == Some(ModelShape::FourParam) {
                return Err(ErrorModelError::MixedShapes);
            }
            shape = Some(ModelShape::TwelveParam);

            for (to, prob) in Self::parse_pairs(line_no, pairs)? {
                if to == from {
                    return Err(ErrorModelError::SelfSubstitution { line: line_no, base: from });
                }
                if seen[from.index()][to.index()] {
                    return Err(ErrorModelError::DuplicateEntry { line: line_no, from, to });
                }
                seen[from.index()][to.index()] = true;
                probs[from.index()][to.index()] = prob;
            }
        }

        let Some(shape) = shape else {
            return Err(ErrorModelError::EmptyModel);
        };
        for from in Base::ALL {
            for to in from.others() {
                if !seen[from.index()][to.index()] {
                    return Err(ErrorModelError::MissingEntry { from, to });
                }
            }
        }
        Ok(Self { shape, probs })
    }
}

impl Display for ErrorModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.shape {
            ModelShape::FourParam => {
                let shared = self.get(Base::A, Base::C);
                write!(f, "N")?;
                for to in Base::ALL {
                    write!(f, " {to} {shared}")?;
                }
                writeln!(f)
            }
            ModelShape::TwelveParam => {
                for from in Base::ALL {
                    write!(f, "{from}")?;
                    for to in from.others() {
                        write!(f, " {to} {}", self.get(from, to))?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_from_param_count() {
        assert_eq!(ModelShape::try_from(4).expect("valid"), ModelShape::FourParam);
        assert_eq!(ModelShape::try_from(12).expect("valid"), ModelShape::TwelveParam);
        assert!(ModelShape::try_from(6).is_err());
    }

    #[test]
    fn uniform_model_covers_off_diagonal() {
        let model = ErrorModel::uniform(ModelShape::TwelveParam, 1e-3);
        for from in Base::ALL {
            assert!((model.get(from, from) - 0.0).abs() < f64::EPSILON);
            for to in from.others() {
                assert!((model.get(from, to) - 1e-3).abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn twelve_param_roundtrip() {
        let mut model = ErrorModel::uniform(ModelShape::TwelveParam, 0.0);
        let mut prob = 1e-4;
        for from in Base::ALL {
            for to in from.others() {
                model.set(from, to, prob);
                prob *= 1.5;
            }
        }
        let reloaded: ErrorModel = model.to_string().parse().expect("roundtrip");
        assert_eq!(reloaded.shape(), ModelShape::TwelveParam);
        assert!(model.approx_eq(&reloaded, 1e-12));
    }

    #[test]
    fn four_param_roundtrip() {
        let model = ErrorModel::uniform(ModelShape::FourParam, 2.5e-3);
        let reloaded: ErrorModel = model.to_string().parse().expect("roundtrip");
        assert_eq!(reloaded.shape(), ModelShape::FourParam);
        assert!(model.approx_eq(&reloaded, 1e-12));
    }

    #[test]
    fn file_roundtrip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("error-probs.txt");
        let model = ErrorModel::uniform(ModelShape::TwelveParam, 3.3e-4);
        model.save(&path)?;
        let reloaded = ErrorModel::from_path(&path)?;
        assert!(model.approx_eq(&reloaded, 1e-12));
        Ok(())
    }

    #[test]
    fn parse_four_param_line() {
        let model: ErrorModel = "N A 0.001 C 0.001 G 0.001 T 0.001\n".parse().expect("valid model");
        assert_eq!(model.shape(), ModelShape::FourParam);
        assert!((model.get(Base::G, Base::T) - 0.001).abs() < 1e-15);
    }

    #[test]
    fn parse_rejects_unequal_shared_probs() {
        let got = "N A 0.001 C 0.002 G 0.001 T 0.001".parse::<ErrorModel>();
        assert!(matches!(got, Err(ErrorModelError::UnequalSharedProb { .. })));
    }

    #[test]
    fn parse_rejects_out_of_range_probs() {
        let got = "N A 1.5 C 1.5 G 1.5 T 1.5".parse::<ErrorModel>();
        assert!(matches!(got, Err(ErrorModelError::ProbOutOfRange { .. })));
    }

    #[test]
    fn parse_rejects_incomplete_model() {
        let got = "A C 0.001 G 0.001 T 0.001".parse::<ErrorModel>();
        assert!(matches!(got, Err(ErrorModelError::MissingEntry { .. })));
    }

    #[test]
    fn parse_rejects_self_substitution() {
        let text = "A A 0.001 G 0.001 T 0.001\n\
                    C A 0.001 G 0.001 T 0.001\n\
                    G A 0.001 C 0.001 T 0.001\n\
                    T A 0.001 C 0.001 G 0.001\n";
        assert!(matches!(text.parse::<ErrorModel>(), Err(ErrorModelError::SelfSubstitution { .. })));
    }

    #[test]
    fn parse_rejects_mixed_shapes() {
        let text = "N A 0.001 C 0.001 G 0.001 T 0.001\nA C 0.001 G 0.001 T 0.001\n";
        assert!(matches!(text.parse::<ErrorModel>(), Err(ErrorModelError::MixedShapes)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!("".parse::<ErrorModel>(), Err(ErrorModelError::EmptyModel)));
        assert!(matches!("A C".parse::<ErrorModel>(), Err(ErrorModelError::MalformedPairs { .. })));
        assert!(matches!("X C 0.1".parse::<ErrorModel>(), Err(ErrorModelError::InvalidSource { .. })));
        assert!(matches!("A X 0.1".parse::<ErrorModel>(), Err(ErrorModelError::InvalidTarget { .. })));
        assert!(matches!("A C zero".parse::<ErrorModel>(), Err(ErrorModelError::ParseProb { .. })));
    }
}
