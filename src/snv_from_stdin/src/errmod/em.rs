use log::{debug, trace};

use genome::{Base, BaseCounts};

use super::{EmError, ErrorModel, ModelShape};

/// Number of pileup columns sampled from the head of the stream for
/// training.
pub const TRAINING_SAMPLE_SIZE: usize = 10_000;

/// Minimum post-filter coverage for a column to enter the training sample.
pub const TRAINING_MIN_COVERAGE: u32 = 10;

/// Convergence criterion: largest absolute parameter change between two
/// iterations.
pub const DEFAULT_CONVERGENCE_EPSILON: f64 = 1e-6;

pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Uniform starting value for every substitution probability.
pub const INITIAL_ERROR_PROB: f64 = 1e-3;

/// One column of the training sample: quality-filtered base tallies and the
/// (unambiguous) consensus they were called against.
#[derive(Debug, Clone, Copy)]
pub struct TrainingColumn {
    pub counts: BaseCounts,
    pub cons  : Base,
}

impl TrainingColumn {
    #[must_use]
    pub fn new(counts: BaseCounts, cons: Base) -> Self {
        Self { counts, cons }
    }
}

/// Expectation-maximization estimator for an [`ErrorModel`].
///
/// Observations at a column with consensus `c` are modeled as a mixture:
/// a non-consensus base `b` is either a true variant (with a per-column
/// allele frequency treated as a nuisance and maximised in closed form)
/// or a sequencing error, with probability `e(c>b)` shared across columns.
/// The E-step splits each non-consensus tally between the two explanations;
/// the M-step re-estimates `e(c>b)` as expected errors over expected
/// true-source observations. Sufficient statistics are kept per (from, to)
/// pair, and summed before normalisation under the 4-parameter layout.
#[derive(Debug, Clone, Copy)]
pub struct EmTrainer {
    shape         : ModelShape,
    epsilon       : f64,
    max_iterations: u32,
}

impl EmTrainer {
    #[must_use]
    pub fn new(shape: ModelShape) -> Self {
        Self {
            shape,
            epsilon       : DEFAULT_CONVERGENCE_EPSILON,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Run the EM loop over `sample` until convergence or the iteration
    /// cap.
    ///
    /// # Errors
    /// [`EmError::InsufficientTrainingData`] when the sample contains no
    /// usable column.
    pub fn train(&self, sample: &[TrainingColumn]) -> Result<ErrorModel, EmError> {
        if sample.iter().all(|column| column.counts.coverage() == 0) {
            return Err(EmError::InsufficientTrainingData);
        }

        let mut model = ErrorModel::uniform(self.shape, INITIAL_ERROR_PROB);
        for iteration in 0..self.max_iterations {
            let (errors, true_sources) = Self::expectation(&model, sample);
            let delta = self.maximization(&mut model, &errors, &true_sources);

            trace!("EM iteration {iteration}: max parameter change = {delta:e}");
            if delta <= self.epsilon {
                debug!("EM converged after {} iteration(s)", iteration + 1);
                break;
            }
        }
        Ok(model)
    }

    /// E-step: per (from, to) pair, the expected number of error
    /// observations; per source, the expected number of observations truly
    /// carrying that base (consensus tallies plus everything explained as
    /// error).
    fn expectation(model: &ErrorModel, sample: &[TrainingColumn]) -> ([[f64; 4]; 4], [f64; 4]) {
        let mut errors = [[0.0f64; 4]; 4];
        let mut true_sources = [0.0f64; 4];

        for column in sample {
            let coverage = f64::from(column.counts.coverage());
            if coverage == 0.0 {
                continue;
            }
            let cons = column.cons;
            let mut expected_true = f64::from(column.counts[cons]);

            for alt in cons.others() {
                let count = f64::from(column.counts[alt]);
                if count == 0.0 {
                    continue;
                }
                let error_prob = model.get(cons, alt);
                // Nuisance per-column variant frequency, maximised in
                // closed form.
                let variant_freq = (count / coverage - error_prob).max(0.0);
                let responsibility = if error_prob + variant_freq > 0.0 {
                    error_prob / (error_prob + variant_freq)
                } else {
                    1.0
                };
                let expected_errors = count * responsibility;
                errors[cons.index()][alt.index()] += expected_errors;
                expected_true += expected_errors;
            }
            true_sources[cons.index()] += expected_true;
        }
        (errors, true_sources)
    }

    /// M-step: update the model in place, returning the largest absolute
    /// parameter change.
    fn maximization(
        &self,
        model: &mut ErrorModel,
        errors: &[[f64; 4]; 4],
        true_sources: &[f64; 4],
    ) -> f64 {
        let mut delta = 0.0f64;
        match self.shape {
            ModelShape::TwelveParam => {
                for from in Base::ALL {
                    if true_sources[from.index()] <= 0.0 {
                        continue; // no column with this consensus: keep the previous estimate
                    }
                    for to in from.others() {
                        let updated = errors[from.index()][to.index()] / true_sources[from.index()];
                        delta = delta.max((updated - model.get(from, to)).abs());
                        model.set(from, to, updated);
                    }
                }
            }
            ModelShape::FourParam => {
                let mut numerator = 0.0f64;
                let mut denominator = 0.0f64;
                for from in Base::ALL {
                    for to in from.others() {
                        numerator += errors[from.index()][to.index()];
                        denominator += true_sources[from.index()];
                    }
                }
                if denominator > 0.0 {
                    let updated = numerator / denominator;
                    for from in Base::ALL {
                        for to in from.others() {
                            delta = delta.max((updated - model.get(from, to)).abs());
                            model.set(from, to, updated);
                        }
                    }
                }
            }
        }
        delta
    }

    /// Log-likelihood of `sample` under `model`, with each column's
    /// nuisance variant frequency maximised the same way the E-step does.
    /// Exposed so the non-decreasing-likelihood property can be asserted.
    #[must_use]
    pub fn log_likelihood(model: &ErrorModel, sample: &[TrainingColumn]) -> f64 {
        let mut total = 0.0f64;
        for column in sample {
            let coverage = f64::from(column.counts.coverage());
            if coverage == 0.0 {
                continue;
            }
            let cons = column.cons;
            let mut cons_prob = 1.0f64;
            for alt in cons.others() {
                let count = f64::from(column.counts[alt]);
                let error_prob = model.get(cons, alt);
                let variant_freq = (count / coverage - error_prob).max(0.0);
                let alt_prob = error_prob + variant_freq;
                cons_prob -= alt_prob;
                if count > 0.0 {
                    total += count * alt_prob.max(f64::MIN_POSITIVE).ln();
                }
            }
            let cons_count = f64::from(column.counts[cons]);
            if cons_count > 0.0 {
                total += cons_count * cons_prob.max(f64::MIN_POSITIVE).ln();
            }
        }
        total
    }
}
