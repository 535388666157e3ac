use statrs::function::gamma::ln_gamma;

use super::FisherError;

/// Relative slack when comparing table probabilities against the observed
/// one. Tables whose probability exceeds the observed by less than this
/// factor are still counted, absorbing log-gamma rounding noise.
const REL_ERROR: f64 = 1.0 + 1e-7;

fn ln_factorial(x: u64) -> f64 {
    ln_gamma(x as f64 + 1.0)
}

/// Two-tailed Fisher exact test on the 2x2 contingency table
/// `[[a, b], [c, d]]`.
///
/// Enumerates every table sharing the observed row and column margins and
/// sums the hypergeometric probabilities of those at most as probable as
/// the observed table. All factorials go through log-gamma, so row sums in
/// the 1e6 range neither overflow nor underflow.
///
/// # Errors
/// [`FisherError::DegenerateTable`] when any row or column margin is zero:
/// the hypergeometric law then admits a single table and no test is
/// meaningful.
pub fn fisher_exact(a: u64, b: u64, c: u64, d: u64) -> Result<f64, FisherError> {
    let row1 = a + b;
    let row2 = c + d;
    let col1 = a + c;
    let col2 = b + d;
    if row1 == 0 || row2 == 0 || col1 == 0 || col2 == 0 {
        return Err(FisherError::DegenerateTable);
    }
    let total = row1 + row2;

    // ln P(x in the top-left cell), margins fixed.
    let ln_norm = ln_factorial(row1) + ln_factorial(row2) + ln_factorial(col1)
        + ln_factorial(col2)
        - ln_factorial(total);
    let ln_prob = |x: u64| -> f64 {
        ln_norm
            - ln_factorial(x)
            - ln_factorial(row1 - x)
            - ln_factorial(col1 - x)
            - ln_factorial(row2 - (col1 - x))
    };

    let lo = col1.saturating_sub(row2);
    let hi = row1.min(col1);

    let observed = ln_prob(a).exp();
    let cutoff = observed * REL_ERROR;

    let mut pvalue = 0.0f64;
    for x in lo..=hi {
        let prob = ln_prob(x).exp();
        if prob <= cutoff {
            pvalue += prob;
        }
    }
    Ok(pvalue.clamp(0.0, 1.0))
}
