use statrs::function::gamma::ln_gamma;

/// Exact upper tail `P(X >= k)` where `X` is the number of successes among
/// independent Bernoulli trials with per-trial success probabilities
/// `probs` (a Poisson-binomial distribution).
///
/// Runs the O(n.k) dynamic program over the truncated outcome distribution:
/// the state keeps `P(X = j)` for `j < k` plus a single absorbing cell for
/// `P(X >= k)`. The absorbing mass only ever grows, so the computation may
/// stop as soon as it exceeds `bail_above`: the final tail can then never
/// come back under the gating threshold. Pass `1.0` to force an exhaustive
/// computation.
#[must_use]
pub fn poisson_binomial_tail(probs: &[f64], k: usize, bail_above: f64) -> f64 {
    if k == 0 {
        return 1.0;
    }
    if k > probs.len() {
        return 0.0;
    }

    // dist[j] = P(X = j) over the trials consumed so far, j < k.
    let mut dist = vec![0.0f64; k];
    dist[0] = 1.0;
    let mut tail = 0.0f64;

    for &p in probs {
        tail += dist[k - 1] * p;
        for j in (1..k).rev() {
            dist[j] = dist[j] * (1.0 - p) + dist[j - 1] * p;
        }
        dist[0] *= 1.0 - p;

        if tail > bail_above {
            return tail.clamp(0.0, 1.0);
        }
    }
    tail.clamp(0.0, 1.0)
}

/// Exact binomial upper tail `P(X >= k)` for `n` trials of homogeneous
/// success probability `p`. Degenerate case of the Poisson-binomial, kept
/// separate because the term recurrence makes it O(n - k) instead of
/// O(n.k).
///
/// The first term is computed through log-gamma to survive coverages of
/// 1e5 and beyond; successive terms follow from
/// `term(j+1) = term(j) * (n-j)/(j+1) * p/(1-p)`.
///
/// Stops accumulating once the partial sum exceeds `bail_above` (see
/// [`poisson_binomial_tail`]) or once terms underflow to zero past the
/// distribution mode.
#[must_use]
pub fn binomial_tail(n: u64, k: u64, p: f64, bail_above: f64) -> f64 {
    if k == 0 {
        return 1.0;
    }
    if k > n || p <= 0.0 {
        return 0.0;
    }
    if p >= 1.0 {
        return 1.0;
    }

    let (nf, kf) = (n as f64, k as f64);
    let ln_choose = ln_gamma(nf + 1.0) - ln_gamma(kf + 1.0) - ln_gamma(nf - kf + 1.0);
    let mut term = f64::exp(ln_choose + kf * p.ln() + (nf - kf) * (1.0 - p).ln());
    let ratio = p / (1.0 - p);

    let mode = nf * p;
    let mut sum = 0.0f64;
    for j in k..=n {
        sum += term;
        if sum > bail_above {
            return sum.clamp(0.0, 1.0);
        }
        if term == 0.0 && j as f64 > mode {
            break;
        }
        term *= (nf - j as f64) / (j as f64 + 1.0) * ratio;
    }
    sum.clamp(0.0, 1.0)
}
