//! Mann-Whitney U rank test behind a capability switch
//!
//! The test is optional. `RankTest::detect()` resolves once, at process start,
//! whether it can run in this build. When it cannot, or when either side has
//! no observations, the outcome carries undefined markers instead of failing.

use serde::{Deserialize, Serialize};

/// Smaller-sample size up to which the exact U distribution is used (no ties)
pub const EXACT_MAX_SMALLER_SAMPLE: usize = 8;

/// Availability of the two-sample rank test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankTest {
    /// Returns the U statistic and two-sided p-value
    Available,
    /// Returns undefined statistic and p-value
    Unavailable,
}

/// Result of one rank test
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RankTestOutcome {
    /// U statistic of the first sample
    pub u_statistic: Option<f64>,
    pub p_value: Option<f64>,
}

impl RankTest {
    /// Capability of this build
    pub fn detect() -> Self {
        if cfg!(feature = "rank-test") {
            RankTest::Available
        } else {
            RankTest::Unavailable
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, RankTest::Available)
    }

    /// Two-sided test of `a` against `b`
    pub fn compare(&self, a: &[f64], b: &[f64]) -> RankTestOutcome {
        match self {
            RankTest::Unavailable => RankTestOutcome::default(),
            #[cfg(feature = "rank-test")]
            RankTest::Available => mann_whitney_u(a, b),
            #[cfg(not(feature = "rank-test"))]
            RankTest::Available => {
                let _ = (a, b);
                RankTestOutcome::default()
            }
        }
    }
}

#[cfg(feature = "rank-test")]
fn mann_whitney_u(a: &[f64], b: &[f64]) -> RankTestOutcome {
    let a: Vec<f64> = a.iter().copied().filter(|v| v.is_finite()).collect();
    let b: Vec<f64> = b.iter().copied().filter(|v| v.is_finite()).collect();
    let (n1, n2) = (a.len(), b.len());
    if n1 == 0 || n2 == 0 {
        return RankTestOutcome::default();
    }

    let ranked = rank(&a, &b);
    let r1: f64 = ranked.ranks[..n1].iter().sum();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;
    let u = u1.max(u2);

    let has_ties = ranked.tie_sizes.iter().any(|&t| t > 1);
    let p = if !has_ties && n1.min(n2) <= EXACT_MAX_SMALLER_SAMPLE {
        exact_p_value(u, n1, n2)
    } else {
        asymptotic_p_value(u, n1, n2, &ranked.tie_sizes)
    };

    RankTestOutcome {
        u_statistic: Some(u1),
        p_value: p.map(|p| p.clamp(0.0, 1.0)),
    }
}

#[cfg(feature = "rank-test")]
struct Ranked {
    /// Average ranks, `a` first then `b`
    ranks: Vec<f64>,
    tie_sizes: Vec<usize>,
}

/// Average (mid) ranks of the pooled samples
#[cfg(feature = "rank-test")]
fn rank(a: &[f64], b: &[f64]) -> Ranked {
    let pooled: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    let mut order: Vec<usize> = (0..pooled.len()).collect();
    order.sort_by(|&i, &j| pooled[i].total_cmp(&pooled[j]));

    let mut ranks = vec![0.0; pooled.len()];
    let mut tie_sizes = Vec::new();
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && pooled[order[end]] == pooled[order[start]] {
            end += 1;
        }
        // ranks are 1-based: positions start..end share the mean of start+1..=end
        let average = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = average;
        }
        tie_sizes.push(end - start);
        start = end;
    }

    Ranked { ranks, tie_sizes }
}

/// Two-sided p from the exact null distribution of U
#[cfg(feature = "rank-test")]
fn exact_p_value(u: f64, n1: usize, n2: usize) -> Option<f64> {
    let counts = u_distribution(n1.min(n2), n1.max(n2));
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let k = u.round() as usize;
    let upper: f64 = counts.iter().skip(k).sum();
    Some(2.0 * upper / total)
}

/// Number of arrangements giving each U value: the coefficients of the
/// Gaussian binomial `[m + n choose m]_q`, computed as a truncated power series.
#[cfg(feature = "rank-test")]
fn u_distribution(m: usize, n: usize) -> Vec<f64> {
    let len = m * n + 1;
    let mut coeffs = vec![0.0; len];
    coeffs[0] = 1.0;

    for i in 1..=m {
        // multiply by (1 - q^(n + i))
        let shift = n + i;
        for k in (shift..len).rev() {
            coeffs[k] -= coeffs[k - shift];
        }
        // divide by (1 - q^i)
        for k in i..len {
            coeffs[k] += coeffs[k - i];
        }
    }
    coeffs
}

/// Two-sided p from the normal approximation with tie and continuity correction
#[cfg(feature = "rank-test")]
fn asymptotic_p_value(u: f64, n1: usize, n2: usize, tie_sizes: &[usize]) -> Option<f64> {
    use statrs::distribution::{ContinuousCDF, Normal};

    let n = (n1 + n2) as f64;
    let mu = (n1 * n2) as f64 / 2.0;
    let tie_term: f64 = tie_sizes
        .iter()
        .map(|&t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum();
    let variance = (n1 * n2) as f64 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));

    if variance.is_nan() || variance <= 0.0 {
        // every observation tied: no evidence of a difference
        return Some(1.0);
    }

    let z = (u - mu - 0.5) / variance.sqrt();
    let standard = Normal::new(0.0, 1.0).ok()?;
    Some(2.0 * standard.sf(z))
}
