//! Two-sided Mann-Whitney U (Wilcoxon rank-sum) test.
//!
//! Small samples without ties use the exact null distribution of U; all other
//! cases use the normal approximation with tie and continuity correction.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Largest smaller-group size for which the exact distribution is used.
const EXACT_MAX_SIZE: usize = 8;

/// How the p-value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MannWhitneyMethod {
    Exact,
    Asymptotic,
}

/// Result of one rank-sum test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MannWhitneyResult {
    /// `max(U1, U2)`.
    pub statistic: f64,
    /// Two-sided p-value in `[0, 1]`.
    pub p_value: f64,
    pub method: MannWhitneyMethod,
}

/// Average ranks (1-based) of the pooled sample, plus the tie term
/// `sum(t^3 - t)` over groups of tied values.
fn pooled_ranks(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = avg_rank;
        }
        let t = (j - i + 1) as f64;
        tie_term += t * t * t - t;
        i = j + 1;
    }
    (ranks, tie_term)
}

/// Frequencies of each value of U under the null for group sizes `m` and `n`
/// (coefficients of the Gaussian binomial `[m + n choose m]_q`).
fn exact_counts(m: usize, n: usize) -> Vec<f64> {
    let max_u = m * n;
    let mut counts = vec![0.0; max_u + m + 1];
    counts[0] = 1.0;
    for i in 1..=m {
        let shift = n + i;
        for k in (shift..counts.len()).rev() {
            counts[k] -= counts[k - shift];
        }
        for k in i..counts.len() {
            counts[k] += counts[k - i];
        }
    }
    counts.truncate(max_u + 1);
    counts
}

/// `P(U >= u)` under the null.
fn exact_sf(u: usize, m: usize, n: usize) -> f64 {
    let counts = exact_counts(m.min(n), m.max(n));
    let total: f64 = counts.iter().sum();
    let upper: f64 = counts.iter().skip(u).sum();
    upper / total
}

/// Two-sided Mann-Whitney U test of `x` against `y`.
///
/// Returns `None` when the test is undefined: an empty group, or a pooled
/// sample with no rank variance.
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> Option<MannWhitneyResult> {
    let (n1, n2) = (x.len(), y.len());
    if n1 == 0 || n2 == 0 {
        return None;
    }

    let pooled: Vec<f64> = x.iter().chain(y).copied().collect();
    let (ranks, tie_term) = pooled_ranks(&pooled);
    let r1: f64 = ranks[..n1].iter().sum();

    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let u1 = r1 - n1f * (n1f + 1.0) / 2.0;
    let u2 = n1f * n2f - u1;
    let u = u1.max(u2);

    if n1.min(n2) <= EXACT_MAX_SIZE && tie_term == 0.0 {
        let p = 2.0 * exact_sf(u.round() as usize, n1, n2);
        return Some(MannWhitneyResult {
            statistic: u,
            p_value: p.min(1.0),
            method: MannWhitneyMethod::Exact,
        });
    }

    let n = n1f + n2f;
    let mu = n1f * n2f / 2.0;
    let variance = n1f * n2f / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if variance.is_nan() || variance <= 0.0 {
        return None;
    }
    let z = (u - mu - 0.5) / variance.sqrt();
    let normal = Normal::new(0.0, 1.0).ok()?;
    let p = 2.0 * normal.sf(z);

    Some(MannWhitneyResult {
        statistic: u,
        p_value: p.clamp(0.0, 1.0),
        method: MannWhitneyMethod::Asymptotic,
    })
}

/// Two-sided p-value, with undefined tests reported as 1.
pub fn rank_sum_p_value(x: &[f64], y: &[f64]) -> f64 {
    mann_whitney_u(x, y).map(|r| r.p_value).unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_counts_sum() {
        // C(7, 3) arrangements.
        let counts = exact_counts(3, 4);
        assert_eq!(counts.len(), 13);
        assert_relative_eq!(counts.iter().sum::<f64>(), 35.0);
        // Symmetric around m * n / 2.
        for k in 0..counts.len() {
            assert_relative_eq!(counts[k], counts[12 - k]);
        }
    }

    #[test]
    fn test_exact_complete_separation() {
        let result = mann_whitney_u(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(result.method, MannWhitneyMethod::Exact);
        assert_relative_eq!(result.statistic, 9.0);
        // 2 / C(6, 3)
        assert_relative_eq!(result.p_value, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_exact_is_symmetric_in_arguments() {
        let x = [0.2, 1.4, 3.3, 0.9];
        let y = [2.1, 4.5, 5.0, 3.9, 2.8];
        let a = mann_whitney_u(&x, &y).unwrap();
        let b = mann_whitney_u(&y, &x).unwrap();
        assert_relative_eq!(a.p_value, b.p_value, epsilon = 1e-12);
        assert_relative_eq!(a.statistic, 18.0);
        // P(U >= 18) for sizes 4 and 5 is 4 / 126.
        assert_relative_eq!(a.p_value, 8.0 / 126.0, epsilon = 1e-12);
    }

    #[test]
    fn test_asymptotic_with_ties() {
        let x = [1.0, 2.0, 2.0, 3.0];
        let y = [2.0, 3.0, 4.0, 5.0];
        let result = mann_whitney_u(&x, &y).unwrap();
        assert_eq!(result.method, MannWhitneyMethod::Asymptotic);
        assert_relative_eq!(result.statistic, 13.5);
        // z = (13.5 - 8 - 0.5) / sqrt(16 / 12 * (9 - 30 / 56))
        let sd = (16.0_f64 / 12.0 * (9.0 - 30.0 / 56.0)).sqrt();
        let normal = Normal::new(0.0, 1.0).unwrap();
        assert_relative_eq!(result.p_value, 2.0 * normal.sf(5.0 / sd), epsilon = 1e-12);
    }

    #[test]
    fn test_asymptotic_large_groups() {
        let x: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..12).map(|i| i as f64 + 6.5).collect();
        let result = mann_whitney_u(&x, &y).unwrap();
        assert_eq!(result.method, MannWhitneyMethod::Asymptotic);
        assert!(result.p_value > 0.0 && result.p_value < 0.05);
    }

    #[test]
    fn test_undefined_cases() {
        assert!(mann_whitney_u(&[], &[1.0]).is_none());
        assert!(mann_whitney_u(&[5.0], &[5.0]).is_none());
        assert!(mann_whitney_u(&[0.0, 0.0], &[0.0, 0.0, 0.0]).is_none());
        assert_eq!(rank_sum_p_value(&[5.0], &[5.0]), 1.0);
        assert_eq!(rank_sum_p_value(&[1.0, 2.0], &[]), 1.0);
    }

    #[test]
    fn test_identical_distributions() {
        let p = rank_sum_p_value(&[1.0, 2.0, 3.0, 4.0], &[1.5, 2.5, 3.5, 0.5]);
        assert!(p > 0.5 && p <= 1.0);
    }
}
