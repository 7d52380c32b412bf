//! Benjamini-Hochberg false discovery rate correction.

use serde::{Deserialize, Serialize};

/// Result of BH correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BhCorrected {
    /// Feature IDs in input order.
    pub feature_ids: Vec<String>,
    /// Raw p-values.
    pub p_values: Vec<f64>,
    /// Adjusted p-values (q-values), same order.
    pub q_values: Vec<f64>,
    pub n_tests: usize,
}

impl BhCorrected {
    /// Get q-value for a specific feature.
    pub fn get_qvalue(&self, feature_id: &str) -> Option<f64> {
        let idx = self.feature_ids.iter().position(|f| f == feature_id)?;
        self.q_values.get(idx).copied()
    }

    /// Count significant results at a threshold.
    pub fn n_significant(&self, alpha: f64) -> usize {
        self.q_values.iter().filter(|&&q| q < alpha).count()
    }
}

/// Apply Benjamini-Hochberg FDR correction.
///
/// For p-values sorted ascending, `q[i] = min(p[i] * n / (i + 1), q[i + 1])`,
/// capped at 1. Returned q-values are in input order, so `q >= p` holds
/// element-wise.
pub fn correct_bh(p_values: &[f64], feature_ids: &[String]) -> BhCorrected {
    let n = p_values.len();
    if n == 0 {
        return BhCorrected {
            feature_ids: vec![],
            p_values: vec![],
            q_values: vec![],
            n_tests: 0,
        };
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    let mut q_sorted = vec![0.0; n];
    let n_f64 = n as f64;
    q_sorted[n - 1] = p_values[indices[n - 1]].min(1.0);
    for i in (0..n - 1).rev() {
        let rank = (i + 1) as f64;
        let adjusted = p_values[indices[i]] * n_f64 / rank;
        q_sorted[i] = adjusted.min(q_sorted[i + 1]).min(1.0);
    }

    let mut q_values = vec![0.0; n];
    for (i, &orig_idx) in indices.iter().enumerate() {
        q_values[orig_idx] = q_sorted[i];
    }

    BhCorrected {
        feature_ids: feature_ids.to_vec(),
        p_values: p_values.to_vec(),
        q_values,
        n_tests: n,
    }
}
