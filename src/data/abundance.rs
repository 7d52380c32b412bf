//! Sparse taxon-abundance table (features × samples).

use crate::error::{MetnetError, Result};
use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Observed abundances of taxonomic features across samples.
///
/// Rows represent features (ASVs/OTUs), columns represent samples. Values are
/// non-negative frequencies; zeros are not stored.
#[derive(Debug, Clone)]
pub struct AbundanceTable {
    /// Sparse matrix in CSR format (features × samples)
    data: CsMat<f64>,
    feature_ids: Vec<String>,
    sample_ids: Vec<String>,
}

impl AbundanceTable {
    /// Create a new table from a sparse matrix and identifiers.
    pub fn new(data: CsMat<f64>, feature_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != feature_ids.len() {
            return Err(MetnetError::DimensionMismatch {
                expected: nrows,
                actual: feature_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(MetnetError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        Ok(Self {
            data,
            feature_ids,
            sample_ids,
        })
    }

    /// Build a table from dense rows (one `Vec` per feature).
    pub fn from_rows(
        rows: &[Vec<f64>],
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let n_samples = sample_ids.len();
        let mut tri_mat = TriMat::new((rows.len(), n_samples));
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n_samples {
                return Err(MetnetError::DimensionMismatch {
                    expected: n_samples,
                    actual: values.len(),
                });
            }
            for (col, &value) in values.iter().enumerate() {
                check_value(value, &value.to_string(), row, col)?;
                if value > 0.0 {
                    tri_mat.add_triplet(row, col, value);
                }
            }
        }
        Self::new(tri_mat.to_csr(), feature_ids, sample_ids)
    }

    /// Load an abundance table from a TSV file.
    ///
    /// Expected format:
    /// - Optional leading lines starting with `#` (e.g. a biom export banner)
    /// - Header row with sample IDs (first column is the feature ID header)
    /// - Subsequent rows: feature ID followed by abundances
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader
            .lines()
            .filter(|l| l.as_ref().map(|s| !is_comment(s)).unwrap_or(true));

        let header_line = lines
            .next()
            .ok_or_else(|| MetnetError::EmptyData("Empty abundance table".to_string()))??;
        let header: Vec<&str> = header_line.trim_start_matches('#').split('\t').collect();
        if header.len() < 2 {
            return Err(MetnetError::EmptyData(
                "Abundance table must have at least one sample".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();
        let n_samples = sample_ids.len();

        let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
        let mut feature_ids: Vec<String> = Vec::new();

        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let row_idx = feature_ids.len();
            feature_ids.push(fields[0].trim().to_string());

            for (col_idx, value_str) in fields[1..].iter().enumerate() {
                if col_idx >= n_samples {
                    break;
                }
                let value: f64 =
                    value_str
                        .trim()
                        .parse()
                        .map_err(|_| MetnetError::InvalidAbundance {
                            value: value_str.to_string(),
                            row: row_idx,
                            col: col_idx,
                        })?;
                check_value(value, value_str, row_idx, col_idx)?;
                if value > 0.0 {
                    triplets.push((row_idx, col_idx, value));
                }
            }
        }

        let n_features = feature_ids.len();
        if n_features == 0 {
            return Err(MetnetError::EmptyData("No features in abundance table".to_string()));
        }

        let mut tri_mat = TriMat::new((n_features, n_samples));
        for (row, col, val) in triplets {
            tri_mat.add_triplet(row, col, val);
        }

        Self::new(tri_mat.to_csr(), feature_ids, sample_ids)
    }

    /// Write the table to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "feature_id")?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        writeln!(writer)?;

        for (row_idx, feature_id) in self.feature_ids.iter().enumerate() {
            write!(writer, "{}", feature_id)?;
            for value in self.row_dense(row_idx) {
                write!(writer, "\t{}", value)?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    /// Get the value at (row, col), returning 0 for missing entries.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data.get(row, col).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.rows()
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.cols()
    }

    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Dense copy of one feature's abundances.
    pub fn row_dense(&self, row: usize) -> Vec<f64> {
        let mut dense = vec![0.0; self.n_samples()];
        if let Some(row_vec) = self.data.outer_view(row) {
            for (col, &val) in row_vec.iter() {
                dense[col] = val;
            }
        }
        dense
    }

    /// Total abundance per sample.
    pub fn col_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_samples()];
        for row_vec in self.data.outer_iterator() {
            for (col, &val) in row_vec.iter() {
                sums[col] += val;
            }
        }
        sums
    }

    /// Total abundance per feature.
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.n_features())
            .into_par_iter()
            .map(|row| {
                self.data
                    .outer_view(row)
                    .map(|v| v.iter().map(|(_, &val)| val).sum())
                    .unwrap_or(0.0)
            })
            .collect()
    }

    /// Swap the feature and sample axes.
    pub fn transpose(&self) -> Self {
        Self {
            data: self.data.transpose_view().to_csr(),
            feature_ids: self.sample_ids.clone(),
            sample_ids: self.feature_ids.clone(),
        }
    }

    /// Subset the table to the given samples (by ID), in the given order.
    pub fn subset_samples(&self, sample_ids: &[String]) -> Result<Self> {
        let lookup: HashMap<&str, usize> = self
            .sample_ids
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        let mut col_map = HashMap::with_capacity(sample_ids.len());
        for (new_col, sid) in sample_ids.iter().enumerate() {
            let old_col = lookup.get(sid.as_str()).ok_or_else(|| {
                MetnetError::SampleMismatch(format!("Sample '{}' not found in abundance table", sid))
            })?;
            col_map.insert(*old_col, new_col);
        }

        let mut tri_mat = TriMat::new((self.n_features(), sample_ids.len()));
        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            for (old_col, &val) in row_vec.iter() {
                if let Some(&new_col) = col_map.get(&old_col) {
                    tri_mat.add_triplet(row, new_col, val);
                }
            }
        }

        Self::new(tri_mat.to_csr(), self.feature_ids.clone(), sample_ids.to_vec())
    }
}

fn is_comment(line: &str) -> bool {
    // "#OTU ID" is the header of a biom TSV export, not a comment.
    line.starts_with('#') && !line.starts_with("#OTU")
}

fn check_value(value: f64, raw: &str, row: usize, col: usize) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(MetnetError::InvalidAbundance {
            value: raw.to_string(),
            row,
            col,
        })
    }
}
