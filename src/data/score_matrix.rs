//! Dense feature × sample score matrices.
//!
//! Used for every intermediate and final table of the scoring pipeline:
//! renormalized taxonomic-unit frequencies, reaction scores, subsystem
//! scores and exchange-class scores.

use crate::error::{MetnetError, Result};
use nalgebra::DMatrix;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A labelled real-valued matrix (features × samples).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMatrix {
    data: DMatrix<f64>,
    feature_ids: Vec<String>,
    sample_ids: Vec<String>,
    index: HashMap<String, usize>,
}

impl ScoreMatrix {
    /// Wrap a dense matrix with its row and column identifiers.
    pub fn new(data: DMatrix<f64>, feature_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        if data.nrows() != feature_ids.len() {
            return Err(MetnetError::DimensionMismatch {
                expected: data.nrows(),
                actual: feature_ids.len(),
            });
        }
        if data.ncols() != sample_ids.len() {
            return Err(MetnetError::DimensionMismatch {
                expected: data.ncols(),
                actual: sample_ids.len(),
            });
        }
        let index = feature_ids
            .iter()
            .enumerate()
            .map(|(i, f)| (f.clone(), i))
            .collect();
        Ok(Self {
            data,
            feature_ids,
            sample_ids,
            index,
        })
    }

    /// Build from dense rows (one `Vec` per feature).
    pub fn from_rows(rows: &[Vec<f64>], feature_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let n_samples = sample_ids.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != n_samples) {
            return Err(MetnetError::DimensionMismatch {
                expected: n_samples,
                actual: bad.len(),
            });
        }
        let data = DMatrix::from_fn(rows.len(), n_samples, |i, j| rows[i][j]);
        Self::new(data, feature_ids, sample_ids)
    }

    /// Load a score table from TSV (header of sample IDs, one feature per row).
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| MetnetError::EmptyData("Empty score table".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(MetnetError::EmptyData(
                "Score table must have at least one sample".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();

        let mut feature_ids = Vec::new();
        let mut rows = Vec::new();
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let row_idx = feature_ids.len();
            feature_ids.push(fields[0].to_string());
            let values = fields[1..]
                .iter()
                .enumerate()
                .map(|(col, raw)| {
                    raw.trim().parse::<f64>().map_err(|_| MetnetError::InvalidAbundance {
                        value: raw.to_string(),
                        row: row_idx,
                        col,
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push(values);
        }

        Self::from_rows(&rows, feature_ids, sample_ids)
    }

    /// Write to TSV with `header` as the name of the feature column.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P, header: &str) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "{}", header)?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        writeln!(writer)?;

        for (i, feature_id) in self.feature_ids.iter().enumerate() {
            write!(writer, "{}", feature_id)?;
            for value in self.data.row(i).iter() {
                write!(writer, "\t{}", value)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    #[inline]
    pub fn get(&self, feature: usize, sample: usize) -> f64 {
        self.data[(feature, sample)]
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Row position of a feature ID.
    pub fn feature_index(&self, feature_id: &str) -> Option<usize> {
        self.index.get(feature_id).copied()
    }

    /// Column position of a sample ID.
    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|s| s == sample_id)
    }

    /// A row as a vector.
    pub fn row(&self, feature: usize) -> Vec<f64> {
        self.data.row(feature).iter().copied().collect()
    }

    /// A row looked up by ID.
    pub fn row_by_id(&self, feature_id: &str) -> Option<Vec<f64>> {
        self.feature_index(feature_id).map(|i| self.row(i))
    }

    /// Sum of each sample column.
    pub fn col_sums(&self) -> Vec<f64> {
        self.data.column_iter().map(|c| c.sum()).collect()
    }

    /// Keep the listed features, in the listed order. Unknown IDs fail with
    /// `FeatureNotFound` naming `stage`.
    pub fn select_features(&self, feature_ids: &[String], stage: &str) -> Result<Self> {
        let rows = feature_ids
            .iter()
            .map(|f| {
                self.feature_index(f)
                    .ok_or_else(|| MetnetError::not_found(f, stage))
            })
            .collect::<Result<Vec<usize>>>()?;
        let data = DMatrix::from_fn(rows.len(), self.n_samples(), |i, j| self.data[(rows[i], j)]);
        Self::new(data, feature_ids.to_vec(), self.sample_ids.clone())
    }

    /// Keep the listed samples, in the listed order.
    pub fn select_samples(&self, sample_ids: &[String]) -> Result<Self> {
        let cols = sample_ids
            .iter()
            .map(|s| {
                self.sample_index(s).ok_or_else(|| {
                    MetnetError::SampleMismatch(format!("Sample '{}' not found in score table", s))
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        let data = DMatrix::from_fn(self.n_features(), cols.len(), |i, j| self.data[(i, cols[j])]);
        Self::new(data, self.feature_ids.clone(), sample_ids.to_vec())
    }

    /// Replace the feature labels, keeping values and order.
    pub fn relabel(self, feature_ids: Vec<String>) -> Result<Self> {
        Self::new(self.data, feature_ids, self.sample_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_matrix() -> ScoreMatrix {
        ScoreMatrix::from_rows(
            &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
            vec!["R1".into(), "R2".into()],
            vec!["A".into(), "B".into(), "C".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let m = create_test_matrix();
        assert_eq!(m.feature_index("R2"), Some(1));
        assert_eq!(m.row_by_id("R1"), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(m.row_by_id("R3"), None);
        assert_eq!(m.col_sums(), vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_select() {
        let m = create_test_matrix();
        let sub = m.select_features(&["R2".to_string()], "test").unwrap();
        assert_eq!(sub.row(0), vec![4.0, 5.0, 6.0]);

        let err = m.select_features(&["R9".to_string()], "reaction scores").unwrap_err();
        assert!(matches!(err, MetnetError::FeatureNotFound { .. }));

        let cols = m.select_samples(&["C".to_string(), "A".to_string()]).unwrap();
        assert_eq!(cols.row(1), vec![6.0, 4.0]);
    }

    #[test]
    fn test_tsv_roundtrip() {
        let m = create_test_matrix();
        let file = NamedTempFile::new().unwrap();
        m.to_tsv(file.path(), "reaction").unwrap();
        let loaded = ScoreMatrix::from_tsv(file.path()).unwrap();
        assert_eq!(loaded.feature_ids(), m.feature_ids());
        assert_eq!(loaded.sample_ids(), m.sample_ids());
        assert_eq!(loaded.matrix(), m.matrix());
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = ScoreMatrix::from_rows(&[vec![1.0]], vec!["R1".into()], vec!["A".into(), "B".into()]);
        assert!(matches!(err, Err(MetnetError::DimensionMismatch { .. })));
    }
}
