//! Reaction × reference-taxon presence matrix (`rxnTaxMat` table).

use super::table::RawTable;
use crate::error::{MetnetError, Result};
use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use std::path::Path;

/// Sparse reaction-by-taxon weights. Rows follow the model's reaction order,
/// columns follow the reference taxonomy's row order. Undefined cells are
/// stored explicitly as NaN so they can be skipped by [`mean_over_columns`].
///
/// [`mean_over_columns`]: ReactionTaxonMatrix::mean_over_columns
#[derive(Debug, Clone)]
pub struct ReactionTaxonMatrix {
    data: CsMat<f64>,
}

impl ReactionTaxonMatrix {
    pub fn new(data: CsMat<f64>) -> Self {
        Self { data }
    }

    /// Build from dense rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n_cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut triplets = TriMat::new((rows.len(), n_cols));
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(MetnetError::DimensionMismatch {
                    expected: n_cols,
                    actual: row.len(),
                });
            }
            for (j, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    triplets.add_triplet(i, j, v);
                }
            }
        }
        Ok(Self::new(triplets.to_csr()))
    }

    /// Load the comma-separated matrix. A leading non-numeric column of
    /// reaction labels is ignored.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let table = RawTable::read(path, b',')?;
        Self::from_table(&table)
    }

    pub(crate) fn from_table(table: &RawTable) -> Result<Self> {
        let has_labels = table
            .rows()
            .first()
            .and_then(|r| r.first())
            .map(|cell| parse_weight(cell).is_none())
            .unwrap_or(false);
        let offset = usize::from(has_labels);
        let n_cols = table.headers().len().saturating_sub(offset);

        let mut triplets = TriMat::new((table.len(), n_cols));
        for (i, row) in table.rows().iter().enumerate() {
            if row.len() != table.headers().len() {
                return Err(MetnetError::malformed(
                    table.name(),
                    format!("row {} has {} cells, expected {}", i + 1, row.len(), table.headers().len()),
                ));
            }
            for (j, cell) in row[offset..].iter().enumerate() {
                let value = parse_weight(cell).ok_or_else(|| {
                    MetnetError::malformed(
                        table.name(),
                        format!("non-numeric weight '{}' at row {}, column {}", cell, i + 1, j + 1),
                    )
                })?;
                if value != 0.0 {
                    triplets.add_triplet(i, j, value);
                }
            }
        }
        Ok(Self::new(triplets.to_csr()))
    }

    pub fn n_reactions(&self) -> usize {
        self.data.rows()
    }

    pub fn n_taxa(&self) -> usize {
        self.data.cols()
    }

    pub fn matrix(&self) -> &CsMat<f64> {
        &self.data
    }

    /// Per-reaction mean weight over the selected taxon columns.
    ///
    /// NaN cells are left out of both the sum and the count; a reaction with
    /// no defined cell among the selection gets 0.
    pub fn mean_over_columns(&self, columns: &[usize]) -> Vec<f64> {
        let mut mask = vec![false; self.n_taxa()];
        for &c in columns {
            if c < mask.len() {
                mask[c] = true;
            }
        }
        let selected = mask.iter().filter(|&&m| m).count();

        (0..self.n_reactions())
            .into_par_iter()
            .map(|i| {
                let mut sum = 0.0;
                let mut undefined = 0usize;
                if let Some(row) = self.data.outer_view(i) {
                    for (j, &v) in row.iter() {
                        if !mask[j] {
                            continue;
                        }
                        if v.is_nan() {
                            undefined += 1;
                        } else {
                            sum += v;
                        }
                    }
                }
                let defined = selected - undefined;
                if defined == 0 {
                    0.0
                } else {
                    sum / defined as f64
                }
            })
            .collect()
    }
}

fn parse_weight(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if super::table::is_missing(cell) {
        return Some(f64::NAN);
    }
    cell.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_mean_over_columns() {
        let m = ReactionTaxonMatrix::from_rows(&[
            vec![1.0, 1.0, 0.0],
            vec![0.0, 1.0, f64::NAN],
            vec![f64::NAN, f64::NAN, 1.0],
        ])
        .unwrap();

        let means = m.mean_over_columns(&[0, 1]);
        assert_relative_eq!(means[0], 1.0);
        assert_relative_eq!(means[1], 0.5);
        assert_relative_eq!(means[2], 0.0);

        let means = m.mean_over_columns(&[1, 2]);
        assert_relative_eq!(means[1], 1.0);
        assert_relative_eq!(means[2], 1.0);

        assert_eq!(m.mean_over_columns(&[]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_from_csv_with_labels() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "rxn,t1,t2").unwrap();
        writeln!(file, "R1,1,0").unwrap();
        writeln!(file, "R2,,1").unwrap();
        file.flush().unwrap();

        let m = ReactionTaxonMatrix::from_csv(file.path()).unwrap();
        assert_eq!(m.n_reactions(), 2);
        assert_eq!(m.n_taxa(), 2);
        assert_eq!(m.mean_over_columns(&[0, 1]), vec![0.5, 1.0]);
    }

    #[test]
    fn test_from_csv_rejects_text() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "t1,t2").unwrap();
        writeln!(file, "1,yes").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            ReactionTaxonMatrix::from_csv(file.path()),
            Err(MetnetError::MalformedReference { .. })
        ));
    }
}
