//! Per-feature taxonomy assignments (free-text lineage strings).

use crate::error::{MetnetError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Lineage strings addressed by the same feature IDs as the abundance table.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyTable {
    feature_ids: Vec<String>,
    lineages: HashMap<String, String>,
}

impl TaxonomyTable {
    /// Build from `(feature_id, lineage)` pairs. Later duplicates replace earlier ones.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut table = Self::default();
        for (feature, lineage) in pairs {
            table.insert(feature.into(), lineage.into());
        }
        table
    }

    /// Load a taxonomy TSV (`Feature ID`, `Taxon`, optional `Confidence`).
    ///
    /// The header row is required; the `Taxon` column is located by name so
    /// extra columns may appear in any order after the feature ID.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| MetnetError::EmptyData("Empty taxonomy file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').map(str::trim).collect();
        let taxon_col = header
            .iter()
            .position(|h| h.eq_ignore_ascii_case("taxon"))
            .ok_or_else(|| MetnetError::MissingColumn("Taxon".to_string()))?;

        let mut table = Self::default();
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let lineage = fields.get(taxon_col).copied().unwrap_or("");
            table.insert(fields[0].trim().to_string(), lineage.trim().to_string());
        }

        if table.is_empty() {
            return Err(MetnetError::EmptyData("No features in taxonomy file".to_string()));
        }
        Ok(table)
    }

    fn insert(&mut self, feature: String, lineage: String) {
        if !self.lineages.contains_key(&feature) {
            self.feature_ids.push(feature.clone());
        }
        self.lineages.insert(feature, lineage);
    }

    /// Lineage string for a feature.
    pub fn lineage(&self, feature_id: &str) -> Option<&str> {
        self.lineages.get(feature_id).map(String::as_str)
    }

    /// Feature IDs in file order.
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    pub fn contains(&self, feature_id: &str) -> bool {
        self.lineages.contains_key(feature_id)
    }

    pub fn len(&self) -> usize {
        self.feature_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_taxonomy() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Feature ID\tTaxon\tConfidence").unwrap();
        writeln!(file, "asv1\tk__Bacteria; p__Firmicutes\t0.99").unwrap();
        writeln!(file, "asv2\tk__Bacteria\t0.7").unwrap();
        file.flush().unwrap();

        let taxonomy = TaxonomyTable::from_tsv(file.path()).unwrap();
        assert_eq!(taxonomy.len(), 2);
        assert_eq!(taxonomy.lineage("asv1"), Some("k__Bacteria; p__Firmicutes"));
        assert_eq!(taxonomy.lineage("asv3"), None);
    }

    #[test]
    fn test_missing_taxon_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Feature ID\tLineage").unwrap();
        writeln!(file, "asv1\tk__Bacteria").unwrap();
        file.flush().unwrap();

        let err = TaxonomyTable::from_tsv(file.path()).unwrap_err();
        assert!(matches!(err, MetnetError::MissingColumn(_)));
    }
}
