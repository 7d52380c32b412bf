//! Sample metadata and categorical sample groupings.

use crate::error::{MetnetError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Sample metadata: one row per sample, string-valued columns.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    sample_ids: Vec<String>,
    column_names: Vec<String>,
    /// sample_id -> column values (aligned with `column_names`).
    data: HashMap<String, Vec<Option<String>>>,
}

impl Metadata {
    /// Load metadata from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with column names (first column is sample ID)
    /// - Optional `#q2:types` directive row, ignored
    /// - Subsequent rows: sample ID followed by values; empty, `NA` and `na`
    ///   are read as missing
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| MetnetError::EmptyData("Empty metadata file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').map(str::trim).collect();
        if header.len() < 2 {
            return Err(MetnetError::EmptyData(
                "Metadata must have at least one variable column".to_string(),
            ));
        }
        let column_names: Vec<String> = header[1..].iter().map(|s| s.to_string()).collect();

        let mut sample_ids = Vec::new();
        let mut data = HashMap::new();
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let sample_id = fields[0].trim().to_string();
            let values = (0..column_names.len())
                .map(|i| fields.get(i + 1).and_then(|raw| parse_value(raw)))
                .collect();
            if data.insert(sample_id.clone(), values).is_some() {
                return Err(MetnetError::SampleMismatch(format!(
                    "Sample '{}' appears twice in metadata",
                    sample_id
                )));
            }
            sample_ids.push(sample_id);
        }

        if sample_ids.is_empty() {
            return Err(MetnetError::EmptyData("No samples in metadata".to_string()));
        }

        Ok(Self {
            sample_ids,
            column_names,
            data,
        })
    }

    /// Sample IDs in file order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Value of one column for one sample.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&str> {
        let col = self.column_names.iter().position(|c| c == column)?;
        self.data.get(sample_id)?.get(col)?.as_deref()
    }

    /// Extract a categorical column as sample groups.
    pub fn groups(&self, column: &str) -> Result<SampleGroups> {
        let col = self
            .column_names
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| MetnetError::MissingColumn(column.to_string()))?;
        let labels = self
            .sample_ids
            .iter()
            .map(|sid| self.data.get(sid).and_then(|v| v[col].clone()))
            .collect();
        Ok(SampleGroups {
            sample_ids: self.sample_ids.clone(),
            labels,
        })
    }
}

fn parse_value(raw: &str) -> Option<String> {
    let v = raw.trim();
    if v.is_empty() || v == "NA" || v == "na" {
        None
    } else {
        Some(v.to_string())
    }
}

/// One categorical label per sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleGroups {
    sample_ids: Vec<String>,
    labels: Vec<Option<String>>,
}

impl SampleGroups {
    /// Build from `(sample_id, label)` pairs.
    pub fn from_pairs<I, S, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, L)>,
        S: Into<String>,
        L: Into<String>,
    {
        let (sample_ids, labels) = pairs
            .into_iter()
            .map(|(s, l)| (s.into(), Some(l.into())))
            .unzip();
        Self { sample_ids, labels }
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn len(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_ids.is_empty()
    }

    /// Label of a sample, if it has one.
    pub fn label(&self, sample_id: &str) -> Option<&str> {
        let idx = self.sample_ids.iter().position(|s| s == sample_id)?;
        self.labels[idx].as_deref()
    }

    /// Samples carrying `label`, in metadata order. Unknown labels give an empty list.
    pub fn samples_with(&self, label: &str) -> Vec<&str> {
        self.sample_ids
            .iter()
            .zip(&self.labels)
            .filter(|(_, l)| l.as_deref() == Some(label))
            .map(|(s, _)| s.as_str())
            .collect()
    }

    /// Distinct labels, sorted.
    pub fn levels(&self) -> Vec<String> {
        self.labels
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
