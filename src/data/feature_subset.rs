//! Single-column feature allow-lists (e.g. input exchange reactions).

use crate::error::{MetnetError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// An ordered, duplicate-free list of feature IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSubset {
    ids: Vec<String>,
}

impl FeatureSubset {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let ids = ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &String| seen.insert(id.clone()))
            .collect();
        Self { ids }
    }

    /// Load a one-column TSV with a header line (e.g. `inputs`).
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mut lines = BufReader::new(file).lines();
        lines
            .next()
            .ok_or_else(|| MetnetError::EmptyData("Empty feature subset file".to_string()))??;

        let mut ids = Vec::new();
        for line in lines {
            let line = line?;
            let id = line.split('\t').next().unwrap_or("").trim();
            if !id.is_empty() {
                ids.push(id.to_string());
            }
        }
        Ok(Self::new(ids))
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
