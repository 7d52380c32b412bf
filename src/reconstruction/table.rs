//! Header-addressed reader for the reconstruction's reference tables.

use crate::error::{MetnetError, Result};
use csv::ReaderBuilder;
use std::path::Path;

/// A fully materialized delimited table with a header row.
#[derive(Debug, Clone)]
pub(crate) struct RawTable {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Read a delimited file. Reference tables ship as ISO-8859-1, so every
    /// byte is decoded as the code point of the same value.
    pub(crate) fn read<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)?;

        let headers = reader
            .byte_headers()?
            .iter()
            .map(|h| latin1(h).trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for record in reader.byte_records() {
            rows.push(record?.iter().map(latin1).collect());
        }

        Ok(Self {
            name,
            headers,
            rows,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn headers(&self) -> &[String] {
        &self.headers
    }

    pub(crate) fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    /// Position of a required column.
    pub(crate) fn column(&self, header: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == header)
            .ok_or_else(|| MetnetError::malformed(&self.name, format!("missing column '{}'", header)))
    }

    /// Position of an optional column.
    pub(crate) fn optional_column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell value with pandas-style missing values mapped to `None`.
    pub(crate) fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows[row].get(col).map(|s| s.trim()).filter(|s| !is_missing(s))
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

pub(crate) fn is_missing(value: &str) -> bool {
    matches!(value, "" | "NA" | "NaN" | "nan" | "N/A")
}
