//! Result types for two-group differential score analysis.

use crate::error::{MetnetError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Confidence level based on statistical evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    /// Very high confidence (q < 0.001)
    VeryHigh,
    /// High confidence (q < 0.01)
    High,
    /// Moderate confidence (q < 0.05)
    Moderate,
    /// Low confidence (q < 0.10)
    Low,
    /// Suggestive (q < 0.20)
    Suggestive,
    NotSignificant,
}

impl Confidence {
    /// Classify based on adjusted p-value.
    pub fn from_qvalue(q: f64) -> Self {
        if q < 0.001 {
            Self::VeryHigh
        } else if q < 0.01 {
            Self::High
        } else if q < 0.05 {
            Self::Moderate
        } else if q < 0.10 {
            Self::Low
        } else if q < 0.20 {
            Self::Suggestive
        } else {
            Self::NotSignificant
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::VeryHigh => "very_high",
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
            Self::Suggestive => "suggestive",
            Self::NotSignificant => "not_significant",
        }
    }

    /// Check if significant at alpha = 0.05.
    pub fn is_significant(&self) -> bool {
        matches!(self, Self::VeryHigh | Self::High | Self::Moderate)
    }
}

/// Outcome of the two-group comparison for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferentialResult {
    /// Row identifier in the score matrix.
    pub feature_id: String,
    /// Display label; either the feature ID or a composite `"id | name"`.
    pub label: String,
    /// Mean of the condition group minus mean of the control group.
    pub fold_change: f64,
    /// Two-sided rank-sum p-value.
    pub p_value: f64,
    /// Benjamini-Hochberg adjusted p-value.
    pub adjusted_p_value: f64,
    pub confidence: Confidence,
}

impl DifferentialResult {
    pub fn new(feature_id: String, fold_change: f64, p_value: f64, adjusted_p_value: f64) -> Self {
        Self {
            label: feature_id.clone(),
            feature_id,
            fold_change,
            p_value,
            adjusted_p_value,
            confidence: Confidence::from_qvalue(adjusted_p_value),
        }
    }

    pub fn is_significant(&self) -> bool {
        self.confidence.is_significant()
    }
}

/// Ranking order of a result table: ascending adjusted p-value, then
/// descending |fold-change| (undefined fold-changes last), then feature ID.
pub fn result_order(a: &DifferentialResult, b: &DifferentialResult) -> Ordering {
    a.adjusted_p_value
        .total_cmp(&b.adjusted_p_value)
        .then_with(|| match (a.fold_change.is_nan(), b.fold_change.is_nan()) {
            (false, false) => b.fold_change.abs().total_cmp(&a.fold_change.abs()),
            (a_nan, b_nan) => a_nan.cmp(&b_nan),
        })
        .then_with(|| a.feature_id.cmp(&b.feature_id))
}

/// A sorted table of differential results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferentialResultSet {
    /// What was compared (e.g. "reactions", "subsystems", "exchanges").
    pub analysis: String,
    pub condition: String,
    pub control: String,
    pub results: Vec<DifferentialResult>,
}

impl DifferentialResultSet {
    /// Create a result set; results are put into ranking order.
    pub fn new(analysis: &str, condition: &str, control: &str, mut results: Vec<DifferentialResult>) -> Self {
        results.sort_by(result_order);
        Self {
            analysis: analysis.to_string(),
            condition: condition.to_string(),
            control: control.to_string(),
            results,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DifferentialResult> {
        self.results.iter()
    }

    /// Find a result by its display label.
    pub fn by_label(&self, label: &str) -> Option<&DifferentialResult> {
        self.results.iter().find(|r| r.label == label)
    }

    /// Find a result by its feature ID.
    pub fn by_feature(&self, feature_id: &str) -> Option<&DifferentialResult> {
        self.results.iter().find(|r| r.feature_id == feature_id)
    }

    /// Significant results (q < 0.05).
    pub fn significant(&self) -> Vec<&DifferentialResult> {
        self.results.iter().filter(|r| r.is_significant()).collect()
    }

    /// Count significant results at various thresholds.
    pub fn summary(&self) -> ResultSummary {
        let count = |alpha: f64| self.results.iter().filter(|r| r.adjusted_p_value < alpha).count();
        ResultSummary {
            total: self.len(),
            significant_001: count(0.001),
            significant_01: count(0.01),
            significant_05: count(0.05),
            significant_10: count(0.10),
        }
    }

    /// Write results to a TSV file, in ranking order.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "feature\tFC\tp_Value\tAdjusted_p_Value")?;
        for r in &self.results {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}",
                r.label, r.fold_change, r.p_value, r.adjusted_p_value
            )?;
        }
        Ok(())
    }

    /// Read a table written by [`to_tsv`](Self::to_tsv).
    ///
    /// Feature IDs are recovered from composite labels: `"S{n} | name"` keeps
    /// the whole label, `"id | name"` keeps `id`.
    pub fn from_tsv<P: AsRef<Path>>(path: P, analysis: &str) -> Result<Self> {
        let file = File::open(path)?;
        let mut lines = BufReader::new(file).lines();
        lines
            .next()
            .ok_or_else(|| MetnetError::EmptyData("Empty differential table".to_string()))??;

        let mut results = Vec::new();
        for (row, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 4 {
                return Err(MetnetError::DimensionMismatch {
                    expected: 4,
                    actual: fields.len(),
                });
            }
            let parse = |col: usize| -> Result<f64> {
                fields[col].trim().parse().map_err(|_| MetnetError::InvalidAbundance {
                    value: fields[col].to_string(),
                    row,
                    col,
                })
            };
            let label = fields[0].to_string();
            let feature_id = feature_id_from_label(&label).to_string();
            let mut result = DifferentialResult::new(feature_id, parse(1)?, parse(2)?, parse(3)?);
            result.label = label;
            results.push(result);
        }

        Ok(Self::new(analysis, "", "", results))
    }
}

/// Feature ID carried by a display label.
pub fn feature_id_from_label(label: &str) -> &str {
    match label.split_once(" | ") {
        Some((head, _)) if !is_subsystem_key(head) => head,
        _ => label,
    }
}

/// Whether `key` has the `S{ordinal}` form used by subsystem labels.
pub(crate) fn is_subsystem_key(key: &str) -> bool {
    key.strip_prefix('S')
        .map(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Summary statistics for a result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    pub total: usize,
    pub significant_001: usize,
    pub significant_01: usize,
    pub significant_05: usize,
    pub significant_10: usize,
}

impl std::fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total features tested: {}", self.total)?;
        writeln!(f, "Significant at q < 0.001: {}", self.significant_001)?;
        writeln!(f, "Significant at q < 0.01:  {}", self.significant_01)?;
        writeln!(f, "Significant at q < 0.05:  {}", self.significant_05)?;
        writeln!(f, "Significant at q < 0.10:  {}", self.significant_10)?;
        Ok(())
    }
}
