//! Per-feature group values for plotting a single differential result.

use crate::data::{is_subsystem_key, DifferentialResultSet, SampleGroups, ScoreMatrix};
use crate::error::{MetnetError, Result};
use serde::{Deserialize, Serialize};

/// Score values of one feature split by group, with its test outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureGroups {
    /// Label as it appears in the differential table.
    pub label: String,
    /// Human-readable name (the part after ` | `).
    pub display_name: String,
    pub control_name: String,
    pub condition_name: String,
    pub control: Vec<f64>,
    pub condition: Vec<f64>,
    pub adjusted_p_value: f64,
    pub fold_change: f64,
}

/// Row of the score table addressed by a differential-table label.
///
/// `S{n} | name` labels address the `name` row, other composite labels their
/// leading ID; an exact row match always wins.
fn score_row(scores: &ScoreMatrix, label: &str) -> Option<usize> {
    if let Some(row) = scores.feature_index(label) {
        return Some(row);
    }
    let key = match label.split_once(" | ") {
        Some((head, tail)) if is_subsystem_key(head) => tail,
        Some((head, _)) => head,
        None => label,
    };
    scores.feature_index(key)
}

/// Collect the control and condition values of `label` from `scores`,
/// together with its adjusted p-value and fold-change from `results`.
pub fn feature_groups(
    scores: &ScoreMatrix,
    results: &DifferentialResultSet,
    groups: &SampleGroups,
    label: &str,
    condition: &str,
    control: &str,
) -> Result<FeatureGroups> {
    let row = score_row(scores, label).ok_or_else(|| MetnetError::not_found(label, "score table"))?;
    let result = results
        .by_label(label)
        .ok_or_else(|| MetnetError::not_found(label, "differential results"))?;

    let values = |group: &str| -> Result<Vec<f64>> {
        groups
            .samples_with(group)
            .into_iter()
            .map(|s| {
                scores
                    .sample_index(s)
                    .map(|col| scores.get(row, col))
                    .ok_or_else(|| {
                        MetnetError::SampleMismatch(format!("Sample '{}' not found in score table", s))
                    })
            })
            .collect()
    };

    let display_name = label
        .split_once(" | ")
        .map(|(_, name)| name)
        .unwrap_or(label)
        .to_string();

    Ok(FeatureGroups {
        label: label.to_string(),
        display_name,
        control_name: control.to_string(),
        condition_name: condition.to_string(),
        control: values(control)?,
        condition: values(condition)?,
        adjusted_p_value: result.adjusted_p_value,
        fold_change: result.fold_change,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DifferentialResult;

    fn fixture() -> (ScoreMatrix, DifferentialResultSet, SampleGroups) {
        let scores = ScoreMatrix::from_rows(
            &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
            vec!["EX_glc(e)".into(), "S0 | Glycolysis".into()],
            vec!["A".into(), "B".into(), "C".into()],
        )
        .unwrap();
        let mut exchange = DifferentialResult::new("EX_glc(e)".into(), 1.5, 0.2, 0.4);
        exchange.label = "EX_glc(e) | D-Glucose".into();
        let subsystem = DifferentialResult::new("S0 | Glycolysis".into(), -0.5, 0.5, 0.5);
        let results = DifferentialResultSet::new("mixed", "fiber", "control", vec![exchange, subsystem]);
        let groups = SampleGroups::from_pairs([("A", "control"), ("B", "fiber"), ("C", "fiber")]);
        (scores, results, groups)
    }

    #[test]
    fn test_exchange_lookup() {
        let (scores, results, groups) = fixture();
        let fg = feature_groups(&scores, &results, &groups, "EX_glc(e) | D-Glucose", "fiber", "control").unwrap();
        assert_eq!(fg.display_name, "D-Glucose");
        assert_eq!(fg.control, vec![1.0]);
        assert_eq!(fg.condition, vec![2.0, 3.0]);
        assert_eq!(fg.adjusted_p_value, 0.4);
        assert_eq!(fg.fold_change, 1.5);
    }

    #[test]
    fn test_subsystem_lookup() {
        let (scores, results, groups) = fixture();
        let fg = feature_groups(&scores, &results, &groups, "S0 | Glycolysis", "fiber", "control").unwrap();
        assert_eq!(fg.display_name, "Glycolysis");
        assert_eq!(fg.condition, vec![5.0, 6.0]);
    }

    #[test]
    fn test_unknown_feature() {
        let (scores, results, groups) = fixture();
        let err = feature_groups(&scores, &results, &groups, "EX_none | X", "fiber", "control").unwrap_err();
        assert!(matches!(err, MetnetError::FeatureNotFound { ref stage, .. } if stage == "score table"));

        let err = feature_groups(&scores, &results, &groups, "EX_glc(e)", "fiber", "control").unwrap_err();
        assert!(matches!(err, MetnetError::FeatureNotFound { ref stage, .. } if stage == "differential results"));
    }
}
