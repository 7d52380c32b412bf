//! Two-group differential testing of score matrices.

use crate::correct::correct_bh;
use crate::data::{DifferentialResult, DifferentialResultSet, FeatureSubset, SampleGroups, ScoreMatrix};
use crate::error::{MetnetError, Result};
use crate::reconstruction::{ExchangeClassTable, ReconstructionModel};
use crate::score::exchange_scores;
use crate::test::rank_sum_p_value;
use rayon::prelude::*;
use tracing::{info, warn};

/// Column positions of the control and condition samples.
#[derive(Debug, Clone)]
struct GroupColumns {
    control: Vec<usize>,
    condition: Vec<usize>,
}

fn group_columns(
    scores: &ScoreMatrix,
    groups: &SampleGroups,
    condition: &str,
    control: &str,
) -> Result<GroupColumns> {
    if let Some(missing) = groups
        .sample_ids()
        .iter()
        .find(|s| scores.sample_index(s).is_none())
    {
        return Err(MetnetError::SampleMismatch(format!(
            "Sample '{}' is in the metadata but not in the score table",
            missing
        )));
    }
    let columns = |label: &str| -> Vec<usize> {
        groups
            .samples_with(label)
            .into_iter()
            .filter_map(|s| scores.sample_index(s))
            .collect()
    };
    let cols = GroupColumns {
        control: columns(control),
        condition: columns(condition),
    };
    if cols.control.is_empty() || cols.condition.is_empty() {
        warn!(
            control = cols.control.len(),
            condition = cols.condition.len(),
            "a comparison group has no samples; every p-value will be 1"
        );
    }
    Ok(cols)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Compare every feature of `scores` between the `condition` and `control`
/// samples of `groups`.
///
/// Each feature gets a two-sided rank-sum p-value (1 when the test is
/// undefined), a fold-change `mean(condition) - mean(control)`, and a
/// Benjamini-Hochberg adjusted p-value. `labels` supplies display labels in
/// feature order; results come back in ranking order.
pub fn compare_groups(
    scores: &ScoreMatrix,
    labels: &[String],
    groups: &SampleGroups,
    condition: &str,
    control: &str,
    analysis: &str,
) -> Result<DifferentialResultSet> {
    if labels.len() != scores.n_features() {
        return Err(MetnetError::DimensionMismatch {
            expected: scores.n_features(),
            actual: labels.len(),
        });
    }
    let cols = group_columns(scores, groups, condition, control)?;

    let tested: Vec<(f64, f64)> = (0..scores.n_features())
        .into_par_iter()
        .map(|i| {
            let control_values: Vec<f64> = cols.control.iter().map(|&j| scores.get(i, j)).collect();
            let condition_values: Vec<f64> = cols.condition.iter().map(|&j| scores.get(i, j)).collect();
            let p = rank_sum_p_value(&control_values, &condition_values);
            let fold_change = mean(&condition_values) - mean(&control_values);
            (p, fold_change)
        })
        .collect();

    let p_values: Vec<f64> = tested.iter().map(|(p, _)| *p).collect();
    let bh = correct_bh(&p_values, scores.feature_ids());

    let results = scores
        .feature_ids()
        .iter()
        .zip(labels)
        .zip(tested.iter().zip(&bh.q_values))
        .map(|((id, label), (&(p, fc), &q))| {
            let mut result = DifferentialResult::new(id.clone(), fc, p, q);
            result.label = label.clone();
            result
        })
        .collect();

    let set = DifferentialResultSet::new(analysis, condition, control, results);
    info!(
        analysis,
        features = set.len(),
        significant = set.significant().len(),
        "differential test complete"
    );
    Ok(set)
}

/// Differential reaction scores, labelled by reaction ID.
pub fn differential_reactions(
    scores: &ScoreMatrix,
    groups: &SampleGroups,
    condition: &str,
    control: &str,
) -> Result<DifferentialResultSet> {
    compare_groups(scores, scores.feature_ids(), groups, condition, control, "reactions")
}

/// Differential subsystem scores, labelled by the `S{n} | name` row labels.
pub fn differential_subsystems(
    scores: &ScoreMatrix,
    groups: &SampleGroups,
    condition: &str,
    control: &str,
) -> Result<DifferentialResultSet> {
    compare_groups(scores, scores.feature_ids(), groups, condition, control, "subsystems")
}

/// Differential exchange-reaction scores, labelled `rxnID | metabolite`.
///
/// Tests the model's exchange reactions, or the `inputs` allow-list when
/// given. Every tested reaction needs a metabolite name in `classes`.
pub fn differential_exchanges(
    scores: &ScoreMatrix,
    model: &ReconstructionModel,
    classes: &ExchangeClassTable,
    inputs: Option<&FeatureSubset>,
    groups: &SampleGroups,
    condition: &str,
    control: &str,
) -> Result<DifferentialResultSet> {
    let exchanges = exchange_scores(scores, model, inputs)?;
    let labels = exchanges
        .feature_ids()
        .iter()
        .map(|id| {
            classes
                .metabolite_name(id)
                .map(|name| format!("{} | {}", id, name))
                .ok_or_else(|| MetnetError::not_found(id, "exchange metabolite names"))
        })
        .collect::<Result<Vec<String>>>()?;
    compare_groups(&exchanges, &labels, groups, condition, control, "exchanges")
}
