//! Aggregation of reaction scores into subsystem and class scores.
//!
//! Both aggregations build a label × reaction incidence matrix, scale every
//! row to sum to one, and multiply it by the reaction score matrix. A label's
//! score is therefore the mean score of its member reactions.

use crate::data::{FeatureSubset, ScoreMatrix};
use crate::error::{MetnetError, Result};
use crate::reconstruction::{ExchangeClassTable, ReconstructionModel};
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Row-normalized label × reaction membership weights.
#[derive(Debug, Clone)]
pub struct IncidenceMatrix {
    labels: Vec<String>,
    reaction_ids: Vec<String>,
    weights: DMatrix<f64>,
}

impl IncidenceMatrix {
    /// Build from per-reaction memberships. Labels without any member
    /// reaction are dropped; the remaining rows keep the order of `labels`.
    pub fn from_memberships(
        labels: &[String],
        reaction_ids: &[String],
        memberships: &[BTreeSet<String>],
    ) -> Self {
        let mut members: BTreeMap<&str, Vec<usize>> = labels.iter().map(|l| (l.as_str(), Vec::new())).collect();
        for (col, labels_of_reaction) in memberships.iter().enumerate() {
            for label in labels_of_reaction {
                if let Some(cols) = members.get_mut(label.as_str()) {
                    cols.push(col);
                }
            }
        }

        let kept: Vec<(&String, &Vec<usize>)> = labels
            .iter()
            .filter_map(|l| members.get(l.as_str()).filter(|c| !c.is_empty()).map(|c| (l, c)))
            .collect();
        if kept.len() < labels.len() {
            debug!(dropped = labels.len() - kept.len(), "labels without member reactions");
        }

        let rows: Vec<Vec<f64>> = kept
            .par_iter()
            .map(|(_, cols)| {
                let mut row = vec![0.0; reaction_ids.len()];
                let weight = 1.0 / cols.len() as f64;
                for &c in cols.iter() {
                    row[c] = weight;
                }
                row
            })
            .collect();

        Self {
            labels: kept.iter().map(|(l, _)| (*l).clone()).collect(),
            reaction_ids: reaction_ids.to_vec(),
            weights: DMatrix::from_fn(rows.len(), reaction_ids.len(), |i, j| rows[i][j]),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn weights(&self) -> &DMatrix<f64> {
        &self.weights
    }

    /// Multiply by the reaction scores, aligned by reaction identifier.
    pub fn apply(&self, scores: &ScoreMatrix, labels: Vec<String>) -> Result<ScoreMatrix> {
        let slice = scores.select_features(&self.reaction_ids, "reaction scores")?;
        ScoreMatrix::new(&self.weights * slice.matrix(), labels, scores.sample_ids().to_vec())
    }
}

/// Distinct subsystem labels of the model plus the class table's classes,
/// sorted.
pub fn subsystem_labels(model: &ReconstructionModel, classes: Option<&ExchangeClassTable>) -> Vec<String> {
    let mut labels: BTreeSet<String> = model
        .reactions()
        .iter()
        .flat_map(|r| r.subsystems().iter().cloned())
        .collect();
    if let Some(table) = classes {
        labels.extend(table.classes().into_iter().map(String::from));
    }
    labels.into_iter().collect()
}

fn split_labels(field: &str) -> BTreeSet<String> {
    field
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Subsystem incidence of the model's reactions.
///
/// A reaction listed in the class table belongs to its class only, or to
/// nothing when it is listed without a class. Every other reaction belongs
/// to its own subsystems.
pub fn subsystem_incidence(model: &ReconstructionModel, classes: Option<&ExchangeClassTable>) -> IncidenceMatrix {
    let labels = subsystem_labels(model, classes);
    let memberships: Vec<BTreeSet<String>> = model
        .reactions()
        .iter()
        .map(|r| match classes.and_then(|t| t.get(&r.id)) {
            Some(entry) => entry.class.as_deref().map(split_labels).unwrap_or_default(),
            None => r.subsystems().clone(),
        })
        .collect();
    IncidenceMatrix::from_memberships(&labels, &model.reaction_ids(), &memberships)
}

/// Score every subsystem as the mean of its member reactions.
///
/// Rows are labelled `S{ordinal} | {subsystem}`, ordinals counting only the
/// subsystems that have member reactions.
pub fn aggregate_subsystems(
    scores: &ScoreMatrix,
    model: &ReconstructionModel,
    classes: Option<&ExchangeClassTable>,
) -> Result<ScoreMatrix> {
    let incidence = subsystem_incidence(model, classes);
    let labels = incidence
        .labels()
        .iter()
        .enumerate()
        .map(|(k, name)| format!("S{} | {}", k, name))
        .collect();
    let result = incidence.apply(scores, labels)?;
    info!(subsystems = result.n_features(), "aggregated reaction scores into subsystems");
    Ok(result)
}

/// Exchange reactions considered for class aggregation, in model order,
/// optionally restricted to an allow-list.
pub fn exchange_reactions(model: &ReconstructionModel, restrict: Option<&FeatureSubset>) -> Vec<String> {
    model
        .exchange_reaction_ids()
        .into_iter()
        .filter(|id| restrict.map(|s| s.contains(id)).unwrap_or(true))
        .collect()
}

/// Score every exchange class as the mean of its member exchange reactions.
pub fn aggregate_classes(
    scores: &ScoreMatrix,
    model: &ReconstructionModel,
    classes: &ExchangeClassTable,
    restrict: Option<&FeatureSubset>,
) -> Result<ScoreMatrix> {
    let exchanges = exchange_reactions(model, restrict);
    let memberships: Vec<BTreeSet<String>> = exchanges
        .iter()
        .map(|id| classes.class_of(id).map(split_labels).unwrap_or_default())
        .collect();
    let labels: Vec<String> = memberships
        .iter()
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let incidence = IncidenceMatrix::from_memberships(&labels, &exchanges, &memberships);
    if incidence.labels().is_empty() {
        return Err(MetnetError::EmptyData(
            "No classified exchange reactions to aggregate".to_string(),
        ));
    }
    let result = incidence.apply(scores, incidence.labels().to_vec())?;
    info!(
        classes = result.n_features(),
        exchanges = exchanges.len(),
        "aggregated exchange scores into classes"
    );
    Ok(result)
}

/// Reaction scores of the exchange reactions, or of the allow-list when given.
pub fn exchange_scores(
    scores: &ScoreMatrix,
    model: &ReconstructionModel,
    inputs: Option<&FeatureSubset>,
) -> Result<ScoreMatrix> {
    let ids = match inputs {
        Some(subset) => subset.ids().to_vec(),
        None => model.exchange_reaction_ids(),
    };
    scores.select_features(&ids, "reaction scores")
}
