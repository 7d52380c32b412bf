//! Map observed features onto reference taxa at a chosen rank.
//!
//! Features are collapsed by their lineage truncated at the rank, each sample
//! is rescaled to relative frequencies, and every collapsed unit is matched
//! against the reference taxonomy by substring containment. Units without a
//! reference match are dropped.

use super::lineage::Lineage;
use super::rank::TaxRank;
use crate::data::{AbundanceTable, ScoreMatrix, TaxonomyTable};
use crate::error::{MetnetError, Result};
use crate::reconstruction::ReferenceTaxonomy;
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Features sharing a truncated lineage, summed.
#[derive(Debug, Clone)]
pub struct CollapsedUnits {
    /// Truncated lineage of each unit, in first-seen order.
    pub lineages: Vec<Lineage>,
    /// Summed raw abundances (units × samples), rows named `M_ASV{k}`.
    pub abundances: ScoreMatrix,
    /// Input features excluded because their lineage does not resolve at the rank.
    pub excluded: Vec<String>,
}

/// One contextualized taxonomic unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomicUnit {
    /// Synthetic identifier (`M_ASV{k}`), stable across all outputs.
    pub id: String,
    /// `{rank code}__{query}`, e.g. `s__Bacteroides ovatus`.
    pub display_name: String,
    pub lineage: Lineage,
    /// Matching row positions in the reference taxonomy, ascending.
    pub reference_rows: Vec<usize>,
}

/// Result of contextualization.
#[derive(Debug, Clone)]
pub struct Contextualization {
    pub rank: TaxRank,
    pub units: Vec<TaxonomicUnit>,
    /// Relative frequencies (units × samples), rows in unit order.
    ///
    /// Samples are normalized before units without a reference organism are
    /// dropped, so a column can sum to less than one.
    pub frequency: ScoreMatrix,
    index: HashMap<String, usize>,
}

impl Contextualization {
    pub fn sample_ids(&self) -> &[String] {
        self.frequency.sample_ids()
    }

    pub fn n_units(&self) -> usize {
        self.units.len()
    }

    pub fn unit(&self, id: &str) -> Option<&TaxonomicUnit> {
        self.index.get(id).map(|&i| &self.units[i])
    }

    /// The frequency table with rows labelled `{unit id};{reference name}…`,
    /// listing every matched reference organism.
    pub fn labelled_frequency(&self, reference: &ReferenceTaxonomy) -> Result<ScoreMatrix> {
        let labels = self
            .units
            .iter()
            .map(|u| {
                let mut parts = vec![u.id.clone()];
                parts.extend(
                    u.reference_rows
                        .iter()
                        .filter_map(|&r| reference.get(r))
                        .map(|t| t.agora_name.clone()),
                );
                parts.join(";")
            })
            .collect();
        self.frequency.clone().relabel(labels)
    }
}

/// Orient the abundance table so its rows are the taxonomy's features.
fn orient(abundance: &AbundanceTable, taxonomy: &TaxonomyTable) -> Result<AbundanceTable> {
    let missing = abundance.feature_ids().iter().find(|f| !taxonomy.contains(f));
    let Some(missing) = missing else {
        return Ok(abundance.clone());
    };
    if abundance.sample_ids().iter().all(|s| taxonomy.contains(s)) {
        debug!("abundance table is samples x features; transposing");
        return Ok(abundance.transpose());
    }
    Err(MetnetError::MissingLineage(missing.clone()))
}

/// Collapse features with identical lineages truncated at `rank`, summing
/// their abundances. Features that do not resolve at the rank are excluded.
pub fn collapse_by_lineage(
    abundance: &AbundanceTable,
    taxonomy: &TaxonomyTable,
    rank: TaxRank,
) -> Result<CollapsedUnits> {
    let abundance = orient(abundance, taxonomy)?;

    let mut groups: HashMap<String, usize> = HashMap::new();
    let mut lineages = Vec::new();
    let mut sums: Vec<Vec<f64>> = Vec::new();
    let mut excluded = Vec::new();

    for (row, feature) in abundance.feature_ids().iter().enumerate() {
        let raw = taxonomy
            .lineage(feature)
            .ok_or_else(|| MetnetError::MissingLineage(feature.clone()))?;
        let Some(truncated) = Lineage::parse(raw).truncate(rank) else {
            excluded.push(feature.clone());
            continue;
        };
        let values = abundance.row_dense(row);
        let group = *groups.entry(truncated.key()).or_insert_with(|| {
            lineages.push(truncated);
            sums.push(vec![0.0; values.len()]);
            sums.len() - 1
        });
        for (acc, v) in sums[group].iter_mut().zip(&values) {
            *acc += v;
        }
    }

    if !excluded.is_empty() {
        warn!(
            excluded = excluded.len(),
            rank = %rank,
            "features without a label at the requested rank were excluded"
        );
    }

    let ids = (0..lineages.len()).map(|k| format!("M_ASV{}", k)).collect();
    let abundances = ScoreMatrix::from_rows(&sums, ids, abundance.sample_ids().to_vec())?;
    Ok(CollapsedUnits {
        lineages,
        abundances,
        excluded,
    })
}

/// Divide each sample column by its total. All-zero columns stay zero.
pub fn normalize_columns(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let mut normalized = matrix.clone();
    for mut column in normalized.column_iter_mut() {
        let total: f64 = column.sum();
        if total > 0.0 {
            column /= total;
        }
    }
    normalized
}

/// Contextualize an abundance table against a reference taxonomy at `rank`.
///
/// Fails with `NoReferenceMatch` when no unit matches the reference.
pub fn contextualize(
    abundance: &AbundanceTable,
    taxonomy: &TaxonomyTable,
    reference: &ReferenceTaxonomy,
    rank: TaxRank,
) -> Result<Contextualization> {
    let collapsed = collapse_by_lineage(abundance, taxonomy, rank)?;
    info!(
        features = abundance.n_features(),
        units = collapsed.lineages.len(),
        rank = %rank,
        "collapsed features by lineage"
    );

    let frequency = normalize_columns(collapsed.abundances.matrix());

    let matches: Vec<(String, Vec<usize>)> = collapsed
        .lineages
        .par_iter()
        .map(|lineage| {
            let query = lineage.query(rank).unwrap_or_default();
            let rows = reference.matching_rows(&query, rank);
            (query, rows)
        })
        .collect();

    let mut units = Vec::new();
    let mut kept_rows = Vec::new();
    for (k, (lineage, (query, rows))) in collapsed.lineages.into_iter().zip(matches).enumerate() {
        if rows.is_empty() {
            debug!(unit = k, query = %query, "no reference match");
            continue;
        }
        units.push(TaxonomicUnit {
            id: collapsed.abundances.feature_ids()[k].clone(),
            display_name: format!("{}__{}", rank.code(), query),
            lineage,
            reference_rows: rows,
        });
        kept_rows.push(k);
    }

    if units.is_empty() {
        return Err(MetnetError::NoReferenceMatch {
            rank: rank.to_string(),
        });
    }
    let dropped = collapsed.abundances.n_features() - units.len();
    if dropped > 0 {
        warn!(dropped, kept = units.len(), "units without a reference match were dropped");
    }

    let data = DMatrix::from_fn(kept_rows.len(), frequency.ncols(), |i, j| frequency[(kept_rows[i], j)]);
    let frequency = ScoreMatrix::new(
        data,
        units.iter().map(|u| u.id.clone()).collect(),
        collapsed.abundances.sample_ids().to_vec(),
    )?;
    let index = units
        .iter()
        .enumerate()
        .map(|(i, u)| (u.id.clone(), i))
        .collect();

    Ok(Contextualization {
        rank,
        units,
        frequency,
        index,
    })
}
