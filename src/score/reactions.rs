//! Reaction activity scores from contextualized unit frequencies.

use crate::data::ScoreMatrix;
use crate::error::{MetnetError, Result};
use crate::reconstruction::{ReactionTaxonMatrix, ReconstructionModel};
use crate::taxonomy::{Contextualization, TaxonomicUnit};
use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::{debug, info};

/// Mean reaction-presence weight of each unit over its matched reference
/// taxa (reactions × units).
pub fn reaction_weights(units: &[TaxonomicUnit], reaction_taxa: &ReactionTaxonMatrix) -> DMatrix<f64> {
    let columns: Vec<Vec<f64>> = units
        .par_iter()
        .map(|unit| {
            debug!(unit = %unit.id, taxa = unit.reference_rows.len(), "computing reaction weights");
            reaction_taxa.mean_over_columns(&unit.reference_rows)
        })
        .collect();
    DMatrix::from_fn(reaction_taxa.n_reactions(), units.len(), |i, u| columns[u][i])
}

/// Score every reaction of the model in every sample.
///
/// The weight matrix is multiplied by the unit frequencies, aligning units to
/// frequency rows by identifier. Units absent from the frequency table
/// contribute nothing.
pub fn score_reactions(
    context: &Contextualization,
    model: &ReconstructionModel,
    reaction_taxa: &ReactionTaxonMatrix,
) -> Result<ScoreMatrix> {
    if reaction_taxa.n_reactions() != model.n_reactions() {
        return Err(MetnetError::malformed(
            "rxnTaxMat",
            format!(
                "{} rows but the model has {} reactions",
                reaction_taxa.n_reactions(),
                model.n_reactions()
            ),
        ));
    }
    if let Some(bad) = context
        .units
        .iter()
        .flat_map(|u| u.reference_rows.iter())
        .find(|&&r| r >= reaction_taxa.n_taxa())
    {
        return Err(MetnetError::malformed(
            "rxnTaxMat",
            format!("reference taxon {} is outside the matrix's {} columns", bad, reaction_taxa.n_taxa()),
        ));
    }

    let weights = reaction_weights(&context.units, reaction_taxa);
    let frequency = &context.frequency;
    let aligned = DMatrix::from_fn(context.units.len(), frequency.n_samples(), |u, j| {
        frequency
            .feature_index(&context.units[u].id)
            .map(|row| frequency.get(row, j))
            .unwrap_or(0.0)
    });

    let scores = weights * aligned;
    info!(
        reactions = scores.nrows(),
        samples = scores.ncols(),
        units = context.units.len(),
        "scored reactions"
    );
    ScoreMatrix::new(scores, model.reaction_ids(), frequency.sample_ids().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AbundanceTable, TaxonomyTable};
    use crate::reconstruction::fixtures::{toy_model, toy_reference};
    use crate::taxonomy::{contextualize, TaxRank};
    use approx::assert_relative_eq;

    fn toy_reaction_taxa() -> ReactionTaxonMatrix {
        // Rows follow toy_model's reactions, columns toy_reference's taxa.
        ReactionTaxonMatrix::from_rows(&[
            vec![1.0, 1.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![1.0, 1.0, 1.0],
            vec![0.0, 0.0, 1.0],
            vec![1.0, 0.0, f64::NAN],
            vec![0.0, 0.0, 1.0],
        ])
        .unwrap()
    }

    fn toy_context() -> Contextualization {
        let abundance = AbundanceTable::from_rows(
            &[vec![3.0, 0.0, 1.0], vec![1.0, 2.0, 1.0]],
            vec!["a".into(), "b".into()],
            vec!["S1".into(), "S2".into(), "S3".into()],
        )
        .unwrap();
        let taxonomy = TaxonomyTable::from_pairs([
            ("a", "k__Bacteria;p__Bacteroidetes;c__;o__;f__;g__Bacteroides"),
            ("b", "k__Bacteria;p__Verrucomicrobia;c__;o__;f__;g__Akkermansia"),
        ]);
        contextualize(&abundance, &taxonomy, &toy_reference(), TaxRank::Genus).unwrap()
    }

    #[test]
    fn test_reaction_weights() {
        let ctx = toy_context();
        let w = reaction_weights(&ctx.units, &toy_reaction_taxa());
        assert_eq!(w.shape(), (6, 2));
        // Bacteroides matches reference rows 0 and 1.
        assert_relative_eq!(w[(1, 0)], 0.5);
        assert_relative_eq!(w[(4, 0)], 0.5);
        // NaN cells become zero weight.
        assert_relative_eq!(w[(4, 1)], 0.0);
        assert_relative_eq!(w[(3, 1)], 1.0);
    }

    #[test]
    fn test_score_reactions() {
        let ctx = toy_context();
        let model = toy_model();
        let scores = score_reactions(&ctx, &model, &toy_reaction_taxa()).unwrap();

        assert_eq!(scores.feature_ids(), model.reaction_ids().as_slice());
        assert_eq!(scores.sample_ids(), &["S1", "S2", "S3"]);
        // S1 frequencies: Bacteroides 0.75, Akkermansia 0.25.
        assert_relative_eq!(scores.get(0, 0), 0.75);
        assert_relative_eq!(scores.get(1, 0), 0.375);
        assert_relative_eq!(scores.get(2, 0), 1.0);
        assert_relative_eq!(scores.get(3, 0), 0.25);
        // S2 has only Akkermansia.
        assert_relative_eq!(scores.get(0, 1), 0.0);
        assert_relative_eq!(scores.get(5, 1), 1.0);
    }

    #[test]
    fn test_dimension_check() {
        let ctx = toy_context();
        let short = ReactionTaxonMatrix::from_rows(&[vec![1.0, 1.0, 1.0]]).unwrap();
        let err = score_reactions(&ctx, &toy_model(), &short).unwrap_err();
        assert!(matches!(err, MetnetError::MalformedReference { .. }));
    }
}
