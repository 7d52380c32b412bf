//! One-shot feature generation: contextualize, score and aggregate.

use crate::data::{AbundanceTable, ScoreMatrix, TaxonomyTable};
use crate::error::Result;
use crate::reconstruction::ReferenceBundle;
use crate::score::{aggregate_subsystems, score_reactions};
use crate::taxonomy::{contextualize, Contextualization, TaxRank};

/// The three tables produced from an abundance table.
#[derive(Debug, Clone)]
pub struct FeatureTables {
    /// Reactions × samples.
    pub reactions: ScoreMatrix,
    /// `S{n} | subsystem` × samples.
    pub subsystems: ScoreMatrix,
    /// Contextualized unit frequencies labelled with their reference organisms.
    pub taxa: ScoreMatrix,
    pub context: Contextualization,
}

/// Contextualize `abundance` at `rank`, score every reaction and aggregate
/// the scores into subsystems (exchange classes override subsystem
/// membership).
pub fn generate_features(
    bundle: &ReferenceBundle,
    abundance: &AbundanceTable,
    taxonomy: &TaxonomyTable,
    rank: TaxRank,
) -> Result<FeatureTables> {
    let context = contextualize(abundance, taxonomy, &bundle.reference, rank)?;
    let reactions = score_reactions(&context, &bundle.model, &bundle.reaction_taxa)?;
    let subsystems = aggregate_subsystems(&reactions, &bundle.model, Some(&bundle.exchange_classes))?;
    let taxa = context.labelled_frequency(&bundle.reference)?;
    Ok(FeatureTables {
        reactions,
        subsystems,
        taxa,
        context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruction::fixtures::toy_bundle;
    use approx::assert_relative_eq;

    #[test]
    fn test_generate_features() {
        let abundance = AbundanceTable::from_rows(
            &[vec![10.0, 0.0], vec![5.0, 5.0], vec![5.0, 15.0]],
            vec!["a".into(), "b".into(), "c".into()],
            vec!["S1".into(), "S2".into()],
        )
        .unwrap();
        let taxonomy = TaxonomyTable::from_pairs([
            ("a", "k__Bacteria;p__Bacteroidetes;c__Bacteroidia;o__Bacteroidales;f__Bacteroidaceae;g__Bacteroides;s__fragilis"),
            ("b", "k__Bacteria;p__Bacteroidetes;c__Bacteroidia;o__Bacteroidales;f__Bacteroidaceae;g__Bacteroides;s__fragilis"),
            ("c", "k__Bacteria;p__Verrucomicrobia;c__Verrucomicrobiae;o__Verrucomicrobiales;f__;g__Akkermansia;s__muciniphila"),
        ]);

        let tables = generate_features(&toy_bundle(), &abundance, &taxonomy, TaxRank::Species).unwrap();

        assert_eq!(tables.context.n_units(), 2);
        assert_eq!(tables.reactions.n_features(), 6);
        assert_eq!(tables.taxa.feature_ids()[0], "M_ASV0;Bacteroides fragilis");
        // S1: fragilis 0.75, Akkermansia 0.25; R1 is carried by fragilis only.
        assert_relative_eq!(tables.reactions.get(0, 0), 0.75);
        assert_relative_eq!(tables.reactions.get(2, 1), 1.0);

        let labels: Vec<&str> = tables.subsystems.feature_ids().iter().map(String::as_str).collect();
        assert!(labels.contains(&"S2 | SCFA"));
        for j in 0..2 {
            assert!(tables.subsystems.col_sums()[j].is_finite());
        }
    }
}
