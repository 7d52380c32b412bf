//! Named reconstructions and the on-disk layout of their reference files.

use super::class_table::ExchangeClassTable;
use super::model::ReconstructionModel;
use super::reaction_taxa::ReactionTaxonMatrix;
use super::reference_taxonomy::ReferenceTaxonomy;
use super::table::RawTable;
use crate::data::FeatureSubset;
use crate::error::{MetnetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// A supported community metabolic reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reconstruction {
    #[serde(rename = "AGREDA")]
    Agreda,
    #[serde(rename = "AGORAv103")]
    AgoraV103,
    #[serde(rename = "AGORAv201")]
    AgoraV201,
}

/// Reference files of one reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceFiles {
    pub reactions: PathBuf,
    pub metabolites: PathBuf,
    pub taxonomy: PathBuf,
    pub species: PathBuf,
    pub reaction_taxa: PathBuf,
    pub exchange_classes: PathBuf,
    pub input_reactions: PathBuf,
}

impl Reconstruction {
    pub const ALL: [Reconstruction; 3] = [Self::Agreda, Self::AgoraV103, Self::AgoraV201];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Agreda => "AGREDA",
            Self::AgoraV103 => "AGORAv103",
            Self::AgoraV201 => "AGORAv201",
        }
    }

    fn file_prefix(&self) -> &'static str {
        match self {
            Self::Agreda => "AGREDA",
            Self::AgoraV103 => "AGORA_v1.0.3-M",
            Self::AgoraV201 => "AGORA_v2.0.1",
        }
    }

    /// Locate the reference files under `root`.
    pub fn files(&self, root: &Path) -> ReferenceFiles {
        let dir = root.join(self.name());
        let prefix = self.file_prefix();
        let file = |suffix: &str| dir.join(format!("{}_{}", prefix, suffix));
        let species = match self {
            Self::AgoraV103 => dir.join("AGORA_v1.0.3_spInfo.tsv"),
            _ => file("spInfo.tsv"),
        };
        ReferenceFiles {
            reactions: file("rxnInfo.csv"),
            metabolites: file("metInfo.csv"),
            taxonomy: file("taxonomy.csv"),
            species,
            reaction_taxa: file("rxnTaxMat.csv"),
            exchange_classes: file("Exchange_metabolites.tsv"),
            input_reactions: file("Input_reactions.tsv"),
        }
    }
}

impl fmt::Display for Reconstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Reconstruction {
    type Err = MetnetError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.name() == s.trim())
            .ok_or_else(|| MetnetError::UnknownReconstruction { name: s.to_string() })
    }
}

/// Everything a scoring run needs from the reference directory, loaded once
/// and shared read-only.
#[derive(Debug, Clone)]
pub struct ReferenceBundle {
    pub reconstruction: Reconstruction,
    pub model: ReconstructionModel,
    pub reference: ReferenceTaxonomy,
    pub reaction_taxa: ReactionTaxonMatrix,
    pub exchange_classes: ExchangeClassTable,
    /// Input-reaction allow-list; absent when the file is not shipped.
    pub input_reactions: Option<FeatureSubset>,
}

impl ReferenceBundle {
    /// Load and cross-check all reference tables of a reconstruction.
    pub fn load(root: &Path, reconstruction: Reconstruction) -> Result<Self> {
        let files = reconstruction.files(root);
        info!(reconstruction = %reconstruction, dir = %root.display(), "loading reference tables");

        let model = ReconstructionModel::load(&files.reactions, &files.metabolites, &files.taxonomy)?;
        let reference = ReferenceTaxonomy::from_table(&RawTable::read(&files.species, b'\t')?)?;
        let reaction_taxa = ReactionTaxonMatrix::from_csv(&files.reaction_taxa)?;
        let exchange_classes = ExchangeClassTable::from_tsv(&files.exchange_classes)?;
        let input_reactions = if files.input_reactions.exists() {
            Some(FeatureSubset::from_tsv(&files.input_reactions)?)
        } else {
            None
        };

        let bundle = Self::from_parts(
            reconstruction,
            model,
            reference,
            reaction_taxa,
            exchange_classes,
            input_reactions,
        )?;
        info!(
            reactions = bundle.model.n_reactions(),
            taxa = bundle.reference.len(),
            classes = bundle.exchange_classes.len(),
            "reference tables loaded"
        );
        Ok(bundle)
    }

    /// Assemble a bundle, checking that the reaction-taxon matrix lines up with
    /// the model's reactions and the reference taxonomy's rows.
    pub fn from_parts(
        reconstruction: Reconstruction,
        model: ReconstructionModel,
        reference: ReferenceTaxonomy,
        reaction_taxa: ReactionTaxonMatrix,
        exchange_classes: ExchangeClassTable,
        input_reactions: Option<FeatureSubset>,
    ) -> Result<Self> {
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
        if reaction_taxa.n_taxa() != reference.len() {
            return Err(MetnetError::malformed(
                "rxnTaxMat",
                format!(
                    "{} columns but the reference taxonomy has {} rows",
                    reaction_taxa.n_taxa(),
                    reference.len()
                ),
            ));
        }
        Ok(Self {
            reconstruction,
            model,
            reference,
            reaction_taxa,
            exchange_classes,
            input_reactions,
        })
    }

    /// The input-reaction allow-list, required when exchanges are restricted.
    pub fn required_inputs(&self) -> Result<&FeatureSubset> {
        self.input_reactions.as_ref().ok_or_else(|| {
            MetnetError::malformed(
                "Input_reactions",
                format!("{} ships no input-reaction list", self.reconstruction),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("AGREDA".parse::<Reconstruction>().unwrap(), Reconstruction::Agreda);
        assert_eq!("AGORAv201".parse::<Reconstruction>().unwrap(), Reconstruction::AgoraV201);
        assert!(matches!(
            "agreda".parse::<Reconstruction>(),
            Err(MetnetError::UnknownReconstruction { .. })
        ));
    }

    #[test]
    fn test_file_layout() {
        let root = Path::new("/ref");
        let agreda = Reconstruction::Agreda.files(root);
        assert_eq!(agreda.reactions, Path::new("/ref/AGREDA/AGREDA_rxnInfo.csv"));
        assert_eq!(agreda.input_reactions, Path::new("/ref/AGREDA/AGREDA_Input_reactions.tsv"));

        let v103 = Reconstruction::AgoraV103.files(root);
        assert_eq!(v103.metabolites, Path::new("/ref/AGORAv103/AGORA_v1.0.3-M_metInfo.csv"));
        assert_eq!(v103.species, Path::new("/ref/AGORAv103/AGORA_v1.0.3_spInfo.tsv"));

        let v201 = Reconstruction::AgoraV201.files(root);
        assert_eq!(v201.reaction_taxa, Path::new("/ref/AGORAv201/AGORA_v2.0.1_rxnTaxMat.csv"));
    }

    #[test]
    fn test_serde_names() {
        let yaml = serde_yaml::to_string(&Reconstruction::AgoraV103).unwrap();
        assert_eq!(yaml.trim(), "AGORAv103");
        let back: Reconstruction = serde_yaml::from_str("AGREDA").unwrap();
        assert_eq!(back, Reconstruction::Agreda);
    }
}
