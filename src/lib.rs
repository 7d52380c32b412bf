//! Metabolic Network Scoring Library
//!
//! This library maps microbial abundance tables onto community metabolic
//! reconstructions (AGREDA, AGORA) and compares the resulting reaction,
//! subsystem and exchange scores between groups of samples.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (AbundanceTable, ScoreMatrix, Metadata, Results)
//! - **reconstruction**: Reference reconstructions and their lookup tables
//! - **taxonomy**: Taxonomic contextualization against the reference organisms
//! - **score**: Reaction scoring and subsystem/class aggregation
//! - **test**: Hypothesis testing (Mann-Whitney U)
//! - **correct**: Multiple testing correction (Benjamini-Hochberg)
//! - **differential**: Two-group comparison of score tables
//! - **pipeline**: Feature generation, pipeline composition and execution
//!
//! # Example
//!
//! ```no_run
//! use metnet::prelude::*;
//! use std::path::Path;
//!
//! let bundle = ReferenceBundle::load(Path::new("reference"), Reconstruction::Agreda).unwrap();
//! let abundance = AbundanceTable::from_tsv("table.tsv").unwrap();
//! let taxonomy = TaxonomyTable::from_tsv("taxonomy.tsv").unwrap();
//! let metadata = Metadata::from_tsv("metadata.tsv").unwrap();
//!
//! let output = Pipeline::full("fiber", TaxRank::Species)
//!     .compare("diet", "fiber", "control")
//!     .run(&bundle, &abundance, &taxonomy, Some(&metadata))
//!     .unwrap();
//!
//! let subsystems = output.differential("subsystems").unwrap();
//! println!("{}", subsystems.summary());
//! ```

pub mod correct;
pub mod data;
pub mod differential;
pub mod error;
pub mod pipeline;
pub mod reconstruction;
pub mod score;
pub mod taxonomy;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::correct::{correct_bh, BhCorrected};
    pub use crate::data::{
        AbundanceTable, Confidence, DifferentialResult, DifferentialResultSet, FeatureSubset,
        Metadata, ResultSummary, SampleGroups, ScoreMatrix, TaxonomyTable,
    };
    pub use crate::differential::{
        compare_groups, differential_exchanges, differential_reactions, differential_subsystems,
        feature_groups, FeatureGroups,
    };
    pub use crate::error::{MetnetError, Result};
    pub use crate::pipeline::{
        generate_features, AnalysisConfig, FeatureTables, Pipeline, PipelineOutput, PipelineStep,
    };
    pub use crate::reconstruction::{
        ExchangeClassTable, ReactionTaxonMatrix, Reconstruction, ReconstructionModel,
        ReferenceBundle, ReferenceTaxonomy,
    };
    pub use crate::score::{aggregate_classes, aggregate_subsystems, exchange_scores, score_reactions};
    pub use crate::taxonomy::{contextualize, Contextualization, TaxRank};
    pub use crate::test::{mann_whitney_u, rank_sum_p_value, MannWhitneyResult};
}
