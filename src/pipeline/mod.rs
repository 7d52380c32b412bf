//! Feature generation and composable analysis pipelines.

mod features;
mod runner;

pub use features::{generate_features, FeatureTables};
pub use runner::{AnalysisConfig, Comparison, Pipeline, PipelineOutput, PipelineStep};
