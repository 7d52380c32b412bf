//! Data structures for contextualization and differential analysis.

mod abundance;
mod feature_subset;
mod metadata;
mod result;
mod score_matrix;
mod taxonomy;

pub use abundance::AbundanceTable;
pub use feature_subset::FeatureSubset;
pub use metadata::{Metadata, SampleGroups};
pub(crate) use result::is_subsystem_key;
pub use result::{
    feature_id_from_label, result_order, Confidence, DifferentialResult, DifferentialResultSet,
    ResultSummary,
};
pub use score_matrix::ScoreMatrix;
pub use taxonomy::TaxonomyTable;
