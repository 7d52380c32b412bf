//! Error types for the metnet library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum MetnetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid abundance value '{value}' at row {row}, column {col}")]
    InvalidAbundance {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Invalid taxonomic rank '{0}': select among k, p, c, o, f, g, s (kingdom, phylum, class, order, family, genus, species)")]
    InvalidRank(String),

    #[error("No samples match the reference reconstruction at rank '{rank}'")]
    NoReferenceMatch { rank: String },

    #[error("Malformed reference table '{table}': {reason}")]
    MalformedReference { table: String, reason: String },

    #[error("Unknown reconstruction '{name}': select among AGREDA, AGORAv103, AGORAv201")]
    UnknownReconstruction { name: String },

    #[error("Feature '{feature}' not found in the {stage}")]
    FeatureNotFound { feature: String, stage: String },

    #[error("Feature '{0}' has no lineage in the taxonomy table")]
    MissingLineage(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Sample ID mismatch: {0}")]
    SampleMismatch(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MetnetError {
    pub(crate) fn malformed(table: &str, reason: impl Into<String>) -> Self {
        MetnetError::MalformedReference {
            table: table.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(feature: &str, stage: &str) -> Self {
        MetnetError::FeatureNotFound {
            feature: feature.to_string(),
            stage: stage.to_string(),
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, MetnetError>;
