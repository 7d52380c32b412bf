//! Taxonomic contextualization of observed abundance tables.

mod contextualize;
mod lineage;
mod rank;

pub use contextualize::{
    collapse_by_lineage, contextualize, normalize_columns, CollapsedUnits, Contextualization,
    TaxonomicUnit,
};
pub use lineage::{clean_token, fill_lineage, Lineage};
pub use rank::TaxRank;
