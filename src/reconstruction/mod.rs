//! Reference metabolic reconstructions.
//!
//! - [`ReconstructionModel`]: reactions, metabolites and taxonomy rows
//! - [`ReferenceTaxonomy`]: organism names and lineages used for matching
//! - [`ReactionTaxonMatrix`]: which reference taxa carry which reactions
//! - [`ExchangeClassTable`]: class labels of exchange reactions
//! - [`ReferenceBundle`]: all of the above, loaded from a reference directory

mod catalog;
mod class_table;
mod model;
mod reaction_taxa;
mod reference_taxonomy;
mod table;

pub use catalog::{Reconstruction, ReferenceBundle, ReferenceFiles};
pub use class_table::{ExchangeClass, ExchangeClassTable};
pub use model::{Metabolite, Reaction, ReconstructionModel};
pub use reaction_taxa::ReactionTaxonMatrix;
pub use reference_taxonomy::{ReferenceTaxon, ReferenceTaxonomy};
