//! Reaction scoring and aggregation.
//!
//! - [`score_reactions`]: reactions × samples from contextualized frequencies
//! - [`aggregate_subsystems`]: mean reaction score per subsystem
//! - [`aggregate_classes`]: mean exchange score per exchange class
//! - [`exchange_scores`]: the exchange (or input-reaction) slice of the scores

mod aggregate;
mod reactions;

pub use aggregate::{
    aggregate_classes, aggregate_subsystems, exchange_reactions, exchange_scores,
    subsystem_incidence, subsystem_labels, IncidenceMatrix,
};
pub use reactions::{reaction_weights, score_reactions};
