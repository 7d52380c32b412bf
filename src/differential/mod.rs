//! Differential analysis of score matrices between two sample groups.

mod compare;
mod lookup;

pub use compare::{compare_groups, differential_exchanges, differential_reactions, differential_subsystems};
pub use lookup::{feature_groups, FeatureGroups};
