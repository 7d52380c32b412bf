//! Statistical hypothesis testing for two-group score comparisons.

pub mod mann_whitney;

pub use mann_whitney::{mann_whitney_u, rank_sum_p_value, MannWhitneyMethod, MannWhitneyResult};
