//! Taxonomic ranks and their single-letter codes.

use crate::error::{MetnetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rank at which observed features are collapsed and matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TaxRank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl TaxRank {
    pub const fn all() -> &'static [Self] {
        &[
            Self::Kingdom,
            Self::Phylum,
            Self::Class,
            Self::Order,
            Self::Family,
            Self::Genus,
            Self::Species,
        ]
    }

    /// Zero-based lineage slot of this rank (Kingdom=0, Species=6).
    pub const fn depth(self) -> usize {
        match self {
            Self::Kingdom => 0,
            Self::Phylum => 1,
            Self::Class => 2,
            Self::Order => 3,
            Self::Family => 4,
            Self::Genus => 5,
            Self::Species => 6,
        }
    }

    /// Single-letter code (`k`, `p`, `c`, `o`, `f`, `g`, `s`).
    pub const fn code(self) -> char {
        match self {
            Self::Kingdom => 'k',
            Self::Phylum => 'p',
            Self::Class => 'c',
            Self::Order => 'o',
            Self::Family => 'f',
            Self::Genus => 'g',
            Self::Species => 's',
        }
    }

    /// Slot of the rank's column in the reference taxonomy. Species has no
    /// rank column; it is matched against the organism names.
    pub const fn reference_column_index(self) -> Option<usize> {
        match self {
            Self::Species => None,
            other => Some(other.depth()),
        }
    }

    /// The next shallower rank, if any.
    pub fn parent(self) -> Option<Self> {
        self.depth().checked_sub(1).map(|d| Self::all()[d])
    }
}

impl fmt::Display for TaxRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for TaxRank {
    type Err = MetnetError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|r| s.len() == 1 && s.starts_with(r.code()))
            .ok_or_else(|| MetnetError::InvalidRank(s.to_string()))
    }
}

impl TryFrom<String> for TaxRank {
    type Error = MetnetError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<TaxRank> for String {
    fn from(rank: TaxRank) -> Self {
        rank.code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes() {
        assert_eq!("s".parse::<TaxRank>().unwrap(), TaxRank::Species);
        assert_eq!("p".parse::<TaxRank>().unwrap(), TaxRank::Phylum);
        for bad in ["x", "", "species", "S"] {
            assert!(matches!(bad.parse::<TaxRank>(), Err(MetnetError::InvalidRank(_))));
        }
    }

    #[test]
    fn test_depth_and_parent() {
        assert_eq!(TaxRank::Species.depth(), 6);
        assert_eq!(TaxRank::Species.parent(), Some(TaxRank::Genus));
        assert_eq!(TaxRank::Kingdom.parent(), None);
        assert_eq!(TaxRank::Genus.reference_column_index(), Some(5));
        assert_eq!(TaxRank::Species.reference_column_index(), None);
    }

    #[test]
    fn test_serde_as_code() {
        let rank: TaxRank = serde_yaml::from_str("g").unwrap();
        assert_eq!(rank, TaxRank::Genus);
        assert!(serde_yaml::from_str::<TaxRank>("z").is_err());
    }
}
