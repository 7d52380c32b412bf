//! Lineage string normalization.

use super::rank::TaxRank;
use regex::Regex;
use std::sync::LazyLock;

const RANK_PLACEHOLDERS: [&str; 7] = ["k__", "p__", "c__", "o__", "f__", "g__", "s__"];

static RANK_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w__").expect("valid regex"));

/// Pad a `;`-separated lineage to seven rank slots with empty placeholders.
/// Longer lineages are returned unchanged.
pub fn fill_lineage(taxon: &str) -> String {
    let mut levels: Vec<&str> = taxon.split(';').collect();
    if levels.len() < RANK_PLACEHOLDERS.len() {
        levels.extend_from_slice(&RANK_PLACEHOLDERS[levels.len()..]);
    }
    levels.join(";")
}

/// Strip rank prefixes and brackets from one token; `NA` becomes empty.
pub fn clean_token(token: &str) -> String {
    let stripped = RANK_PREFIX.replace_all(token.trim(), "");
    let cleaned: String = stripped.chars().filter(|c| !matches!(c, '[' | ']')).collect();
    let cleaned = cleaned.trim();
    if cleaned == "NA" {
        String::new()
    } else {
        cleaned.to_string()
    }
}

/// A filled and cleaned lineage, one token per rank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Lineage {
    tokens: Vec<String>,
}

impl Lineage {
    /// Fill and clean a raw lineage string such as
    /// `k__Bacteria; p__Firmicutes; c__[Clostridia]`.
    pub fn parse(raw: &str) -> Self {
        let tokens = fill_lineage(raw).split(';').map(clean_token).collect();
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Label at a rank, empty when unresolved.
    pub fn at(&self, rank: TaxRank) -> Option<&str> {
        self.tokens.get(rank.depth()).map(String::as_str)
    }

    /// Cut the lineage after `rank`. Returns `None` when the lineage does not
    /// reach the rank or the rank's label is empty.
    pub fn truncate(&self, rank: TaxRank) -> Option<Self> {
        let depth = rank.depth();
        match self.tokens.get(depth) {
            Some(label) if !label.is_empty() => Some(Self {
                tokens: self.tokens[..=depth].to_vec(),
            }),
            _ => None,
        }
    }

    /// `;`-joined key used to group features.
    pub fn key(&self) -> String {
        self.tokens.join(";")
    }

    /// Reference query for a lineage truncated at `rank`.
    ///
    /// At species rank the genus is prepended to form a binomial.
    pub fn query(&self, rank: TaxRank) -> Option<String> {
        let label = self.at(rank)?;
        match rank {
            TaxRank::Species => {
                let genus = rank.parent().and_then(|p| self.at(p)).unwrap_or_default();
                let genus = genus.split("__").nth(1).unwrap_or(genus);
                Some(format!("{} {}", genus, label))
            }
            _ => Some(label.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_lineage() {
        assert_eq!(fill_lineage("k__Bacteria;p__Firmicutes"), "k__Bacteria;p__Firmicutes;c__;o__;f__;g__;s__");
        let full = "k__A;p__B;c__C;o__D;f__E;g__F;s__G";
        assert_eq!(fill_lineage(full), full);
        assert_eq!(fill_lineage(&fill_lineage("k__A")), fill_lineage("k__A"));
    }

    #[test]
    fn test_clean_tokens() {
        assert_eq!(clean_token(" p__[Firmicutes] "), "Firmicutes");
        assert_eq!(clean_token("s__NA"), "");
        assert_eq!(clean_token("D_0__Bacteria"), "D_Bacteria");
        assert_eq!(clean_token("g__"), "");
    }

    #[test]
    fn test_truncate() {
        let lineage = Lineage::parse("k__Bacteria; p__Firmicutes; c__Clostridia");
        assert_eq!(lineage.tokens().len(), 7);
        assert_eq!(
            lineage.truncate(TaxRank::Phylum).map(|l| l.key()),
            Some("Bacteria;Firmicutes".to_string())
        );
        assert!(lineage.truncate(TaxRank::Genus).is_none());
    }

    #[test]
    fn test_species_query() {
        let lineage = Lineage::parse("k__Bacteria;p__Bacteroidetes;c__Bacteroidia;o__Bacteroidales;f__Bacteroidaceae;g__Bacteroides;s__ovatus");
        let truncated = lineage.truncate(TaxRank::Species).unwrap();
        assert_eq!(truncated.query(TaxRank::Species).as_deref(), Some("Bacteroides ovatus"));
        assert_eq!(truncated.query(TaxRank::Family).as_deref(), Some("Bacteroidaceae"));
    }
}
