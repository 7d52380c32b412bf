//! Reference taxonomy of the reconstruction (`spInfo` table).
//!
//! Each row describes one reconstructed organism: two alias columns used for
//! binomial matching and one column per rank from kingdom to genus.

use super::table::RawTable;
use crate::error::{MetnetError, Result};
use crate::taxonomy::TaxRank;
use std::path::Path;

/// One organism of the reference taxonomy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTaxon {
    /// Name used by the reconstruction (`AGORA.NAMES`).
    pub agora_name: String,
    /// NCBI name (`NCBI.NAMES`).
    pub ncbi_name: String,
    /// Kingdom to genus labels; missing cells are `None`.
    pub ranks: [Option<String>; 6],
}

impl ReferenceTaxon {
    /// Label at a rank above species, if recorded.
    pub fn rank_label(&self, rank: TaxRank) -> Option<&str> {
        rank.reference_column_index()
            .and_then(|i| self.ranks[i].as_deref())
    }
}

const RANK_COLUMNS: [&str; 6] = ["KINGDOM", "PHYLUM", "CLASS", "ORDER", "FAMILY", "GENUS"];

/// The reference taxonomy, in file order. Row positions are the column
/// positions of the reaction-taxon matrix.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTaxonomy {
    rows: Vec<ReferenceTaxon>,
}

impl ReferenceTaxonomy {
    pub fn new(rows: Vec<ReferenceTaxon>) -> Self {
        Self { rows }
    }

    /// Load a tab-separated `spInfo` table.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let table = RawTable::read(path, b'\t')?;
        Self::from_table(&table)
    }

    pub(crate) fn from_table(table: &RawTable) -> Result<Self> {
        let agora = table.column("AGORA.NAMES")?;
        let ncbi = table.column("NCBI.NAMES")?;
        let rank_cols = RANK_COLUMNS
            .iter()
            .map(|c| table.column(c))
            .collect::<Result<Vec<usize>>>()?;

        let rows = (0..table.len())
            .map(|row| {
                let mut ranks: [Option<String>; 6] = Default::default();
                for (slot, &col) in ranks.iter_mut().zip(&rank_cols) {
                    *slot = table.cell(row, col).map(String::from);
                }
                ReferenceTaxon {
                    agora_name: table.cell(row, agora).unwrap_or_default().to_string(),
                    ncbi_name: table.cell(row, ncbi).unwrap_or_default().to_string(),
                    ranks,
                }
            })
            .collect::<Vec<_>>();

        if rows.is_empty() {
            return Err(MetnetError::malformed(table.name(), "reference taxonomy has no rows"));
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[ReferenceTaxon] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&ReferenceTaxon> {
        self.rows.get(index)
    }

    /// Rows whose name columns contain `query`.
    ///
    /// At species rank both alias columns are searched; at other ranks only
    /// the rank's own column, skipping rows where it is missing.
    pub fn matching_rows(&self, query: &str, rank: TaxRank) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, taxon)| match rank {
                TaxRank::Species => {
                    taxon.agora_name.contains(query) || taxon.ncbi_name.contains(query)
                }
                _ => taxon
                    .rank_label(rank)
                    .map(|label| label.contains(query))
                    .unwrap_or(false),
            })
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) fn taxon(agora: &str, ncbi: &str, lineage: [&str; 6]) -> ReferenceTaxon {
        let mut ranks: [Option<String>; 6] = Default::default();
        for (slot, label) in ranks.iter_mut().zip(lineage) {
            *slot = (!label.is_empty()).then(|| label.to_string());
        }
        ReferenceTaxon {
            agora_name: agora.to_string(),
            ncbi_name: ncbi.to_string(),
            ranks,
        }
    }

    pub(crate) fn toy_reference() -> ReferenceTaxonomy {
        ReferenceTaxonomy::new(vec![
            taxon(
                "Bacteroides fragilis",
                "Bacteroides fragilis NCTC 9343",
                ["Bacteria", "Bacteroidetes", "Bacteroidia", "Bacteroidales", "Bacteroidaceae", "Bacteroides"],
            ),
            taxon(
                "Bacteroides ovatus",
                "Bacteroides ovatus ATCC 8483",
                ["Bacteria", "Bacteroidetes", "Bacteroidia", "Bacteroidales", "Bacteroidaceae", "Bacteroides"],
            ),
            taxon(
                "Akkermansia muciniphila",
                "Akkermansia muciniphila ATCC BAA-835",
                ["Bacteria", "Verrucomicrobia", "Verrucomicrobiae", "Verrucomicrobiales", "", "Akkermansia"],
            ),
        ])
    }

    #[test]
    fn test_matching_rows() {
        let reference = toy_reference();
        assert_eq!(reference.matching_rows("Bacteroides ovatus", TaxRank::Species), vec![1]);
        assert_eq!(reference.matching_rows("ATCC", TaxRank::Species), vec![1, 2]);
        assert_eq!(reference.matching_rows("Bacteroidetes", TaxRank::Phylum), vec![0, 1]);
        assert_eq!(reference.matching_rows("aceae", TaxRank::Family), vec![0, 1]);
        assert!(reference.matching_rows("Firmicutes", TaxRank::Phylum).is_empty());
    }

    #[test]
    fn test_from_tsv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "AGORA.NAMES\tNCBI.NAMES\tKINGDOM\tPHYLUM\tCLASS\tORDER\tFAMILY\tGENUS").unwrap();
        writeln!(file, "Bacteroides fragilis\tBacteroides fragilis\tBacteria\tBacteroidetes\tBacteroidia\tBacteroidales\tBacteroidaceae\tBacteroides").unwrap();
        writeln!(file, "Unclassified sp\tUnclassified\tBacteria\tNA\t\t\t\t").unwrap();
        file.flush().unwrap();

        let reference = ReferenceTaxonomy::from_tsv(file.path()).unwrap();
        assert_eq!(reference.len(), 2);
        let second = reference.get(1).unwrap();
        assert_eq!(second.rank_label(TaxRank::Kingdom), Some("Bacteria"));
        assert_eq!(second.rank_label(TaxRank::Phylum), None);
        assert_eq!(second.rank_label(TaxRank::Species), None);
    }

    #[test]
    fn test_missing_rank_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "AGORA.NAMES\tNCBI.NAMES\tKINGDOM").unwrap();
        writeln!(file, "a\tb\tc").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            ReferenceTaxonomy::from_tsv(file.path()),
            Err(MetnetError::MalformedReference { .. })
        ));
    }
}
