//! Exchange-reaction class table (`Exchange_metabolites` table).

use super::table::RawTable;
use crate::error::{MetnetError, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// One listed exchange reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeClass {
    pub reaction_id: String,
    /// Name of the exchanged metabolite, used for display labels.
    pub metabolite_name: Option<String>,
    /// Class label (e.g. "Sugars", "SCFA"). Listed reactions without a class
    /// keep their name but join no subsystem.
    pub class: Option<String>,
}

/// Maps exchange reactions to a class label and a metabolite name.
///
/// A reaction listed here takes its class as its sole subsystem membership
/// during subsystem aggregation, or no membership when its `Class` is empty.
#[derive(Debug, Clone, Default)]
pub struct ExchangeClassTable {
    entries: Vec<ExchangeClass>,
    index: HashMap<String, usize>,
}

impl ExchangeClassTable {
    /// Build from entries. The first entry for a reaction wins.
    pub fn new(entries: Vec<ExchangeClass>) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, e) in entries.iter().enumerate() {
            index.entry(e.reaction_id.clone()).or_insert(i);
        }
        Self { entries, index }
    }

    /// Load a tab-separated table with `rxnID` and `Class` columns and an
    /// optional `metNames` column.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let table = RawTable::read(path, b'\t')?;
        Self::from_table(&table)
    }

    pub(crate) fn from_table(table: &RawTable) -> Result<Self> {
        let id_col = table.column("rxnID")?;
        let class_col = table.column("Class")?;
        let name_col = table.optional_column("metNames");

        let mut entries = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            let Some(reaction_id) = table.cell(row, id_col) else {
                return Err(MetnetError::malformed(
                    table.name(),
                    format!("row {} has no rxnID", row + 1),
                ));
            };
            entries.push(ExchangeClass {
                reaction_id: reaction_id.to_string(),
                metabolite_name: name_col.and_then(|c| table.cell(row, c)).map(String::from),
                class: table.cell(row, class_col).map(String::from),
            });
        }
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ExchangeClass] {
        &self.entries
    }

    pub fn get(&self, reaction_id: &str) -> Option<&ExchangeClass> {
        self.index.get(reaction_id).map(|&i| &self.entries[i])
    }

    /// Override class for a reaction, if it has one.
    pub fn class_of(&self, reaction_id: &str) -> Option<&str> {
        self.get(reaction_id).and_then(|e| e.class.as_deref())
    }

    pub fn metabolite_name(&self, reaction_id: &str) -> Option<&str> {
        self.get(reaction_id).and_then(|e| e.metabolite_name.as_deref())
    }

    /// Distinct class labels, sorted.
    pub fn classes(&self) -> BTreeSet<&str> {
        self.entries.iter().filter_map(|e| e.class.as_deref()).collect()
    }
}
