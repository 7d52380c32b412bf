//! Immutable in-memory metabolic reconstruction.
//!
//! A reconstruction is loaded once per analysis from three reference tables
//! (reactions, metabolites, taxonomy) and then passed by reference into every
//! scoring stage. Multi-membership subsystem fields and reaction taxon lists
//! are parsed once here so the aggregation loops never split strings.

use super::table::RawTable;
use crate::error::{MetnetError, Result};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

static EXCHANGE_SUBSYSTEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Exchange/demand reaction").expect("valid regex"));
static EXCLUDED_METABOLITE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"mucin").expect("valid regex"));

/// One reaction of the reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Stable reaction identifier (`rxnID`).
    pub id: String,
    /// Short reaction abbreviation (`rxns`), when provided.
    pub abbreviation: Option<String>,
    /// Human-readable name (`rxnNames`), when provided.
    pub name: Option<String>,
    /// Code of the balanced metabolite (`eqMet`), matched against metabolite codes.
    pub balanced_metabolite: Option<String>,
    subsystem_field: Option<String>,
    subsystems: BTreeSet<String>,
    taxa: Vec<usize>,
}

impl Reaction {
    /// Parse a reaction from its raw fields.
    ///
    /// `subsystems` is a `;`-joined membership list; `taxa` is a `;`-joined
    /// list of 1-based taxonomy-row indices.
    pub fn parse(
        id: &str,
        subsystems: Option<&str>,
        balanced_metabolite: Option<&str>,
        taxa: Option<&str>,
    ) -> Result<Self> {
        let subsystem_field = subsystems.map(str::trim).filter(|s| !s.is_empty());
        let mut labels = BTreeSet::new();
        if let Some(field) = subsystem_field {
            for segment in field.split(';') {
                let segment = segment.trim();
                if segment.is_empty() {
                    return Err(MetnetError::malformed(
                        "reactions",
                        format!("reaction '{}' has an empty subsystem segment in '{}'", id, field),
                    ));
                }
                labels.insert(segment.to_string());
            }
        }

        let taxa = match taxa.map(str::trim).filter(|s| !s.is_empty()) {
            Some(field) => field
                .split(';')
                .map(|t| parse_taxon_index(id, t.trim()))
                .collect::<Result<Vec<usize>>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            id: id.to_string(),
            abbreviation: None,
            name: None,
            balanced_metabolite: balanced_metabolite
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
            subsystem_field: subsystem_field.map(String::from),
            subsystems: labels,
            taxa,
        })
    }

    /// Raw subsystem field as stored in the reference table.
    pub fn subsystem_field(&self) -> Option<&str> {
        self.subsystem_field.as_deref()
    }

    /// Distinct subsystem labels of this reaction.
    pub fn subsystems(&self) -> &BTreeSet<String> {
        &self.subsystems
    }

    /// 0-based taxonomy-row indices of the taxa carrying this reaction.
    pub fn taxa(&self) -> &[usize] {
        &self.taxa
    }
}

fn parse_taxon_index(reaction: &str, raw: &str) -> Result<usize> {
    let value = raw
        .parse::<usize>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.fract() == 0.0 && *v >= 0.0)
                .map(|v| v as usize)
        })
        .ok_or_else(|| {
            MetnetError::malformed(
                "reactions",
                format!("reaction '{}' has a non-integer taxon index '{}'", reaction, raw),
            )
        })?;
    value.checked_sub(1).ok_or_else(|| {
        MetnetError::malformed(
            "reactions",
            format!("reaction '{}' has taxon index 0; indices are 1-based", reaction),
        )
    })
}

/// One metabolite of the reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Metabolite {
    /// Stable identifier (`metID`).
    pub id: String,
    /// Internal code (`mets`), e.g. `glc_D[e]`.
    pub code: String,
    /// Human-readable name (`metNames`).
    pub name: String,
}

/// A community-scale metabolic reconstruction.
#[derive(Debug, Clone)]
pub struct ReconstructionModel {
    reactions: Vec<Reaction>,
    metabolites: Vec<Metabolite>,
    taxonomy_rows: Vec<String>,
    reaction_index: HashMap<String, usize>,
    metabolite_index: HashMap<String, usize>,
}

impl ReconstructionModel {
    /// Load a reconstruction from its reaction, metabolite and taxonomy CSV tables.
    pub fn load<P: AsRef<Path>>(reactions: P, metabolites: P, taxonomy: P) -> Result<Self> {
        let reactions = RawTable::read(reactions, b',')?;
        let metabolites = RawTable::read(metabolites, b',')?;
        let taxonomy = RawTable::read(taxonomy, b',')?;
        Self::from_tables(&reactions, &metabolites, &taxonomy)
    }

    pub(crate) fn from_tables(
        reactions: &RawTable,
        metabolites: &RawTable,
        taxonomy: &RawTable,
    ) -> Result<Self> {
        let id_col = reactions.column("rxnID")?;
        let sub_col = reactions.column("subSystems")?;
        let met_col = reactions.column("eqMet")?;
        let tax_col = reactions.column("taxonomy")?;
        let abbr_col = reactions.optional_column("rxns");
        let name_col = reactions.optional_column("rxnNames");

        let mut parsed = Vec::with_capacity(reactions.len());
        for row in 0..reactions.len() {
            let id = reactions.cell(row, id_col).ok_or_else(|| {
                MetnetError::malformed(reactions.name(), format!("row {} has no rxnID", row + 1))
            })?;
            let mut reaction = Reaction::parse(
                id,
                reactions.cell(row, sub_col),
                reactions.cell(row, met_col),
                reactions.cell(row, tax_col),
            )?;
            reaction.abbreviation = abbr_col.and_then(|c| reactions.cell(row, c)).map(String::from);
            reaction.name = name_col.and_then(|c| reactions.cell(row, c)).map(String::from);
            parsed.push(reaction);
        }

        let met_id_col = metabolites.column("metID")?;
        let met_code_col = metabolites.column("mets")?;
        let met_name_col = metabolites.column("metNames")?;
        let mut mets = Vec::with_capacity(metabolites.len());
        for row in 0..metabolites.len() {
            let code = metabolites.cell(row, met_code_col).ok_or_else(|| {
                MetnetError::malformed(metabolites.name(), format!("row {} has no mets code", row + 1))
            })?;
            mets.push(Metabolite {
                id: metabolites.cell(row, met_id_col).unwrap_or_default().to_string(),
                code: code.to_string(),
                name: metabolites.cell(row, met_name_col).unwrap_or_default().to_string(),
            });
        }

        let tax_name_col = taxonomy.column("taxonomy")?;
        let taxonomy_rows = (0..taxonomy.len())
            .map(|row| taxonomy.cell(row, tax_name_col).unwrap_or_default().to_string())
            .collect();

        Self::from_parts(parsed, mets, taxonomy_rows)
    }

    /// Assemble a model from parsed records, checking cross-table references.
    pub fn from_parts(
        reactions: Vec<Reaction>,
        metabolites: Vec<Metabolite>,
        taxonomy_rows: Vec<String>,
    ) -> Result<Self> {
        let mut reaction_index = HashMap::with_capacity(reactions.len());
        for (i, r) in reactions.iter().enumerate() {
            if reaction_index.insert(r.id.clone(), i).is_some() {
                return Err(MetnetError::malformed(
                    "reactions",
                    format!("duplicate reaction identifier '{}'", r.id),
                ));
            }
        }

        let metabolite_index: HashMap<String, usize> = metabolites
            .iter()
            .enumerate()
            .map(|(i, m)| (m.code.clone(), i))
            .collect();

        for r in &reactions {
            if let Some(&bad) = r.taxa.iter().find(|&&t| t >= taxonomy_rows.len()) {
                return Err(MetnetError::malformed(
                    "reactions",
                    format!(
                        "reaction '{}' references taxon {} but the taxonomy has {} rows",
                        r.id,
                        bad + 1,
                        taxonomy_rows.len()
                    ),
                ));
            }
            if let Some(met) = &r.balanced_metabolite {
                if !metabolite_index.contains_key(met) {
                    return Err(MetnetError::malformed(
                        "reactions",
                        format!("reaction '{}' references unknown metabolite '{}'", r.id, met),
                    ));
                }
            }
        }

        Ok(Self {
            reactions,
            metabolites,
            taxonomy_rows,
            reaction_index,
            metabolite_index,
        })
    }

    pub fn n_reactions(&self) -> usize {
        self.reactions.len()
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn metabolites(&self) -> &[Metabolite] {
        &self.metabolites
    }

    pub fn taxonomy_rows(&self) -> &[String] {
        &self.taxonomy_rows
    }

    /// Reaction identifiers in model order.
    pub fn reaction_ids(&self) -> Vec<String> {
        self.reactions.iter().map(|r| r.id.clone()).collect()
    }

    pub fn reaction(&self, id: &str) -> Option<&Reaction> {
        self.reaction_index.get(id).map(|&i| &self.reactions[i])
    }

    pub fn reaction_position(&self, id: &str) -> Option<usize> {
        self.reaction_index.get(id).copied()
    }

    /// Metabolite balanced by a reaction, looked up through its `eqMet` code.
    pub fn balanced_metabolite(&self, reaction: &Reaction) -> Option<&Metabolite> {
        let code = reaction.balanced_metabolite.as_ref()?;
        self.metabolite_index.get(code).map(|&i| &self.metabolites[i])
    }

    /// Name of the metabolite balanced by the reaction `reaction_id`.
    pub fn metabolite_name(&self, reaction_id: &str) -> Option<&str> {
        self.reaction(reaction_id)
            .and_then(|r| self.balanced_metabolite(r))
            .map(|m| m.name.as_str())
    }

    /// Identifiers of exchange reactions, in model order.
    ///
    /// A reaction is an exchange when its subsystem field starts with
    /// `Exchange/demand reaction` and the name of its balanced metabolite does
    /// not mention mucin.
    pub fn exchange_reaction_ids(&self) -> Vec<String> {
        self.reactions
            .iter()
            .filter(|r| {
                r.subsystem_field()
                    .map(|s| EXCHANGE_SUBSYSTEM.is_match(s))
                    .unwrap_or(false)
            })
            .filter(|r| {
                !self
                    .balanced_metabolite(r)
                    .map(|m| EXCLUDED_METABOLITE.is_match(&m.name))
                    .unwrap_or(false)
            })
            .map(|r| r.id.clone())
            .collect()
    }

    /// Reactions carried by at least one of the named taxa.
    ///
    /// Returns `(reaction position, number of the named taxa carrying it)`.
    pub fn present_reactions(&self, taxa: &[&str]) -> Vec<(usize, usize)> {
        let wanted: HashSet<&str> = taxa.iter().copied().collect();
        self.reactions
            .iter()
            .enumerate()
            .filter_map(|(i, r)| {
                let carriers: HashSet<&str> = r
                    .taxa
                    .iter()
                    .map(|&t| self.taxonomy_rows[t].as_str())
                    .collect();
                let count = wanted.iter().filter(|t| carriers.contains(*t)).count();
                (count > 0).then_some((i, count))
            })
            .collect()
    }

    /// Subsystem fields of the reactions carried by the named taxa, with the
    /// number of such reactions per field.
    pub fn related_subsystems(&self, taxa: &[&str]) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for (i, _) in self.present_reactions(taxa) {
            if let Some(field) = self.reactions[i].subsystem_field() {
                *counts.entry(field.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const EXCHANGE: &str = "Exchange/demand reaction";

    pub(crate) fn toy_model() -> ReconstructionModel {
        let reactions = vec![
            Reaction::parse("R1", Some("Glycolysis"), None, Some("1;2")).unwrap(),
            Reaction::parse("R2", None, None, Some("2")).unwrap(),
            Reaction::parse("EX_glc", Some(EXCHANGE), Some("glc_D[e]"), Some("1;2;3")).unwrap(),
            Reaction::parse("EX_muc", Some(EXCHANGE), Some("muc2[e]"), Some("3")).unwrap(),
            Reaction::parse("EX_ac", Some(EXCHANGE), Some("ac[e]"), Some("1")).unwrap(),
            Reaction::parse("R3", Some("Glycolysis; TCA cycle"), None, Some("3")).unwrap(),
        ];
        let metabolites = vec![
            Metabolite { id: "M1".into(), code: "glc_D[e]".into(), name: "D-Glucose".into() },
            Metabolite { id: "M2".into(), code: "muc2[e]".into(), name: "mucin type 2".into() },
            Metabolite { id: "M3".into(), code: "ac[e]".into(), name: "Acetate".into() },
        ];
        let taxonomy = vec![
            "Bacteroides fragilis".to_string(),
            "Bacteroides ovatus".to_string(),
            "Akkermansia muciniphila".to_string(),
        ];
        ReconstructionModel::from_parts(reactions, metabolites, taxonomy).unwrap()
    }

    #[test]
    fn test_subsystem_parsing() {
        let r = Reaction::parse("R", Some(" Glycolysis ; TCA cycle"), None, None).unwrap();
        let labels: Vec<&str> = r.subsystems().iter().map(String::as_str).collect();
        assert_eq!(labels, vec!["Glycolysis", "TCA cycle"]);

        let missing = Reaction::parse("R", None, None, None).unwrap();
        assert!(missing.subsystems().is_empty());
        assert_eq!(missing.subsystem_field(), None);

        assert!(Reaction::parse("R", Some("Glycolysis;;TCA"), None, None).is_err());
    }

    #[test]
    fn test_taxon_indices_are_one_based() {
        let r = Reaction::parse("R", None, None, Some("1;3.0")).unwrap();
        assert_eq!(r.taxa(), &[0, 2]);
        assert!(Reaction::parse("R", None, None, Some("0")).is_err());
        assert!(Reaction::parse("R", None, None, Some("x")).is_err());
    }

    #[test]
    fn test_taxon_index_out_of_range() {
        let reactions = vec![Reaction::parse("R1", None, None, Some("4")).unwrap()];
        let err = ReconstructionModel::from_parts(reactions, vec![], vec!["a".into()]).unwrap_err();
        assert!(matches!(err, MetnetError::MalformedReference { .. }));
    }

    #[test]
    fn test_exchange_ids_exclude_mucin() {
        let model = toy_model();
        assert_eq!(model.exchange_reaction_ids(), vec!["EX_glc", "EX_ac"]);
        assert_eq!(model.metabolite_name("EX_ac"), Some("Acetate"));
        assert_eq!(model.metabolite_name("R1"), None);
    }

    #[test]
    fn test_present_reactions_and_subsystems() {
        let model = toy_model();
        let present = model.present_reactions(&["Bacteroides ovatus", "Bacteroides fragilis"]);
        assert_eq!(present, vec![(0, 2), (1, 1), (2, 2), (4, 1)]);

        let related = model.related_subsystems(&["Akkermansia muciniphila"]);
        assert_eq!(related.get("Exchange/demand reaction"), Some(&2));
        assert_eq!(related.get("Glycolysis; TCA cycle"), Some(&1));
    }

    #[test]
    fn test_load_from_csv() {
        let mut rxns = NamedTempFile::new().unwrap();
        writeln!(rxns, "rxnID,rxns,rxnNames,subSystems,lb,ub,c,eqMet,eqS,taxonomy").unwrap();
        writeln!(rxns, "R1,HEX1,Hexokinase,Glycolysis,0,1000,0,,,1;2").unwrap();
        writeln!(
            rxns,
            "EX_glc,EX_glc(e),Glucose exchange,Exchange/demand reaction,-1000,1000,0,glc_D[e],-1,2"
        )
        .unwrap();
        rxns.flush().unwrap();
        let mut mets = NamedTempFile::new().unwrap();
        writeln!(mets, "metID,mets,metNames,metFormulas").unwrap();
        writeln!(mets, "M1,glc_D[e],D-Glucose,C6H12O6").unwrap();
        mets.flush().unwrap();
        let mut tax = NamedTempFile::new().unwrap();
        writeln!(tax, "taxonomy").unwrap();
        writeln!(tax, "Bacteroides fragilis").unwrap();
        writeln!(tax, "Bacteroides ovatus").unwrap();
        tax.flush().unwrap();

        let model = ReconstructionModel::load(rxns.path(), mets.path(), tax.path()).unwrap();
        assert_eq!(model.reaction_ids(), vec!["R1", "EX_glc"]);
        assert_eq!(model.reaction("R1").unwrap().name.as_deref(), Some("Hexokinase"));
        let ex = model.reaction("EX_glc").unwrap();
        assert_eq!(model.balanced_metabolite(ex).unwrap().name, "D-Glucose");
    }

    #[test]
    fn test_load_missing_column() {
        let mut rxns = NamedTempFile::new().unwrap();
        writeln!(rxns, "rxnID,subSystems,taxonomy").unwrap();
        writeln!(rxns, "R1,Glycolysis,1").unwrap();
        rxns.flush().unwrap();
        let mut mets = NamedTempFile::new().unwrap();
        writeln!(mets, "metID,mets,metNames").unwrap();
        mets.flush().unwrap();
        let mut tax = NamedTempFile::new().unwrap();
        writeln!(tax, "taxonomy").unwrap();
        writeln!(tax, "a").unwrap();
        tax.flush().unwrap();

        let err = ReconstructionModel::load(rxns.path(), mets.path(), tax.path()).unwrap_err();
        assert!(matches!(err, MetnetError::MalformedReference { .. }));
    }
}
