//! Pipeline runner for composing and executing scoring and testing steps.

use crate::data::{AbundanceTable, DifferentialResultSet, Metadata, SampleGroups, ScoreMatrix, TaxonomyTable};
use crate::differential::{compare_groups, differential_exchanges, differential_reactions, differential_subsystems};
use crate::error::{MetnetError, Result};
use crate::reconstruction::{Reconstruction, ReferenceBundle};
use crate::score::{aggregate_classes, aggregate_subsystems, score_reactions};
use crate::taxonomy::{contextualize, Contextualization, TaxRank};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// A step in the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineStep {
    // === Feature generation ===
    /// Map the abundance table onto the reference taxonomy.
    Contextualize { rank: TaxRank },
    /// Score every reaction in every sample.
    ScoreReactions,
    /// Mean reaction score per subsystem; exchange classes override membership.
    AggregateSubsystems,
    /// Mean exchange score per exchange class.
    AggregateClasses { restrict_to_inputs: bool },

    // === Differential testing ===
    DifferentialReactions,
    DifferentialSubsystems,
    /// Exchange reactions (or the input-reaction list) labelled with metabolite names.
    DifferentialExchanges { restrict_to_inputs: bool },
    DifferentialClasses,
}

/// The two groups being compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    /// Metadata column holding the group labels.
    pub column: String,
    pub condition: String,
    pub control: String,
}

/// Analysis configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub name: String,
    pub description: Option<String>,
    pub reconstruction: Reconstruction,
    /// Directory holding one sub-directory per reconstruction.
    #[serde(default)]
    pub reference_dir: Option<PathBuf>,
    #[serde(default)]
    pub comparison: Option<Comparison>,
    pub steps: Vec<PipelineStep>,
}

impl AnalysisConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(MetnetError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(MetnetError::from)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(MetnetError::from)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(MetnetError::from)
    }

    /// The full feature generation and testing workflow at `rank`.
    pub fn example(rank: TaxRank) -> Self {
        let pipeline = Pipeline::full("metnet-example", rank).compare("diet", "fiber", "control");
        pipeline.to_config(
            Reconstruction::Agreda,
            Some("Score reactions, subsystems and exchange classes, then test fiber against control"),
        )
    }
}

/// Builder for constructing and running analysis pipelines.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    name: String,
    comparison: Option<Comparison>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            name: "unnamed".to_string(),
            comparison: None,
        }
    }

    /// Create from a config.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            steps: config.steps.clone(),
            name: config.name.clone(),
            comparison: config.comparison.clone(),
        }
    }

    /// Every generation and testing step, in dependency order.
    pub fn full(name: &str, rank: TaxRank) -> Self {
        Self::new()
            .name(name)
            .contextualize(rank)
            .score_reactions()
            .aggregate_subsystems()
            .aggregate_classes(false)
            .differential_reactions()
            .differential_subsystems()
            .differential_exchanges(false)
            .differential_classes()
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Compare `condition` against `control` using the metadata `column`.
    pub fn compare(mut self, column: &str, condition: &str, control: &str) -> Self {
        self.comparison = Some(Comparison {
            column: column.to_string(),
            condition: condition.to_string(),
            control: control.to_string(),
        });
        self
    }

    pub fn contextualize(mut self, rank: TaxRank) -> Self {
        self.steps.push(PipelineStep::Contextualize { rank });
        self
    }

    pub fn score_reactions(mut self) -> Self {
        self.steps.push(PipelineStep::ScoreReactions);
        self
    }

    pub fn aggregate_subsystems(mut self) -> Self {
        self.steps.push(PipelineStep::AggregateSubsystems);
        self
    }

    /// Add class aggregation, optionally limited to the input-reaction list.
    pub fn aggregate_classes(mut self, restrict_to_inputs: bool) -> Self {
        self.steps.push(PipelineStep::AggregateClasses { restrict_to_inputs });
        self
    }

    pub fn differential_reactions(mut self) -> Self {
        self.steps.push(PipelineStep::DifferentialReactions);
        self
    }

    pub fn differential_subsystems(mut self) -> Self {
        self.steps.push(PipelineStep::DifferentialSubsystems);
        self
    }

    pub fn differential_exchanges(mut self, restrict_to_inputs: bool) -> Self {
        self.steps.push(PipelineStep::DifferentialExchanges { restrict_to_inputs });
        self
    }

    pub fn differential_classes(mut self) -> Self {
        self.steps.push(PipelineStep::DifferentialClasses);
        self
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, reconstruction: Reconstruction, description: Option<&str>) -> AnalysisConfig {
        AnalysisConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            reconstruction,
            reference_dir: None,
            comparison: self.comparison.clone(),
            steps: self.steps.clone(),
        }
    }

    /// Run the pipeline against a loaded reference bundle.
    pub fn run(
        &self,
        bundle: &ReferenceBundle,
        abundance: &AbundanceTable,
        taxonomy: &TaxonomyTable,
        metadata: Option<&Metadata>,
    ) -> Result<PipelineOutput> {
        let groups = match (&self.comparison, metadata) {
            (Some(c), Some(m)) => Some(m.groups(&c.column)?),
            _ => None,
        };
        let mut state = PipelineState::new(bundle, abundance, taxonomy, self.comparison.as_ref(), groups);

        for (i, step) in self.steps.iter().enumerate() {
            info!(step = i + 1, ?step, pipeline = %self.name, "running step");
            state = state.apply(step).map_err(|e| {
                MetnetError::Pipeline(format!("Step {} ({:?}) failed: {}", i + 1, step, e))
            })?;
        }

        Ok(state.finalize())
    }
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub context: Option<Contextualization>,
    pub reactions: Option<ScoreMatrix>,
    pub subsystems: Option<ScoreMatrix>,
    pub classes: Option<ScoreMatrix>,
    /// Differential tables in step order.
    pub differential: Vec<DifferentialResultSet>,
}

impl PipelineOutput {
    /// Differential table of one analysis ("reactions", "subsystems", ...).
    pub fn differential(&self, analysis: &str) -> Option<&DifferentialResultSet> {
        self.differential.iter().find(|d| d.analysis == analysis)
    }
}

/// Internal state during pipeline execution.
struct PipelineState<'a> {
    bundle: &'a ReferenceBundle,
    abundance: &'a AbundanceTable,
    taxonomy: &'a TaxonomyTable,
    comparison: Option<&'a Comparison>,
    groups: Option<SampleGroups>,
    output: PipelineOutput,
}

impl<'a> PipelineState<'a> {
    fn new(
        bundle: &'a ReferenceBundle,
        abundance: &'a AbundanceTable,
        taxonomy: &'a TaxonomyTable,
        comparison: Option<&'a Comparison>,
        groups: Option<SampleGroups>,
    ) -> Self {
        Self {
            bundle,
            abundance,
            taxonomy,
            comparison,
            groups,
            output: PipelineOutput::default(),
        }
    }

    fn require<'s>(table: &'s Option<ScoreMatrix>, what: &str, step: &str) -> Result<&'s ScoreMatrix> {
        table
            .as_ref()
            .ok_or_else(|| MetnetError::Pipeline(format!("Must compute {} before {}", what, step)))
    }

    fn groups(&self) -> Result<(&SampleGroups, &'a Comparison)> {
        match (&self.groups, self.comparison) {
            (Some(groups), Some(comparison)) => Ok((groups, comparison)),
            (_, None) => Err(MetnetError::Pipeline(
                "Differential steps require a comparison".to_string(),
            )),
            (None, Some(_)) => Err(MetnetError::Pipeline(
                "Differential steps require sample metadata".to_string(),
            )),
        }
    }

    fn inputs(&self, restrict: bool) -> Result<Option<&'a crate::data::FeatureSubset>> {
        if restrict {
            self.bundle.required_inputs().map(Some)
        } else {
            Ok(None)
        }
    }

    fn apply(mut self, step: &PipelineStep) -> Result<Self> {
        let bundle = self.bundle;
        match step {
            PipelineStep::Contextualize { rank } => {
                self.output.context = Some(contextualize(
                    self.abundance,
                    self.taxonomy,
                    &bundle.reference,
                    *rank,
                )?);
            }
            PipelineStep::ScoreReactions => {
                let context = self.output.context.as_ref().ok_or_else(|| {
                    MetnetError::Pipeline("Must contextualize before scoring reactions".to_string())
                })?;
                self.output.reactions = Some(score_reactions(context, &bundle.model, &bundle.reaction_taxa)?);
            }
            PipelineStep::AggregateSubsystems => {
                let reactions = Self::require(&self.output.reactions, "reaction scores", "subsystem aggregation")?;
                self.output.subsystems = Some(aggregate_subsystems(
                    reactions,
                    &bundle.model,
                    Some(&bundle.exchange_classes),
                )?);
            }
            PipelineStep::AggregateClasses { restrict_to_inputs } => {
                let reactions = Self::require(&self.output.reactions, "reaction scores", "class aggregation")?;
                self.output.classes = Some(aggregate_classes(
                    reactions,
                    &bundle.model,
                    &bundle.exchange_classes,
                    self.inputs(*restrict_to_inputs)?,
                )?);
            }
            PipelineStep::DifferentialReactions => {
                let reactions = Self::require(&self.output.reactions, "reaction scores", "testing reactions")?;
                let (groups, c) = self.groups()?;
                let set = differential_reactions(reactions, groups, &c.condition, &c.control)?;
                self.output.differential.push(set);
            }
            PipelineStep::DifferentialSubsystems => {
                let subsystems = Self::require(&self.output.subsystems, "subsystem scores", "testing subsystems")?;
                let (groups, c) = self.groups()?;
                let set = differential_subsystems(subsystems, groups, &c.condition, &c.control)?;
                self.output.differential.push(set);
            }
            PipelineStep::DifferentialExchanges { restrict_to_inputs } => {
                let reactions = Self::require(&self.output.reactions, "reaction scores", "testing exchanges")?;
                let (groups, c) = self.groups()?;
                let set = differential_exchanges(
                    reactions,
                    &bundle.model,
                    &bundle.exchange_classes,
                    self.inputs(*restrict_to_inputs)?,
                    groups,
                    &c.condition,
                    &c.control,
                )?;
                self.output.differential.push(set);
            }
            PipelineStep::DifferentialClasses => {
                let classes = Self::require(&self.output.classes, "class scores", "testing classes")?;
                let (groups, c) = self.groups()?;
                let set = compare_groups(classes, classes.feature_ids(), groups, &c.condition, &c.control, "classes")?;
                self.output.differential.push(set);
            }
        }
        Ok(self)
    }

    fn finalize(self) -> PipelineOutput {
        self.output
    }
}
