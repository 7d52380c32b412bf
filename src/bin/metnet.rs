//! metnet - metabolic network scoring CLI
//!
//! Contextualize abundance tables against a reference reconstruction, score
//! reactions and subsystems, and compare them between two groups of samples.

use clap::{Parser, Subcommand, ValueEnum};
use metnet::data::{AbundanceTable, DifferentialResultSet, Metadata, ScoreMatrix, TaxonomyTable};
use metnet::differential::{differential_exchanges, differential_reactions, differential_subsystems, feature_groups};
use metnet::error::{MetnetError, Result};
use metnet::pipeline::{generate_features, AnalysisConfig, Pipeline};
use metnet::reconstruction::{Reconstruction, ReferenceBundle};
use metnet::taxonomy::TaxRank;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

/// Metabolic network scoring and differential analysis
#[derive(Parser)]
#[command(name = "metnet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug events (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score reactions, subsystems and contextualized taxa from an abundance table
    GenerateFeatures {
        /// Directory holding the reconstruction reference tables
        #[arg(long, env = "METNET_REFERENCE_DIR")]
        reference_dir: PathBuf,

        /// AGREDA, AGORAv103 or AGORAv201
        #[arg(short, long, default_value = "AGREDA")]
        reconstruction: Reconstruction,

        /// Path to abundance TSV (features x samples)
        #[arg(short, long)]
        abundance: PathBuf,

        /// Path to taxonomy TSV
        #[arg(short, long)]
        taxonomy: PathBuf,

        /// Rank code: k, p, c, o, f, g or s
        #[arg(long, default_value = "s")]
        rank: TaxRank,

        /// Directory for reactions.tsv, subsystems.tsv and taxa.tsv
        #[arg(short, long)]
        output_dir: PathBuf,
    },

    /// Test reaction scores between two groups
    DifferentialReactions {
        #[command(flatten)]
        groups: GroupArgs,

        /// Output path for results TSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Test subsystem scores between two groups
    DifferentialSubsystems {
        #[command(flatten)]
        groups: GroupArgs,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Test exchange-reaction scores between two groups
    DifferentialExchanges {
        #[command(flatten)]
        groups: GroupArgs,

        #[arg(long, env = "METNET_REFERENCE_DIR")]
        reference_dir: PathBuf,

        #[arg(short, long, default_value = "AGREDA")]
        reconstruction: Reconstruction,

        /// Only test the reconstruction's input reactions
        #[arg(long)]
        inputs_only: bool,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the group values of one feature from a differential table
    FeatureGroups {
        #[command(flatten)]
        groups: GroupArgs,

        /// Differential results TSV the feature label comes from
        #[arg(long)]
        results: PathBuf,

        /// Feature label, e.g. "S3 | Glycolysis" or "EX_glc(e) | D-Glucose"
        #[arg(short, long)]
        feature: String,

        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Run a pipeline from a YAML configuration file
    Run {
        /// Path to pipeline configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Overrides the configured reference directory
        #[arg(long, env = "METNET_REFERENCE_DIR")]
        reference_dir: Option<PathBuf>,

        #[arg(short, long)]
        abundance: PathBuf,

        #[arg(short, long)]
        taxonomy: PathBuf,

        /// Required when the pipeline has differential steps
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        #[arg(short, long)]
        output_dir: PathBuf,
    },

    /// Generate an example pipeline configuration
    Example {
        /// Output path for example config
        #[arg(short, long, default_value = "pipeline.yaml")]
        output: PathBuf,
    },
}

/// Score table plus the two groups to compare.
#[derive(clap::Args)]
struct GroupArgs {
    /// Score table TSV (features x samples)
    #[arg(short, long)]
    scores: PathBuf,

    /// Path to metadata TSV
    #[arg(short, long)]
    metadata: PathBuf,

    /// Metadata column holding the group labels
    #[arg(short = 'g', long)]
    column: String,

    #[arg(long)]
    condition: String,

    #[arg(long)]
    control: String,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::GenerateFeatures {
            reference_dir,
            reconstruction,
            abundance,
            taxonomy,
            rank,
            output_dir,
        } => cmd_generate_features(&reference_dir, reconstruction, &abundance, &taxonomy, rank, &output_dir),

        Commands::DifferentialReactions { groups, output } => cmd_differential(&groups, &output, |scores, g| {
            differential_reactions(scores, g, &groups.condition, &groups.control)
        }),

        Commands::DifferentialSubsystems { groups, output } => cmd_differential(&groups, &output, |scores, g| {
            differential_subsystems(scores, g, &groups.condition, &groups.control)
        }),

        Commands::DifferentialExchanges {
            groups,
            reference_dir,
            reconstruction,
            inputs_only,
            output,
        } => ReferenceBundle::load(&reference_dir, reconstruction).and_then(|bundle| {
            let inputs = if inputs_only {
                Some(bundle.required_inputs()?)
            } else {
                None
            };
            cmd_differential(&groups, &output, |scores, g| {
                differential_exchanges(
                    scores,
                    &bundle.model,
                    &bundle.exchange_classes,
                    inputs,
                    g,
                    &groups.condition,
                    &groups.control,
                )
            })
        }),

        Commands::FeatureGroups {
            groups,
            results,
            feature,
            format,
        } => cmd_feature_groups(&groups, &results, &feature, format),

        Commands::Run {
            config,
            reference_dir,
            abundance,
            taxonomy,
            metadata,
            output_dir,
        } => cmd_run(
            &config,
            reference_dir.as_deref(),
            &abundance,
            &taxonomy,
            metadata.as_deref(),
            &output_dir,
        ),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn load_inputs(abundance_path: &Path, taxonomy_path: &Path) -> Result<(AbundanceTable, TaxonomyTable)> {
    eprintln!("Loading data...");
    let abundance = AbundanceTable::from_tsv(abundance_path)?;
    let taxonomy = TaxonomyTable::from_tsv(taxonomy_path)?;
    eprintln!(
        "Loaded {} features x {} samples, {} taxonomy assignments",
        abundance.n_features(),
        abundance.n_samples(),
        taxonomy.len()
    );
    Ok((abundance, taxonomy))
}

/// Generate reaction, subsystem and taxa tables
fn cmd_generate_features(
    reference_dir: &Path,
    reconstruction: Reconstruction,
    abundance_path: &Path,
    taxonomy_path: &Path,
    rank: TaxRank,
    output_dir: &Path,
) -> Result<()> {
    eprintln!("Loading {} reference tables from {:?}...", reconstruction, reference_dir);
    let bundle = ReferenceBundle::load(reference_dir, reconstruction)?;
    let (abundance, taxonomy) = load_inputs(abundance_path, taxonomy_path)?;

    eprintln!("Contextualizing at rank '{}'...", rank);
    let tables = generate_features(&bundle, &abundance, &taxonomy, rank)?;

    std::fs::create_dir_all(output_dir)?;
    tables.reactions.to_tsv(output_dir.join("reactions.tsv"), "reaction")?;
    tables.subsystems.to_tsv(output_dir.join("subsystems.tsv"), "subsystem")?;
    tables.taxa.to_tsv(output_dir.join("taxa.tsv"), "taxon")?;

    eprintln!(
        "Done! {} units, {} reactions, {} subsystems written to {:?}",
        tables.context.n_units(),
        tables.reactions.n_features(),
        tables.subsystems.n_features(),
        output_dir
    );
    Ok(())
}

/// Load a score table and metadata, test, and write the result table
fn cmd_differential<F>(args: &GroupArgs, output_path: &Path, test: F) -> Result<()>
where
    F: FnOnce(&ScoreMatrix, &metnet::data::SampleGroups) -> Result<DifferentialResultSet>,
{
    eprintln!("Loading data...");
    let scores = ScoreMatrix::from_tsv(&args.scores)?;
    let metadata = Metadata::from_tsv(&args.metadata)?;
    let groups = metadata.groups(&args.column)?;
    eprintln!(
        "Loaded {} features x {} samples",
        scores.n_features(),
        scores.n_samples()
    );

    eprintln!("Comparing '{}' against '{}'...", args.condition, args.control);
    let results = test(&scores, &groups)?;

    eprintln!("Writing results to {:?}...", output_path);
    results.to_tsv(output_path)?;

    eprintln!();
    eprint!("{}", results.summary());
    Ok(())
}

/// Print one feature's group values
fn cmd_feature_groups(args: &GroupArgs, results_path: &Path, feature: &str, format: OutputFormat) -> Result<()> {
    let scores = ScoreMatrix::from_tsv(&args.scores)?;
    let groups = Metadata::from_tsv(&args.metadata)?.groups(&args.column)?;
    let results = DifferentialResultSet::from_tsv(results_path, "lookup")?;

    let values = feature_groups(&scores, &results, &groups, feature, &args.condition, &args.control)?;
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&values)?,
        OutputFormat::Yaml => serde_yaml::to_string(&values)?,
    };
    println!("{}", text);
    Ok(())
}

/// Run a pipeline from configuration
fn cmd_run(
    config_path: &Path,
    reference_dir: Option<&Path>,
    abundance_path: &Path,
    taxonomy_path: &Path,
    metadata_path: Option<&Path>,
    output_dir: &Path,
) -> Result<()> {
    eprintln!("Loading pipeline configuration from {:?}...", config_path);
    let config_str = std::fs::read_to_string(config_path)?;
    let config = AnalysisConfig::from_yaml(&config_str)?;

    let reference_dir = reference_dir
        .map(Path::to_path_buf)
        .or_else(|| config.reference_dir.clone())
        .ok_or_else(|| {
            MetnetError::InvalidParameter(
                "No reference directory: set --reference-dir, METNET_REFERENCE_DIR or reference_dir".to_string(),
            )
        })?;
    let bundle = ReferenceBundle::load(&reference_dir, config.reconstruction)?;
    let (abundance, taxonomy) = load_inputs(abundance_path, taxonomy_path)?;
    let metadata = metadata_path.map(Metadata::from_tsv).transpose()?;

    eprintln!("Running pipeline '{}'...", config.name);
    let output = Pipeline::from_config(&config).run(&bundle, &abundance, &taxonomy, metadata.as_ref())?;

    std::fs::create_dir_all(output_dir)?;
    if let Some(context) = &output.context {
        context
            .labelled_frequency(&bundle.reference)?
            .to_tsv(output_dir.join("taxa.tsv"), "taxon")?;
    }
    if let Some(reactions) = &output.reactions {
        reactions.to_tsv(output_dir.join("reactions.tsv"), "reaction")?;
    }
    if let Some(subsystems) = &output.subsystems {
        subsystems.to_tsv(output_dir.join("subsystems.tsv"), "subsystem")?;
    }
    if let Some(classes) = &output.classes {
        classes.to_tsv(output_dir.join("classes.tsv"), "class")?;
    }
    for results in &output.differential {
        let path = output_dir.join(format!("differential_{}.tsv", results.analysis));
        results.to_tsv(&path)?;
        eprintln!(
            "  {}: {} features tested, {} significant at q < 0.05",
            results.analysis,
            results.len(),
            results.significant().len()
        );
    }

    eprintln!("Done! Results written to {:?}", output_dir);
    Ok(())
}

/// Generate example pipeline configuration
fn cmd_example(output_path: &Path) -> Result<()> {
    let config = AnalysisConfig::example(TaxRank::Species);
    let yaml = config.to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example pipeline to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}
