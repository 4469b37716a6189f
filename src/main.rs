mod stages;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use glacierflow_core::ForecastConfig;
use glacierflow_core::constants::{DEFAULT_N_TREES, DEFAULT_SEED};
use glacierflow_io::{Artifact, ArtifactReader, ArtifactWriter, InputLayout, export_json};
use glacierflow_rf::{OobMode, RandomForestConfig};

use crate::stages::{StageContext, StageName, StageReport, run_stage};

#[derive(Parser)]
#[command(name = "glacierflow")]
#[command(about = "Glacier melt, basin runoff, flood-risk and melt-projection analytics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = DEFAULT_SEED, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Locations and model parameters shared by `run` and `stage`.
#[derive(Args, Debug, Clone)]
struct PipelineArgs {
    /// Directory holding glacier_master.csv, climate_features.csv,
    /// mass_balance/ and optionally glacier_attributes.csv
    #[arg(long, default_value = "data/raw")]
    data_dir: PathBuf,

    /// Directory artifacts are published to
    #[arg(long, default_value = "data/processed")]
    output_dir: PathBuf,

    /// Number of trees in the melt regressor
    #[arg(long, default_value_t = DEFAULT_N_TREES)]
    n_trees: usize,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Assign every glacier to this basin instead of its region
    #[arg(long)]
    basin: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run every stage in dependency order
    Run {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Run a single stage against previously published artifacts
    Stage {
        /// Stage to run
        #[arg(value_enum)]
        name: StageName,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Print a published table as a JSON array of records
    Export {
        /// Artifact name, e.g. flood_risk_index or glacier_explorer_merged
        artifact: String,

        /// Directory artifacts are published to
        #[arg(long, default_value = "data/processed")]
        output_dir: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct RunOutput {
    output_dir: String,
    seed: u64,
    n_trees: usize,
    stages: Vec<StageReport>,
}

fn build_context(pipeline: &PipelineArgs, seed: u64) -> Result<StageContext> {
    let forest = RandomForestConfig::new(pipeline.n_trees)?
        .with_max_depth(pipeline.max_depth)
        .with_oob_mode(OobMode::Enabled)
        .with_seed(seed);
    Ok(StageContext {
        inputs: InputLayout::new(&pipeline.data_dir),
        reader: ArtifactReader::new(&pipeline.output_dir),
        writer: ArtifactWriter::new(&pipeline.output_dir)
            .context("failed to prepare output directory")?,
        forecast: ForecastConfig::new(forest),
        basin: pipeline.basin.clone(),
    })
}

fn run_stages(stages: &[StageName], pipeline: &PipelineArgs, seed: u64) -> Result<RunOutput> {
    let ctx = build_context(pipeline, seed)?;
    let mut reports = Vec::with_capacity(stages.len());
    for &stage in stages {
        let report =
            run_stage(stage, &ctx).with_context(|| format!("stage {} failed", stage.as_str()))?;
        reports.push(report);
    }
    Ok(RunOutput {
        output_dir: pipeline.output_dir.display().to_string(),
        seed,
        n_trees: pipeline.n_trees,
        stages: reports,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Run { pipeline } => {
            let output = run_stages(&StageName::ALL, &pipeline, cli.seed)?;
            info!(n_stages = output.stages.len(), "pipeline complete");
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Stage { name, pipeline } => {
            let output = run_stages(&[name], &pipeline, cli.seed)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Export {
            artifact,
            output_dir,
        } => {
            let artifact: Artifact = artifact.parse()?;
            let records = export_json(&output_dir, artifact)
                .with_context(|| format!("failed to export {artifact}"))?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    Ok(())
}
