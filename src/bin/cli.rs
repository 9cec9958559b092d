// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! BigSolid CLI

use anyhow::{bail, Context, Result};
use bigsolid::cli::Reporter;
use bigsolid::{CityJsonDocument, PipelineConfig, PipelineError};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bigsolid")]
#[command(about = "Consolidate CityJSON buildings into one solid", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, merge and write the big solid (default)
    Run(RunArgs),

    /// List the objects of a CityJSON document
    Objects {
        /// CityJSON document
        input: PathBuf,
    },

    /// Write the default configuration as TOML
    InitConfig {
        /// Destination file
        #[arg(default_value = "bigsolid.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Configuration file (defaults to ./bigsolid.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Input CityJSON document
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Object id to consolidate; repeat for several, omit for all
    #[arg(long = "id", value_name = "ID")]
    ids: Vec<String>,

    /// Output CityJSON document
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Convex hull output document
    #[arg(long, value_name = "FILE")]
    hull_output: Option<PathBuf>,

    /// Detail level to read (e.g. 1.2, 1.3, 2.2)
    #[arg(long)]
    lod: Option<f64>,

    /// Lattice cell size in metres
    #[arg(long)]
    cell_size: Option<f64>,

    /// Offset distance applied before merging
    #[arg(long)]
    offset: Option<f64>,

    /// Largest vertex deviation from a surface plane, in metres
    #[arg(long)]
    planarity_tolerance: Option<f64>,

    /// Skip the offset step
    #[arg(long)]
    no_minkowski: bool,

    /// Fold every record on the calling thread
    #[arg(long)]
    no_multithreading: bool,

    /// Triangulate surfaces below the high-detail level too
    #[arg(long)]
    triangulate: bool,

    /// Also compute and write the convex hull
    #[arg(long)]
    convex_hull: bool,

    /// One task per object, appending into a shared pool
    #[arg(long)]
    per_object: bool,

    /// Worker threads for per-object ingestion
    #[arg(long)]
    workers: Option<usize>,

    /// Report the Hausdorff distance of the result
    #[arg(long)]
    hausdorff: bool,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,

    /// Write the run report as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl RunArgs {
    /// Load the configuration and apply command-line overrides on top.
    fn to_config(&self) -> Result<PipelineConfig, PipelineError> {
        let mut config = PipelineConfig::load(self.config.as_deref())?;

        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if !self.ids.is_empty() {
            config.object_ids = self.ids.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(hull_output) = &self.hull_output {
            config.hull_output = Some(hull_output.clone());
        }
        if let Some(lod) = self.lod {
            config.detail_level = lod;
        }
        if let Some(cell_size) = self.cell_size {
            config.cell_size = cell_size;
        }
        if let Some(offset) = self.offset {
            config.offset_distance = offset;
        }
        if let Some(tolerance) = self.planarity_tolerance {
            config.planarity_tolerance = tolerance;
        }
        if let Some(workers) = self.workers {
            config.max_workers = Some(workers);
        }
        config.minkowski_enabled &= !self.no_minkowski;
        config.multithreading_enabled &= !self.no_multithreading;
        config.triangulation_enabled |= self.triangulate;
        config.convex_hull_enabled |= self.convex_hull;
        config.per_object_ingestion |= self.per_object;
        config.hausdorff_enabled |= self.hausdorff;
        config.show_progress |= self.progress;
        config.verbose |= self.verbose;

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "bigsolid=debug" } else { "bigsolid=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run(args)) => run_command(&args)?,
        Some(Commands::Objects { input }) => objects_command(&input)?,
        Some(Commands::InitConfig { path, force }) => init_config_command(&path, force)?,
        Some(Commands::Version) => {
            println!("BigSolid v{}", env!("CARGO_PKG_VERSION"));
        }
        None => run_command(&cli.run)?,
    }

    Ok(())
}

fn run_command(args: &RunArgs) -> Result<()> {
    let config = match args.to_config() {
        Ok(config) => config,
        Err(error) => {
            Reporter::report_failure(&error);
            std::process::exit(1);
        }
    };
    init_tracing(config.verbose);

    let report = match bigsolid::run(config) {
        Ok(report) => report,
        Err(error) => {
            Reporter::report_failure(&error);
            std::process::exit(1);
        }
    };
    Reporter::report_run(&report);

    if let Some(path) = &args.report {
        let json = report.to_json()?;
        fs::write(path, json).with_context(|| format!("failed to write report {}", path.display()))?;
        Reporter::report_info(&format!("Report written to {}", path.display()));
    }
    Ok(())
}

fn objects_command(input: &Path) -> Result<()> {
    let document = CityJsonDocument::from_path(input)?;
    let objects = document.object_summaries()?;
    Reporter::report_info(&format!(
        "CityJSON {}, {} vertices",
        document.version().unwrap_or("(no version)"),
        document.vertex_count()
    ));
    Reporter::report_objects(&objects);
    Ok(())
}

fn init_config_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    PipelineConfig::default().save(path)?;
    Reporter::success(&format!("Default configuration written to {}", path.display()));
    Ok(())
}
