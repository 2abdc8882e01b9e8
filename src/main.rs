//! # Butterfly-sumo CLI
//!
//! Command-line interface for the butterfly-sumo library.
//! Turns a traffic signal CSV into a SUMO network and runs the simulation toolchain.

use std::path::PathBuf;

use anyhow::{Context, Result};
use butterfly_sumo::{FailurePolicy, PipelineConfig, RunOptions};
use clap::Parser;
use log::error;

mod cli;

/// Command-line interface for butterfly-sumo
#[derive(Parser)]
#[command(name = "butterfly-sumo")]
#[command(about = "Build a SUMO road network from traffic signal data and simulate it")]
#[command(long_about = "Builds SUMO node and edge files from a traffic signal CSV, then runs
netconvert, randomTrips.py and duarouter and opens the result in sumo-gui:
  butterfly-sumo                          # Read 'signalData - Sheet2.csv'
  butterfly-sumo signals.csv -o out/      # Write everything under out/
  butterfly-sumo signals.csv --no-gui     # Headless: stop after routing
  butterfly-sumo signals.csv --network-only

Failure Handling:
  By default the pipeline stops at the first failing tool
  --keep-going                            # Run every step regardless")]
#[command(version = env!("BUTTERFLY_VERSION"))]
struct Cli {
    /// Signal CSV with 'Signal ID' and 'Edges' columns
    input: Option<PathBuf>,

    /// Directory for generated files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// TOML pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for node placement (reproducible layouts)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of random trips to generate
    #[arg(long)]
    trips: Option<u32>,

    /// SUMO installation root used to locate the tools
    #[arg(long, env = "SUMO_HOME")]
    sumo_home: Option<PathBuf>,

    /// Only write the node and edge files
    #[arg(long)]
    network_only: bool,

    /// Do not launch sumo-gui
    #[arg(long)]
    no_gui: bool,

    /// Continue with the remaining steps when a tool fails
    #[arg(long)]
    keep_going: bool,

    /// Show what would run without writing files or starting tools
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Load the configuration file (if any) and apply command-line overrides
    fn resolve_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("loading configuration {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.paths.output_dir = dir.clone();
        }
        if let Some(seed) = self.seed {
            config.network.seed = Some(seed);
        }
        if let Some(trips) = self.trips {
            config.toolchain.trip_count = trips;
        }
        if let Some(home) = &self.sumo_home {
            config.toolchain.sumo_home = Some(home.clone());
        }
        if self.no_gui {
            config.toolchain.launch_gui = false;
        }
        if self.keep_going {
            config.toolchain.on_failure = FailurePolicy::Continue;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let default_filter = if cli.verbose {
        "debug"
    } else {
        "warn,butterfly_sumo=info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    if cli.verbose {
        eprintln!("🦋 Butterfly-sumo v{} starting...", env!("BUTTERFLY_VERSION"));
    }

    let config = cli.resolve_config()?;

    if cli.network_only {
        return write_network_only(&config, cli.dry_run);
    }

    let progress = cli::ProgressManager::new();
    let options = RunOptions {
        dry_run: cli.dry_run,
        progress: Some(progress.callback()),
    };

    if cli.dry_run {
        eprintln!("🔍 [DRY RUN] Reading {}", config.input.display());
    }

    let summary = butterfly_sumo::run(&config, options)
        .await
        .with_context(|| format!("processing {}", config.input.display()))?;

    let build = &summary.build;
    eprintln!(
        "🗺️  {} nodes, {} edges from {} rows ({} skipped)",
        build.nodes_created,
        build.edges_created,
        build.rows_read,
        build.rows_skipped()
    );

    if cli.dry_run {
        for report in &summary.toolchain.steps {
            match &report.command {
                Some(command) => eprintln!("🔍 [DRY RUN] Would run: {command}"),
                None => eprintln!(
                    "🔍 [DRY RUN] Would write: {}",
                    config.paths.sumo_config_path().display()
                ),
            }
        }
    }

    let failures = summary.toolchain.failures().count();
    if failures > 0 {
        eprintln!("⚠️  {failures} step(s) failed, outputs may be incomplete");
    }

    Ok(())
}

/// Build the network and write only the `.nod.xml` / `.edg.xml` files
fn write_network_only(config: &PipelineConfig, dry_run: bool) -> Result<()> {
    let (network, report) = butterfly_sumo::build_network(&config.input, &config.network)
        .with_context(|| format!("processing {}", config.input.display()))?;

    eprintln!(
        "🗺️  {} nodes, {} edges from {} rows ({} skipped)",
        report.nodes_created,
        report.edges_created,
        report.rows_read,
        report.rows_skipped()
    );

    if dry_run {
        eprintln!(
            "🔍 [DRY RUN] Would write: {} and {}",
            config.paths.nodes_path().display(),
            config.paths.edges_path().display()
        );
        return Ok(());
    }

    butterfly_sumo::write_network(&network, &config.paths)?;
    eprintln!("📁 Saved to: {}", config.paths.output_dir.display());
    Ok(())
}
