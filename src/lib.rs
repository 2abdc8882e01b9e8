//! # Butterfly-sumo Library
//!
//! Builds a SUMO road network from a traffic signal CSV and drives the SUMO
//! toolchain (`netconvert`, `randomTrips.py`, `duarouter`, `sumo-gui`) over it.
//!
//! ## Pipeline
//!
//! 1. Each CSV row names a signal and a bracketed list of locations
//!    (`[A123, B456]`). The first two locations become nodes placed at random
//!    inside the configured bounds; the row becomes a forward and reverse edge.
//! 2. Nodes and edges are written as SUMO plain XML (`.nod.xml`, `.edg.xml`).
//! 3. The external tools turn those into a network, trips and routes, and the
//!    simulation is opened in the GUI.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = butterfly_sumo::PipelineConfig::default();
//! let summary = butterfly_sumo::run(&config, butterfly_sumo::RunOptions::default()).await?;
//! println!("{} nodes, {} edges", summary.build.nodes_created, summary.build.edges_created);
//! # Ok(())
//! # }
//! ```
//!
//! ## Network only
//!
//! ```rust,no_run
//! use butterfly_sumo::{build_network, write_network, PipelineConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::default();
//! let (network, report) = build_network(&config.input, &config.network)?;
//! write_network(&network, &config.paths)?;
//! println!("skipped {} rows", report.rows_skipped());
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use log::{info, warn};

// Re-export core types that users might need
pub use crate::core::config::{
    EdgeDefaults, FailurePolicy, NetworkConfig, PathsConfig, PipelineConfig, ToolchainConfig,
    DEFAULT_INPUT,
};
pub use crate::core::error::{Error, Result};
pub use crate::core::graph::{BuildReport, Edge, Network, NetworkBuilder, Node, NodeType};
pub use crate::core::record::{parse_edge_list, Endpoints, RecordReader, SignalRecord};
pub use crate::core::toolchain::{
    RunOptions, Step, StepCallback, StepReport, StepStatus, ToolCommand, Toolchain,
    ToolchainReport,
};
pub use crate::core::xml::{render_edges, render_nodes, render_sumo_config};

// Internal modules
mod core;

/// Read a signal CSV and build the road network
///
/// # Arguments
/// * `csv_path` - CSV with `Signal ID` and `Edges` columns
/// * `config` - Bounds, seed and edge defaults
pub fn build_network(csv_path: &Path, config: &NetworkConfig) -> Result<(Network, BuildReport)> {
    info!("Reading signals from {}", csv_path.display());
    let records = RecordReader::from_path(csv_path)?;
    let mut builder = NetworkBuilder::from_config(config);
    builder.extend_from_records(records)?;
    Ok(builder.finish())
}

/// Write the `.nod.xml` and `.edg.xml` files, creating the output directory if needed
pub fn write_network(network: &Network, paths: &PathsConfig) -> Result<()> {
    crate::core::xml::write_network_files(network, paths)
}

/// Result of a full pipeline run
#[derive(Debug)]
pub struct PipelineSummary {
    pub build: BuildReport,
    pub toolchain: ToolchainReport,
}

/// Build the network, write it, then run the SUMO toolchain
///
/// Toolchain failures are handled according to `config.toolchain.on_failure`.
pub async fn run(config: &PipelineConfig, options: RunOptions) -> Result<PipelineSummary> {
    let (network, build) = build_network(&config.input, &config.network)?;
    if network.is_empty() {
        let message = format!("{} produced no usable signal rows", config.input.display());
        if config.toolchain.on_failure == FailurePolicy::Halt {
            return Err(Error::InvalidInput(message));
        }
        warn!("{message}, continuing with an empty network");
    }

    if options.dry_run {
        info!(
            "[DRY RUN] would write {} and {}",
            config.paths.nodes_path().display(),
            config.paths.edges_path().display()
        );
    } else {
        write_network(&network, &config.paths)?;
    }

    let toolchain = Toolchain::new(&config.paths, &config.toolchain, options)
        .run()
        .await?;

    Ok(PipelineSummary { build, toolchain })
}
