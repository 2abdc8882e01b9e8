//! Pipeline configuration for butterfly-sumo
//!
//! Every file name, bound and tool binary the pipeline uses lives here, so runs
//! can be pointed at isolated directories. Values load from an optional TOML
//! file; missing keys fall back to the defaults below.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::error::{Error, Result};
use crate::core::graph::NodeType;

/// Default signal dataset read when no input is given
pub const DEFAULT_INPUT: &str = "signalData - Sheet2.csv";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Signal CSV to read
    pub input: PathBuf,
    pub paths: PathsConfig,
    pub network: NetworkConfig,
    pub toolchain: ToolchainConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            paths: PathsConfig::default(),
            network: NetworkConfig::default(),
            toolchain: ToolchainConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::ConfigError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&raw).map_err(|e| match e {
            Error::ConfigError { message, .. } => Error::ConfigError {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| Error::ConfigError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let edge = &self.network.edge;
        if edge.num_lanes == 0 {
            return Err(Error::InvalidInput("edge lane count must be at least 1".to_string()));
        }
        if !edge.speed.is_finite() || edge.speed <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "edge speed must be a positive number, got {}",
                edge.speed
            )));
        }
        if self.network.reverse_suffix.is_empty() {
            return Err(Error::InvalidInput("reverse edge suffix must not be empty".to_string()));
        }
        if self.toolchain.end <= self.toolchain.begin {
            return Err(Error::InvalidInput(format!(
                "simulation end ({}) must be after begin ({})",
                self.toolchain.end, self.toolchain.begin
            )));
        }
        Ok(())
    }
}

/// Output locations. File names are relative to `output_dir`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub output_dir: PathBuf,
    pub nodes: String,
    pub edges: String,
    pub network: String,
    pub trips: String,
    pub routes: String,
    pub sumo_config: String,
    pub tripinfo: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            nodes: "nodes.nod.xml".to_string(),
            edges: "edges.edg.xml".to_string(),
            network: "network.net.xml".to_string(),
            trips: "unconvtrips.trips.xml".to_string(),
            routes: "routes.rou.xml".to_string(),
            sumo_config: "config.sumocfg".to_string(),
            tripinfo: "tripinfo.xml".to_string(),
        }
    }
}

impl PathsConfig {
    /// Resolve a file name against the output directory
    pub fn resolve(&self, file: &str) -> PathBuf {
        self.output_dir.join(file)
    }

    pub fn nodes_path(&self) -> PathBuf {
        self.resolve(&self.nodes)
    }

    pub fn edges_path(&self) -> PathBuf {
        self.resolve(&self.edges)
    }

    pub fn sumo_config_path(&self) -> PathBuf {
        self.resolve(&self.sumo_config)
    }
}

/// Attributes applied to every generated edge
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EdgeDefaults {
    pub priority: i32,
    pub num_lanes: u32,
    /// Meters per second
    pub speed: f64,
}

impl Default for EdgeDefaults {
    fn default() -> Self {
        Self {
            priority: 2,
            num_lanes: 2,
            speed: 14.0,
        }
    }
}

/// Graph construction settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Upper bound (inclusive, meters) for random x coordinates
    pub max_x: u32,
    /// Upper bound (inclusive, meters) for random y coordinates
    pub max_y: u32,
    /// Fixed seed for reproducible node placement
    pub seed: Option<u64>,
    pub node_type: NodeType,
    pub reverse_suffix: String,
    pub edge: EdgeDefaults,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_x: 5000,
            max_y: 5000,
            seed: None,
            node_type: NodeType::default(),
            reverse_suffix: "_rev".to_string(),
            edge: EdgeDefaults::default(),
        }
    }
}

/// What the orchestrator does when a step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failed step and report it
    #[default]
    Halt,
    /// Log the failure and attempt the remaining steps anyway
    Continue,
}

/// External SUMO tools and simulation parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    /// SUMO installation root; bare tool names resolve under `bin/` and `tools/`
    pub sumo_home: Option<PathBuf>,
    pub netconvert: String,
    pub random_trips: String,
    pub duarouter: String,
    pub sumo_gui: String,
    /// Passed to the trip generator as `-e`
    pub trip_count: u32,
    /// Simulation window in seconds
    pub begin: u64,
    pub end: u64,
    pub launch_gui: bool,
    pub on_failure: FailurePolicy,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            sumo_home: None,
            netconvert: "netconvert".to_string(),
            random_trips: "randomTrips.py".to_string(),
            duarouter: "duarouter".to_string(),
            sumo_gui: "sumo-gui".to_string(),
            trip_count: 600,
            begin: 0,
            end: 86400,
            launch_gui: true,
            on_failure: FailurePolicy::default(),
        }
    }
}

impl ToolchainConfig {
    /// Resolve a tool against `sumo_home` when it is a bare name
    ///
    /// Tools run with the output directory as working directory, so any
    /// relative path is anchored to the current directory first.
    pub fn resolve_tool(&self, tool: &str, subdir: &str) -> String {
        match std::env::current_dir() {
            Ok(cwd) => self.resolve_tool_from(&cwd, tool, subdir),
            Err(_) => self.resolve_tool_from(Path::new(""), tool, subdir),
        }
    }

    /// Resolve a tool with relative paths anchored at `base`
    ///
    /// Bare names are left for `PATH` lookup unless `sumo_home` is set.
    pub fn resolve_tool_from(&self, base: &Path, tool: &str, subdir: &str) -> String {
        let is_bare = !tool.contains(std::path::MAIN_SEPARATOR) && !tool.contains('/');
        match &self.sumo_home {
            Some(home) if is_bare => base
                .join(home)
                .join(subdir)
                .join(tool)
                .to_string_lossy()
                .into_owned(),
            _ if is_bare => tool.to_string(),
            _ => base.join(tool).to_string_lossy().into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_pipeline() {
        let config = PipelineConfig::default();
        assert_eq!(config.input, PathBuf::from("signalData - Sheet2.csv"));
        assert_eq!(config.paths.nodes, "nodes.nod.xml");
        assert_eq!(config.paths.edges, "edges.edg.xml");
        assert_eq!(config.paths.network, "network.net.xml");
        assert_eq!(config.paths.trips, "unconvtrips.trips.xml");
        assert_eq!(config.paths.routes, "routes.rou.xml");
        assert_eq!(config.paths.sumo_config, "config.sumocfg");
        assert_eq!(config.network.max_x, 5000);
        assert_eq!(config.network.max_y, 5000);
        assert_eq!(config.network.node_type, NodeType::TrafficLight);
        assert_eq!(config.network.edge, EdgeDefaults { priority: 2, num_lanes: 2, speed: 14.0 });
        assert_eq!(config.toolchain.trip_count, 600);
        assert_eq!((config.toolchain.begin, config.toolchain.end), (0, 86400));
        assert_eq!(config.toolchain.on_failure, FailurePolicy::Halt);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            input = "data/signals.csv"

            [paths]
            output_dir = "out"

            [network]
            seed = 7
            node_type = "priority"

            [network.edge]
            speed = 13.89

            [toolchain]
            trip_count = 50
            on_failure = "continue"
            "#,
        )
        .unwrap();

        assert_eq!(config.input, PathBuf::from("data/signals.csv"));
        assert_eq!(config.paths.nodes_path(), PathBuf::from("out").join("nodes.nod.xml"));
        assert_eq!(config.network.seed, Some(7));
        assert_eq!(config.network.node_type, NodeType::Priority);
        assert_eq!(config.network.edge.speed, 13.89);
        assert_eq!(config.network.edge.num_lanes, 2);
        assert_eq!(config.toolchain.trip_count, 50);
        assert_eq!(config.toolchain.on_failure, FailurePolicy::Continue);
        assert_eq!(config.toolchain.netconvert, "netconvert");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = PipelineConfig::from_toml("[network]\nmax_z = 3\n").unwrap_err();
        assert!(matches!(err, Error::ConfigError { .. }));
    }

    #[test]
    fn test_validation() {
        assert!(PipelineConfig::from_toml("[network.edge]\nnum_lanes = 0\n").is_err());
        assert!(PipelineConfig::from_toml("[network.edge]\nspeed = -1.0\n").is_err());
        assert!(PipelineConfig::from_toml("[toolchain]\nbegin = 10\nend = 10\n").is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, "[toolchain]\ntrip_count = \"many\"\n").unwrap();

        match PipelineConfig::load(&path) {
            Err(Error::ConfigError { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("Expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_tool_with_sumo_home() {
        let mut toolchain = ToolchainConfig::default();
        assert_eq!(toolchain.resolve_tool("netconvert", "bin"), "netconvert");

        toolchain.sumo_home = Some(PathBuf::from("/opt/sumo"));
        assert_eq!(
            toolchain.resolve_tool("randomTrips.py", "tools"),
            PathBuf::from("/opt/sumo/tools/randomTrips.py").to_string_lossy()
        );
        assert_eq!(toolchain.resolve_tool("/usr/bin/netconvert", "bin"), "/usr/bin/netconvert");
    }

    #[test]
    fn test_relative_tool_paths_anchor_to_base() {
        let base = Path::new("/work");
        let mut toolchain = ToolchainConfig::default();

        assert_eq!(toolchain.resolve_tool_from(base, "duarouter", "bin"), "duarouter");
        assert_eq!(
            toolchain.resolve_tool_from(base, "bin/netconvert", "bin"),
            PathBuf::from("/work/bin/netconvert").to_string_lossy()
        );
        assert_eq!(
            toolchain.resolve_tool_from(base, "/usr/bin/netconvert", "bin"),
            "/usr/bin/netconvert"
        );

        toolchain.sumo_home = Some(PathBuf::from("sumo"));
        assert_eq!(
            toolchain.resolve_tool_from(base, "sumo-gui", "bin"),
            PathBuf::from("/work/sumo/bin/sumo-gui").to_string_lossy()
        );
    }

    #[test]
    fn test_resolve_tool_absolutizes_relative_paths() {
        let toolchain = ToolchainConfig::default();
        let resolved = toolchain.resolve_tool("bin/netconvert", "bin");
        assert!(Path::new(&resolved).is_absolute());
        assert!(resolved.ends_with("netconvert"));
    }
}
