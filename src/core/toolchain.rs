//! SUMO toolchain orchestration for butterfly-sumo
//!
//! Runs `netconvert`, `randomTrips.py`, `duarouter`, writes the `.sumocfg` and
//! launches `sumo-gui`, strictly one after another. Every step produces a
//! [`StepReport`]; the configured [`FailurePolicy`] decides whether a failure
//! stops the pipeline.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::process::Command;

use crate::core::config::{FailurePolicy, PathsConfig, ToolchainConfig};
use crate::core::error::{Error, Result};
use crate::core::xml::{render_sumo_config, write_document};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    BuildNetwork,
    GenerateTrips,
    RouteTrips,
    WriteConfig,
    LaunchGui,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::BuildNetwork,
        Step::GenerateTrips,
        Step::RouteTrips,
        Step::WriteConfig,
        Step::LaunchGui,
    ];

    /// Short human-readable description
    pub fn label(&self) -> &'static str {
        match self {
            Step::BuildNetwork => "Building network",
            Step::GenerateTrips => "Generating random trips",
            Step::RouteTrips => "Routing trips",
            Step::WriteConfig => "Writing simulation config",
            Step::LaunchGui => "Launching simulator",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A program and its argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    fn new(program: String, args: &[&str]) -> Self {
        Self {
            program,
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quote = |s: &str| {
            if s.is_empty() || s.contains(char::is_whitespace) {
                format!("'{s}'")
            } else {
                s.to_string()
            }
        };
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Running,
    Succeeded,
    Failed(String),
    /// Not run because of the run options
    Skipped,
    /// Printed instead of executed
    DryRun,
}

/// Record of a finished step
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: Step,
    pub command: Option<ToolCommand>,
    pub status: StepStatus,
    pub elapsed: Duration,
}

/// Reports for every step that was reached
#[derive(Debug, Clone, Default)]
pub struct ToolchainReport {
    pub steps: Vec<StepReport>,
}

impl ToolchainReport {
    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|r| matches!(r.status, StepStatus::Failed(_)))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Step progress callback, called with `Running` before a step and its final status after
pub type StepCallback = Arc<dyn Fn(Step, &StepStatus) + Send + Sync>;

/// Options that change how the toolchain runs without changing what it produces
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Log the commands instead of running them
    pub dry_run: bool,
    pub progress: Option<StepCallback>,
}

/// Sequential runner for the SUMO tools
pub struct Toolchain<'a> {
    paths: &'a PathsConfig,
    config: &'a ToolchainConfig,
    options: RunOptions,
}

impl<'a> Toolchain<'a> {
    pub fn new(paths: &'a PathsConfig, config: &'a ToolchainConfig, options: RunOptions) -> Self {
        Self {
            paths,
            config,
            options,
        }
    }

    /// Command line for a step; `None` for steps handled in-process
    ///
    /// File arguments are relative to the output directory, which is the
    /// working directory of every tool.
    pub fn command(&self, step: Step) -> Option<ToolCommand> {
        let paths = self.paths;
        let config = self.config;
        match step {
            Step::BuildNetwork => Some(ToolCommand::new(
                config.resolve_tool(&config.netconvert, "bin"),
                &[
                    &format!("--node-files={}", paths.nodes),
                    &format!("--edge-files={}", paths.edges),
                    &format!("--output-file={}", paths.network),
                ],
            )),
            Step::GenerateTrips => Some(ToolCommand::new(
                config.resolve_tool(&config.random_trips, "tools"),
                &[
                    "-n",
                    &paths.network,
                    "-e",
                    &config.trip_count.to_string(),
                    "-o",
                    &paths.trips,
                ],
            )),
            Step::RouteTrips => Some(ToolCommand::new(
                config.resolve_tool(&config.duarouter, "bin"),
                &[
                    "-n",
                    &paths.network,
                    "--route-files",
                    &paths.trips,
                    "-o",
                    &paths.routes,
                    "--ignore-errors",
                ],
            )),
            Step::WriteConfig => None,
            Step::LaunchGui => Some(ToolCommand::new(
                config.resolve_tool(&config.sumo_gui, "bin"),
                &["-c", &paths.sumo_config, "--tripinfo-output", &paths.tripinfo],
            )),
        }
    }

    /// Run every step in order
    ///
    /// Under [`FailurePolicy::Halt`] the first failure is returned as an error.
    /// Under [`FailurePolicy::Continue`] failures are recorded in the report and
    /// the remaining steps still run.
    pub async fn run(&self) -> Result<ToolchainReport> {
        let mut report = ToolchainReport::default();

        for step in Step::ALL {
            let command = self.command(step);
            self.notify(step, &StepStatus::Running);
            let started = Instant::now();

            let outcome = if step == Step::LaunchGui && !self.config.launch_gui {
                debug!("{step}: skipped");
                Ok(StepStatus::Skipped)
            } else if self.options.dry_run {
                match &command {
                    Some(command) => info!("[DRY RUN] {command}"),
                    None => info!(
                        "[DRY RUN] write {}",
                        self.paths.sumo_config_path().display()
                    ),
                }
                Ok(StepStatus::DryRun)
            } else {
                self.execute(step, command.as_ref()).await.map(|()| StepStatus::Succeeded)
            };

            let status = match outcome {
                Ok(status) => status,
                Err(err) if self.config.on_failure == FailurePolicy::Halt => {
                    self.notify(step, &StepStatus::Failed(err.to_string()));
                    return Err(err);
                }
                Err(err) => {
                    warn!("{step} failed, continuing: {err}");
                    StepStatus::Failed(err.to_string())
                }
            };

            self.notify(step, &status);
            report.steps.push(StepReport {
                step,
                command,
                status,
                elapsed: started.elapsed(),
            });
        }

        Ok(report)
    }

    async fn execute(&self, step: Step, command: Option<&ToolCommand>) -> Result<()> {
        let Some(command) = command else {
            let path = self.paths.sumo_config_path();
            info!("Creating {}...", path.display());
            let contents = render_sumo_config(
                &self.paths.network,
                &self.paths.routes,
                self.config.begin,
                self.config.end,
            );
            return write_document(&path, &contents);
        };

        info!("{step}: {command}");
        let status = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&self.paths.output_dir)
            .status()
            .await
            .map_err(|source| Error::ToolSpawnFailed {
                tool: command.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::ToolFailed {
                tool: command.program.clone(),
                status: status.to_string(),
            })
        }
    }

    fn notify(&self, step: Step, status: &StepStatus) {
        if let Some(progress) = &self.options.progress {
            progress(step, status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn toolchain_config(program: &str) -> ToolchainConfig {
        ToolchainConfig {
            netconvert: program.to_string(),
            random_trips: program.to_string(),
            duarouter: program.to_string(),
            sumo_gui: program.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_commands() {
        let paths = PathsConfig::default();
        let config = ToolchainConfig::default();
        let toolchain = Toolchain::new(&paths, &config, RunOptions::default());

        let render = |step| toolchain.command(step).map(|c| c.to_string());
        assert_eq!(
            render(Step::BuildNetwork).as_deref(),
            Some("netconvert --node-files=nodes.nod.xml --edge-files=edges.edg.xml --output-file=network.net.xml")
        );
        assert_eq!(
            render(Step::GenerateTrips).as_deref(),
            Some("randomTrips.py -n network.net.xml -e 600 -o unconvtrips.trips.xml")
        );
        assert_eq!(
            render(Step::RouteTrips).as_deref(),
            Some("duarouter -n network.net.xml --route-files unconvtrips.trips.xml -o routes.rou.xml --ignore-errors")
        );
        assert_eq!(render(Step::WriteConfig), None);
        assert_eq!(
            render(Step::LaunchGui).as_deref(),
            Some("sumo-gui -c config.sumocfg --tripinfo-output tripinfo.xml")
        );
    }

    #[test]
    fn test_command_display_quotes_spaces() {
        let command = ToolCommand::new("my tool".to_string(), &["-o", "a b.xml", ""]);
        assert_eq!(command.to_string(), "'my tool' -o 'a b.xml' ''");
    }

    #[tokio::test]
    async fn test_dry_run_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathsConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let config = toolchain_config("/nonexistent/tool");
        let options = RunOptions {
            dry_run: true,
            ..Default::default()
        };

        let report = Toolchain::new(&paths, &config, options).run().await.unwrap();
        assert_eq!(report.steps.len(), 5);
        assert!(report.steps.iter().all(|r| r.status == StepStatus::DryRun));
        assert!(!paths.sumo_config_path().exists());
    }

    #[tokio::test]
    async fn test_halt_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathsConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let config = toolchain_config("/nonexistent/tool");

        let seen = Arc::new(Mutex::new(Vec::<(Step, StepStatus)>::new()));
        let sink = Arc::clone(&seen);
        let options = RunOptions {
            dry_run: false,
            progress: Some(Arc::new(move |step: Step, status: &StepStatus| {
                sink.lock().unwrap().push((step, status.clone()));
            })),
        };

        let err = Toolchain::new(&paths, &config, options).run().await.unwrap_err();
        assert!(matches!(err, Error::ToolSpawnFailed { .. }));

        let seen = seen.lock().unwrap();
        assert!(seen.iter().all(|(step, _)| *step == Step::BuildNetwork));
        assert!(matches!(seen.last(), Some((_, StepStatus::Failed(_)))));
        assert!(!paths.sumo_config_path().exists());
    }

    #[tokio::test]
    async fn test_continue_attempts_every_step() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathsConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let config = ToolchainConfig {
            on_failure: FailurePolicy::Continue,
            launch_gui: false,
            ..toolchain_config("/nonexistent/tool")
        };

        let report = Toolchain::new(&paths, &config, RunOptions::default())
            .run()
            .await
            .unwrap();

        let statuses: Vec<_> = report.steps.iter().map(|r| (r.step, r.status.clone())).collect();
        assert_eq!(statuses.len(), 5);
        assert!(matches!(statuses[0], (Step::BuildNetwork, StepStatus::Failed(_))));
        assert!(matches!(statuses[1], (Step::GenerateTrips, StepStatus::Failed(_))));
        assert!(matches!(statuses[2], (Step::RouteTrips, StepStatus::Failed(_))));
        assert_eq!(statuses[3], (Step::WriteConfig, StepStatus::Succeeded));
        assert_eq!(statuses[4], (Step::LaunchGui, StepStatus::Skipped));
        assert_eq!(report.failures().count(), 3);
        assert!(!report.is_success());

        let written = std::fs::read_to_string(paths.sumo_config_path()).unwrap();
        assert!(written.contains("<net-file value=\"network.net.xml\"/>"));
        assert!(written.contains("<end value=\"86400\"/>"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_tools() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathsConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let config = toolchain_config("true");

        let report = Toolchain::new(&paths, &config, RunOptions::default())
            .run()
            .await
            .unwrap();
        assert!(report.is_success());
        assert!(report.steps.iter().all(|r| r.status == StepStatus::Succeeded));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathsConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let config = toolchain_config("false");

        match Toolchain::new(&paths, &config, RunOptions::default()).run().await {
            Err(Error::ToolFailed { tool, .. }) => assert_eq!(tool, "false"),
            other => panic!("Expected tool failure, got {:?}", other.map(|r| r.steps.len())),
        }
    }
}
