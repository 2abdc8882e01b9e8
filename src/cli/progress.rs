//! CLI-specific progress handling for butterfly-sumo
//!
//! Shows a spinner for each toolchain step while it runs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use butterfly_sumo::{Step, StepCallback, StepStatus};
use indicatif::{ProgressBar, ProgressStyle};

/// Creates a spinner for a running step
pub fn create_step_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .expect("Failed to create progress style"),
    );
    pb.set_message(message.to_string());
    pb
}

/// Final spinner message for a finished step
fn finish_message(step: Step, status: &StepStatus) -> String {
    match status {
        StepStatus::Running => format!("⏳ {step}"),
        StepStatus::Succeeded => format!("✅ {step}"),
        StepStatus::Failed(reason) => format!("❌ {step}: {reason}"),
        StepStatus::Skipped => format!("⏭️  {step} (skipped)"),
        StepStatus::DryRun => format!("🔍 {step} (dry run)"),
    }
}

/// Drives one spinner per toolchain step
pub struct ProgressManager {
    current: Mutex<Option<ProgressBar>>,
}

impl ProgressManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(None),
        })
    }

    /// Update the display for a step event
    pub fn update(&self, step: Step, status: &StepStatus) {
        let Ok(mut current) = self.current.lock() else {
            return;
        };

        match status {
            StepStatus::Running => {
                let pb = create_step_spinner(step.label());
                pb.enable_steady_tick(Duration::from_millis(120));
                if let Some(previous) = current.replace(pb) {
                    previous.finish_and_clear();
                }
            }
            finished => {
                if let Some(pb) = current.take() {
                    pb.finish_with_message(finish_message(step, finished));
                }
            }
        }
    }

    /// Callback for [`butterfly_sumo::RunOptions::progress`]
    pub fn callback(self: &Arc<Self>) -> StepCallback {
        let manager = Arc::clone(self);
        Arc::new(move |step: Step, status: &StepStatus| manager.update(step, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_step_spinner() {
        let pb = create_step_spinner("Building network");
        assert_eq!(pb.message(), "Building network");
        pb.finish();
    }

    #[test]
    fn test_finish_messages() {
        assert_eq!(
            finish_message(Step::RouteTrips, &StepStatus::Succeeded),
            "✅ Routing trips"
        );
        assert_eq!(
            finish_message(Step::BuildNetwork, &StepStatus::Failed("exit status: 1".to_string())),
            "❌ Building network: exit status: 1"
        );
        assert_eq!(
            finish_message(Step::LaunchGui, &StepStatus::Running),
            "⏳ Launching simulator"
        );
    }

    #[test]
    fn test_progress_manager_tracks_current_step() {
        let manager = ProgressManager::new();
        let callback = manager.callback();

        callback(Step::BuildNetwork, &StepStatus::Running);
        assert!(manager.current.lock().unwrap().is_some());

        callback(Step::BuildNetwork, &StepStatus::Succeeded);
        assert!(manager.current.lock().unwrap().is_none());
    }
}
