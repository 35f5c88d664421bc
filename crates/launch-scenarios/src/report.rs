//! Outcome of one scenario run.

use crate::error::{FailureKind, ScenarioError, ScenarioResult};
use chrono::{DateTime, Utc};
use exit_code_validator::{ExitMismatch, ValidationError};
use launch_supervisor::{ProcessInfo, ProcessState};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// How the wait for the target process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitOutcome {
    Exited,
    TimedOut,
    Interrupted,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub wait_target: String,
    pub wait_timeout: Duration,
    pub outcome: WaitOutcome,
    /// State of the target when the wait ended, if it had exited.
    pub target_state: Option<ProcessState>,
    /// Final records of every launched process plus the keep-alive entry.
    pub processes: Vec<ProcessInfo>,
    pub still_running: Vec<String>,
    pub mismatches: Vec<ExitMismatch>,
}

impl ScenarioReport {
    /// The first failure of the run, if any.
    ///
    /// A timeout or interrupt takes precedence over exit mismatches, which
    /// are usually its consequence.
    pub fn check(&self) -> ScenarioResult<()> {
        match self.outcome {
            WaitOutcome::TimedOut => {
                return Err(ScenarioError::Timeout {
                    target: self.wait_target.clone(),
                    timeout: self.wait_timeout,
                })
            }
            WaitOutcome::Interrupted => {
                return Err(ScenarioError::Interrupted(self.wait_target.clone()))
            }
            WaitOutcome::Exited => {}
        }
        if !self.still_running.is_empty() {
            return Err(ValidationError::StillRunning(self.still_running.clone()).into());
        }
        if !self.mismatches.is_empty() {
            return Err(ValidationError::UnexpectedExit(self.mismatches.clone()).into());
        }
        Ok(())
    }

    pub fn passed(&self) -> bool {
        self.check().is_ok()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.check().err().map(|err| err.kind())
    }

    pub fn to_json(&self) -> ScenarioResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write_to(&self, path: &Path) -> ScenarioResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), "Wrote scenario report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launch_supervisor::ExpectedExit;

    fn report(outcome: WaitOutcome, mismatches: Vec<ExitMismatch>) -> ScenarioReport {
        let now = Utc::now();
        ScenarioReport {
            scenario: "rclcpp_integration".to_string(),
            started_at: now,
            finished_at: now,
            wait_target: "dut_process".to_string(),
            wait_timeout: Duration::from_secs(400_000),
            outcome,
            target_state: None,
            processes: Vec::new(),
            still_running: Vec::new(),
            mismatches,
        }
    }

    fn runner_mismatch() -> ExitMismatch {
        ExitMismatch {
            name: "dut_process".to_string(),
            actual: ProcessState::Exited { code: 1 },
            expected: ExpectedExit::success(),
        }
    }

    #[test]
    fn clean_run_passes() {
        let report = report(WaitOutcome::Exited, Vec::new());
        assert!(report.passed());
        assert_eq!(report.failure_kind(), None);
    }

    #[test]
    fn timeout_reported_before_mismatches() {
        let report = report(WaitOutcome::TimedOut, vec![runner_mismatch()]);
        assert_eq!(report.failure_kind(), Some(FailureKind::Timeout));
        assert!(matches!(
            report.check(),
            Err(ScenarioError::Timeout { ref target, .. }) if target == "dut_process"
        ));
    }

    #[test]
    fn interrupt_reported() {
        let report = report(WaitOutcome::Interrupted, Vec::new());
        assert_eq!(report.failure_kind(), Some(FailureKind::Interrupted));
    }

    #[test]
    fn mismatches_reported_as_exit_code_failure() {
        let report = report(WaitOutcome::Exited, vec![runner_mismatch()]);
        assert_eq!(report.failure_kind(), Some(FailureKind::ExitCode));
        let message = report.check().unwrap_err().to_string();
        assert!(message.contains("dut_process"));
    }

    #[test]
    fn json_shape() {
        let report = report(WaitOutcome::Exited, vec![runner_mismatch()]);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["scenario"], "rclcpp_integration");
        assert_eq!(json["outcome"], "exited");
        assert_eq!(json["wait_timeout"]["secs"], 400_000);
        assert_eq!(json["mismatches"][0]["name"], "dut_process");
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run.json");
        report(WaitOutcome::Exited, Vec::new())
            .write_to(&path)
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"scenario\": \"rclcpp_integration\""));
    }
}
