//! Post-shutdown validation of process exit states.
//!
//! Every launched process must have ended the way its descriptor expects
//! (exit code 0 unless other codes or signals are whitelisted). All
//! mismatches are collected into a single error.

use launch_supervisor::{ExpectedExit, ProcessInfo, ProcessState};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// One process that did not end as expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitMismatch {
    pub name: String,
    pub actual: ProcessState,
    pub expected: ExpectedExit,
}

impl fmt::Display for ExitMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' {} (expected {})", self.name, self.actual, self.expected)
    }
}

/// Validation error type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Validation ran before every process reached a final state.
    #[error("Processes still running: {}", .0.join(", "))]
    StillRunning(Vec<String>),

    /// One or more processes ended unexpectedly.
    #[error("Unexpected exit: {}", join_mismatches(.0))]
    UnexpectedExit(Vec<ExitMismatch>),
}

impl ValidationError {
    /// The mismatches carried by this error, if any.
    pub fn mismatches(&self) -> &[ExitMismatch] {
        match self {
            Self::UnexpectedExit(mismatches) => mismatches,
            Self::StillRunning(_) => &[],
        }
    }
}

/// Result type for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn join_mismatches(mismatches: &[ExitMismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check every record against the expectation stored in it.
///
/// Fails if any process is still running; otherwise every mismatch is
/// reported at once.
pub fn validate_exit_codes(infos: &[ProcessInfo]) -> ValidationResult<()> {
    let running: Vec<String> = infos
        .iter()
        .filter(|info| !info.state.is_terminal())
        .map(|info| info.name.clone())
        .collect();
    if !running.is_empty() {
        warn!(still_running = ?running, "Validation requested before shutdown completed");
        return Err(ValidationError::StillRunning(running));
    }

    let mut mismatches = Vec::new();
    for info in infos {
        let expected = &info.expected_exit;
        if expected.accepts(info.state) {
            debug!(process = %info.name, state = %info.state, "Exit as expected");
            continue;
        }
        warn!(
            process = %info.name,
            state = %info.state,
            expected = %expected,
            "Unexpected exit"
        );
        mismatches.push(ExitMismatch {
            name: info.name.clone(),
            actual: info.state,
            expected: expected.clone(),
        });
    }

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::UnexpectedExit(mismatches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn info(name: &str, state: ProcessState, expected: ExpectedExit) -> ProcessInfo {
        ProcessInfo {
            name: name.to_string(),
            pid: Some(1234),
            started_at: Utc::now(),
            state,
            expected_exit: expected,
            auxiliary: false,
        }
    }

    fn exited(code: i32) -> ProcessState {
        ProcessState::Exited { code }
    }

    #[test]
    fn all_zero_passes() {
        let infos = [
            info("zenoh_router", exited(0), ExpectedExit::success()),
            info("dut_process", exited(0), ExpectedExit::success()),
        ];
        assert_eq!(validate_exit_codes(&infos), Ok(()));
    }

    #[test]
    fn empty_set_passes() {
        assert_eq!(validate_exit_codes(&[]), Ok(()));
    }

    #[test]
    fn nonzero_runner_named_in_failure() {
        let infos = [
            info("zenoh_router", exited(0), ExpectedExit::success()),
            info("dut_process", exited(1), ExpectedExit::success()),
        ];
        let err = validate_exit_codes(&infos).unwrap_err();
        assert_eq!(err.mismatches().len(), 1);
        assert_eq!(err.mismatches()[0].name, "dut_process");
        assert_eq!(err.mismatches()[0].actual, exited(1));
        assert!(err.to_string().contains("dut_process"));
    }

    #[test]
    fn every_mismatch_is_reported() {
        let infos = [
            info("a", exited(2), ExpectedExit::success()),
            info("b", exited(0), ExpectedExit::success()),
            info(
                "c",
                ProcessState::Killed {
                    signal: libc::SIGKILL,
                },
                ExpectedExit::success(),
            ),
        ];
        let err = validate_exit_codes(&infos).unwrap_err();
        let names: Vec<&str> = err.mismatches().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn whitelisted_codes_and_signals_pass() {
        let infos = [
            info("runner", exited(3), ExpectedExit::codes([0, 3])),
            info(
                "router",
                ProcessState::Killed {
                    signal: libc::SIGINT,
                },
                ExpectedExit::success().allow_signals([libc::SIGINT, libc::SIGTERM]),
            ),
        ];
        assert_eq!(validate_exit_codes(&infos), Ok(()));
    }

    #[test]
    fn running_process_rejected() {
        let infos = [
            info("done", exited(0), ExpectedExit::success()),
            info("busy", ProcessState::Running, ExpectedExit::success()),
            info("idle", ProcessState::NotStarted, ExpectedExit::success()),
        ];
        assert_eq!(
            validate_exit_codes(&infos),
            Err(ValidationError::StillRunning(vec![
                "busy".to_string(),
                "idle".to_string()
            ]))
        );
    }

    #[test]
    fn mismatch_serializes_with_state_tag() {
        let mismatch = ExitMismatch {
            name: "dut_process".to_string(),
            actual: exited(1),
            expected: ExpectedExit::success(),
        };
        let json = serde_json::to_value(&mismatch).unwrap();
        assert_eq!(json["name"], "dut_process");
        assert_eq!(json["actual"]["state"], "exited");
        assert_eq!(json["actual"]["code"], 1);
        assert_eq!(json["expected"]["codes"], serde_json::json!([0]));
    }

    #[test]
    fn mismatch_display() {
        let mismatch = ExitMismatch {
            name: "dut_process".to_string(),
            actual: exited(1),
            expected: ExpectedExit::success(),
        };
        assert_eq!(
            mismatch.to_string(),
            format!("'dut_process' {} (expected exit code 0)", exited(1))
        );
    }
}
