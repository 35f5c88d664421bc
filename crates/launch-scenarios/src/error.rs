//! Error types for scenario preparation and execution.

use exit_code_validator::ValidationError;
use launch_config_and_utils::CoreError;
use launch_supervisor::SupervisorError;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Coarse failure category of a scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A process could not be started.
    Launch,
    /// The awaited process outlived the wait timeout.
    Timeout,
    /// The harness was asked to stop while waiting.
    Interrupted,
    /// A process ended with an exit status that was not whitelisted.
    ExitCode,
    /// Malformed scenario, descriptors, arguments or configuration.
    Configuration,
    /// Anything else (I/O while writing reports, lost watchers).
    Internal,
}

/// Scenario error type.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    /// The awaited process did not exit in time.
    #[error("Timed out after {timeout:?} waiting for '{target}' to exit")]
    Timeout { target: String, timeout: Duration },

    /// A stop signal arrived while waiting.
    #[error("Interrupted while waiting for '{0}' to exit")]
    Interrupted(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No scenario is registered under the requested name.
    #[error("Unknown scenario '{0}'")]
    UnknownScenario(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScenarioError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Core(_) | Self::UnknownScenario(_) => FailureKind::Configuration,
            Self::Supervisor(err) if err.is_launch_failure() => FailureKind::Launch,
            Self::Supervisor(SupervisorError::Configuration(_)) => FailureKind::Configuration,
            Self::Supervisor(SupervisorError::Timeout { .. }) | Self::Timeout { .. } => {
                FailureKind::Timeout
            }
            Self::Supervisor(_) | Self::Io(_) | Self::Json(_) => FailureKind::Internal,
            Self::Interrupted(_) => FailureKind::Interrupted,
            Self::Validation(_) => FailureKind::ExitCode,
        }
    }
}

/// Result type for scenario operations.
pub type ScenarioResult<T> = Result<T, ScenarioError>;
