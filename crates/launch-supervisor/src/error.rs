//! Error types for the launch supervisor.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Supervisor error type.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A process could not be started.
    #[error("Failed to launch process '{name}' ({program}): {source}")]
    Launch {
        name: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A package executable was not found under any prefix.
    #[error("Executable '{executable}' of package '{package}' not found for process '{name}' (searched: {searched})")]
    ExecutableNotFound {
        name: String,
        package: String,
        executable: String,
        searched: String,
    },

    /// The working directory of a process does not exist.
    #[error("Working directory {} for process '{name}' is not a directory", .path.display())]
    WorkingDirectory { name: String, path: PathBuf },

    /// The awaited process did not exit within the bound.
    #[error("Process '{name}' did not exit within {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    /// A descriptor set or wait request is malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The watcher of a process stopped without recording a final state.
    #[error("Lost track of process '{0}'")]
    WatcherLost(String),
}

impl SupervisorError {
    /// Whether this error happened before any process was awaited.
    pub fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            Self::Launch { .. } | Self::ExecutableNotFound { .. } | Self::WorkingDirectory { .. }
        )
    }
}

/// Result type for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;
