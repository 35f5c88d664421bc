//! Core error types for the harness.

use thiserror::Error;

/// Core error type for configuration and launch-argument handling.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A declared launch argument was not supplied and has no default
    #[error("Required launch argument '{0}' was not provided")]
    MissingLaunchArgument(String),

    /// A launch argument could not be parsed as `name:=value`
    #[error("Invalid launch argument '{0}': expected name:=value")]
    InvalidLaunchArgument(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Path error (e.g., home directory not found)
    #[error("Path error: {0}")]
    Path(String),
}

/// Result type alias using CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
