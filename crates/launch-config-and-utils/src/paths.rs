//! File system paths for the harness.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Manages file system paths for the harness.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for harness files (~/.rmw-launch-test)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.rmw-launch-test`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;
        Ok(Self {
            base_dir: home.join(".rmw-launch-test"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.rmw-launch-test/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the logs directory (~/.rmw-launch-test/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the structured log file (~/.rmw-launch-test/logs/launch-test.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("launch-test.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
