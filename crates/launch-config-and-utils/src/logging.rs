//! Logging initialization for the harness.
//!
//! Thin wrapper over the workspace `observability` package so every binary
//! configures tracing the same way.

use observability::LogConfig;
use std::path::PathBuf;

/// Initialize the logging system.
///
/// Logs go to stderr and, when `log_path` is given, also to a JSONL file.
/// `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str, log_path: Option<PathBuf>) {
    observability::init_with_config(LogConfig {
        service_name: "rmw-launch-test".into(),
        default_level: level.into(),
        log_path,
        also_stderr: true,
    });
}
