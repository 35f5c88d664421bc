//! # Observability
//!
//! Centralized tracing setup for the launch-test harness.
//!
//! Binaries call `observability::init_with_config` once at
//! startup and use standard `tracing` macros everywhere else. Output always
//! goes to stderr in a compact human format; when a log path is configured,
//! every event is also appended to that file as one JSON object per line so
//! a run can be inspected afterwards:
//!
//! - `tail -f <log_path> | jq`
//! - `lnav <log_path>`
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "rmw-launch-test".into(),
//!         default_level: "debug".into(),
//!         log_path: Some("/tmp/launch-test.jsonl".into()),
//!         also_stderr: true,
//!     });
//!     tracing::info!("ready");
//! }
//! ```

mod file;
mod json_layer;

use std::io;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use file::{CentralLogWriter, WriterFactory};
pub use json_layer::{JsonLayer, LogLine};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, included in every JSON log line.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional JSONL log file. No file output when `None`.
    pub log_path: Option<PathBuf>,

    /// Emit compact human-readable logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: true,
        }
    }
}

/// Initialize the observability layer with custom configuration.
///
/// A log file that cannot be opened downgrades to stderr-only output; the
/// failure is reported as the first warning once the subscriber is installed.
pub fn init_with_config(config: LogConfig) {
    let mut open_error = None;
    let json_layer = match config.log_path.as_ref() {
        Some(path) => match CentralLogWriter::new(path) {
            Ok(writer) => Some(JsonLayer::new(
                config.service_name.clone(),
                WriterFactory::new(writer),
            )),
            Err(err) => {
                open_error = Some((path.clone(), err));
                None
            }
        },
        None => None,
    };

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(io::stderr)
            .with_filter(env_filter(&config.default_level))
    });

    let installed = tracing_subscriber::registry()
        .with(json_layer.map(|l| l.with_filter(env_filter(&config.default_level))))
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if !installed {
        return;
    }

    match (open_error, config.log_path.as_ref()) {
        (Some((path, err)), _) => {
            tracing::warn!(
                log_path = %path.display(),
                error = %err,
                "failed to open log file, logging to stderr only"
            );
        }
        (None, Some(path)) => {
            tracing::debug!(log_path = %path.display(), "observability initialized");
        }
        (None, None) => {}
    }
}

/// Build an env filter from RUST_LOG or the given default.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(config.also_stderr);
    }
}
