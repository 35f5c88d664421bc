//! Configuration management for the launch-test harness.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable that selects the active middleware implementation.
pub const DEFAULT_SELECTOR_VARIABLE: &str = "RMW_IMPLEMENTATION";

/// Middleware implementation exercised by the default scenario.
pub const DEFAULT_RMW_IMPLEMENTATION: &str = "rmw_zenoh_cpp";

/// Upper bound on how long the awaited process may run, in seconds.
///
/// The test runner can execute a whole suite with retries, so the bound is
/// deliberately in the range of days rather than minutes.
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 400_000;

const DEFAULT_SIGINT_GRACE_SECS: u64 = 5;
const DEFAULT_SIGTERM_GRACE_SECS: u64 = 5;

/// Main harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// How long to wait for the awaited process, in seconds.
    pub wait_timeout_secs: u64,
    /// Time between SIGINT and SIGTERM during shutdown, in seconds.
    pub sigint_grace_secs: u64,
    /// Time between SIGTERM and SIGKILL during shutdown, in seconds.
    pub sigterm_grace_secs: u64,
    /// Name of the middleware selector variable.
    pub selector_variable: String,
    /// Value the selector variable is set to for every child.
    pub rmw_implementation: String,
    /// Root of the ROS installations (e.g. `/opt/ros`).
    pub ros_root: PathBuf,
    /// ROS distribution name appended to `ros_root`.
    pub ros_distro: String,
    /// Entrypoint script that sources the ROS environment before running the command.
    pub entrypoint: PathBuf,
    /// Packages handed to `colcon test --packages-select`.
    pub packages_select: Vec<String>,
    /// Value of `colcon test --retest-until-pass`.
    pub retest_until_pass: u32,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            wait_timeout_secs: DEFAULT_WAIT_TIMEOUT_SECS,
            sigint_grace_secs: DEFAULT_SIGINT_GRACE_SECS,
            sigterm_grace_secs: DEFAULT_SIGTERM_GRACE_SECS,
            selector_variable: DEFAULT_SELECTOR_VARIABLE.to_string(),
            rmw_implementation: DEFAULT_RMW_IMPLEMENTATION.to_string(),
            ros_root: PathBuf::from("/opt/ros"),
            ros_distro: "jazzy".to_string(),
            entrypoint: PathBuf::from("/ros_entrypoint.sh"),
            packages_select: vec!["test_rclcpp".to_string()],
            retest_until_pass: 2,
        }
    }
}

impl LaunchConfig {
    /// Load configuration from the default location, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();
        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };
        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LaunchConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    pub fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("RMW_LAUNCH_TEST_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Some(secs) = std::env::var("RMW_LAUNCH_TEST_WAIT_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
        {
            self.wait_timeout_secs = secs;
        }
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> CoreResult<()> {
        if self.wait_timeout_secs == 0 {
            return Err(CoreError::Config(
                "wait_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.selector_variable.is_empty() || self.selector_variable.contains('=') {
            return Err(CoreError::Config(format!(
                "invalid selector variable name: {:?}",
                self.selector_variable
            )));
        }
        if self.packages_select.is_empty() {
            return Err(CoreError::Config(
                "packages_select must name at least one package".to_string(),
            ));
        }
        Ok(())
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn sigint_grace(&self) -> Duration {
        Duration::from_secs(self.sigint_grace_secs)
    }

    pub fn sigterm_grace(&self) -> Duration {
        Duration::from_secs(self.sigterm_grace_secs)
    }

    /// Install prefix of the configured distribution (e.g. `/opt/ros/jazzy`).
    pub fn ros_install_base(&self) -> PathBuf {
        self.ros_root.join(&self.ros_distro)
    }
}
