//! Core types, configuration, and utilities for the rmw launch-test harness.

mod config;
mod environment;
mod error;
mod launch_args;
mod logging;
mod paths;

pub use config::{
    LaunchConfig, DEFAULT_LOG_LEVEL, DEFAULT_RMW_IMPLEMENTATION, DEFAULT_SELECTOR_VARIABLE,
    DEFAULT_WAIT_TIMEOUT_SECS,
};
pub use environment::ProcessEnvironment;
pub use error::{CoreError, CoreResult};
pub use launch_args::{DeclaredArgument, LaunchArguments};
pub use logging::init_logging;
pub use paths::Paths;
