//! rclcpp integration tests over the Zenoh middleware.
//!
//! Starts the Zenoh router, then runs the `test_rclcpp` suite through colcon
//! inside the ROS entrypoint and waits for colcon to finish.

use crate::error::ScenarioResult;
use crate::registry::{ScenarioContext, ScenarioDefinition, ScenarioPlan};
use launch_config_and_utils::{DeclaredArgument, LaunchConfig, ProcessEnvironment};
use launch_supervisor::{ExpectedExit, OutputCapture, ProcessDescriptor};
use std::path::Path;
use std::sync::Arc;

pub const SCENARIO_NAME: &str = "rclcpp_integration";

/// Launch argument holding the colcon workspace the suite runs in.
pub const WORKSPACE_DIRECTORY_ARG: &str = "workspace_directory";

pub const ROUTER_NAME: &str = "zenoh_router";
pub const ROUTER_PACKAGE: &str = "rmw_zenoh_cpp";
pub const ROUTER_EXECUTABLE: &str = "rmw_zenohd";

pub const TEST_RUNNER_NAME: &str = "dut_process";

pub(crate) const SCENARIO: ScenarioDefinition = ScenarioDefinition {
    name: SCENARIO_NAME,
    description: "Run the test_rclcpp suite with colcon against a Zenoh router",
    arguments,
    plan,
};

fn arguments() -> Vec<DeclaredArgument> {
    vec![DeclaredArgument::required(
        WORKSPACE_DIRECTORY_ARG,
        "colcon workspace the tests run in",
    )]
}

fn plan(context: &ScenarioContext<'_>) -> ScenarioResult<ScenarioPlan> {
    let workspace = context.argument(WORKSPACE_DIRECTORY_ARG)?;
    let descriptors = vec![
        router_descriptor(Arc::clone(&context.environment)),
        test_runner_descriptor(
            context.config,
            Arc::clone(&context.environment),
            Path::new(workspace),
        ),
    ];
    Ok(ScenarioPlan::new(SCENARIO_NAME, descriptors, TEST_RUNNER_NAME))
}

/// The Zenoh router. It runs until shutdown, so being stopped by the
/// shutdown signals counts as a clean exit.
pub fn router_descriptor(environment: Arc<ProcessEnvironment>) -> ProcessDescriptor {
    ProcessDescriptor::node(ROUTER_NAME, ROUTER_PACKAGE, ROUTER_EXECUTABLE, environment)
        .output(OutputCapture::Both)
        .expect_exit(ExpectedExit::success().allow_signals([libc::SIGINT, libc::SIGTERM]))
}

/// `<entrypoint> colcon test --packages-select ... --install-base <ros>/<distro>`
pub fn test_runner_command(config: &LaunchConfig) -> Vec<String> {
    let install_base = config.ros_install_base().display().to_string();

    let mut argv = vec![
        config.entrypoint.display().to_string(),
        "colcon".to_string(),
        "test".to_string(),
        "--packages-select".to_string(),
    ];
    argv.extend(config.packages_select.iter().cloned());
    argv.extend([
        "--retest-until-pass".to_string(),
        config.retest_until_pass.to_string(),
        "--merge-install".to_string(),
        "--base-paths".to_string(),
        install_base.clone(),
        "--install-base".to_string(),
        install_base,
    ]);
    argv
}

/// The colcon test run, executed through a shell inside `workspace`.
pub fn test_runner_descriptor(
    config: &LaunchConfig,
    environment: Arc<ProcessEnvironment>,
    workspace: &Path,
) -> ProcessDescriptor {
    ProcessDescriptor::command(TEST_RUNNER_NAME, test_runner_command(config), environment)
        .shell(true)
        .working_dir(workspace)
}
