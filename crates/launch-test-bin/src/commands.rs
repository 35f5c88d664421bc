//! Subcommand implementations.

use crate::RunArgs;
use launch_config_and_utils::{LaunchArguments, LaunchConfig, ProcessEnvironment};
use launch_scenarios::rclcpp_zenoh::WORKSPACE_DIRECTORY_ARG;
use launch_scenarios::{default_scenario, find_scenario, registered_scenarios, run_scenario};
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

/// Run one scenario. Exit code 0 when it passes, 1 when it fails.
pub async fn run(mut config: LaunchConfig, args: RunArgs) -> Result<ExitCode, Box<dyn Error>> {
    if let Some(secs) = args.timeout_secs {
        config.wait_timeout_secs = secs;
    }
    config.validate()?;

    let scenario = match &args.scenario {
        Some(name) => find_scenario(name)?,
        None => default_scenario(),
    };
    let launch_args = launch_arguments(&args)?;

    let environment = Arc::new(ProcessEnvironment::derive_with_selector(
        &config.selector_variable,
        &config.rmw_implementation,
    ));
    info!(
        scenario = scenario.name,
        selector = %config.selector_variable,
        implementation = %config.rmw_implementation,
        variables = environment.len(),
        "Derived child environment"
    );

    let plan = scenario.prepare(&config, environment, &launch_args)?;
    let report = match run_scenario(&plan, shutdown_signal()).await {
        Ok(report) => report,
        Err(err) => {
            error!(kind = ?err.kind(), error = %err, "Scenario could not run");
            return Err(err.into());
        }
    };

    if let Some(path) = &args.report {
        report.write_to(path)?;
    }

    match report.check() {
        Ok(()) => {
            println!("PASSED: {}", report.scenario);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("FAILED: {}: {}", report.scenario, err);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Print every registered scenario with its launch arguments.
pub fn list() {
    for scenario in registered_scenarios() {
        println!("{}\t{}", scenario.name, scenario.description);
        for argument in (scenario.arguments)() {
            match &argument.default {
                Some(default) => println!(
                    "  {}:=<value>\t{} (default: {})",
                    argument.name, argument.description, default
                ),
                None => println!(
                    "  {}:=<value>\t{} (required)",
                    argument.name, argument.description
                ),
            }
        }
    }
}

/// Positional `name:=value` pairs, then `--workspace-directory` on top.
fn launch_arguments(args: &RunArgs) -> Result<LaunchArguments, Box<dyn Error>> {
    let mut launch_args = LaunchArguments::parse(&args.launch_args)?;
    if let Some(dir) = &args.workspace_directory {
        launch_args.set(WORKSPACE_DIRECTORY_ARG, dir.display().to_string());
    }
    Ok(launch_args)
}

/// Resolves on the first SIGINT or SIGTERM delivered to the harness.
async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(err) => {
            warn!(error = %err, "Could not install SIGTERM handler, only SIGINT stops the run");
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received SIGINT");
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                warn!(error = %err, "SIGINT handler failed");
                // Keep waiting for SIGTERM rather than interrupting the run.
                sigterm.recv().await;
            }
            info!("Received SIGINT");
        }
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn positional_launch_arguments() {
        let args = RunArgs {
            launch_args: vec!["workspace_directory:=/ws".to_string()],
            ..RunArgs::default()
        };
        let parsed = launch_arguments(&args).unwrap();
        assert_eq!(parsed.get(WORKSPACE_DIRECTORY_ARG), Some("/ws"));
    }

    #[test]
    fn workspace_flag_overrides_positional() {
        let args = RunArgs {
            workspace_directory: Some(PathBuf::from("/flag")),
            launch_args: vec!["workspace_directory:=/positional".to_string()],
            ..RunArgs::default()
        };
        let parsed = launch_arguments(&args).unwrap();
        assert_eq!(parsed.get(WORKSPACE_DIRECTORY_ARG), Some("/flag"));
    }

    #[test]
    fn malformed_launch_argument_rejected() {
        let args = RunArgs {
            launch_args: vec!["workspace_directory=/ws".to_string()],
            ..RunArgs::default()
        };
        assert!(launch_arguments(&args).is_err());
    }

    #[tokio::test]
    async fn missing_workspace_fails_before_launch() {
        let err = run(LaunchConfig::default(), RunArgs::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains(WORKSPACE_DIRECTORY_ARG));
    }

    #[tokio::test]
    async fn unknown_scenario_fails() {
        let args = RunArgs {
            scenario: Some("does_not_exist".to_string()),
            ..RunArgs::default()
        };
        let err = run(LaunchConfig::default(), args).await.unwrap_err();
        assert!(err.to_string().contains("does_not_exist"));
    }

    #[tokio::test]
    async fn zero_timeout_rejected() {
        let args = RunArgs {
            timeout_secs: Some(0),
            ..RunArgs::default()
        };
        let err = run(LaunchConfig::default(), args).await.unwrap_err();
        assert!(err.to_string().contains("wait_timeout_secs"));
    }
}
