//! rmw-launch-test - launches a middleware router and a test runner, waits for
//! the runner, and checks every exit code.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use launch_config_and_utils::{init_logging, LaunchConfig, Paths};

/// rmw launch-test command-line interface.
#[derive(Parser, Debug)]
#[command(name = "rmw-launch-test")]
#[command(about = "Run ROS 2 middleware launch tests and check their exit codes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config and logs. Defaults to ~/.rmw-launch-test
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Configuration file to use instead of <base-dir>/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scenario
    Run(RunArgs),
    /// List registered scenarios and their launch arguments
    List,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Scenario to run. Defaults to the first registered one.
    #[arg(short, long)]
    scenario: Option<String>,

    /// Seconds to wait for the awaited process before failing
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Workspace the test runner executes in (same as workspace_directory:=PATH)
    #[arg(long)]
    workspace_directory: Option<PathBuf>,

    /// Write a JSON report of the run to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Launch arguments in name:=value form
    #[arg(value_name = "NAME:=VALUE")]
    launch_args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let (paths, config) = load_config(&cli)?;

    // Initialize logging
    let log_dir_error = paths.ensure_dirs().err();
    let log_path = log_dir_error.is_none().then(|| paths.log_file());
    init_logging(&config.log_level, log_path);
    if let Some(err) = log_dir_error {
        tracing::warn!(error = %err, "Could not create log directory, logging to stderr only");
    }

    match cli.command {
        Some(Commands::Run(args)) => commands::run(config, args).await,
        None => commands::run(config, RunArgs::default()).await,
        Some(Commands::List) => {
            commands::list();
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Resolve the base directory and load the configuration the flags point at.
/// `--log-level` wins over the file and the environment.
fn load_config(cli: &Cli) -> Result<(Paths, LaunchConfig), Box<dyn std::error::Error>> {
    let paths = match &cli.base_dir {
        Some(base) => Paths::with_base_dir(base.clone()),
        None => Paths::new()?,
    };
    let mut config = match &cli.config {
        Some(file) => {
            let mut config = LaunchConfig::load_from_file(file)?;
            config.load_from_env();
            config
        }
        None => LaunchConfig::load(&paths)?,
    };
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok((paths, config))
}
