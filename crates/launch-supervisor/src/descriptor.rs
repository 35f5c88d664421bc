//! Declarative description of a process to launch.

use crate::state::{signal_name, ProcessState};
use launch_config_and_utils::ProcessEnvironment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Where a process's stdout and stderr go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputCapture {
    /// Inherit the harness's terminal.
    Screen,
    /// Capture into structured log events only.
    #[default]
    Log,
    /// Capture into structured log events and echo to the terminal.
    Both,
}

impl OutputCapture {
    pub(crate) fn is_captured(self) -> bool {
        !matches!(self, Self::Screen)
    }
}

/// What to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    /// An executable installed by a package, resolved through `AMENT_PREFIX_PATH`.
    PackageExecutable {
        package: String,
        executable: String,
        arguments: Vec<String>,
    },
    /// A literal argument vector; the first element is the program.
    Literal(Vec<String>),
}

/// Exit codes and signals accepted as a normal termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedExit {
    pub codes: Vec<i32>,
    #[serde(default)]
    pub signals: Vec<i32>,
}

impl ExpectedExit {
    /// Only exit code 0 is accepted.
    pub fn success() -> Self {
        Self {
            codes: vec![0],
            signals: Vec::new(),
        }
    }

    /// Accept exactly the given exit codes.
    pub fn codes(codes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
            signals: Vec::new(),
        }
    }

    /// Additionally accept termination by the given signals.
    pub fn allow_signals(mut self, signals: impl IntoIterator<Item = i32>) -> Self {
        self.signals.extend(signals);
        self
    }

    /// Whether a final state counts as a normal termination.
    pub fn accepts(&self, state: ProcessState) -> bool {
        match state {
            ProcessState::Exited { code } => self.codes.contains(&code),
            ProcessState::Killed { signal } => self.signals.contains(&signal),
            ProcessState::NotStarted | ProcessState::Running => false,
        }
    }
}

impl Default for ExpectedExit {
    fn default() -> Self {
        Self::success()
    }
}

impl fmt::Display for ExpectedExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.codes.as_slice() {
            [code] => write!(f, "exit code {}", code)?,
            codes => write!(f, "exit code in {:?}", codes)?,
        }
        if !self.signals.is_empty() {
            let names: Vec<String> = self.signals.iter().map(|s| signal_name(*s)).collect();
            write!(f, " or termination by {}", names.join("/"))?;
        }
        Ok(())
    }
}

/// An immutable description of one process of a launch.
#[derive(Debug, Clone)]
pub struct ProcessDescriptor {
    pub name: String,
    pub command: CommandSpec,
    pub environment: Arc<ProcessEnvironment>,
    pub working_dir: Option<PathBuf>,
    pub output: OutputCapture,
    pub expected_exit: ExpectedExit,
    /// Run the joined command line through `sh -c`.
    pub shell: bool,
}

impl ProcessDescriptor {
    /// A package executable with no arguments, the way a ROS node is declared.
    pub fn node(
        name: &str,
        package: &str,
        executable: &str,
        environment: Arc<ProcessEnvironment>,
    ) -> Self {
        Self::new(
            name,
            CommandSpec::PackageExecutable {
                package: package.to_string(),
                executable: executable.to_string(),
                arguments: Vec::new(),
            },
            environment,
        )
    }

    /// A literal command vector.
    pub fn command<I, S>(name: &str, argv: I, environment: Arc<ProcessEnvironment>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            CommandSpec::Literal(argv.into_iter().map(Into::into).collect()),
            environment,
        )
    }

    fn new(name: &str, command: CommandSpec, environment: Arc<ProcessEnvironment>) -> Self {
        Self {
            name: name.to_string(),
            command,
            environment,
            working_dir: None,
            output: OutputCapture::default(),
            expected_exit: ExpectedExit::default(),
            shell: false,
        }
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn output(mut self, output: OutputCapture) -> Self {
        self.output = output;
        self
    }

    pub fn expect_exit(mut self, expected: ExpectedExit) -> Self {
        self.expected_exit = expected;
        self
    }

    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }
}
