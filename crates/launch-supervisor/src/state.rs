//! Process lifecycle states and the per-process runtime record.

use crate::descriptor::ExpectedExit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::ExitStatus;

/// Exit code recorded when the operating system could not report a status.
pub(crate) const UNKNOWN_EXIT_CODE: i32 = -1;

/// Lifecycle of one supervised process.
///
/// `NotStarted -> Running -> (Exited | Killed)`. Terminal states are final.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessState {
    #[default]
    NotStarted,
    Running,
    Exited { code: i32 },
    Killed { signal: i32 },
}

impl ProcessState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited { .. } | Self::Killed { .. })
    }

    /// The state reached by moving to `next`, or `None` if the transition is illegal.
    pub fn advance(self, next: ProcessState) -> Option<ProcessState> {
        match (self, next) {
            (Self::NotStarted, Self::Running) => Some(next),
            (Self::NotStarted | Self::Running, next) if next.is_terminal() => Some(next),
            _ => None,
        }
    }

    /// Terminal state for a reaped child.
    pub fn from_exit_status(status: ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;

        match (status.code(), status.signal()) {
            (Some(code), _) => Self::Exited { code },
            (None, Some(signal)) => Self::Killed { signal },
            (None, None) => Self::Exited {
                code: UNKNOWN_EXIT_CODE,
            },
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Running => write!(f, "running"),
            Self::Exited { code } => write!(f, "exited with code {}", code),
            Self::Killed { signal } => write!(f, "killed by {}", signal_name(*signal)),
        }
    }
}

/// Human-readable name of a signal number.
pub fn signal_name(signal: i32) -> String {
    match signal {
        libc::SIGHUP => "SIGHUP".to_string(),
        libc::SIGINT => "SIGINT".to_string(),
        libc::SIGQUIT => "SIGQUIT".to_string(),
        libc::SIGABRT => "SIGABRT".to_string(),
        libc::SIGKILL => "SIGKILL".to_string(),
        libc::SIGSEGV => "SIGSEGV".to_string(),
        libc::SIGPIPE => "SIGPIPE".to_string(),
        libc::SIGTERM => "SIGTERM".to_string(),
        other => format!("signal {}", other),
    }
}

/// Runtime record of one launched process, as seen by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub name: String,
    /// `None` for the in-process keep-alive entry.
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub state: ProcessState,
    pub expected_exit: ExpectedExit,
    /// Whether this entry only exists to keep the session alive.
    pub auxiliary: bool,
}

impl ProcessInfo {
    /// Whether the recorded state satisfies the expected exit.
    pub fn exited_as_expected(&self) -> bool {
        self.expected_exit.accepts(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn legal_transitions() {
        assert_eq!(
            ProcessState::NotStarted.advance(ProcessState::Running),
            Some(ProcessState::Running)
        );
        assert_eq!(
            ProcessState::Running.advance(ProcessState::Exited { code: 0 }),
            Some(ProcessState::Exited { code: 0 })
        );
        assert_eq!(
            ProcessState::Running.advance(ProcessState::Killed { signal: 9 }),
            Some(ProcessState::Killed { signal: 9 })
        );
    }

    #[test]
    fn terminal_states_are_final() {
        let exited = ProcessState::Exited { code: 1 };
        assert_eq!(exited.advance(ProcessState::Running), None);
        assert_eq!(exited.advance(ProcessState::Exited { code: 0 }), None);

        let killed = ProcessState::Killed { signal: 2 };
        assert_eq!(killed.advance(ProcessState::Killed { signal: 9 }), None);
    }

    #[test]
    fn running_cannot_go_back() {
        assert_eq!(ProcessState::Running.advance(ProcessState::NotStarted), None);
        assert_eq!(ProcessState::Running.advance(ProcessState::Running), None);
    }

    #[test]
    fn from_exit_status_code_and_signal() {
        // Raw wait statuses: exit code in the high byte, signal in the low bits.
        let exited = ExitStatus::from_raw(3 << 8);
        assert_eq!(
            ProcessState::from_exit_status(exited),
            ProcessState::Exited { code: 3 }
        );

        let killed = ExitStatus::from_raw(libc::SIGTERM);
        assert_eq!(
            ProcessState::from_exit_status(killed),
            ProcessState::Killed {
                signal: libc::SIGTERM
            }
        );
    }

    #[test]
    fn display_states() {
        assert_eq!(ProcessState::Running.to_string(), "running");
        assert_eq!(
            ProcessState::Exited { code: 2 }.to_string(),
            "exited with code 2"
        );
        assert_eq!(
            ProcessState::Killed { signal: libc::SIGINT }.to_string(),
            "killed by SIGINT"
        );
    }

    #[test]
    fn unknown_signal_name() {
        assert_eq!(signal_name(64), "signal 64");
    }

    #[test]
    fn state_serializes_tagged() {
        let json = serde_json::to_value(ProcessState::Exited { code: 0 }).unwrap();
        assert_eq!(json["state"], "exited");
        assert_eq!(json["code"], 0);
    }
}
