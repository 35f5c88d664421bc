//! The set of processes launched together, and their shutdown.

use crate::descriptor::{ExpectedExit, ProcessDescriptor};
use crate::error::{SupervisorError, SupervisorResult};
use crate::process::{advance, spawn_child, ChildHandle};
use crate::state::{signal_name, ProcessInfo, ProcessState};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

/// Name of the session's keep-alive entry.
pub const KEEP_ALIVE_NAME: &str = "keep_alive";

/// How long to wait for children to be reaped after SIGKILL.
const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(5);
/// How long captured output may keep flowing after its process stopped.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Grace periods of the shutdown escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownPolicy {
    /// Time between SIGINT and SIGTERM.
    pub sigint_grace: Duration,
    /// Time between SIGTERM and SIGKILL.
    pub sigterm_grace: Duration,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self {
            sigint_grace: Duration::from_secs(5),
            sigterm_grace: Duration::from_secs(5),
        }
    }
}

/// How remaining processes are stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// SIGINT, then SIGTERM, then SIGKILL, each after its grace period.
    Graceful,
    /// SIGKILL straight away.
    Forced,
}

/// The awaited process reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitEvent {
    pub name: String,
    pub state: ProcessState,
    pub waited: Duration,
}

enum EntryKind {
    Child(ChildHandle),
    /// Holds the session open until shutdown releases it.
    KeepAlive(watch::Sender<ProcessState>),
}

struct Entry {
    name: String,
    expected_exit: ExpectedExit,
    started_at: DateTime<Utc>,
    state: watch::Receiver<ProcessState>,
    kind: EntryKind,
}

impl Entry {
    fn current_state(&self) -> ProcessState {
        *self.state.borrow()
    }

    fn info(&self) -> ProcessInfo {
        let (pid, auxiliary) = match &self.kind {
            EntryKind::Child(handle) => (handle.pid, false),
            EntryKind::KeepAlive(_) => (None, true),
        };
        ProcessInfo {
            name: self.name.clone(),
            pid,
            started_at: self.started_at,
            state: self.current_state(),
            expected_exit: self.expected_exit.clone(),
            auxiliary,
        }
    }
}

/// Processes launched together plus the keep-alive entry.
///
/// The session stays open until [`LaunchSession::shutdown`] is called, even
/// when every real process has already exited.
pub struct LaunchSession {
    entries: Vec<Entry>,
    policy: ShutdownPolicy,
    shut_down: bool,
}

impl LaunchSession {
    /// Start every descriptor.
    ///
    /// If any process fails to start, the ones already running are killed
    /// before the error is returned.
    pub async fn launch(
        descriptors: &[ProcessDescriptor],
        policy: ShutdownPolicy,
    ) -> SupervisorResult<Self> {
        check_names(descriptors)?;

        let mut session = Self {
            entries: Vec::with_capacity(descriptors.len() + 1),
            policy,
            shut_down: false,
        };

        for descriptor in descriptors {
            match spawn_child(descriptor) {
                Ok(handle) => session.entries.push(Entry {
                    name: descriptor.name.clone(),
                    expected_exit: descriptor.expected_exit.clone(),
                    started_at: handle.started_at,
                    state: handle.state.clone(),
                    kind: EntryKind::Child(handle),
                }),
                Err(err) => {
                    warn!(process = %descriptor.name, error = %err, "Launch failed, stopping started processes");
                    session.shutdown(ShutdownMode::Forced).await;
                    return Err(err);
                }
            }
        }

        let (keep_alive_tx, keep_alive_rx) = watch::channel(ProcessState::NotStarted);
        advance(&keep_alive_tx, ProcessState::Running);
        session.entries.push(Entry {
            name: KEEP_ALIVE_NAME.to_string(),
            expected_exit: ExpectedExit::success(),
            started_at: Utc::now(),
            state: keep_alive_rx,
            kind: EntryKind::KeepAlive(keep_alive_tx),
        });

        info!(processes = descriptors.len(), "All processes launched, ready to test");
        Ok(session)
    }

    /// Wait until `target` has exited, or fail after `limit`.
    pub async fn wait_for_exit(&self, target: &str, limit: Duration) -> SupervisorResult<ExitEvent> {
        let entry = self.entry(target).ok_or_else(|| {
            SupervisorError::Configuration(format!("unknown process '{}'", target))
        })?;

        info!(process = %target, timeout_secs = limit.as_secs(), "Waiting for process to exit");
        let started = Instant::now();
        let mut state = entry.state.clone();

        let waited = timeout(limit, state.wait_for(ProcessState::is_terminal))
            .await
            .map(|changed| changed.map(|reached| *reached));

        match waited {
            Ok(Ok(reached)) => {
                let event = ExitEvent {
                    name: target.to_string(),
                    state: reached,
                    waited: started.elapsed(),
                };
                info!(
                    process = %target,
                    state = %event.state,
                    waited_ms = event.waited.as_millis() as u64,
                    "Awaited process exited"
                );
                Ok(event)
            }
            Ok(Err(_)) => Err(SupervisorError::WatcherLost(target.to_string())),
            Err(_) => {
                warn!(process = %target, timeout_secs = limit.as_secs(), "Timed out waiting for process");
                Err(SupervisorError::Timeout {
                    name: target.to_string(),
                    timeout: limit,
                })
            }
        }
    }

    /// Stop everything still running and return the final records.
    ///
    /// Calling this again after the session is down returns the same records
    /// without signaling anything.
    pub async fn shutdown(&mut self, mode: ShutdownMode) -> Vec<ProcessInfo> {
        if self.shut_down {
            debug!("Session already shut down");
            return self.process_infos();
        }
        self.shut_down = true;
        info!(mode = ?mode, "Shutting down launch session");

        self.release_keep_alive();

        if mode == ShutdownMode::Graceful {
            for (signal, grace) in [
                (libc::SIGINT, self.policy.sigint_grace),
                (libc::SIGTERM, self.policy.sigterm_grace),
            ] {
                if self.all_terminal() {
                    break;
                }
                self.signal_running(signal);
                if self.wait_all_terminal(grace).await {
                    break;
                }
                warn!(
                    signal = %signal_name(signal),
                    grace_ms = grace.as_millis() as u64,
                    still_running = ?self.running_names(),
                    "Processes ignored signal within grace period, escalating"
                );
            }
        }

        if !self.all_terminal() {
            self.signal_running(libc::SIGKILL);
            if !self.wait_all_terminal(KILL_REAP_TIMEOUT).await {
                warn!(still_running = ?self.running_names(), "Processes survived SIGKILL");
            }
        }

        for entry in &self.entries {
            if let EntryKind::Child(handle) = &entry.kind {
                handle.kill_group_stragglers(&entry.name);
            }
        }

        self.join_tasks().await;

        let infos = self.process_infos();
        for info in &infos {
            debug!(process = %info.name, state = %info.state, "Final process state");
        }
        infos
    }

    /// Snapshot of every entry, in launch order, keep-alive last.
    pub fn process_infos(&self) -> Vec<ProcessInfo> {
        self.entries.iter().map(Entry::info).collect()
    }

    pub fn state_of(&self, name: &str) -> Option<ProcessState> {
        self.entry(name).map(Entry::current_state)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }

    fn release_keep_alive(&self) {
        for entry in &self.entries {
            if let EntryKind::KeepAlive(tx) = &entry.kind {
                advance(tx, ProcessState::Exited { code: 0 });
            }
        }
    }

    fn all_terminal(&self) -> bool {
        self.entries.iter().all(|e| e.current_state().is_terminal())
    }

    fn running_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.current_state().is_terminal())
            .map(|e| e.name.as_str())
            .collect()
    }

    fn signal_running(&self, signal: i32) {
        for entry in &self.entries {
            if let EntryKind::Child(handle) = &entry.kind {
                handle.signal(signal);
            }
        }
    }

    async fn wait_all_terminal(&self, grace: Duration) -> bool {
        let mut receivers: Vec<_> = self.entries.iter().map(|e| e.state.clone()).collect();
        let all = async {
            for rx in &mut receivers {
                // A dropped sender means the watcher is gone; nothing left to wait for.
                let _ = rx.wait_for(ProcessState::is_terminal).await;
            }
        };
        timeout(grace, all).await.is_ok()
    }

    async fn join_tasks(&mut self) {
        for entry in &mut self.entries {
            let EntryKind::Child(handle) = &mut entry.kind else {
                continue;
            };
            if handle.watcher.is_finished() {
                let _ = (&mut handle.watcher).await;
            }
            for task in handle.output_tasks.drain(..) {
                let abort = task.abort_handle();
                if timeout(OUTPUT_DRAIN_TIMEOUT, task).await.is_err() {
                    debug!(process = %entry.name, "Output still open after stop, abandoning reader");
                    abort.abort();
                }
            }
        }
    }
}

impl Drop for LaunchSession {
    fn drop(&mut self) {
        if self.shut_down {
            return;
        }
        let running = self.running_names();
        if !running.is_empty() {
            warn!(still_running = ?running, "Launch session dropped without shutdown, killing processes");
        }
        self.signal_running(libc::SIGKILL);
    }
}

fn check_names(descriptors: &[ProcessDescriptor]) -> SupervisorResult<()> {
    let mut seen = HashSet::new();
    seen.insert(KEEP_ALIVE_NAME);
    for descriptor in descriptors {
        if !seen.insert(descriptor.name.as_str()) {
            return Err(SupervisorError::Configuration(format!(
                "duplicate process name '{}'",
                descriptor.name
            )));
        }
    }
    Ok(())
}
