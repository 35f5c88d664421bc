//! Spawning one child and watching it until it is reaped.

use crate::descriptor::ProcessDescriptor;
use crate::error::{SupervisorError, SupervisorResult};
use crate::output::attach_output_streams;
use crate::resolve::invocation;
use crate::state::{signal_name, ProcessState, UNKNOWN_EXIT_CODE};
use chrono::{DateTime, Utc};
use std::os::unix::process::CommandExt;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A launched child owned by its watcher task.
///
/// The handle only talks to the watcher: signals go through `control`, the
/// lifecycle comes back through `state`.
pub(crate) struct ChildHandle {
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub state: watch::Receiver<ProcessState>,
    control: mpsc::UnboundedSender<i32>,
    pub watcher: JoinHandle<()>,
    pub output_tasks: Vec<JoinHandle<()>>,
}

impl ChildHandle {
    /// Ask the watcher to deliver `signal` to the child's process group.
    ///
    /// Does nothing once the child has been reaped.
    pub fn signal(&self, signal: i32) {
        if self.state.borrow().is_terminal() {
            return;
        }
        if self.control.send(signal).is_err() {
            debug!(pid = ?self.pid, "Watcher already gone, signal dropped");
        }
    }

    /// SIGKILL whatever is left in the child's process group after the child
    /// itself was reaped, e.g. background jobs of a shell.
    ///
    /// Once the last member exits the group id is free for the kernel to hand
    /// out again, so the group is probed with a null signal first and left
    /// alone when empty. The probe and the kill are two syscalls; a group that
    /// empties and gets its id reused between them is not detected.
    pub fn kill_group_stragglers(&self, name: &str) {
        if !self.state.borrow().is_terminal() {
            return;
        }
        let Some(pid) = self.pid else {
            return;
        };
        if !group_has_members(pid) {
            debug!(process = %name, pid, "Process group already empty");
            return;
        }
        send_to_group(name, pid, libc::SIGKILL);
    }
}

/// Spawn the process described by `descriptor` and start its watcher.
pub(crate) fn spawn_child(descriptor: &ProcessDescriptor) -> SupervisorResult<ChildHandle> {
    let inv = invocation(descriptor)?;

    if let Some(dir) = &descriptor.working_dir {
        if !dir.is_dir() {
            return Err(SupervisorError::WorkingDirectory {
                name: descriptor.name.clone(),
                path: dir.clone(),
            });
        }
    }

    let mut command = std::process::Command::new(&inv.program);
    command
        .args(&inv.args)
        .env_clear()
        .envs(descriptor.environment.iter())
        .stdin(Stdio::null())
        // Own process group so shell-spawned grandchildren receive our signals.
        .process_group(0);

    if let Some(dir) = &descriptor.working_dir {
        command.current_dir(dir);
    }

    if descriptor.output.is_captured() {
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
    } else {
        command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    }

    let mut command = Command::from(command);
    command.kill_on_drop(true);

    debug!(
        process = %descriptor.name,
        program = %inv.program,
        args = ?inv.args,
        cwd = ?descriptor.working_dir,
        "Spawning process"
    );

    let mut child = command.spawn().map_err(|source| SupervisorError::Launch {
        name: descriptor.name.clone(),
        program: inv.program.clone(),
        source,
    })?;

    let pid = child.id();
    let started_at = Utc::now();
    info!(process = %descriptor.name, pid = ?pid, program = %inv.program, "Process started");

    let output_tasks = attach_output_streams(&mut child, &descriptor.name, descriptor.output);

    let (state_tx, state_rx) = watch::channel(ProcessState::NotStarted);
    advance(&state_tx, ProcessState::Running);
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let watcher = tokio::spawn(watch_child(
        descriptor.name.clone(),
        child,
        control_rx,
        state_tx,
    ));

    Ok(ChildHandle {
        pid,
        started_at,
        state: state_rx,
        control: control_tx,
        watcher,
        output_tasks,
    })
}

/// Move the published state forward, ignoring illegal transitions.
pub(crate) fn advance(state: &watch::Sender<ProcessState>, next: ProcessState) {
    state.send_if_modified(|current| match current.advance(next) {
        Some(advanced) => {
            *current = advanced;
            true
        }
        None => false,
    });
}

async fn watch_child(
    name: String,
    mut child: Child,
    mut control: mpsc::UnboundedReceiver<i32>,
    state: watch::Sender<ProcessState>,
) {
    let final_state = loop {
        tokio::select! {
            status = child.wait() => break match status {
                Ok(status) => ProcessState::from_exit_status(status),
                Err(err) => {
                    warn!(process = %name, error = %err, "Failed to reap process");
                    ProcessState::Exited { code: UNKNOWN_EXIT_CODE }
                }
            },
            Some(signal) = control.recv() => {
                if let Some(pid) = child.id() {
                    send_to_group(&name, pid, signal);
                }
            }
        }
    };

    info!(process = %name, state = %final_state, "Process stopped");
    advance(&state, final_state);
}

/// Whether the process group led by `pid` still has a member we may signal.
fn group_has_members(pid: u32) -> bool {
    match libc::pid_t::try_from(pid) {
        Ok(pgid) => unsafe { libc::killpg(pgid, 0) == 0 },
        Err(_) => false,
    }
}

fn send_to_group(name: &str, pid: u32, signal: i32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        warn!(process = %name, pid, "Process id out of range, signal not sent");
        return;
    };
    // The child was spawned with process_group(0), so its pid is its pgid.
    let rc = unsafe { libc::killpg(pgid, signal) };
    if rc == 0 {
        info!(process = %name, pid, signal = %signal_name(signal), "Signaled process group");
    } else {
        let err = std::io::Error::last_os_error();
        debug!(process = %name, pid, error = %err, "killpg failed");
    }
}
