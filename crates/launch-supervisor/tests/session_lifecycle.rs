//! Session lifecycle tests driving real `sh` and `sleep` children.
//!
//! Properties covered:
//! - every record is terminal after shutdown
//! - waiting reports the awaited exit without polling delays
//! - waiting past the timeout fails and shutdown still cleans up
//! - shutdown twice is a no-op
//! - a failed launch leaves nothing running

use launch_config_and_utils::ProcessEnvironment;
use launch_supervisor::{
    ExpectedExit, LaunchSession, OutputCapture, ProcessDescriptor, ProcessState, ShutdownMode,
    ShutdownPolicy, SupervisorError, KEEP_ALIVE_NAME,
};
use std::sync::Arc;
use std::time::Duration;

fn env() -> Arc<ProcessEnvironment> {
    Arc::new(ProcessEnvironment::from_vars([("PATH", "/usr/bin:/bin")]))
}

fn quick_policy() -> ShutdownPolicy {
    ShutdownPolicy {
        sigint_grace: Duration::from_millis(500),
        sigterm_grace: Duration::from_millis(500),
    }
}

/// Alive and not a zombie waiting for its (possibly absent) reaper.
fn pid_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => !stat
            .rsplit(')')
            .next()
            .map(|rest| rest.trim_start().starts_with('Z'))
            .unwrap_or(false),
        Err(_) => false,
    }
}

// =============================================================================
// Waiting
// =============================================================================

#[tokio::test]
async fn wait_reports_exit_of_target() {
    let descriptors = [
        ProcessDescriptor::command("server", ["sleep", "30"], env()),
        ProcessDescriptor::command("runner", ["sh", "-c", "sleep 0.2; exit 0"], env()),
    ];
    let mut session = LaunchSession::launch(&descriptors, quick_policy())
        .await
        .unwrap();

    let event = session
        .wait_for_exit("runner", Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(event.name, "runner");
    assert_eq!(event.state, ProcessState::Exited { code: 0 });
    assert!(event.waited < Duration::from_secs(10));

    assert_eq!(session.state_of("server"), Some(ProcessState::Running));
    session.shutdown(ShutdownMode::Graceful).await;
}

#[tokio::test]
async fn wait_times_out_and_shutdown_still_cleans_up() {
    let descriptors = [ProcessDescriptor::command("hang", ["sleep", "30"], env())];
    let mut session = LaunchSession::launch(&descriptors, quick_policy())
        .await
        .unwrap();
    let pid = session.process_infos()[0].pid.unwrap();

    let result = session
        .wait_for_exit("hang", Duration::from_millis(200))
        .await;
    match result {
        Err(SupervisorError::Timeout { name, timeout }) => {
            assert_eq!(name, "hang");
            assert_eq!(timeout, Duration::from_millis(200));
        }
        other => panic!("expected Timeout, got {:?}", other),
    }

    let infos = session.shutdown(ShutdownMode::Forced).await;
    assert!(infos.iter().all(|i| i.state.is_terminal()));
    assert!(!pid_alive(pid));
}

#[tokio::test]
async fn wait_on_already_exited_target_returns_immediately() {
    let descriptors = [ProcessDescriptor::command("quick", ["sh", "-c", "exit 4"], env())];
    let mut session = LaunchSession::launch(&descriptors, quick_policy())
        .await
        .unwrap();

    session
        .wait_for_exit("quick", Duration::from_secs(10))
        .await
        .unwrap();
    let again = session
        .wait_for_exit("quick", Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(again.state, ProcessState::Exited { code: 4 });

    session.shutdown(ShutdownMode::Graceful).await;
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn every_record_terminal_after_shutdown() {
    let descriptors = [
        ProcessDescriptor::command("a", ["sleep", "30"], env()),
        ProcessDescriptor::command("b", ["sleep", "30"], env()).output(OutputCapture::Both),
        ProcessDescriptor::command("c", ["true"], env()),
    ];
    let mut session = LaunchSession::launch(&descriptors, quick_policy())
        .await
        .unwrap();

    let infos = session.shutdown(ShutdownMode::Graceful).await;
    assert_eq!(infos.len(), 4);
    assert!(infos.iter().all(|i| i.state.is_terminal()));
    assert_eq!(infos[3].name, KEEP_ALIVE_NAME);
}

#[tokio::test]
async fn graceful_shutdown_stops_with_sigint() {
    let descriptors = [ProcessDescriptor::command("sleeper", ["sleep", "30"], env())];
    let mut session = LaunchSession::launch(&descriptors, quick_policy())
        .await
        .unwrap();

    let infos = session.shutdown(ShutdownMode::Graceful).await;
    assert_eq!(
        infos[0].state,
        ProcessState::Killed {
            signal: libc::SIGINT
        }
    );
}

#[tokio::test]
async fn shutdown_twice_is_a_no_op() {
    let descriptors = [ProcessDescriptor::command("sleeper", ["sleep", "30"], env())];
    let mut session = LaunchSession::launch(&descriptors, quick_policy())
        .await
        .unwrap();

    let first = session.shutdown(ShutdownMode::Graceful).await;
    assert!(session.is_shut_down());
    let second = session.shutdown(ShutdownMode::Forced).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn shell_grandchildren_are_signaled() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("grandchild.pid");
    let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
    let descriptors = [ProcessDescriptor::command("wrapper", ["sh", "-c", script.as_str()], env())];
    let mut session = LaunchSession::launch(&descriptors, quick_policy())
        .await
        .unwrap();

    let mut grandchild = None;
    for _ in 0..50 {
        if let Ok(raw) = std::fs::read_to_string(&pid_file) {
            if let Ok(pid) = raw.trim().parse::<u32>() {
                grandchild = Some(pid);
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let grandchild = grandchild.expect("grandchild pid written");

    session.shutdown(ShutdownMode::Graceful).await;
    // The grandchild is reparented, so give it a moment to die.
    for _ in 0..50 {
        if !pid_alive(grandchild) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!pid_alive(grandchild));
}

// =============================================================================
// Launch failures
// =============================================================================

#[tokio::test]
async fn failed_launch_kills_started_processes() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("good.pid");
    let script = format!("echo $$ > {}; exec sleep 30", pid_file.display());
    let good = ProcessDescriptor::command("good", ["sh", "-c", script.as_str()], env());
    let bad = ProcessDescriptor::command("bad", ["/nonexistent/launch-test-binary"], env());

    let err = match LaunchSession::launch(&[good, bad], quick_policy()).await {
        Err(err) => err,
        Ok(_) => panic!("launch should fail"),
    };
    assert!(err.is_launch_failure());
    match err {
        SupervisorError::Launch { name, .. } => assert_eq!(name, "bad"),
        other => panic!("expected Launch, got {:?}", other),
    }

    // "good" may have been killed before its shell wrote the pid.
    if let Some(pid) = std::fs::read_to_string(&pid_file)
        .ok()
        .and_then(|raw| raw.trim().parse::<u32>().ok())
    {
        assert!(!pid_alive(pid));
    }
}

#[tokio::test]
async fn duplicate_names_fail_before_anything_starts() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("started");
    let touch = format!("touch {}", marker.display());
    let descriptors = [
        ProcessDescriptor::command("same", ["sh", "-c", touch.as_str()], env()),
        ProcessDescriptor::command("same", ["true"], env()),
    ];

    let result = LaunchSession::launch(&descriptors, quick_policy()).await;
    assert!(matches!(result, Err(SupervisorError::Configuration(_))));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn whitelisted_exit_recorded_in_info() {
    let descriptors = [ProcessDescriptor::command("two", ["sh", "-c", "exit 2"], env())
        .expect_exit(ExpectedExit::codes([0, 2]))];
    let mut session = LaunchSession::launch(&descriptors, quick_policy())
        .await
        .unwrap();

    session
        .wait_for_exit("two", Duration::from_secs(10))
        .await
        .unwrap();
    let infos = session.shutdown(ShutdownMode::Graceful).await;
    assert!(infos[0].exited_as_expected());
    assert!(infos[1].exited_as_expected());
}
