//! The one runner every scenario goes through.

use crate::error::ScenarioResult;
use crate::registry::ScenarioPlan;
use crate::report::{ScenarioReport, WaitOutcome};
use chrono::Utc;
use exit_code_validator::{validate_exit_codes, ValidationError};
use launch_supervisor::{LaunchSession, ShutdownMode, SupervisorError};
use std::future::Future;
use tracing::{error, info, warn};

/// Launch `plan`, wait for its target, shut everything down and validate.
///
/// `interrupt` resolves when the harness itself is asked to stop; the wait is
/// then abandoned and processes are killed. Launch and configuration errors
/// are returned as `Err`; every other failure is recorded in the report.
pub async fn run_scenario<F>(plan: &ScenarioPlan, interrupt: F) -> ScenarioResult<ScenarioReport>
where
    F: Future<Output = ()>,
{
    plan.validate()?;
    let started_at = Utc::now();
    info!(
        scenario = %plan.name,
        processes = plan.descriptors.len(),
        target = %plan.wait_target,
        timeout_secs = plan.wait_timeout.as_secs(),
        "Running scenario"
    );

    let mut session = LaunchSession::launch(&plan.descriptors, plan.shutdown_policy).await?;

    let waited = tokio::select! {
        result = session.wait_for_exit(&plan.wait_target, plan.wait_timeout) => match result {
            Ok(event) => Ok((WaitOutcome::Exited, Some(event.state))),
            Err(SupervisorError::Timeout { .. }) => Ok((WaitOutcome::TimedOut, None)),
            Err(err) => Err(err),
        },
        _ = interrupt => {
            warn!(scenario = %plan.name, "Interrupted, abandoning wait");
            Ok((WaitOutcome::Interrupted, None))
        }
    };

    let mode = match waited {
        Ok((WaitOutcome::Exited, _)) => ShutdownMode::Graceful,
        _ => ShutdownMode::Forced,
    };
    let processes = session.shutdown(mode).await;
    let (outcome, target_state) = waited.inspect_err(|err| {
        error!(scenario = %plan.name, error = %err, "Wait failed");
    })?;

    let (still_running, mismatches) = match validate_exit_codes(&processes) {
        Ok(()) => (Vec::new(), Vec::new()),
        Err(ValidationError::StillRunning(names)) => (names, Vec::new()),
        Err(ValidationError::UnexpectedExit(mismatches)) => (Vec::new(), mismatches),
    };

    let report = ScenarioReport {
        scenario: plan.name.clone(),
        started_at,
        finished_at: Utc::now(),
        wait_target: plan.wait_target.clone(),
        wait_timeout: plan.wait_timeout,
        outcome,
        target_state,
        processes,
        still_running,
        mismatches,
    };

    match report.check() {
        Ok(()) => info!(scenario = %plan.name, "Scenario passed"),
        Err(err) => error!(
            scenario = %plan.name,
            kind = ?err.kind(),
            error = %err,
            "Scenario failed"
        ),
    }
    Ok(report)
}
