//! Scenario definitions and the static list of registered scenarios.

use crate::error::{ScenarioError, ScenarioResult};
use crate::rclcpp_zenoh;
use launch_config_and_utils::{DeclaredArgument, LaunchArguments, LaunchConfig, ProcessEnvironment};
use launch_supervisor::{ProcessDescriptor, ShutdownPolicy};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Everything a scenario needs to build its plan.
pub struct ScenarioContext<'a> {
    pub config: &'a LaunchConfig,
    pub environment: Arc<ProcessEnvironment>,
    /// Declared launch arguments with defaults applied.
    pub arguments: BTreeMap<String, String>,
}

impl ScenarioContext<'_> {
    /// Value of a declared argument. Resolution already rejected missing ones,
    /// so this only fails for arguments the scenario forgot to declare.
    pub fn argument(&self, name: &str) -> ScenarioResult<&str> {
        self.arguments
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| {
                launch_config_and_utils::CoreError::MissingLaunchArgument(name.to_string()).into()
            })
    }
}

/// A ready-to-run launch: what to start, what to wait for, and for how long.
#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    pub name: String,
    pub descriptors: Vec<ProcessDescriptor>,
    pub wait_target: String,
    pub wait_timeout: Duration,
    pub shutdown_policy: ShutdownPolicy,
}

impl ScenarioPlan {
    pub fn new(name: &str, descriptors: Vec<ProcessDescriptor>, wait_target: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptors,
            wait_target: wait_target.to_string(),
            wait_timeout: Duration::from_secs(launch_config_and_utils::DEFAULT_WAIT_TIMEOUT_SECS),
            shutdown_policy: ShutdownPolicy::default(),
        }
    }

    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown_policy = policy;
        self
    }

    /// Reject plans whose wait target is not one of the descriptors.
    pub fn validate(&self) -> ScenarioResult<()> {
        if !self.descriptors.iter().any(|d| d.name == self.wait_target) {
            return Err(ScenarioError::Supervisor(
                launch_supervisor::SupervisorError::Configuration(format!(
                    "scenario '{}' waits for '{}', which it does not launch",
                    self.name, self.wait_target
                )),
            ));
        }
        Ok(())
    }
}

/// A named scenario: its launch arguments and how to turn them into a plan.
pub struct ScenarioDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: fn() -> Vec<DeclaredArgument>,
    pub plan: fn(&ScenarioContext<'_>) -> ScenarioResult<ScenarioPlan>,
}

impl ScenarioDefinition {
    /// Resolve launch arguments and build the plan, with timeout and grace
    /// periods taken from `config`.
    pub fn prepare(
        &self,
        config: &LaunchConfig,
        environment: Arc<ProcessEnvironment>,
        arguments: &LaunchArguments,
    ) -> ScenarioResult<ScenarioPlan> {
        let declared = (self.arguments)();
        let resolved = arguments.resolve(&declared)?;
        debug!(scenario = self.name, arguments = ?resolved, "Resolved launch arguments");

        let context = ScenarioContext {
            config,
            environment,
            arguments: resolved,
        };
        let plan = (self.plan)(&context)?
            .wait_timeout(config.wait_timeout())
            .shutdown_policy(ShutdownPolicy {
                sigint_grace: config.sigint_grace(),
                sigterm_grace: config.sigterm_grace(),
            });
        plan.validate()?;
        Ok(plan)
    }
}

static SCENARIOS: [ScenarioDefinition; 1] = [rclcpp_zenoh::SCENARIO];

/// Every scenario the harness can run, in registration order.
pub fn registered_scenarios() -> &'static [ScenarioDefinition] {
    &SCENARIOS
}

pub fn find_scenario(name: &str) -> ScenarioResult<&'static ScenarioDefinition> {
    SCENARIOS
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| ScenarioError::UnknownScenario(name.to_string()))
}

/// The scenario run when none is named.
pub fn default_scenario() -> &'static ScenarioDefinition {
    &SCENARIOS[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_names_are_unique() {
        let names: Vec<&str> = registered_scenarios().iter().map(|s| s.name).collect();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
    }

    #[test]
    fn find_known_and_unknown() {
        assert_eq!(
            find_scenario(rclcpp_zenoh::SCENARIO_NAME).unwrap().name,
            rclcpp_zenoh::SCENARIO_NAME
        );
        assert!(matches!(
            find_scenario("nope"),
            Err(ScenarioError::UnknownScenario(_))
        ));
    }

    #[test]
    fn plan_must_launch_its_wait_target() {
        let plan = ScenarioPlan::new("empty", Vec::new(), "missing");
        assert!(plan.validate().is_err());
    }

    #[test]
    fn prepare_applies_config_timing() {
        let config = LaunchConfig {
            wait_timeout_secs: 12,
            sigint_grace_secs: 1,
            sigterm_grace_secs: 2,
            ..LaunchConfig::default()
        };
        let mut args = LaunchArguments::new();
        args.set(rclcpp_zenoh::WORKSPACE_DIRECTORY_ARG, "/ws");

        let plan = default_scenario()
            .prepare(&config, Arc::new(ProcessEnvironment::default()), &args)
            .unwrap();
        assert_eq!(plan.wait_timeout, Duration::from_secs(12));
        assert_eq!(plan.shutdown_policy.sigint_grace, Duration::from_secs(1));
        assert_eq!(plan.shutdown_policy.sigterm_grace, Duration::from_secs(2));
    }
}
