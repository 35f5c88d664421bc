//! Launch-test scenarios.
//!
//! A scenario is plain data: a name, the launch arguments it declares, and a
//! function that turns resolved arguments into a [`ScenarioPlan`]. Every plan
//! runs through [`run_scenario`], which launches, waits, shuts down and
//! validates exit codes.

mod error;
pub mod rclcpp_zenoh;
mod registry;
mod report;
mod runner;

pub use error::{FailureKind, ScenarioError, ScenarioResult};
pub use registry::{
    default_scenario, find_scenario, registered_scenarios, ScenarioContext, ScenarioDefinition,
    ScenarioPlan,
};
pub use report::{ScenarioReport, WaitOutcome};
pub use runner::run_scenario;
