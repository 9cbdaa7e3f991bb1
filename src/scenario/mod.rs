//! YAML scenarios
//!
//! Scenario files describe test cases as sequences of client steps. Loading
//! one yields [`TestCase`](crate::harness::TestCase)s ready for the
//! controller.

mod config;
mod resolve;
mod runner;

pub use config::*;
pub use resolve::{resolve_str, resolve_tree, resolve_value, Reference};
pub use runner::{load_scenario, load_scenarios, LoadedScenario, RunSettings, ScenarioCase};
