#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Step failures (`ScenarioError`)
//! - [`names`]: Random resource names (`ScenarioNames`)
//! - [`settings`]: Parameters derived from `SdcheckConfig` (`ScenarioSettings`)
//! - [`fixture`]: App deployment and cleanup (`Fixture`)
//! - [`scenario`]: The scenario itself (`ServiceDiscoveryScenario`)
//! - [`report`]: Step-by-step results (`ScenarioReport`)
//!
//! # Flow
//!
//! ```text
//! Fixture.setup() --admin--> internal domain
//!                 --user---> backend, route, frontend
//!        |
//! exercise(): probe (blocked) -> admin: target, list, add policy, list -> probe (allowed)
//!        |
//! Fixture.teardown() --> app reports (on failure), delete frontend + backend
//! ```

pub mod error;
pub mod fixture;
pub mod names;
pub mod report;
pub mod scenario;
pub mod settings;

// --- Public API Re-exports ---

pub use error::ScenarioError;
pub use fixture::Fixture;
pub use names::{ScenarioNames, random_name};
pub use report::{ScenarioReport, StepOutcome, StepRecord};
pub use scenario::{HELLO_WORLD, SCENARIO_NAME, ServiceDiscoveryScenario};
pub use settings::ScenarioSettings;
