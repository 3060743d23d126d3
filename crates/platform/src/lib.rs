#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Platform error type (`PlatformError`)
//! - [`command`]: Process execution with timeouts and secret redaction (`CommandSpec`, `run`)
//! - [`cf`]: Platform operations (`PlatformClient` trait, `CfCli`)
//! - [`session`]: Per-user `CF_HOME` sessions (`CliSession`)
//! - [`http`]: Response body probing (`HttpProbe` trait, `ReqwestProbe`)
//! - [`poll`]: Eventually-consistent checks (`eventually`, `BodyExpectation`)
//! - `mock`: In-memory platform (feature `test-util`)
//!
//! # Architecture
//!
//! ```text
//! CliSession --owns--> CF_HOME (tempdir)
//!      |
//!   CfCli: PlatformClient --tokio::process--> cf
//!
//! poll::eventually --> HttpProbe.get_body() --reqwest--> app route
//! ```

pub mod cf;
pub mod command;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod poll;
pub mod session;

// --- Public API Re-exports ---

// Error
pub use error::PlatformError;

// Commands
pub use command::{CommandOutput, CommandSpec};

// Platform operations
pub use cf::{CfCli, CommandTimeouts, DomainOutcome, PlatformClient, PushRequest};

// Sessions
pub use session::CliSession;

// HTTP
pub use http::{HttpProbe, ReqwestProbe};

// Polling
pub use poll::{BodyExpectation, PollOutcome, PollSettings, PollTimeout, eventually};

// Test support
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockOp, MockPlatform, MockPlatformClient, MockProbe};
