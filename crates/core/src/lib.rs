#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod types;

// --- Re-exports ---

// Errors
pub use error::{CommandError, ConfigError, ExpectationError, SdcheckError};

// Configuration
pub use config::SdcheckConfig;

// Domain types
pub use types::{AppName, InternalRoute, NetworkPolicy, PortRange, Protocol, UserContext};
