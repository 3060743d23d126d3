//! Error types, one enum per domain.

/// Top-level sdcheck error.
#[derive(Debug, thiserror::Error)]
pub enum SdcheckError {
    /// Configuration problem
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// External command problem
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// A scenario expectation was not met
    #[error("expectation failed: {0}")]
    Expectation(#[from] ExpectationError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file does not exist
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Config file could not be parsed
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A value is out of range or malformed
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors running the platform command-line client.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The client binary could not be started
    #[error("command unavailable: {0}")]
    Unavailable(String),

    /// The command ran but failed
    #[error("command '{command}' failed: {reason}")]
    Failed { command: String, reason: String },

    /// The command did not finish in time
    #[error("command '{command}' timed out after {timeout_secs}s")]
    TimedOut { command: String, timeout_secs: u64 },
}

/// Unmet scenario expectations.
#[derive(Debug, thiserror::Error)]
pub enum ExpectationError {
    /// A one-shot check failed
    #[error("{step}: {detail}")]
    Unmet { step: String, detail: String },

    /// A polled check never converged
    #[error("{step}: not satisfied after {attempts} attempts: {detail}")]
    NotEventually {
        step: String,
        attempts: u32,
        detail: String,
    },
}
