//! Platform access errors
//!
//! [`PlatformError`] covers process execution, CLI exit status, output checks and
//! HTTP probing. `From<PlatformError> for SdcheckError` lets callers propagate with `?`.

use sdcheck_core::error::{CommandError, ExpectationError, SdcheckError};

/// Errors talking to the platform.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The CLI binary could not be spawned
    #[error("failed to start '{program}': {reason}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// OS error text
        reason: String,
    },

    /// The command did not exit within its timeout and was killed
    #[error("'{command}' timed out after {timeout_secs}s")]
    TimedOut {
        /// Redacted command line
        command: String,
        /// Timeout that elapsed
        timeout_secs: u64,
    },

    /// The command exited with a non-zero status
    #[error("'{command}' exited with {exit}: {stderr}", exit = exit_label(*.code))]
    NonZeroExit {
        /// Redacted command line
        command: String,
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        /// Trimmed stderr
        stderr: String,
    },

    /// The command succeeded but its output did not match
    #[error("'{command}' output did not contain {expected}")]
    UnexpectedOutput {
        /// Redacted command line
        command: String,
        /// Human readable description of what was expected
        expected: String,
    },

    /// CLI session setup failed
    #[error("session error: {0}")]
    Session(String),

    /// HTTP request failed before a response body was read
    #[error("http request to {url} failed: {reason}")]
    Http {
        /// Requested URL
        url: String,
        /// Transport error text
        reason: String,
    },
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "signal".to_owned(),
    }
}

impl From<PlatformError> for SdcheckError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Spawn { program, reason } => {
                SdcheckError::Command(CommandError::Unavailable(format!("{program}: {reason}")))
            }
            PlatformError::TimedOut {
                command,
                timeout_secs,
            } => SdcheckError::Command(CommandError::TimedOut {
                command,
                timeout_secs,
            }),
            PlatformError::NonZeroExit {
                command,
                code,
                stderr,
            } => SdcheckError::Command(CommandError::Failed {
                command,
                reason: format!("exited with {}: {stderr}", exit_label(code)),
            }),
            PlatformError::UnexpectedOutput { command, expected } => {
                SdcheckError::Expectation(ExpectationError::Unmet {
                    step: command,
                    detail: format!("output did not contain {expected}"),
                })
            }
            PlatformError::Session(reason) => SdcheckError::Command(CommandError::Failed {
                command: "session".to_owned(),
                reason,
            }),
            PlatformError::Http { url, reason } => SdcheckError::Command(CommandError::Failed {
                command: format!("GET {url}"),
                reason,
            }),
        }
    }
}
