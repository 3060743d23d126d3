//! CLI-specific error types and exit code mapping

use sdcheck_core::error::{CommandError, SdcheckError};
use sdcheck_platform::PlatformError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The scenario ran and did not pass.
    #[error("scenario failed: {0}")]
    ScenarioFailed(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from sdcheck-core.
    #[error("{0}")]
    Core(#[from] SdcheckError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General / command error          |
    /// | 2    | Configuration error              |
    /// | 3    | cf CLI unavailable               |
    /// | 4    | Scenario failed                  |
    /// | 10   | IO error                         |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::ScenarioFailed(_) => 4,
            Self::Io(_) => 10,
            Self::Core(core) => match core {
                SdcheckError::Config(_) => 2,
                SdcheckError::Command(CommandError::Unavailable(_)) => 3,
                SdcheckError::Expectation(_) => 4,
                SdcheckError::Io(_) => 10,
                SdcheckError::Command(_) => 1,
            },
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<PlatformError> for CliError {
    fn from(e: PlatformError) -> Self {
        Self::Core(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdcheck_core::error::{ConfigError, ExpectationError};

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_scenario_failed() {
        let err = CliError::ScenarioFailed("traffic allowed after policy".to_owned());
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        assert_eq!(CliError::Io(io_err).exit_code(), 10);
    }

    #[test]
    fn test_exit_code_command_error() {
        assert_eq!(CliError::Command("boom".to_owned()).exit_code(), 1);
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err: CliError = SdcheckError::Config(ConfigError::FileNotFound {
            path: "sdcheck.toml".to_owned(),
        })
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_cf_unavailable() {
        let err: CliError = PlatformError::Spawn {
            program: "cf".to_owned(),
            reason: "No such file or directory".to_owned(),
        }
        .into();
        assert_eq!(err.exit_code(), 3, "missing cf binary should return exit code 3");
    }

    #[test]
    fn test_exit_code_cf_command_failed() {
        let err: CliError = PlatformError::NonZeroExit {
            command: "cf auth admin [REDACTED]".to_owned(),
            code: Some(1),
            stderr: "Credentials were rejected".to_owned(),
        }
        .into();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("Credentials were rejected"));
    }

    #[test]
    fn test_exit_code_core_expectation() {
        let err: CliError = SdcheckError::Expectation(ExpectationError::Unmet {
            step: "s".to_owned(),
            detail: "d".to_owned(),
        })
        .into();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = format!("{}", err);
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }

    #[test]
    fn test_exit_code_json_serialize_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid json")
            .expect_err("should fail parsing");
        assert_eq!(CliError::JsonSerialize(json_err).exit_code(), 1);
    }
}
