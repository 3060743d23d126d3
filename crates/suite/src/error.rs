//! Scenario errors

use sdcheck_core::error::{ExpectationError, SdcheckError};
use sdcheck_platform::PlatformError;

/// Why a scenario step failed.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// A platform operation failed
    #[error("{step}: {source}")]
    Platform {
        step: String,
        #[source]
        source: PlatformError,
    },

    /// A one-shot output check failed
    #[error("{step}: {detail}")]
    Unmet { step: String, detail: String },

    /// A polled check did not converge before its deadline
    #[error("{step}: not satisfied after {attempts} attempts in {elapsed_ms}ms: {detail}")]
    NotEventually {
        step: String,
        attempts: u32,
        elapsed_ms: u64,
        detail: String,
    },
}

impl ScenarioError {
    /// Wraps a platform error with the step it happened in.
    pub fn platform(step: &str) -> impl FnOnce(PlatformError) -> Self + '_ {
        move |source| Self::Platform {
            step: step.to_owned(),
            source,
        }
    }

    pub fn step(&self) -> &str {
        match self {
            Self::Platform { step, .. }
            | Self::Unmet { step, .. }
            | Self::NotEventually { step, .. } => step,
        }
    }
}

impl From<ScenarioError> for SdcheckError {
    fn from(err: ScenarioError) -> Self {
        match err {
            ScenarioError::Platform { source, .. } => source.into(),
            ScenarioError::Unmet { step, detail } => {
                SdcheckError::Expectation(ExpectationError::Unmet { step, detail })
            }
            ScenarioError::NotEventually {
                step,
                attempts,
                detail,
                ..
            } => SdcheckError::Expectation(ExpectationError::NotEventually {
                step,
                attempts,
                detail,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdcheck_core::error::CommandError;

    #[test]
    fn platform_error_keeps_step_and_source() {
        let err = ScenarioError::platform("push backend")(PlatformError::NonZeroExit {
            command: "cf push back".to_owned(),
            code: Some(1),
            stderr: "staging failed".to_owned(),
        });
        assert_eq!(err.step(), "push backend");
        let msg = err.to_string();
        assert!(msg.starts_with("push backend: "));
        assert!(msg.contains("staging failed"));
    }

    #[test]
    fn platform_error_converts_through_platform_mapping() {
        let err = ScenarioError::platform("login")(PlatformError::Spawn {
            program: "cf".to_owned(),
            reason: "not found".to_owned(),
        });
        let top: SdcheckError = err.into();
        assert!(matches!(
            top,
            SdcheckError::Command(CommandError::Unavailable(_))
        ));
    }

    #[test]
    fn not_eventually_converts_to_expectation() {
        let err = ScenarioError::NotEventually {
            step: "traffic allowed".to_owned(),
            attempts: 30,
            elapsed_ms: 30_000,
            detail: "body contains 'Hello, world!'".to_owned(),
        };
        assert!(err.to_string().contains("30 attempts in 30000ms"));
        let top: SdcheckError = err.into();
        assert!(matches!(
            top,
            SdcheckError::Expectation(ExpectationError::NotEventually { attempts: 30, .. })
        ));
    }
}
