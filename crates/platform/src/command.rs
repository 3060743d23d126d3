//! External command execution with timeouts.
//!
//! [`CommandSpec`] describes one invocation. Arguments can be marked secret so that
//! passwords never reach logs or error messages; [`CommandSpec::display`] renders
//! them as `[REDACTED]`.
//!
//! [`run`] spawns the process with stdin closed and both output streams captured.
//! The child is killed if the timeout elapses before it exits.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

use crate::error::PlatformError;

const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Clone)]
struct CommandArg {
    value: String,
    secret: bool,
}

/// A single command invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: String,
    args: Vec<CommandArg>,
    envs: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(CommandArg {
            value: value.into(),
            secret: false,
        });
        self
    }

    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self = self.arg(value);
        }
        self
    }

    /// Adds an argument that is masked in [`display`](Self::display).
    pub fn secret_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(CommandArg {
            value: value.into(),
            secret: true,
        });
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// First argument, i.e. the CLI subcommand.
    pub fn verb(&self) -> &str {
        self.args.first().map(|a| a.value.as_str()).unwrap_or("")
    }

    /// Command line safe for logs.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(if arg.secret { REDACTED } else { &arg.value });
        }
        line
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turns a non-zero exit into [`PlatformError::NonZeroExit`].
    pub fn ensure_success(self, spec: &CommandSpec) -> Result<Self, PlatformError> {
        if self.success() {
            return Ok(self);
        }
        let stderr = if self.stderr.trim().is_empty() {
            // cf prints most failures on stdout
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        Err(PlatformError::NonZeroExit {
            command: spec.display(),
            code: self.exit_code,
            stderr: stderr.to_owned(),
        })
    }
}

/// Runs `spec`, killing it if it outlives `timeout`.
pub async fn run(spec: &CommandSpec, timeout: Duration) -> Result<CommandOutput, PlatformError> {
    let mut command = Command::new(&spec.program);
    command.args(spec.args.iter().map(|a| a.value.as_str()));
    command.envs(spec.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command.kill_on_drop(true);

    let started = Instant::now();
    let child = command.spawn().map_err(|e| PlatformError::Spawn {
        program: spec.program.clone(),
        reason: e.to_string(),
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(PlatformError::Spawn {
                program: spec.program.clone(),
                reason: format!("wait failed: {e}"),
            });
        }
        Err(_elapsed) => {
            return Err(PlatformError::TimedOut {
                command: spec.display(),
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    let result = CommandOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        elapsed: started.elapsed(),
    };

    debug!(
        command = %spec.display(),
        exit_code = ?result.exit_code,
        elapsed_ms = u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX),
        "command finished"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_redacts_secret_args() {
        let spec = CommandSpec::new("cf")
            .arg("auth")
            .arg("admin")
            .secret_arg("hunter2");
        assert_eq!(spec.display(), "cf auth admin [REDACTED]");
        assert_eq!(spec.verb(), "auth");
    }

    #[test]
    fn verb_of_bare_program_is_empty() {
        assert_eq!(CommandSpec::new("cf").verb(), "");
    }

    #[test]
    fn ensure_success_passes_zero_exit() {
        let spec = CommandSpec::new("cf").arg("target");
        let out = CommandOutput {
            exit_code: Some(0),
            stdout: "ok".to_owned(),
            stderr: String::new(),
            elapsed: Duration::ZERO,
        };
        assert_eq!(out.ensure_success(&spec).unwrap().stdout, "ok");
    }

    #[test]
    fn ensure_success_falls_back_to_stdout() {
        let spec = CommandSpec::new("cf").arg("push").arg("app");
        let out = CommandOutput {
            exit_code: Some(1),
            stdout: "FAILED\nApp staging failed\n".to_owned(),
            stderr: "  ".to_owned(),
            elapsed: Duration::ZERO,
        };
        match out.ensure_success(&spec).unwrap_err() {
            PlatformError::NonZeroExit {
                command,
                code,
                stderr,
            } => {
                assert_eq!(command, "cf push app");
                assert_eq!(code, Some(1));
                assert!(stderr.contains("App staging failed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_captures_stdout_and_exit_code() {
        let spec = CommandSpec::new("sh").arg("-c").arg("echo hello; exit 3");
        let out = run(&spec, Duration::from_secs(10)).await.unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout.trim(), "hello");
        assert!(!out.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_passes_env() {
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("printf %s \"$SDCHECK_TEST_VALUE\"")
            .env("SDCHECK_TEST_VALUE", "from-env");
        let out = run(&spec, Duration::from_secs(10)).await.unwrap();
        assert_eq!(out.stdout, "from-env");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_times_out() {
        let spec = CommandSpec::new("sleep").arg("5");
        let err = run(&spec, Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, PlatformError::TimedOut { .. }));
    }

    #[tokio::test]
    async fn run_missing_binary_is_spawn_error() {
        let spec = CommandSpec::new("/nonexistent/sdcheck-no-such-binary");
        let err = run(&spec, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, PlatformError::Spawn { .. }));
    }
}
