//! Logged-in CLI sessions.
//!
//! The `cf` client keeps its token in `$CF_HOME/.cf/config.json`. Each
//! [`CliSession`] owns a private temporary `CF_HOME`, so the regular user and the
//! admin can be logged in at the same time without clobbering each other. The
//! directory is removed when the session is dropped.

use tempfile::TempDir;
use tracing::info;

use sdcheck_core::types::UserContext;

use crate::cf::{CfCli, CommandTimeouts, PlatformClient};
use crate::error::PlatformError;

/// A `cf` client logged in as one user.
#[derive(Debug)]
pub struct CliSession {
    client: CfCli,
    context: UserContext,
    // dropped last: removes CF_HOME
    _home: TempDir,
}

impl CliSession {
    /// Creates a fresh `CF_HOME` and logs in.
    pub async fn open(
        binary: &str,
        timeouts: CommandTimeouts,
        context: UserContext,
    ) -> Result<Self, PlatformError> {
        let home = tempfile::Builder::new()
            .prefix("sdcheck-cf-home-")
            .tempdir()
            .map_err(|e| PlatformError::Session(format!("failed to create CF_HOME: {e}")))?;

        let client = CfCli::new(binary, home.path(), timeouts);
        client.login(&context).await?;

        info!(
            user = %context.username,
            api = %context.api,
            cf_home = %home.path().display(),
            "cf session opened"
        );

        Ok(Self {
            client,
            context,
            _home: home,
        })
    }

    pub fn client(&self) -> &CfCli {
        &self.client
    }

    pub fn context(&self) -> &UserContext {
        &self.context
    }
}
