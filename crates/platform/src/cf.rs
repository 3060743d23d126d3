//! Platform operations, abstracted for testability.
//!
//! The [`PlatformClient`] trait lists every operation the scenario performs against
//! the platform. [`CfCli`] implements it by shelling out to the `cf` command-line
//! client; tests use `MockPlatformClient` (feature `test-util`).
//!
//! ```text
//!  ┌──────────────┐
//!  │   Scenario   │
//!  └──────┬───────┘
//!         ▼
//!  ┌──────────────┐
//!  │PlatformClient│ (trait)
//!  └──────────────┘
//!     │        │
//!     ▼        ▼
//!  ┌─────┐  ┌──────┐
//!  │CfCli│  │ Mock │
//!  └──┬──┘  └──────┘
//!     ▼
//!  cf CLI (CF_HOME per session)
//! ```
//!
//! Every `CfCli` command runs with `CF_HOME` set to the session directory, so two
//! clients logged in as different users never share a token.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use sdcheck_core::types::{AppName, InternalRoute, NetworkPolicy, UserContext};

use crate::command::{self, CommandOutput, CommandSpec};
use crate::error::PlatformError;

/// Error code the Cloud Controller returns when a domain already exists.
pub const DOMAIN_NAME_TAKEN: &str = "CF-DomainNameTaken";

/// Outcome of [`PlatformClient::create_shared_domain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainOutcome {
    Created,
    AlreadyExists,
}

/// Arguments for `cf push`.
#[derive(Debug, Clone)]
pub struct PushRequest {
    pub name: AppName,
    pub buildpack: String,
    pub memory: String,
    /// Directory holding the app bits
    pub path: String,
    /// Domain for the app's default route
    pub domain: String,
    pub manifest: Option<String>,
}

impl PushRequest {
    /// `cf push` arguments, without the program name.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "push".to_owned(),
            self.name.to_string(),
            "-b".to_owned(),
            self.buildpack.clone(),
            "-m".to_owned(),
            self.memory.clone(),
            "-p".to_owned(),
            self.path.clone(),
            "-d".to_owned(),
            self.domain.clone(),
        ];
        if let Some(manifest) = &self.manifest {
            args.push("-f".to_owned());
            args.push(manifest.clone());
        }
        args
    }
}

/// Timeouts applied to CLI commands.
#[derive(Debug, Clone, Copy)]
pub struct CommandTimeouts {
    /// Most commands
    pub default: Duration,
    /// Push, route mapping and policy creation
    pub push: Duration,
}

impl Default for CommandTimeouts {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(30),
            push: Duration::from_secs(120),
        }
    }
}

/// Operations performed against the platform.
///
/// All operations fail with [`PlatformError::NonZeroExit`] when the underlying
/// command exits non-zero, except [`app_report`](Self::app_report) which collects
/// whatever it can.
pub trait PlatformClient: Send + Sync + 'static {
    /// Points the session at the API, authenticates and targets org/space if set.
    fn login(&self, ctx: &UserContext) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Targets an org and space.
    fn target(
        &self,
        org: &str,
        space: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Creates a shared domain. An already existing domain is not an error.
    ///
    /// # Errors
    ///
    /// `PlatformError::UnexpectedOutput` if the response mentions neither the domain
    /// nor `CF-DomainNameTaken`.
    fn create_shared_domain(
        &self,
        domain: &str,
        internal: bool,
    ) -> impl Future<Output = Result<DomainOutcome, PlatformError>> + Send;

    /// Pushes an app and waits until it is started.
    fn push_app(
        &self,
        request: &PushRequest,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Binds `route` to `app`.
    fn map_route(
        &self,
        app: &AppName,
        route: &InternalRoute,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Deletes an app and its routes. Deleting a missing app succeeds.
    fn delete_app(&self, app: &AppName)
    -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Creates a network policy.
    fn add_network_policy(
        &self,
        policy: &NetworkPolicy,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Raw `cf network-policies` listing for the targeted space.
    fn network_policies(&self) -> impl Future<Output = Result<String, PlatformError>> + Send;

    /// App status and recent logs, for failure diagnostics.
    fn app_report(&self, app: &AppName) -> impl Future<Output = String> + Send;
}

/// [`PlatformClient`] backed by the `cf` binary.
#[derive(Debug, Clone)]
pub struct CfCli {
    binary: String,
    cf_home: PathBuf,
    timeouts: CommandTimeouts,
}

impl CfCli {
    /// Creates a client whose commands run with `CF_HOME=cf_home`.
    pub fn new(
        binary: impl Into<String>,
        cf_home: impl Into<PathBuf>,
        timeouts: CommandTimeouts,
    ) -> Self {
        Self {
            binary: binary.into(),
            cf_home: cf_home.into(),
            timeouts,
        }
    }

    pub fn cf_home(&self) -> &Path {
        &self.cf_home
    }

    fn spec<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(&self.binary)
            .args(args)
            .env("CF_HOME", self.cf_home.display().to_string())
            .env("CF_COLOR", "false")
    }

    async fn exec(
        &self,
        spec: CommandSpec,
        timeout: Duration,
    ) -> Result<CommandOutput, PlatformError> {
        info!(command = %spec.display(), "running cf command");
        command::run(&spec, timeout).await?.ensure_success(&spec)
    }
}

impl PlatformClient for CfCli {
    async fn login(&self, ctx: &UserContext) -> Result<(), PlatformError> {
        let mut api = self.spec(["api", ctx.api.as_str()]);
        if ctx.skip_ssl_validation {
            api = api.arg("--skip-ssl-validation");
        }
        self.exec(api, self.timeouts.default).await?;

        let auth = self
            .spec(["auth", ctx.username.as_str()])
            .secret_arg(ctx.password.as_str());
        self.exec(auth, self.timeouts.default).await?;

        if let (Some(org), Some(space)) = (&ctx.org, &ctx.space) {
            self.target(org, space).await?;
        }
        Ok(())
    }

    async fn target(&self, org: &str, space: &str) -> Result<(), PlatformError> {
        let spec = self.spec(["target", "-o", org, "-s", space]);
        self.exec(spec, self.timeouts.default).await?;
        Ok(())
    }

    async fn create_shared_domain(
        &self,
        domain: &str,
        internal: bool,
    ) -> Result<DomainOutcome, PlatformError> {
        let body = serde_json::json!({ "name": domain, "internal": internal }).to_string();
        let spec = self.spec(["curl", "/v2/shared_domains", "-X", "POST", "-d", body.as_str()]);
        let output = self.exec(spec.clone(), self.timeouts.default).await?;
        classify_domain_response(&output.stdout, domain).ok_or_else(|| {
            PlatformError::UnexpectedOutput {
                command: spec.display(),
                expected: format!("'{domain}' or '{DOMAIN_NAME_TAKEN}'"),
            }
        })
    }

    async fn push_app(&self, request: &PushRequest) -> Result<(), PlatformError> {
        let spec = self.spec(request.to_args());
        self.exec(spec, self.timeouts.push).await?;
        Ok(())
    }

    async fn map_route(&self, app: &AppName, route: &InternalRoute) -> Result<(), PlatformError> {
        let spec = self.spec([
            "map-route",
            app.as_str(),
            route.domain.as_str(),
            "--hostname",
            route.host.as_str(),
        ]);
        self.exec(spec, self.timeouts.push).await?;
        Ok(())
    }

    async fn delete_app(&self, app: &AppName) -> Result<(), PlatformError> {
        let spec = self.spec(["delete", app.as_str(), "-f", "-r"]);
        self.exec(spec, self.timeouts.default).await?;
        Ok(())
    }

    async fn add_network_policy(&self, policy: &NetworkPolicy) -> Result<(), PlatformError> {
        let protocol = policy.protocol.to_string();
        let ports = policy.ports.to_string();
        let spec = self.spec([
            "add-network-policy",
            policy.source.as_str(),
            "--destination-app",
            policy.destination.as_str(),
            "--protocol",
            protocol.as_str(),
            "--port",
            ports.as_str(),
        ]);
        self.exec(spec, self.timeouts.push).await?;
        Ok(())
    }

    async fn network_policies(&self) -> Result<String, PlatformError> {
        let spec = self.spec(["network-policies"]);
        Ok(self.exec(spec, self.timeouts.default).await?.stdout)
    }

    async fn app_report(&self, app: &AppName) -> String {
        let mut report = String::new();
        for args in [
            vec!["app", app.as_str(), "--guid"],
            vec!["logs", app.as_str(), "--recent"],
        ] {
            let spec = self.spec(args);
            report.push_str(&format!("$ {}\n", spec.display()));
            match command::run(&spec, self.timeouts.default).await {
                Ok(output) => {
                    report.push_str(&output.stdout);
                    report.push_str(&output.stderr);
                }
                Err(e) => {
                    warn!(app = %app, error = %e, "failed to collect app report");
                    report.push_str(&format!("<{e}>\n"));
                }
            }
        }
        report
    }
}

/// Reads a `cf curl /v2/shared_domains` response.
fn classify_domain_response(stdout: &str, domain: &str) -> Option<DomainOutcome> {
    if stdout.contains(DOMAIN_NAME_TAKEN) {
        Some(DomainOutcome::AlreadyExists)
    } else if stdout.contains(domain) {
        Some(DomainOutcome::Created)
    } else {
        None
    }
}
