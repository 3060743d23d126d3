//! The service-discovery scenario.
//!
//! With both apps deployed, the frontend proxy is asked to fetch the backend over
//! its internal route:
//!
//! ```text
//! GET <protocol><frontend>.<apps_domain>/proxy/<internal_host>.<internal_domain>:<port>
//! ```
//!
//! 1. eventually the body does NOT contain `Hello, world!` (no policy yet)
//! 2. as admin, in the user's org/space: the policy listing does not mention the
//!    backend, `add-network-policy frontend -> backend tcp/<port>` succeeds, and
//!    the listing now mentions the backend
//! 3. eventually the body contains `Hello, world!`
//!
//! The first failing step ends the scenario. Teardown runs regardless.

use tracing::{debug, error, info, warn};

use sdcheck_core::types::{NetworkPolicy, Protocol};
use sdcheck_platform::{BodyExpectation, HttpProbe, PlatformClient, eventually};

use crate::error::ScenarioError;
use crate::fixture::Fixture;
use crate::names::ScenarioNames;
use crate::report::ScenarioReport;
use crate::settings::ScenarioSettings;

/// Body the backend app serves.
pub const HELLO_WORLD: &str = "Hello, world!";

pub const SCENARIO_NAME: &str = "service discovery: adding an internal route and a policy";

/// Runs the scenario with a user session, an admin session and an HTTP probe.
pub struct ServiceDiscoveryScenario<U, A, H> {
    user: U,
    admin: A,
    probe: H,
    settings: ScenarioSettings,
}

impl<U, A, H> ServiceDiscoveryScenario<U, A, H>
where
    U: PlatformClient,
    A: PlatformClient,
    H: HttpProbe,
{
    pub fn new(user: U, admin: A, probe: H, settings: ScenarioSettings) -> Self {
        Self {
            user,
            admin,
            probe,
            settings,
        }
    }

    pub fn settings(&self) -> &ScenarioSettings {
        &self.settings
    }

    /// Proxy URL that makes the frontend call the backend's internal route.
    pub fn proxy_url(&self, names: &ScenarioNames) -> String {
        format!(
            "{}{}.{}/proxy/{}.{}:{}",
            self.settings.protocol,
            names.frontend,
            self.settings.apps_domain,
            names.internal_host,
            self.settings.internal_domain,
            self.settings.backend_port
        )
    }

    /// Runs with freshly generated names.
    pub async fn run(&self) -> ScenarioReport {
        let names = ScenarioNames::generate(&self.settings.name_prefix);
        self.run_with_names(names).await
    }

    /// Setup, scenario steps, teardown. Never panics; the outcome is in the report.
    pub async fn run_with_names(&self, names: ScenarioNames) -> ScenarioReport {
        info!(
            frontend = %names.frontend,
            backend = %names.backend,
            internal_host = %names.internal_host,
            "scenario starting"
        );
        let mut report = ScenarioReport::new(SCENARIO_NAME, names.clone());
        let fixture = Fixture::new(&self.user, &self.admin, &self.settings, &names);

        let outcome = match fixture.setup(&mut report).await {
            Ok(()) => self.exercise(&names, &mut report).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            error!(step = e.step(), error = %e, "scenario failed");
            report.error = Some(e.to_string());
        }

        fixture.teardown(outcome.is_err(), &mut report).await;

        report.passed = outcome.is_ok() && report.teardown_errors.is_empty();
        if report.passed {
            info!("scenario passed");
        } else if outcome.is_ok() {
            warn!(errors = report.teardown_errors.len(), "scenario passed but teardown failed");
        }
        report
    }

    async fn exercise(
        &self,
        names: &ScenarioNames,
        report: &mut ScenarioReport,
    ) -> Result<(), ScenarioError> {
        let url = self.proxy_url(names);
        let backend = names.backend.as_str();

        report
            .step(
                "traffic blocked before policy",
                self.expect_body(
                    "traffic blocked before policy",
                    &url,
                    BodyExpectation::NotContains(HELLO_WORLD.to_owned()),
                ),
            )
            .await?;

        let (org, space) = (self.settings.org.as_str(), self.settings.space.as_str());
        report
            .step("admin targets user space", async {
                self.admin
                    .target(org, space)
                    .await
                    .map_err(ScenarioError::platform("admin targets user space"))
            })
            .await?;

        report
            .step(
                "no policy listed for backend",
                self.expect_listing("no policy listed for backend", backend, false),
            )
            .await?;

        let policy = NetworkPolicy::new(
            names.frontend.clone(),
            names.backend.clone(),
            Protocol::Tcp,
            self.settings.backend_port,
        );
        report
            .step("add network policy", async {
                self.admin
                    .add_network_policy(&policy)
                    .await
                    .map_err(ScenarioError::platform("add network policy"))?;
                info!(%policy, "network policy added");
                Ok(())
            })
            .await?;

        report
            .step(
                "policy listed for backend",
                self.expect_listing("policy listed for backend", backend, true),
            )
            .await?;

        report
            .step(
                "traffic allowed after policy",
                self.expect_body(
                    "traffic allowed after policy",
                    &url,
                    BodyExpectation::Contains(HELLO_WORLD.to_owned()),
                ),
            )
            .await
    }

    /// Polls `url` until the body meets `expectation`. A failed request counts as
    /// an empty body.
    async fn expect_body(
        &self,
        step: &str,
        url: &str,
        expectation: BodyExpectation,
    ) -> Result<(), ScenarioError> {
        let probe = &self.probe;
        let fetch = move || async move {
            match probe.get_body(url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(url, error = %e, "probe request failed");
                    String::new()
                }
            }
        };

        match eventually(self.settings.poll, fetch, |body| expectation.is_met(body)).await {
            Ok(outcome) => {
                info!(step, attempts = outcome.attempts, "{expectation}");
                Ok(())
            }
            Err(timeout) => Err(ScenarioError::NotEventually {
                step: step.to_owned(),
                attempts: timeout.attempts,
                elapsed_ms: u64::try_from(timeout.elapsed.as_millis()).unwrap_or(u64::MAX),
                detail: format!("expected {expectation}, last body: {:?}", truncate(&timeout.last)),
            }),
        }
    }

    /// Checks whether the admin's policy listing mentions `backend`.
    async fn expect_listing(
        &self,
        step: &str,
        backend: &str,
        present: bool,
    ) -> Result<(), ScenarioError> {
        let listing = self
            .admin
            .network_policies()
            .await
            .map_err(ScenarioError::platform(step))?;
        debug!(
            step,
            policies = NetworkPolicy::parse_listing(&listing).len(),
            "fetched network policies"
        );
        if listing.contains(backend) == present {
            return Ok(());
        }
        let detail = if present {
            format!("network-policies output does not mention {backend}")
        } else {
            format!("network-policies output already mentions {backend}")
        };
        Err(ScenarioError::Unmet {
            step: step.to_owned(),
            detail: format!("{detail}:\n{listing}"),
        })
    }
}

fn truncate(body: &str) -> &str {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdcheck_core::config::SdcheckConfig;
    use sdcheck_core::types::AppName;
    use sdcheck_platform::MockPlatform;

    fn settings(use_http: bool) -> ScenarioSettings {
        let mut config = SdcheckConfig::default();
        config.platform.apps_domain = "apps.example.com".to_owned();
        config.platform.use_http = use_http;
        ScenarioSettings::from_config(&config)
    }

    fn names() -> ScenarioNames {
        ScenarioNames {
            internal_host: "cats-host-1".to_owned(),
            frontend: AppName::new("cats-app-front-1"),
            backend: AppName::new("cats-app-back-1"),
        }
    }

    #[test]
    fn proxy_url_layout() {
        let platform = MockPlatform::new("apps.example.com");
        let scenario = ServiceDiscoveryScenario::new(
            platform.client("user"),
            platform.client("admin"),
            platform.probe(),
            settings(false),
        );
        assert_eq!(
            scenario.proxy_url(&names()),
            "https://cats-app-front-1.apps.example.com/proxy/cats-host-1.apps.internal:8080"
        );

        let scenario = ServiceDiscoveryScenario::new(
            platform.client("user"),
            platform.client("admin"),
            platform.probe(),
            settings(true),
        );
        assert!(scenario.proxy_url(&names()).starts_with("http://cats-app-front-1."));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "é".repeat(300);
        assert_eq!(truncate(&long).chars().count(), 200);
        assert_eq!(truncate("short"), "short");
    }
}
