//! Setup and teardown of the apps the scenario runs against.
//!
//! Setup runs in the regular user's session, except for the shared domain, which
//! only an admin may create:
//!
//! 1. create the internal shared domain as admin (an existing one is fine)
//! 2. push the backend (`hello-world`, ruby buildpack)
//! 3. map `<internal_host>.<internal_domain>` to the backend
//! 4. push the frontend (`proxy`, go buildpack, with its manifest)
//!
//! Setup stops at the first failure. Teardown always runs afterwards and tries to
//! delete both apps, even if only some of them were pushed.

use tracing::{info, warn};

use sdcheck_core::types::InternalRoute;
use sdcheck_platform::{PlatformClient, PushRequest};

use crate::error::ScenarioError;
use crate::names::ScenarioNames;
use crate::report::ScenarioReport;
use crate::settings::ScenarioSettings;

pub struct Fixture<'a, P, A> {
    client: &'a P,
    admin: &'a A,
    settings: &'a ScenarioSettings,
    names: &'a ScenarioNames,
}

impl<'a, P: PlatformClient, A: PlatformClient> Fixture<'a, P, A> {
    pub fn new(
        client: &'a P,
        admin: &'a A,
        settings: &'a ScenarioSettings,
        names: &'a ScenarioNames,
    ) -> Self {
        Self {
            client,
            admin,
            settings,
            names,
        }
    }

    pub fn internal_route(&self) -> InternalRoute {
        InternalRoute::new(
            self.names.internal_host.clone(),
            self.settings.internal_domain.clone(),
        )
    }

    pub fn backend_push(&self) -> PushRequest {
        PushRequest {
            name: self.names.backend.clone(),
            buildpack: self.settings.ruby_buildpack.clone(),
            memory: self.settings.memory_limit.clone(),
            path: self.settings.hello_world_path.clone(),
            domain: self.settings.apps_domain.clone(),
            manifest: None,
        }
    }

    pub fn frontend_push(&self) -> PushRequest {
        PushRequest {
            name: self.names.frontend.clone(),
            buildpack: self.settings.go_buildpack.clone(),
            memory: self.settings.memory_limit.clone(),
            path: self.settings.proxy_path.clone(),
            domain: self.settings.apps_domain.clone(),
            manifest: Some(self.settings.proxy_manifest.clone()),
        }
    }

    pub async fn setup(&self, report: &mut ScenarioReport) -> Result<(), ScenarioError> {
        let domain = self.settings.internal_domain.as_str();
        report
            .step("create internal domain", async {
                let outcome = self
                    .admin
                    .create_shared_domain(domain, true)
                    .await
                    .map_err(ScenarioError::platform("create internal domain"))?;
                info!(domain, ?outcome, "internal domain ready");
                Ok(())
            })
            .await?;

        let backend = self.backend_push();
        report
            .step("push backend", async {
                self.client
                    .push_app(&backend)
                    .await
                    .map_err(ScenarioError::platform("push backend"))
            })
            .await?;

        let route = self.internal_route();
        report
            .step("map internal route", async {
                self.client
                    .map_route(&self.names.backend, &route)
                    .await
                    .map_err(ScenarioError::platform("map internal route"))
            })
            .await?;

        let frontend = self.frontend_push();
        report
            .step("push frontend", async {
                self.client
                    .push_app(&frontend)
                    .await
                    .map_err(ScenarioError::platform("push frontend"))
            })
            .await
    }

    /// Deletes both apps. On failure, app reports are gathered first.
    ///
    /// Delete errors are recorded in the report rather than returned, so a failed
    /// frontend delete does not leave the backend behind.
    pub async fn teardown(&self, scenario_failed: bool, report: &mut ScenarioReport) {
        let apps = [&self.names.frontend, &self.names.backend];

        if scenario_failed {
            for app in apps {
                let text = self.client.app_report(app).await;
                info!(app = %app, report = %text, "app report");
                report.app_reports.insert(app.to_string(), text);
            }
        }

        for app in apps {
            match self.client.delete_app(app).await {
                Ok(()) => info!(app = %app, "app deleted"),
                Err(e) => {
                    warn!(app = %app, error = %e, "failed to delete app");
                    report.teardown_errors.push(format!("delete {app}: {e}"));
                }
            }
        }
    }
}
