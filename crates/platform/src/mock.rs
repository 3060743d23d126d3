//! In-memory platform for tests.
//!
//! [`MockPlatform`] keeps domains, apps, internal routes and network policies in a
//! shared `Mutex`. It hands out one [`MockPlatformClient`] per logged-in user and a
//! [`MockProbe`] that answers proxy URLs the way the real proxy app does: the
//! backend's `Hello, world!` comes back only when a tcp policy lets the frontend
//! reach the backend port.
//!
//! ```ignore
//! let platform = MockPlatform::new("apps.example.com")
//!     .with_failure(MockOp::Push, "app-front", "staging failed");
//! let user = platform.client("user");
//! let probe = platform.probe();
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use sdcheck_core::types::{AppName, InternalRoute, NetworkPolicy, Protocol, UserContext};

use crate::cf::{DomainOutcome, PlatformClient, PushRequest};
use crate::error::PlatformError;
use crate::http::HttpProbe;

const HELLO: &str = "Hello, world!";

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    Login,
    Target,
    CreateDomain,
    Push,
    MapRoute,
    Delete,
    AddPolicy,
    ListPolicies,
    Probe,
}

impl MockOp {
    fn verb(self) -> &'static str {
        match self {
            Self::Login => "auth",
            Self::Target => "target",
            Self::CreateDomain => "curl",
            Self::Push => "push",
            Self::MapRoute => "map-route",
            Self::Delete => "delete",
            Self::AddPolicy => "add-network-policy",
            Self::ListPolicies => "network-policies",
            Self::Probe => "GET",
        }
    }
}

#[derive(Debug, Clone)]
struct Failure {
    op: MockOp,
    /// Matches when the call subject contains this; empty matches every call
    subject: String,
    message: String,
}

#[derive(Debug, Default)]
struct State {
    apps_domain: String,
    domains: BTreeMap<String, bool>,
    apps: BTreeMap<String, PushRequest>,
    routes: Vec<(InternalRoute, AppName)>,
    policies: Vec<NetworkPolicy>,
    unlisted: Vec<NetworkPolicy>,
    failures: Vec<Failure>,
    calls: Vec<String>,
    open_network: bool,
    stale_listing: bool,
    enforcement_lag: u32,
    pending_lag: u32,
}

impl State {
    fn record(&mut self, user: &str, op: MockOp, subject: &str) -> Result<(), PlatformError> {
        self.calls
            .push(format!("{user} {} {subject}", op.verb()).trim_end().to_owned());
        match self
            .failures
            .iter()
            .find(|f| f.op == op && subject.contains(f.subject.as_str()))
        {
            Some(failure) if op == MockOp::Probe => Err(PlatformError::Http {
                url: subject.to_owned(),
                reason: failure.message.clone(),
            }),
            Some(failure) => Err(PlatformError::NonZeroExit {
                command: format!("cf {} {subject}", op.verb()).trim_end().to_owned(),
                code: Some(1),
                stderr: failure.message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn backend_for(&self, fqdn: &str) -> Option<&AppName> {
        self.routes
            .iter()
            .find(|(route, _)| route.fqdn() == fqdn)
            .map(|(_, app)| app)
    }

    fn proxy(&mut self, url: &str) -> String {
        let without_scheme = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url);
        let (host, path) = without_scheme.split_once('/').unwrap_or((without_scheme, ""));

        let suffix = format!(".{}", self.apps_domain);
        let Some(frontend) = host
            .strip_suffix(suffix.as_str())
            .filter(|name| self.apps.contains_key(*name))
        else {
            return format!("404 Not Found: Requested route ('{host}') does not exist.");
        };
        let frontend = AppName::new(frontend);

        let Some((fqdn, port)) = path
            .strip_prefix("proxy/")
            .and_then(|target| target.rsplit_once(':'))
        else {
            return "404 page not found".to_owned();
        };
        let Ok(port) = port.parse::<u16>() else {
            return format!("invalid port: {port}");
        };
        let Some(backend) = self.backend_for(fqdn).cloned() else {
            return format!("dial tcp: lookup {fqdn}: no such host");
        };

        let permitted = self.open_network
            || self
                .policies
                .iter()
                .any(|p| p.allows(&frontend, &backend, Protocol::Tcp, port));
        if permitted && self.pending_lag == 0 {
            HELLO.to_owned()
        } else {
            if permitted {
                self.pending_lag -= 1;
            }
            format!("dial tcp {fqdn}:{port}: i/o timeout")
        }
    }

    fn policy_listing(&self, user: &str) -> String {
        let mut out = format!("Listing network policies as {user}...\n\n");
        let listed: Vec<_> = self
            .policies
            .iter()
            .filter(|p| !self.unlisted.contains(p))
            .collect();
        if listed.is_empty() {
            out.push_str("No policies found.\n");
            return out;
        }
        out.push_str("source\tdestination\tprotocol\tports\n");
        for p in listed {
            out.push_str(&format!(
                "{}\t{}\t{}\t{}\n",
                p.source, p.destination, p.protocol, p.ports
            ));
        }
        out
    }
}

/// Shared in-memory platform.
#[derive(Debug, Clone)]
pub struct MockPlatform {
    state: Arc<Mutex<State>>,
}

impl MockPlatform {
    /// Creates an empty platform whose public routes live under `apps_domain`.
    pub fn new(apps_domain: impl Into<String>) -> Self {
        let state = State {
            apps_domain: apps_domain.into(),
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Makes `op` fail with `message` for calls whose subject contains `subject`.
    pub fn with_failure(self, op: MockOp, subject: &str, message: &str) -> Self {
        self.lock().failures.push(Failure {
            op,
            subject: subject.to_owned(),
            message: message.to_owned(),
        });
        self
    }

    /// Lets every app reach every other app, as a platform without policy
    /// enforcement would.
    pub fn with_open_network(self) -> Self {
        self.lock().open_network = true;
        self
    }

    /// Installs a policy before the run starts. It shows up in listings even if
    /// its apps do not exist yet.
    pub fn with_policy(self, policy: NetworkPolicy) -> Self {
        self.lock().policies.push(policy);
        self
    }

    /// Enforces policies added from now on but leaves them out of
    /// `network-policies` output, like a listing that lags behind the policy server.
    pub fn with_stale_listing(self) -> Self {
        self.lock().stale_listing = true;
        self
    }

    /// Keeps traffic blocked for `probes` requests after each policy is added.
    pub fn with_enforcement_lag(self, probes: u32) -> Self {
        self.lock().enforcement_lag = probes;
        self
    }

    /// Registers a domain before the run starts.
    pub fn with_domain(self, domain: &str, internal: bool) -> Self {
        self.lock().domains.insert(domain.to_owned(), internal);
        self
    }

    /// A client acting as `user`.
    pub fn client(&self, user: &str) -> MockPlatformClient {
        MockPlatformClient {
            state: Arc::clone(&self.state),
            user: user.to_owned(),
        }
    }

    pub fn probe(&self) -> MockProbe {
        MockProbe {
            state: Arc::clone(&self.state),
        }
    }

    /// Names of the apps that currently exist.
    pub fn apps(&self) -> Vec<String> {
        self.lock().apps.keys().cloned().collect()
    }

    pub fn app(&self, name: &str) -> Option<PushRequest> {
        self.lock().apps.get(name).cloned()
    }

    pub fn domains(&self) -> Vec<(String, bool)> {
        self.lock()
            .domains
            .iter()
            .map(|(name, internal)| (name.clone(), *internal))
            .collect()
    }

    pub fn routes(&self) -> Vec<(InternalRoute, AppName)> {
        self.lock().routes.clone()
    }

    pub fn policies(&self) -> Vec<NetworkPolicy> {
        self.lock().policies.clone()
    }

    /// Every call made so far, as `<user> <verb> <subject>`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    // a panicking test thread must not hide the state from the assertions
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// [`PlatformClient`] view of a [`MockPlatform`] for one user.
#[derive(Debug, Clone)]
pub struct MockPlatformClient {
    state: Arc<Mutex<State>>,
    user: String,
}

impl MockPlatformClient {
    fn not_found(&self, op: MockOp, subject: &str, what: &str) -> PlatformError {
        PlatformError::NonZeroExit {
            command: format!("cf {} {subject}", op.verb()),
            code: Some(1),
            stderr: format!("FAILED\n{what} not found"),
        }
    }
}

impl PlatformClient for MockPlatformClient {
    async fn login(&self, ctx: &UserContext) -> Result<(), PlatformError> {
        lock(&self.state).record(&self.user, MockOp::Login, &ctx.username)
    }

    async fn target(&self, org: &str, space: &str) -> Result<(), PlatformError> {
        lock(&self.state).record(&self.user, MockOp::Target, &format!("{org}/{space}"))
    }

    async fn create_shared_domain(
        &self,
        domain: &str,
        internal: bool,
    ) -> Result<DomainOutcome, PlatformError> {
        let mut state = lock(&self.state);
        state.record(&self.user, MockOp::CreateDomain, domain)?;
        if state.domains.contains_key(domain) {
            return Ok(DomainOutcome::AlreadyExists);
        }
        state.domains.insert(domain.to_owned(), internal);
        Ok(DomainOutcome::Created)
    }

    async fn push_app(&self, request: &PushRequest) -> Result<(), PlatformError> {
        let mut state = lock(&self.state);
        state.record(&self.user, MockOp::Push, request.name.as_str())?;
        state
            .apps
            .insert(request.name.to_string(), request.clone());
        Ok(())
    }

    async fn map_route(&self, app: &AppName, route: &InternalRoute) -> Result<(), PlatformError> {
        let mut state = lock(&self.state);
        let subject = format!("{app} {}", route.fqdn());
        state.record(&self.user, MockOp::MapRoute, &subject)?;
        if !state.apps.contains_key(app.as_str()) {
            return Err(self.not_found(MockOp::MapRoute, &subject, &format!("App {app}")));
        }
        if !state.domains.contains_key(&route.domain) {
            return Err(self.not_found(
                MockOp::MapRoute,
                &subject,
                &format!("Domain {}", route.domain),
            ));
        }
        state.routes.push((route.clone(), app.clone()));
        Ok(())
    }

    async fn delete_app(&self, app: &AppName) -> Result<(), PlatformError> {
        let mut state = lock(&self.state);
        state.record(&self.user, MockOp::Delete, app.as_str())?;
        // `-r` removes routes; the policy server drops policies of deleted apps
        state.apps.remove(app.as_str());
        state.routes.retain(|(_, owner)| owner != app);
        state
            .policies
            .retain(|p| &p.source != app && &p.destination != app);
        state
            .unlisted
            .retain(|p| &p.source != app && &p.destination != app);
        Ok(())
    }

    async fn add_network_policy(&self, policy: &NetworkPolicy) -> Result<(), PlatformError> {
        let mut state = lock(&self.state);
        let subject = format!("{} {}", policy.source, policy.destination);
        state.record(&self.user, MockOp::AddPolicy, &subject)?;
        for app in [&policy.source, &policy.destination] {
            if !state.apps.contains_key(app.as_str()) {
                return Err(self.not_found(MockOp::AddPolicy, &subject, &format!("App {app}")));
            }
        }
        if !state.policies.contains(policy) {
            state.policies.push(policy.clone());
            if state.stale_listing {
                state.unlisted.push(policy.clone());
            }
        }
        state.pending_lag = state.enforcement_lag;
        Ok(())
    }

    async fn network_policies(&self) -> Result<String, PlatformError> {
        let mut state = lock(&self.state);
        state.record(&self.user, MockOp::ListPolicies, "")?;
        Ok(state.policy_listing(&self.user))
    }

    async fn app_report(&self, app: &AppName) -> String {
        let state = lock(&self.state);
        match state.apps.get(app.as_str()) {
            Some(push) => format!(
                "name: {app}\nrequested state: started\nbuildpack: {}\nmemory: {}\n",
                push.buildpack, push.memory
            ),
            None => format!("App {app} not found\n"),
        }
    }
}

/// [`HttpProbe`] that answers from the mock platform's state.
#[derive(Debug, Clone)]
pub struct MockProbe {
    state: Arc<Mutex<State>>,
}

impl HttpProbe for MockProbe {
    async fn get_body(&self, url: &str) -> Result<String, PlatformError> {
        let mut state = lock(&self.state);
        state.record("probe", MockOp::Probe, url)?;
        Ok(state.proxy(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const APPS_DOMAIN: &str = "apps.example.com";

    fn push(name: &str) -> PushRequest {
        PushRequest {
            name: AppName::new(name),
            buildpack: "ruby_buildpack".to_owned(),
            memory: "256M".to_owned(),
            path: "assets/hello-world".to_owned(),
            domain: APPS_DOMAIN.to_owned(),
            manifest: None,
        }
    }

    async fn deployed() -> (MockPlatform, MockPlatformClient) {
        let platform = MockPlatform::new(APPS_DOMAIN);
        let client = platform.client("admin");
        client.create_shared_domain("apps.internal", true).await.unwrap();
        client.push_app(&push("back")).await.unwrap();
        client
            .map_route(&AppName::new("back"), &InternalRoute::new("h", "apps.internal"))
            .await
            .unwrap();
        client.push_app(&push("front")).await.unwrap();
        (platform, client)
    }

    const PROXY_URL: &str = "https://front.apps.example.com/proxy/h.apps.internal:8080";

    #[tokio::test]
    async fn proxy_blocked_without_policy() {
        let (platform, _) = deployed().await;
        let body = platform.probe().get_body(PROXY_URL).await.unwrap();
        assert!(!body.contains(HELLO));
        assert!(body.contains("i/o timeout"));
    }

    #[tokio::test]
    async fn proxy_allowed_with_matching_policy() {
        let (platform, client) = deployed().await;
        let policy = NetworkPolicy::new(
            AppName::new("front"),
            AppName::new("back"),
            Protocol::Tcp,
            8080,
        );
        client.add_network_policy(&policy).await.unwrap();
        assert_eq!(platform.probe().get_body(PROXY_URL).await.unwrap(), HELLO);
    }

    #[tokio::test]
    async fn reverse_policy_does_not_allow() {
        let (platform, client) = deployed().await;
        let policy = NetworkPolicy::new(
            AppName::new("back"),
            AppName::new("front"),
            Protocol::Tcp,
            8080,
        );
        client.add_network_policy(&policy).await.unwrap();
        assert_ne!(platform.probe().get_body(PROXY_URL).await.unwrap(), HELLO);
    }

    #[tokio::test]
    async fn enforcement_lag_delays_access() {
        let (platform, client) = deployed().await;
        let platform = platform.with_enforcement_lag(2);
        let policy = NetworkPolicy::new(
            AppName::new("front"),
            AppName::new("back"),
            Protocol::Tcp,
            8080,
        );
        client.add_network_policy(&policy).await.unwrap();
        let probe = platform.probe();
        assert_ne!(probe.get_body(PROXY_URL).await.unwrap(), HELLO);
        assert_ne!(probe.get_body(PROXY_URL).await.unwrap(), HELLO);
        assert_eq!(probe.get_body(PROXY_URL).await.unwrap(), HELLO);
    }

    #[tokio::test]
    async fn unknown_frontend_is_404() {
        let (platform, _) = deployed().await;
        let body = platform
            .probe()
            .get_body("https://nope.apps.example.com/proxy/h.apps.internal:8080")
            .await
            .unwrap();
        assert!(body.starts_with("404"));
    }

    #[tokio::test]
    async fn domain_creation_is_idempotent() {
        let platform = MockPlatform::new(APPS_DOMAIN).with_domain("apps.internal", true);
        let client = platform.client("admin");
        assert_eq!(
            client.create_shared_domain("apps.internal", true).await.unwrap(),
            DomainOutcome::AlreadyExists
        );
    }

    #[tokio::test]
    async fn map_route_requires_domain() {
        let platform = MockPlatform::new(APPS_DOMAIN);
        let client = platform.client("admin");
        client.push_app(&push("back")).await.unwrap();
        let err = client
            .map_route(&AppName::new("back"), &InternalRoute::new("h", "apps.internal"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Domain apps.internal not found"));
    }

    #[tokio::test]
    async fn listing_parses_back_into_policies() {
        let (platform, client) = deployed().await;
        let policy = NetworkPolicy::new(
            AppName::new("front"),
            AppName::new("back"),
            Protocol::Tcp,
            8080,
        );
        let before = client.network_policies().await.unwrap();
        assert!(NetworkPolicy::parse_listing(&before).is_empty());

        client.add_network_policy(&policy).await.unwrap();
        let after = client.network_policies().await.unwrap();
        assert_eq!(NetworkPolicy::parse_listing(&after), vec![policy]);
        assert_eq!(platform.policies().len(), 1);
    }

    #[tokio::test]
    async fn preinstalled_policy_is_listed() {
        let policy = NetworkPolicy::new(
            AppName::new("other"),
            AppName::new("back"),
            Protocol::Tcp,
            9999,
        );
        let platform = MockPlatform::new(APPS_DOMAIN).with_policy(policy.clone());

        let listing = platform.client("admin").network_policies().await.unwrap();
        assert_eq!(NetworkPolicy::parse_listing(&listing), vec![policy]);
    }

    #[tokio::test]
    async fn stale_listing_hides_new_policies_but_enforces_them() {
        let (platform, client) = deployed().await;
        let platform = platform.with_stale_listing();
        let policy = NetworkPolicy::new(
            AppName::new("front"),
            AppName::new("back"),
            Protocol::Tcp,
            8080,
        );

        client.add_network_policy(&policy).await.unwrap();

        let listing = client.network_policies().await.unwrap();
        assert!(listing.contains("No policies found."));
        assert_eq!(platform.policies(), vec![policy]);
        assert_eq!(platform.probe().get_body(PROXY_URL).await.unwrap(), HELLO);
    }

    #[tokio::test]
    async fn delete_removes_app_routes_and_policies() {
        let (platform, client) = deployed().await;
        let policy = NetworkPolicy::new(
            AppName::new("front"),
            AppName::new("back"),
            Protocol::Tcp,
            8080,
        );
        client.add_network_policy(&policy).await.unwrap();
        client.delete_app(&AppName::new("back")).await.unwrap();

        assert_eq!(platform.apps(), vec!["front".to_owned()]);
        assert!(platform.routes().is_empty());
        assert!(platform.policies().is_empty());
        // deleting again is fine
        client.delete_app(&AppName::new("back")).await.unwrap();
    }

    #[tokio::test]
    async fn injected_failure_matches_subject() {
        let platform =
            MockPlatform::new(APPS_DOMAIN).with_failure(MockOp::Push, "front", "staging failed");
        let client = platform.client("user");
        client.push_app(&push("back")).await.unwrap();
        let err = client.push_app(&push("front")).await.unwrap_err();
        assert!(matches!(err, PlatformError::NonZeroExit { .. }));
        assert!(err.to_string().contains("staging failed"));
        assert_eq!(platform.apps(), vec!["back".to_owned()]);
    }

    #[tokio::test]
    async fn probe_failure_is_http_error() {
        let platform = MockPlatform::new(APPS_DOMAIN).with_failure(MockOp::Probe, "", "reset");
        let err = platform.probe().get_body(PROXY_URL).await.unwrap_err();
        assert!(matches!(err, PlatformError::Http { .. }));
    }

    #[tokio::test]
    async fn calls_are_logged_per_user() {
        let platform = MockPlatform::new(APPS_DOMAIN);
        platform.client("admin").target("o", "s").await.unwrap();
        platform.client("user").network_policies().await.unwrap();
        assert_eq!(
            platform.calls(),
            vec!["admin target o/s".to_owned(), "user network-policies".to_owned()]
        );
    }
}
