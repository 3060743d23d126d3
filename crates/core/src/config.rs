//! Configuration: `sdcheck.toml` parsing and runtime settings.
//!
//! [`SdcheckConfig`] holds every section the harness reads.
//!
//! # Load order
//! 1. CLI flags (highest, applied by the binary)
//! 2. Environment variables (`SDCHECK_PLATFORM_API=https://api.example.com`)
//! 3. Config file (`sdcheck.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), sdcheck_core::error::SdcheckError> {
//! use sdcheck_core::config::SdcheckConfig;
//!
//! // File + env overrides
//! let config = SdcheckConfig::load("sdcheck.toml").await?;
//!
//! // Straight from a TOML string
//! let config = SdcheckConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, SdcheckError};
use crate::types::UserContext;

const MAX_DEFAULT_TIMEOUT_SECS: u64 = 3600;
const MAX_CF_PUSH_TIMEOUT_SECS: u64 = 7200;
const MIN_POLL_INTERVAL_MS: u64 = 10;
const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// sdcheck configuration root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SdcheckConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub apps: AppsConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

impl SdcheckConfig {
    /// Loads a TOML file, applies environment overrides and validates.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SdcheckError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file without environment overrides.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SdcheckError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SdcheckError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                SdcheckError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, SdcheckError> {
        toml::from_str(toml_str).map_err(|e| {
            SdcheckError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Overrides values from `SDCHECK_{SECTION}_{FIELD}` environment variables.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SDCHECK_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SDCHECK_GENERAL_LOG_FORMAT");

        // Platform
        override_string(&mut self.platform.cf_binary, "SDCHECK_PLATFORM_CF_BINARY");
        override_string(&mut self.platform.api, "SDCHECK_PLATFORM_API");
        override_string(&mut self.platform.apps_domain, "SDCHECK_PLATFORM_APPS_DOMAIN");
        override_bool(
            &mut self.platform.skip_ssl_validation,
            "SDCHECK_PLATFORM_SKIP_SSL_VALIDATION",
        );
        override_bool(&mut self.platform.use_http, "SDCHECK_PLATFORM_USE_HTTP");
        override_string(&mut self.platform.admin_user, "SDCHECK_PLATFORM_ADMIN_USER");
        override_string(
            &mut self.platform.admin_password,
            "SDCHECK_PLATFORM_ADMIN_PASSWORD",
        );

        // User
        override_string(&mut self.user.username, "SDCHECK_USER_USERNAME");
        override_string(&mut self.user.password, "SDCHECK_USER_PASSWORD");
        override_string(&mut self.user.org, "SDCHECK_USER_ORG");
        override_string(&mut self.user.space, "SDCHECK_USER_SPACE");

        // Apps
        override_string(&mut self.apps.name_prefix, "SDCHECK_APPS_NAME_PREFIX");
        override_string(&mut self.apps.internal_domain, "SDCHECK_APPS_INTERNAL_DOMAIN");
        override_u16(&mut self.apps.backend_port, "SDCHECK_APPS_BACKEND_PORT");
        override_string(&mut self.apps.ruby_buildpack, "SDCHECK_APPS_RUBY_BUILDPACK");
        override_string(&mut self.apps.go_buildpack, "SDCHECK_APPS_GO_BUILDPACK");
        override_string(&mut self.apps.memory_limit, "SDCHECK_APPS_MEMORY_LIMIT");
        override_string(&mut self.apps.hello_world_path, "SDCHECK_APPS_HELLO_WORLD_PATH");
        override_string(&mut self.apps.proxy_path, "SDCHECK_APPS_PROXY_PATH");
        override_string(&mut self.apps.proxy_manifest, "SDCHECK_APPS_PROXY_MANIFEST");

        // Timeouts
        override_u64(&mut self.timeouts.default_secs, "SDCHECK_TIMEOUTS_DEFAULT_SECS");
        override_u64(&mut self.timeouts.cf_push_secs, "SDCHECK_TIMEOUTS_CF_PUSH_SECS");
        override_u64(
            &mut self.timeouts.poll_interval_ms,
            "SDCHECK_TIMEOUTS_POLL_INTERVAL_MS",
        );
    }

    /// Validates value formats and ranges.
    ///
    /// Fields that are only needed to actually run against a platform may be empty
    /// here; see [`validate_for_run`](Self::validate_for_run).
    pub fn validate(&self) -> Result<(), SdcheckError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.platform.cf_binary.trim().is_empty() {
            return Err(invalid("platform.cf_binary", "must not be empty"));
        }

        if !self.platform.api.is_empty() {
            match url::Url::parse(&self.platform.api) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                Ok(url) => {
                    return Err(invalid(
                        "platform.api",
                        format!("unsupported scheme '{}'", url.scheme()),
                    ));
                }
                Err(e) => return Err(invalid("platform.api", e.to_string())),
            }
        }

        if !is_dns_label_list(&self.apps.internal_domain) {
            return Err(invalid(
                "apps.internal_domain",
                "must be a dot-separated DNS name",
            ));
        }

        if self.apps.name_prefix.is_empty()
            || !self
                .apps
                .name_prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(invalid(
                "apps.name_prefix",
                "must be non-empty lowercase letters, digits or '-'",
            ));
        }

        if self.apps.backend_port == 0 {
            return Err(invalid("apps.backend_port", "must be 1-65535"));
        }

        if !is_memory_limit(&self.apps.memory_limit) {
            return Err(invalid(
                "apps.memory_limit",
                "must be a number followed by M, MB, G or GB",
            ));
        }

        if self.timeouts.default_secs == 0 || self.timeouts.default_secs > MAX_DEFAULT_TIMEOUT_SECS
        {
            return Err(invalid(
                "timeouts.default_secs",
                format!("must be 1-{MAX_DEFAULT_TIMEOUT_SECS}"),
            ));
        }

        if self.timeouts.cf_push_secs == 0 || self.timeouts.cf_push_secs > MAX_CF_PUSH_TIMEOUT_SECS
        {
            return Err(invalid(
                "timeouts.cf_push_secs",
                format!("must be 1-{MAX_CF_PUSH_TIMEOUT_SECS}"),
            ));
        }

        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.timeouts.poll_interval_ms)
        {
            return Err(invalid(
                "timeouts.poll_interval_ms",
                format!("must be {MIN_POLL_INTERVAL_MS}-{MAX_POLL_INTERVAL_MS}"),
            ));
        }

        if self.poll_interval() >= self.default_timeout() {
            return Err(invalid(
                "timeouts.poll_interval_ms",
                "must be shorter than timeouts.default_secs",
            ));
        }

        Ok(())
    }

    /// Validates that everything needed to drive a live platform is present.
    pub fn validate_for_run(&self) -> Result<(), SdcheckError> {
        self.validate()?;

        let required = [
            ("platform.api", &self.platform.api),
            ("platform.apps_domain", &self.platform.apps_domain),
            ("platform.admin_user", &self.platform.admin_user),
            ("platform.admin_password", &self.platform.admin_password),
            ("user.org", &self.user.org),
            ("user.space", &self.user.space),
            ("apps.hello_world_path", &self.apps.hello_world_path),
            ("apps.proxy_path", &self.apps.proxy_path),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(invalid(field, "required to run the scenario"));
            }
        }

        if !self.user.username.is_empty() && self.user.password.is_empty() {
            return Err(invalid(
                "user.password",
                "must be set when user.username is set",
            ));
        }

        Ok(())
    }

    /// Scheme prefix used for app routes.
    pub fn protocol(&self) -> &'static str {
        if self.platform.use_http {
            "http://"
        } else {
            "https://"
        }
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.default_secs)
    }

    pub fn cf_push_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.cf_push_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.timeouts.poll_interval_ms)
    }

    /// Manifest for the proxy app, defaulting to `<proxy_path>/manifest.yml`.
    pub fn proxy_manifest_path(&self) -> String {
        if self.apps.proxy_manifest.is_empty() {
            format!("{}/manifest.yml", self.apps.proxy_path.trim_end_matches('/'))
        } else {
            self.apps.proxy_manifest.clone()
        }
    }

    /// Session for the regular user. Falls back to the admin credentials when no
    /// dedicated user is configured.
    pub fn user_context(&self) -> UserContext {
        let (username, password) = if self.user.username.is_empty() {
            (
                self.platform.admin_user.clone(),
                self.platform.admin_password.clone(),
            )
        } else {
            (self.user.username.clone(), self.user.password.clone())
        };
        UserContext {
            api: self.platform.api.clone(),
            username,
            password,
            org: non_empty(&self.user.org),
            space: non_empty(&self.user.space),
            skip_ssl_validation: self.platform.skip_ssl_validation,
        }
    }

    /// Session for the admin user, targeted at the regular user's org and space.
    pub fn admin_context(&self) -> UserContext {
        UserContext {
            api: self.platform.api.clone(),
            username: self.platform.admin_user.clone(),
            password: self.platform.admin_password.clone(),
            org: non_empty(&self.user.org),
            space: non_empty(&self.user.space),
            skip_ssl_validation: self.platform.skip_ssl_validation,
        }
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// trace, debug, info, warn, error
    pub log_level: String,
    /// json, pretty
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// Platform endpoint and admin credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Path or name of the `cf` binary
    pub cf_binary: String,
    /// API endpoint, e.g. `https://api.example.com`
    pub api: String,
    /// Public domain apps are routed under
    pub apps_domain: String,
    pub skip_ssl_validation: bool,
    /// Request app routes over plain http
    pub use_http: bool,
    pub admin_user: String,
    pub admin_password: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            cf_binary: "cf".to_owned(),
            api: String::new(),
            apps_domain: String::new(),
            skip_ssl_validation: false,
            use_http: false,
            admin_user: "admin".to_owned(),
            admin_password: String::new(),
        }
    }
}

/// Regular (non-admin) user that owns the apps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub username: String,
    pub password: String,
    pub org: String,
    pub space: String,
}

/// Test application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppsConfig {
    /// Prefix for generated app and host names
    pub name_prefix: String,
    /// Shared internal domain for service discovery
    pub internal_domain: String,
    /// Port the backend listens on behind the internal route
    pub backend_port: u16,
    pub ruby_buildpack: String,
    pub go_buildpack: String,
    /// Memory per app instance, e.g. `256M`
    pub memory_limit: String,
    /// Directory of the hello-world backend asset
    pub hello_world_path: String,
    /// Directory of the proxy frontend asset
    pub proxy_path: String,
    /// Proxy manifest; empty means `<proxy_path>/manifest.yml`
    pub proxy_manifest: String,
}

impl Default for AppsConfig {
    fn default() -> Self {
        Self {
            name_prefix: "cats".to_owned(),
            internal_domain: "apps.internal".to_owned(),
            backend_port: 8080,
            ruby_buildpack: "ruby_buildpack".to_owned(),
            go_buildpack: "go_buildpack".to_owned(),
            memory_limit: "256M".to_owned(),
            hello_world_path: "assets/hello-world".to_owned(),
            proxy_path: "assets/proxy".to_owned(),
            proxy_manifest: String::new(),
        }
    }
}

/// Timeouts and polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Ordinary CLI commands and each eventually-assertion
    pub default_secs: u64,
    /// Push, route mapping and policy creation
    pub cf_push_secs: u64,
    /// Pause between eventually-assertion attempts
    pub poll_interval_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            default_secs: 30,
            cf_push_secs: 120,
            poll_interval_ms: 1000,
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> SdcheckError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

fn is_dns_label_list(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

fn is_memory_limit(value: &str) -> bool {
    let upper = value.to_ascii_uppercase();
    let digits = upper
        .strip_suffix("MB")
        .or_else(|| upper.strip_suffix("GB"))
        .or_else(|| upper.strip_suffix('M'))
        .or_else(|| upper.strip_suffix('G'));
    match digits {
        Some(d) => !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()) && d != "0",
        None => false,
    }
}

// --- env override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
