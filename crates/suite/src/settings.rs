//! Scenario parameters, derived from [`SdcheckConfig`].

use sdcheck_core::config::SdcheckConfig;
use sdcheck_platform::PollSettings;

/// Everything the fixture and the scenario need from the configuration.
#[derive(Debug, Clone)]
pub struct ScenarioSettings {
    pub name_prefix: String,
    /// `http://` or `https://`
    pub protocol: String,
    pub apps_domain: String,
    pub internal_domain: String,
    pub backend_port: u16,
    pub ruby_buildpack: String,
    pub go_buildpack: String,
    pub memory_limit: String,
    pub hello_world_path: String,
    pub proxy_path: String,
    pub proxy_manifest: String,
    /// Org and space the admin targets before managing policies
    pub org: String,
    pub space: String,
    pub poll: PollSettings,
}

impl ScenarioSettings {
    pub fn from_config(config: &SdcheckConfig) -> Self {
        Self {
            name_prefix: config.apps.name_prefix.clone(),
            protocol: config.protocol().to_owned(),
            apps_domain: config.platform.apps_domain.clone(),
            internal_domain: config.apps.internal_domain.clone(),
            backend_port: config.apps.backend_port,
            ruby_buildpack: config.apps.ruby_buildpack.clone(),
            go_buildpack: config.apps.go_buildpack.clone(),
            memory_limit: config.apps.memory_limit.clone(),
            hello_world_path: config.apps.hello_world_path.clone(),
            proxy_path: config.apps.proxy_path.clone(),
            proxy_manifest: config.proxy_manifest_path(),
            org: config.user.org.clone(),
            space: config.user.space.clone(),
            poll: PollSettings {
                timeout: config.default_timeout(),
                interval: config.poll_interval(),
            },
        }
    }
}
