//! Random resource names.
//!
//! Names look like `cats-app-front-3f9c0a17d2e4b6c8`: prefix, resource kind and 16
//! random hex characters. They are lowercase so they are valid both as app names
//! and as DNS labels.

use serde::Serialize;
use uuid::Uuid;

use sdcheck_core::types::AppName;

/// `<prefix>-<resource>-<16 hex>`.
pub fn random_name(prefix: &str, resource: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{resource}-{}", &id[..16]).to_ascii_lowercase()
}

/// Names of everything one scenario run creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioNames {
    /// Hostname of the backend's internal route
    pub internal_host: String,
    pub frontend: AppName,
    pub backend: AppName,
}

impl ScenarioNames {
    pub fn generate(prefix: &str) -> Self {
        Self {
            internal_host: random_name(prefix, "host"),
            frontend: AppName::new(random_name(prefix, "app-front")),
            backend: AppName::new(random_name(prefix, "app-back")),
        }
    }
}
