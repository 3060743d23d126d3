//! HTTP probing of app routes.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::PlatformError;

/// Fetches a response body.
pub trait HttpProbe: Send + Sync + 'static {
    /// GETs `url` and returns the body.
    ///
    /// Only transport failures are errors. A non-2xx response still yields its body,
    /// since callers assert on content only.
    fn get_body(&self, url: &str) -> impl Future<Output = Result<String, PlatformError>> + Send;
}

/// [`HttpProbe`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestProbe {
    client: reqwest::Client,
}

impl ReqwestProbe {
    /// Builds a probe with a per-request timeout. With `accept_invalid_certs`, TLS
    /// certificate validation is skipped, matching `cf api --skip-ssl-validation`.
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| PlatformError::Http {
                url: String::new(),
                reason: format!("failed to build client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl HttpProbe for ReqwestProbe {
    async fn get_body(&self, url: &str) -> Result<String, PlatformError> {
        let http_err = |e: reqwest::Error| PlatformError::Http {
            url: url.to_owned(),
            reason: e.to_string(),
        };
        let response = self.client.get(url).send().await.map_err(http_err)?;
        let status = response.status();
        let body = response.text().await.map_err(http_err)?;
        debug!(url, status = status.as_u16(), bytes = body.len(), "probe response");
        Ok(body)
    }
}
