//! Cheap reachability probes for stored preview URLs.

use std::time::Duration;

use async_trait::async_trait;

/// Error type for probe requests.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// HEAD-request port. The probe carries its own short timeout and must
/// never inherit a caller's request timeout.
#[async_trait]
pub trait HttpProbe: Send + Sync {
    /// Issue a HEAD request (following redirects) and return the final
    /// status code.
    async fn head(&self, url: &str, timeout: Duration) -> Result<u16, ProbeError>;
}

/// reqwest-backed probe.
pub struct ReqwestProbe {
    client: reqwest::Client,
}

impl ReqwestProbe {
    pub fn new() -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpProbe for ReqwestProbe {
    async fn head(&self, url: &str, timeout: Duration) -> Result<u16, ProbeError> {
        let response = self.client.head(url).timeout(timeout).send().await?;
        Ok(response.status().as_u16())
    }
}
