//! HTTP reachability probe.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use reqwest::redirect::Policy;

use readiness_core::{ReachabilityProbe, ReadinessError};

use crate::error::HostError;

/// Sends one uncached `HEAD` request per probe.
///
/// Any HTTP response, whatever its status, proves the endpoint is reachable;
/// only transport failures count as a failed probe. Redirects are not
/// followed so a probe measures exactly one round trip.
pub struct HttpReachabilityProbe {
    client: reqwest::Client,
}

impl HttpReachabilityProbe {
    /// `timeout` is a transport-level backstop; the prober applies its own
    /// per-probe bound on top.
    pub fn new(timeout: Duration) -> Result<Self, HostError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ReachabilityProbe for HttpReachabilityProbe {
    async fn probe(&self, endpoint: &str) -> Result<(), ReadinessError> {
        let response = self
            .client
            .head(cache_busted(endpoint, chrono::Utc::now().timestamp_millis()))
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(HostError::from)?;
        log::trace!("{} answered {}", endpoint, response.status());
        Ok(())
    }
}

/// Append a unique query parameter so no intermediate cache can answer.
fn cache_busted(endpoint: &str, stamp: i64) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{}{}_={}", endpoint, separator, stamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_buster_appends_query() {
        assert_eq!(
            cache_busted("https://example.test/favicon.ico", 42),
            "https://example.test/favicon.ico?_=42"
        );
        assert_eq!(
            cache_busted("https://example.test/ping?v=1", 42),
            "https://example.test/ping?v=1&_=42"
        );
    }
}
