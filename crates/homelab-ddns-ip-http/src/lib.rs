// # HTTP IP Source
//
// This crate provides an HTTP-based IP source for the homelab DDNS updater.
//
// ## Architecture
//
// Fetches the current public IP from an external "what is my IP" service
// (e.g., api.ipify.org, icanhazip.com) that answers with a bare text body.
// One GET per call; polling cadence belongs to the reconciler.

use homelab_ddns_core::cancel::with_cancellation;
use homelab_ddns_core::config::{HttpConfig, IpSourceConfig};
use homelab_ddns_core::traits::IpSource;
use homelab_ddns_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// HTTP-based IP source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL to fetch IP from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch IP from (e.g., "https://api.ipify.org")
    /// - `timeout`: Per-request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Create from configuration sections
    pub fn from_config(config: &IpSourceConfig, http: &HttpConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.url.clone(), http.request_timeout())
    }

    /// Fetch current IP from HTTP service
    async fn fetch_ip(&self) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_source(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::status(
                "ip-http",
                status.as_u16(),
                format!("IP discovery request to {} failed", self.url),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ip_source(format!("Failed to read response: {}", e)))?;

        parse_ip_body(&body)
    }
}

/// Parse a bare-text IPv4 body, ignoring surrounding whitespace
///
/// Only IPv4 fits an `A` record; an IPv6 answer from a dual-stack service is
/// rejected like any other garbage.
pub fn parse_ip_body(body: &str) -> Result<IpAddr> {
    let text = body.trim();
    text.parse::<Ipv4Addr>()
        .map(IpAddr::V4)
        .map_err(|_| Error::ip_source(format!("Invalid IPv4 address in response: {:?}", text)))
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self, cancel: &CancellationToken) -> Result<IpAddr> {
        let ip = with_cancellation(cancel, self.fetch_ip()).await?;
        tracing::debug!("{} reported public IP {}", self.url, ip);
        Ok(ip)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
