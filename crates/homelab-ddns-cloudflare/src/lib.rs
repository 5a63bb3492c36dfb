// # Cloudflare DNS Provider
//
// This crate provides the DNS provider used by the homelab DDNS updater: a
// client for the Cloudflare v4 style zone records API.
//
// ## Implementation Notes
//
// - One HTTP request per trait call (list, create or update)
// - Full error propagation to the reconciler (which decides what to do)
// - HTTP timeout configurable, 30 seconds by default
// - Specific error messages for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - Dry-run mode for safe testing
// - No retry, backoff or caching; every iteration re-lists the zone
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - An empty token sends no Authorization header (anonymous providers)
//
// ## API Reference
//
// - List DNS Records: GET `/zones/:zone_id/dns_records`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use homelab_ddns_core::cancel::with_cancellation;
use homelab_ddns_core::config::{HttpConfig, ProviderConfig};
use homelab_ddns_core::traits::{DnsProvider, DnsRecord};
use homelab_ddns_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider name used in errors and logs
const PROVIDER: &str = "cloudflare";

/// Envelope of the list endpoint; everything but `result` is ignored
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    result: Vec<DnsRecord>,
}

/// Cloudflare DNS provider
///
/// Stateless and single-shot. All coordination (when to list, whether to
/// create or update, when to try again) is owned by the `Reconciler`.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform the list request
/// - Log the intended POST/PUT payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// API base URL without trailing slash
    base_url: String,

    /// API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone holding the managed record
    zone_id: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, list but skip create/update
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("base_url", &self.base_url)
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new provider
    ///
    /// # Parameters
    ///
    /// - `base_url`: API base URL, e.g. [`CLOUDFLARE_API_BASE`]
    /// - `api_token`: Token with Zone:DNS:Edit permissions (may be empty)
    /// - `zone_id`: Zone holding the managed record
    /// - `timeout`: Per-request timeout
    /// - `dry_run`: If true, list records but skip writes
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        zone_id: impl Into<String>,
        timeout: Duration,
        dry_run: bool,
    ) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(Error::config("Provider base URL cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            zone_id: zone_id.into(),
            client,
            dry_run,
        })
    }

    /// Create a provider from configuration sections
    pub fn from_config(config: &ProviderConfig, http: &HttpConfig, dry_run: bool) -> Result<Self> {
        config.validate()?;

        if dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }

        Self::new(
            config.base_url.clone(),
            config.api_token.clone(),
            config.zone_id.clone(),
            http.request_timeout(),
            dry_run,
        )
    }

    /// Whether writes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// `{base}/zones/{zone}/dns_records`
    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    /// `{base}/zones/{zone}/dns_records/{id}`
    fn record_url(&self, record_id: &str) -> String {
        format!("{}/{}", self.records_url(), record_id)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");

        if self.api_token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.api_token)
        }
    }

    /// Send a request; non-success statuses become errors
    async fn send(&self, builder: reqwest::RequestBuilder, action: &str) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", action, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(status_error(status.as_u16(), action, &error_text))
    }

    async fn fetch_records(&self) -> Result<Vec<DnsRecord>> {
        let url = self.records_url();
        tracing::debug!("Listing records: GET {}", url);

        let response = self
            .send(self.request(reqwest::Method::GET, &url), "List records")
            .await?;

        // The body is best effort: a missing or broken envelope means "no records"
        let body = response.text().await.unwrap_or_default();
        Ok(parse_list_body(&body))
    }

    async fn post_record(&self, record: &DnsRecord) -> Result<()> {
        let url = self.records_url();

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                url,
                serde_json::to_string(record)?
            );
            return Ok(());
        }

        self.send(
            self.request(reqwest::Method::POST, &url).json(record),
            "Create record",
        )
        .await?;
        Ok(())
    }

    async fn put_record(&self, record_id: &str, record: &DnsRecord) -> Result<()> {
        let url = self.record_url(record_id);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(record)?
            );
            return Ok(());
        }

        self.send(
            self.request(reqwest::Method::PUT, &url).json(record),
            "Update record",
        )
        .await?;
        Ok(())
    }
}

/// Records from a list response body; anything unparseable yields none
pub fn parse_list_body(body: &str) -> Vec<DnsRecord> {
    serde_json::from_str::<ListResponse>(body)
        .map(|list| list.result)
        .unwrap_or_default()
}

/// Map a non-success HTTP status to a descriptive error carrying the status
pub fn status_error(status: u16, action: &str, error_text: &str) -> Error {
    let message = match status {
        401 | 403 => {
            "Authentication failed: Invalid API token or insufficient permissions".to_string()
        }
        404 => "Zone or record not found".to_string(),
        409 => "Conflict: Record is being updated by another process".to_string(),
        429 => "Rate limit exceeded. Please retry later".to_string(),
        500..=599 => format!("Cloudflare server error (transient) - {}", error_text),
        _ => format!("{} failed - {}", action, error_text),
    };

    Error::status(PROVIDER, status, message)
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list_records(&self, cancel: &CancellationToken) -> Result<Vec<DnsRecord>> {
        with_cancellation(cancel, self.fetch_records()).await
    }

    async fn create_record(&self, record: &DnsRecord, cancel: &CancellationToken) -> Result<()> {
        tracing::info!(
            "Creating DNS record: {} -> {} ({}) [mode: {}]",
            record.name,
            record.content,
            record.record_type,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        with_cancellation(cancel, self.post_record(record)).await
    }

    async fn update_record(
        &self,
        record_id: &str,
        record: &DnsRecord,
        cancel: &CancellationToken,
    ) -> Result<()> {
        tracing::info!(
            "Updating DNS record {}: {} -> {} ({}) [mode: {}]",
            record_id,
            record.name,
            record.content,
            record.record_type,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        with_cancellation(cancel, self.put_record(record_id, record)).await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base_url: &str) -> CloudflareProvider {
        CloudflareProvider::new(base_url, "test_token", "zone-1", DEFAULT_HTTP_TIMEOUT, false)
            .unwrap()
    }

    #[test]
    fn builds_zone_record_urls() {
        let provider = provider(CLOUDFLARE_API_BASE);
        assert_eq!(
            provider.records_url(),
            "https://api.cloudflare.com/client/v4/zones/zone-1/dns_records"
        );
        assert_eq!(
            provider.record_url("r1"),
            "https://api.cloudflare.com/client/v4/zones/zone-1/dns_records/r1"
        );
    }

    #[test]
    fn trailing_slash_in_base_url_is_ignored() {
        let provider = provider("https://dns.example.test/api/");
        assert_eq!(
            provider.records_url(),
            "https://dns.example.test/api/zones/zone-1/dns_records"
        );
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let result = CloudflareProvider::new("", "token", "zone", DEFAULT_HTTP_TIMEOUT, false);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn from_config_honours_dry_run() {
        let config = ProviderConfig::new(CLOUDFLARE_API_BASE, "token", "zone");
        let dry = CloudflareProvider::from_config(&config, &HttpConfig::default(), true).unwrap();
        let live = CloudflareProvider::from_config(&config, &HttpConfig::default(), false).unwrap();

        assert!(dry.is_dry_run(), "Dry-run provider should have dry_run=true");
        assert!(!live.is_dry_run(), "Live provider should have dry_run=false");
    }

    #[test]
    fn parses_list_envelope() {
        let body = r#"{
            "success": true,
            "errors": [],
            "result": [
                {"id": "r1", "name": "homelab.example.com", "content": "1.2.3.4",
                 "type": "A", "proxied": false, "ttl": 1, "comment": null,
                 "zone_id": "zone-1", "locked": false}
            ]
        }"#;

        let records = parse_list_body(body);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_deref(), Some("r1"));
        assert_eq!(records[0].ttl, Some(1));
    }

    #[test]
    fn unparseable_list_body_is_empty() {
        assert!(parse_list_body("").is_empty());
        assert!(parse_list_body("<html>bad gateway</html>").is_empty());
        assert!(parse_list_body(r#"{"success": false, "result": null}"#).is_empty());
        assert!(parse_list_body(r#"{"success": true}"#).is_empty());
    }

    #[test]
    fn status_errors_keep_the_code() {
        let auth = status_error(403, "Update record", "");
        assert_eq!(auth.http_status(), Some(403));
        assert!(auth.to_string().contains("Authentication failed"));

        let server = status_error(502, "Create record", "upstream down");
        assert_eq!(server.http_status(), Some(502));
        assert!(server.to_string().contains("upstream down"));

        let other = status_error(400, "Create record", "bad ttl");
        assert!(other.to_string().contains("Create record failed - bad ttl"));
    }

    #[test]
    fn api_token_not_exposed_in_debug() {
        let provider = CloudflareProvider::new(
            CLOUDFLARE_API_BASE,
            "secret_token_12345",
            "zone",
            DEFAULT_HTTP_TIMEOUT,
            false,
        )
        .unwrap();

        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret_token_12345"));
        assert!(debug_str.contains("CloudflareProvider"));
    }

    #[test]
    fn provider_name() {
        assert_eq!(provider(CLOUDFLARE_API_BASE).provider_name(), "cloudflare");
    }
}
