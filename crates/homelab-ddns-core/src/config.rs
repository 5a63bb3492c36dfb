//! Configuration types for the homelab DDNS updater
//!
//! The configuration is loaded once at startup and handed to the
//! [`Reconciler`](crate::Reconciler) by value; nothing mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default IP discovery endpoint (plain text body)
pub const DEFAULT_IP_SOURCE_URL: &str = "https://api.ipify.org";

/// Default label of the managed record
pub const DEFAULT_RECORD_LABEL: &str = "homelab";

/// Comment attached to records created by the updater
pub const DEFAULT_RECORD_COMMENT: &str = "Homelab DNS Record";

/// Main reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Delay between the end of one iteration and the start of the next (seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// DNS provider API settings
    pub provider: ProviderConfig,

    /// IP discovery settings
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// Managed record settings
    #[serde(default)]
    pub record: RecordConfig,

    /// Shared HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

impl ReconcilerConfig {
    /// Create a configuration for the given provider with defaults elsewhere
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            provider,
            ip_source: IpSourceConfig::default(),
            record: RecordConfig::default(),
            http: HttpConfig::default(),
        }
    }

    /// Set the poll interval
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Poll interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }

        self.provider.validate()?;
        self.ip_source.validate()?;
        self.record.validate()?;
        self.http.validate()?;

        Ok(())
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API base URL, e.g. `https://api.cloudflare.com/client/v4`
    pub base_url: String,

    /// Bearer token; empty only for providers that accept anonymous calls
    #[serde(default)]
    pub api_token: String,

    /// Zone holding the managed record
    #[serde(default)]
    pub zone_id: String,
}

impl ProviderConfig {
    /// Create a provider configuration
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        zone_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: api_token.into(),
            zone_id: zone_id.into(),
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.base_url.trim().is_empty() {
            return Err(crate::Error::config("Provider base URL cannot be empty"));
        }
        Ok(())
    }
}

/// IP discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSourceConfig {
    /// URL returning the caller's public IP as a bare text body
    #[serde(default = "default_ip_source_url")]
    pub url: String,
}

impl IpSourceConfig {
    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.url.trim().is_empty() {
            return Err(crate::Error::config("IP source URL cannot be empty"));
        }
        Ok(())
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        Self {
            url: default_ip_source_url(),
        }
    }
}

/// Managed record configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Name prefix identifying the managed record; also the name used on creation
    #[serde(default = "default_record_label")]
    pub label: String,

    /// Comment attached to newly created records
    #[serde(default = "default_record_comment")]
    pub comment: String,
}

impl RecordConfig {
    /// Validate the record configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.label.is_empty() {
            return Err(crate::Error::config("Record label cannot be empty"));
        }
        Ok(())
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            label: default_record_label(),
            comment: default_record_comment(),
        }
    }
}

/// HTTP client configuration shared by the IP source and the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl HttpConfig {
    /// Request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the HTTP configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("HTTP request timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_ip_source_url() -> String {
    DEFAULT_IP_SOURCE_URL.to_string()
}

fn default_record_label() -> String {
    DEFAULT_RECORD_LABEL.to_string()
}

fn default_record_comment() -> String {
    DEFAULT_RECORD_COMMENT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}
