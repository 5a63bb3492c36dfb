// # DNS Provider Trait
//
// Defines the interface to a DNS provider's record API and the record model
// exchanged with it.
//
// ## Implementations
//
// - Cloudflare-style v4 REST API: `homelab-ddns-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use homelab_ddns_core::DnsProvider;
//
// let records = provider.list_records(&cancel).await?;
// if let Some(record) = records.iter().find(|r| r.name.starts_with("homelab")) {
//     let payload = record.with_content("5.6.7.8");
//     provider.update_record(record.id.as_deref().unwrap(), &payload, &cancel).await?;
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;

/// DNS record type
///
/// Well-known types get their own variant; anything else is kept verbatim in
/// [`RecordType::Other`] so an update never rewrites a type it does not know.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Ns,
    Srv,
    Caa,
    Other(String),
}

impl RecordType {
    /// Wire representation (`"A"`, `"AAAA"`, ...)
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Ns => "NS",
            RecordType::Srv => "SRV",
            RecordType::Caa => "CAA",
            RecordType::Other(other) => other,
        }
    }
}

impl From<String> for RecordType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "MX" => RecordType::Mx,
            "TXT" => RecordType::Txt,
            "NS" => RecordType::Ns,
            "SRV" => RecordType::Srv,
            "CAA" => RecordType::Caa,
            _ => RecordType::Other(value),
        }
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single DNS record as exchanged with the provider
///
/// The same shape is used for list results and for create/update payloads.
/// `id` is assigned by the provider and omitted from request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-assigned identifier (absent until created)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Record name, e.g. "homelab" or "homelab.example.com"
    pub name: String,

    /// IP address or target value
    pub content: String,

    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Whether traffic is proxied by the provider
    #[serde(default)]
    pub proxied: bool,

    /// Time-to-live; absent means provider default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    /// Free-form comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl DnsRecord {
    /// Payload for a brand new A record
    pub fn new_a(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            content: content.into(),
            record_type: RecordType::A,
            proxied: false,
            ttl: None,
            comment: None,
        }
    }

    /// Attach a comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Update payload: every field of `self` except `content`, without the id
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            ..self.clone()
        }
    }
}

/// Trait for DNS provider implementations
///
/// Each method performs exactly one API call. Providers never retry, never
/// decide whether a write is needed, and never cache records between calls:
/// the reconciler re-lists on every iteration and owns every decision.
///
/// # Cancellation
///
/// All calls take the process cancellation token and must return
/// [`Error::Cancelled`](crate::Error::Cancelled) promptly once it fires.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every record in the configured zone, in provider order
    ///
    /// A missing or unparseable body yields `Ok(vec![])`; transport failures
    /// and non-success statuses are errors.
    async fn list_records(&self, cancel: &CancellationToken)
    -> Result<Vec<DnsRecord>, crate::Error>;

    /// Create a record; success is judged by HTTP status class only
    async fn create_record(
        &self,
        record: &DnsRecord,
        cancel: &CancellationToken,
    ) -> Result<(), crate::Error>;

    /// Replace the record identified by `record_id`; success by status class only
    async fn update_record(
        &self,
        record_id: &str,
        record: &DnsRecord,
        cancel: &CancellationToken,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
