//! Collaborator traits for the homelab DDNS updater
//!
//! - [`IpSource`]: Discover the current public IP
//! - [`DnsProvider`]: List, create and update records via a provider API

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::IpSource;
pub use dns_provider::{DnsProvider, DnsRecord, RecordType};
