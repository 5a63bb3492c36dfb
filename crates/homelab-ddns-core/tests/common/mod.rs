//! Test doubles and common utilities for reconciler contract tests
//!
//! The doubles record every call (with the virtual time it happened at) so
//! tests can assert on the exact provider traffic an iteration produced.

#![allow(dead_code)]

use async_trait::async_trait;
use homelab_ddns_core::config::{ProviderConfig, ReconcilerConfig};
use homelab_ddns_core::error::{Error, Result};
use homelab_ddns_core::traits::{DnsProvider, DnsRecord, IpSource, RecordType};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// What the scripted IP source does on one call
#[derive(Debug, Clone)]
pub enum IpStep {
    /// Return this address
    Ip(IpAddr),
    /// Fail with an IP source error
    Fail,
    /// Never complete; only cancellation ends the call
    Hang,
}

/// IP source replaying a script; the last step repeats forever
#[derive(Clone)]
pub struct ScriptedIpSource {
    steps: Arc<Mutex<VecDeque<IpStep>>>,
    calls: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedIpSource {
    pub fn new(steps: Vec<IpStep>) -> Self {
        assert!(!steps.is_empty(), "script needs at least one step");
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always return `ip`
    pub fn fixed(ip: &str) -> Self {
        Self::new(vec![IpStep::Ip(ip.parse().unwrap())])
    }

    /// Always fail
    pub fn failing() -> Self {
        Self::new(vec![IpStep::Fail])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }

    fn next_step(&self) -> IpStep {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop_front().unwrap()
        } else {
            steps.front().cloned().unwrap()
        }
    }
}

#[async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self, cancel: &CancellationToken) -> Result<IpAddr> {
        self.calls.lock().unwrap().push(Instant::now());
        match self.next_step() {
            IpStep::Ip(ip) => Ok(ip),
            IpStep::Fail => Err(Error::ip_source("discovery endpoint unreachable")),
            IpStep::Hang => {
                cancel.cancelled().await;
                Err(Error::Cancelled)
            }
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A call observed by the recording provider
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    List,
    Create(DnsRecord),
    Update { id: String, record: DnsRecord },
}

/// How the recording provider answers `list_records`
#[derive(Debug, Clone)]
pub enum ListBehavior {
    Records(Vec<DnsRecord>),
    Fail,
}

/// DNS provider double recording every call
#[derive(Clone)]
pub struct RecordingProvider {
    list: Arc<Mutex<ListBehavior>>,
    write_status: Arc<Mutex<Option<u16>>>,
    calls: Arc<Mutex<Vec<(Instant, ProviderCall)>>>,
}

impl RecordingProvider {
    pub fn with_records(records: Vec<DnsRecord>) -> Self {
        Self {
            list: Arc::new(Mutex::new(ListBehavior::Records(records))),
            write_status: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_list() -> Self {
        let provider = Self::with_records(Vec::new());
        *provider.list.lock().unwrap() = ListBehavior::Fail;
        provider
    }

    /// Make create/update calls fail with this HTTP status
    pub fn reject_writes_with(&self, status: u16) {
        *self.write_status.lock().unwrap() = Some(status);
    }

    pub fn accept_writes(&self) {
        *self.write_status.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    /// Calls other than `List`
    pub fn writes(&self) -> Vec<ProviderCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, ProviderCall::List))
            .collect()
    }

    pub fn list_times(&self) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, call)| matches!(call, ProviderCall::List))
            .map(|(at, _)| *at)
            .collect()
    }

    fn record(&self, call: ProviderCall) {
        self.calls.lock().unwrap().push((Instant::now(), call));
    }

    fn write_result(&self) -> Result<()> {
        match *self.write_status.lock().unwrap() {
            None => Ok(()),
            Some(status) => Err(Error::status("recording", status, "rejected by test")),
        }
    }
}

#[async_trait]
impl DnsProvider for RecordingProvider {
    async fn list_records(&self, _cancel: &CancellationToken) -> Result<Vec<DnsRecord>> {
        self.record(ProviderCall::List);
        match &*self.list.lock().unwrap() {
            ListBehavior::Records(records) => Ok(records.clone()),
            ListBehavior::Fail => Err(Error::http("connection refused")),
        }
    }

    async fn create_record(&self, record: &DnsRecord, _cancel: &CancellationToken) -> Result<()> {
        self.record(ProviderCall::Create(record.clone()));
        self.write_result()
    }

    async fn update_record(
        &self,
        record_id: &str,
        record: &DnsRecord,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.record(ProviderCall::Update {
            id: record_id.to_string(),
            record: record.clone(),
        });
        self.write_result()
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// A listed A record
pub fn a_record(id: &str, name: &str, content: &str) -> DnsRecord {
    DnsRecord {
        id: Some(id.to_string()),
        name: name.to_string(),
        content: content.to_string(),
        record_type: RecordType::A,
        proxied: false,
        ttl: None,
        comment: None,
    }
}

/// Minimal valid configuration with the given poll interval
pub fn minimal_config(poll_interval_secs: u64) -> ReconcilerConfig {
    ReconcilerConfig::new(ProviderConfig::new(
        "https://api.example.test/client/v4",
        "test-token",
        "zone-1",
    ))
    .with_poll_interval_secs(poll_interval_secs)
}
