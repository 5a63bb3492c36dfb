//! Reconciliation loop
//!
//! The Reconciler is responsible for:
//! - Discovering the current public IP via IpSource
//! - Listing the zone's records via DnsProvider
//! - Deciding between update, create and no-op for the managed record
//! - Sleeping for the poll interval after every iteration, whatever happened
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────┐
//!            │  Reconciler  │◄──── CancellationToken
//!            └──────────────┘
//!                 │      │
//!        current()│      │list / create / update
//!                 ▼      ▼
//!        ┌──────────┐  ┌─────────────┐
//!        │ IpSource │  │ DnsProvider │
//!        └──────────┘  └─────────────┘
//! ```
//!
//! ## Iteration
//!
//! 1. Discover IP (failure ends the iteration)
//! 2. List records (failure degrades to an empty list)
//! 3. Find the first record whose name starts with the label
//! 4. Empty list → no-op; match → update; no match → create
//! 5. Log the outcome
//! 6. Sleep `poll_interval`
//!
//! Note the interaction of 2 and 4: while listing keeps failing nothing is
//! created or updated, because a failed list is indistinguishable from an
//! empty zone.

use crate::cancel::with_cancellation;
use crate::config::ReconcilerConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsRecord, IpSource};
use std::net::IpAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of a single reconciliation pass
///
/// Transient: produced by [`Reconciler::reconcile_once`], logged, dropped.
#[derive(Debug)]
pub enum IterationOutcome {
    /// The provider returned no records at all; nothing was written
    NoOp,

    /// The matched record was submitted with the new content
    Updated {
        /// The record as listed before the update
        record: DnsRecord,
        /// The IP written into `content`
        new_ip: IpAddr,
    },

    /// No record matched the label; a new one was created
    Created {
        /// The IP written into `content`
        new_ip: IpAddr,
    },

    /// The iteration failed; the error has already been logged
    Failed(Error),
}

impl IterationOutcome {
    /// Whether the iteration ended in failure
    pub fn is_failed(&self) -> bool {
        matches!(self, IterationOutcome::Failed(_))
    }
}

/// Reconciler driving the poll → discover → diff → apply cycle
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Drive with [`Reconciler::run()`]
/// 3. Cancel the token to stop; `run` returns after the current step
///
/// ## Threading
///
/// Everything happens on the caller's task. Calls are strictly sequential;
/// no state survives between iterations.
pub struct Reconciler {
    /// IP discovery collaborator
    ip_source: Box<dyn IpSource>,

    /// DNS provider collaborator
    provider: Box<dyn DnsProvider>,

    /// Delay after each iteration
    poll_interval: Duration,

    /// Name prefix of the managed record
    label: String,

    /// Comment attached to created records
    comment: String,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `ip_source`: IP discovery implementation
    /// - `provider`: DNS provider implementation
    /// - `config`: Validated before anything else happens
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        config: &ReconcilerConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            ip_source,
            provider,
            poll_interval: config.poll_interval(),
            label: config.record.label.clone(),
            comment: config.record.comment.clone(),
        })
    }

    /// Run until `cancel` fires
    ///
    /// Cancellation is checked before every iteration and interrupts the delay.
    /// An in-flight iteration is cut short by its collaborators returning
    /// [`Error::Cancelled`].
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "Reconciler started (label={}, provider={}, ip_source={}, interval={:?})",
            self.label,
            self.provider.provider_name(),
            self.ip_source.source_name(),
            self.poll_interval
        );

        while !cancel.is_cancelled() {
            let outcome = self.reconcile_once(&cancel).await;
            debug!("Iteration finished: {:?}", outcome);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!("Reconciler stopped");
    }

    /// Perform one reconciliation pass (no delay)
    pub async fn reconcile_once(&self, cancel: &CancellationToken) -> IterationOutcome {
        let ip = match with_cancellation(cancel, self.ip_source.current(cancel)).await {
            Ok(ip) => ip,
            Err(e) => {
                if !e.is_cancelled() {
                    error!("IP discovery via {} failed: {}", self.ip_source.source_name(), e);
                }
                return IterationOutcome::Failed(e);
            }
        };
        debug!("Discovered public IP {}", ip);

        let records = match with_cancellation(cancel, self.provider.list_records(cancel)).await {
            Ok(records) => records,
            Err(Error::Cancelled) => return IterationOutcome::Failed(Error::Cancelled),
            Err(e) => {
                warn!(
                    "Listing records from {} failed, treating as empty: {}",
                    self.provider.provider_name(),
                    e
                );
                Vec::new()
            }
        };

        if records.is_empty() {
            debug!("Provider returned no records, nothing to do");
            return IterationOutcome::NoOp;
        }

        match self.find_target(&records) {
            Some(record) => self.update(record, ip, cancel).await,
            None => self.create(ip, cancel).await,
        }
    }

    /// First record whose name starts with the label, in provider order
    fn find_target<'a>(&self, records: &'a [DnsRecord]) -> Option<&'a DnsRecord> {
        let mut matches = records
            .iter()
            .filter(|record| record.name.starts_with(&self.label));

        let first = matches.next()?;
        let extra = matches.count();
        if extra > 0 {
            warn!(
                "{} records match label '{}', using the first ({})",
                extra + 1,
                self.label,
                first.name
            );
        }

        Some(first)
    }

    async fn update(
        &self,
        record: &DnsRecord,
        ip: IpAddr,
        cancel: &CancellationToken,
    ) -> IterationOutcome {
        let Some(record_id) = record.id.as_deref() else {
            let e = Error::invalid_input(format!("Matched record {} has no id", record.name));
            error!("Cannot update {}: {}", record.name, e);
            return IterationOutcome::Failed(e);
        };

        let payload = record.with_content(ip.to_string());
        let result = with_cancellation(
            cancel,
            self.provider.update_record(record_id, &payload, cancel),
        )
        .await;

        match result {
            Ok(()) => {
                info!(
                    "Updated {} ({}) {} -> {}",
                    record.name, record_id, record.content, ip
                );
                IterationOutcome::Updated {
                    record: record.clone(),
                    new_ip: ip,
                }
            }
            Err(e) => {
                if !e.is_cancelled() {
                    error!("Failed to update {} ({}): {}", record.name, record_id, e);
                }
                IterationOutcome::Failed(e)
            }
        }
    }

    async fn create(&self, ip: IpAddr, cancel: &CancellationToken) -> IterationOutcome {
        let payload = DnsRecord::new_a(&self.label, ip.to_string()).with_comment(&self.comment);
        let result =
            with_cancellation(cancel, self.provider.create_record(&payload, cancel)).await;

        match result {
            Ok(()) => {
                info!("Created record {} -> {}", self.label, ip);
                IterationOutcome::Created { new_ip: ip }
            }
            Err(e) => {
                if !e.is_cancelled() {
                    error!("Failed to create record {}: {}", self.label, e);
                }
                IterationOutcome::Failed(e)
            }
        }
    }
}
