// # homelab-ddns-core
//
// Core library for the homelab dynamic DNS updater.
//
// ## Architecture Overview
//
// This library keeps one DNS record (the "homelab" label) pointed at the
// host's current public IP:
// - **IpSource**: Trait for discovering the current public IP
// - **DnsProvider**: Trait for listing, creating and updating provider records
// - **Reconciler**: Polling loop that discovers, diffs and applies every interval
// - **ReconcilerConfig**: Immutable configuration handed to the reconciler
//
// ## Design Principles
//
// 1. **Separation of Concerns**: The loop owns every decision; collaborators make single API calls
// 2. **Failure Isolation**: An error ends one iteration, never the loop
// 3. **Cooperative Cancellation**: One token reaches every I/O call
// 4. **Library-First**: The daemon is a thin wiring layer over this crate
// 5. **Stateless**: Provider state is re-fetched on every iteration

pub mod traits;
pub mod reconciler;
pub mod config;
pub mod error;
pub mod cancel;

// Re-export core types for convenience
pub use traits::{DnsProvider, DnsRecord, IpSource, RecordType};
pub use reconciler::{IterationOutcome, Reconciler};
pub use config::{HttpConfig, IpSourceConfig, ProviderConfig, ReconcilerConfig, RecordConfig};
pub use error::{Error, Result};
pub use cancel::with_cancellation;
