// # IP Source Trait
//
// Defines the interface for discovering the host's current public IP address.
//
// ## Implementations
//
// - Plain-text HTTP endpoint: `homelab-ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use homelab_ddns_core::IpSource;
// use tokio_util::sync::CancellationToken;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//     let cancel = CancellationToken::new();
//
//     let current_ip = source.current(&cancel).await?;
//     println!("public IP: {current_ip}");
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;
use tokio_util::sync::CancellationToken;

/// Trait for IP discovery implementations
///
/// The reconciler calls [`IpSource::current`] exactly once per iteration.
/// Implementations are single-shot observers: they never retry, cache, or
/// spawn background work. A failed call simply ends the iteration.
///
/// # Cancellation
///
/// Implementations must abort the in-flight request and return
/// [`Error::Cancelled`](crate::Error::Cancelled) when `cancel` fires.
/// [`with_cancellation`](crate::cancel::with_cancellation) does this for any
/// future.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Discover the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The current IP address
    /// - `Err(Error)`: Transport failure, non-success status, unparseable body,
    ///   or cancellation
    async fn current(&self, cancel: &CancellationToken) -> Result<IpAddr, crate::Error>;

    /// Name of the source (for logging)
    fn source_name(&self) -> &'static str;
}
