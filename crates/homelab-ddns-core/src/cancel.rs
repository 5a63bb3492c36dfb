//! Cooperative cancellation for collaborator calls
//!
//! Every I/O call made on behalf of the reconciler races against the
//! process-wide [`CancellationToken`]. When the token fires first the in-flight
//! future is dropped (which aborts the underlying HTTP request) and
//! [`Error::Cancelled`] is returned instead of a transport error.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Run `fut` to completion unless `cancel` fires first.
///
/// An already-cancelled token short-circuits without polling `fut`.
pub async fn with_cancellation<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}
