//! Shared timeout constants and helpers.
//!
//! Centralizes the durations the server loop and configuration defaults agree
//! on, plus a thin wrapper that maps `tokio::time::timeout` expiry onto
//! `ProtocolError::Timeout`.

use crate::error::{ProtocolError, Result};
use std::future::Future;
use std::time::Duration;

/// Default timeout for connection-level operations
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Grace period for draining connections on shutdown
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a future with a deadline, converting expiry into `ProtocolError::Timeout`.
pub async fn with_timeout<F, T>(duration: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout),
    }
}
