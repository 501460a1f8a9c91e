//! Query timeout - races a store operation against a timer.
//!
//! When the timer wins, the operation's future is dropped. Any `DatabaseTransaction` it
//! held is rolled back on drop, so a timed-out allocation never leaves the counter moved.

use crate::errors::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Runs `operation`, failing with `Error::QueryTimeout` if it takes longer than `limit`.
///
/// # Errors
/// Returns `Error::QueryTimeout` on expiry, or whatever `operation` returns.
pub async fn with_query_timeout<T, F>(limit: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            let after_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            warn!(after_ms, "Database operation timed out");
            Err(Error::QueryTimeout { after_ms })
        }
    }
}
