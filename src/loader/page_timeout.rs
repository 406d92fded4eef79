//! Timeout wrapper for page operations
//!
//! Prevents indefinite hangs during navigation and other CDP calls.

use std::future::Future;
use std::time::Duration;

use crate::error::{CollectorError, CollectorResult};

/// Run `operation` with an upper bound of `timeout_secs`
///
/// # Returns
/// * `Ok(T)` - Operation completed successfully
/// * `Err(CollectorError::Browser)` - The operation failed or timed out
pub async fn with_page_timeout<F, T, E>(
    operation: F,
    timeout_secs: u64,
    operation_name: &str,
) -> CollectorResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CollectorError::Browser(format!("{operation_name} failed: {e}"))),
        Err(_) => Err(CollectorError::Browser(format!(
            "{operation_name} timeout after {timeout_secs} seconds"
        ))),
    }
}
