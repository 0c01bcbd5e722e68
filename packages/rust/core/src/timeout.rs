//! Time bounds for external service calls.

use std::time::Duration;

use leadscout_shared::{LeadScoutError, Result};

/// Bound an external call; expiry is a hard failure.
pub(crate) async fn with_timeout<T>(
    operation: &'static str,
    limit: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(LeadScoutError::Timeout { operation, limit }),
    }
}
