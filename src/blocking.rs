use std::time::Duration;

use crate::error::DeriveError;
use crate::extract::ExtractError;

/// Runs a blocking extraction capability on the blocking pool, bounded by `limit`.
///
/// On timeout the worker thread is abandoned; its result is dropped.
pub(crate) async fn run_blocking<T, F>(
    operation: &'static str,
    limit: Duration,
    f: F,
) -> Result<T, DeriveError>
where
    F: FnOnce() -> Result<T, ExtractError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(result)) => result.map_err(DeriveError::from),
        Ok(Err(join_err)) => Err(DeriveError::Extraction(ExtractError::Io(format!(
            "{} task failed: {}",
            operation, join_err
        )))),
        Err(_) => Err(DeriveError::Timeout { operation, limit }),
    }
}
