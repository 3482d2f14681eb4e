//! Fixed-interval retry, used only for the startup connectivity check.

use std::future::Future;
use std::time::Duration;

/// Run `f` up to `attempts` times (at least once), sleeping `interval`
/// between failures. Returns the first success or the last error.
pub(crate) async fn retry_with_interval<F, Fut, T, E>(
    attempts: u32,
    interval: Duration,
    what: &str,
    f: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    "{what} failed, retrying in {interval:?}: {e}"
                );
                tokio::time::sleep(interval).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
