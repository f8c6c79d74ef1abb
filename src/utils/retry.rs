use std::future::Future;
use tracing::warn;
use crate::error::Error;
use crate::utils::time::sleep_with_jitter;

/// Runs `operation` until it succeeds or `retries` extra attempts are used up,
/// doubling the (jittered) delay after every failure.
pub async fn retry_with_backoff<T, F, Fut>(
    mut retries: u32,
    base_delay_ms: u64,
    operation: F,
) -> crate::error::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = crate::error::Result<T>>,
{
    let mut delay = base_delay_ms;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !is_transient(&e) => return Err(e),
            Err(e) => {
                if retries == 0 {
                    return Err(e);
                }

                warn!(
                    error = %e,
                    retries_left = retries,
                    delay_ms = delay,
                    "Request failed, retrying"
                );

                retries -= 1;
                sleep_with_jitter(delay, delay / 2).await;
                delay *= 2;
            }
        }
    }
}

/// Auth and decoding failures will not fix themselves on a second try.
fn is_transient(error: &Error) -> bool {
    matches!(
        error,
        Error::Http(_) | Error::RateLimit
    )
}
