//! Bounded retry with exponential backoff and jitter for cross-service
//! calls. Only errors classified as transient (rate limits, 5xx,
//! connection resets) are retried; validation, auth, and parse errors
//! fail immediately.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use stylecoach_config::RetrySettings;
use tracing::warn;

/// Implemented by service error types to classify transient failures.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

pub async fn with_backoff<T, E, F, Fut>(
    settings: &RetrySettings,
    op: &str,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let max_attempts = settings.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                let delay = backoff_delay(settings, attempt);
                warn!(op, attempt, %e, delay_ms = delay.as_millis() as u64, "Transient failure, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn backoff_delay(settings: &RetrySettings, attempt: u32) -> Duration {
    let base = settings
        .base_delay_ms
        .saturating_mul(1u64 << attempt.min(16))
        .min(settings.max_delay_ms);
    // Full jitter on the upper half keeps concurrent retries spread out.
    let jitter = rand::rng().random_range(0..=base / 2);
    Duration::from_millis(base / 2 + jitter)
}

/// Transient classification for plain HTTP transports: connect/timeout
/// errors, 429 and 5xx responses.
pub fn reqwest_transient(e: &reqwest::Error) -> bool {
    if e.is_connect() || e.is_timeout() {
        return true;
    }
    match e.status() {
        Some(status) => status.as_u16() == 429 || status.is_server_error(),
        None => e.is_request(),
    }
}

pub fn status_transient(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}
