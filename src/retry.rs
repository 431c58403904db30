//! Retrying Tailscale API calls with exponential backoff
//!
//! Only the API client retries. The tag engine itself never repeats a write:
//! whatever error survives this layer is reported against the device as-is.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Backoff parameters for [`with_exponential_backoff`]
///
/// # Examples
///
/// ```
/// use tailnet_admin::retry::RetryConfig;
///
/// let config = RetryConfig {
///     max_attempts: 5,
///     ..RetryConfig::default()
/// };
/// assert_eq!(config.initial_backoff_ms, 200);
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Wait before the second attempt, in milliseconds
    pub initial_backoff_ms: u64,

    /// Multiplier applied to the wait after each failed attempt
    pub backoff_factor: f64,

    /// Upper bound for a single wait, in milliseconds
    pub max_backoff_ms: u64,

    /// Randomize each wait by +/-10%
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            backoff_factor: 2.0,
            max_backoff_ms: 5_000,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no waiting
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 0,
            backoff_factor: 1.0,
            max_backoff_ms: 0,
            add_jitter: false,
        }
    }

    fn delay_for(&self, backoff_ms: u64) -> Duration {
        let jittered = if self.add_jitter {
            let factor = rand::random::<f64>() * 0.2 + 0.9;
            (backoff_ms as f64 * factor) as u64
        } else {
            backoff_ms
        };

        Duration::from_millis(jittered.min(self.max_backoff_ms))
    }
}

/// Runs `operation` until it succeeds, fails with a non-retriable error,
/// or `config.max_attempts` attempts have been made
///
/// The last error is returned unchanged when attempts run out.
///
/// # Examples
///
/// ```
/// use tailnet_admin::retry::{RetryConfig, with_exponential_backoff};
///
/// # async fn example() -> anyhow::Result<()> {
/// let value = with_exponential_backoff(
///     || async { Ok::<_, anyhow::Error>(7) },
///     |err| err.to_string().contains("429"),
///     &RetryConfig::default(),
/// )
/// .await?;
/// assert_eq!(value, 7);
/// # Ok(())
/// # }
/// ```
pub async fn with_exponential_backoff<F, Fut, T, E, R>(
    operation: F,
    is_retriable: R,
    config: &RetryConfig,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let mut attempt = 0;
    let mut backoff_ms = config.initial_backoff_ms;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        attempt += 1;
        if attempt >= config.max_attempts || !is_retriable(&err) {
            return Err(err);
        }

        let delay = config.delay_for(backoff_ms);
        debug!(
            "Attempt {}/{} failed, retrying in {:?}",
            attempt, config.max_attempts, delay
        );
        sleep(delay).await;

        backoff_ms = ((backoff_ms as f64 * config.backoff_factor) as u64).min(config.max_backoff_ms);
    }
}
