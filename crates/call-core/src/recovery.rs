//! Retry with jittered exponential backoff
//!
//! Only errors classified recoverable (`CallError::is_recoverable`) are
//! retried; state errors and media errors surface immediately. Used by the
//! REST signaling transport for transient network failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{CallError, CallResult};

/// Parameters for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Ceiling for the computed delay
    pub max_delay: Duration,
    /// Multiplier applied per attempt
    pub backoff_multiplier: f64,
    /// Spread delays by ±20% to avoid thundering herds
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Preset for quick network operations: more attempts, short delays
    pub fn quick() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 1.5,
            use_jitter: true,
        }
    }

    /// Preset that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());
        let factor = if self.use_jitter {
            rand::thread_rng().gen_range(0.8..1.2)
        } else {
            1.0
        };
        Duration::from_secs_f64(capped * factor)
    }
}

/// Run `operation` until it succeeds, exhausts its attempts, or fails with a
/// non-recoverable error.
pub async fn retry_with_backoff<T, F, Fut>(
    operation: &str,
    config: &RetryConfig,
    mut f: F,
) -> CallResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CallResult<T>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match f().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "operation recovered");
                }
                return Ok(value);
            }
            Err(error) if error.is_recoverable() && attempt < config.max_attempts => {
                let delay = config.delay_for_attempt(attempt);
                warn!(operation, attempt, ?delay, %error, "retrying after transient failure");
                sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::call::CallState;

    #[test]
    fn delays_grow_and_stay_capped() {
        let config = RetryConfig {
            use_jitter: false,
            ..RetryConfig::default()
        };
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
        // far past the cap
        assert_eq!(config.delay_for_attempt(20), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let seen = attempts.clone();

        let result = retry_with_backoff("poll", &RetryConfig::quick(), move || {
            let seen = seen.clone();
            async move {
                if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(CallError::signaling_unavailable("connection refused"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_recoverable_errors_are_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let seen = attempts.clone();

        let result: CallResult<()> =
            retry_with_backoff("end_call", &RetryConfig::quick(), move || {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Err(CallError::invalid_state("ringing", CallState::Ended))
                }
            })
            .await;

        assert!(matches!(result, Err(CallError::InvalidCallState { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_are_exhausted_eventually() {
        let config = RetryConfig {
            max_attempts: 3,
            use_jitter: false,
            ..RetryConfig::default()
        };
        let result: CallResult<()> = retry_with_backoff("create_call", &config, || async {
            Err(CallError::signaling_unavailable("down"))
        })
        .await;

        assert!(matches!(result, Err(CallError::SignalingUnavailable { .. })));
    }
}
