//! Retry logic with exponential backoff

use crate::error::{ArenarrError, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Add jitter to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Quick retries for API calls
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Slow retries for downloads and imports
    pub fn slow() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Which errors should be retried
#[derive(Debug, Clone, Copy)]
pub enum RetryPolicy {
    All,
    Transient,
    Never,
}

/// Execute an async operation with retry logic
pub async fn retry_with_backoff<F, Fut, T>(
    config: RetryConfig,
    policy: RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(err) => {
                if !should_retry(&err, policy) {
                    debug!("{} failed with non-retryable error: {}", operation_name, err);
                    return Err(err);
                }

                if attempt >= config.max_attempts {
                    error!(
                        "{} failed after {} attempts: {}",
                        operation_name, config.max_attempts, err
                    );
                    return Err(ArenarrError::RetryExhausted {
                        operation: operation_name.to_string(),
                        attempts: config.max_attempts,
                        last_error: Box::new(err),
                    });
                }

                warn!(
                    "{} failed on attempt {}/{}: {}. Retrying in {:?}",
                    operation_name, attempt, config.max_attempts, err, delay
                );

                sleep(delay).await;
                delay = next_delay(delay, &config);
            }
        }
    }
}

fn should_retry(error: &ArenarrError, policy: RetryPolicy) -> bool {
    match policy {
        RetryPolicy::Never => false,
        RetryPolicy::All => true,
        RetryPolicy::Transient => error.is_transient(),
    }
}

fn next_delay(current: Duration, config: &RetryConfig) -> Duration {
    let mut next = current.mul_f64(config.backoff_multiplier);
    if next > config.max_delay {
        next = config.max_delay;
    }
    if config.jitter {
        let jitter = rand::thread_rng().gen_range(0.8..1.2);
        next = next.mul_f64(jitter);
        if next > config.max_delay {
            next = config.max_delay;
        }
    }
    next
}
