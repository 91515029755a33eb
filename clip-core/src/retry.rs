use crate::error::CoreError;
use crate::error_utils::ErrorExt;
use crate::log_channels;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Pause between two attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Community lookups: 5 attempts, 5 seconds apart
    pub fn community_lookup() -> Self {
        Self::new(5, Duration::from_secs(5))
    }

    /// Clip downloads: 5 attempts, 1.5 seconds apart
    pub fn download() -> Self {
        Self::new(5, Duration::from_millis(1500))
    }

    /// Back-reference comments: 3 attempts, 2 seconds apart
    pub fn comment() -> Self {
        Self::new(3, Duration::from_secs(2))
    }

    /// Same attempt count, no waiting. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    Retry,
    NoRetry,
}

pub fn get_retry_strategy(error: &CoreError) -> RetryStrategy {
    if error.is_retryable() {
        RetryStrategy::Retry
    } else {
        RetryStrategy::NoRetry
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryMetrics {
    pub total_attempts: u64,
    pub total_retries: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
}

/// Wraps operations with the retry policy and counts what happened.
#[derive(Debug)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    metrics: Arc<Mutex<RetryMetrics>>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            metrics: Arc::new(Mutex::new(RetryMetrics::default())),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempts run out. The last error is returned on failure.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T, CoreError>
    where
        F: Fn(u32) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.record(|m| m.total_attempts += 1);

            match operation(attempt).await {
                Ok(result) => {
                    self.record(|m| {
                        m.successful_operations += 1;
                        m.total_retries += u64::from(attempt - 1);
                    });
                    if attempt > 1 {
                        info!(
                            target: log_channels::SESSION,
                            "{} succeeded on attempt {}/{}",
                            operation_name,
                            attempt,
                            self.policy.max_attempts
                        );
                    }
                    return Ok(result);
                }
                Err(error) => {
                    let exhausted = attempt >= self.policy.max_attempts;
                    let strategy = get_retry_strategy(&error);

                    if strategy == RetryStrategy::NoRetry || exhausted {
                        self.record(|m| {
                            m.failed_operations += 1;
                            m.total_retries += u64::from(attempt - 1);
                        });
                        if strategy == RetryStrategy::NoRetry {
                            debug!(
                                target: log_channels::SESSION,
                                "Not retrying {} due to error type: {}", operation_name, error
                            );
                        } else {
                            warn!(
                                target: log_channels::SESSION,
                                "{} failed after {} attempts: {}", operation_name, attempt, error
                            );
                        }
                        return Err(error);
                    }

                    if let Some(hint) = error.retry_after() {
                        debug!(
                            target: log_channels::SESSION,
                            "{} suggests waiting {:?}; policy waits {:?}",
                            operation_name,
                            hint,
                            self.policy.delay
                        );
                    }
                    info!(
                        target: log_channels::SESSION,
                        "Attempt {}/{} of {} failed, retrying in {:?}: {}",
                        attempt,
                        self.policy.max_attempts,
                        operation_name,
                        self.policy.delay,
                        error
                    );
                    if !self.policy.delay.is_zero() {
                        sleep(self.policy.delay).await;
                    }
                }
            }
        }
    }

    pub fn get_metrics(&self) -> RetryMetrics {
        self.metrics
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn reset_metrics(&self) {
        if let Ok(mut metrics) = self.metrics.lock() {
            *metrics = RetryMetrics::default();
        }
    }

    fn record(&self, update: impl FnOnce(&mut RetryMetrics)) {
        if let Ok(mut metrics) = self.metrics.lock() {
            update(&mut metrics);
        }
    }
}
