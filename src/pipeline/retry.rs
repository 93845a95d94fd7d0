//! Retry logic with exponential backoff for registry operations.

use crate::error::Result;
use tokio::time::Duration;

/// Maximum backoff between attempts
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// How often and how patiently to retry transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = try once)
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given retry count and the default base delay
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// Retry an async operation with exponential backoff
///
/// Only errors for which [`crate::error::ReleaseError::is_retryable`] holds
/// are retried; everything else, including conflicts, returns immediately.
pub async fn retry_with_backoff<F, T, Fut>(
    mut operation: F,
    policy: RetryPolicy,
    operation_name: &str,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempts > 0 {
                    log::info!("{} succeeded after {} retry(ies)", operation_name, attempts);
                }
                return Ok(result);
            }
            Err(e) => {
                if !e.is_retryable() || attempts >= policy.max_retries {
                    return Err(e);
                }

                attempts += 1;
                let wait = policy.delay_for(attempts);
                log::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:.1}s",
                    operation_name,
                    attempts,
                    policy.max_retries + 1,
                    e,
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PublishError, ReleaseError};
    use std::cell::Cell;

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::with_retries(10);
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn retries_network_errors_until_success() {
        let calls = Cell::new(0);
        let result = retry_with_backoff(
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(PublishError::Network {
                            reason: "reset".to_string(),
                        }
                        .into())
                    } else {
                        Ok(n)
                    }
                }
            },
            fast(5),
            "publish",
        )
        .await
        .unwrap();
        assert_eq!(result, 3);
    }

    #[tokio::test]
    async fn conflict_is_never_retried() {
        let calls = Cell::new(0);
        let err = retry_with_backoff(
            || {
                calls.set(calls.get() + 1);
                async {
                    Err::<(), ReleaseError>(
                        PublishError::Conflict {
                            package: "a".to_string(),
                            version: "1.0.0".to_string(),
                        }
                        .into(),
                    )
                }
            },
            fast(5),
            "publish",
        )
        .await
        .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn default_policy_tries_once() {
        let calls = Cell::new(0);
        let err = retry_with_backoff(
            || {
                calls.set(calls.get() + 1);
                async {
                    Err::<(), ReleaseError>(
                        PublishError::Network {
                            reason: "down".to_string(),
                        }
                        .into(),
                    )
                }
            },
            RetryPolicy::default(),
            "publish",
        )
        .await
        .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(calls.get(), 1);
    }
}
