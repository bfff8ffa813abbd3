use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::GenerationError;

/// Transport-level retry policy shared by every provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RetryPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay before attempt `attempt + 1` (zero-based), doubling each time.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(2u64.saturating_pow(attempt)))
    }
}

/// Run `f` until it succeeds, fails with a non-retryable error, or the policy
/// runs out of attempts.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, f: F) -> Result<T, GenerationError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                attempt += 1;
                if attempt >= attempts {
                    return Err(GenerationError::Exhausted {
                        attempts,
                        last: Box::new(e),
                    });
                }
                let delay = policy.delay_for(attempt - 1);
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "generation request failed, retrying"
                );
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            timeout_secs: 1,
        }
    }

    #[test]
    fn delay_doubles() {
        let p = RetryPolicy {
            base_delay_ms: 100,
            ..RetryPolicy::default()
        };
        assert_eq!(p.delay_for(0), Duration::from_millis(100));
        assert_eq!(p.delay_for(1), Duration::from_millis(200));
        assert_eq!(p.delay_for(3), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out = with_retry(&fast(5), || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(GenerationError::Transport("reset".into()))
            } else {
                Ok("done")
            }
        })
        .await
        .unwrap();
        assert_eq!(out, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = with_retry(&fast(5), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(GenerationError::Status {
                status: 401,
                body: "bad key".into(),
            })
        })
        .await
        .unwrap_err();
        assert!(matches!(err, GenerationError::Status { status: 401, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_reports_attempt_count() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = with_retry(&fast(3), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(GenerationError::Status {
                status: 503,
                body: String::new(),
            })
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            GenerationError::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }
}
