//! Exponential backoff retry policy (spec §6: up to 5 attempts, base
//! 1000 ms, cap 60000 ms, multiplier 2, retried on 429/502/503/504).

use rlm_types::{CompletionResponse, TransportError};
use std::future::Future;
use std::time::Duration;

/// Tunable retry parameters.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: usize,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Delay ceiling; growth stops here.
    pub max_delay: Duration,
    /// Growth factor applied per retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(60_000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following `attempt` (0-based: delay before
    /// the second call is `delay_for(0)`).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let scaled = self.base_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let capped = scaled.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Run `attempt_fn` up to `policy.max_attempts` times, backing off
/// between transient failures (per [`TransportError::is_retryable`]).
/// A non-retryable error returns immediately; exhausting all attempts
/// on retryable errors returns [`TransportError::RetriesExhausted`].
pub async fn with_retry<F, Fut>(
    policy: &RetryPolicy,
    mut attempt_fn: F,
) -> Result<CompletionResponse, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<CompletionResponse, TransportError>>,
{
    let mut attempt = 0usize;
    loop {
        match attempt_fn().await {
            Ok(response) => return Ok(response),
            Err(e) if e.is_retryable() => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return Err(TransportError::RetriesExhausted(e.to_string()));
                }
                let delay = policy.delay_for(attempt - 1);
                tracing::warn!(attempt, ?delay, error = %e, "retrying transient transport error");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlm_types::{StopReason, TokenUsage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn response() -> CompletionResponse {
        CompletionResponse {
            content: "ok".into(),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    #[test]
    fn delay_grows_geometrically_until_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(10), Duration::from_millis(60_000));
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(&RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TransportError::Authentication("bad key".into())) }
        })
        .await;
        assert!(matches!(result, Err(TransportError::Authentication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retryable_error_succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..RetryPolicy::default()
        };
        let result = with_retry(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(TransportError::RateLimited)
                } else {
                    Ok(response())
                }
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausting_retries_reports_retries_exhausted() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 1.0,
        };
        let result = with_retry(&policy, || async { Err(TransportError::RateLimited) }).await;
        assert!(matches!(result, Err(TransportError::RetriesExhausted(_))));
    }
}
