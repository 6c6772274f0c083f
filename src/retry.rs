//! Bounded exponential backoff with jitter for flaky remote calls.
//!
//! Every stage that talks to a hosted inference endpoint funnels its calls through
//! [`execute`]. The policy is a plain value; classification of failures into retryable
//! and fatal is supplied by the caller, so each endpoint's error type decides what a
//! cold start looks like for its domain.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// How a failed attempt should be treated by the retry loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Expected to resolve itself after a delay (503, model cold start).
    Transient,
    /// Will not improve with retries; surface immediately.
    Fatal,
}

/// Immutable retry configuration shared by every remote call in the pipeline.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempt budget, including the first call.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap applied to the exponentially growing delay.
    pub max_delay: Duration,
    /// Upper bound on the uniform random jitter added to each delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Deterministic backoff delay before retry number `retry` (zero-based), without jitter.
    ///
    /// Grows as `base_delay * 2^retry`, capped at `max_delay`.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(retry.min(31)));
        exponential.min(self.max_delay)
    }

    fn sample_jitter(&self) -> Duration {
        let bound = self.max_jitter.as_millis() as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=bound))
    }
}

/// Terminal outcome of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Attempt budget exhausted; wraps the last transient failure.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    Exhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Final underlying error.
        #[source]
        source: E,
    },
    /// Classifier decided the failure cannot be retried.
    #[error(transparent)]
    Fatal(E),
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Borrow the underlying endpoint error regardless of how the retry loop ended.
    pub fn inner(&self) -> &E {
        match self {
            Self::Exhausted { source, .. } => source,
            Self::Fatal(inner) => inner,
        }
    }
}

/// Invoke `operation` under the given policy until it succeeds, fails fatally, or the
/// attempt budget runs out.
///
/// Transient failures sleep `min(max_delay, base_delay * 2^n) + jitter` before the next
/// attempt. Each retry is logged with its attempt number and delay so flapping endpoints
/// are visible in traces without blocking any user-facing output.
pub async fn execute<T, E, Fut, Op, Cl>(
    policy: &RetryPolicy,
    classify: Cl,
    mut operation: Op,
) -> Result<T, RetryError<E>>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Cl: Fn(&E) -> ErrorClass,
    E: std::error::Error + 'static,
{
    let mut attempts = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if classify(&error) == ErrorClass::Fatal {
                    return Err(RetryError::Fatal(error));
                }
                attempts += 1;
                if attempts >= policy.max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts,
                        source: error,
                    });
                }
                let delay = policy.backoff_delay(attempts - 1) + policy.sample_jitter();
                tracing::warn!(
                    attempt = attempts,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transient upstream failure; backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Error)]
    #[error("{message}")]
    struct StubError {
        message: String,
        transient: bool,
    }

    impl StubError {
        fn transient(message: &str) -> Self {
            Self {
                message: message.into(),
                transient: true,
            }
        }

        fn fatal(message: &str) -> Self {
            Self {
                message: message.into(),
                transient: false,
            }
        }
    }

    fn classify(error: &StubError) -> ErrorClass {
        if error.transient {
            ErrorClass::Transient
        } else {
            ErrorClass::Fatal
        }
    }

    fn test_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::ZERO,
        }
    }

    #[test]
    fn backoff_delay_is_non_decreasing_until_capped() {
        let policy = test_policy(10);
        let delays: Vec<Duration> = (0..8).map(|retry| policy.backoff_delay(retry)).collect();
        for pair in delays.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(delays[0], Duration::from_secs(1));
        assert_eq!(delays[4], Duration::from_secs(16));
        assert_eq!(delays[5], Duration::from_secs(30));
        assert_eq!(delays[7], Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_exactly_max_attempts() {
        let policy = test_policy(5);
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), RetryError<StubError>> = execute(&policy, classify, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StubError::transient("still loading")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        match result {
            Err(RetryError::Exhausted { attempts, source }) => {
                assert_eq!(attempts, 5);
                assert_eq!(source.message, "still loading");
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        // Four sleeps: 1 + 2 + 4 + 8 seconds under the paused clock.
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_classification_stops_retrying() {
        let policy = test_policy(5);
        let calls = AtomicU32::new(0);

        let result: Result<(), RetryError<StubError>> = execute(&policy, classify, || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(StubError::transient("503"))
                } else {
                    Err(StubError::fatal("bad request"))
                }
            }
        })
        .await;

        // Two retryable failures, then the fatal one on the third attempt.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(RetryError::Fatal(source)) => assert_eq!(source.message, "bad request"),
            other => panic!("expected fatal error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let policy = test_policy(5);
        let calls = AtomicU32::new(0);

        let result = execute(&policy, classify, || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(StubError::transient("loading"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_without_sleeping_on_first_attempt() {
        let policy = test_policy(5);
        let started = tokio::time::Instant::now();

        let result: Result<u32, RetryError<StubError>> =
            execute(&policy, classify, || async { Ok(7) }).await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[test]
    fn jitter_respects_bound() {
        let policy = RetryPolicy {
            max_jitter: Duration::from_millis(50),
            ..RetryPolicy::default()
        };
        for _ in 0..100 {
            assert!(policy.sample_jitter() <= Duration::from_millis(50));
        }
        let quiet = RetryPolicy {
            max_jitter: Duration::ZERO,
            ..RetryPolicy::default()
        };
        assert_eq!(quiet.sample_jitter(), Duration::ZERO);
    }
}
