//! Optimistic concurrency retry
//!
//! Re-runs a whole read-modify-write unit when it loses an optimistic lock.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Retry budget and backoff for conflicting writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
        }
    }

    /// Retry immediately, without sleeping between attempts
    pub fn without_backoff(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Backoff before retrying after failed attempt `attempt` (1-based),
    /// without jitter: `initial * 2^(attempt-1)` capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// `backoff_for` plus up to 25% random jitter
    fn jittered_backoff(&self, attempt: u32) -> Duration {
        let base = self.backoff_for(attempt);
        let max_jitter_ms = (base.as_millis() / 4) as u64;
        if max_jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=max_jitter_ms))
    }
}

/// Errors that can report a lost optimistic lock
pub trait ConflictAware {
    fn is_concurrent_modification(&self) -> bool;

    /// Error returned once the retry budget is spent
    fn retries_exhausted(attempts: u32) -> Self;
}

/// Run `operation` until it succeeds, fails with a non-conflict error, or
/// the policy's attempts are used up.
///
/// `operation` must redo the whole unit of work (begin, read, mutate, write,
/// commit) on each call; nothing from a failed attempt is reused.
pub async fn retry_on_conflict<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ConflictAware,
{
    let max_attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Err(e) if e.is_concurrent_modification() => {
                if attempt >= max_attempts {
                    tracing::error!(attempts = attempt, "Concurrency conflict persisted, giving up");
                    return Err(E::retries_exhausted(attempt));
                }

                let delay = policy.jittered_backoff(attempt);
                tracing::warn!(
                    "Concurrency conflict, retrying (attempt {}/{}) in {:?}",
                    attempt,
                    max_attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Conflict,
        Fatal,
        Exhausted(u32),
    }

    impl ConflictAware for TestError {
        fn is_concurrent_modification(&self) -> bool {
            matches!(self, TestError::Conflict)
        }

        fn retries_exhausted(attempts: u32) -> Self {
            TestError::Exhausted(attempts)
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(100));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_millis(500));

        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(40), Duration::from_millis(500));
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let delay = policy.jittered_backoff(2);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(250));
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_conflicts() {
        let calls = AtomicU32::new(0);

        let result = retry_on_conflict(&RetryPolicy::without_backoff(3), || {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if call < 3 {
                    Err(TestError::Conflict)
                } else {
                    Ok(call)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_on_conflict(&RetryPolicy::without_backoff(4), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::Conflict) }
        })
        .await;

        assert_eq!(result, Err(TestError::Exhausted(4)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_on_conflict(&RetryPolicy::without_backoff(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::Fatal) }
        })
        .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_runs_once() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_on_conflict(&RetryPolicy::without_backoff(0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::Conflict) }
        })
        .await;

        assert_eq!(result, Err(TestError::Exhausted(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
