//! Fixed-schedule retry executor with an injectable retry predicate.
//!
//! Generic over the error-classification policy: the sync orchestrator
//! supplies `should_retry ∘ classify` as the predicate, but the executor
//! itself knows nothing about the taxonomy.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

/// Backoff schedule for retried operations.
///
/// The operation runs once immediately; each schedule entry buys one more
/// attempt after sleeping that long. Total attempts ≤ 1 + schedule length.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub schedule: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            schedule: vec![
                Duration::from_secs(2),
                Duration::from_secs(5),
                Duration::from_secs(10),
            ],
        }
    }
}

impl RetryPolicy {
    pub fn new(schedule: Vec<Duration>) -> Self {
        Self { schedule }
    }

    /// Build a policy from millisecond entries (config convenience).
    pub fn from_millis(entries: &[u64]) -> Self {
        Self {
            schedule: entries.iter().map(|ms| Duration::from_millis(*ms)).collect(),
        }
    }
}

/// Run `op`, retrying per `policy` while `should_retry` accepts the error.
///
/// A rejected error is returned immediately with no delay. The predicate
/// is re-evaluated on every failure, so an operation that fails first with
/// a transient error and then with a permanent one stops early. When the
/// schedule is exhausted the last error is returned.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    should_retry: impl Fn(&anyhow::Error) -> bool,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = match op().await {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    for (i, delay) in policy.schedule.iter().enumerate() {
        if !should_retry(&last_err) {
            return Err(last_err);
        }
        warn!(
            "attempt {} failed ({last_err:#}); retrying in {delay:?}",
            i + 1,
        );
        tokio::time::sleep(*delay).await;

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => last_err = e,
        }
    }

    Err(last_err)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use anyhow::anyhow;

    use super::*;

    fn fast_policy(n: usize) -> RetryPolicy {
        RetryPolicy::new(vec![Duration::from_millis(1); n])
    }

    #[tokio::test]
    async fn succeeds_first_try_without_retrying() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&fast_policy(3), |_| true, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(7)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempt_count_is_bounded_by_schedule() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(&fast_policy(3), |_| true, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("still down"))
        })
        .await;
        assert!(result.is_err());
        // One immediate attempt + one per schedule entry.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn rejected_error_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(&fast_policy(3), |_| false, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("permanent"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_midway_through_schedule() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&fast_policy(3), |_| true, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(anyhow!("transient"))
            } else {
                Ok("up")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "up");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn predicate_reevaluated_on_each_failure() {
        // First failure is retryable, second is not — stops after 2 calls.
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(
            &fast_policy(3),
            |e| e.to_string().contains("transient"),
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(anyhow!("transient glitch"))
                } else {
                    Err(anyhow!("hard failure"))
                }
            },
        )
        .await;
        assert!(result.unwrap_err().to_string().contains("hard failure"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
