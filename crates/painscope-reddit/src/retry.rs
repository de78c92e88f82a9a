//! Retry with exponential back-off and jitter for the Reddit adapter.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (rate limits, network failures). Authentication and
//! not-found errors are returned immediately without any retry — retrying a
//! rejected credential or a missing community cannot succeed.

use std::future::Future;
use std::time::Duration;

use crate::error::RedditError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - [`RedditError::RateLimited`] — HTTP 429; the provider asked us to back off.
/// - [`RedditError::Http`] — network-level failure (timeout, connection reset).
///
/// **Not retriable (hard stop):**
/// - [`RedditError::Auth`] — invalid credentials; surfaced immediately.
/// - [`RedditError::NotFound`] — missing community/post; same answer every time.
/// - [`RedditError::Deserialize`] — malformed response; retrying won't fix it.
/// - [`RedditError::Api`] — application-level rejection.
pub(crate) fn is_retriable(err: &RedditError) -> bool {
    matches!(
        err,
        RedditError::RateLimited { .. } | RedditError::Http(_)
    )
}

/// Runs `operation` with up to `max_retries` additional attempts on transient
/// errors.
///
/// Back-off sleeps `backoff_base_secs * 2^attempt` seconds with ±25% jitter,
/// capped at 60 seconds. Non-retriable errors are returned immediately; when
/// retries are exhausted the last error is returned.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, RedditError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RedditError>>,
{
    const MAX_DELAY_SECS: u64 = 60;
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                let computed = backoff_base_secs.saturating_mul(1u64 << attempt.min(10));
                let capped = computed.min(MAX_DELAY_SECS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_secs = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_secs,
                    error = %err,
                    "transient Reddit error — retrying after back-off"
                );
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn rate_limited() -> RedditError {
        RedditError::RateLimited {
            context: "r/saas/new".to_owned(),
        }
    }

    fn deserialize_err() -> RedditError {
        let src = serde_json::from_str::<()>("invalid").unwrap_err();
        RedditError::Deserialize {
            context: "test".to_owned(),
            source: src,
        }
    }

    #[test]
    fn auth_is_not_retriable() {
        assert!(!is_retriable(&RedditError::Auth("401".to_owned())));
    }

    #[test]
    fn not_found_is_not_retriable() {
        assert!(!is_retriable(&RedditError::NotFound {
            context: "r/doesnotexist".to_owned()
        }));
    }

    #[test]
    fn deserialize_error_is_not_retriable() {
        assert!(!is_retriable(&deserialize_err()));
    }

    #[test]
    fn rate_limited_is_retriable() {
        assert!(is_retriable(&rate_limited()));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, RedditError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_on_rate_limited_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(rate_limited())
                } else {
                    Ok::<u32, RedditError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn propagates_last_error_after_exhausting_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, RedditError>(rate_limited())
            }
        })
        .await;
        // max_retries=2 → 3 total attempts
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(RedditError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_auth_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, RedditError>(RedditError::Auth("bad token".to_owned()))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "Auth must not be retried");
        assert!(matches!(result, Err(RedditError::Auth(_))));
    }
}
