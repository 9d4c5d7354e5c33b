//! Retry with exponential back-off and jitter for spreadsheet fetches.
//!
//! Only transient failures are retried. A sheet that is missing, private or
//! malformed returns the same answer on every attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** network failures and timeouts, HTTP 429, HTTP 5xx.
///
/// **Not retriable:** 404 and other 4xx, non-CSV bodies, CSV parse errors,
/// and configuration problems.
pub(crate) fn is_retriable(err: &FetchError) -> bool {
    match err {
        FetchError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        FetchError::RateLimited { .. } => true,
        FetchError::UnexpectedStatus { status, .. } => *status >= 500,
        FetchError::NotFound { .. }
        | FetchError::NotCsv { .. }
        | FetchError::InvalidCsv { .. }
        | FetchError::InvalidSheetUrl { .. }
        | FetchError::NotConfigured => false,
    }
}

/// Longest wait between two attempts.
const MAX_DELAY_MS: u64 = 30_000;

/// Wait before retry number `attempt` (1-based), or `None` when `err` should
/// be returned to the caller instead.
///
/// The exponential delay is `backoff_base_ms * 2^(attempt-1)` with ±25 %
/// jitter. A 429 waits at least as long as the host's `Retry-After`; a
/// `Retry-After` beyond [`MAX_DELAY_MS`] is not worth waiting for.
fn backoff_delay(attempt: u32, backoff_base_ms: u64, err: &FetchError) -> Option<Duration> {
    if !is_retriable(err) {
        return None;
    }
    let exponential = backoff_base_ms
        .saturating_mul(1u64 << (attempt.saturating_sub(1)).min(10))
        .min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (exponential as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;

    let floor_ms = match err {
        FetchError::RateLimited { retry_after_secs } => {
            let requested = retry_after_secs.saturating_mul(1000);
            if requested > MAX_DELAY_MS {
                return None;
            }
            requested
        }
        _ => 0,
    };
    Some(Duration::from_millis(jittered.max(floor_ms)))
}

/// Runs `operation` with up to `max_retries` additional attempts on transient
/// errors. With `max_retries = 0` the operation runs exactly once.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if attempt >= max_retries {
            return Err(err);
        }
        attempt += 1;
        let Some(delay) = backoff_delay(attempt, backoff_base_ms, &err) else {
            return Err(err);
        };
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "sheet fetch failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn client_errors_are_not_retriable() {
        assert!(!is_retriable(&FetchError::NotFound {
            url: "u".to_owned()
        }));
        assert!(!is_retriable(&FetchError::UnexpectedStatus {
            status: 403,
            url: "u".to_owned()
        }));
        assert!(!is_retriable(&FetchError::NotConfigured));
    }

    #[test]
    fn server_errors_and_throttling_are_retriable() {
        assert!(is_retriable(&FetchError::UnexpectedStatus {
            status: 503,
            url: "u".to_owned()
        }));
        assert!(is_retriable(&FetchError::RateLimited {
            retry_after_secs: 1
        }));
    }

    #[test]
    fn delay_grows_within_jitter_bounds() {
        let err = FetchError::UnexpectedStatus {
            status: 503,
            url: "u".to_owned(),
        };
        for attempt in 1..=3 {
            let expected = 200u64 << (attempt - 1);
            let delay = backoff_delay(attempt, 200, &err).expect("5xx is retried");
            let ms = u64::try_from(delay.as_millis()).expect("small delay");
            assert!(
                (expected * 3 / 4..=expected * 5 / 4).contains(&ms),
                "attempt {attempt}: {ms}ms outside jitter around {expected}ms"
            );
        }
    }

    #[test]
    fn delay_is_capped() {
        let err = FetchError::UnexpectedStatus {
            status: 500,
            url: "u".to_owned(),
        };
        let delay = backoff_delay(20, 10_000, &err).expect("5xx is retried");
        assert!(delay <= Duration::from_millis(MAX_DELAY_MS * 5 / 4));
    }

    #[test]
    fn throttled_fetch_waits_for_retry_after() {
        let err = FetchError::RateLimited {
            retry_after_secs: 2,
        };
        let delay = backoff_delay(1, 0, &err).expect("short retry-after is honoured");
        assert_eq!(delay, Duration::from_secs(2));
    }

    #[test]
    fn long_retry_after_gives_up() {
        let err = FetchError::RateLimited {
            retry_after_secs: 60,
        };
        assert_eq!(backoff_delay(1, 0, &err), None);
    }

    #[test]
    fn non_retriable_error_has_no_delay() {
        let err = FetchError::NotFound {
            url: "u".to_owned(),
        };
        assert_eq!(backoff_delay(1, 100, &err), None);
    }

    #[tokio::test]
    async fn zero_retries_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(0, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(FetchError::RateLimited {
                    retry_after_secs: 1,
                })
            }
        })
        .await;
        assert!(matches!(result, Err(FetchError::RateLimited { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err(FetchError::UnexpectedStatus {
                        status: 502,
                        url: "u".to_owned(),
                    })
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.expect("third attempt succeeds"), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(FetchError::NotFound {
                    url: "u".to_owned(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(FetchError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "404 must not be retried");
    }
}
