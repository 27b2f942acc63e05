//! Retry policy: transient-failure classification and exponential backoff.
//!
//! An operation is attempted up to `max_retries + 1` times. Only transient
//! failures are retried; cancellation wins over both attempts and backoff
//! waits. Streaming calls never pass through here, a broken stream cannot
//! be transparently resumed.

use crate::config::RetryConfig;
use crate::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Attempt exponent cap. Keeps the uncapped delay from overflowing long
/// before `max_backoff` applies.
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Whether a failure is worth another attempt.
///
/// Retryable: HTTP 429, 502, 503, 504 and transport-level connect or
/// timeout failures. Everything else, including cancellation and any 4xx
/// that is not rate limiting, fails immediately.
pub fn is_retryable(err: &Error) -> bool {
    match err {
        Error::Cancelled => false,
        Error::Status { code, .. } => matches!(code, 429 | 502 | 503 | 504),
        Error::Http(e) => e.is_connect() || e.is_timeout(),
        _ => false,
    }
}

/// Computes the backoff before retry number `attempt` (zero-based).
///
/// The base delay doubles per attempt. With jitter enabled the delay is
/// perturbed uniformly by up to a quarter of itself in either direction;
/// jitter is applied before the `max_backoff` cap, so the cap is a hard
/// ceiling.
pub fn backoff_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let exponent = attempt.min(MAX_BACKOFF_EXPONENT);
    let mut delay = config.initial_backoff.saturating_mul(1u32 << exponent);

    if config.jitter {
        let range = delay / 4;
        if !range.is_zero() {
            let range_ns = range.as_nanos() as u64;
            let offset = rand::thread_rng().gen_range(0..=2 * range_ns);
            delay = delay - range + Duration::from_nanos(offset);
        }
    }

    delay.min(config.max_backoff)
}

/// Runs `operation` under the retry policy, racing every attempt and every
/// backoff wait against the cancellation token.
pub(crate) async fn retry<T, F, Fut>(
    cancel: &CancellationToken,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = operation() => result,
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retryable(&err) {
            return Err(err);
        }

        if attempt < config.max_retries {
            let delay = backoff_delay(attempt, config);
            tracing::debug!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying after transient failure"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        last_err = Some(err);
    }

    Err(Error::RetriesExhausted {
        attempts: config.max_retries,
        source: Box::new(last_err.unwrap_or(Error::Cancelled)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(initial_ms: u64, max_ms: u64, jitter: bool) -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_backoff: Duration::from_millis(initial_ms),
            max_backoff: Duration::from_millis(max_ms),
            jitter,
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(is_retryable(&Error::status(429, "Too Many Requests", "")));
        assert!(is_retryable(&Error::status(503, "Service Unavailable", "")));
        assert!(!is_retryable(&Error::status(400, "Bad Request", "")));
        assert!(!is_retryable(&Error::status(401, "Unauthorized", "")));
        assert!(!is_retryable(&Error::Cancelled));
        assert!(!is_retryable(&Error::marshal("bad payload")));
    }

    #[test]
    fn test_backoff_doubles_without_jitter() {
        let cfg = config(100, 60_000, false);
        assert_eq!(backoff_delay(0, &cfg), Duration::from_millis(100));
        assert_eq!(backoff_delay(1, &cfg), Duration::from_millis(200));
        assert_eq!(backoff_delay(3, &cfg), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_caps_at_max() {
        let cfg = config(100, 500, false);
        assert_eq!(backoff_delay(5, &cfg), Duration::from_millis(500));
        // Exponent stops growing past the cap even for huge attempt counts.
        assert_eq!(backoff_delay(100, &cfg), Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_jitter_stays_in_bounds() {
        let cfg = config(1_000, 60_000, true);
        for attempt in 0..4 {
            let base = Duration::from_millis(1_000 * (1 << attempt));
            for _ in 0..50 {
                let delay = backoff_delay(attempt, &cfg);
                assert!(delay >= base - base / 4, "delay {delay:?} below bound");
                assert!(delay <= base + base / 4, "delay {delay:?} above bound");
            }
        }
    }

    #[tokio::test]
    async fn test_retry_stops_on_success() {
        let cancel = CancellationToken::new();
        let cfg = config(1, 10, false);
        let mut calls = 0;
        let result = retry(&cancel, &cfg, || {
            calls += 1;
            let fail = calls < 3;
            async move {
                if fail {
                    Err(Error::status(503, "Service Unavailable", ""))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let cancel = CancellationToken::new();
        let cfg = config(1, 10, false);
        let mut calls = 0;
        let result: Result<()> = retry(&cancel, &cfg, || {
            calls += 1;
            async { Err(Error::status(503, "Service Unavailable", "")) }
        })
        .await;
        assert_eq!(calls, 4);
        let err = result.unwrap_err();
        assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(err.status_code(), Some(503));
    }

    #[tokio::test]
    async fn test_retry_does_not_retry_permanent_errors() {
        let cancel = CancellationToken::new();
        let cfg = config(1, 10, false);
        let mut calls = 0;
        let result: Result<()> = retry(&cancel, &cfg, || {
            calls += 1;
            async { Err(Error::status(400, "Bad Request", "")) }
        })
        .await;
        assert_eq!(calls, 1);
        assert!(matches!(result.unwrap_err(), Error::Status { code: 400, .. }));
    }

    #[tokio::test]
    async fn test_retry_honors_pre_cancelled_token() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let cfg = config(1, 10, false);
        let mut calls = 0;
        let result: Result<()> = retry(&cancel, &cfg, || {
            calls += 1;
            async { Ok(()) }
        })
        .await;
        assert_eq!(calls, 0);
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_retry_cancels_during_backoff() {
        let cancel = CancellationToken::new();
        let cfg = RetryConfig {
            max_retries: 3,
            initial_backoff: Duration::from_secs(60),
            max_backoff: Duration::from_secs(60),
            jitter: false,
        };
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let start = std::time::Instant::now();
        let result: Result<()> = retry(&cancel, &cfg, || async {
            Err(Error::status(503, "Service Unavailable", ""))
        })
        .await;
        assert!(result.unwrap_err().is_cancelled());
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
