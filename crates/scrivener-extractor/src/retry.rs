//! Timeout and bounded retry around blocking external calls

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use scrivener_domain::traits::TransientError;
use std::fmt::Display;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::warn;

/// Run `call` off the async workers under the configured timeout
///
/// Transient failures and timeouts are retried up to `max_retries` times with
/// exponential backoff; any other failure ends the call at once. `calls`
/// counts every attempt.
pub(crate) async fn with_retries<T, Er, F>(
    config: &ExtractorConfig,
    label: &str,
    calls: &mut usize,
    call: F,
) -> Result<T, ExtractorError>
where
    F: Fn() -> Result<T, Er> + Send + Sync + 'static,
    T: Send + 'static,
    Er: TransientError + Display + Send + 'static,
{
    let call = Arc::new(call);
    let attempts = config.max_retries + 1;

    for attempt in 1..=attempts {
        *calls += 1;
        let task_call = Arc::clone(&call);
        let task = tokio::task::spawn_blocking(move || (*task_call)());

        let (failure, timed_out) = match timeout(config.call_timeout(), task).await {
            Ok(Ok(Ok(value))) => return Ok(value),
            Ok(Ok(Err(e))) => {
                if !e.is_transient() {
                    return Err(ExtractorError::ModelCall(format!("{} failed: {}", label, e)));
                }
                (e.to_string(), e.is_timeout())
            }
            Ok(Err(join)) => {
                return Err(ExtractorError::ModelCall(format!("{} task failed: {}", label, join)));
            }
            Err(_) => (format!("no answer within {:?}", config.call_timeout()), true),
        };

        if attempt == attempts {
            return Err(if timed_out {
                ExtractorError::Timeout(attempts)
            } else {
                ExtractorError::ModelCall(format!(
                    "{} failed: {} (gave up after {} attempts)",
                    label, failure, attempts
                ))
            });
        }

        let delay = config.backoff(attempt);
        warn!(
            "{} attempt {}/{} failed: {}; retrying in {:?}",
            label, attempt, attempts, failure, delay
        );
        sleep(delay).await;
    }

    Err(ExtractorError::ModelCall(format!("no {} attempted", label)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrivener_llm::LlmError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config(max_retries: u32) -> ExtractorConfig {
        ExtractorConfig {
            max_retries,
            backoff_base_ms: 1,
            ..ExtractorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let mut calls = 0;

        let value = with_retries(&config(3), "embedding", &mut calls, move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(LlmError::RateLimitExceeded)
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls, 2);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_scripted_timeouts_exhaust_as_timeout() {
        let mut calls = 0;
        let result: Result<(), _> =
            with_retries(&config(1), "model call", &mut calls, || Err(LlmError::Timeout)).await;

        assert!(matches!(result, Err(ExtractorError::Timeout(2))));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_exhausted_transient_failures_are_model_call_errors() {
        let mut calls = 0;
        let result: Result<(), _> = with_retries(&config(2), "embedding", &mut calls, || {
            Err(LlmError::Http {
                status: 503,
                body: String::new(),
            })
        })
        .await;

        assert!(matches!(result, Err(ExtractorError::ModelCall(_))));
        assert_eq!(calls, 3);
    }
}
