//! Retry strategies and the retry pipeline policy.
//!
//! This module provides flexible retry logic: a [`RetryStrategy`] decides
//! how long to wait between attempts, a [`RetryDecider`] decides whether
//! an attempt's outcome warrants another try, and [`RetryPolicyFactory`]
//! packages both as a pipeline stage. When a response carries a
//! `Retry-After` header it takes precedence over the strategy's delay,
//! capped by the policy's maximum wait.

use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::pipeline::{NextPolicy, PolicyFactory, PolicyOptions, RequestPolicy};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Defines when and how long to wait between retry attempts.
///
/// # Examples
///
/// ```
/// use restbind::RetryStrategy;
/// use std::time::Duration;
///
/// // Exponential backoff: 100ms, 200ms, 400ms, 800ms...
/// let exponential = RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(30),
///     max_retries: 5,
///     jitter: true,
/// };
/// # let _ = exponential;
/// ```
#[derive(Debug, Clone, Default)]
pub enum RetryStrategy {
    /// Do not retry failed requests.
    #[default]
    None,

    /// Retry with exponentially increasing delays.
    ///
    /// Each retry waits for `initial_delay * 2^attempt` (capped at
    /// `max_delay`). Optional jitter randomizes each delay to prevent
    /// thundering herd.
    ExponentialBackoff {
        /// The delay before the first retry.
        initial_delay: Duration,
        /// The maximum delay between retries.
        max_delay: Duration,
        /// The maximum number of retry attempts.
        max_retries: usize,
        /// Whether to randomize delays (recommended).
        jitter: bool,
    },

    /// Retry with a fixed delay between attempts.
    Linear {
        /// The delay between retry attempts.
        delay: Duration,
        /// The maximum number of retry attempts.
        max_retries: usize,
    },

    /// Custom retry pacing.
    Custom {
        /// Takes the attempt number (1-indexed) and returns the delay
        /// before that attempt, or `None` to stop retrying.
        delay_fn: fn(attempt: usize) -> Option<Duration>,
    },
}

impl RetryStrategy {
    /// Returns the delay before the given retry attempt, or `None` once
    /// retries are exhausted.
    ///
    /// `attempt` is 1-indexed: 1 is the first retry.
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        match self {
            RetryStrategy::None => None,
            RetryStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                max_retries,
                jitter,
            } => {
                if attempt > *max_retries {
                    return None;
                }

                let multiplier = 2u64.saturating_pow(attempt.saturating_sub(1) as u32);
                let base_delay =
                    initial_delay.saturating_mul(multiplier.try_into().unwrap_or(u32::MAX));
                let delay = base_delay.min(*max_delay);

                if *jitter {
                    // Random value between 50% and 100% of the delay.
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    Some(delay.mul_f64(jitter_factor))
                } else {
                    Some(delay)
                }
            }
            RetryStrategy::Linear { delay, max_retries } => {
                if attempt > *max_retries {
                    None
                } else {
                    Some(*delay)
                }
            }
            RetryStrategy::Custom { delay_fn } => delay_fn(attempt),
        }
    }
}

/// One attempt's outcome, as seen by a [`RetryDecider`].
#[derive(Debug)]
pub enum AttemptOutcome<'a> {
    /// The transport produced a response (any status).
    Response(&'a HttpResponse),
    /// The attempt failed before a response existed.
    Error(&'a Error),
}

/// Decides whether a failed or suspicious attempt should be retried.
///
/// # Examples
///
/// ```
/// use restbind::{AttemptOutcome, RetryDecider};
///
/// struct RetryOn503;
///
/// impl RetryDecider for RetryOn503 {
///     fn should_retry(&self, outcome: &AttemptOutcome<'_>, _attempt: usize) -> bool {
///         matches!(outcome, AttemptOutcome::Response(r) if r.status() == 503)
///     }
/// }
/// ```
pub trait RetryDecider: Send + Sync {
    /// Returns `true` to retry the request. `attempt` is 1-indexed.
    fn should_retry(&self, outcome: &AttemptOutcome<'_>, attempt: usize) -> bool;
}

/// The default decider: transport failures and 408/429/5xx responses are
/// transient; cancellation never retries.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTransient;

impl RetryDecider for RetryOnTransient {
    fn should_retry(&self, outcome: &AttemptOutcome<'_>, _attempt: usize) -> bool {
        match outcome {
            AttemptOutcome::Response(response) => {
                let status = response.status();
                status == 408 || status == 429 || (500..600).contains(&status)
            }
            AttemptOutcome::Error(Error::Cancelled) => false,
            AttemptOutcome::Error(error) => error.is_retryable(),
        }
    }
}

/// Parses a `Retry-After` header as delay-seconds or an HTTP date.
fn parse_retry_after(headers: &Headers) -> Option<Duration> {
    let header = headers.value("Retry-After")?;

    if let Ok(seconds) = header.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(date_time) = httpdate::parse_http_date(header) {
        if let Ok(duration) = date_time.duration_since(SystemTime::now()) {
            return Some(duration);
        }
    }

    None
}

/// Factory for the retry pipeline stage.
pub struct RetryPolicyFactory {
    strategy: RetryStrategy,
    decider: Arc<dyn RetryDecider>,
    max_retry_after: Duration,
}

impl RetryPolicyFactory {
    /// A retry stage with the given strategy and the default transient
    /// decider.
    pub fn new(strategy: RetryStrategy) -> Self {
        Self {
            strategy,
            decider: Arc::new(RetryOnTransient),
            max_retry_after: Duration::from_secs(300),
        }
    }

    /// Replaces the retry decider.
    pub fn decider(mut self, decider: Arc<dyn RetryDecider>) -> Self {
        self.decider = decider;
        self
    }

    /// Caps how long a server-supplied `Retry-After` may be honored.
    pub fn max_retry_after(mut self, max: Duration) -> Self {
        self.max_retry_after = max;
        self
    }
}

impl Default for RetryPolicyFactory {
    /// Three exponential retries from 500ms with jitter.
    fn default() -> Self {
        Self::new(RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_retries: 3,
            jitter: true,
        })
    }
}

impl PolicyFactory for RetryPolicyFactory {
    fn create(&self, next: NextPolicy, _options: &PolicyOptions) -> Arc<dyn RequestPolicy> {
        Arc::new(RetryPolicy {
            strategy: self.strategy.clone(),
            decider: self.decider.clone(),
            max_retry_after: self.max_retry_after,
            next,
        })
    }
}

struct RetryPolicy {
    strategy: RetryStrategy,
    decider: Arc<dyn RetryDecider>,
    max_retry_after: Duration,
    next: NextPolicy,
}

#[async_trait]
impl RequestPolicy for RetryPolicy {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.next.send(request.clone()).await;

            // Cancellation is a caller decision, never a transient fault.
            if matches!(&result, Err(Error::Cancelled)) {
                return result;
            }

            let (should_retry, retry_after) = match &result {
                Ok(response) => (
                    self.decider
                        .should_retry(&AttemptOutcome::Response(response), attempt),
                    parse_retry_after(response.headers()),
                ),
                Err(error) => (
                    self.decider
                        .should_retry(&AttemptOutcome::Error(error), attempt),
                    None,
                ),
            };
            if !should_retry {
                return result;
            }

            let delay = retry_after
                .map(|d| d.min(self.max_retry_after))
                .or_else(|| self.strategy.delay_for_attempt(attempt));
            let Some(delay) = delay else {
                // Retries exhausted; surface the last outcome as-is.
                return result;
            };

            tracing::warn!(
                caller = request.caller(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying request after transient failure"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_delays() {
        let strategy = RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            max_retries: 5,
            jitter: false,
        };

        assert_eq!(
            strategy.delay_for_attempt(1),
            Some(Duration::from_millis(100))
        );
        assert_eq!(
            strategy.delay_for_attempt(2),
            Some(Duration::from_millis(200))
        );
        assert_eq!(
            strategy.delay_for_attempt(3),
            Some(Duration::from_millis(400))
        );
        assert_eq!(
            strategy.delay_for_attempt(4),
            Some(Duration::from_millis(800))
        );
        assert_eq!(strategy.delay_for_attempt(6), None);
    }

    #[test]
    fn test_exponential_backoff_caps_at_max_delay() {
        let strategy = RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(15),
            max_retries: 3,
            jitter: false,
        };
        assert_eq!(strategy.delay_for_attempt(2), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_linear_delays() {
        let strategy = RetryStrategy::Linear {
            delay: Duration::from_secs(1),
            max_retries: 3,
        };

        assert_eq!(strategy.delay_for_attempt(1), Some(Duration::from_secs(1)));
        assert_eq!(strategy.delay_for_attempt(3), Some(Duration::from_secs(1)));
        assert_eq!(strategy.delay_for_attempt(4), None);
    }

    #[test]
    fn test_no_retry() {
        let strategy = RetryStrategy::None;
        assert_eq!(strategy.delay_for_attempt(1), None);
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = Headers::new();
        headers.set("Retry-After", "60");
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let mut headers = Headers::new();
        let later = SystemTime::now() + Duration::from_secs(90);
        headers.set("Retry-After", httpdate::fmt_http_date(later));
        let delay = parse_retry_after(&headers).unwrap();
        assert!(delay <= Duration::from_secs(90));
        assert!(delay >= Duration::from_secs(80));
    }

    #[test]
    fn test_default_decider_on_statuses() {
        use crate::response::ResponseBody;

        let decider = RetryOnTransient;
        for (status, expected) in [(500, true), (503, true), (429, true), (408, true), (404, false), (200, false)] {
            let response = HttpResponse::new(status, Headers::new(), ResponseBody::empty());
            assert_eq!(
                decider.should_retry(&AttemptOutcome::Response(&response), 1),
                expected,
                "status {status}"
            );
        }
    }

    #[test]
    fn test_default_decider_never_retries_cancellation() {
        let decider = RetryOnTransient;
        assert!(!decider.should_retry(&AttemptOutcome::Error(&Error::Cancelled), 1));
        assert!(decider.should_retry(
            &AttemptOutcome::Error(&Error::transport("connection reset")),
            1
        ));
    }
}
