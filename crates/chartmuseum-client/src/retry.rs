//! Retry decisions and backoff delays.
//!
//! The transport asks a [`RetryStrategy`] two questions after every attempt:
//! should this outcome be retried, and how long to wait first. The default
//! [`RetryPolicy`] retries rate limiting (429), server errors (>= 500) and
//! transient network failures:
//! - 429 waits until the `RateLimit-Reset` deadline (unix seconds) plus a
//!   small jitter, never less than the configured floor
//! - everything else uses linear backoff with jitter inside a sub-second window
//!
//! Wall-clock time comes from an injected [`Clock`] so delays can be tested
//! without sleeping.

use rand::Rng;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::RetryConfig;

pub const HEADER_RATE_LIMIT: &str = "RateLimit-Limit";
pub const HEADER_RATE_RESET: &str = "RateLimit-Reset";

/// Source of wall-clock time
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Result of one attempt, as seen by the retry strategy
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    Response {
        status: StatusCode,
        headers: &'a HeaderMap,
    },
    TransportError {
        /// Connect failures, timeouts and dropped connections
        transient: bool,
    },
}

/// Decides whether and when to retry a request
pub trait RetryStrategy: Send + Sync + fmt::Debug {
    /// Additional attempts allowed after the first
    fn max_retries(&self) -> u32;

    fn should_retry(&self, outcome: &Outcome<'_>) -> bool;

    /// Delay before retry number `attempt` (0 for the first retry)
    fn backoff(&self, attempt: u32, outcome: &Outcome<'_>) -> Duration;
}

/// Default retry strategy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    clock: Arc<dyn Clock>,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RetryConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Wait for a 429: until the reset deadline, at least the floor, plus jitter
    pub fn rate_limit_backoff(&self, headers: &HeaderMap) -> Duration {
        let floor = self.config.rate_limit_floor;
        let jitter = jitter(self.config.rate_limit_ceiling.saturating_sub(floor));

        let wait = reset_deadline(headers)
            .and_then(|deadline| deadline.duration_since(self.clock.now()).ok())
            .filter(|wait| *wait > floor)
            .unwrap_or(floor);

        wait + jitter
    }

    /// Linear backoff with jitter: `(min + jitter) * (attempt + 1)`
    pub fn linear_backoff(&self, attempt: u32) -> Duration {
        let min = self.config.linear_min;
        let max = self.config.linear_max;
        let factor = attempt.saturating_add(1);

        if max <= min {
            return min.saturating_mul(factor);
        }
        (min + jitter(max - min)).saturating_mul(factor)
    }
}

impl RetryStrategy for RetryPolicy {
    fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    fn should_retry(&self, outcome: &Outcome<'_>) -> bool {
        match outcome {
            Outcome::Response { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Outcome::TransportError { transient } => *transient,
        }
    }

    fn backoff(&self, attempt: u32, outcome: &Outcome<'_>) -> Duration {
        match outcome {
            Outcome::Response { status, headers } if *status == StatusCode::TOO_MANY_REQUESTS => {
                self.rate_limit_backoff(headers)
            }
            _ => self.linear_backoff(attempt),
        }
    }
}

/// `RateLimit-Reset` as an absolute deadline
pub fn reset_deadline(headers: &HeaderMap) -> Option<SystemTime> {
    let secs: i64 = headers
        .get(HEADER_RATE_RESET)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    if secs <= 0 {
        return None;
    }
    UNIX_EPOCH.checked_add(Duration::from_secs(secs as u64))
}

/// `RateLimit-Limit`, when the server sends one
pub fn rate_limit(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(HEADER_RATE_LIMIT)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Uniform jitter in `[0, span)`
fn jitter(span: Duration) -> Duration {
    let nanos = span.as_nanos().min(u64::MAX as u128) as u64;
    if nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rand::rng().random_range(0..nanos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[derive(Debug)]
    struct FixedClock(SystemTime);

    impl Clock for FixedClock {
        fn now(&self) -> SystemTime {
            self.0
        }
    }

    const NOW_SECS: u64 = 1_700_000_000;

    fn policy() -> RetryPolicy {
        RetryPolicy::with_clock(
            RetryConfig::default(),
            Arc::new(FixedClock(UNIX_EPOCH + Duration::from_secs(NOW_SECS))),
        )
    }

    fn headers_with_reset(reset: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_RATE_RESET, HeaderValue::from_str(reset).unwrap());
        headers.insert(HEADER_RATE_LIMIT, HeaderValue::from_static("100"));
        headers
    }

    fn response(status: u16, headers: &HeaderMap) -> Outcome<'_> {
        Outcome::Response {
            status: StatusCode::from_u16(status).unwrap(),
            headers,
        }
    }

    #[test]
    fn test_retries_rate_limit_and_server_errors() {
        let policy = policy();
        let headers = HeaderMap::new();

        for status in [429, 500, 502, 503, 504] {
            assert!(policy.should_retry(&response(status, &headers)), "{status}");
        }
        for status in [200, 201, 202, 304, 400, 401, 404, 409] {
            assert!(!policy.should_retry(&response(status, &headers)), "{status}");
        }
    }

    #[test]
    fn test_transport_errors() {
        let policy = policy();
        assert!(policy.should_retry(&Outcome::TransportError { transient: true }));
        assert!(!policy.should_retry(&Outcome::TransportError { transient: false }));
    }

    #[test]
    fn test_rate_limit_waits_until_reset() {
        let policy = policy();
        let headers = headers_with_reset(&(NOW_SECS + 2).to_string());
        let jitter_window = policy.config().rate_limit_ceiling - policy.config().rate_limit_floor;

        for _ in 0..50 {
            let delay = policy.backoff(0, &response(429, &headers));
            assert!(delay >= Duration::from_secs(2), "{delay:?} is before the reset deadline");
            assert!(delay < Duration::from_secs(2) + jitter_window, "{delay:?} overshoots");
        }
    }

    #[test]
    fn test_rate_limit_past_or_missing_reset_uses_floor() {
        let policy = policy();
        let floor = policy.config().rate_limit_floor;
        let ceiling = policy.config().rate_limit_ceiling;

        for headers in [
            headers_with_reset(&(NOW_SECS - 10).to_string()),
            headers_with_reset("not-a-number"),
            headers_with_reset("0"),
            HeaderMap::new(),
        ] {
            let delay = policy.backoff(0, &response(429, &headers));
            assert!(delay >= floor && delay < ceiling, "{delay:?}");
        }
    }

    #[test]
    fn test_linear_backoff_grows_with_attempt() {
        let policy = policy();
        let headers = HeaderMap::new();

        for attempt in 0..4u32 {
            let delay = policy.backoff(attempt, &response(503, &headers));
            let factor = attempt + 1;
            assert!(delay >= Duration::from_millis(700) * factor, "{delay:?}");
            assert!(delay < Duration::from_millis(900) * factor, "{delay:?}");
        }
    }

    #[test]
    fn test_linear_backoff_without_window() {
        let config = RetryConfig::default()
            .with_linear_window(Duration::from_millis(50), Duration::from_millis(50));
        let policy = RetryPolicy::new(config);
        assert_eq!(policy.linear_backoff(0), Duration::from_millis(50));
        assert_eq!(policy.linear_backoff(2), Duration::from_millis(150));
    }

    #[test]
    fn test_header_parsing() {
        let headers = headers_with_reset(" 1700000002 ");
        assert_eq!(
            reset_deadline(&headers),
            Some(UNIX_EPOCH + Duration::from_secs(1_700_000_002))
        );
        assert_eq!(rate_limit(&headers), Some(100));
        assert_eq!(reset_deadline(&HeaderMap::new()), None);
        assert_eq!(reset_deadline(&headers_with_reset("-5")), None);
    }
}
