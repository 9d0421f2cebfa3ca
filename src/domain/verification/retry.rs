//! Retry policy for identifier verification

use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::service::VerificationError;

/// Default bound on verification attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Delay schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry immediately
    #[default]
    None,
    Fixed {
        delay_ms: u64,
    },
    Exponential {
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
    },
}

impl Backoff {
    /// Delay after the given failed attempt (1-indexed)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential {
                initial_delay_ms,
                max_delay_ms,
                multiplier,
            } => {
                let exponent = attempt.saturating_sub(1) as i32;
                let delay = initial_delay_ms as f64 * multiplier.powi(exponent);
                Duration::from_millis(delay.min(max_delay_ms as f64) as u64)
            }
        }
    }
}

/// Decides whether a failed attempt should be retried
pub type RetryPredicate = fn(&VerificationError) -> bool;

/// Every failure is retried
pub fn retry_all(_: &VerificationError) -> bool {
    true
}

/// Only transport failures and timeouts are retried
pub fn retry_transport_only(error: &VerificationError) -> bool {
    matches!(
        error,
        VerificationError::Transport(_) | VerificationError::Timeout(_)
    )
}

/// Bounded retry policy for verification calls
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    jitter: bool,
    attempt_timeout: Option<Duration>,
    retryable: RetryPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::None,
            jitter: false,
            attempt_timeout: None,
            retryable: retry_all,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("jitter", &self.jitter)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_retryable(mut self, retryable: RetryPredicate) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }

    pub fn is_retryable(&self, error: &VerificationError) -> bool {
        (self.retryable)(error)
    }

    /// Delay to wait after a failed attempt (1-indexed).
    ///
    /// With jitter the delay is drawn uniformly from the upper half of the
    /// scheduled delay.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let delay = self.backoff.delay_after(attempt);

        if !self.jitter || delay.is_zero() {
            return delay;
        }

        let millis = delay.as_millis() as u64;
        let half = millis / 2;
        let jittered = half + rand::thread_rng().gen_range(0..=millis - half);
        Duration::from_millis(jittered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 10);
        assert_eq!(policy.delay_after(1), Duration::ZERO);
        assert!(policy.is_retryable(&VerificationError::MalformedResponse("x".into())));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            multiplier: 2.0,
        };

        assert_eq!(backoff.delay_after(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_after(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_after(3), Duration::from_millis(400));
        assert_eq!(backoff.delay_after(10), Duration::from_millis(1000));
    }

    #[test]
    fn test_jitter_stays_within_upper_half() {
        let policy = RetryPolicy::new(3)
            .with_backoff(Backoff::Fixed { delay_ms: 200 })
            .with_jitter(true);

        for attempt in 1..20 {
            let delay = policy.delay_after(attempt);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(200));
        }
    }

    #[test]
    fn test_transport_only_predicate() {
        let policy = RetryPolicy::default().with_retryable(retry_transport_only);

        assert!(policy.is_retryable(&VerificationError::Transport("reset".into())));
        assert!(policy.is_retryable(&VerificationError::Timeout(500)));
        assert!(!policy.is_retryable(&VerificationError::MalformedResponse("{".into())));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
    }

    #[test]
    fn test_backoff_deserializes_tagged() {
        let backoff: Backoff =
            serde_json::from_str(r#"{"kind": "fixed", "delay_ms": 50}"#).unwrap();
        assert_eq!(backoff, Backoff::Fixed { delay_ms: 50 });
    }
}
