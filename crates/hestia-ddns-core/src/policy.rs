//! Request pacing and retry policies for provider transports
//!
//! The reconciliation core only relies on "provider requests are paced and
//! transient failures are retried a bounded number of times". These types
//! describe how; transports such as the Cloudflare adapter apply them.

use crate::error::Error;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Random delay inserted before every outbound provider request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingPolicy {
    /// Lower bound of the delay (inclusive)
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the delay (inclusive)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl PacingPolicy {
    /// No delay at all (tests, local mocks)
    pub fn disabled() -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Validate the bounds
    pub fn validate(&self) -> Result<(), Error> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(Error::config(format!(
                "Pacing min delay ({}ms) exceeds max delay ({}ms)",
                self.min_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }

    /// Draw the next delay uniformly from the configured range
    pub fn next_delay(&self) -> Duration {
        if self.max_delay_ms <= self.min_delay_ms {
            return Duration::from_millis(self.min_delay_ms);
        }
        let ms = rand::rng().random_range(self.min_delay_ms..=self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Sleep for the next delay
    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_min_delay_ms() -> u64 {
    140
}

fn default_max_delay_ms() -> u64 {
    310
}

/// Bounded retry with exponential backoff for transient provider failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one; 1 disables retries
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the first retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for any single backoff
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// HTTP statuses treated as transient
    #[serde(default = "default_retryable_statuses")]
    pub retryable_statuses: Vec<u16>,
}

impl RetryPolicy {
    /// Single attempt, never retry
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_attempts == 0 {
            return Err(Error::config("Retry max_attempts must be at least 1"));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(Error::config(format!(
                "Retry initial backoff ({}ms) exceeds max backoff ({}ms)",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }

    /// Whether a failed attempt (0-based) should be followed by another
    pub fn should_retry(&self, error: &Error, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts && error.is_retryable(&self.retryable_statuses)
    }

    /// Backoff after the failed attempt `attempt` (0-based)
    ///
    /// Doubles from `initial_backoff_ms`, capped at `max_backoff_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.min(20);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1_u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            retryable_statuses: default_retryable_statuses(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

fn default_retryable_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pacing_delay_stays_in_bounds() {
        let pacing = PacingPolicy::default();
        for _ in 0..200 {
            let delay = pacing.next_delay();
            assert!(delay >= Duration::from_millis(140));
            assert!(delay <= Duration::from_millis(310));
        }
    }

    #[test]
    fn disabled_pacing_is_zero() {
        assert!(PacingPolicy::disabled().next_delay().is_zero());
    }

    #[test]
    fn inverted_pacing_bounds_are_rejected() {
        let pacing = PacingPolicy {
            min_delay_ms: 500,
            max_delay_ms: 100,
        };
        assert!(pacing.validate().is_err());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.backoff(0), Duration::from_millis(500));
        assert_eq!(retry.backoff(1), Duration::from_millis(1_000));
        assert_eq!(retry.backoff(2), Duration::from_millis(2_000));
        assert_eq!(retry.backoff(10), Duration::from_millis(8_000));
        assert_eq!(retry.backoff(u32::MAX), Duration::from_millis(8_000));
    }

    #[test]
    fn retries_stop_at_max_attempts() {
        let retry = RetryPolicy::default();
        let err = Error::http_status("cloudflare", 503, "unavailable");

        assert!(retry.should_retry(&err, 0));
        assert!(retry.should_retry(&err, 1));
        assert!(!retry.should_retry(&err, 2));
    }

    #[test]
    fn non_transient_errors_are_not_retried() {
        let retry = RetryPolicy::default();
        assert!(!retry.should_retry(&Error::http_status("cloudflare", 400, "bad"), 0));
        assert!(!retry.should_retry(&Error::auth("invalid token"), 0));
    }

    #[test]
    fn none_policy_never_retries() {
        let retry = RetryPolicy::none();
        assert!(!retry.should_retry(&Error::network("cloudflare", "reset"), 0));
    }

    #[test]
    fn zero_attempts_are_rejected() {
        let retry = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(retry.validate().is_err());
    }
}
