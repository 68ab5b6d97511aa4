//! Retry policy for transient download failures: bounded attempts, exponential backoff.

use std::time::Duration;

use crate::utils::config::DownloadConsts;

/// How a failed attempt should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Timeouts, dropped connections, 5xx, 429: worth another attempt.
    Transient,
    /// 4xx (except 429), local I/O errors: retrying will not help.
    Permanent,
}

/// Decision after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration, retry: u32 },
    GiveUp,
}

/// `max_retries` extra attempts after the first one; the n-th retry waits
/// `base_delay * 2^(n-1)`, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(DownloadConsts::RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DownloadConsts::RETRY_MAX_DELAY_MS),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// `retries_done` is how many retries already happened for this item (0 after the first attempt).
    pub fn should_retry(&self, kind: FailureKind, retries_done: u32) -> RetryDecision {
        if kind == FailureKind::Permanent || retries_done >= self.max_retries {
            return RetryDecision::GiveUp;
        }
        let retry = retries_done + 1;
        RetryDecision::Retry {
            delay: self.delay_for(retry),
            retry,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(crate::utils::config::Defaults::MAX_RETRIES)
    }
}
