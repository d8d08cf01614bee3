//! Retry policy for asset downloads.

use std::time::Duration;

use crate::error::DownloadError;

/// Maximum number of attempts for a download.
pub const MAX_RETRIES: usize = 3;

/// Delay before the first retry in milliseconds; doubles on each further retry.
pub const RETRY_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            initial_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        self.initial_delay.saturating_mul(1u32 << exponent)
    }
}

/// Checks if an error is worth another attempt.
///
/// Only [`DownloadError`]s that are transient qualify. Local failures such as
/// being unable to create the destination file are never retried.
pub fn is_retryable_error(e: &anyhow::Error) -> bool {
    match e.downcast_ref::<DownloadError>() {
        Some(download_error) => download_error.is_transient(),
        None => false,
    }
}
