//! HTTP client module with redirect following, retry logic and error handling.

mod client;
mod retry;

pub use client::{HttpClient, MAX_REDIRECTS};
pub use retry::{MAX_RETRIES, RETRY_DELAY_MS, RetryPolicy, is_retryable_error};
