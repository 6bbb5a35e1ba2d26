//! JSON over HTTP with retries for transient failures.

mod client;
mod retry;

pub use client::HttpClient;
pub use retry::{NonRetryableError, RetryPolicy, check_retryable, classify_error, is_retryable};
