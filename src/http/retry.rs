//! Deciding whether a failed request is worth repeating.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// How often and how patiently a request is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, for callers that must fail fast.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Responses that will not change by asking again.
#[derive(Debug, Error)]
pub enum NonRetryableError {
    #[error("API rate limit exceeded ({0}). Try again later or set GITHUB_TOKEN")]
    RateLimitExceeded(StatusCode),

    #[error("authentication failed. Check GITHUB_TOKEN")]
    AuthenticationFailed,

    #[error("access forbidden, the request may need authentication")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request rejected with HTTP {0}")]
    ClientError(StatusCode),
}

/// `None` when the failure may be transient: server errors, timeouts and
/// connection problems.
pub fn classify_error(error: &reqwest::Error) -> Option<NonRetryableError> {
    let status = error.status()?;
    match status {
        StatusCode::UNAUTHORIZED => Some(NonRetryableError::AuthenticationFailed),
        StatusCode::FORBIDDEN if error.to_string().contains("rate limit") => {
            Some(NonRetryableError::RateLimitExceeded(status))
        }
        StatusCode::FORBIDDEN => Some(NonRetryableError::Forbidden),
        StatusCode::TOO_MANY_REQUESTS => Some(NonRetryableError::RateLimitExceeded(status)),
        StatusCode::NOT_FOUND => Some(NonRetryableError::NotFound(
            error
                .url()
                .map(|u| u.path().to_string())
                .unwrap_or_default(),
        )),
        s if s.is_client_error() => Some(NonRetryableError::ClientError(s)),
        _ => None,
    }
}

/// Wrap an error from `error_for_status()`, marking it non-retryable when
/// the status says so.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match classify_error(&error) {
        Some(non_retryable) => anyhow::Error::from(non_retryable),
        None => anyhow::Error::from(error),
    }
}

pub fn is_retryable(error: &anyhow::Error) -> bool {
    error.downcast_ref::<NonRetryableError>().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn status_error(status: usize) -> reqwest::Error {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/search/repositories")
            .with_status(status)
            .create_async()
            .await;

        reqwest::Client::new()
            .get(format!("{}/search/repositories", server.url()))
            .send()
            .await
            .unwrap()
            .error_for_status()
            .unwrap_err()
    }

    #[tokio::test]
    async fn test_client_errors_are_final() {
        assert!(matches!(
            classify_error(&status_error(401).await),
            Some(NonRetryableError::AuthenticationFailed)
        ));
        assert!(matches!(
            classify_error(&status_error(403).await),
            Some(NonRetryableError::Forbidden)
        ));
        assert!(matches!(
            classify_error(&status_error(429).await),
            Some(NonRetryableError::RateLimitExceeded(_))
        ));
        assert!(matches!(
            classify_error(&status_error(422).await),
            Some(NonRetryableError::ClientError(StatusCode::UNPROCESSABLE_ENTITY))
        ));
    }

    #[tokio::test]
    async fn test_not_found_names_the_path() {
        match classify_error(&status_error(404).await) {
            Some(NonRetryableError::NotFound(path)) => assert_eq!(path, "/search/repositories"),
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let err = check_retryable(status_error(503).await);
        assert!(is_retryable(&err));
    }

    #[test]
    fn test_rate_limit_message_mentions_token() {
        let err = NonRetryableError::RateLimitExceeded(StatusCode::TOO_MANY_REQUESTS);
        assert!(err.to_string().contains("GITHUB_TOKEN"));
    }
}
