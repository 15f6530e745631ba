//! OpenAI client configuration and retry policy.

use async_openai::error::OpenAIError;
use async_openai::{config::OpenAIConfig, Client};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Default timeout for OpenAI API requests (2 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of attempts for retryable API calls.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between attempts.
const BACKOFF_BASE_MS: u64 = 500;

/// Create an OpenAI client with the default timeout.
///
/// The API key is read from the `OPENAI_API_KEY` environment variable.
pub fn create_client() -> Client<OpenAIConfig> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom request timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client");

    Client::with_config(OpenAIConfig::default()).with_http_client(http_client)
}

/// Whether a failed API call is worth retrying.
///
/// Network failures, rate limits, and server-side errors are transient.
/// Auth and quota failures are not: retrying them burns attempts on a call
/// that can only succeed after operator intervention.
pub fn is_retryable(err: &OpenAIError) -> bool {
    match err {
        OpenAIError::Reqwest(_) => true,
        OpenAIError::ApiError(api) => matches!(
            api.r#type.as_deref(),
            Some("server_error") | Some("rate_limit_exceeded")
        ),
        _ => false,
    }
}

/// Run an OpenAI call with bounded retry and exponential backoff.
///
/// `op` is invoked up to `max_attempts` times; non-retryable errors are
/// returned immediately.
pub async fn with_retry<T, F, Fut>(
    max_attempts: u32,
    mut op: F,
) -> std::result::Result<T, OpenAIError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, OpenAIError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts.max(1) || !is_retryable(&e) {
                    return Err(e);
                }
                let delay = Duration::from_millis(BACKOFF_BASE_MS << (attempt - 1));
                warn!(
                    "OpenAI call failed (attempt {}/{}), retrying in {:?}: {}",
                    attempt, max_attempts, delay, e
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::ApiError;

    fn api_error(kind: &str) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: "boom".to_string(),
            r#type: Some(kind.to_string()),
            param: None,
            code: None,
        })
    }

    #[test]
    fn test_quota_and_auth_are_fatal() {
        assert!(!is_retryable(&api_error("insufficient_quota")));
        assert!(!is_retryable(&api_error("invalid_request_error")));
    }

    #[test]
    fn test_server_errors_are_retryable() {
        assert!(is_retryable(&api_error("server_error")));
        assert!(is_retryable(&api_error("rate_limit_exceeded")));
    }

    #[tokio::test]
    async fn test_with_retry_stops_on_fatal() {
        let mut calls = 0;
        let result: std::result::Result<(), _> = with_retry(3, || {
            calls += 1;
            async { Err(api_error("insufficient_quota")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_with_retry_retries_transient() {
        let mut calls = 0;
        let result: std::result::Result<(), _> = with_retry(3, || {
            calls += 1;
            async { Err(api_error("server_error")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_with_retry_returns_first_success() {
        let mut calls = 0;
        let result = with_retry(3, || {
            calls += 1;
            let ok = calls > 1;
            async move {
                if ok {
                    Ok(42)
                } else {
                    Err(api_error("server_error"))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 2);
    }
}
