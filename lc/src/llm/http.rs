//! Shared HTTP plumbing for the provider clients

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::LlmError;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504 | 529)
}

/// Backoff before the given retry attempt (1-based)
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt.saturating_sub(1)))
}

/// Seconds from a `retry-after` header, 60 when absent or unparseable
fn retry_after(response: &Response) -> Duration {
    let secs = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(60);
    Duration::from_secs(secs)
}

pub(crate) fn build_http(timeout: Duration) -> Result<Client, LlmError> {
    Client::builder().timeout(timeout).build().map_err(LlmError::Network)
}

/// POST a JSON body, retrying transient failures with exponential backoff
///
/// `request` builds a fresh request for each attempt. A 429 is returned
/// immediately as [`LlmError::RateLimited`].
pub(crate) async fn post_json<T, F>(request: F) -> Result<T, LlmError>
where
    T: DeserializeOwned,
    F: Fn() -> RequestBuilder,
{
    let mut last_error = None;
    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let delay = backoff(attempt);
            warn!(attempt, backoff_ms = delay.as_millis() as u64, "post_json: retrying after transient error");
            tokio::time::sleep(delay).await;
        }

        let response = match request().send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(attempt, error = %e, "post_json: network error");
                last_error = Some(LlmError::Network(e));
                continue;
            }
        };

        let status = response.status().as_u16();

        if status == 429 {
            debug!("post_json: rate limited (429)");
            return Err(LlmError::RateLimited {
                retry_after: retry_after(&response),
            });
        }

        if is_retryable_status(status) && attempt < MAX_RETRIES {
            let text = response.text().await.unwrap_or_default();
            debug!(attempt, status, "post_json: retryable error");
            last_error = Some(LlmError::ApiError { status, message: text });
            continue;
        }

        if !response.status().is_success() {
            debug!(%status, "post_json: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message: text });
        }

        debug!("post_json: success");
        let text = response.text().await?;
        return serde_json::from_str(&text).map_err(|e| LlmError::InvalidResponse(format!("{}: {}", e, text)));
    }

    Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
}
