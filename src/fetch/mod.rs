mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// How many times a request is attempted, and how long to wait between
/// attempts. The wait grows linearly: `backoff * attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// Server-side hiccups worth another attempt.
pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// GETs `url` and decodes the JSON body, retrying transport errors and
/// retryable statuses according to `retry`.
#[tracing::instrument(skip_all, fields(url = %url))]
pub async fn fetch_json<C: HttpClient, T: DeserializeOwned>(
    client: &C,
    url: &str,
    retry: &RetryPolicy,
) -> Result<T> {
    let parsed: reqwest::Url = url.parse().with_context(|| format!("invalid URL '{url}'"))?;
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let req = reqwest::Request::new(reqwest::Method::GET, parsed.clone());

        match client.execute(req).await {
            Ok(resp) if resp.status().is_success() => {
                debug!(attempt, "Request succeeded");
                return resp
                    .json::<T>()
                    .await
                    .with_context(|| format!("failed to decode JSON from {url}"));
            }
            Ok(resp) => {
                let status = resp.status();
                if is_retryable(status) && attempt < max_attempts {
                    warn!(attempt, status = %status, "Retryable status, backing off");
                } else {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(anyhow!("GET {url} returned status {status}: {body}"));
                }
            }
            Err(e) => {
                if attempt < max_attempts {
                    warn!(attempt, error = %e, "Request failed, backing off");
                } else {
                    return Err(e).with_context(|| format!("GET {url} failed after {attempt} attempts"));
                }
            }
        }

        tokio::time::sleep(retry.delay(attempt)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let retry = RetryPolicy {
            max_attempts: 4,
            backoff: Duration::from_millis(100),
        };
        assert_eq!(retry.delay(1), Duration::from_millis(100));
        assert_eq!(retry.delay(3), Duration::from_millis(300));
    }
}
