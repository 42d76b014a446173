//! HTTP layer: status mapping, retry, body limits.
//!
//! This is the ONLY place for status code handling. client/mod.rs never
//! interprets status codes.

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::types::FetchConfig;

/// Failure of one download attempt.
#[derive(Debug)]
pub(crate) struct TransferError {
    pub(crate) message: String,
    retryable: bool,
    retry_after: Option<Duration>,
}

impl TransferError {
    fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
            retry_after: None,
        }
    }

    fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
            retry_after: None,
        }
    }
}

impl From<reqwest::Error> for TransferError {
    fn from(err: reqwest::Error) -> Self {
        let retryable = err.is_timeout() || err.is_connect() || err.is_request();
        Self {
            message: err.to_string(),
            retryable,
            retry_after: None,
        }
    }
}

/// HTTP backend (holds reqwest client and config).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) config: FetchConfig,
}

impl HttpBackend {
    /// GET `url`, retrying transient failures with jittered backoff.
    pub(crate) async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        let mut retries = 0;
        let max_retries = self.config.max_retries;

        loop {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.retryable && retries < max_retries => {
                    retries += 1;
                    let backoff = backoff_for(&e, retries);

                    warn!(
                        error = %e.message,
                        retry = retries,
                        max_retries = max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying download"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);

            let message = format!("HTTP {}", status.as_u16());
            return Err(TransferError {
                message,
                retryable: is_transient_status(status),
                retry_after,
            });
        }

        let limit = self.config.max_body_bytes;
        if let Some(len) = response.content_length() {
            if len > limit {
                return Err(TransferError::fatal(format!(
                    "response too large: {} bytes (limit {})",
                    len, limit
                )));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| TransferError::transient(format!("failed to read response body: {}", e)))?
        {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(TransferError::fatal(format!(
                    "response exceeds limit of {} bytes",
                    limit
                )));
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url, bytes = body.len(), "downloaded metadata");
        Ok(body)
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff_for(err: &TransferError, retries: u32) -> Duration {
    let thirty_sec = Duration::from_secs(30);
    match err.retry_after {
        Some(retry_after) => {
            let capped = retry_after.min(thirty_sec);
            let base_ms = capped.as_millis() as u64;
            let jitter_factor: f64 = rand::thread_rng().gen_range(0.9_f64..=1.1_f64);
            let jittered_ms = ((base_ms as f64) * jitter_factor).round() as u64;
            Duration::from_millis(jittered_ms.max(100))
        }
        None => {
            let base_backoff = Duration::from_secs(1u64 << retries.min(5)).min(thirty_sec);
            let jittered_ms = rand::thread_rng().gen_range(0..=base_backoff.as_millis() as u64);
            Duration::from_millis(jittered_ms.max(10))
        }
    }
}
