//! Concrete HTTP transport (spec §6), grounded in
//! `neuron-provider-anthropic::Anthropic`'s client shape (builder,
//! `reqwest::Client`, status-to-error mapping) with the retry/backoff
//! policy of [`crate::retry`] layered on top.

use crate::mapping::{from_api_response, to_api_request};
use crate::redact::redact_data_uris;
use crate::retry::{with_retry, RetryPolicy};
use crate::transport::LlmTransport;
use async_trait::async_trait;
use rlm_types::{CompletionRequest, CompletionResponse, TransportError};

/// Chat-completions transport over a configurable base URL, retrying
/// transient failures per [`RetryPolicy`].
pub struct HttpTransport {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    retry_policy: RetryPolicy,
}

impl HttpTransport {
    /// Create a transport pointed at `base_url`, authenticating with
    /// `api_key`, using the default retry policy.
    #[must_use]
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<CompletionResponse, TransportError> {
        let url = self.completions_url();
        let body = to_api_request(request);

        tracing::debug!(
            url = %url,
            model = %request.model,
            body = %redact_data_uris(&body.to_string()),
            "sending completion request"
        );

        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body);
        if let Some(timeout_ms) = request.timeout_ms {
            builder = builder.timeout(std::time::Duration::from_millis(timeout_ms));
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let response_text = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(map_http_status(status, &response_text));
        }

        let json: serde_json::Value = serde_json::from_str(&response_text)
            .map_err(|e| TransportError::Other(format!("invalid JSON response: {e}")))?;
        from_api_response(&json)
    }
}

#[async_trait]
impl LlmTransport for HttpTransport {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, TransportError> {
        with_retry(&self.retry_policy, || self.send_once(&request)).await
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(std::time::Duration::from_secs(0))
    } else {
        TransportError::Network(error.to_string())
    }
}

/// Map an HTTP status code to the retryable/terminal split spec §6
/// requires: 429/502/503/504 are transient, everything else terminal.
fn map_http_status(status: reqwest::StatusCode, body: &str) -> TransportError {
    match status.as_u16() {
        401 | 403 => TransportError::Authentication(body.to_string()),
        429 => TransportError::RateLimited,
        502 | 503 | 504 => TransportError::Network(format!("upstream returned {status}: {body}")),
        _ => TransportError::Other(format!("http {status}: {body}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_status_codes_map_to_retryable_errors() {
        for code in [429, 502, 503, 504] {
            let status = reqwest::StatusCode::from_u16(code).unwrap();
            assert!(map_http_status(status, "").is_retryable());
        }
    }

    #[test]
    fn auth_failure_is_terminal() {
        let status = reqwest::StatusCode::from_u16(401).unwrap();
        assert!(!map_http_status(status, "").is_retryable());
    }

    #[test]
    fn completions_url_appends_path() {
        let transport = HttpTransport::new("key", "http://localhost:9999");
        assert_eq!(transport.completions_url(), "http://localhost:9999/chat/completions");
    }
}
