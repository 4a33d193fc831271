//! REST API client for the hosted generation queue.
//!
//! Wraps the queue's HTTP endpoints (submission, status, result) using
//! [`reqwest`]:
//!
//! | Call | Request |
//! |------|---------|
//! | submit | `POST {base}/{endpoint_id}` |
//! | status | `GET {base}/{app}/requests/{request_id}/status` |
//! | result | `GET {base}/{app}/requests/{request_id}` |
//!
//! `app` is the first two path segments of the endpoint id, so
//! `fal-ai/flux/dev` polls under `fal-ai/flux`.

use serde::Deserialize;

/// Default queue host.
pub const DEFAULT_BASE_URL: &str = "https://queue.fal.run";

/// HTTP client for the generation queue.
#[derive(Clone)]
pub struct QueueApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Response returned after successfully queuing a request.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Queue-assigned identifier for the request.
    pub request_id: String,
    #[serde(default)]
    pub status_url: Option<String>,
    #[serde(default)]
    pub response_url: Option<String>,
}

/// Response of the status endpoint.
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    /// `IN_QUEUE`, `IN_PROGRESS` or `COMPLETED`.
    pub status: String,
    #[serde(default)]
    pub queue_position: Option<u32>,
}

/// Errors from the queue REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum QueueApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The queue returned a non-2xx status code.
    #[error("Queue API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// The app part of an endpoint id: its first two path segments.
pub fn app_path(endpoint_id: &str) -> &str {
    let trimmed = endpoint_id.trim_matches('/');
    match trimmed.match_indices('/').nth(1) {
        Some((idx, _)) => &trimmed[..idx],
        None => trimmed,
    }
}

impl QueueApi {
    /// Create a client for the queue at `base_url`.
    ///
    /// * `api_key` - sent as `Authorization: Key <api_key>` when present.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Queue a request for `endpoint_id` with `input` as the JSON body.
    pub async fn submit(
        &self,
        endpoint_id: &str,
        input: &serde_json::Value,
    ) -> Result<SubmitResponse, QueueApiError> {
        let response = self
            .authorized(self.client.post(self.submit_url(endpoint_id)))
            .json(input)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the queue status of a request.
    pub async fn status(
        &self,
        endpoint_id: &str,
        request_id: &str,
    ) -> Result<StatusResponse, QueueApiError> {
        let url = format!("{}/status", self.request_url(endpoint_id, request_id));
        let response = self.authorized(self.client.get(url)).send().await?;

        Self::parse_response(response).await
    }

    /// Fetch the result payload of a completed request.
    ///
    /// A failed generation surfaces as [`QueueApiError::ApiError`].
    pub async fn result(
        &self,
        endpoint_id: &str,
        request_id: &str,
    ) -> Result<serde_json::Value, QueueApiError> {
        let response = self
            .authorized(self.client.get(self.request_url(endpoint_id, request_id)))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    pub fn submit_url(&self, endpoint_id: &str) -> String {
        format!("{}/{}", self.base_url, endpoint_id.trim_matches('/'))
    }

    pub fn request_url(&self, endpoint_id: &str, request_id: &str) -> String {
        format!(
            "{}/{}/requests/{}",
            self.base_url,
            app_path(endpoint_id),
            request_id
        )
    }

    // ---- private helpers ----

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(reqwest::header::AUTHORIZATION, format!("Key {key}")),
            None => request,
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`QueueApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, QueueApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(QueueApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, QueueApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
