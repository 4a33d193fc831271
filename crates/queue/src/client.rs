//! The queue contract consumed by the job manager.

use async_trait::async_trait;
use serde_json::Value;
use vstudio_core::polling::QueueState;

use crate::api::{QueueApi, QueueApiError};

/// Errors from a [`QueueClient`].
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error(transparent)]
    Api(#[from] QueueApiError),

    /// The request failed on the queue side.
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Unexpected queue response: {0}")]
    InvalidResponse(String),
}

/// Submission, status and result retrieval for generation requests.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Queue a request and return its request id.
    async fn submit(&self, endpoint_id: &str, input: &Value) -> Result<String, QueueError>;

    async fn status(&self, endpoint_id: &str, request_id: &str) -> Result<QueueState, QueueError>;

    /// Result payload of a completed request. An `Err` means the
    /// generation failed.
    async fn result(&self, endpoint_id: &str, request_id: &str) -> Result<Value, QueueError>;
}

#[async_trait]
impl QueueClient for QueueApi {
    async fn submit(&self, endpoint_id: &str, input: &Value) -> Result<String, QueueError> {
        let response = QueueApi::submit(self, endpoint_id, input).await?;
        if response.request_id.is_empty() {
            return Err(QueueError::InvalidResponse(
                "submission returned an empty request id".into(),
            ));
        }
        tracing::debug!(endpoint_id, request_id = %response.request_id, "Queued request");
        Ok(response.request_id)
    }

    async fn status(&self, endpoint_id: &str, request_id: &str) -> Result<QueueState, QueueError> {
        let response = QueueApi::status(self, endpoint_id, request_id).await?;
        Ok(QueueState::from_wire(&response.status))
    }

    async fn result(&self, endpoint_id: &str, request_id: &str) -> Result<Value, QueueError> {
        let payload = QueueApi::result(self, endpoint_id, request_id).await?;
        if let Some(detail) = error_detail(&payload) {
            return Err(QueueError::Generation(detail));
        }
        Ok(payload)
    }
}

/// Error message carried inside a 2xx result body, if any.
fn error_detail(payload: &Value) -> Option<String> {
    let detail = payload.get("detail").or_else(|| payload.get("error"))?;
    if payload.as_object().is_some_and(|o| o.len() > 1) {
        return None;
    }
    Some(match detail {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
