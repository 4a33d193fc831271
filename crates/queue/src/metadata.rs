//! Media metadata extraction (duration, fps, resolution, frame stills).
//!
//! [`QueueMetadataExtractor`] runs the extraction endpoint as an ordinary
//! queue job and waits for it with exponential backoff. The result's
//! `media` field holds the metadata.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use vstudio_core::endpoints::METADATA_ENDPOINT;
use vstudio_core::media::MediaMetadata;
use vstudio_core::polling::QueueState;

use crate::backoff::{next_delay, BackoffConfig};
use crate::client::{QueueClient, QueueError};

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Metadata extraction did not finish after {attempts} attempts")]
    TimedOut { attempts: u32 },

    #[error("Metadata result has no 'media' field")]
    MissingMedia,
}

/// Extracts technical metadata from a media file.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, media_url: &str) -> Result<MediaMetadata, MetadataError>;
}

/// Metadata extraction through a queue endpoint.
pub struct QueueMetadataExtractor {
    queue: Arc<dyn QueueClient>,
    endpoint_id: String,
    backoff: BackoffConfig,
}

impl QueueMetadataExtractor {
    pub fn new(queue: Arc<dyn QueueClient>) -> Self {
        Self::with_endpoint(queue, METADATA_ENDPOINT)
    }

    pub fn with_endpoint(queue: Arc<dyn QueueClient>, endpoint_id: impl Into<String>) -> Self {
        Self {
            queue,
            endpoint_id: endpoint_id.into(),
            backoff: BackoffConfig::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    async fn wait_for_completion(&self, request_id: &str) -> Result<(), MetadataError> {
        let mut delay = self.backoff.initial_delay;
        for attempt in 1..=self.backoff.max_attempts {
            match self.queue.status(&self.endpoint_id, request_id).await? {
                QueueState::Completed => return Ok(()),
                QueueState::Queued | QueueState::InProgress => {
                    tracing::trace!(request_id, attempt, "Metadata extraction pending");
                }
            }
            tokio::time::sleep(delay).await;
            delay = next_delay(delay, &self.backoff);
        }
        Err(MetadataError::TimedOut {
            attempts: self.backoff.max_attempts,
        })
    }
}

#[async_trait]
impl MetadataExtractor for QueueMetadataExtractor {
    async fn extract(&self, media_url: &str) -> Result<MediaMetadata, MetadataError> {
        let input = json!({ "media_url": media_url, "extract_frames": true });
        let request_id = self.queue.submit(&self.endpoint_id, &input).await?;

        self.wait_for_completion(&request_id).await?;

        let result = self.queue.result(&self.endpoint_id, &request_id).await?;
        let media = match result {
            Value::Object(mut fields) => fields.remove("media"),
            _ => None,
        }
        .ok_or(MetadataError::MissingMedia)?;

        Ok(MediaMetadata::from_value(media))
    }
}
