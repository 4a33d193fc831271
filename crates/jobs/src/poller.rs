//! Polling of a single generation job.
//!
//! [`Poller::poll_once`] is one reconciliation cycle. [`Poller::run`] loops
//! cycles at the media type's cadence until the item is terminal, deleted,
//! timed out or the task is cancelled.

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use vstudio_core::event_types;
use vstudio_core::media::{MediaItem, MediaStatus, MediaType};
use vstudio_core::polling::{next_action, PollAction};
use vstudio_core::types::DbId;
use vstudio_db::models::media_item::UpdateMediaItem;
use vstudio_db::EntityStore;
use vstudio_events::{EventBus, StudioEvent};
use vstudio_queue::{MetadataExtractor, QueueClient};

use crate::config::JobConfig;
use crate::error::JobError;

/// Result of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Still queued or running.
    Pending,
    /// The item is completed or failed. No further polling.
    Finished(MediaStatus),
    /// The item no longer exists or has nothing to poll.
    Gone,
}

impl PollOutcome {
    pub fn is_final(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Reconciles persisted media items with the generation queue.
pub struct Poller {
    store: Arc<dyn EntityStore>,
    queue: Arc<dyn QueueClient>,
    metadata: Arc<dyn MetadataExtractor>,
    events: Arc<EventBus>,
    config: JobConfig,
}

impl Poller {
    pub fn new(
        store: Arc<dyn EntityStore>,
        queue: Arc<dyn QueueClient>,
        metadata: Arc<dyn MetadataExtractor>,
        events: Arc<EventBus>,
        config: JobConfig,
    ) -> Self {
        Self {
            store,
            queue,
            metadata,
            events,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<dyn QueueClient> {
        &self.queue
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Run one cycle for `media_id`.
    ///
    /// The item is always re-read from the store first. Terminal and
    /// deleted items cause no queue calls and no writes.
    pub async fn poll_once(&self, media_id: DbId) -> Result<PollOutcome, JobError> {
        let Some(item) = self.store.find_media(media_id).await? else {
            return Ok(PollOutcome::Gone);
        };
        if item.is_terminal() {
            return Ok(PollOutcome::Finished(item.status));
        }
        let Some((endpoint_id, request_id)) = item.queue_ref() else {
            return Ok(PollOutcome::Gone);
        };

        let state = self.queue.status(endpoint_id, request_id).await?;

        match next_action(item.status, state) {
            PollAction::Wait => Ok(PollOutcome::Pending),
            PollAction::MarkRunning => {
                self.set_status(&item, MediaStatus::Running).await?;
                Ok(PollOutcome::Pending)
            }
            PollAction::FetchResult => self.finish(&item).await,
        }
    }

    /// Poll `media_id` until it settles or `cancel` fires.
    ///
    /// Queue errors count as attempts. Once `max_poll_attempts` cycles pass
    /// without a terminal state the item is marked failed.
    pub async fn run(&self, media_id: DbId, media_type: MediaType, cancel: CancellationToken) {
        let interval = self.config.cadence.interval_for(media_type);
        let max_attempts = self.config.max_poll_attempts;
        let mut attempts: u32 = 0;

        tracing::debug!(
            media_id,
            interval_ms = interval.as_millis() as u64,
            "Poller started"
        );

        loop {
            if cancel.is_cancelled() {
                tracing::debug!(media_id, "Poller cancelled");
                return;
            }

            match self.poll_once(media_id).await {
                Ok(outcome) if outcome.is_final() => {
                    tracing::debug!(media_id, ?outcome, "Poller finished");
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(media_id, attempt = attempts + 1, error = %e, "Poll cycle failed");
                }
            }

            attempts += 1;
            if attempts >= max_attempts {
                self.time_out(media_id, attempts).await;
                return;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(media_id, "Poller cancelled");
                    return;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    // ---- private helpers ----

    /// Fetch the result and settle the item.
    async fn finish(&self, item: &MediaItem) -> Result<PollOutcome, JobError> {
        let Some((endpoint_id, request_id)) = item.queue_ref() else {
            return Ok(PollOutcome::Gone);
        };

        let output = match self.queue.result(endpoint_id, request_id).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(
                    media_id = item.id,
                    endpoint_id,
                    request_id,
                    error = %e,
                    "Generation failed"
                );
                self.set_status(item, MediaStatus::Failed).await?;
                return Ok(PollOutcome::Finished(MediaStatus::Failed));
            }
        };

        let Some(completed) = self
            .store
            .update_media(item.id, &UpdateMediaItem::completed(output))
            .await?
        else {
            return Ok(PollOutcome::Gone);
        };
        tracing::info!(media_id = item.id, endpoint_id, request_id, "Generation completed");
        self.publish(&completed, event_types::MEDIA_COMPLETED);

        if completed.media_type != MediaType::Image {
            self.enrich_metadata(&completed).await;
        }
        Ok(PollOutcome::Finished(MediaStatus::Completed))
    }

    /// Extract technical metadata for a completed item and merge it in.
    /// Returns the updated item.
    ///
    /// Failures are logged; the item stays completed without metadata.
    pub(crate) async fn enrich_metadata(&self, item: &MediaItem) -> Option<MediaItem> {
        let Some(url) = item.resolve_media_url() else {
            tracing::warn!(media_id = item.id, "Completed media has no url, skipping metadata");
            return None;
        };

        let extracted = match self.metadata.extract(url).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(media_id = item.id, error = %e, "Metadata extraction failed");
                return None;
            }
        };

        let mut metadata = item.metadata.clone().unwrap_or_default();
        metadata.merge(extracted);

        match self
            .store
            .update_media(item.id, &UpdateMediaItem::metadata(metadata))
            .await
        {
            Ok(Some(updated)) => {
                tracing::debug!(media_id = item.id, "Metadata stored");
                self.publish(&updated, event_types::MEDIA_METADATA_UPDATED);
                Some(updated)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!(media_id = item.id, error = %e, "Failed to store metadata");
                None
            }
        }
    }

    /// Write `status` unless the item already has it or may not move there.
    async fn set_status(&self, item: &MediaItem, status: MediaStatus) -> Result<(), JobError> {
        if item.status == status || !item.status.can_transition_to(status) {
            return Ok(());
        }
        if let Some(updated) = self
            .store
            .update_media(item.id, &UpdateMediaItem::status(status))
            .await?
        {
            let event_type = match status {
                MediaStatus::Running => event_types::MEDIA_RUNNING,
                MediaStatus::Completed => event_types::MEDIA_COMPLETED,
                MediaStatus::Failed => event_types::MEDIA_FAILED,
                MediaStatus::Pending => return Ok(()),
            };
            self.publish(&updated, event_type);
        }
        Ok(())
    }

    /// Mark an item failed after too many cycles, unless it settled
    /// meanwhile.
    async fn time_out(&self, media_id: DbId, attempts: u32) {
        let item = match self.store.find_media(media_id).await {
            Ok(Some(item)) if !item.is_terminal() => item,
            Ok(_) => return,
            Err(e) => {
                tracing::error!(media_id, error = %e, "Failed to load media for timeout");
                return;
            }
        };
        tracing::warn!(media_id, attempts, "Generation timed out");
        if let Err(e) = self.set_status(&item, MediaStatus::Failed).await {
            tracing::error!(media_id, error = %e, "Failed to mark timed-out media as failed");
        }
    }

    pub(crate) fn publish(&self, item: &MediaItem, event_type: &str) {
        self.events.publish(
            StudioEvent::new(event_type, item.project_id)
                .with_source("media", item.id)
                .with_payload(json!({
                    "media_type": item.media_type,
                    "status": item.status,
                })),
        );
    }
}
