//! Keyed set of polling tasks for in-flight generation jobs.
//!
//! [`JobManager`] owns one Tokio task per tracked media item. Each task has
//! a child token of the manager's master [`CancellationToken`], so a single
//! item, a whole project, or everything can be stopped. Tasks remove
//! themselves from the map when their item settles.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use vstudio_core::endpoints::GenerateRequest;
use vstudio_core::error::CoreError;
use vstudio_core::event_types;
use vstudio_core::media::{MediaItem, MediaType};
use vstudio_core::polling::needs_polling;
use vstudio_core::types::DbId;
use vstudio_db::models::media_item::CreateMediaItem;
use vstudio_events::StudioEvent;

use crate::error::JobError;
use crate::poller::Poller;

/// How long [`JobManager::shutdown`] waits for each task.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Submits generation requests and tracks them to completion.
pub struct JobManager {
    poller: Arc<Poller>,
    /// Active polling tasks indexed by media id.
    pollers: Arc<RwLock<HashMap<DbId, ManagedPoller>>>,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
    next_generation: std::sync::atomic::AtomicU64,
}

/// Bookkeeping for a single polling task.
struct ManagedPoller {
    project_id: DbId,
    /// Distinguishes a re-registration from the task it replaced.
    generation: u64,
    task_handle: tokio::task::JoinHandle<()>,
    /// Per-item cancellation token (child of the master token).
    cancel: CancellationToken,
}

impl JobManager {
    pub fn new(poller: Poller) -> Arc<Self> {
        Arc::new(Self {
            poller: Arc::new(poller),
            pollers: Arc::new(RwLock::new(HashMap::new())),
            cancel: CancellationToken::new(),
            next_generation: std::sync::atomic::AtomicU64::new(0),
        })
    }

    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    /// Submit a generation request and start tracking it.
    ///
    /// `request.input` is sent and stored as is; endpoint defaults and key
    /// renames belong to [`build_input`](vstudio_core::endpoints::build_input).
    /// When the queue rejects the request nothing is persisted.
    pub async fn submit(
        &self,
        project_id: DbId,
        request: &GenerateRequest,
    ) -> Result<MediaItem, JobError> {
        let store = self.poller.store();
        if store.find_project(project_id).await?.is_none() {
            return Err(JobError::ProjectNotFound(project_id));
        }

        let input = request.input.clone();
        let request_id = self
            .poller
            .queue()
            .submit(&request.endpoint_id, &input)
            .await
            .map_err(JobError::Submit)?;

        let item = store
            .create_media(&CreateMediaItem::generated(
                project_id,
                request.media_type,
                &request.endpoint_id,
                &request_id,
                input,
            ))
            .await?;

        tracing::info!(
            media_id = item.id,
            project_id,
            endpoint_id = %request.endpoint_id,
            request_id = %request_id,
            "Generation submitted"
        );
        self.poller.events().publish(
            StudioEvent::new(event_types::MEDIA_SUBMITTED, project_id)
                .with_source("media", item.id)
                .with_payload(json!({
                    "media_type": item.media_type,
                    "endpoint_id": request.endpoint_id,
                })),
        );

        self.track(&item).await;
        Ok(item)
    }

    /// Register an uploaded file as a completed media item.
    ///
    /// The media type comes from the file's MIME type (`audio/*` becomes
    /// music). Video and audio uploads then go through metadata extraction
    /// so they are placed and resized at their natural length; an
    /// extraction failure leaves the item without metadata.
    pub async fn register_upload(
        &self,
        project_id: DbId,
        mime_type: &str,
        url: &str,
    ) -> Result<MediaItem, JobError> {
        let media_type = MediaType::from_mime(mime_type)?;
        let url = url.trim();
        if url.is_empty() {
            return Err(CoreError::Validation("Upload url must not be empty".into()).into());
        }

        let store = self.poller.store();
        if store.find_project(project_id).await?.is_none() {
            return Err(JobError::ProjectNotFound(project_id));
        }

        let item = store
            .create_media(&CreateMediaItem::uploaded(project_id, media_type, url))
            .await?;
        tracing::info!(
            media_id = item.id,
            project_id,
            media_type = media_type.as_str(),
            "Upload registered"
        );
        self.poller.publish(&item, event_types::MEDIA_UPLOADED);

        if media_type == MediaType::Image {
            return Ok(item);
        }
        Ok(self.poller.enrich_metadata(&item).await.unwrap_or(item))
    }

    /// Start polling `item` unless it is already tracked, settled, not a
    /// generated item, or the manager is shut down.
    ///
    /// Returns whether a new task was started.
    pub async fn track(&self, item: &MediaItem) -> bool {
        if !needs_polling(item) || self.cancel.is_cancelled() {
            return false;
        }

        let mut pollers = self.pollers.write().await;
        if pollers.contains_key(&item.id) {
            return false;
        }

        let media_id = item.id;
        let media_type = item.media_type;
        let generation = self
            .next_generation
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let item_cancel = self.cancel.child_token();
        let cancel_clone = item_cancel.clone();
        let poller = Arc::clone(&self.poller);
        let registry = Arc::clone(&self.pollers);

        let task_handle = tokio::spawn(async move {
            poller.run(media_id, media_type, cancel_clone).await;

            let mut pollers = registry.write().await;
            if pollers
                .get(&media_id)
                .is_some_and(|p| p.generation == generation)
            {
                pollers.remove(&media_id);
            }
        });

        pollers.insert(
            media_id,
            ManagedPoller {
                project_id: item.project_id,
                generation,
                task_handle,
                cancel: item_cancel,
            },
        );
        true
    }

    /// Re-track every in-flight generated item. Returns how many tasks
    /// were started.
    pub async fn resume(&self) -> Result<usize, JobError> {
        let items = self.poller.store().list_in_flight().await?;
        let mut started = 0;
        for item in &items {
            if self.track(item).await {
                started += 1;
            }
        }
        tracing::info!(in_flight = items.len(), started, "Resumed polling");
        Ok(started)
    }

    /// Stop polling one item. Its persisted state is left as is.
    pub async fn stop(&self, media_id: DbId) -> bool {
        match self.pollers.write().await.remove(&media_id) {
            Some(managed) => {
                managed.cancel.cancel();
                tracing::debug!(media_id, "Poller stopped");
                true
            }
            None => false,
        }
    }

    /// Stop polling every item of a project. Returns how many were stopped.
    pub async fn stop_project(&self, project_id: DbId) -> usize {
        let mut pollers = self.pollers.write().await;
        let ids: Vec<DbId> = pollers
            .iter()
            .filter(|(_, p)| p.project_id == project_id)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            if let Some(managed) = pollers.remove(id) {
                managed.cancel.cancel();
            }
        }
        tracing::debug!(project_id, stopped = ids.len(), "Project pollers stopped");
        ids.len()
    }

    pub async fn is_tracking(&self, media_id: DbId) -> bool {
        self.pollers.read().await.contains_key(&media_id)
    }

    pub async fn active_count(&self) -> usize {
        self.pollers.read().await.len()
    }

    /// Cancel every task and wait up to 5 seconds per task for it to exit.
    /// Later `track` calls are ignored.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down job manager");
        self.cancel.cancel();

        let drained: Vec<(DbId, ManagedPoller)> = self.pollers.write().await.drain().collect();
        for (media_id, managed) in drained {
            managed.cancel.cancel();
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, managed.task_handle)
                .await
                .is_err()
            {
                tracing::warn!(media_id, "Poller did not stop in time");
            }
        }

        tracing::info!("Job manager shut down complete");
    }
}
