//! Live composition for one project.
//!
//! [`CompositionWatcher::spawn`] assembles the composition once, then
//! re-assembles it whenever an event that can change it arrives for the
//! project. The latest composition is published on a `watch` channel.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vstudio_core::composition::Composition;
use vstudio_core::types::DbId;

use crate::error::TimelineError;
use crate::service::TimelineService;

pub struct CompositionWatcher;

impl CompositionWatcher {
    /// Start watching `project_id`.
    ///
    /// The task exits when `cancel` fires, every receiver is dropped, or
    /// the event bus closes.
    pub async fn spawn(
        service: Arc<TimelineService>,
        project_id: DbId,
        cancel: CancellationToken,
    ) -> Result<(watch::Receiver<Composition>, JoinHandle<()>), TimelineError> {
        // Subscribe first so nothing between the initial load and the loop
        // is missed.
        let mut events = service.events().subscribe();
        let initial = service.load_composition(project_id).await?;
        let (sender, receiver) = watch::channel(initial);

        let handle = tokio::spawn(async move {
            loop {
                let refresh = tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sender.closed() => break,
                    received = events.recv() => match received {
                        Ok(event) => event.changes_composition_of(project_id),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(project_id, skipped, "Composition watcher lagged");
                            true
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                };

                if !refresh {
                    continue;
                }
                match service.load_composition(project_id).await {
                    Ok(composition) => {
                        sender.send_replace(composition);
                    }
                    Err(e) => {
                        tracing::warn!(project_id, error = %e, "Failed to reload composition");
                    }
                }
            }
            tracing::debug!(project_id, "Composition watcher stopped");
        });

        Ok((receiver, handle))
    }
}
