//! Change notifications for studio projects.
//!
//! Job pollers publish media status changes, the timeline service publishes
//! track, keyframe and project edits, and composition watchers subscribe to
//! re-assemble the preview. Delivery is best effort: a watcher that falls
//! behind sees `RecvError::Lagged` and reloads from the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use vstudio_core::event_types::affects_composition;
use vstudio_core::types::DbId;

// ---------------------------------------------------------------------------
// StudioEvent
// ---------------------------------------------------------------------------

/// A change to one project: a media item moving through generation, or a
/// timeline edit. Names come from `vstudio_core::event_types`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioEvent {
    /// e.g. `"media.completed"`, `"keyframe.updated"`.
    pub event_type: String,

    pub project_id: DbId,

    /// `"media"`, `"track"`, `"keyframe"` or `"project"`.
    pub source_entity_type: Option<String>,

    pub source_entity_id: Option<DbId>,

    /// Media events carry `media_type` and `status`; keyframe events carry
    /// the track and timing.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl StudioEvent {
    pub fn new(event_type: impl Into<String>, project_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            project_id,
            source_entity_type: None,
            source_entity_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Whether a preview of `project_id` must be re-assembled after this
    /// event. Status-only media changes (submitted, running) never do.
    pub fn changes_composition_of(&self, project_id: DbId) -> bool {
        self.project_id == project_id && affects_composition(&self.event_type)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Room for bursts such as a cascade delete of a long track.
const DEFAULT_CAPACITY: usize = 1024;

/// Shared as `Arc<EventBus>` by the job manager, the timeline service and
/// the worker's event logger.
pub struct EventBus {
    sender: broadcast::Sender<StudioEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Fire and forget. With no watcher open the event is dropped; state
    /// is always re-read from the store, never from past events.
    pub fn publish(&self, event: StudioEvent) {
        let _ = self.sender.send(event);
    }

    /// Receive every event published from now on, for all projects.
    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
