//! Event type names published on the studio event bus.
//!
//! Shared by the job manager, the timeline service and anything watching
//! the bus.

/// A generated media item was submitted and persisted as pending.
pub const MEDIA_SUBMITTED: &str = "media.submitted";

/// An uploaded file was registered as a completed media item.
pub const MEDIA_UPLOADED: &str = "media.uploaded";

/// The queue reported a job as in progress.
pub const MEDIA_RUNNING: &str = "media.running";

/// A job finished and its output was stored.
pub const MEDIA_COMPLETED: &str = "media.completed";

/// A job failed or timed out.
pub const MEDIA_FAILED: &str = "media.failed";

/// Extracted metadata was merged into a media item.
pub const MEDIA_METADATA_UPDATED: &str = "media.metadata_updated";

/// A media item and its keyframes were deleted.
pub const MEDIA_DELETED: &str = "media.deleted";

pub const TRACK_CREATED: &str = "track.created";

pub const KEYFRAME_CREATED: &str = "keyframe.created";

/// A keyframe was moved or resized.
pub const KEYFRAME_UPDATED: &str = "keyframe.updated";

pub const KEYFRAME_DELETED: &str = "keyframe.deleted";

/// Project settings (e.g. aspect ratio) changed.
pub const PROJECT_UPDATED: &str = "project.updated";

/// Whether an event of `event_type` can change a project's composition.
pub fn affects_composition(event_type: &str) -> bool {
    matches!(
        event_type,
        MEDIA_COMPLETED
            | MEDIA_METADATA_UPDATED
            | MEDIA_DELETED
            | TRACK_CREATED
            | KEYFRAME_CREATED
            | KEYFRAME_UPDATED
            | KEYFRAME_DELETED
            | PROJECT_UPDATED
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_events_do_not_affect_composition() {
        assert!(!affects_composition(MEDIA_SUBMITTED));
        assert!(!affects_composition(MEDIA_RUNNING));
        assert!(!affects_composition(MEDIA_UPLOADED));
        assert!(affects_composition(KEYFRAME_UPDATED));
        assert!(affects_composition(MEDIA_DELETED));
    }
}
