//! The entity store contract.
//!
//! Every operation is atomic on its own; there are no multi-entity
//! transactions. Callers that need cascades (deleting a media item and its
//! keyframes) issue the individual writes and tolerate partial completion.

use async_trait::async_trait;
use vstudio_core::error::CoreError;
use vstudio_core::media::MediaItem;
use vstudio_core::project::Project;
use vstudio_core::timeline::{Keyframe, Track};
use vstudio_core::types::DbId;

use crate::models::keyframe::{AppendKeyframe, CreateKeyframe, UpdateKeyframe};
use crate::models::media_item::{CreateMediaItem, UpdateMediaItem};
use crate::models::project::{CreateProject, UpdateProject};
use crate::models::track::CreateTrack;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid input: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StoreError {
    /// The referenced parent entity does not exist.
    pub fn missing(entity: &'static str, id: DbId) -> Self {
        Self::Core(CoreError::NotFound { entity, id })
    }
}

/// Keyed storage for the studio's four entity types.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // -- Projects --

    async fn create_project(&self, input: &CreateProject) -> Result<Project, StoreError>;

    async fn find_project(&self, id: DbId) -> Result<Option<Project>, StoreError>;

    /// Most recently created first.
    async fn list_projects(&self) -> Result<Vec<Project>, StoreError>;

    async fn update_project(
        &self,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, StoreError>;

    /// Delete a project together with its tracks, keyframes and media.
    async fn delete_project(&self, id: DbId) -> Result<bool, StoreError>;

    // -- Tracks --

    /// Fails if the project already has a track of `input.track_type`.
    async fn create_track(&self, input: &CreateTrack) -> Result<Track, StoreError>;

    /// The project's track of `input.track_type`, created from `input` when
    /// missing. The flag is `true` when this call created it.
    async fn find_or_create_track(&self, input: &CreateTrack)
        -> Result<(Track, bool), StoreError>;

    async fn find_track(&self, id: DbId) -> Result<Option<Track>, StoreError>;

    /// In canonical display order (video, music, voiceover).
    async fn tracks_by_project(&self, project_id: DbId) -> Result<Vec<Track>, StoreError>;

    // -- Keyframes --

    async fn create_keyframe(&self, input: &CreateKeyframe) -> Result<Keyframe, StoreError>;

    /// Place a keyframe one gap past the furthest end on its track. The
    /// position is read and written as one step.
    async fn append_keyframe(&self, input: &AppendKeyframe) -> Result<Keyframe, StoreError>;

    async fn find_keyframe(&self, id: DbId) -> Result<Option<Keyframe>, StoreError>;

    /// Sorted by timestamp.
    async fn keyframes_by_track(&self, track_id: DbId) -> Result<Vec<Keyframe>, StoreError>;

    async fn update_keyframe(
        &self,
        id: DbId,
        input: &UpdateKeyframe,
    ) -> Result<Option<Keyframe>, StoreError>;

    async fn delete_keyframe(&self, id: DbId) -> Result<bool, StoreError>;

    // -- Media --

    async fn create_media(&self, input: &CreateMediaItem) -> Result<MediaItem, StoreError>;

    async fn find_media(&self, id: DbId) -> Result<Option<MediaItem>, StoreError>;

    /// Newest first.
    async fn media_by_project(&self, project_id: DbId) -> Result<Vec<MediaItem>, StoreError>;

    async fn update_media(
        &self,
        id: DbId,
        input: &UpdateMediaItem,
    ) -> Result<Option<MediaItem>, StoreError>;

    async fn delete_media(&self, id: DbId) -> Result<bool, StoreError>;

    /// Generated items that are neither completed nor failed, oldest first.
    async fn list_in_flight(&self) -> Result<Vec<MediaItem>, StoreError>;
}
