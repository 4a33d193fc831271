use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use vstudio_core::composition::{assemble, Composition};
use vstudio_core::editing::{EditGesture, KeyframeEdit, ResizeEdge, TimelineScale};
use vstudio_core::error::CoreError;
use vstudio_core::event_types;
use vstudio_core::media::{MediaItem, MediaStatus};
use vstudio_core::project::Project;
use vstudio_core::timeline::{
    ensure_compatible, initial_duration, Keyframe, KeyframeData, Track, TrackType,
};
use vstudio_core::types::DbId;
use vstudio_db::models::keyframe::{AppendKeyframe, UpdateKeyframe};
use vstudio_db::models::project::UpdateProject;
use vstudio_db::models::track::CreateTrack;
use vstudio_db::EntityStore;
use vstudio_events::{EventBus, StudioEvent};

use crate::error::TimelineError;

/// Timeline operations over an [`EntityStore`].
pub struct TimelineService {
    store: Arc<dyn EntityStore>,
    events: Arc<EventBus>,
}

impl TimelineService {
    pub fn new(store: Arc<dyn EntityStore>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    // ---- placement ----

    /// Append a completed media item to the track of its type, creating the
    /// track if the project has none yet.
    ///
    /// The keyframe starts just after the furthest end on the track and
    /// takes the media's own length, or 5 seconds when that is unknown.
    pub async fn add_to_track(&self, media_id: DbId) -> Result<Keyframe, TimelineError> {
        let media = self.media(media_id).await?;
        if media.status != MediaStatus::Completed {
            return Err(CoreError::MediaNotReady {
                id: media.id,
                status: media.status.as_str(),
            }
            .into());
        }

        let track = self
            .find_or_create_track(media.project_id, media.media_type.track_type())
            .await?;
        ensure_compatible(&track, &media)?;

        let input = AppendKeyframe {
            track_id: track.id,
            duration: initial_duration(&media),
            data: KeyframeData {
                media_id: media.id,
                kind: media.media_type.into(),
                prompt: media.prompt().map(str::to_string),
            },
        };
        let keyframe = self.store.append_keyframe(&input).await?;

        tracing::info!(
            keyframe_id = keyframe.id,
            track_id = track.id,
            media_id,
            timestamp = keyframe.timestamp,
            duration = keyframe.duration,
            "Media added to track"
        );
        self.publish(
            StudioEvent::new(event_types::KEYFRAME_CREATED, track.project_id)
                .with_source("keyframe", keyframe.id)
                .with_payload(json!({ "track_id": track.id, "media_id": media_id })),
        );
        Ok(keyframe)
    }

    /// The project's track of `track_type`, created locked and labelled
    /// after its type when missing.
    pub async fn find_or_create_track(
        &self,
        project_id: DbId,
        track_type: TrackType,
    ) -> Result<Track, TimelineError> {
        let (track, created) = self
            .store
            .find_or_create_track(&CreateTrack::for_type(project_id, track_type))
            .await?;
        if !created {
            return Ok(track);
        }
        tracing::debug!(track_id = track.id, project_id, track_type = track_type.as_str(), "Track created");
        self.publish(
            StudioEvent::new(event_types::TRACK_CREATED, project_id).with_source("track", track.id),
        );
        Ok(track)
    }

    // ---- edits ----

    /// Start dragging a keyframe along its track.
    pub async fn begin_move(
        &self,
        keyframe_id: DbId,
        scale: TimelineScale,
    ) -> Result<EditGesture, TimelineError> {
        let keyframe = self.keyframe(keyframe_id).await?;
        let siblings = self.store.keyframes_by_track(keyframe.track_id).await?;
        Ok(EditGesture::begin_move(&keyframe, &siblings, scale))
    }

    /// Start dragging one edge of a keyframe. The placed media's length
    /// caps the duration.
    pub async fn begin_resize(
        &self,
        keyframe_id: DbId,
        edge: ResizeEdge,
        scale: TimelineScale,
    ) -> Result<EditGesture, TimelineError> {
        let keyframe = self.keyframe(keyframe_id).await?;
        let siblings = self.store.keyframes_by_track(keyframe.track_id).await?;
        let media_max = self
            .store
            .find_media(keyframe.data.media_id)
            .await?
            .and_then(|m| m.resolve_duration_ms());
        Ok(EditGesture::begin_resize(
            &keyframe, &siblings, edge, media_max, scale,
        ))
    }

    /// Persist the result of a finished gesture.
    ///
    /// Returns `None` when the keyframe was deleted meanwhile.
    pub async fn commit_edit(&self, edit: &KeyframeEdit) -> Result<Option<Keyframe>, TimelineError> {
        let update = UpdateKeyframe {
            timestamp: Some(edit.timestamp),
            duration: Some(edit.duration),
        };
        let Some(keyframe) = self.store.update_keyframe(edit.keyframe_id, &update).await? else {
            tracing::debug!(keyframe_id = edit.keyframe_id, "Edited keyframe no longer exists");
            return Ok(None);
        };

        if let Some(project_id) = self.project_of_track(keyframe.track_id).await? {
            self.publish(
                StudioEvent::new(event_types::KEYFRAME_UPDATED, project_id)
                    .with_source("keyframe", keyframe.id)
                    .with_payload(json!({
                        "timestamp": keyframe.timestamp,
                        "duration": keyframe.duration,
                    })),
            );
        }
        Ok(Some(keyframe))
    }

    /// Change project settings such as the aspect ratio.
    pub async fn update_project(
        &self,
        project_id: DbId,
        input: &UpdateProject,
    ) -> Result<Project, TimelineError> {
        let project = self
            .store
            .update_project(project_id, input)
            .await?
            .ok_or_else(|| TimelineError::not_found("project", project_id))?;
        self.publish(
            StudioEvent::new(event_types::PROJECT_UPDATED, project_id)
                .with_source("project", project_id),
        );
        Ok(project)
    }

    // ---- deletes ----

    /// Remove one keyframe. Neighbors keep their positions and the media
    /// item is untouched.
    pub async fn delete_keyframe(&self, keyframe_id: DbId) -> Result<bool, TimelineError> {
        let Some(keyframe) = self.store.find_keyframe(keyframe_id).await? else {
            return Ok(false);
        };
        let project_id = self.project_of_track(keyframe.track_id).await?;

        let deleted = self.store.delete_keyframe(keyframe_id).await?;
        if let (true, Some(project_id)) = (deleted, project_id) {
            self.publish(
                StudioEvent::new(event_types::KEYFRAME_DELETED, project_id)
                    .with_source("keyframe", keyframe_id),
            );
        }
        Ok(deleted)
    }

    /// Delete a media item and every keyframe placing it, across all
    /// tracks of its project. Returns how many keyframes were removed.
    ///
    /// Keyframes go first, concurrently. A keyframe whose delete fails is
    /// logged and left to the store's own cascade.
    pub async fn delete_media_item(&self, media_id: DbId) -> Result<usize, TimelineError> {
        let media = self.media(media_id).await?;
        let tracks = self.store.tracks_by_project(media.project_id).await?;

        let mut placed = Vec::new();
        for track in &tracks {
            placed.extend(
                self.store
                    .keyframes_by_track(track.id)
                    .await?
                    .into_iter()
                    .filter(|k| k.data.media_id == media_id)
                    .map(|k| k.id),
            );
        }

        let results = join_all(placed.iter().map(|id| self.delete_keyframe(*id))).await;
        let mut removed = 0;
        for (keyframe_id, result) in placed.iter().zip(results) {
            match result {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(keyframe_id, media_id, error = %e, "Failed to delete keyframe");
                }
            }
        }

        if self.store.delete_media(media_id).await? {
            tracing::info!(media_id, keyframes = removed, "Media deleted");
            self.publish(
                StudioEvent::new(event_types::MEDIA_DELETED, media.project_id)
                    .with_source("media", media_id),
            );
        }
        Ok(removed)
    }

    // ---- composition ----

    /// Assemble the current composition of a project from storage.
    pub async fn load_composition(&self, project_id: DbId) -> Result<Composition, TimelineError> {
        let project = self
            .store
            .find_project(project_id)
            .await?
            .ok_or_else(|| TimelineError::not_found("project", project_id))?;
        let tracks = self.store.tracks_by_project(project_id).await?;

        let per_track = join_all(tracks.iter().map(|t| self.store.keyframes_by_track(t.id))).await;
        let mut keyframes = HashMap::with_capacity(tracks.len());
        for (track, result) in tracks.iter().zip(per_track) {
            keyframes.insert(track.id, result?);
        }

        let media: HashMap<DbId, MediaItem> = self
            .store
            .media_by_project(project_id)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        Ok(assemble(&project, &tracks, &keyframes, &media))
    }

    // ---- private helpers ----

    async fn media(&self, media_id: DbId) -> Result<MediaItem, TimelineError> {
        self.store
            .find_media(media_id)
            .await?
            .ok_or_else(|| TimelineError::not_found("media", media_id))
    }

    async fn keyframe(&self, keyframe_id: DbId) -> Result<Keyframe, TimelineError> {
        self.store
            .find_keyframe(keyframe_id)
            .await?
            .ok_or_else(|| TimelineError::not_found("keyframe", keyframe_id))
    }

    async fn project_of_track(&self, track_id: DbId) -> Result<Option<DbId>, TimelineError> {
        Ok(self
            .store
            .find_track(track_id)
            .await?
            .map(|t| t.project_id))
    }

    fn publish(&self, event: StudioEvent) {
        self.events.publish(event);
    }
}
