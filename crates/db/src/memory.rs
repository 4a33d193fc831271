//! In-process [`EntityStore`] for tests and offline use.
//!
//! Mirrors the Postgres behaviour that callers rely on: sequential ids,
//! foreign-key checks on insert, one track per type, cascading project
//! deletes and the same list orderings.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use validator::Validate;
use vstudio_core::error::CoreError;
use vstudio_core::media::{MediaItem, MediaSource};
use vstudio_core::polling::needs_polling;
use vstudio_core::project::Project;
use vstudio_core::timeline::{append_after, sort_tracks, Keyframe, Track, TrackType};
use vstudio_core::types::DbId;

use crate::models::keyframe::{AppendKeyframe, CreateKeyframe, UpdateKeyframe};
use crate::models::media_item::{CreateMediaItem, UpdateMediaItem};
use crate::models::project::{CreateProject, UpdateProject};
use crate::models::track::CreateTrack;
use crate::store::{EntityStore, StoreError};

#[derive(Default)]
struct Tables {
    next_id: DbId,
    /// Bumped on every successful write.
    revision: u64,
    projects: HashMap<DbId, Project>,
    tracks: HashMap<DbId, Track>,
    keyframes: HashMap<DbId, Keyframe>,
    media: HashMap<DbId, MediaItem>,
}

impl Tables {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn track_of_type(&self, project_id: DbId, track_type: TrackType) -> Option<&Track> {
        self.tracks
            .values()
            .find(|tr| tr.project_id == project_id && tr.track_type == track_type)
    }

    fn insert_track(&mut self, input: &CreateTrack) -> Result<Track, StoreError> {
        if !self.projects.contains_key(&input.project_id) {
            return Err(StoreError::missing("Project", input.project_id));
        }
        let track = Track {
            id: self.allocate_id(),
            project_id: input.project_id,
            track_type: input.track_type,
            label: input.label.clone(),
            locked: input.locked,
        };
        self.tracks.insert(track.id, track.clone());
        self.touch();
        Ok(track)
    }

    fn insert_keyframe(&mut self, input: &CreateKeyframe) -> Result<Keyframe, StoreError> {
        if !self.tracks.contains_key(&input.track_id) {
            return Err(StoreError::missing("Track", input.track_id));
        }
        if !self.media.contains_key(&input.data.media_id) {
            return Err(StoreError::missing("MediaItem", input.data.media_id));
        }
        let keyframe = Keyframe {
            id: self.allocate_id(),
            track_id: input.track_id,
            timestamp: input.timestamp,
            duration: input.duration,
            data: input.data.clone(),
        };
        self.keyframes.insert(keyframe.id, keyframe.clone());
        self.touch();
        Ok(keyframe)
    }
}

/// Entity store backed by hash maps behind a `tokio::sync::RwLock`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes applied so far. Unchanged by reads and by
    /// operations that touch no row.
    pub async fn revision(&self) -> u64 {
        self.tables.read().await.revision
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create_project(&self, input: &CreateProject) -> Result<Project, StoreError> {
        input.validate()?;
        let mut t = self.tables.write().await;
        let project = Project {
            id: t.allocate_id(),
            title: input.title.clone(),
            description: input.description.clone(),
            aspect_ratio: input.aspect_ratio,
        };
        t.projects.insert(project.id, project.clone());
        t.touch();
        Ok(project)
    }

    async fn find_project(&self, id: DbId) -> Result<Option<Project>, StoreError> {
        Ok(self.tables.read().await.projects.get(&id).cloned())
    }

    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let t = self.tables.read().await;
        let mut projects: Vec<Project> = t.projects.values().cloned().collect();
        projects.sort_by_key(|p| std::cmp::Reverse(p.id));
        Ok(projects)
    }

    async fn update_project(
        &self,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, StoreError> {
        input.validate()?;
        let mut t = self.tables.write().await;
        let Some(project) = t.projects.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = &input.title {
            project.title = title.clone();
        }
        if let Some(description) = &input.description {
            project.description = description.clone();
        }
        if let Some(aspect_ratio) = input.aspect_ratio {
            project.aspect_ratio = aspect_ratio;
        }
        let updated = project.clone();
        t.touch();
        Ok(Some(updated))
    }

    async fn delete_project(&self, id: DbId) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        if t.projects.remove(&id).is_none() {
            return Ok(false);
        }
        let track_ids: Vec<DbId> = t
            .tracks
            .values()
            .filter(|tr| tr.project_id == id)
            .map(|tr| tr.id)
            .collect();
        t.keyframes.retain(|_, k| !track_ids.contains(&k.track_id));
        t.tracks.retain(|_, tr| tr.project_id != id);
        t.media.retain(|_, m| m.project_id != id);
        t.touch();
        Ok(true)
    }

    async fn create_track(&self, input: &CreateTrack) -> Result<Track, StoreError> {
        let mut t = self.tables.write().await;
        if t.track_of_type(input.project_id, input.track_type).is_some() {
            return Err(StoreError::Core(CoreError::Validation(format!(
                "project {} already has a {} track",
                input.project_id,
                input.track_type.as_str()
            ))));
        }
        t.insert_track(input)
    }

    async fn find_or_create_track(
        &self,
        input: &CreateTrack,
    ) -> Result<(Track, bool), StoreError> {
        let mut t = self.tables.write().await;
        if let Some(track) = t.track_of_type(input.project_id, input.track_type) {
            return Ok((track.clone(), false));
        }
        Ok((t.insert_track(input)?, true))
    }

    async fn find_track(&self, id: DbId) -> Result<Option<Track>, StoreError> {
        Ok(self.tables.read().await.tracks.get(&id).cloned())
    }

    async fn tracks_by_project(&self, project_id: DbId) -> Result<Vec<Track>, StoreError> {
        let t = self.tables.read().await;
        let mut tracks: Vec<Track> = t
            .tracks
            .values()
            .filter(|tr| tr.project_id == project_id)
            .cloned()
            .collect();
        sort_tracks(&mut tracks);
        Ok(tracks)
    }

    async fn create_keyframe(&self, input: &CreateKeyframe) -> Result<Keyframe, StoreError> {
        input.validate()?;
        self.tables.write().await.insert_keyframe(input)
    }

    async fn append_keyframe(&self, input: &AppendKeyframe) -> Result<Keyframe, StoreError> {
        input.validate()?;
        let mut t = self.tables.write().await;
        let max_end = t
            .keyframes
            .values()
            .filter(|k| k.track_id == input.track_id)
            .map(Keyframe::end)
            .max();
        t.insert_keyframe(&input.at(append_after(max_end)))
    }

    async fn find_keyframe(&self, id: DbId) -> Result<Option<Keyframe>, StoreError> {
        Ok(self.tables.read().await.keyframes.get(&id).cloned())
    }

    async fn keyframes_by_track(&self, track_id: DbId) -> Result<Vec<Keyframe>, StoreError> {
        let t = self.tables.read().await;
        let mut keyframes: Vec<Keyframe> = t
            .keyframes
            .values()
            .filter(|k| k.track_id == track_id)
            .cloned()
            .collect();
        keyframes.sort_by_key(|k| (k.timestamp, k.id));
        Ok(keyframes)
    }

    async fn update_keyframe(
        &self,
        id: DbId,
        input: &UpdateKeyframe,
    ) -> Result<Option<Keyframe>, StoreError> {
        input.validate()?;
        let mut t = self.tables.write().await;
        let Some(keyframe) = t.keyframes.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(timestamp) = input.timestamp {
            keyframe.timestamp = timestamp;
        }
        if let Some(duration) = input.duration {
            keyframe.duration = duration;
        }
        let updated = keyframe.clone();
        t.touch();
        Ok(Some(updated))
    }

    async fn delete_keyframe(&self, id: DbId) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        let removed = t.keyframes.remove(&id).is_some();
        if removed {
            t.touch();
        }
        Ok(removed)
    }

    async fn create_media(&self, input: &CreateMediaItem) -> Result<MediaItem, StoreError> {
        let mut t = self.tables.write().await;
        if !t.projects.contains_key(&input.project_id) {
            return Err(StoreError::missing("Project", input.project_id));
        }
        let item = MediaItem {
            id: t.allocate_id(),
            project_id: input.project_id,
            media_type: input.media_type,
            status: input.effective_status(),
            created_at: Utc::now(),
            source: input.source.clone(),
            metadata: input.metadata.clone(),
        };
        t.media.insert(item.id, item.clone());
        t.touch();
        Ok(item)
    }

    async fn find_media(&self, id: DbId) -> Result<Option<MediaItem>, StoreError> {
        Ok(self.tables.read().await.media.get(&id).cloned())
    }

    async fn media_by_project(&self, project_id: DbId) -> Result<Vec<MediaItem>, StoreError> {
        let t = self.tables.read().await;
        let mut items: Vec<MediaItem> = t
            .media
            .values()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    async fn update_media(
        &self,
        id: DbId,
        input: &UpdateMediaItem,
    ) -> Result<Option<MediaItem>, StoreError> {
        let mut t = self.tables.write().await;
        let Some(item) = t.media.get_mut(&id) else {
            return Ok(None);
        };
        if let (Some(status), MediaSource::Generated { .. }) = (input.status, &item.source) {
            item.status = status;
        }
        if let (Some(new_output), MediaSource::Generated { output, .. }) =
            (&input.output, &mut item.source)
        {
            *output = Some(new_output.clone());
        }
        if let Some(metadata) = &input.metadata {
            item.metadata = Some(metadata.clone());
        }
        let updated = item.clone();
        t.touch();
        Ok(Some(updated))
    }

    async fn delete_media(&self, id: DbId) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        let removed = t.media.remove(&id).is_some();
        if removed {
            // Same as the keyframes.media_id foreign key.
            t.keyframes.retain(|_, k| k.data.media_id != id);
            t.touch();
        }
        Ok(removed)
    }

    async fn list_in_flight(&self) -> Result<Vec<MediaItem>, StoreError> {
        let t = self.tables.read().await;
        let mut items: Vec<MediaItem> = t
            .media
            .values()
            .filter(|m| needs_polling(m))
            .cloned()
            .collect();
        items.sort_by_key(|m| (m.created_at, m.id));
        Ok(items)
    }
}
