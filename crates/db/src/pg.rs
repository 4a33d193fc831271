//! PostgreSQL-backed [`EntityStore`].

use async_trait::async_trait;
use validator::Validate;
use vstudio_core::media::MediaItem;
use vstudio_core::project::Project;
use vstudio_core::timeline::{sort_tracks, Keyframe, Track};
use vstudio_core::types::DbId;

use crate::models::keyframe::{AppendKeyframe, CreateKeyframe, UpdateKeyframe};
use crate::models::media_item::{CreateMediaItem, UpdateMediaItem};
use crate::models::project::{CreateProject, UpdateProject};
use crate::models::track::CreateTrack;
use crate::repositories::{KeyframeRepo, MediaItemRepo, ProjectRepo, TrackRepo};
use crate::store::{EntityStore, StoreError};
use crate::DbPool;

/// Entity store over a Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Convert every row, failing on the first corrupt one.
fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = vstudio_core::error::CoreError>,
{
    rows.into_iter()
        .map(|row| T::try_from(row).map_err(StoreError::from))
        .collect()
}

fn convert_opt<R, T>(row: Option<R>) -> Result<Option<T>, StoreError>
where
    T: TryFrom<R, Error = vstudio_core::error::CoreError>,
{
    row.map(T::try_from).transpose().map_err(StoreError::from)
}

#[async_trait]
impl EntityStore for PgStore {
    async fn create_project(&self, input: &CreateProject) -> Result<Project, StoreError> {
        input.validate()?;
        let row = ProjectRepo::create(&self.pool, input).await?;
        Ok(Project::try_from(row)?)
    }

    async fn find_project(&self, id: DbId) -> Result<Option<Project>, StoreError> {
        convert_opt(ProjectRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        convert_all(ProjectRepo::list(&self.pool).await?)
    }

    async fn update_project(
        &self,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, StoreError> {
        input.validate()?;
        convert_opt(ProjectRepo::update(&self.pool, id, input).await?)
    }

    async fn delete_project(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(ProjectRepo::delete(&self.pool, id).await?)
    }

    async fn create_track(&self, input: &CreateTrack) -> Result<Track, StoreError> {
        let row = TrackRepo::create(&self.pool, input).await?;
        Ok(Track::try_from(row)?)
    }

    async fn find_or_create_track(
        &self,
        input: &CreateTrack,
    ) -> Result<(Track, bool), StoreError> {
        if let Some(row) =
            TrackRepo::find_by_type(&self.pool, input.project_id, input.track_type).await?
        {
            return Ok((Track::try_from(row)?, false));
        }
        if let Some(row) = TrackRepo::create_if_absent(&self.pool, input).await? {
            return Ok((Track::try_from(row)?, true));
        }
        // Lost the insert race; the winner's row is there now.
        let row = TrackRepo::find_by_type(&self.pool, input.project_id, input.track_type)
            .await?
            .ok_or_else(|| StoreError::missing("Project", input.project_id))?;
        Ok((Track::try_from(row)?, false))
    }

    async fn find_track(&self, id: DbId) -> Result<Option<Track>, StoreError> {
        convert_opt(TrackRepo::find_by_id(&self.pool, id).await?)
    }

    async fn tracks_by_project(&self, project_id: DbId) -> Result<Vec<Track>, StoreError> {
        let mut tracks: Vec<Track> =
            convert_all(TrackRepo::list_for_project(&self.pool, project_id).await?)?;
        sort_tracks(&mut tracks);
        Ok(tracks)
    }

    async fn create_keyframe(&self, input: &CreateKeyframe) -> Result<Keyframe, StoreError> {
        input.validate()?;
        let row = KeyframeRepo::create(&self.pool, input).await?;
        Ok(Keyframe::try_from(row)?)
    }

    async fn append_keyframe(&self, input: &AppendKeyframe) -> Result<Keyframe, StoreError> {
        input.validate()?;
        let row = KeyframeRepo::append(&self.pool, input)
            .await?
            .ok_or_else(|| StoreError::missing("Track", input.track_id))?;
        Ok(Keyframe::try_from(row)?)
    }

    async fn find_keyframe(&self, id: DbId) -> Result<Option<Keyframe>, StoreError> {
        convert_opt(KeyframeRepo::find_by_id(&self.pool, id).await?)
    }

    async fn keyframes_by_track(&self, track_id: DbId) -> Result<Vec<Keyframe>, StoreError> {
        convert_all(KeyframeRepo::list_for_track(&self.pool, track_id).await?)
    }

    async fn update_keyframe(
        &self,
        id: DbId,
        input: &UpdateKeyframe,
    ) -> Result<Option<Keyframe>, StoreError> {
        input.validate()?;
        convert_opt(KeyframeRepo::update(&self.pool, id, input).await?)
    }

    async fn delete_keyframe(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(KeyframeRepo::delete(&self.pool, id).await?)
    }

    async fn create_media(&self, input: &CreateMediaItem) -> Result<MediaItem, StoreError> {
        let row = MediaItemRepo::create(&self.pool, input).await?;
        Ok(MediaItem::try_from(row)?)
    }

    async fn find_media(&self, id: DbId) -> Result<Option<MediaItem>, StoreError> {
        convert_opt(MediaItemRepo::find_by_id(&self.pool, id).await?)
    }

    async fn media_by_project(&self, project_id: DbId) -> Result<Vec<MediaItem>, StoreError> {
        convert_all(MediaItemRepo::list_for_project(&self.pool, project_id).await?)
    }

    async fn update_media(
        &self,
        id: DbId,
        input: &UpdateMediaItem,
    ) -> Result<Option<MediaItem>, StoreError> {
        convert_opt(MediaItemRepo::update(&self.pool, id, input).await?)
    }

    async fn delete_media(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(MediaItemRepo::delete(&self.pool, id).await?)
    }

    async fn list_in_flight(&self) -> Result<Vec<MediaItem>, StoreError> {
        convert_all(MediaItemRepo::list_in_flight(&self.pool).await?)
    }
}
