//! Repository for the `tracks` table.

use sqlx::PgPool;
use vstudio_core::timeline::TrackType;
use vstudio_core::types::DbId;

use crate::models::track::{CreateTrack, TrackRow};

const COLUMNS: &str = "id, project_id, track_type, label, locked, created_at";

/// Provides create and lookup operations for tracks.
pub struct TrackRepo;

impl TrackRepo {
    /// Insert a new track, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateTrack) -> Result<TrackRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO tracks (project_id, track_type, label, locked)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TrackRow>(&query)
            .bind(input.project_id)
            .bind(input.track_type.as_str())
            .bind(&input.label)
            .bind(input.locked)
            .fetch_one(pool)
            .await
    }

    /// Insert the track unless the project already has one of its type.
    ///
    /// Returns `None` when `(project_id, track_type)` is taken.
    pub async fn create_if_absent(
        pool: &PgPool,
        input: &CreateTrack,
    ) -> Result<Option<TrackRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO tracks (project_id, track_type, label, locked)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (project_id, track_type) DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TrackRow>(&query)
            .bind(input.project_id)
            .bind(input.track_type.as_str())
            .bind(&input.label)
            .bind(input.locked)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_type(
        pool: &PgPool,
        project_id: DbId,
        track_type: TrackType,
    ) -> Result<Option<TrackRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tracks WHERE project_id = $1 AND track_type = $2");
        sqlx::query_as::<_, TrackRow>(&query)
            .bind(project_id)
            .bind(track_type.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TrackRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tracks WHERE id = $1");
        sqlx::query_as::<_, TrackRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a project's tracks in creation order.
    ///
    /// Canonical display ordering is applied by the caller.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<TrackRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tracks
             WHERE project_id = $1
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, TrackRow>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }
}
