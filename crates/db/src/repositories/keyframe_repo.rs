//! Repository for the `keyframes` table.

use sqlx::PgPool;
use vstudio_core::timeline::append_after;
use vstudio_core::types::DbId;

use crate::models::keyframe::{AppendKeyframe, CreateKeyframe, KeyframeRow, UpdateKeyframe};

/// Column list for keyframes queries.
const COLUMNS: &str = "id, track_id, media_id, timestamp_ms, duration_ms, \
    kind, prompt, created_at, updated_at";

/// Provides CRUD operations for keyframes.
pub struct KeyframeRepo;

impl KeyframeRepo {
    /// Insert a new keyframe, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateKeyframe) -> Result<KeyframeRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO keyframes
                (track_id, media_id, timestamp_ms, duration_ms, kind, prompt)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, KeyframeRow>(&query)
            .bind(input.track_id)
            .bind(input.data.media_id)
            .bind(input.timestamp)
            .bind(input.duration)
            .bind(input.data.kind.as_str())
            .bind(&input.data.prompt)
            .fetch_one(pool)
            .await
    }

    /// Insert a keyframe one gap past the furthest end on its track.
    ///
    /// The track row is locked for the transaction, so concurrent appends
    /// to one track are serialized. Returns `None` if the track is gone.
    pub async fn append(
        pool: &PgPool,
        input: &AppendKeyframe,
    ) -> Result<Option<KeyframeRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let track: Option<DbId> =
            sqlx::query_scalar::<_, DbId>("SELECT id FROM tracks WHERE id = $1 FOR UPDATE")
                .bind(input.track_id)
                .fetch_optional(&mut *tx)
                .await?;
        if track.is_none() {
            return Ok(None);
        }

        let max_end = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(timestamp_ms + duration_ms) FROM keyframes WHERE track_id = $1",
        )
        .bind(input.track_id)
        .fetch_one(&mut *tx)
        .await?;
        let row = input.at(append_after(max_end));

        let query = format!(
            "INSERT INTO keyframes
                (track_id, media_id, timestamp_ms, duration_ms, kind, prompt)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let created = sqlx::query_as::<_, KeyframeRow>(&query)
            .bind(row.track_id)
            .bind(row.data.media_id)
            .bind(row.timestamp)
            .bind(row.duration)
            .bind(row.data.kind.as_str())
            .bind(&row.data.prompt)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(created))
    }

    /// Find a keyframe by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<KeyframeRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM keyframes WHERE id = $1");
        sqlx::query_as::<_, KeyframeRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List keyframes for a track, ordered by timestamp ascending.
    pub async fn list_for_track(
        pool: &PgPool,
        track_id: DbId,
    ) -> Result<Vec<KeyframeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM keyframes
             WHERE track_id = $1
             ORDER BY timestamp_ms ASC, id ASC"
        );
        sqlx::query_as::<_, KeyframeRow>(&query)
            .bind(track_id)
            .fetch_all(pool)
            .await
    }

    /// Update a keyframe's timing. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateKeyframe,
    ) -> Result<Option<KeyframeRow>, sqlx::Error> {
        let query = format!(
            "UPDATE keyframes SET
                timestamp_ms = COALESCE($2, timestamp_ms),
                duration_ms = COALESCE($3, duration_ms),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, KeyframeRow>(&query)
            .bind(id)
            .bind(input.timestamp)
            .bind(input.duration)
            .fetch_optional(pool)
            .await
    }

    /// Delete a keyframe. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM keyframes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
