//! Repository for the `media_items` table.

use serde_json::Value;
use sqlx::PgPool;
use vstudio_core::media::MediaSource;
use vstudio_core::types::DbId;

use crate::models::media_item::{CreateMediaItem, MediaItemRow, UpdateMediaItem};
use crate::models::status::MediaStatusId;

const COLUMNS: &str = "\
    id, project_id, media_type, status_id, kind, endpoint_id, request_id, \
    input, output, url, metadata, created_at, updated_at";

/// Provides CRUD operations for media items.
pub struct MediaItemRepo;

impl MediaItemRepo {
    // ── Commands ─────────────────────────────────────────────────────

    /// Insert a new media item, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateMediaItem,
    ) -> Result<MediaItemRow, sqlx::Error> {
        let (endpoint_id, request_id, request_input, output, url) = match &input.source {
            MediaSource::Generated {
                endpoint_id,
                request_id,
                input,
                output,
            } => (
                Some(endpoint_id.as_str()),
                Some(request_id.as_str()),
                Some(input),
                output.as_ref(),
                None,
            ),
            MediaSource::Uploaded { url } => (None, None, None, None, Some(url.as_str())),
        };
        let metadata = input
            .metadata
            .as_ref()
            .and_then(|m| serde_json::to_value(m).ok());

        let query = format!(
            "INSERT INTO media_items
                (project_id, media_type, status_id, kind, endpoint_id, request_id,
                 input, output, url, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaItemRow>(&query)
            .bind(input.project_id)
            .bind(input.media_type.as_str())
            .bind(MediaStatusId::from(input.effective_status()).id())
            .bind(input.source.kind().as_str())
            .bind(endpoint_id)
            .bind(request_id)
            .bind(request_input)
            .bind(output)
            .bind(url)
            .bind(metadata)
            .fetch_one(pool)
            .await
    }

    /// Update status, output and metadata. Only non-`None` fields are
    /// applied; status and output are only written on generated rows.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateMediaItem,
    ) -> Result<Option<MediaItemRow>, sqlx::Error> {
        let metadata: Option<Value> = input
            .metadata
            .as_ref()
            .and_then(|m| serde_json::to_value(m).ok());

        let query = format!(
            "UPDATE media_items SET
                status_id = CASE WHEN kind = 'generated' THEN COALESCE($2, status_id) ELSE status_id END,
                output = CASE WHEN kind = 'generated' THEN COALESCE($3, output) ELSE output END,
                metadata = COALESCE($4, metadata),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaItemRow>(&query)
            .bind(id)
            .bind(input.status.map(|s| MediaStatusId::from(s).id()))
            .bind(&input.output)
            .bind(metadata)
            .fetch_optional(pool)
            .await
    }

    /// Delete a media item. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM media_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MediaItemRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM media_items WHERE id = $1");
        sqlx::query_as::<_, MediaItemRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a project's media, newest first.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<MediaItemRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_items
             WHERE project_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, MediaItemRow>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Generated items still pending or running, oldest first.
    pub async fn list_in_flight(pool: &PgPool) -> Result<Vec<MediaItemRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_items
             WHERE kind = 'generated' AND status_id IN ($1, $2)
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, MediaItemRow>(&query)
            .bind(MediaStatusId::Pending.id())
            .bind(MediaStatusId::Running.id())
            .fetch_all(pool)
            .await
    }
}
