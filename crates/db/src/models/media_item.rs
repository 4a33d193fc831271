//! Media item models and DTOs.
//!
//! The generated/uploaded split of [`MediaSource`] is stored as a `kind`
//! column plus nullable per-kind columns; a CHECK constraint keeps the
//! required columns of each kind non-null.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use vstudio_core::error::CoreError;
use vstudio_core::media::{MediaItem, MediaKind, MediaMetadata, MediaSource, MediaStatus, MediaType};
use vstudio_core::types::{DbId, Timestamp};

use crate::models::status::{media_status, StatusId};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A media row from the `media_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MediaItemRow {
    pub id: DbId,
    pub project_id: DbId,
    pub media_type: String,
    pub status_id: StatusId,
    pub kind: String,
    pub endpoint_id: Option<String>,
    pub request_id: Option<String>,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub url: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<MediaItemRow> for MediaItem {
    type Error = CoreError;

    fn try_from(row: MediaItemRow) -> Result<Self, Self::Error> {
        let source = match MediaKind::from_name(&row.kind)? {
            MediaKind::Generated => MediaSource::Generated {
                endpoint_id: row.endpoint_id.ok_or_else(|| missing(row.id, "endpoint_id"))?,
                request_id: row.request_id.ok_or_else(|| missing(row.id, "request_id"))?,
                input: row.input.unwrap_or(Value::Null),
                output: row.output,
            },
            MediaKind::Uploaded => MediaSource::Uploaded {
                url: row.url.ok_or_else(|| missing(row.id, "url"))?,
            },
        };

        Ok(MediaItem {
            id: row.id,
            project_id: row.project_id,
            media_type: MediaType::from_name(&row.media_type)?,
            status: media_status(row.status_id)?,
            created_at: row.created_at,
            source,
            metadata: row.metadata.map(MediaMetadata::from_value),
        })
    }
}

fn missing(id: DbId, column: &str) -> CoreError {
    CoreError::Corrupt(format!("media item {id} has no {column}"))
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Input for creating a media item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMediaItem {
    pub project_id: DbId,
    pub media_type: MediaType,
    pub status: MediaStatus,
    pub source: MediaSource,
    pub metadata: Option<MediaMetadata>,
}

impl CreateMediaItem {
    /// A freshly submitted generation job, pending until polled.
    pub fn generated(
        project_id: DbId,
        media_type: MediaType,
        endpoint_id: impl Into<String>,
        request_id: impl Into<String>,
        input: Value,
    ) -> Self {
        Self {
            project_id,
            media_type,
            status: MediaStatus::Pending,
            source: MediaSource::Generated {
                endpoint_id: endpoint_id.into(),
                request_id: request_id.into(),
                input,
                output: None,
            },
            metadata: None,
        }
    }

    /// An uploaded file. Uploads are complete on arrival.
    pub fn uploaded(project_id: DbId, media_type: MediaType, url: impl Into<String>) -> Self {
        Self {
            project_id,
            media_type,
            status: MediaStatus::Completed,
            source: MediaSource::Uploaded { url: url.into() },
            metadata: None,
        }
    }

    /// Stored status. Uploaded media are always completed.
    pub fn effective_status(&self) -> MediaStatus {
        match self.source {
            MediaSource::Uploaded { .. } => MediaStatus::Completed,
            MediaSource::Generated { .. } => self.status,
        }
    }
}

/// Mutable fields of a media item. `None` fields are unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMediaItem {
    /// Ignored for uploaded media, which stay completed.
    pub status: Option<MediaStatus>,
    /// Ignored for uploaded media.
    pub output: Option<Value>,
    /// Replaces the stored metadata.
    pub metadata: Option<MediaMetadata>,
}

impl UpdateMediaItem {
    pub fn status(status: MediaStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn completed(output: Value) -> Self {
        Self {
            status: Some(MediaStatus::Completed),
            output: Some(output),
            metadata: None,
        }
    }

    pub fn metadata(metadata: MediaMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(kind: &str) -> MediaItemRow {
        MediaItemRow {
            id: 5,
            project_id: 1,
            media_type: "video".into(),
            status_id: 3,
            kind: kind.into(),
            endpoint_id: Some("fal-ai/hunyuan-video".into()),
            request_id: Some("req-5".into()),
            input: Some(json!({"prompt": "sea"})),
            output: Some(json!({"video": {"url": "https://cdn/v.mp4"}})),
            url: None,
            metadata: Some(json!({"duration": 4.5, "fps": 24})),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn generated_row_converts() {
        let item = MediaItem::try_from(row("generated")).unwrap();
        assert_eq!(item.status, MediaStatus::Completed);
        assert_eq!(item.queue_ref(), Some(("fal-ai/hunyuan-video", "req-5")));
        assert_eq!(item.resolve_media_url(), Some("https://cdn/v.mp4"));
        assert_eq!(item.resolve_duration_ms(), Some(4_500));
    }

    #[test]
    fn uploaded_row_without_url_is_corrupt() {
        assert!(matches!(
            MediaItem::try_from(row("uploaded")),
            Err(CoreError::Corrupt(_))
        ));
    }

    #[test]
    fn uploads_are_always_completed() {
        let mut input = CreateMediaItem::uploaded(1, MediaType::Image, "https://cdn/a.png");
        input.status = MediaStatus::Pending;
        assert_eq!(input.effective_status(), MediaStatus::Completed);
    }
}
