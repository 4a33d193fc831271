//! Track entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vstudio_core::error::CoreError;
use vstudio_core::timeline::{Track, TrackType};
use vstudio_core::types::{DbId, Timestamp};

/// A track row from the `tracks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TrackRow {
    pub id: DbId,
    pub project_id: DbId,
    pub track_type: String,
    pub label: String,
    pub locked: bool,
    pub created_at: Timestamp,
}

impl TryFrom<TrackRow> for Track {
    type Error = CoreError;

    fn try_from(row: TrackRow) -> Result<Self, Self::Error> {
        Ok(Track {
            id: row.id,
            project_id: row.project_id,
            track_type: TrackType::from_name(&row.track_type)?,
            label: row.label,
            locked: row.locked,
        })
    }
}

/// DTO for creating a track.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTrack {
    pub project_id: DbId,
    pub track_type: TrackType,
    pub label: String,
    pub locked: bool,
}

impl CreateTrack {
    /// A locked track labelled after its type, as created when media is
    /// first placed.
    pub fn for_type(project_id: DbId, track_type: TrackType) -> Self {
        Self {
            project_id,
            track_type,
            label: track_type.as_str().to_string(),
            locked: true,
        }
    }
}
