//! Keyframe models and DTOs.
//!
//! The `data` payload of a keyframe is stored flattened into the
//! `media_id`, `kind` and `prompt` columns.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vstudio_core::error::CoreError;
use vstudio_core::timeline::{validate_timing, Keyframe, KeyframeData, KeyframeKind};
use vstudio_core::types::{DbId, Millis, Timestamp};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A keyframe row from the `keyframes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct KeyframeRow {
    pub id: DbId,
    pub track_id: DbId,
    pub media_id: DbId,
    pub timestamp_ms: Millis,
    pub duration_ms: Millis,
    pub kind: String,
    pub prompt: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<KeyframeRow> for Keyframe {
    type Error = CoreError;

    fn try_from(row: KeyframeRow) -> Result<Self, Self::Error> {
        Ok(Keyframe {
            id: row.id,
            track_id: row.track_id,
            timestamp: row.timestamp_ms,
            duration: row.duration_ms,
            data: KeyframeData {
                media_id: row.media_id,
                kind: KeyframeKind::from_name(&row.kind)?,
                prompt: row.prompt,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Input for placing a keyframe on a track.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateKeyframe {
    pub track_id: DbId,
    pub timestamp: Millis,
    pub duration: Millis,
    pub data: KeyframeData,
}

impl CreateKeyframe {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_timing(self.timestamp, self.duration)
    }
}

/// Input for placing a keyframe after everything already on its track.
/// The store picks the start position.
#[derive(Debug, Clone, Deserialize)]
pub struct AppendKeyframe {
    pub track_id: DbId,
    pub duration: Millis,
    pub data: KeyframeData,
}

impl AppendKeyframe {
    /// The concrete insert once the start position is known.
    pub fn at(&self, timestamp: Millis) -> CreateKeyframe {
        CreateKeyframe {
            track_id: self.track_id,
            timestamp,
            duration: self.duration,
            data: self.data.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_timing(0, self.duration)
    }
}

/// Timing change for an existing keyframe. `None` fields are unchanged.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UpdateKeyframe {
    pub timestamp: Option<Millis>,
    pub duration: Option<Millis>,
}

impl UpdateKeyframe {
    /// Check the values that are being set.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_timing(self.timestamp.unwrap_or(0), self.duration.unwrap_or(1))
    }
}
