//! Tracks and keyframes: the placed, timed instances of media on a project
//! timeline.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::media::{MediaItem, MediaType};
use crate::types::{DbId, Millis};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Keyframe length used when the media has no known duration (images).
pub const DEFAULT_KEYFRAME_DURATION_MS: Millis = 5_000;

/// Spacing inserted between the current end of a track and an appended
/// keyframe.
pub const APPEND_GAP_MS: Millis = 1;

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// Lane category. Also the canonical layering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Video,
    Music,
    Voiceover,
}

impl TrackType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Music => "music",
            Self::Voiceover => "voiceover",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "video" => Ok(Self::Video),
            "music" => Ok(Self::Music),
            "voiceover" => Ok(Self::Voiceover),
            other => Err(CoreError::Validation(format!(
                "Unknown track type '{other}'. Must be one of: video, music, voiceover"
            ))),
        }
    }

    /// Position in the canonical display order (video < music < voiceover).
    pub fn display_order(self) -> u8 {
        match self {
            Self::Video => 1,
            Self::Music => 2,
            Self::Voiceover => 3,
        }
    }

    /// Whether media of `media_type` may be placed on this track.
    pub fn accepts(self, media_type: MediaType) -> bool {
        media_type.track_type() == self
    }
}

/// A lane of keyframes of one media category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: DbId,
    pub project_id: DbId,
    pub track_type: TrackType,
    pub label: String,
    pub locked: bool,
}

/// Sort tracks into canonical display order. Ties keep creation order.
pub fn sort_tracks(tracks: &mut [Track]) {
    tracks.sort_by_key(|t| (t.track_type.display_order(), t.id));
}

// ---------------------------------------------------------------------------
// Keyframe
// ---------------------------------------------------------------------------

/// What a keyframe shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyframeKind {
    Prompt,
    Image,
    Video,
    Music,
    Voiceover,
}

impl KeyframeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Image => "image",
            Self::Video => "video",
            Self::Music => "music",
            Self::Voiceover => "voiceover",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "prompt" => Ok(Self::Prompt),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "music" => Ok(Self::Music),
            "voiceover" => Ok(Self::Voiceover),
            other => Err(CoreError::Validation(format!(
                "Unknown keyframe type '{other}'"
            ))),
        }
    }
}

impl From<MediaType> for KeyframeKind {
    fn from(value: MediaType) -> Self {
        match value {
            MediaType::Image => Self::Image,
            MediaType::Video => Self::Video,
            MediaType::Music => Self::Music,
            MediaType::Voiceover => Self::Voiceover,
        }
    }
}

/// Payload of a keyframe: which media it places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeData {
    pub media_id: DbId,
    #[serde(rename = "type")]
    pub kind: KeyframeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// A placed instance of a media item on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub id: DbId,
    pub track_id: DbId,
    /// Start position in milliseconds from the timeline origin.
    pub timestamp: Millis,
    /// Length in milliseconds. Independent of the media's natural length.
    pub duration: Millis,
    pub data: KeyframeData,
}

impl Keyframe {
    pub fn end(&self) -> Millis {
        self.timestamp + self.duration
    }
}

/// Latest end position over `keyframes`, or `None` when there are none.
pub fn max_end(keyframes: &[Keyframe]) -> Option<Millis> {
    keyframes.iter().map(Keyframe::end).max()
}

/// Where an appended keyframe starts: one gap past the furthest end on the
/// track, or the origin for an empty track.
///
/// Uses the maximum end position rather than a sum of durations so gaps
/// and out-of-order keyframes are tolerated.
pub fn append_position(keyframes: &[Keyframe]) -> Millis {
    append_after(max_end(keyframes))
}

/// [`append_position`] for a track whose furthest end is already known.
pub fn append_after(max_end: Option<Millis>) -> Millis {
    match max_end {
        Some(end) => end + APPEND_GAP_MS,
        None => 0,
    }
}

/// Duration a freshly placed keyframe gets for `media`.
pub fn initial_duration(media: &MediaItem) -> Millis {
    media
        .resolve_duration_ms()
        .unwrap_or(DEFAULT_KEYFRAME_DURATION_MS)
}

/// Check a keyframe's timing values.
pub fn validate_timing(timestamp: Millis, duration: Millis) -> Result<(), CoreError> {
    if timestamp < 0 {
        return Err(CoreError::Validation(format!(
            "timestamp must be >= 0, got {timestamp}"
        )));
    }
    if duration <= 0 {
        return Err(CoreError::Validation(format!(
            "duration must be > 0, got {duration}"
        )));
    }
    Ok(())
}

/// Check that `media` may be placed on `track`.
pub fn ensure_compatible(track: &Track, media: &MediaItem) -> Result<(), CoreError> {
    if media.project_id != track.project_id {
        return Err(CoreError::Validation(format!(
            "Media {} belongs to project {}, track {} to project {}",
            media.id, media.project_id, track.id, track.project_id
        )));
    }
    if !track.track_type.accepts(media.media_type) {
        return Err(CoreError::IncompatibleMedia {
            media_type: media.media_type.as_str(),
            track_type: track.track_type.as_str(),
        });
    }
    Ok(())
}
