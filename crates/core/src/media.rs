//! Media items: generated or uploaded images, clips, music and voiceover.
//!
//! A [`MediaItem`] is created once per generation request or upload. Only
//! its status, output and metadata change afterwards. The generated and
//! uploaded variants carry different required fields, so the origin is a
//! sum type ([`MediaSource`]) rather than a bag of optional columns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::timeline::TrackType;
use crate::types::{DbId, Millis, Timestamp};

// ---------------------------------------------------------------------------
// Media type
// ---------------------------------------------------------------------------

/// What kind of content a media item holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Music,
    Voiceover,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Music => "music",
            Self::Voiceover => "voiceover",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "music" => Ok(Self::Music),
            "voiceover" => Ok(Self::Voiceover),
            other => Err(CoreError::Validation(format!(
                "Unknown media type '{other}'. Must be one of: image, video, music, voiceover"
            ))),
        }
    }

    /// Media type of an uploaded file from its MIME type. Any `audio/*`
    /// file is treated as music.
    pub fn from_mime(mime: &str) -> Result<Self, CoreError> {
        let top = mime.split('/').next().unwrap_or_default().trim();
        match top.to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Music),
            _ => Err(CoreError::Validation(format!(
                "Unsupported upload type '{mime}'. Must be image/*, video/* or audio/*"
            ))),
        }
    }

    /// The track type this media lands on. Images go on video tracks.
    pub fn track_type(self) -> TrackType {
        match self {
            Self::Image | Self::Video => TrackType::Video,
            Self::Music => TrackType::Music,
            Self::Voiceover => TrackType::Voiceover,
        }
    }

    pub fn is_audio(self) -> bool {
        matches!(self, Self::Music | Self::Voiceover)
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Generation progress of a media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl MediaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown media status '{other}'"
            ))),
        }
    }

    /// Completed and failed end polling.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Re-applying the current status is always allowed. Terminal states
    /// never change.
    pub fn can_transition_to(self, next: MediaStatus) -> bool {
        if self == next {
            return true;
        }
        match self {
            Self::Pending => true,
            Self::Running => next != Self::Pending,
            Self::Completed | Self::Failed => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Discriminant of [`MediaSource`], as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Generated,
    Uploaded,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Uploaded => "uploaded",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "generated" => Ok(Self::Generated),
            "uploaded" => Ok(Self::Uploaded),
            other => Err(CoreError::Validation(format!(
                "Unknown media kind '{other}'"
            ))),
        }
    }
}

/// Where a media item came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MediaSource {
    /// Produced by a queue endpoint. Endpoint and request ids never change.
    Generated {
        endpoint_id: String,
        request_id: String,
        input: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
    },
    /// Uploaded by the user. Always completed.
    Uploaded { url: String },
}

impl MediaSource {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Generated { .. } => MediaKind::Generated,
            Self::Uploaded { .. } => MediaKind::Uploaded,
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Pixel dimensions reported by metadata extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Technical facts extracted after a media item completes.
///
/// Keys this struct does not model are kept in `extra` so nothing the
/// extractor returns is lost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Length in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_frame_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_frame_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waveform: Option<Vec<f64>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl MediaMetadata {
    /// Build metadata from an arbitrary JSON payload.
    ///
    /// Payloads whose known keys have an unexpected shape are kept whole
    /// in `extra` instead of being rejected.
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<MediaMetadata>(value.clone()) {
            Ok(meta) => meta,
            Err(_) => Self {
                extra: match value {
                    Value::Object(map) => map,
                    other => {
                        let mut map = serde_json::Map::new();
                        map.insert("raw".to_string(), other);
                        map
                    }
                },
                ..Default::default()
            },
        }
    }

    /// Overlay `other` onto `self`. Fields present in `other` win.
    pub fn merge(&mut self, other: MediaMetadata) {
        if other.duration.is_some() {
            self.duration = other.duration;
        }
        if other.fps.is_some() {
            self.fps = other.fps;
        }
        if other.resolution.is_some() {
            self.resolution = other.resolution;
        }
        if other.start_frame_url.is_some() {
            self.start_frame_url = other.start_frame_url;
        }
        if other.end_frame_url.is_some() {
            self.end_frame_url = other.end_frame_url;
        }
        if other.waveform.is_some() {
            self.waveform = other.waveform;
        }
        self.extra.extend(other.extra);
    }

    pub fn duration_ms(&self) -> Option<Millis> {
        self.duration.and_then(secs_to_ms)
    }
}

// ---------------------------------------------------------------------------
// Media item
// ---------------------------------------------------------------------------

/// A piece of media belonging to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: DbId,
    pub project_id: DbId,
    pub media_type: MediaType,
    pub status: MediaStatus,
    pub created_at: Timestamp,
    #[serde(flatten)]
    pub source: MediaSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MediaMetadata>,
}

/// Output properties that may hold a `{ "url": ... }` object.
const OUTPUT_FILE_PROPERTIES: &[&str] = &["image", "video", "audio", "audio_file", "audio_url"];

impl MediaItem {
    pub fn kind(&self) -> MediaKind {
        self.source.kind()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `(endpoint_id, request_id)` for generated media.
    pub fn queue_ref(&self) -> Option<(&str, &str)> {
        match &self.source {
            MediaSource::Generated {
                endpoint_id,
                request_id,
                ..
            } => Some((endpoint_id.as_str(), request_id.as_str())),
            MediaSource::Uploaded { .. } => None,
        }
    }

    pub fn input(&self) -> Option<&Value> {
        match &self.source {
            MediaSource::Generated { input, .. } => Some(input),
            MediaSource::Uploaded { .. } => None,
        }
    }

    pub fn output(&self) -> Option<&Value> {
        match &self.source {
            MediaSource::Generated { output, .. } => output.as_ref(),
            MediaSource::Uploaded { .. } => None,
        }
    }

    /// Prompt the media was generated from, if any.
    pub fn prompt(&self) -> Option<&str> {
        self.input()
            .and_then(|input| input.get("prompt"))
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
    }

    /// Location of the playable/displayable file.
    ///
    /// Uploaded media use their url. Generated media look at
    /// `output.images[0].url` first, then at the first file-like output
    /// property carrying a `url`.
    pub fn resolve_media_url(&self) -> Option<&str> {
        let output = match &self.source {
            MediaSource::Uploaded { url } => return Some(url.as_str()),
            MediaSource::Generated { output, .. } => output.as_ref()?,
        };

        if let Some(url) = output
            .get("images")
            .and_then(Value::as_array)
            .and_then(|images| images.first())
            .and_then(|image| image.get("url"))
            .and_then(Value::as_str)
        {
            return Some(url);
        }

        OUTPUT_FILE_PROPERTIES.iter().find_map(|key| {
            output
                .get(*key)
                .and_then(|file| file.get("url"))
                .and_then(Value::as_str)
        })
    }

    /// Natural length of the media in milliseconds.
    ///
    /// Checked in order: extracted metadata, the result payload
    /// (`seconds_total`, `audio.duration`), then the duration declared in
    /// the request input.
    pub fn resolve_duration_ms(&self) -> Option<Millis> {
        if let Some(ms) = self.metadata.as_ref().and_then(MediaMetadata::duration_ms) {
            return Some(ms);
        }
        if let Some(ms) = self.output().and_then(output_duration_ms) {
            return Some(ms);
        }
        self.declared_duration_ms()
    }

    /// Duration requested in the generation input, in milliseconds.
    pub fn declared_duration_ms(&self) -> Option<Millis> {
        let input = self.input()?;
        ["seconds_total", "duration"]
            .iter()
            .find_map(|key| input.get(*key).and_then(seconds_value))
            .and_then(secs_to_ms)
    }
}

fn output_duration_ms(output: &Value) -> Option<Millis> {
    let secs = output
        .get("seconds_total")
        .and_then(seconds_value)
        .or_else(|| {
            output
                .get("audio")
                .and_then(|audio| audio.get("duration"))
                .and_then(seconds_value)
        })?;
    secs_to_ms(secs)
}

/// Accept numbers and numeric strings (some endpoints take `"5"`).
fn seconds_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn secs_to_ms(secs: f64) -> Option<Millis> {
    if secs.is_finite() && secs > 0.0 {
        Some((secs * 1000.0).round() as Millis)
    } else {
        None
    }
}
