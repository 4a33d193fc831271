//! Derivation of a renderable composition from the timeline.
//!
//! [`assemble`] is a pure function of its inputs and is recomputed from
//! scratch whenever anything changes. Keyframes whose media is missing,
//! unfinished, or has no playable url are skipped rather than failing the
//! whole composition.

use std::collections::HashMap;

use serde::Serialize;

use crate::media::{MediaItem, MediaStatus, MediaType};
use crate::project::Project;
use crate::timeline::{sort_tracks, Keyframe, Track, TrackType, DEFAULT_KEYFRAME_DURATION_MS};
use crate::types::{DbId, Millis};

/// Frames per second of every composition.
pub const FPS: u32 = 30;

/// Shortest composition, in seconds.
pub const DEFAULT_DURATION_SECONDS: u32 = 5;

/// Empty space appended after the last keyframe.
pub const TAIL_PADDING_MS: Millis = 5_000;

/// One placed media item, in frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceItem {
    pub keyframe_id: DbId,
    pub media_id: DbId,
    pub media_type: MediaType,
    pub url: String,
    pub start_frame: u64,
    pub duration_frames: u64,
}

/// All items of one track, in timestamp order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackSequence {
    pub track_id: DbId,
    pub track_type: TrackType,
    pub items: Vec<SequenceItem>,
}

/// What the renderer consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Composition {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub duration_secs: u32,
    pub duration_in_frames: u64,
    /// Tracks in canonical order: video, music, voiceover.
    pub layers: Vec<TrackSequence>,
}

impl Composition {
    /// Urls of video and audio items, for warming the renderer's cache.
    /// Each url appears once, in layer order.
    pub fn preload_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        for item in self.layers.iter().flat_map(|layer| &layer.items) {
            if item.media_type == MediaType::Image {
                continue;
            }
            if !urls.contains(&item.url.as_str()) {
                urls.push(item.url.as_str());
            }
        }
        urls
    }

    pub fn item_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.items.len()).sum()
    }
}

/// `floor(ms * fps / 1000)`, clamped at zero.
pub fn ms_to_frames(ms: Millis, fps: u32) -> u64 {
    if ms <= 0 {
        return 0;
    }
    (ms as u64 * u64::from(fps)) / 1000
}

/// Composition length in whole seconds: the furthest keyframe end plus
/// [`TAIL_PADDING_MS`], rounded up, and never below
/// [`DEFAULT_DURATION_SECONDS`].
pub fn total_duration_secs<'a>(keyframes: impl IntoIterator<Item = &'a Keyframe>) -> u32 {
    let Some(max_end) = keyframes.into_iter().map(Keyframe::end).max() else {
        return DEFAULT_DURATION_SECONDS;
    };
    let padded = (max_end + TAIL_PADDING_MS).max(0);
    let secs = (padded + 999) / 1000;
    u32::try_from(secs)
        .unwrap_or(u32::MAX)
        .max(DEFAULT_DURATION_SECONDS)
}

/// Build the composition for `project`.
///
/// `keyframes` is keyed by track id; `media` by media id.
pub fn assemble(
    project: &Project,
    tracks: &[Track],
    keyframes: &HashMap<DbId, Vec<Keyframe>>,
    media: &HashMap<DbId, MediaItem>,
) -> Composition {
    let size = project.aspect_ratio.video_size();

    let mut ordered = tracks.to_vec();
    sort_tracks(&mut ordered);

    let layers = ordered
        .iter()
        .map(|track| {
            let mut frames: Vec<&Keyframe> = keyframes
                .get(&track.id)
                .map(|list| list.iter().collect())
                .unwrap_or_default();
            frames.sort_by_key(|k| (k.timestamp, k.id));

            TrackSequence {
                track_id: track.id,
                track_type: track.track_type,
                items: frames
                    .into_iter()
                    .filter_map(|kf| sequence_item(kf, media))
                    .collect(),
            }
        })
        .collect();

    let duration_secs =
        total_duration_secs(tracks.iter().filter_map(|t| keyframes.get(&t.id)).flatten());

    Composition {
        fps: FPS,
        width: size.width,
        height: size.height,
        duration_secs,
        duration_in_frames: u64::from(duration_secs) * u64::from(FPS),
        layers,
    }
}

fn sequence_item(keyframe: &Keyframe, media: &HashMap<DbId, MediaItem>) -> Option<SequenceItem> {
    let item = match media.get(&keyframe.data.media_id) {
        Some(item) => item,
        None => {
            tracing::debug!(
                keyframe_id = keyframe.id,
                media_id = keyframe.data.media_id,
                "Skipping keyframe with missing media"
            );
            return None;
        }
    };
    if item.status != MediaStatus::Completed {
        return None;
    }
    let Some(url) = item.resolve_media_url() else {
        tracing::debug!(media_id = item.id, "Skipping media without a url");
        return None;
    };

    let duration_ms = if keyframe.duration > 0 {
        keyframe.duration
    } else {
        item.resolve_duration_ms()
            .unwrap_or(DEFAULT_KEYFRAME_DURATION_MS)
    };

    let duration_frames = ms_to_frames(duration_ms, FPS);
    if duration_frames == 0 {
        return None;
    }

    Some(SequenceItem {
        keyframe_id: keyframe.id,
        media_id: item.id,
        media_type: item.media_type,
        url: url.to_string(),
        start_frame: ms_to_frames(keyframe.timestamp, FPS),
        duration_frames,
    })
}
