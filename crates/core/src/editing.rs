//! Direct-manipulation math for keyframes: drag to move, drag an edge to
//! resize.
//!
//! Pointer handlers call into this module on every move event, so each
//! update is O(1): neighbors are resolved once when the gesture begins and
//! candidates are clamped against them, never against the whole track.
//! A gesture is local until [`EditGesture::finish`]; dropping it leaves
//! storage untouched.

use serde::Serialize;

use crate::timeline::Keyframe;
use crate::types::{DbId, Millis};

/// Shortest duration a resize can produce.
pub const MIN_KEYFRAME_DURATION_MS: Millis = 3_000;

/// Persisted durations are rounded to this step.
pub const DURATION_ROUNDING_MS: Millis = 100;

// ---------------------------------------------------------------------------
// Scale
// ---------------------------------------------------------------------------

/// Maps horizontal pixels to timeline time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineScale {
    /// Rendered width of the timeline in pixels.
    pub width_px: f64,
    /// Seconds of timeline shown across `width_px`.
    pub scale_seconds: f64,
}

impl TimelineScale {
    pub fn new(width_px: f64, scale_seconds: f64) -> Self {
        Self {
            width_px,
            scale_seconds,
        }
    }

    /// `deltaMs = (px / width) * scale_seconds * 1000`, rounded to whole
    /// milliseconds. A zero-width timeline maps everything to 0.
    pub fn px_to_ms(&self, px: f64) -> Millis {
        if self.width_px <= 0.0 || !px.is_finite() {
            return 0;
        }
        ((px / self.width_px) * self.scale_seconds * 1000.0).round() as Millis
    }
}

// ---------------------------------------------------------------------------
// Neighbors
// ---------------------------------------------------------------------------

/// Immediate left/right neighbors of a keyframe on its track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Neighbors {
    /// End of the preceding keyframe.
    pub prev_end: Option<Millis>,
    /// Start of the following keyframe.
    pub next_start: Option<Millis>,
}

impl Neighbors {
    /// Locate the neighbors of `keyframe_id` among `siblings` (all keyframes
    /// of one track, any order).
    pub fn of(siblings: &[Keyframe], keyframe_id: DbId) -> Self {
        let mut ordered: Vec<&Keyframe> = siblings.iter().collect();
        ordered.sort_by_key(|k| (k.timestamp, k.id));

        let Some(idx) = ordered.iter().position(|k| k.id == keyframe_id) else {
            return Self::default();
        };

        Self {
            prev_end: idx.checked_sub(1).map(|i| ordered[i].end()),
            next_start: ordered.get(idx + 1).map(|k| k.timestamp),
        }
    }
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// New start for a keyframe dragged by `delta_ms`.
///
/// Clamped to `[prev_end, next_start - duration]` and floored at 0. When
/// the gap between neighbors is narrower than the keyframe, the lower bound
/// wins.
pub fn move_keyframe(
    timestamp: Millis,
    duration: Millis,
    neighbors: Neighbors,
    delta_ms: Millis,
) -> Millis {
    let lower = neighbors.prev_end.unwrap_or(0).max(0);
    let mut candidate = timestamp.saturating_add(delta_ms);
    if let Some(next_start) = neighbors.next_start {
        candidate = candidate.min(next_start - duration);
    }
    candidate.max(lower)
}

// ---------------------------------------------------------------------------
// Resize
// ---------------------------------------------------------------------------

/// Which edge of the keyframe is being dragged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeEdge {
    Left,
    #[default]
    Right,
}

/// Allowed range for a keyframe duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationBounds {
    pub min: Millis,
    /// `None` when the media has no natural length.
    pub max: Option<Millis>,
}

impl DurationBounds {
    /// Bounds for media whose natural length is `media_max` (if known).
    ///
    /// Media shorter than the minimum caps the minimum at its own length.
    pub fn for_media(media_max: Option<Millis>) -> Self {
        let max = media_max.filter(|m| *m > 0);
        let min = match max {
            Some(max) => MIN_KEYFRAME_DURATION_MS.min(max),
            None => MIN_KEYFRAME_DURATION_MS,
        };
        Self { min, max }
    }

    /// Tighten the upper bound to `cap`, never below one millisecond.
    pub fn capped(self, cap: Millis) -> Self {
        let cap = cap.max(1);
        let max = Some(self.max.map_or(cap, |m| m.min(cap)));
        Self::for_media(max).with_min_at_most(self.min)
    }

    fn with_min_at_most(mut self, min: Millis) -> Self {
        self.min = self.min.min(min);
        self
    }

    pub fn clamp(&self, duration: Millis) -> Millis {
        let upper = self.max.unwrap_or(Millis::MAX);
        duration.max(self.min).min(upper)
    }
}

/// New duration after dragging `edge` by `delta_ms`.
///
/// The right edge grows with positive deltas; the left edge shrinks.
pub fn resize_keyframe(
    duration: Millis,
    delta_ms: Millis,
    edge: ResizeEdge,
    bounds: DurationBounds,
) -> Millis {
    let candidate = match edge {
        ResizeEdge::Right => duration.saturating_add(delta_ms),
        ResizeEdge::Left => duration.saturating_sub(delta_ms),
    };
    bounds.clamp(candidate)
}

/// Round to the nearest [`DURATION_ROUNDING_MS`].
pub fn round_duration(duration: Millis) -> Millis {
    let half = DURATION_ROUNDING_MS / 2;
    ((duration + half) / DURATION_ROUNDING_MS) * DURATION_ROUNDING_MS
}

// ---------------------------------------------------------------------------
// Gesture
// ---------------------------------------------------------------------------

/// Start/length pair shown while a gesture is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyframeTiming {
    pub timestamp: Millis,
    pub duration: Millis,
}

/// The write to persist once a gesture ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyframeEdit {
    pub keyframe_id: DbId,
    pub timestamp: Millis,
    pub duration: Millis,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GestureKind {
    Move { neighbors: Neighbors },
    Resize { edge: ResizeEdge, bounds: DurationBounds },
}

/// An in-progress drag on one keyframe.
#[derive(Debug, Clone)]
pub struct EditGesture {
    keyframe_id: DbId,
    origin: KeyframeTiming,
    preview: KeyframeTiming,
    scale: TimelineScale,
    kind: GestureKind,
}

impl EditGesture {
    /// Begin dragging `keyframe` horizontally. `siblings` are the keyframes
    /// of the same track.
    pub fn begin_move(keyframe: &Keyframe, siblings: &[Keyframe], scale: TimelineScale) -> Self {
        let origin = timing_of(keyframe);
        Self {
            keyframe_id: keyframe.id,
            origin,
            preview: origin,
            scale,
            kind: GestureKind::Move {
                neighbors: Neighbors::of(siblings, keyframe.id),
            },
        }
    }

    /// Begin dragging one edge of `keyframe`. `media_max` is the natural
    /// length of the placed media, if known.
    pub fn begin_resize(
        keyframe: &Keyframe,
        siblings: &[Keyframe],
        edge: ResizeEdge,
        media_max: Option<Millis>,
        scale: TimelineScale,
    ) -> Self {
        let origin = timing_of(keyframe);
        let neighbors = Neighbors::of(siblings, keyframe.id);
        let mut bounds = DurationBounds::for_media(media_max);
        match edge {
            ResizeEdge::Left => {
                // The start cannot cross the previous keyframe or the origin.
                let floor = neighbors.prev_end.unwrap_or(0).max(0);
                bounds = bounds.capped(keyframe.end() - floor);
            }
            ResizeEdge::Right => {
                // The end cannot cross the next keyframe.
                if let Some(next_start) = neighbors.next_start {
                    bounds = bounds.capped(next_start - keyframe.timestamp);
                }
            }
        }
        Self {
            keyframe_id: keyframe.id,
            origin,
            preview: origin,
            scale,
            kind: GestureKind::Resize { edge, bounds },
        }
    }

    pub fn keyframe_id(&self) -> DbId {
        self.keyframe_id
    }

    /// Apply the pointer's total horizontal offset since the gesture began.
    pub fn update(&mut self, total_px: f64) -> KeyframeTiming {
        let delta_ms = self.scale.px_to_ms(total_px);
        self.preview = match self.kind {
            GestureKind::Move { neighbors } => KeyframeTiming {
                timestamp: move_keyframe(
                    self.origin.timestamp,
                    self.origin.duration,
                    neighbors,
                    delta_ms,
                ),
                duration: self.origin.duration,
            },
            GestureKind::Resize { edge, bounds } => {
                let duration = resize_keyframe(self.origin.duration, delta_ms, edge, bounds);
                self.resized(edge, duration)
            }
        };
        self.preview
    }

    /// Live position for rendering.
    pub fn preview(&self) -> KeyframeTiming {
        self.preview
    }

    /// End the gesture. Returns the write to persist, or `None` when the
    /// keyframe ends where it started.
    pub fn finish(self) -> Option<KeyframeEdit> {
        let timing = match self.kind {
            GestureKind::Move { .. } => self.preview,
            GestureKind::Resize { edge, bounds } => {
                let duration = bounds.clamp(round_duration(self.preview.duration));
                self.resized(edge, duration)
            }
        };

        if timing == self.origin {
            return None;
        }
        Some(KeyframeEdit {
            keyframe_id: self.keyframe_id,
            timestamp: timing.timestamp,
            duration: timing.duration,
        })
    }

    /// Abandon the gesture without producing a write.
    pub fn cancel(self) {
        tracing::trace!(keyframe_id = self.keyframe_id, "Edit gesture cancelled");
    }

    fn resized(&self, edge: ResizeEdge, duration: Millis) -> KeyframeTiming {
        match edge {
            ResizeEdge::Right => KeyframeTiming {
                timestamp: self.origin.timestamp,
                duration,
            },
            ResizeEdge::Left => KeyframeTiming {
                timestamp: self.origin.timestamp + self.origin.duration - duration,
                duration,
            },
        }
    }
}

fn timing_of(keyframe: &Keyframe) -> KeyframeTiming {
    KeyframeTiming {
        timestamp: keyframe.timestamp,
        duration: keyframe.duration,
    }
}
