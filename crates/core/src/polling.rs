//! Polling policy for generation jobs.
//!
//! Decides, from the persisted item and the latest queue status, what one
//! poll cycle should do. Keeping the decision pure lets the job manager
//! re-derive everything from storage on every cycle.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::media::{MediaItem, MediaStatus, MediaType};

/// Poll interval for video generation, which takes minutes.
pub const VIDEO_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Poll interval for everything else.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Coarse status reported by the generation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueState {
    #[serde(rename = "IN_QUEUE")]
    Queued,
    InProgress,
    Completed,
}

impl QueueState {
    /// Map a wire status string. Unknown values are treated as still queued.
    pub fn from_wire(status: &str) -> Self {
        match status {
            "IN_PROGRESS" => Self::InProgress,
            "COMPLETED" => Self::Completed,
            _ => Self::Queued,
        }
    }
}

/// What a poll cycle should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    /// Nothing changed; poll again later.
    Wait,
    /// Record that the job started; poll again later.
    MarkRunning,
    /// Fetch the result and finish.
    FetchResult,
}

/// Decide the next step for `current` given the queue's `state`.
///
/// Marking running is skipped when the item already is running, so repeated
/// cycles with the same input cause no writes.
pub fn next_action(current: MediaStatus, state: QueueState) -> PollAction {
    match state {
        QueueState::Completed => PollAction::FetchResult,
        QueueState::InProgress if current == MediaStatus::Pending => PollAction::MarkRunning,
        QueueState::InProgress | QueueState::Queued => PollAction::Wait,
    }
}

/// Whether an item still needs a poller.
pub fn needs_polling(item: &MediaItem) -> bool {
    !item.is_terminal() && item.queue_ref().is_some()
}

/// Poll cadence tuned by media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCadence {
    pub default: Duration,
    pub video: Duration,
}

impl Default for PollCadence {
    fn default() -> Self {
        Self {
            default: DEFAULT_POLL_INTERVAL,
            video: VIDEO_POLL_INTERVAL,
        }
    }
}

impl PollCadence {
    pub fn interval_for(&self, media_type: MediaType) -> Duration {
        match media_type {
            MediaType::Video => self.video,
            _ => self.default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_status_mapping() {
        assert_eq!(QueueState::from_wire("IN_QUEUE"), QueueState::Queued);
        assert_eq!(QueueState::from_wire("IN_PROGRESS"), QueueState::InProgress);
        assert_eq!(QueueState::from_wire("COMPLETED"), QueueState::Completed);
        assert_eq!(QueueState::from_wire("SOMETHING_NEW"), QueueState::Queued);
    }

    #[test]
    fn in_progress_marks_pending_items_running_once() {
        assert_eq!(
            next_action(MediaStatus::Pending, QueueState::InProgress),
            PollAction::MarkRunning
        );
        assert_eq!(
            next_action(MediaStatus::Running, QueueState::InProgress),
            PollAction::Wait
        );
    }

    #[test]
    fn completed_always_fetches_result() {
        assert_eq!(
            next_action(MediaStatus::Pending, QueueState::Completed),
            PollAction::FetchResult
        );
        assert_eq!(
            next_action(MediaStatus::Running, QueueState::Completed),
            PollAction::FetchResult
        );
    }

    #[test]
    fn queued_waits() {
        assert_eq!(
            next_action(MediaStatus::Pending, QueueState::Queued),
            PollAction::Wait
        );
    }

    #[test]
    fn video_polls_slower() {
        let cadence = PollCadence::default();
        assert_eq!(cadence.interval_for(MediaType::Video), Duration::from_secs(20));
        assert_eq!(cadence.interval_for(MediaType::Image), Duration::from_millis(500));
        assert_eq!(cadence.interval_for(MediaType::Music), Duration::from_millis(500));
    }
}
