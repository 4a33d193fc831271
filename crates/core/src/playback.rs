//! Bridge between the preview player and the editor session.
//!
//! The player reports frame updates at render rate. [`bind_player`] turns
//! them into [`SessionAction`]s at most once per [`FRAME_THROTTLE`], always
//! delivering the last position, and stops when its token is cancelled.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::session::{PlayerState, SessionAction};
use crate::types::Millis;

/// Minimum spacing between forwarded position updates (~15 Hz).
pub const FRAME_THROTTLE: Duration = Duration::from_millis(64);

/// Notifications emitted by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerEvent {
    Play,
    Pause,
    Seeked { frame: u64 },
    FrameUpdate { frame: u64 },
}

/// Control surface of the preview player.
pub trait Transport: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn seek_to(&self, frame: u64);
    /// Receive player notifications until the receiver is dropped.
    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent>;
}

/// Convert a frame index to milliseconds.
pub fn frame_to_ms(frame: u64, fps: u32) -> Millis {
    if fps == 0 {
        return 0;
    }
    let ms = frame.saturating_mul(1000) / u64::from(fps);
    Millis::try_from(ms).unwrap_or(Millis::MAX)
}

/// Rate limiter keeping the latest value of a suppressed burst.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
    pending: Option<u64>,
}

impl FrameThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
            pending: None,
        }
    }

    /// Offer a frame at `now`. Returns it when it may be forwarded
    /// immediately; otherwise it is held as pending.
    pub fn offer(&mut self, frame: u64, now: Instant) -> Option<u64> {
        match self.last_emit {
            Some(last) if now.duration_since(last) < self.interval => {
                self.pending = Some(frame);
                None
            }
            _ => {
                self.last_emit = Some(now);
                self.pending = None;
                Some(frame)
            }
        }
    }

    /// When the held frame becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match (self.pending, self.last_emit) {
            (Some(_), Some(last)) => Some(last + self.interval),
            _ => None,
        }
    }

    /// Release the held frame.
    pub fn flush(&mut self, now: Instant) -> Option<u64> {
        let frame = self.pending.take()?;
        self.last_emit = Some(now);
        Some(frame)
    }
}

/// Forward player events to `actions` until `cancel` fires or the player
/// goes away.
pub fn bind_player(
    mut events: broadcast::Receiver<PlayerEvent>,
    actions: mpsc::UnboundedSender<SessionAction>,
    fps: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut throttle = FrameThrottle::new(FRAME_THROTTLE);
        let send_frame = |frame: u64| {
            actions
                .send(SessionAction::SetPlayerTimestamp(frame_to_ms(frame, fps)))
                .is_ok()
        };

        loop {
            let deadline = throttle.deadline();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep_until_opt(deadline), if deadline.is_some() => {
                    if let Some(frame) = throttle.flush(Instant::now()) {
                        if !send_frame(frame) {
                            break;
                        }
                    }
                }
                received = events.recv() => {
                    let event = match received {
                        Ok(event) => event,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "Player event receiver lagged");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            if let Some(frame) = throttle.flush(Instant::now()) {
                                send_frame(frame);
                            }
                            break;
                        }
                    };

                    let delivered = match event {
                        PlayerEvent::Play => actions
                            .send(SessionAction::SetPlayerState(PlayerState::Playing))
                            .is_ok(),
                        PlayerEvent::Pause => actions
                            .send(SessionAction::SetPlayerState(PlayerState::Paused))
                            .is_ok(),
                        PlayerEvent::Seeked { frame } | PlayerEvent::FrameUpdate { frame } => {
                            match throttle.offer(frame, Instant::now()) {
                                Some(frame) => send_frame(frame),
                                None => true,
                            }
                        }
                    };
                    if !delivered {
                        break;
                    }
                }
            }
        }
        tracing::debug!("Player binding stopped");
    })
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
