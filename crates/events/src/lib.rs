//! Studio event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`StudioEvent`]: the event envelope for media, track, keyframe and
//!   project changes.
//! - [`EventLogger`]: background subscriber writing every event to the
//!   trace log.

pub mod bus;
pub mod logger;

pub use bus::{EventBus, StudioEvent};
pub use logger::EventLogger;
