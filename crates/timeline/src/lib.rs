//! Timeline mutations and composition loading.
//!
//! [`TimelineService`] places media on tracks, persists finished edit
//! gestures and performs deletes with their cascades, publishing a
//! [`StudioEvent`](vstudio_events::StudioEvent) for every change.
//! [`CompositionWatcher`] keeps a project's composition current from those
//! events.

pub mod error;
pub mod service;
pub mod watcher;

pub use error::TimelineError;
pub use service::TimelineService;
pub use watcher::CompositionWatcher;
