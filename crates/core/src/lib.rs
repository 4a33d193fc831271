//! Domain model for the video studio: projects, media, the track/keyframe
//! timeline, direct-manipulation edit math, composition assembly, polling
//! policy, the endpoint catalog and editor session state.

pub mod composition;
pub mod editing;
pub mod endpoints;
pub mod error;
pub mod event_types;
pub mod media;
pub mod playback;
pub mod polling;
pub mod project;
pub mod session;
pub mod timeline;
pub mod types;
