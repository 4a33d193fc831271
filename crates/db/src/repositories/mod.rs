//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument and return row structs.

pub mod keyframe_repo;
pub mod media_item_repo;
pub mod project_repo;
pub mod track_repo;

pub use keyframe_repo::KeyframeRepo;
pub use media_item_repo::MediaItemRepo;
pub use project_repo::ProjectRepo;
pub use track_repo::TrackRepo;
