use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Media of type '{media_type}' cannot be placed on a '{track_type}' track")]
    IncompatibleMedia {
        media_type: &'static str,
        track_type: &'static str,
    },

    #[error("Media {id} is not ready: status is '{status}'")]
    MediaNotReady { id: DbId, status: &'static str },

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}
