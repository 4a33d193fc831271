use vstudio_core::error::CoreError;
use vstudio_db::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl TimelineError {
    pub fn not_found(entity: &'static str, id: vstudio_core::types::DbId) -> Self {
        Self::Core(CoreError::NotFound { entity, id })
    }
}
