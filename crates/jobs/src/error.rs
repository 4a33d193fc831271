use vstudio_core::error::CoreError;
use vstudio_core::types::DbId;
use vstudio_db::StoreError;
use vstudio_queue::QueueError;

/// Errors from the job manager and its pollers.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The queue rejected the request. Nothing was persisted.
    #[error("Failed to submit generation request: {0}")]
    Submit(#[source] QueueError),

    /// A status or result call failed during polling.
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Project {0} not found")]
    ProjectNotFound(DbId),

    /// An upload had an unsupported type or no url.
    #[error(transparent)]
    InvalidUpload(#[from] CoreError),
}
