//! Generation job lifecycle.
//!
//! [`JobManager`] submits generation requests to the queue, persists a
//! pending media item per request and runs one polling task per in-flight
//! item until it completes, fails or times out. Each poll cycle
//! ([`Poller::poll_once`]) re-reads the item from the store, so a cycle
//! repeated with the same queue answer writes nothing.

pub mod config;
pub mod error;
pub mod manager;
pub mod poller;

pub use config::{ConfigError, JobConfig};
pub use error::JobError;
pub use manager::JobManager;
pub use poller::{PollOutcome, Poller};
