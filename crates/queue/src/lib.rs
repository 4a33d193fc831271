//! Client library for the hosted generation queue.
//!
//! Provides the [`QueueClient`](client::QueueClient) contract used by the
//! job manager, an HTTP implementation speaking the queue's REST protocol,
//! exponential backoff, and metadata extraction run as a queue job.

pub mod api;
pub mod backoff;
pub mod client;
pub mod metadata;

pub use api::{QueueApi, QueueApiError};
pub use client::{QueueClient, QueueError};
pub use metadata::{MetadataError, MetadataExtractor, QueueMetadataExtractor};
