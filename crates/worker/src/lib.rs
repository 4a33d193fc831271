//! Background worker: resumes and drives generation jobs against the
//! PostgreSQL store and the hosted queue.

pub mod config;
