//! Persistence for projects, tracks, keyframes and media items.
//!
//! [`EntityStore`] is the contract the rest of the studio talks to.
//! [`PgStore`] implements it over PostgreSQL through the zero-sized
//! repositories in [`repositories`]; [`MemoryStore`] keeps everything in
//! process for tests and offline use.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod pg;
pub mod repositories;
pub mod store;

pub use memory::MemoryStore;
pub use pg::PgStore;
pub use store::{EntityStore, StoreError};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
