//! Repository for the `projects` table.

use sqlx::PgPool;
use vstudio_core::types::DbId;

use crate::models::project::{CreateProject, ProjectRow, UpdateProject};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, description, aspect_ratio, created_at, updated_at";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<ProjectRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (title, description, aspect_ratio)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.aspect_ratio.as_str())
            .fetch_one(pool)
            .await
    }

    /// Find a project by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ProjectRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all projects, most recently created first.
    pub async fn list(pool: &PgPool) -> Result<Vec<ProjectRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, ProjectRow>(&query).fetch_all(pool).await
    }

    /// Update a project. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<ProjectRow>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                aspect_ratio = COALESCE($4, aspect_ratio),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.aspect_ratio.map(|r| r.as_str()))
            .fetch_optional(pool)
            .await
    }

    /// Delete a project and, through FK cascades, everything in it.
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
