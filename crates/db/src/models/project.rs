//! Project entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use vstudio_core::error::CoreError;
use vstudio_core::project::{AspectRatio, Project};
use vstudio_core::types::{DbId, Timestamp};

/// A project row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectRow {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub aspect_ratio: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ProjectRow> for Project {
    type Error = CoreError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        Ok(Project {
            id: row.id,
            title: row.title,
            description: row.description,
            aspect_ratio: AspectRatio::from_name(&row.aspect_ratio)?,
        })
    }
}

/// DTO for creating a new project.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProject {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
}

impl CreateProject {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            aspect_ratio: AspectRatio::default(),
        }
    }
}

/// DTO for updating a project's settings. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProject {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub aspect_ratio: Option<AspectRatio>,
}
