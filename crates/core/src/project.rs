//! Project settings: aspect ratio and the render size it implies.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Output frame shape chosen in project settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
}

/// Pixel dimensions of the rendered composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Stored representation, e.g. `"16:9"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Square => "1:1",
        }
    }

    /// Parse the stored representation.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "16:9" => Ok(Self::Landscape),
            "9:16" => Ok(Self::Portrait),
            "1:1" => Ok(Self::Square),
            other => Err(CoreError::Validation(format!(
                "Unknown aspect ratio '{other}'. Must be one of: 16:9, 9:16, 1:1"
            ))),
        }
    }

    pub fn video_size(self) -> VideoSize {
        match self {
            Self::Landscape => VideoSize {
                width: 1024,
                height: 576,
            },
            Self::Portrait => VideoSize {
                width: 576,
                height: 1024,
            },
            Self::Square => VideoSize {
                width: 1024,
                height: 1024,
            },
        }
    }
}

/// A video project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub aspect_ratio: AspectRatio,
}

impl Project {
    /// Explicit stand-in used while no project has been created or loaded.
    ///
    /// Has id `0`, which no persisted project ever uses.
    pub fn placeholder() -> Self {
        Self {
            id: 0,
            title: String::new(),
            description: String::new(),
            aspect_ratio: AspectRatio::Landscape,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id == 0
    }
}
