//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` row struct matching the table, convertible into the
//!   domain type from `vstudio-core`
//! - A `Deserialize` create DTO for inserts
//! - An update DTO (all `Option` fields) for patches, where rows are mutable

pub mod keyframe;
pub mod media_item;
pub mod project;
pub mod status;
pub mod track;
