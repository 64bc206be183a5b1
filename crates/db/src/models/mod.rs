//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row and, where rows are written from outside, an input DTO.

pub mod folder;
pub mod image;
