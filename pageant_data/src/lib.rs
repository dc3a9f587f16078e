//! Shared data model for Pageant content.

pub mod defs;
pub mod geometry;
pub mod validate;

pub use defs::*;
pub use geometry::*;
pub use validate::{ValidationError, validate_content};
