//! Discovery of the N-dimensional numbering scheme of a directory.
//!
//! This module provides:
//! - Filename decomposition into literal runs and numeric fields
//! - Per-field zero-padding inference
//! - The immutable [`DirectoryShape`] snapshot used by every serie

mod shape;
mod template;

pub use shape::{DimensionValues, DirectoryShape};
pub use template::{FieldPadding, NameTemplate};
