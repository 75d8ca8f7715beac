//! Enumerating series of numbered files in a directory.
//!
//! This crate provides:
//! - Scanning a directory into a naming template and per-dimension values
//! - A pattern grammar selecting files by position, with a moving anchor `i`
//! - Resolution of one serie into ordered index tuples, names and paths
//! - A sliding generator producing one serie per anchor value
//! - Hand-off of resolved paths to a pluggable array loader

pub mod config;
pub mod error;
pub mod loader;
pub mod pattern;
pub mod scan;
pub mod serie;
pub mod series;

// Re-export main types
pub use config::{AnchorRange, ScanOptions, SeriesConfig};
pub use error::{Result, SeriesError};
pub use loader::{ArrayLoader, BytesLoader, MmapLoader};
pub use pattern::{DimensionSpec, PatternParser, SeriePattern};
pub use scan::{DimensionValues, DirectoryShape, FieldPadding, NameTemplate};
pub use serie::{Serie, SerieIndices};
pub use series::{SeriesIter, SeriesOfArrays};
