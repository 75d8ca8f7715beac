//! Serializable configuration for scanning directories and sliding series.
//!
//! Every knob is an explicit value passed to the constructors; nothing here is
//! process-wide.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeriesError};
use crate::pattern::SeriePattern;
use crate::scan::DirectoryShape;
use crate::serie::Serie;
use crate::series::SeriesOfArrays;

/// Restricts which directory entries the scanner considers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Accepted extensions, without the leading dot. Empty accepts any.
    pub extensions: Vec<String>,
    /// Glob matched against the file name (not the full path).
    pub name_glob: Option<String>,
    /// Whether names starting with `.` are considered.
    pub include_hidden: bool,
}

impl ScanOptions {
    /// Options accepting only the given extension.
    pub fn with_extension(extension: &str) -> Self {
        Self {
            extensions: vec![extension.trim_start_matches('.').to_ascii_lowercase()],
            ..Self::default()
        }
    }

    pub(crate) fn compile(&self) -> Result<NameFilter> {
        let glob = self
            .name_glob
            .as_deref()
            .map(|raw| {
                glob::Pattern::new(raw).map_err(|error| {
                    SeriesError::Config(format!("invalid name glob {raw:?}: {error}"))
                })
            })
            .transpose()?;
        let extensions = self
            .extensions
            .iter()
            .map(|extension| extension.trim_start_matches('.').to_ascii_lowercase())
            .filter(|extension| !extension.is_empty())
            .collect();
        Ok(NameFilter {
            extensions,
            glob,
            include_hidden: self.include_hidden,
        })
    }
}

/// Compiled form of [`ScanOptions`].
#[derive(Debug)]
pub(crate) struct NameFilter {
    extensions: Vec<String>,
    glob: Option<glob::Pattern>,
    include_hidden: bool,
}

impl NameFilter {
    pub(crate) fn accepts(&self, name: &str) -> bool {
        if !self.include_hidden && name.starts_with('.') {
            return false;
        }
        if !self.extensions.is_empty() {
            let Some(extension) = name.rsplit_once('.').map(|(_, ext)| ext) else {
                return false;
            };
            let extension = extension.to_ascii_lowercase();
            if !self.extensions.iter().any(|accepted| *accepted == extension) {
                return false;
            }
        }
        self.glob
            .as_ref()
            .map(|pattern| pattern.matches(name))
            .unwrap_or(true)
    }
}

/// Half-open range of anchor values `start, start + step, ...` below `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorRange {
    pub start: i64,
    /// Requested exclusive bound; derived from the directory when absent.
    pub stop: Option<i64>,
    pub step: usize,
}

impl Default for AnchorRange {
    fn default() -> Self {
        Self {
            start: 0,
            stop: None,
            step: 1,
        }
    }
}

impl AnchorRange {
    pub fn new(start: i64, stop: Option<i64>, step: usize) -> Self {
        Self { start, stop, step }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.step == 0 {
            return Err(SeriesError::Config(
                "anchor step must be at least 1".to_string(),
            ));
        }
        if self.start < 0 {
            return Err(SeriesError::Config(format!(
                "anchor start must not be negative, got {}",
                self.start
            )));
        }
        Ok(())
    }
}

/// Everything needed to build a [`SeriesOfArrays`], loadable from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub directory: PathBuf,
    pub pattern: String,
    #[serde(default)]
    pub range: AnchorRange,
    #[serde(default)]
    pub scan: ScanOptions,
}

impl SeriesConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|error| {
            SeriesError::Config(format!(
                "failed to read series config {}: {error}",
                path.display()
            ))
        })?;
        serde_json::from_str(&data).map_err(|error| {
            SeriesError::Config(format!(
                "failed to parse series config {}: {error}",
                path.display()
            ))
        })
    }

    /// Scans the directory and builds the sliding generator.
    pub fn open(&self) -> Result<SeriesOfArrays> {
        SeriesOfArrays::with_options(&self.directory, &self.pattern, self.range, &self.scan)
    }

    /// Scans the directory and resolves the single serie of an anchor-free pattern.
    pub fn serie(&self) -> Result<Serie> {
        let pattern = SeriePattern::parse(&self.pattern)?;
        let shape = DirectoryShape::scan(&self.directory, pattern.arity(), &self.scan)?;
        Serie::resolve(&pattern, Arc::new(shape), None)
    }
}
