use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scan error in {}: {message}", .directory.display())]
    Scan { directory: PathBuf, message: String },

    #[error("Pattern syntax error near {fragment:?} at byte {position}: {message}")]
    PatternSyntax {
        fragment: String,
        position: usize,
        message: String,
    },

    #[error("Out of range{}: {message}", location_suffix(.dimension, .indices))]
    OutOfRange {
        dimension: Option<usize>,
        indices: Option<Vec<u64>>,
        message: String,
    },

    #[error("Missing file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Load error for {}: {message}", .path.display())]
    Load { path: PathBuf, message: String },

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SeriesError>;

impl SeriesError {
    pub(crate) fn scan(directory: &Path, message: impl Into<String>) -> Self {
        Self::Scan {
            directory: directory.to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn syntax(fragment: &str, position: usize, message: impl Into<String>) -> Self {
        Self::PatternSyntax {
            fragment: fragment.to_string(),
            position,
            message: message.into(),
        }
    }

    pub(crate) fn dimension_out_of_range(dimension: usize, message: impl Into<String>) -> Self {
        Self::OutOfRange {
            dimension: Some(dimension),
            indices: None,
            message: message.into(),
        }
    }

    pub(crate) fn indices_out_of_range(indices: &[u64], message: impl Into<String>) -> Self {
        Self::OutOfRange {
            dimension: None,
            indices: Some(indices.to_vec()),
            message: message.into(),
        }
    }

    pub(crate) fn out_of_range(message: impl Into<String>) -> Self {
        Self::OutOfRange {
            dimension: None,
            indices: None,
            message: message.into(),
        }
    }
}

fn location_suffix(dimension: &Option<usize>, indices: &Option<Vec<u64>>) -> String {
    let mut suffix = String::new();
    if let Some(dimension) = dimension {
        let _ = write!(suffix, " in dimension {dimension}");
    }
    if let Some(indices) = indices {
        let _ = write!(suffix, " at indices {indices:?}");
    }
    suffix
}
