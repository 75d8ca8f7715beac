//! Hand-off of resolved file paths to an array loader.
//!
//! Decoding is not done here. A loader receives one path and returns whatever
//! opaque array type it produces; the serie only decides the order.

use std::fs::File;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};

use crate::error::{Result, SeriesError};

/// Loads the array stored in one file.
pub trait ArrayLoader {
    type Array;

    fn load(&self, path: &Path) -> Result<Self::Array>;
}

impl<F, A> ArrayLoader for F
where
    F: Fn(&Path) -> Result<A>,
{
    type Array = A;

    fn load(&self, path: &Path) -> Result<A> {
        self(path)
    }
}

/// Reads the whole file into memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesLoader;

impl ArrayLoader for BytesLoader {
    type Array = Vec<u8>;

    fn load(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|error| load_error(path, error))
    }
}

/// Maps the file read-only; decoding happens on the caller's side.
#[derive(Debug, Clone, Copy, Default)]
pub struct MmapLoader;

impl ArrayLoader for MmapLoader {
    type Array = Mmap;

    fn load(&self, path: &Path) -> Result<Mmap> {
        let file = File::open(path).map_err(|error| load_error(path, error))?;
        // The mapping is only valid while nobody truncates the file.
        unsafe { MmapOptions::new().map(&file) }.map_err(|error| load_error(path, error))
    }
}

fn load_error(path: &Path, error: std::io::Error) -> SeriesError {
    SeriesError::Load {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}
