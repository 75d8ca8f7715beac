//! One resolved serie: the ordered index tuples selected by a pattern.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, SeriesError};
use crate::loader::ArrayLoader;
use crate::pattern::{ResolvedDimension, SeriePattern};
use crate::scan::DirectoryShape;

/// The files of one unit of work.
///
/// Index tuples are the Cartesian product of the per-dimension values, in
/// nested order with the last dimension varying fastest. A serie is immutable
/// and cheap to clone; the directory snapshot is shared.
#[derive(Debug, Clone)]
pub struct Serie {
    shape: Arc<DirectoryShape>,
    anchor: Option<i64>,
    index_slices: Vec<Vec<u64>>,
    /// Number of tuples spanned by one step of each dimension.
    strides: Vec<usize>,
    len: usize,
    clipped: bool,
}

impl Serie {
    /// Resolves `pattern` against `shape`, with `anchor` bound to `i`.
    pub fn resolve(
        pattern: &SeriePattern,
        shape: Arc<DirectoryShape>,
        anchor: Option<i64>,
    ) -> Result<Self> {
        pattern.check_arity(shape.arity())?;
        let anchor = if pattern.anchor_dimension().is_some() {
            anchor
        } else {
            if let Some(anchor) = anchor {
                log::debug!("pattern `{pattern}` has no anchor, ignoring anchor {anchor}");
            }
            None
        };

        let mut index_slices = Vec::with_capacity(pattern.arity());
        let mut clipped = false;
        for (dimension, (spec, values)) in pattern
            .dimensions()
            .iter()
            .zip(shape.dimensions())
            .enumerate()
        {
            let ResolvedDimension {
                values,
                clipped: dimension_clipped,
            } = spec.resolve(dimension, anchor, values)?;
            clipped |= dimension_clipped;
            index_slices.push(values);
        }

        let mut strides = vec![1usize; index_slices.len()];
        for dimension in (0..index_slices.len().saturating_sub(1)).rev() {
            strides[dimension] = strides[dimension + 1] * index_slices[dimension + 1].len();
        }
        let len = index_slices.iter().map(Vec::len).product();

        let serie = Self {
            shape,
            anchor,
            index_slices,
            strides,
            len,
            clipped,
        };
        let missing = serie
            .iter_indices()
            .find(|indices| !serie.shape.contains(indices));
        if let Some(missing) = missing {
            return Err(SeriesError::indices_out_of_range(
                &missing,
                format!(
                    "pattern `{pattern}` names {} which was not found by the scan",
                    serie.shape.template().format(&missing)
                ),
            ));
        }
        Ok(serie)
    }

    /// Number of index tuples.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The anchor value this serie was resolved with.
    pub fn anchor(&self) -> Option<i64> {
        self.anchor
    }

    /// Whether a slice of this serie ran past the scanned values and was cut short.
    pub fn is_clipped(&self) -> bool {
        self.clipped
    }

    /// The values selected in each dimension.
    pub fn index_slices(&self) -> &[Vec<u64>] {
        &self.index_slices
    }

    pub fn shape(&self) -> &Arc<DirectoryShape> {
        &self.shape
    }

    pub fn iter_indices(&self) -> SerieIndices<'_> {
        SerieIndices {
            serie: self,
            position: 0,
        }
    }

    /// Index tuple at `position` within the serie.
    pub fn get_indices_from_index(&self, position: usize) -> Result<Vec<u64>> {
        if position >= self.len {
            return Err(SeriesError::out_of_range(format!(
                "position {position} is beyond the {} files of the serie",
                self.len
            )));
        }
        Ok(self.indices_at(position))
    }

    /// Position of an index tuple within the serie.
    pub fn index_from_indices(&self, indices: &[u64]) -> Option<usize> {
        if indices.len() != self.index_slices.len() {
            return None;
        }
        indices
            .iter()
            .zip(&self.index_slices)
            .zip(&self.strides)
            .try_fold(0usize, |position, ((value, values), stride)| {
                let offset = values.iter().position(|candidate| candidate == value)?;
                Some(position + offset * stride)
            })
    }

    pub fn name_from_indices(&self, indices: &[u64]) -> Result<String> {
        self.shape.name_from_indices(indices)
    }

    pub fn path_from_indices(&self, indices: &[u64]) -> Result<PathBuf> {
        self.shape.path_from_indices(indices)
    }

    /// Parses the file name of `path` back into its index tuple.
    pub fn indices_from_path(&self, path: &Path) -> Result<Vec<u64>> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                SeriesError::out_of_range(format!("{} has no file name", path.display()))
            })?;
        self.shape.indices_from_name(name).ok_or_else(|| {
            SeriesError::out_of_range(format!(
                "{name} does not follow the naming template {}",
                self.shape.template()
            ))
        })
    }

    pub fn file_names(&self) -> Vec<String> {
        self.iter_indices()
            .map(|indices| self.shape.template().format(&indices))
            .collect()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let directory = self.shape.directory();
        self.iter_indices()
            .map(|indices| directory.join(self.shape.template().format(&indices)))
            .collect()
    }

    /// Fails with the first path that is no longer on disk.
    pub fn check_all_files_exist(&self) -> Result<()> {
        match self.paths().into_iter().find(|path| !path.is_file()) {
            Some(missing) => Err(SeriesError::MissingFile(missing)),
            None => Ok(()),
        }
    }

    /// Loads every file of the serie in order.
    pub fn load_arrays<L: ArrayLoader>(&self, loader: &L) -> Result<Vec<(PathBuf, L::Array)>> {
        self.paths()
            .into_iter()
            .map(|path| {
                let array = loader.load(&path)?;
                Ok((path, array))
            })
            .collect()
    }

    fn indices_at(&self, position: usize) -> Vec<u64> {
        self.index_slices
            .iter()
            .zip(&self.strides)
            .map(|(values, stride)| values[(position / stride) % values.len()])
            .collect()
    }
}

/// Iterator over the index tuples of a [`Serie`].
#[derive(Debug, Clone)]
pub struct SerieIndices<'a> {
    serie: &'a Serie,
    position: usize,
}

impl Iterator for SerieIndices<'_> {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Vec<u64>> {
        if self.position >= self.serie.len {
            return None;
        }
        let indices = self.serie.indices_at(self.position);
        self.position += 1;
        Some(indices)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.serie.len - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SerieIndices<'_> {}
