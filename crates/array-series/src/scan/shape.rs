//! Directory scanning into an immutable shape descriptor.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use fnv::FnvHashSet;
use rayon::prelude::*;

use super::template::{FieldPadding, NameParts, NameTemplate, TemplateKey};
use crate::config::ScanOptions;
use crate::error::{Result, SeriesError};

/// The sorted distinct values observed in one dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionValues {
    values: Vec<u64>,
}

impl DimensionValues {
    pub(crate) fn from_values(values: BTreeSet<u64>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min(&self) -> Option<u64> {
        self.values.first().copied()
    }

    pub fn max(&self) -> Option<u64> {
        self.values.last().copied()
    }

    /// Value at a position of the sorted set.
    pub fn get(&self, position: usize) -> Option<u64> {
        self.values.get(position).copied()
    }

    /// Position of a value in the sorted set.
    pub fn position_of(&self, value: u64) -> Option<usize> {
        self.values.binary_search(&value).ok()
    }
}

/// Snapshot of a directory of numbered files.
///
/// Holds the naming template, the per-dimension value sets and the exact set
/// of index tuples found on disk. The snapshot never refreshes itself; call
/// [`DirectoryShape::rescan`] to take a new one.
#[derive(Debug, Clone)]
pub struct DirectoryShape {
    directory: PathBuf,
    options: ScanOptions,
    template: NameTemplate,
    dimensions: Vec<DimensionValues>,
    entries: FnvHashSet<Box<[u64]>>,
}

impl DirectoryShape {
    /// Lists `directory` and infers a template with `arity` numeric fields.
    pub fn scan(directory: impl AsRef<Path>, arity: usize, options: &ScanOptions) -> Result<Self> {
        let directory = directory.as_ref();
        if arity == 0 {
            return Err(SeriesError::scan(
                directory,
                "at least one numeric field is required",
            ));
        }

        let filter = options.compile()?;
        let names = list_file_names(directory)?;
        let listed = names.len();

        let mut candidates: Vec<(TemplateKey, &str)> = names
            .par_iter()
            .filter(|name| filter.accepts(name))
            .filter_map(|name| {
                let parts = NameParts::split(name);
                (parts.arity() == arity).then(|| (parts.key(), name.as_str()))
            })
            .collect();
        candidates.sort_unstable();

        let mut by_template: BTreeMap<TemplateKey, Vec<&str>> = BTreeMap::new();
        for (key, name) in candidates {
            by_template.entry(key).or_default().push(name);
        }

        let mut templates = by_template.into_iter();
        let Some((key, matched)) = templates.next() else {
            return Err(SeriesError::scan(
                directory,
                format!("none of the {listed} files carries {arity} numeric fields"),
            ));
        };
        let others: Vec<String> = templates.map(|(other, _)| other.to_string()).collect();
        if !others.is_empty() {
            return Err(SeriesError::scan(
                directory,
                format!(
                    "files follow inconsistent naming templates: {key}, {}",
                    others.join(", ")
                ),
            ));
        }

        let split: Vec<NameParts<'_>> =
            matched.iter().map(|name| NameParts::split(name)).collect();
        let padding = (0..arity)
            .map(|dimension| {
                FieldPadding::infer(split.iter().map(|parts| parts.fields[dimension])).map_err(
                    |message| {
                        SeriesError::scan(
                            directory,
                            format!("inconsistent zero-padding in field {dimension}: {message}"),
                        )
                    },
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let template = NameTemplate::new(key, padding);

        let mut values: Vec<BTreeSet<u64>> = vec![BTreeSet::new(); arity];
        let mut entries = FnvHashSet::default();
        for name in &matched {
            let indices = template.parse(name).ok_or_else(|| {
                SeriesError::scan(
                    directory,
                    format!("{name} does not round-trip through template {template}"),
                )
            })?;
            for (set, value) in values.iter_mut().zip(&indices) {
                set.insert(*value);
            }
            if !entries.insert(indices.into_boxed_slice()) {
                return Err(SeriesError::scan(
                    directory,
                    format!("{name} duplicates the indices of another file"),
                ));
            }
        }

        let dimensions: Vec<DimensionValues> = values
            .into_iter()
            .map(DimensionValues::from_values)
            .collect();
        log::info!(
            "scanned {}: {} of {} files follow {} ({})",
            directory.display(),
            entries.len(),
            listed,
            template,
            describe_dimensions(&dimensions)
        );

        Ok(Self {
            directory: directory.to_path_buf(),
            options: options.clone(),
            template,
            dimensions,
            entries,
        })
    }

    /// Takes a fresh snapshot of the same directory with the same options.
    pub fn rescan(&self) -> Result<Self> {
        Self::scan(&self.directory, self.arity(), &self.options)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn template(&self) -> &NameTemplate {
        &self.template
    }

    pub fn arity(&self) -> usize {
        self.dimensions.len()
    }

    pub fn dimensions(&self) -> &[DimensionValues] {
        &self.dimensions
    }

    pub fn dimension(&self, dimension: usize) -> Option<&DimensionValues> {
        self.dimensions.get(dimension)
    }

    /// Number of matched files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a file with these indices was found by the scan.
    pub fn contains(&self, indices: &[u64]) -> bool {
        self.entries.contains(indices)
    }

    pub fn name_from_indices(&self, indices: &[u64]) -> Result<String> {
        self.check_arity(indices)?;
        Ok(self.template.format(indices))
    }

    pub fn path_from_indices(&self, indices: &[u64]) -> Result<PathBuf> {
        Ok(self.directory.join(self.name_from_indices(indices)?))
    }

    pub fn indices_from_name(&self, name: &str) -> Option<Vec<u64>> {
        self.template.parse(name)
    }

    /// Names of every matched file, sorted by index tuple.
    pub fn file_names(&self) -> Vec<String> {
        let mut indices: Vec<&[u64]> = self.entries.iter().map(|entry| &entry[..]).collect();
        indices.sort_unstable();
        indices
            .into_iter()
            .map(|indices| self.template.format(indices))
            .collect()
    }

    fn check_arity(&self, indices: &[u64]) -> Result<()> {
        if indices.len() != self.arity() {
            return Err(SeriesError::indices_out_of_range(
                indices,
                format!(
                    "expected {} indices, got {}",
                    self.arity(),
                    indices.len()
                ),
            ));
        }
        Ok(())
    }
}

fn list_file_names(directory: &Path) -> Result<Vec<String>> {
    let read_dir = fs::read_dir(directory).map_err(|error| {
        SeriesError::scan(directory, format!("cannot list directory: {error}"))
    })?;

    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        // Follow symlinks so linked frames count as files.
        let is_file = fs::metadata(entry.path())
            .map(|metadata| metadata.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => log::debug!("skipping non UTF-8 file name {raw:?}"),
        }
    }
    names.sort_unstable();
    Ok(names)
}

fn describe_dimensions(dimensions: &[DimensionValues]) -> String {
    dimensions
        .iter()
        .map(|values| match (values.min(), values.max()) {
            (Some(min), Some(max)) => format!("{} values in [{min}, {max}]", values.len()),
            _ => "empty".to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, names: &[&str]) {
        for name in names {
            File::create(dir.path().join(name)).unwrap();
        }
    }

    #[test]
    fn scan_two_dimensional_grid() {
        let temp = TempDir::new().unwrap();
        for i in 0..4 {
            for j in 0..2 {
                File::create(temp.path().join(format!("file{i}_{j}.png"))).unwrap();
            }
        }

        let shape = DirectoryShape::scan(temp.path(), 2, &ScanOptions::default()).unwrap();

        assert_eq!(shape.arity(), 2);
        assert_eq!(shape.len(), 8);
        assert_eq!(shape.dimensions()[0].values(), &[0, 1, 2, 3]);
        assert_eq!(shape.dimensions()[1].values(), &[0, 1]);
        assert_eq!(shape.name_from_indices(&[3, 1]).unwrap(), "file3_1.png");
        assert_eq!(shape.indices_from_name("file2_0.png"), Some(vec![2, 0]));
        assert!(shape.contains(&[1, 1]));
        assert!(!shape.contains(&[4, 0]));
    }

    #[test]
    fn gaps_are_preserved() {
        let temp = TempDir::new().unwrap();
        touch(&temp, &["im0002.tif", "im0004.tif", "im0010.tif"]);

        let shape = DirectoryShape::scan(temp.path(), 1, &ScanOptions::default()).unwrap();
        let values = shape.dimension(0).unwrap();

        assert_eq!(values.values(), &[2, 4, 10]);
        assert_eq!(values.min(), Some(2));
        assert_eq!(values.max(), Some(10));
        assert_eq!(values.position_of(4), Some(1));
        assert_eq!(values.position_of(3), None);
        assert_eq!(shape.name_from_indices(&[7]).unwrap(), "im0007.tif");
    }

    #[test]
    fn files_with_other_arity_are_ignored() {
        let temp = TempDir::new().unwrap();
        touch(&temp, &["a1.png", "a2.png", "params.xml", "a1_2.png"]);

        let shape = DirectoryShape::scan(temp.path(), 1, &ScanOptions::default()).unwrap();
        assert_eq!(shape.file_names(), vec!["a1.png", "a2.png"]);
    }

    #[test]
    fn no_matching_file_is_a_scan_error() {
        let temp = TempDir::new().unwrap();
        touch(&temp, &["a1.png", "notes.txt"]);

        let result = DirectoryShape::scan(temp.path(), 3, &ScanOptions::default());
        assert!(matches!(result, Err(SeriesError::Scan { .. })));
    }

    #[test]
    fn inconsistent_separators_are_a_scan_error() {
        let temp = TempDir::new().unwrap();
        touch(&temp, &["f1_1.png", "f1-2.png"]);

        let error = DirectoryShape::scan(temp.path(), 2, &ScanOptions::default()).unwrap_err();
        assert!(error.to_string().contains("inconsistent naming templates"));
    }

    #[test]
    fn inconsistent_padding_is_a_scan_error() {
        let temp = TempDir::new().unwrap();
        touch(&temp, &["f01.png", "f2.png"]);

        let error = DirectoryShape::scan(temp.path(), 1, &ScanOptions::default()).unwrap_err();
        assert!(error.to_string().contains("zero-padding"));
    }

    #[test]
    fn options_select_one_template() {
        let temp = TempDir::new().unwrap();
        touch(&temp, &["a1.png", "a2.png", "b1.png", "a1.tif"]);

        let options = ScanOptions {
            extensions: vec!["png".to_string()],
            name_glob: Some("a*".to_string()),
            include_hidden: false,
        };
        let shape = DirectoryShape::scan(temp.path(), 1, &options).unwrap();
        assert_eq!(shape.file_names(), vec!["a1.png", "a2.png"]);
    }

    #[test]
    fn subdirectories_are_not_files() {
        let temp = TempDir::new().unwrap();
        touch(&temp, &["a1.png"]);
        fs::create_dir(temp.path().join("a2.png")).unwrap();

        let shape = DirectoryShape::scan(temp.path(), 1, &ScanOptions::default()).unwrap();
        assert_eq!(shape.len(), 1);
    }

    #[test]
    fn rescan_is_explicit() {
        let temp = TempDir::new().unwrap();
        touch(&temp, &["a1.png", "a2.png"]);

        let shape = DirectoryShape::scan(temp.path(), 1, &ScanOptions::default()).unwrap();
        touch(&temp, &["a3.png"]);
        assert_eq!(shape.len(), 2);

        let fresh = shape.rescan().unwrap();
        assert_eq!(fresh.len(), 3);
        assert_eq!(fresh.dimension(0).unwrap().values(), &[1, 2, 3]);
    }
}
