//! Sliding an anchored pattern across a directory.
//!
//! ## Effective stop
//!
//! Anchors are walked one by one from `start` while the serie at that anchor
//! resolves without clipping; the last such anchor is `last_full`.
//!
//! - Without a requested stop, the effective stop is `last_full + 1`.
//! - With a requested stop, it is `min(stop, last_full + step)`. This keeps at
//!   most one trailing serie whose anchored slice is cut at the end of the
//!   scanned values. If that trailing serie does not resolve at all, the stop
//!   falls back to `min(stop, last_full + 1)`. When even the first anchor is
//!   clipped but resolves, that single serie is kept and the stop is
//!   `start + 1`.
//!
//! With eight files and `i:i+3:2`, `last_full` is 5, so an automatic stop is 6
//! (anchors 0, 2, 4 at step 2) and a requested stop of 8 becomes 7 (anchors
//! 0, 2, 4, 6, the last one holding only file 6).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{AnchorRange, ScanOptions};
use crate::error::{Result, SeriesError};
use crate::pattern::{DimensionSpec, SeriePattern};
use crate::scan::DirectoryShape;
use crate::serie::Serie;

/// An ordered, lazily resolved sequence of series.
#[derive(Debug, Clone)]
pub struct SeriesOfArrays {
    pattern: SeriePattern,
    shape: Arc<DirectoryShape>,
    anchor_dimension: usize,
    requested: AnchorRange,
    ind_stop: i64,
    len: usize,
    cursor: usize,
}

impl SeriesOfArrays {
    /// Scans `directory` with default options and builds the generator.
    pub fn new(directory: impl AsRef<Path>, pattern: &str, range: AnchorRange) -> Result<Self> {
        Self::with_options(directory, pattern, range, &ScanOptions::default())
    }

    pub fn with_options(
        directory: impl AsRef<Path>,
        pattern: &str,
        range: AnchorRange,
        options: &ScanOptions,
    ) -> Result<Self> {
        let pattern = SeriePattern::parse(pattern)?;
        let shape = DirectoryShape::scan(directory, pattern.arity(), options)?;
        Self::from_shape(Arc::new(shape), pattern, range)
    }

    /// Builds the generator over an existing snapshot.
    pub fn from_shape(
        shape: Arc<DirectoryShape>,
        pattern: SeriePattern,
        range: AnchorRange,
    ) -> Result<Self> {
        range.validate()?;
        pattern.check_arity(shape.arity())?;
        let anchor_dimension = pattern.anchor_dimension().ok_or_else(|| {
            SeriesError::syntax(
                pattern.source(),
                0,
                "a sliding series needs one dimension using the anchor `i`",
            )
        })?;

        let mut series = Self {
            pattern,
            shape,
            anchor_dimension,
            requested: range,
            ind_stop: range.start,
            len: 0,
            cursor: 0,
        };
        series.ind_stop = series.effective_stop()?;
        series.len = anchor_count(range.start, series.ind_stop, range.step);
        if series.len == 0 {
            return Err(SeriesError::out_of_range(match range.stop {
                Some(stop) => format!(
                    "no anchor in {}..{stop} yields a serie for `{}`",
                    range.start, series.pattern
                ),
                None => format!(
                    "no anchor from {} yields a complete serie for `{}`",
                    range.start, series.pattern
                ),
            }));
        }

        log::debug!(
            "series `{}` over {}: anchors {}..{} step {} (requested stop {:?}), {} series",
            series.pattern,
            series.shape.directory().display(),
            range.start,
            series.ind_stop,
            range.step,
            range.stop,
            series.len
        );
        Ok(series)
    }

    fn effective_stop(&self) -> Result<i64> {
        let AnchorRange { start, stop, step } = self.requested;

        let mut last_full = None;
        let mut anchor = start;
        while stop.map_or(true, |stop| anchor < stop) {
            match self.resolve(anchor) {
                Ok(serie) if !serie.is_clipped() => {
                    last_full = Some(anchor);
                    anchor += 1;
                }
                _ => break,
            }
        }

        let Some(last_full) = last_full else {
            if stop.map_or(true, |stop| start < stop) {
                // Surface why the very first anchor fails.
                self.resolve(start)?;
                if stop.is_some() {
                    log::debug!("only a clipped serie at anchor {start} fits the requested range");
                    return Ok(start + 1);
                }
            }
            return Ok(start);
        };

        let Some(stop) = stop else {
            return Ok(last_full + 1);
        };
        let reach = i64::try_from(step).unwrap_or(i64::MAX);
        let candidate = stop.min(last_full.saturating_add(reach));
        let last_anchor = last_anchor_below(start, candidate, step);
        if last_anchor.is_some_and(|last| last > last_full) {
            let trailing = last_anchor.and_then(|last| self.resolve(last).ok());
            if trailing.is_none() {
                log::debug!("trailing serie at anchor {last_anchor:?} does not resolve");
                return Ok(stop.min(last_full + 1));
            }
        }
        if candidate < stop {
            log::debug!("requested stop {stop} clamped to {candidate}");
        }
        Ok(candidate)
    }

    fn resolve(&self, anchor: i64) -> Result<Serie> {
        Serie::resolve(&self.pattern, self.shape.clone(), Some(anchor))
    }

    /// Number of series.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn ind_start(&self) -> i64 {
        self.requested.start
    }

    /// The effective exclusive bound on anchor values.
    pub fn ind_stop(&self) -> i64 {
        self.ind_stop
    }

    pub fn ind_step(&self) -> usize {
        self.requested.step
    }

    /// The range as given by the caller, before the stop was derived or clamped.
    pub fn requested_range(&self) -> AnchorRange {
        self.requested
    }

    pub fn pattern(&self) -> &SeriePattern {
        &self.pattern
    }

    pub fn anchor_dimension(&self) -> usize {
        self.anchor_dimension
    }

    pub fn anchor_spec(&self) -> DimensionSpec {
        self.pattern.dimensions()[self.anchor_dimension]
    }

    pub fn shape(&self) -> &Arc<DirectoryShape> {
        &self.shape
    }

    /// Anchor value of the `index`-th serie.
    pub fn anchor_at(&self, index: usize) -> Option<i64> {
        if index >= self.len {
            return None;
        }
        nth_anchor(self.requested.start, index, self.requested.step)
    }

    /// The `index`-th serie.
    pub fn serie(&self, index: usize) -> Result<Serie> {
        let anchor = self.anchor_at(index).ok_or_else(|| {
            SeriesError::out_of_range(format!(
                "serie {index} requested but there are only {}",
                self.len
            ))
        })?;
        self.resolve(anchor)
    }

    /// The serie under the cursor, advancing it. `None` once exhausted.
    ///
    /// The cursor needs `&mut self`; concurrent consumers should use
    /// [`SeriesOfArrays::serie`] with explicit indices instead.
    pub fn next_serie(&mut self) -> Option<Result<Serie>> {
        if self.cursor >= self.len {
            return None;
        }
        let serie = self.serie(self.cursor);
        self.cursor += 1;
        Some(serie)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    pub fn iter(&self) -> SeriesIter<'_> {
        SeriesIter {
            series: self,
            index: 0,
        }
    }

    /// File names of every serie, flattened. Overlapping windows repeat names.
    pub fn all_file_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for serie in self.iter() {
            names.extend(serie?.file_names());
        }
        Ok(names)
    }

    /// Paths of every serie, flattened. Overlapping windows repeat paths.
    pub fn all_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for serie in self.iter() {
            paths.extend(serie?.paths());
        }
        Ok(paths)
    }
}

impl<'a> IntoIterator for &'a SeriesOfArrays {
    type Item = Result<Serie>;
    type IntoIter = SeriesIter<'a>;

    fn into_iter(self) -> SeriesIter<'a> {
        self.iter()
    }
}

/// Iterator resolving each serie on demand.
#[derive(Debug, Clone)]
pub struct SeriesIter<'a> {
    series: &'a SeriesOfArrays,
    index: usize,
}

impl Iterator for SeriesIter<'_> {
    type Item = Result<Serie>;

    fn next(&mut self) -> Option<Result<Serie>> {
        if self.index >= self.series.len {
            return None;
        }
        let serie = self.series.serie(self.index);
        self.index += 1;
        Some(serie)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.series.len - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SeriesIter<'_> {}

fn anchor_count(start: i64, stop: i64, step: usize) -> usize {
    if stop <= start {
        return 0;
    }
    let span = (stop - start) as u64;
    span.div_ceil(step as u64) as usize
}

fn last_anchor_below(start: i64, stop: i64, step: usize) -> Option<i64> {
    match anchor_count(start, stop, step) {
        0 => None,
        count => nth_anchor(start, count - 1, step),
    }
}

fn nth_anchor(start: i64, index: usize, step: usize) -> Option<i64> {
    let offset = index.checked_mul(step)?;
    start.checked_add(i64::try_from(offset).ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn frames(temp: &TempDir, count: u64) {
        for i in 0..count {
            File::create(temp.path().join(format!("im{i:03}.tif"))).unwrap();
        }
    }

    fn anchors(series: &SeriesOfArrays) -> Vec<i64> {
        series
            .iter()
            .map(|serie| serie.unwrap().anchor().unwrap())
            .collect()
    }

    #[test]
    fn anchor_arithmetic() {
        assert_eq!(anchor_count(0, 7, 2), 4);
        assert_eq!(anchor_count(0, 6, 2), 3);
        assert_eq!(anchor_count(3, 3, 1), 0);
        assert_eq!(last_anchor_below(0, 7, 2), Some(6));
        assert_eq!(last_anchor_below(1, 2, 5), Some(1));
        assert_eq!(last_anchor_below(2, 2, 5), None);
    }

    #[test]
    fn consecutive_pairs() {
        let temp = TempDir::new().unwrap();
        frames(&temp, 5);

        let series = SeriesOfArrays::new(temp.path(), "i:i+2", AnchorRange::default()).unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series.ind_stop(), 4);
        assert_eq!(
            series.serie(3).unwrap().file_names(),
            vec!["im003.tif", "im004.tif"]
        );
        assert!(series.serie(4).is_err());
    }

    #[test]
    fn requested_stop_inside_range_is_kept() {
        let temp = TempDir::new().unwrap();
        frames(&temp, 10);

        let series =
            SeriesOfArrays::new(temp.path(), "i:i+2", AnchorRange::new(1, Some(4), 1)).unwrap();
        assert_eq!(series.ind_stop(), 4);
        assert_eq!(anchors(&series), vec![1, 2, 3]);
    }

    #[test]
    fn negative_offsets_need_a_late_enough_start() {
        let temp = TempDir::new().unwrap();
        frames(&temp, 6);

        let error =
            SeriesOfArrays::new(temp.path(), "i-1:i+1", AnchorRange::default()).unwrap_err();
        assert!(matches!(error, SeriesError::OutOfRange { .. }));

        let series =
            SeriesOfArrays::new(temp.path(), "i-1:i+1", AnchorRange::new(1, None, 1)).unwrap();
        assert_eq!(anchors(&series), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn step_larger_than_window_drops_unresolvable_trailing_serie() {
        let temp = TempDir::new().unwrap();
        frames(&temp, 4);

        // last_full is 2; anchor 2 + 5 would start past the files.
        let series =
            SeriesOfArrays::new(temp.path(), "i:i+2", AnchorRange::new(0, Some(20), 5)).unwrap();
        assert_eq!(series.ind_stop(), 3);
        assert_eq!(anchors(&series), vec![0]);
    }

    #[test]
    fn cursor_walks_every_serie_once() {
        let temp = TempDir::new().unwrap();
        frames(&temp, 4);

        let mut series = SeriesOfArrays::new(temp.path(), "i", AnchorRange::default()).unwrap();
        let mut names = Vec::new();
        while let Some(serie) = series.next_serie() {
            names.extend(serie.unwrap().file_names());
        }
        assert_eq!(names, vec!["im000.tif", "im001.tif", "im002.tif", "im003.tif"]);
        assert_eq!(series.cursor(), 4);
        assert!(series.next_serie().is_none());

        series.reset_cursor();
        assert_eq!(series.next_serie().unwrap().unwrap().anchor(), Some(0));
    }

    #[test]
    fn anchor_free_pattern_is_rejected() {
        let temp = TempDir::new().unwrap();
        frames(&temp, 4);

        let error = SeriesOfArrays::new(temp.path(), "0:2", AnchorRange::default()).unwrap_err();
        assert!(matches!(error, SeriesError::PatternSyntax { .. }));
    }

    #[test]
    fn empty_requested_range_is_an_error() {
        let temp = TempDir::new().unwrap();
        frames(&temp, 4);

        let result = SeriesOfArrays::new(temp.path(), "i", AnchorRange::new(2, Some(2), 1));
        assert!(matches!(result, Err(SeriesError::OutOfRange { .. })));
        let result = SeriesOfArrays::new(temp.path(), "i", AnchorRange::new(0, None, 0));
        assert!(matches!(result, Err(SeriesError::Config(_))));
    }

    #[test]
    fn huge_step_keeps_a_single_anchor() {
        let temp = TempDir::new().unwrap();
        frames(&temp, 8);

        let series = SeriesOfArrays::new(
            temp.path(),
            "i:i+3",
            AnchorRange::new(0, Some(8), usize::MAX),
        )
        .unwrap();
        assert_eq!(series.ind_stop(), 8);
        assert_eq!(series.len(), 1);
        assert_eq!(anchors(&series), vec![0]);
        assert_eq!(series.anchor_at(1), None);
        assert_eq!(nth_anchor(0, 2, usize::MAX), None);
    }

    #[test]
    fn clipped_first_serie_fits_an_explicit_stop() {
        let temp = TempDir::new().unwrap();
        frames(&temp, 3);

        let series =
            SeriesOfArrays::new(temp.path(), "i:i+5", AnchorRange::new(0, Some(1), 1)).unwrap();
        assert_eq!(series.ind_stop(), 1);
        assert_eq!(series.len(), 1);
        let serie = series.serie(0).unwrap();
        assert!(serie.is_clipped());
        assert_eq!(serie.file_names(), vec!["im000.tif", "im001.tif", "im002.tif"]);

        let error =
            SeriesOfArrays::new(temp.path(), "i:i+5", AnchorRange::default()).unwrap_err();
        assert!(matches!(error, SeriesError::OutOfRange { .. }));
    }

    #[test]
    fn anchor_overflow_is_reported_not_wrapped() {
        let temp = TempDir::new().unwrap();
        frames(&temp, 4);

        let error = SeriesOfArrays::new(
            temp.path(),
            "i:i+9223372036854775807",
            AnchorRange::new(1, None, 1),
        )
        .unwrap_err();
        match error {
            SeriesError::OutOfRange { dimension, .. } => assert_eq!(dimension, Some(0)),
            other => panic!("expected out of range, got {other:?}"),
        }

        let series = SeriesOfArrays::new(
            temp.path(),
            "i:i+9223372036854775807",
            AnchorRange::new(0, Some(1), 1),
        )
        .unwrap();
        assert_eq!(series.serie(0).unwrap().len(), 4);
    }

    #[test]
    fn series_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Serie>();
        assert_send_sync::<SeriesOfArrays>();
        assert_send_sync::<DirectoryShape>();
    }
}
