//! Per-dimension index specifications and their resolution.

use std::fmt;

use crate::error::{Result, SeriesError};
use crate::scan::DimensionValues;

/// How one dimension of a pattern selects values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionSpec {
    /// A single literal file index.
    Fixed(u64),
    /// Positions `start..stop` of the sorted value set, every `step`.
    /// A missing `stop` spans to the end of the dimension.
    Slice {
        start: i64,
        stop: Option<i64>,
        step: usize,
    },
    /// `i + offset_start .. i + offset_stop`, every `step`, for an anchor `i`.
    AnchorSlice {
        offset_start: i64,
        offset_stop: i64,
        step: usize,
    },
}

/// Values selected for one dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedDimension {
    pub values: Vec<u64>,
    /// The requested stop ran past the end of the value set.
    pub clipped: bool,
}

impl DimensionSpec {
    pub fn is_anchored(&self) -> bool {
        matches!(self, Self::AnchorSlice { .. })
    }

    /// Replaces an anchor-relative slice by the absolute slice for `anchor`.
    ///
    /// Returns `None` when a bound does not fit in an `i64`.
    pub fn at_anchor(&self, anchor: i64) -> Option<Self> {
        match *self {
            Self::AnchorSlice {
                offset_start,
                offset_stop,
                step,
            } => Some(Self::Slice {
                start: anchor.checked_add(offset_start)?,
                stop: Some(anchor.checked_add(offset_stop)?),
                step,
            }),
            other => Some(other),
        }
    }

    pub(crate) fn resolve(
        &self,
        dimension: usize,
        anchor: Option<i64>,
        values: &DimensionValues,
    ) -> Result<ResolvedDimension> {
        match *self {
            Self::Fixed(value) => {
                if values.position_of(value).is_none() {
                    return Err(SeriesError::dimension_out_of_range(
                        dimension,
                        format!("value {value} is not present in the scanned files"),
                    ));
                }
                Ok(ResolvedDimension {
                    values: vec![value],
                    clipped: false,
                })
            }
            Self::Slice { start, stop, step } => {
                resolve_slice(dimension, start, stop, step, values)
            }
            Self::AnchorSlice { .. } => {
                let anchor = anchor.ok_or_else(|| {
                    SeriesError::dimension_out_of_range(
                        dimension,
                        format!("pattern `{self}` needs an anchor value"),
                    )
                })?;
                let absolute = self.at_anchor(anchor).ok_or_else(|| {
                    SeriesError::dimension_out_of_range(
                        dimension,
                        format!("pattern `{self}` overflows at anchor {anchor}"),
                    )
                })?;
                absolute.resolve(dimension, None, values)
            }
        }
    }
}

fn resolve_slice(
    dimension: usize,
    start: i64,
    stop: Option<i64>,
    step: usize,
    values: &DimensionValues,
) -> Result<ResolvedDimension> {
    let count = values.len();
    if step == 0 {
        return Err(SeriesError::dimension_out_of_range(
            dimension,
            "slice step must be at least 1",
        ));
    }
    let Ok(start) = usize::try_from(start) else {
        return Err(SeriesError::dimension_out_of_range(
            dimension,
            format!("slice start {start} is negative"),
        ));
    };
    if start >= count {
        return Err(SeriesError::dimension_out_of_range(
            dimension,
            format!("slice start {start} is beyond the {count} scanned values"),
        ));
    }
    let stop = match stop {
        None => count,
        Some(stop) if stop <= start as i64 => {
            return Err(SeriesError::dimension_out_of_range(
                dimension,
                format!("slice {start}:{stop} is empty"),
            ));
        }
        Some(stop) => usize::try_from(stop).unwrap_or(usize::MAX),
    };

    let clipped = stop > count;
    let selected = (start..stop.min(count))
        .step_by(step)
        .filter_map(|position| values.get(position))
        .collect();
    Ok(ResolvedDimension {
        values: selected,
        clipped,
    })
}

impl fmt::Display for DimensionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Fixed(value) => write!(f, "{value}"),
            Self::Slice { start, stop, step } => {
                if start != 0 {
                    write!(f, "{start}")?;
                }
                f.write_str(":")?;
                if let Some(stop) = stop {
                    write!(f, "{stop}")?;
                }
                if step != 1 {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
            Self::AnchorSlice {
                offset_start,
                offset_stop,
                step,
            } => {
                write_anchor(f, offset_start)?;
                f.write_str(":")?;
                write_anchor(f, offset_stop)?;
                if step != 1 {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
        }
    }
}

fn write_anchor(f: &mut fmt::Formatter<'_>, offset: i64) -> fmt::Result {
    match offset {
        0 => f.write_str("i"),
        offset if offset > 0 => write!(f, "i+{offset}"),
        offset => write!(f, "i-{}", offset.unsigned_abs()),
    }
}
