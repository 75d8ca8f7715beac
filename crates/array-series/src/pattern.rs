//! Pattern grammar selecting the files of one serie.
//!
//! A pattern holds one comma-separated item per dimension of the directory:
//! - `3`: a fixed file index
//! - `1:4`, `1:1+3:2`, `:`: a slice over the positions of the sorted values
//! - `i:i+2`, `i-1:i+1:2`, `i`: a slice relative to the moving anchor `i`

mod dimension;
mod parser;

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SeriesError};

pub use dimension::DimensionSpec;
pub(crate) use dimension::ResolvedDimension;
pub use parser::PatternParser;

/// A compiled pattern: one [`DimensionSpec`] per dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriePattern {
    source: String,
    dimensions: Vec<DimensionSpec>,
    anchor_dimension: Option<usize>,
}

impl SeriePattern {
    pub fn parse(raw: &str) -> Result<Self> {
        PatternParser::parse(raw)
    }

    /// Parses and checks the dimension count against the directory arity.
    pub fn parse_with_arity(raw: &str, arity: usize) -> Result<Self> {
        let pattern = Self::parse(raw)?;
        pattern.check_arity(arity)?;
        Ok(pattern)
    }

    pub(crate) fn from_parts(
        source: String,
        dimensions: Vec<DimensionSpec>,
        anchor_dimension: Option<usize>,
    ) -> Self {
        Self {
            source,
            dimensions,
            anchor_dimension,
        }
    }

    pub fn check_arity(&self, arity: usize) -> Result<()> {
        if self.arity() == arity {
            return Ok(());
        }
        Err(SeriesError::syntax(
            &self.source,
            self.source.len(),
            format!(
                "pattern has {} dimensions but the files carry {arity} numeric fields",
                self.arity()
            ),
        ))
    }

    /// The pattern text as written, trimmed.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn dimensions(&self) -> &[DimensionSpec] {
        &self.dimensions
    }

    pub fn arity(&self) -> usize {
        self.dimensions.len()
    }

    /// Index of the dimension carrying the anchor `i`, if any.
    pub fn anchor_dimension(&self) -> Option<usize> {
        self.anchor_dimension
    }

    pub fn anchor_spec(&self) -> Option<DimensionSpec> {
        self.anchor_dimension.map(|dimension| self.dimensions[dimension])
    }
}

impl FromStr for SeriePattern {
    type Err = SeriesError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::parse(raw)
    }
}

impl fmt::Display for SeriePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, dimension) in self.dimensions.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{dimension}")?;
        }
        Ok(())
    }
}
