//! Filename decomposition into literal runs and numeric fields.
//!
//! A name such as `cam_a_0012-3.png` splits into an extension (`png`), the
//! literal runs `["cam_a_", "-", ""]` and the numeric fields `["0012", "3"]`.
//! There is always one more literal run than there are fields.

use std::fmt;

/// A filename split at its ASCII-digit runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NameParts<'a> {
    pub literals: Vec<&'a str>,
    pub fields: Vec<&'a str>,
    pub extension: Option<&'a str>,
}

impl<'a> NameParts<'a> {
    pub fn split(name: &'a str) -> Self {
        let (stem, extension) = split_extension(name);
        let mut literals = Vec::new();
        let mut fields = Vec::new();
        let mut literal_start = 0usize;
        let bytes = stem.as_bytes();
        let mut cursor = 0usize;

        while cursor < bytes.len() {
            if !bytes[cursor].is_ascii_digit() {
                cursor += 1;
                continue;
            }
            let field_start = cursor;
            while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
                cursor += 1;
            }
            literals.push(&stem[literal_start..field_start]);
            fields.push(&stem[field_start..cursor]);
            literal_start = cursor;
        }
        literals.push(&stem[literal_start..]);

        Self {
            literals,
            fields,
            extension,
        }
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    pub fn key(&self) -> TemplateKey {
        TemplateKey {
            literals: self.literals.iter().map(|s| s.to_string()).collect(),
            extension: self.extension.map(str::to_string),
        }
    }
}

/// The extension is the text after the last dot, provided it holds no digit
/// and the dot does not start the name.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < name.len() => {
            let extension = &name[dot + 1..];
            if extension.bytes().any(|b| b.is_ascii_digit()) {
                (name, None)
            } else {
                (&name[..dot], Some(extension))
            }
        }
        _ => (name, None),
    }
}

/// Everything in a filename except the numeric fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct TemplateKey {
    pub literals: Vec<String>,
    pub extension: Option<String>,
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, literal) in self.literals.iter().enumerate() {
            if index > 0 {
                f.write_str("{}")?;
            }
            f.write_str(literal)?;
        }
        if let Some(extension) = &self.extension {
            write!(f, ".{extension}")?;
        }
        Ok(())
    }
}

/// How a numeric field is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPadding {
    /// Plain decimal, no leading zeros.
    None,
    /// Zero-padded to at least this many digits.
    Zero(usize),
}

impl FieldPadding {
    /// Infers the padding of one field from every raw value seen for it.
    pub(crate) fn infer<'a>(raw_values: impl IntoIterator<Item = &'a str>) -> Result<Self, String> {
        let raw_values: Vec<&str> = raw_values.into_iter().collect();
        let padded_width = raw_values
            .iter()
            .find(|raw| raw.len() > 1 && raw.starts_with('0'))
            .map(|raw| raw.len());

        let Some(width) = padded_width else {
            return Ok(Self::None);
        };

        for raw in &raw_values {
            let fits = raw.len() == width || (raw.len() > width && !raw.starts_with('0'));
            if !fits {
                return Err(format!(
                    "value {raw:?} does not match the zero-padded width {width} of its field"
                ));
            }
        }
        Ok(Self::Zero(width))
    }

    fn accepts(self, raw: &str) -> bool {
        match self {
            Self::None => raw == "0" || !raw.starts_with('0'),
            Self::Zero(width) => {
                raw.len() == width || (raw.len() > width && !raw.starts_with('0'))
            }
        }
    }

    fn write(self, out: &mut String, value: u64) {
        match self {
            Self::None => out.push_str(&value.to_string()),
            Self::Zero(width) => out.push_str(&format!("{value:0width$}")),
        }
    }
}

/// Rebuilds filenames from index tuples and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplate {
    literals: Vec<String>,
    extension: Option<String>,
    padding: Vec<FieldPadding>,
}

impl NameTemplate {
    pub(crate) fn new(key: TemplateKey, padding: Vec<FieldPadding>) -> Self {
        debug_assert_eq!(key.literals.len(), padding.len() + 1);
        Self {
            literals: key.literals,
            extension: key.extension,
            padding,
        }
    }

    /// Number of numeric fields.
    pub fn arity(&self) -> usize {
        self.padding.len()
    }

    pub fn padding(&self) -> &[FieldPadding] {
        &self.padding
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Formats a filename. `indices` must hold exactly `arity()` values.
    pub fn format(&self, indices: &[u64]) -> String {
        let mut name = String::new();
        for (index, literal) in self.literals.iter().enumerate() {
            if index > 0 {
                self.padding[index - 1].write(&mut name, indices[index - 1]);
            }
            name.push_str(literal);
        }
        if let Some(extension) = &self.extension {
            name.push('.');
            name.push_str(extension);
        }
        name
    }

    /// Parses a filename written with this template.
    pub fn parse(&self, name: &str) -> Option<Vec<u64>> {
        let parts = NameParts::split(name);
        if parts.extension != self.extension.as_deref()
            || parts.literals.len() != self.literals.len()
            || parts
                .literals
                .iter()
                .zip(&self.literals)
                .any(|(seen, expected)| *seen != expected.as_str())
        {
            return None;
        }

        parts
            .fields
            .iter()
            .zip(&self.padding)
            .map(|(raw, padding)| {
                if padding.accepts(raw) {
                    raw.parse::<u64>().ok()
                } else {
                    None
                }
            })
            .collect()
    }
}

impl fmt::Display for NameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, literal) in self.literals.iter().enumerate() {
            if index > 0 {
                match self.padding[index - 1] {
                    FieldPadding::None => f.write_str("{}")?,
                    FieldPadding::Zero(width) => write!(f, "{{:0{width}}}")?,
                }
            }
            f.write_str(literal)?;
        }
        if let Some(extension) = &self.extension {
            write!(f, ".{extension}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(name: &str, padding: Vec<FieldPadding>) -> NameTemplate {
        NameTemplate::new(NameParts::split(name).key(), padding)
    }

    #[test]
    fn split_two_fields_with_extension() {
        let parts = NameParts::split("file12_3.png");
        assert_eq!(parts.literals, vec!["file", "_", ""]);
        assert_eq!(parts.fields, vec!["12", "3"]);
        assert_eq!(parts.extension, Some("png"));
    }

    #[test]
    fn extension_with_digits_stays_in_stem() {
        let parts = NameParts::split("scan_004.h5");
        assert_eq!(parts.extension, None);
        assert_eq!(parts.fields, vec!["004", "5"]);
    }

    #[test]
    fn hidden_name_has_no_extension() {
        let parts = NameParts::split(".frame1");
        assert_eq!(parts.extension, None);
        assert_eq!(parts.literals, vec![".frame", ""]);
    }

    #[test]
    fn infer_padding() {
        assert_eq!(FieldPadding::infer(["1", "10", "2"]), Ok(FieldPadding::None));
        assert_eq!(
            FieldPadding::infer(["001", "010", "100"]),
            Ok(FieldPadding::Zero(3))
        );
        assert_eq!(
            FieldPadding::infer(["01", "02", "100"]),
            Ok(FieldPadding::Zero(2))
        );
        assert!(FieldPadding::infer(["01", "1"]).is_err());
        assert!(FieldPadding::infer(["01", "001"]).is_err());
    }

    #[test]
    fn format_and_parse_zero_padded() {
        let template = template(
            "im_0001a02.tif",
            vec![FieldPadding::Zero(4), FieldPadding::None],
        );
        assert_eq!(template.format(&[12, 3]), "im_0012a3.tif");
        assert_eq!(template.parse("im_0012a3.tif"), Some(vec![12, 3]));
        assert_eq!(template.parse("im_12a3.tif"), None);
        assert_eq!(template.parse("im_0012a03.tif"), None);
        assert_eq!(template.parse("im_0012b3.tif"), None);
        assert_eq!(template.parse("im_0012a3.png"), None);
        assert_eq!(template.to_string(), "im_{:04}a{}.tif");
    }
}
