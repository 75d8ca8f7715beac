//! Pattern parser and tokenizer.
//!
//! Grammar, one comma-separated item per dimension:
//!
//! ```text
//! dimension := bound | bound? ':' bound? (':' bound?)?
//! bound     := sign? term (('+' | '-') term)*
//! term      := integer | 'i'
//! ```

use crate::error::{Result, SeriesError};

use super::dimension::DimensionSpec;
use super::SeriePattern;

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct PatternToken {
    kind: PatternTokenKind,
    position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternTokenKind {
    Integer(i64),
    Anchor,
    Plus,
    Minus,
    Colon,
    Comma,
}

/// A parsed slice bound: an integer offset, optionally relative to the anchor.
#[derive(Debug, Clone, Copy)]
struct Bound {
    anchored: bool,
    offset: i64,
    position: usize,
}

// ---------------------------------------------------------------------------
// Pattern parser
// ---------------------------------------------------------------------------

pub struct PatternParser<'a> {
    input: &'a str,
    tokens: Vec<PatternToken>,
    index: usize,
}

impl<'a> PatternParser<'a> {
    pub fn parse(input: &'a str) -> Result<SeriePattern> {
        let tokens = tokenize_pattern_input(input)?;
        if tokens.is_empty() {
            return Err(SeriesError::syntax(input, 0, "pattern is empty"));
        }

        let mut parser = Self {
            input,
            tokens,
            index: 0,
        };
        let mut dimensions = Vec::new();
        let mut anchor_dimension = None;

        loop {
            let start = parser.current_position();
            let spec = parser.parse_dimension()?;
            if spec.is_anchored() {
                if let Some(previous) = anchor_dimension {
                    return Err(SeriesError::syntax(
                        parser.fragment(start),
                        start,
                        format!(
                            "only one dimension may use the anchor `i`, dimension {previous} already does"
                        ),
                    ));
                }
                anchor_dimension = Some(dimensions.len());
            }
            dimensions.push(spec);

            if !parser.consume(PatternTokenKind::Comma) {
                break;
            }
        }

        if let Some(token) = parser.peek() {
            return Err(SeriesError::syntax(
                parser.fragment(token.position),
                token.position,
                "unexpected token",
            ));
        }

        Ok(SeriePattern::from_parts(
            input.trim().to_string(),
            dimensions,
            anchor_dimension,
        ))
    }

    fn parse_dimension(&mut self) -> Result<DimensionSpec> {
        let start = self.current_position();
        let mut parts = vec![self.parse_optional_bound()?];
        while self.consume(PatternTokenKind::Colon) {
            parts.push(self.parse_optional_bound()?);
        }

        let fragment = self.fragment(start);
        match parts.as_slice() {
            [None] => Err(SeriesError::syntax(
                fragment,
                start,
                "expected an index, a slice or `i`",
            )),
            [Some(bound)] if bound.anchored => {
                let offset_stop = bound.offset.checked_add(1).ok_or_else(|| {
                    SeriesError::syntax(fragment, bound.position, "integer overflow")
                })?;
                Ok(DimensionSpec::AnchorSlice {
                    offset_start: bound.offset,
                    offset_stop,
                    step: 1,
                })
            }
            [Some(bound)] => u64::try_from(bound.offset)
                .map(DimensionSpec::Fixed)
                .map_err(|_| {
                    SeriesError::syntax(fragment, bound.position, "file index must not be negative")
                }),
            [start_bound, stop_bound] => {
                build_slice(fragment, start, *start_bound, *stop_bound, None)
            }
            [start_bound, stop_bound, step_bound] => {
                build_slice(fragment, start, *start_bound, *stop_bound, *step_bound)
            }
            _ => Err(SeriesError::syntax(
                fragment,
                start,
                "a slice takes at most start:stop:step",
            )),
        }
    }

    fn parse_optional_bound(&mut self) -> Result<Option<Bound>> {
        match self.peek().map(|token| token.kind) {
            None | Some(PatternTokenKind::Colon | PatternTokenKind::Comma) => Ok(None),
            Some(_) => self.parse_bound().map(Some),
        }
    }

    fn parse_bound(&mut self) -> Result<Bound> {
        let position = self.current_position();
        let mut bound = Bound {
            anchored: false,
            offset: 0,
            position,
        };

        let mut negative = self.consume_sign();
        loop {
            let token = self.next().ok_or_else(|| {
                SeriesError::syntax(
                    self.fragment(position),
                    self.input.len(),
                    "expected an integer or `i` but reached end of pattern",
                )
            })?;
            match token.kind {
                PatternTokenKind::Integer(value) => {
                    let term = if negative { -value } else { value };
                    bound.offset = bound.offset.checked_add(term).ok_or_else(|| {
                        SeriesError::syntax(
                            self.fragment(position),
                            token.position,
                            "integer overflow",
                        )
                    })?;
                }
                PatternTokenKind::Anchor => {
                    if negative {
                        return Err(SeriesError::syntax(
                            self.fragment(position),
                            token.position,
                            "the anchor `i` cannot be subtracted",
                        ));
                    }
                    if bound.anchored {
                        return Err(SeriesError::syntax(
                            self.fragment(position),
                            token.position,
                            "the anchor `i` appears twice in one bound",
                        ));
                    }
                    bound.anchored = true;
                }
                _ => {
                    return Err(SeriesError::syntax(
                        self.fragment(position),
                        token.position,
                        "expected an integer or `i`",
                    ));
                }
            }

            match self.peek().map(|token| token.kind) {
                Some(PatternTokenKind::Plus | PatternTokenKind::Minus) => {
                    negative = self.consume_sign();
                }
                _ => return Ok(bound),
            }
        }
    }

    /// Consumes a leading `+` or `-`; returns whether it was a minus.
    fn consume_sign(&mut self) -> bool {
        if self.consume(PatternTokenKind::Minus) {
            return true;
        }
        self.consume(PatternTokenKind::Plus);
        false
    }

    fn consume(&mut self, kind: PatternTokenKind) -> bool {
        matches!(self.peek(), Some(token) if token.kind == kind) && {
            self.index += 1;
            true
        }
    }

    fn peek(&self) -> Option<&PatternToken> {
        self.tokens.get(self.index)
    }

    fn next(&mut self) -> Option<PatternToken> {
        let token = self.tokens.get(self.index).copied()?;
        self.index += 1;
        Some(token)
    }

    fn current_position(&self) -> usize {
        self.peek()
            .map(|token| token.position)
            .unwrap_or(self.input.len())
    }

    /// Source text of the dimension item containing `start`.
    fn fragment(&self, start: usize) -> &'a str {
        let start = start.min(self.input.len());
        let begin = self.input[..start].rfind(',').map(|comma| comma + 1).unwrap_or(0);
        let end = self.input[start..]
            .find(',')
            .map(|comma| start + comma)
            .unwrap_or(self.input.len());
        self.input[begin..end].trim()
    }
}

fn build_slice(
    fragment: &str,
    position: usize,
    start: Option<Bound>,
    stop: Option<Bound>,
    step: Option<Bound>,
) -> Result<DimensionSpec> {
    let step = match step {
        None => 1,
        Some(bound) if bound.anchored => {
            return Err(SeriesError::syntax(
                fragment,
                bound.position,
                "slice step cannot depend on the anchor",
            ));
        }
        Some(bound) => match usize::try_from(bound.offset) {
            Ok(step) if step > 0 => step,
            _ => {
                return Err(SeriesError::syntax(
                    fragment,
                    bound.position,
                    "slice step must be a positive integer",
                ));
            }
        },
    };

    let anchored = [start, stop]
        .iter()
        .any(|bound| bound.is_some_and(|bound| bound.anchored));
    if !anchored {
        return Ok(DimensionSpec::Slice {
            start: start.map(|bound| bound.offset).unwrap_or(0),
            stop: stop.map(|bound| bound.offset),
            step,
        });
    }

    match (start, stop) {
        (Some(start), Some(stop)) if start.anchored && stop.anchored => {
            Ok(DimensionSpec::AnchorSlice {
                offset_start: start.offset,
                offset_stop: stop.offset,
                step,
            })
        }
        _ => Err(SeriesError::syntax(
            fragment,
            position,
            "an anchored slice needs `i` in both its start and stop",
        )),
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

fn tokenize_pattern_input(input: &str) -> Result<Vec<PatternToken>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((position, ch)) = chars.next() {
        if ch.is_whitespace() {
            continue;
        }

        let kind = match ch {
            '+' => PatternTokenKind::Plus,
            '-' => PatternTokenKind::Minus,
            ':' => PatternTokenKind::Colon,
            ',' => PatternTokenKind::Comma,
            _ if ch.is_ascii_digit() => {
                let mut end = position + 1;
                while let Some(&(next_position, next)) = chars.peek() {
                    if !next.is_ascii_digit() {
                        break;
                    }
                    end = next_position + 1;
                    chars.next();
                }
                let raw = &input[position..end];
                let value = raw.parse::<i64>().map_err(|_| {
                    SeriesError::syntax(raw, position, "integer does not fit in 64 bits")
                })?;
                PatternTokenKind::Integer(value)
            }
            _ if ch.is_alphanumeric() || ch == '_' || ch == '.' => {
                let mut end = position + ch.len_utf8();
                while let Some(&(next_position, next)) = chars.peek() {
                    if !(next.is_alphanumeric() || next == '_' || next == '.') {
                        break;
                    }
                    end = next_position + next.len_utf8();
                    chars.next();
                }
                let word = &input[position..end];
                if word != "i" {
                    return Err(SeriesError::syntax(
                        word,
                        position,
                        format!("unknown token `{word}`"),
                    ));
                }
                PatternTokenKind::Anchor
            }
            _ => {
                let raw = &input[position..position + ch.len_utf8()];
                return Err(SeriesError::syntax(
                    raw,
                    position,
                    format!("unknown token `{raw}`"),
                ));
            }
        };
        tokens.push(PatternToken { kind, position });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(raw: &str) -> Vec<DimensionSpec> {
        PatternParser::parse(raw).unwrap().dimensions().to_vec()
    }

    fn syntax_error(raw: &str) -> (String, usize, String) {
        match PatternParser::parse(raw) {
            Err(SeriesError::PatternSyntax {
                fragment,
                position,
                message,
            }) => (fragment, position, message),
            other => panic!("expected a syntax error for {raw:?}, got {other:?}"),
        }
    }

    #[test]
    fn parse_fixed_and_slices() {
        assert_eq!(
            dims("1:1+3, :"),
            vec![
                DimensionSpec::Slice {
                    start: 1,
                    stop: Some(4),
                    step: 1
                },
                DimensionSpec::Slice {
                    start: 0,
                    stop: None,
                    step: 1
                },
            ]
        );
        assert_eq!(
            dims("1:1+3:2, 1"),
            vec![
                DimensionSpec::Slice {
                    start: 1,
                    stop: Some(4),
                    step: 2
                },
                DimensionSpec::Fixed(1),
            ]
        );
    }

    #[test]
    fn parse_open_bounds() {
        assert_eq!(
            dims("2:, :5, ::3"),
            vec![
                DimensionSpec::Slice {
                    start: 2,
                    stop: None,
                    step: 1
                },
                DimensionSpec::Slice {
                    start: 0,
                    stop: Some(5),
                    step: 1
                },
                DimensionSpec::Slice {
                    start: 0,
                    stop: None,
                    step: 3
                },
            ]
        );
    }

    #[test]
    fn parse_anchor_forms() {
        let pattern = PatternParser::parse(" 0 , i-1 : i+2 : 3 ").unwrap();
        assert_eq!(pattern.anchor_dimension(), Some(1));
        assert_eq!(
            pattern.dimensions()[1],
            DimensionSpec::AnchorSlice {
                offset_start: -1,
                offset_stop: 2,
                step: 3
            }
        );

        assert_eq!(
            dims("i+2"),
            vec![DimensionSpec::AnchorSlice {
                offset_start: 2,
                offset_stop: 3,
                step: 1
            }]
        );
        assert_eq!(
            dims("1+i:i+3"),
            vec![DimensionSpec::AnchorSlice {
                offset_start: 1,
                offset_stop: 3,
                step: 1
            }]
        );
    }

    #[test]
    fn anchor_free_pattern_has_no_anchor_dimension() {
        let pattern = PatternParser::parse("3, 0:2").unwrap();
        assert_eq!(pattern.anchor_dimension(), None);
        assert_eq!(pattern.arity(), 2);
    }

    #[test]
    fn unknown_token_reports_position() {
        let (fragment, position, message) = syntax_error("1, j:3");
        assert_eq!(fragment, "j");
        assert_eq!(position, 3);
        assert!(message.contains("unknown token"));

        let (fragment, position, _) = syntax_error("0:2 * 3");
        assert_eq!(fragment, "*");
        assert_eq!(position, 4);
    }

    #[test]
    fn second_anchor_dimension_is_rejected() {
        let (fragment, position, message) = syntax_error("i:i+2, i");
        assert_eq!(fragment, "i");
        assert_eq!(position, 7);
        assert!(message.contains("only one dimension"));
    }

    #[test]
    fn malformed_dimensions_are_rejected() {
        for raw in [
            "",
            "1,",
            ",1",
            "1:2:3:4",
            "i:5",
            "0:i",
            "-1",
            "0:4:0",
            "0:4:-1",
            "i:i+2:i",
            "i-i:3",
            "1 2",
            "1.5",
        ] {
            assert!(
                matches!(
                    PatternParser::parse(raw),
                    Err(SeriesError::PatternSyntax { .. })
                ),
                "{raw:?} should not parse"
            );
        }
    }

    #[test]
    fn error_fragment_is_the_offending_dimension() {
        let (fragment, position, _) = syntax_error("0, 2:4:0, 1");
        assert_eq!(fragment, "2:4:0");
        assert_eq!(position, 7);
    }

    #[test]
    fn anchor_offset_overflow_is_a_syntax_error() {
        let (fragment, position, message) = syntax_error("i+9223372036854775807");
        assert_eq!(fragment, "i+9223372036854775807");
        assert_eq!(position, 0);
        assert_eq!(message, "integer overflow");

        let (_, _, message) = syntax_error("i+9223372036854775807+1:i");
        assert_eq!(message, "integer overflow");
        assert!(PatternParser::parse("i+9223372036854775806").is_ok());
    }
}
