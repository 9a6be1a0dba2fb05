//! Compilation of Fortran format specifications and single-line decoding.
use std::str::Chars;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use tracing::debug;

use crate::bernese_errors::BerneseError;
use crate::constants::{MAX_RECORD_FIELDS, MAX_RECORD_LENGTH};

use super::record::{FieldValue, Record};
use super::FieldParseError;

static REPEAT_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\(([^()]+)\)").expect("valid repeat group regex"));

static ENCLOSING_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((.*)\)$").expect("valid enclosing parens regex"));

/// Upper bound on the text of a specification once its groups are expanded.
const MAX_EXPANDED_LENGTH: usize = 8 * MAX_RECORD_LENGTH;

static FIELD_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d*)(?:(X)|F(\d+)\.(\d+)|([IAH])(\d+))$").expect("valid field token regex")
});

/// Decoder applied to the characters of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Characters are consumed and no value is produced (`X`).
    Skip,
    /// Fixed point number (`Fw.d`). Only the width matters for decoding.
    Float { decimals: usize },
    /// Base-10 integer (`Iw`).
    Integer,
    /// Character data (`Aw` or `Hw`), trimmed if the format was compiled with `trim`.
    Text,
}

/// One compiled descriptor: `repeat` consecutive fields of `width` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub repeat: usize,
    pub width: usize,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// Total number of characters covered by this descriptor, `None` on overflow.
    pub fn span(&self) -> Option<usize> {
        self.repeat.checked_mul(self.width)
    }

    /// Number of values produced by this descriptor.
    pub fn value_count(&self) -> usize {
        match self.kind {
            FieldKind::Skip => 0,
            _ => self.repeat,
        }
    }
}

/// A compiled Fortran format specification.
///
/// Created once with [`FortranFormat::compile`] and never mutated afterwards; decoding
/// is a pure function of the format and the input line.
#[derive(Debug, Clone)]
pub struct FortranFormat {
    specification: String,
    fields: Vec<FieldDescriptor>,
    length: usize,
    field_count: usize,
    names: Option<Arc<[String]>>,
    trim: bool,
}

impl FortranFormat {
    /// Compile a format specification producing unnamed, untrimmed records.
    pub fn new(specification: &str) -> Result<Self, BerneseError> {
        Self::compile(specification, None, false)
    }

    /// Compile a format specification.
    ///
    /// Arguments
    /// -----------------
    /// * `specification` – Fortran format, e.g. `"I3,2X,A16,3F15.4,4X,A1"` or `"(2(I2,X),A4)"`.
    /// * `names` – Optional whitespace separated field names, one per non-skip field.
    ///   An empty string is treated as no names.
    /// * `trim` – If true, character fields are stripped of surrounding whitespace.
    ///
    /// Return
    /// ----------
    /// * The compiled format, or
    ///   - [`BerneseError::FormatSpec`] if the expanded specification is not a valid sequence
    ///     of `X`, `F`, `I`, `A` and `H` descriptors, or describes records longer than
    ///     [`MAX_RECORD_LENGTH`] characters or with more than [`MAX_RECORD_FIELDS`] fields,
    ///   - [`BerneseError::FormatFieldCount`] if the number of names differs from the number
    ///     of non-skip fields.
    pub fn compile(
        specification: &str,
        names: Option<&str>,
        trim: bool,
    ) -> Result<Self, BerneseError> {
        let invalid = || BerneseError::FormatSpec(specification.to_string());
        let expanded = expand_groups(&specification.to_uppercase()).ok_or_else(invalid)?;
        let stripped = ENCLOSING_PARENS.replace(expanded.trim(), "$1");

        let fields = stripped
            .split(',')
            .map(|token| parse_token(token.trim()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid)?;

        let (length, field_count) = fields
            .iter()
            .try_fold((0usize, 0usize), |(length, count), field| {
                Some((
                    length.checked_add(field.span()?)?,
                    count.checked_add(field.value_count())?,
                ))
            })
            .filter(|&(length, count)| length <= MAX_RECORD_LENGTH && count <= MAX_RECORD_FIELDS)
            .ok_or_else(invalid)?;

        let names = match names {
            Some(names) if !names.trim().is_empty() => {
                let field_names: Vec<String> =
                    names.split_whitespace().map(str::to_string).collect();
                if field_names.len() != field_count {
                    return Err(BerneseError::FormatFieldCount {
                        names: names.to_string(),
                        format: specification.to_string(),
                        expected: field_count,
                        found: field_names.len(),
                    });
                }
                Some(Arc::from(field_names))
            }
            _ => None,
        };

        debug!(
            specification,
            length, field_count, "Compiled Fortran record format"
        );

        Ok(FortranFormat {
            specification: specification.to_string(),
            fields,
            length,
            field_count,
            names,
            trim,
        })
    }

    /// The specification as supplied at compile time.
    pub fn specification(&self) -> &str {
        &self.specification
    }

    /// Compiled descriptors in column order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Total record length in characters.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of values produced per record (skip fields excluded).
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    /// Field names, if the format was compiled with names.
    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    /// Decode a line into its ordered values.
    ///
    /// Lines shorter than [`FortranFormat::length`] are right-padded with spaces, characters
    /// beyond the record length are ignored. Columns are counted in characters.
    ///
    /// Return
    /// ----------
    /// * The values in descriptor order, skip fields omitted, or the [`FieldParseError`]
    ///   of the first numeric field that fails to parse.
    pub fn decode(&self, line: &str) -> Result<Vec<FieldValue>, FieldParseError> {
        let mut values = Vec::with_capacity(self.field_count);
        let mut chars = line.chars();
        let mut buffer = String::new();
        let mut column = 0;

        for descriptor in &self.fields {
            for _ in 0..descriptor.repeat {
                let start = column + 1;
                column += descriptor.width;
                if descriptor.kind == FieldKind::Skip {
                    chars.by_ref().take(descriptor.width).for_each(drop);
                    continue;
                }

                take_column(&mut chars, descriptor.width, &mut buffer);
                let field = values.len();
                let value = match descriptor.kind {
                    FieldKind::Integer => {
                        let text = buffer.trim();
                        text.parse::<i64>().map(FieldValue::Int).map_err(|source| {
                            FieldParseError::InvalidInteger {
                                field,
                                start,
                                end: column,
                                text: text.to_string(),
                                source,
                            }
                        })?
                    }
                    FieldKind::Float { .. } => {
                        let text = buffer.trim().replace(['D', 'd'], "E");
                        text.parse::<f64>().map(FieldValue::Float).map_err(|source| {
                            FieldParseError::InvalidFloat {
                                field,
                                start,
                                end: column,
                                text: buffer.trim().to_string(),
                                source,
                            }
                        })?
                    }
                    FieldKind::Text if self.trim => FieldValue::Text(buffer.trim().to_string()),
                    FieldKind::Text => FieldValue::Text(buffer.clone()),
                    FieldKind::Skip => unreachable!("skip fields produce no value"),
                };
                values.push(value);
            }
        }
        Ok(values)
    }

    /// Decode a line into a [`Record`], attaching field names if the format has them.
    pub fn read(&self, line: &str) -> Result<Record, BerneseError> {
        let values = self.decode(line)?;
        Ok(Record::new(values, self.names.clone()))
    }
}

/// Copy the next `width` characters into `buffer`, padding with spaces at end of line.
fn take_column(chars: &mut Chars<'_>, width: usize, buffer: &mut String) {
    buffer.clear();
    let mut taken = 0;
    for c in chars.by_ref().take(width) {
        buffer.push(c);
        taken += 1;
    }
    buffer.extend(std::iter::repeat(' ').take(width - taken));
}

/// Expand `n(...)` repeat groups, innermost first, into `n` comma separated copies.
///
/// Returns `None` if a repeat count is unreadable or the expansion would grow beyond
/// [`MAX_EXPANDED_LENGTH`] bytes.
fn expand_groups(specification: &str) -> Option<String> {
    let mut expanded = specification.to_string();
    while REPEAT_GROUP.is_match(&expanded) {
        let mut grown = expanded.len();
        for caps in REPEAT_GROUP.captures_iter(&expanded) {
            let count: usize = caps[1].parse().ok()?;
            grown = count
                .checked_mul(caps[2].len() + 1)
                .and_then(|copies| grown.checked_add(copies))?;
        }
        if grown > MAX_EXPANDED_LENGTH {
            return None;
        }
        expanded = REPEAT_GROUP
            .replace_all(&expanded, |caps: &Captures| {
                let count: usize = caps[1].parse().unwrap_or(0);
                vec![&caps[2]; count].join(",")
            })
            .into_owned();
    }
    Some(expanded)
}

fn parse_token(token: &str) -> Option<FieldDescriptor> {
    let caps = FIELD_TOKEN.captures(token)?;
    let repeat = match caps.get(1).map(|m| m.as_str()) {
        Some("") | None => 1,
        Some(count) => count.parse().ok()?,
    };

    if caps.get(2).is_some() {
        return Some(FieldDescriptor {
            repeat,
            width: 1,
            kind: FieldKind::Skip,
        });
    }
    if let (Some(width), Some(decimals)) = (caps.get(3), caps.get(4)) {
        return Some(FieldDescriptor {
            repeat,
            width: width.as_str().parse().ok()?,
            kind: FieldKind::Float {
                decimals: decimals.as_str().parse().ok()?,
            },
        });
    }
    let kind = match caps.get(5)?.as_str() {
        "I" => FieldKind::Integer,
        _ => FieldKind::Text,
    };
    Some(FieldDescriptor {
        repeat,
        width: caps.get(6)?.as_str().parse().ok()?,
        kind,
    })
}
