//! # Fortran fixed-width record decoding
//!
//! Bernese GNSS files are written by Fortran programs with fixed column layouts.
//! This module decodes such lines with a compact **Fortran format specification**
//! (for instance `I3,2X,A16,3F15.4,4X,A1`).
//!
//! ## Overview
//! -----------------
//! - [`FortranFormat`] compiles a specification once into an ordered list of
//!   [`FieldDescriptor`]s and decodes lines into [`Record`]s.
//! - [`Record`] is an ordered list of [`FieldValue`]s, optionally carrying field
//!   names so values can be fetched by name.
//! - [`RecordIter`] lazily decodes a stream of lines, optionally skipping header lines,
//!   blank lines and malformed records according to [`ReadOptions`].
//!
//! ## Supported descriptors
//! -----------------
//! | Descriptor | Meaning                                       | Value            |
//! |------------|-----------------------------------------------|------------------|
//! | `nX`       | skip `n` characters                           | none             |
//! | `Fw.d`     | fixed point, `w` characters, `D` exponents ok | [`FieldValue::Float`] |
//! | `Iw`       | base-10 integer, `w` characters               | [`FieldValue::Int`]   |
//! | `Aw`, `Hw` | character data, `w` characters                | [`FieldValue::Text`]  |
//!
//! Every descriptor except `X` may be prefixed by a repeat count (`3F15.4`), and
//! comma separated descriptors may be grouped with a repeat count (`3(X,I2)`).
//! Groups may be nested. The whole specification may be enclosed in one pair
//! of parentheses, and is case-insensitive.
//!
//! ## Example
//! -----------------
//! ```rust
//! use bernese::fortran::{FieldValue, FortranFormat};
//!
//! let format = FortranFormat::compile("I3,2X,A4", Some("id code"), true)?;
//! let record = format.read("  7  ABCD")?;
//! assert_eq!(record.int("id")?, 7);
//! assert_eq!(record.str("code")?, "ABCD");
//! assert_eq!(record[0], FieldValue::Int(7));
//! # Ok::<(), bernese::bernese_errors::BerneseError>(())
//! ```
pub mod format;
pub mod reader;
pub mod record;

use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

pub use format::{FieldDescriptor, FieldKind, FortranFormat};
pub(crate) use reader::line_text;
pub use reader::{open_text_file, FileLines, FileRecordIter, RawLines, ReadOptions, RecordIter};
pub use record::{FieldValue, Record};

/// Field-level decoding errors.
///
/// Variants
/// -----------------
/// * `InvalidInteger` – An `I` field could not be parsed as a base-10 integer.
/// * `InvalidFloat` – An `F` field could not be parsed as a number, after exponent normalization.
///
/// Both variants carry the ordinal of the value in the record (skip fields excluded),
/// the 1-based column range and the offending text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldParseError {
    #[error("invalid integer {text:?} in field {field} (columns {start}-{end})")]
    InvalidInteger {
        field: usize,
        start: usize,
        end: usize,
        text: String,
        #[source]
        source: ParseIntError,
    },
    #[error("invalid number {text:?} in field {field} (columns {start}-{end})")]
    InvalidFloat {
        field: usize,
        start: usize,
        end: usize,
        text: String,
        #[source]
        source: ParseFloatError,
    },
}
