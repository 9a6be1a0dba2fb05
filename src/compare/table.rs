//! # Comparison result table
//!
//! [`ComparisonTable`] holds one [`ComparisonRow`] per compared station, in ascending
//! join key order, together with the ordered column names.
//!
//! ## Columns
//! -----------------
//! ```text
//! code lon lat hgt  <src>_flg...  <src>_X <src>_Y <src>_Z [<src>_VX <src>_VY <src>_VZ]...
//!                   diff_X diff_Y diff_Z diff_E diff_N diff_U offset
//!                   [diff_VX diff_VY diff_VZ diff_VE diff_VN diff_VU offsetV]
//! ```
//!
//! The `diff_*` columns only exist when exactly two sources are compared. `code` and the
//! flag columns are text, every other column is numeric and may hold `NaN` for a missing
//! velocity.
//!
//! ## CSV export
//! -----------------
//! [`ComparisonTable::write_csv`] writes a header row and one row per station with floats
//! rendered to six decimals and `NaN` as an empty cell.
use std::fs::File;
use std::io::Write;

use camino::Utf8Path;

use crate::bernese_errors::BerneseError;
use crate::constants::{Degree, Meter};

/// Number of leading columns before the flag columns (`code lon lat hgt`).
const LEADING_COLUMNS: usize = 4;

/// One station of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    /// Join key, written to the `code` column.
    pub key: String,
    /// Longitude of the first source position, in `[0, 360)`.
    pub lon: Degree,
    pub lat: Degree,
    pub hgt: Meter,
    /// One flag per source, in source order.
    pub flags: Vec<String>,
    /// Numeric columns following the flag columns.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    columns: Vec<String>,
    sources: Vec<String>,
    rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    pub(crate) fn new(
        columns: Vec<String>,
        sources: Vec<String>,
        rows: Vec<ComparisonRow>,
    ) -> Self {
        ComparisonTable {
            columns,
            sources,
            rows,
        }
    }

    /// Column names, in output order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Source names, in column order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn rows(&self) -> &[ComparisonRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Join keys, in row order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.key.as_str())
    }

    /// Row of a join key.
    pub fn row(&self, key: &str) -> Option<&ComparisonRow> {
        self.rows
            .binary_search_by(|row| row.key.as_str().cmp(key))
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Whether the table carries the two-source difference columns.
    pub fn has_differences(&self) -> bool {
        self.columns.iter().any(|c| c == "diff_X")
    }

    /// Values of a numeric column, in row order.
    ///
    /// Returns `None` for an unknown column and for the text columns (`code` and flags).
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.columns.iter().position(|c| c == name)?;
        let values_start = LEADING_COLUMNS + self.sources.len();
        let value = |row: &ComparisonRow| match index {
            1 => row.lon,
            2 => row.lat,
            3 => row.hgt,
            i => row.values[i - values_start],
        };
        match index {
            0 => None,
            i if (LEADING_COLUMNS..values_start).contains(&i) => None,
            _ => Some(self.rows.iter().map(value).collect()),
        }
    }

    /// Write the table as CSV.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), BerneseError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            let mut record = Vec::with_capacity(self.columns.len());
            record.push(row.key.clone());
            record.extend([row.lon, row.lat, row.hgt].into_iter().map(format_float));
            record.extend(row.flags.iter().cloned());
            record.extend(row.values.iter().copied().map(format_float));
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush().map_err(BerneseError::IoWrite)?;
        Ok(())
    }

    /// Write the table as CSV to `path`, replacing any existing file.
    pub fn write_csv_file(&self, path: &Utf8Path) -> Result<(), BerneseError> {
        let file = File::create(path).map_err(|e| BerneseError::io(path, e))?;
        self.write_csv(file)?;
        tracing::debug!(path = %path, rows = self.rows.len(), "Wrote comparison CSV");
        Ok(())
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        format!("{value:.6}")
    }
}
