//! Descriptive statistics of comparison columns.
use std::io::Write;

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Row, Table};
use itertools::Itertools;

use super::table::ComparisonTable;
use crate::bernese_errors::BerneseError;

/// Columns summarized by default: the position and local frame differences.
pub const DIFFERENCE_COLUMNS: [&str; 6] =
    ["diff_X", "diff_Y", "diff_Z", "diff_E", "diff_N", "diff_U"];

/// Statistics of one numeric column. `NaN` values are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub column: String,
    /// Number of non-`NaN` values.
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (`n - 1` denominator), `NaN` below two values.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnSummary {
    /// Summarize `values` under the name `column`.
    ///
    /// Quantiles interpolate linearly between the closest ranks. All statistics but the
    /// count are `NaN` when no value is defined.
    pub fn from_values(column: &str, values: &[f64]) -> Self {
        let sorted: Vec<f64> = values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .sorted_by(f64::total_cmp)
            .collect();
        let count = sorted.len();
        let n = count as f64;
        let mean = if count == 0 {
            f64::NAN
        } else {
            sorted.iter().sum::<f64>() / n
        };
        let std = if count < 2 {
            f64::NAN
        } else {
            (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        };

        ColumnSummary {
            column: column.to_string(),
            count,
            mean,
            std,
            min: quantile(&sorted, 0.0),
            q25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: quantile(&sorted, 1.0),
        }
    }

    fn statistics(&self) -> [f64; 8] {
        [
            self.count as f64,
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.median,
            self.q75,
            self.max,
        ]
    }
}

/// Linear interpolation quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return f64::NAN;
    };
    let position = q * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

/// Summarize the numeric `columns` of a comparison table.
///
/// Return
/// ----------
/// * One summary per requested column, in request order, or
///   [`BerneseError::UnknownColumn`] for a column that is absent or not numeric.
///
/// See also
/// ------------
/// * [`DIFFERENCE_COLUMNS`] – the columns reported for a two-source comparison.
pub fn summarize(
    table: &ComparisonTable,
    columns: &[&str],
) -> Result<Vec<ColumnSummary>, BerneseError> {
    columns
        .iter()
        .map(|&name| {
            let values = table
                .column(name)
                .ok_or_else(|| BerneseError::UnknownColumn(name.to_string()))?;
            Ok(ColumnSummary::from_values(name, &values))
        })
        .collect()
}

/// Render summaries as a text table: one column per summary, one row per statistic.
pub fn render_summary(summaries: &[ColumnSummary]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("")];
    header.extend(summaries.iter().map(|s| Cell::new(&s.column)));
    table.set_header(header);

    let labels = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
    let statistics: Vec<[f64; 8]> = summaries.iter().map(ColumnSummary::statistics).collect();
    for (i, label) in labels.iter().enumerate() {
        let mut row = vec![Cell::new(label)];
        row.extend(statistics.iter().map(|stats| {
            let text = if i == 0 {
                format!("{}", stats[0])
            } else {
                format!("{:.6}", stats[i])
            };
            Cell::new(text).set_alignment(CellAlignment::Right)
        }));
        table.add_row(Row::from(row));
    }
    table.to_string()
}

/// Write the summary of the difference columns of `table` to `writer`.
pub fn write_summary<W: Write>(
    table: &ComparisonTable,
    mut writer: W,
) -> Result<(), BerneseError> {
    let summaries = summarize(table, &DIFFERENCE_COLUMNS)?;
    writeln!(writer, "{}", render_summary(&summaries)).map_err(BerneseError::IoWrite)?;
    Ok(())
}

#[cfg(test)]
mod summary_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_column_summary() {
        let summary = ColumnSummary::from_values("diff_X", &[4.0, 1.0, f64::NAN, 3.0, 2.0]);
        assert_eq!(summary.count, 4);
        assert_relative_eq!(summary.mean, 2.5);
        assert_relative_eq!(summary.std, (5.0f64 / 3.0).sqrt());
        assert_relative_eq!(summary.min, 1.0);
        assert_relative_eq!(summary.q25, 1.75);
        assert_relative_eq!(summary.median, 2.5);
        assert_relative_eq!(summary.q75, 3.25);
        assert_relative_eq!(summary.max, 4.0);
    }

    #[test]
    fn test_degenerate_summaries() {
        let single = ColumnSummary::from_values("x", &[7.0]);
        assert_eq!(single.count, 1);
        assert_relative_eq!(single.median, 7.0);
        assert!(single.std.is_nan());

        let empty = ColumnSummary::from_values("x", &[f64::NAN]);
        assert_eq!(empty.count, 0);
        assert!(empty.mean.is_nan());
        assert!(empty.max.is_nan());
    }

    #[test]
    fn test_render_summary() {
        let text = render_summary(&[ColumnSummary::from_values("diff_E", &[1.0, 3.0])]);
        assert!(text.contains("diff_E"));
        assert!(text.contains("count"));
        assert!(text.contains("2.000000"));
        assert!(text.contains("1.414214"));
    }

    #[test]
    fn test_write_summary_to_closed_stream() {
        use crate::compare::table::ComparisonRow;
        use std::io::ErrorKind;

        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(ErrorKind::BrokenPipe.into())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut columns: Vec<String> =
            ["code", "lon", "lat", "hgt", "a_flg", "b_flg"].map(String::from).to_vec();
        columns.extend(DIFFERENCE_COLUMNS.map(String::from));
        columns.push("offset".into());
        let row = ComparisonRow {
            key: "ABCD".into(),
            lon: 10.0,
            lat: 20.0,
            hgt: 30.0,
            flags: vec![String::new(), String::new()],
            values: vec![0.001, 0.002, 0.003, 0.0, 0.0, 0.0, 0.0],
        };
        let table = ComparisonTable::new(columns, vec!["a".into(), "b".into()], vec![row]);

        let mut buffer = Vec::new();
        write_summary(&table, &mut buffer).unwrap();
        assert!(String::from_utf8(buffer).unwrap().contains("diff_U"));

        let error = write_summary(&table, Closed).unwrap_err();
        assert!(matches!(error, BerneseError::IoWrite(e) if e.kind() == ErrorKind::BrokenPipe));
    }
}
