//! # Bernese residual files
//!
//! Reads the text dump of a Bernese residual file: a `key: value` header, a table of
//! the stations or baselines involved, and one residual sample per line.
//!
//! ## File layout
//! -----------------
//! ```text
//! Type of residual file:      ...            header items (key: value)
//! Program created the file:   GPSEST
//! Num  Station 1 ...                         start of the station table, followed by one line
//!   1  ABMF 97103M001    ...                 (I3,2X,2A18,A10,3(X,I2),14X,4I2,I4,I5)
//!                                            blank line ends the table
//! ...
//! Num  Epoch ...                             start of the residual table, followed by one line
//!    1    12   1   5   1  -0.12340D-02       line, epoch, _, satellite, _, residual
//! ```
//!
//! Each station line carries the session start time and the sampling period in seconds;
//! sample epochs are given as a count of periods since the session start and are
//! returned in seconds: `(epoch + start / period) * period`.
use std::collections::BTreeSet;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use tracing::{debug, info};

use crate::bernese_errors::BerneseError;
use crate::constants::{RES_LINE_FIELDS, RES_LINE_FORMAT};
use crate::fortran::{line_text, open_text_file, FortranFormat, RawLines, Record};

static STATION_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Num\s+Station\s+1").expect("valid station table regex"));

static RESIDUAL_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Num\s+Epoch\s+").expect("valid residual table regex"));

static HEADER_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(.*):\s+(.*?)\s*$").expect("valid header item regex"));

/// One station or baseline of a residual file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualLine {
    pub num: usize,
    pub code1: String,
    pub code2: String,
    pub station1: String,
    pub station2: String,
    pub frequencies: i64,
    /// Session start, in sampling periods.
    pub offset: f64,
    /// Sampling period in seconds.
    pub period: i64,
}

impl ResidualLine {
    /// `code1:code2` for baselines, `code1` for single stations.
    pub fn code(&self) -> String {
        if self.code2.is_empty() {
            self.code1.clone()
        } else {
            format!("{}:{}", self.code1, self.code2)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualSample {
    /// Station/baseline number, see [`ResidualFile::line`].
    pub line: usize,
    /// Epoch in seconds.
    pub epoch: f64,
    pub satellite: i64,
    pub residual: f64,
}

/// A decoded residual file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualFile {
    pub path: Utf8PathBuf,
    pub file_type: Option<String>,
    pub file_format: Option<String>,
    pub src_program: String,
    pub differencing: String,
    pub obs_date: String,
    pub lines: Vec<ResidualLine>,
    pub samples: Vec<ResidualSample>,
}

impl ResidualFile {
    /// Read and decode a residual file.
    ///
    /// Return
    /// ----------
    /// * The decoded file, or
    ///   - [`BerneseError::Io`] if it cannot be read,
    ///   - [`BerneseError::InvalidResidualFile`] if a table is missing, numbered out of order
    ///     or has unreadable samples,
    ///   - [`BerneseError::RecordDecode`] if a station line cannot be decoded.
    pub fn read(path: &Utf8Path) -> Result<Self, BerneseError> {
        let invalid = |reason: String| BerneseError::InvalidResidualFile {
            path: path.to_path_buf(),
            reason,
        };
        let mut lines = RawLines::new(open_text_file(path)?);
        let mut next_line = || -> Result<Option<String>, BerneseError> {
            lines
                .next()
                .transpose()
                .map(|line| line.map(|bytes| line_text(&bytes).into_owned()))
                .map_err(|e| BerneseError::io(path, e))
        };

        let mut residuals = ResidualFile {
            path: path.to_path_buf(),
            file_type: None,
            file_format: None,
            src_program: "PROGRAM".to_string(),
            differencing: String::new(),
            obs_date: "unspecified date".to_string(),
            lines: Vec::new(),
            samples: Vec::new(),
        };

        loop {
            let line = next_line()?.ok_or_else(|| invalid("no station table".into()))?;
            if STATION_TABLE.is_match(&line) {
                break;
            }
            residuals.header_item(&line);
        }
        next_line()?;

        let format = FortranFormat::compile(RES_LINE_FORMAT, Some(RES_LINE_FIELDS), false)?;
        while let Some(line) = next_line()? {
            if line.trim().is_empty() {
                break;
            }
            let record = format.read(&line)?;
            let station_line = station_line(&record)?;
            if station_line.num != residuals.lines.len() + 1 {
                return Err(invalid(format!(
                    "station number {} out of sequence",
                    station_line.num
                )));
            }
            if station_line.period <= 0 {
                return Err(invalid(format!(
                    "invalid sampling period for station {}",
                    station_line.num
                )));
            }
            residuals.obs_date = record.str("obsdate")?.trim().to_string();
            residuals.lines.push(station_line);
        }
        debug!(path = %path, lines = residuals.lines.len(), "Read residual station table");

        loop {
            let line = next_line()?.ok_or_else(|| invalid("no residual table".into()))?;
            if RESIDUAL_TABLE.is_match(&line) {
                break;
            }
        }
        next_line()?;

        let mut line_number = 0;
        while let Some(line) = next_line()? {
            line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            let sample = residuals.sample(&line).ok_or_else(|| {
                invalid(format!("unreadable residual on data line {line_number}"))
            })?;
            residuals.samples.push(sample);
        }

        info!(
            path = %path,
            lines = residuals.lines.len(),
            samples = residuals.samples.len(),
            "Read residual file"
        );
        Ok(residuals)
    }

    /// Station or baseline by its 1-based number.
    pub fn line(&self, num: usize) -> Option<&ResidualLine> {
        num.checked_sub(1).and_then(|i| self.lines.get(i))
    }

    /// Distinct satellite numbers, ascending.
    pub fn satellites(&self) -> Vec<i64> {
        self.samples
            .iter()
            .map(|s| s.satellite)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn header_item(&mut self, line: &str) {
        let Some(caps) = HEADER_ITEM.captures(line) else {
            return;
        };
        let value = caps[2].to_string();
        match &caps[1] {
            "Type of residual file" => self.file_type = Some(value),
            "Format of residual records" => self.file_format = Some(value),
            "Program created the file" => self.src_program = value,
            "Difference level of observations" => self.differencing = value,
            _ => {}
        }
    }

    fn sample(&self, line: &str) -> Option<ResidualSample> {
        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() < 6 {
            return None;
        }
        let num: usize = columns[0].parse().ok()?;
        let station_line = self.line(num)?;
        let epoch: f64 = columns[1].parse().ok()?;
        Some(ResidualSample {
            line: num,
            epoch: (epoch + station_line.offset) * station_line.period as f64,
            satellite: columns[3].parse().ok()?,
            residual: columns[5].replace(['D', 'd'], "E").parse().ok()?,
        })
    }
}

fn station_line(record: &Record) -> Result<ResidualLine, BerneseError> {
    let split = |station: &str| -> (String, String) {
        match station.split_once(' ') {
            Some((code, name)) => (code.to_string(), name.trim().to_string()),
            None => (station.to_string(), String::new()),
        }
    };
    let (code1, station1) = split(record.str("st1")?);
    let (code2, station2) = split(record.str("st2")?);
    let period = record.int("period")?;
    let start = record.int("hour")? * 3600 + record.int("min")? * 60 + record.int("sec")?;

    Ok(ResidualLine {
        num: usize::try_from(record.int("num")?).unwrap_or(0),
        code1,
        code2,
        station1,
        station2,
        frequencies: record.int("nf")?,
        offset: start as f64 / period as f64,
        period,
    })
}
