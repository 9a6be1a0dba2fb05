//! Bernese fix (`.FIX`) files: a list of station names.
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bernese_errors::BerneseError;
use crate::constants::{station_code, FIX_HEADER_LINES, FIX_RECORD_FORMAT};
use crate::fortran::{FortranFormat, ReadOptions};

/// A station identity: 4-character code and full name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Station {
    pub code: String,
    pub name: String,
}

/// Read the stations of a fix file, in file order.
///
/// The five header lines are skipped, as are blank lines.
pub fn read_fix_file(path: &Utf8Path) -> Result<Vec<Station>, BerneseError> {
    let format = FortranFormat::compile(FIX_RECORD_FORMAT, Some("name"), true)?;
    let options = ReadOptions::new()
        .with_skip_lines(FIX_HEADER_LINES)
        .with_skip_blanks(true);

    let stations = format
        .read_file(path, &options)?
        .map(|record| {
            let record = record?;
            let name = record.str("name")?;
            Ok(Station {
                code: station_code(name),
                name: name.to_string(),
            })
        })
        .collect::<Result<Vec<_>, BerneseError>>()?;

    info!(path = %path, stations = stations.len(), "Read fix file");
    Ok(stations)
}
