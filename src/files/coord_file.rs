//! # Bernese coordinate (`.CRD`) and velocity (`.VEL`) files
//!
//! Reads a coordinate file into [`StationCoords`], optionally attaching the station
//! velocities of its companion velocity file.
//!
//! ## File layout
//! -----------------
//! ```text
//! line 1   title                                                   (ignored)
//! line 2   separator                                               (ignored)
//! line 3   LOCAL GEODETIC DATUM: <datum, A18>   EPOCH: YYYY-MM-DD HH:MM:SS
//! line 4-6 blank / column titles / blank                           (ignored)
//! body     I3,2X,A16,3F15.4,4X,A1   -> id, name, X, Y, Z, flag
//! ```
//!
//! Velocity files share the body layout (velocities in m/year in place of positions)
//! and are read after skipping the same six header lines.
//!
//! ## Join keys
//! -----------------
//! Records are keyed either on the full 16-character station name or on its first
//! four characters (the station code), see [`JoinKey`]. With [`JoinKey::Code`], stations
//! sharing a code overwrite each other in file order.
//!
//! ## Velocities
//! -----------------
//! Velocities are loaded when [`CoordReadOptions::velocities`] or
//! [`CoordReadOptions::try_velocities`] is set, or a velocity path is given. Unless a path is
//! given, the velocity file is located with [`velocity_path_for`]. A velocity file that cannot
//! be read is a [`BerneseError::VelocityLoad`] error, unless `try_velocities` is set, in which
//! case the coordinates are returned without velocities.
use std::collections::BTreeMap;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use hifitime::{Epoch, TimeScale, Unit};
use nalgebra::Vector3;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bernese_errors::BerneseError;
use crate::constants::{
    station_code, StationCoords, CRD_DATUM_FORMAT, CRD_HEADER_LINES, CRD_RECORD_FIELDS,
    CRD_RECORD_FORMAT, DAYS_PER_YEAR,
};
use crate::fortran::{line_text, open_text_file, FortranFormat, RawLines, ReadOptions, Record};

static DATUM_EPOCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d\d)-(\d\d)\s+(\d\d):(\d\d):(\d\d)").expect("valid datum epoch regex")
});

static CRD_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\.CRD((?:\.gz)?))?$").expect("valid CRD suffix regex"));

/// Identifier used to match stations across coordinate sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKey {
    /// The 4-character station code.
    Code,
    /// The full 16-character station name (trimmed).
    #[default]
    Name,
}

impl JoinKey {
    /// Key of a station, given its trimmed name.
    pub fn key_of(&self, name: &str) -> String {
        match self {
            JoinKey::Code => station_code(name),
            JoinKey::Name => name.to_string(),
        }
    }
}

/// One station of a coordinate file.
#[derive(Debug, Clone, PartialEq)]
pub struct StationCoord {
    pub id: i64,
    /// First four characters of the station name.
    pub code: String,
    pub name: String,
    /// Geodetic datum label from the file header.
    pub datum: Option<String>,
    /// Reference epoch of the coordinates.
    pub epoch: Option<Epoch>,
    /// ECEF position in meters.
    pub xyz: Vector3<f64>,
    /// ECEF velocity in meters per year, if a velocity file was loaded.
    pub vxyz: Option<Vector3<f64>>,
    pub flag: String,
}

impl StationCoord {
    /// Position of the station propagated to `date` with its velocity.
    ///
    /// The elapsed time is counted in whole days, converted to years of
    /// [`DAYS_PER_YEAR`] days. If the date, the coordinate epoch or the velocity is
    /// missing, the reference position is returned unchanged.
    pub fn epoch_xyz(&self, date: Option<Epoch>) -> Vector3<f64> {
        match (date, self.epoch, self.vxyz) {
            (Some(date), Some(epoch), Some(vxyz)) => {
                let days = (date - epoch).to_unit(Unit::Day).floor();
                self.xyz + vxyz * (days / DAYS_PER_YEAR)
            }
            _ => self.xyz,
        }
    }
}

/// Options for [`read_coord_file`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordReadOptions {
    /// Key used for the returned map and for matching velocities.
    pub join_key: JoinKey,
    /// Load the companion velocity file; failure to read it is an error.
    pub velocities: bool,
    /// Load the companion velocity file if it can be read.
    pub try_velocities: bool,
    /// Explicit velocity file, implies `velocities`.
    pub velocity_path: Option<Utf8PathBuf>,
    /// Skip body lines that cannot be decoded.
    pub skip_errors: bool,
}

impl Default for CoordReadOptions {
    fn default() -> Self {
        CoordReadOptions {
            join_key: JoinKey::Name,
            velocities: false,
            try_velocities: false,
            velocity_path: None,
            skip_errors: true,
        }
    }
}

impl CoordReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_join_key(mut self, join_key: JoinKey) -> Self {
        self.join_key = join_key;
        self
    }

    pub fn with_velocities(mut self, velocities: bool) -> Self {
        self.velocities = velocities;
        self
    }

    pub fn with_try_velocities(mut self, try_velocities: bool) -> Self {
        self.try_velocities = try_velocities;
        self
    }

    pub fn with_velocity_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.velocity_path = Some(path.into());
        self
    }

    pub fn with_skip_errors(mut self, skip_errors: bool) -> Self {
        self.skip_errors = skip_errors;
        self
    }

    fn loads_velocities(&self) -> bool {
        self.velocities || self.try_velocities || self.velocity_path.is_some()
    }
}

/// Velocity file matching a coordinate file.
///
/// A trailing `.CRD` (optionally followed by `.gz`) is replaced by `.VEL`, keeping the
/// `.gz` suffix; any other name gets `.VEL` appended. The match is case-sensitive.
pub fn velocity_path_for(path: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(CRD_SUFFIX.replace(path.as_str(), ".VEL${1}").into_owned())
}

/// Read a Bernese coordinate file.
///
/// Arguments
/// -----------------
/// * `path` – Coordinate file, optionally gzip compressed (`.gz`).
/// * `options` – Join key, velocity loading and error skipping, see [`CoordReadOptions`].
///
/// Return
/// ----------
/// * The stations keyed on [`CoordReadOptions::join_key`], or
///   - [`BerneseError::Io`] if the file cannot be read,
///   - [`BerneseError::InvalidDatumEpoch`] if line 3 carries no valid epoch,
///   - [`BerneseError::VelocityLoad`] if velocities were required and cannot be read,
///   - [`BerneseError::RecordDecode`] for a malformed body line when `skip_errors` is unset.
pub fn read_coord_file(
    path: &Utf8Path,
    options: &CoordReadOptions,
) -> Result<StationCoords, BerneseError> {
    let crd_format = FortranFormat::compile(CRD_RECORD_FORMAT, Some(CRD_RECORD_FIELDS), true)?;
    let datum_format = FortranFormat::compile(CRD_DATUM_FORMAT, Some("datum epoch"), true)?;

    let velocities = if options.loads_velocities() {
        let velocity_path = options
            .velocity_path
            .clone()
            .unwrap_or_else(|| velocity_path_for(path));
        match read_velocity_file(&crd_format, &velocity_path, options.join_key) {
            Ok(velocities) => velocities,
            Err(error) if options.try_velocities => {
                warn!(path = %velocity_path, %error, "Velocities not loaded");
                BTreeMap::new()
            }
            Err(error) => return Err(error),
        }
    } else {
        BTreeMap::new()
    };

    let mut lines = RawLines::new(open_text_file(path)?);
    let mut header_line = || -> Result<Vec<u8>, BerneseError> {
        lines
            .next()
            .transpose()
            .map(Option::unwrap_or_default)
            .map_err(|e| BerneseError::io(path, e))
    };
    header_line()?;
    header_line()?;

    let datum_record = datum_format.read(&line_text(&header_line()?))?;
    let datum = datum_record.str("datum")?.to_string();
    let epoch_text = datum_record.str("epoch")?;
    let epoch = parse_datum_epoch(epoch_text).ok_or_else(|| BerneseError::InvalidDatumEpoch {
        epoch: epoch_text.to_string(),
        path: path.to_path_buf(),
    })?;
    debug!(path = %path, datum = %datum, %epoch, "Read coordinate file header");

    let body_options = ReadOptions::new()
        .with_skip_lines(CRD_HEADER_LINES - 3)
        .with_skip_blanks(true)
        .with_skip_errors(options.skip_errors);

    let mut coords = StationCoords::new();
    for record in crd_format.iter_file_lines(lines, &body_options, path) {
        let record = record?;
        let (name, xyz) = name_and_vector(&record)?;
        let key = options.join_key.key_of(name);
        let station = StationCoord {
            id: record.int("id")?,
            code: station_code(name),
            name: name.to_string(),
            datum: Some(datum.clone()),
            epoch: Some(epoch),
            vxyz: velocities.get(&key).copied(),
            xyz,
            flag: record.str("flag")?.to_string(),
        };
        coords.insert(key, station);
    }

    info!(
        path = %path,
        stations = coords.len(),
        velocities = velocities.len(),
        "Read coordinate file"
    );
    Ok(coords)
}

/// Read a velocity file into velocities keyed on `join_key`.
///
/// Any failure is returned as [`BerneseError::VelocityLoad`].
fn read_velocity_file(
    format: &FortranFormat,
    path: &Utf8Path,
    join_key: JoinKey,
) -> Result<BTreeMap<String, Vector3<f64>>, BerneseError> {
    let wrap = |source: BerneseError| BerneseError::VelocityLoad {
        path: path.to_path_buf(),
        source: Box::new(source),
    };
    let options = ReadOptions::new()
        .with_skip_lines(CRD_HEADER_LINES)
        .with_skip_blanks(true)
        .with_skip_errors(true);

    let mut velocities = BTreeMap::new();
    for record in format.read_file(path, &options).map_err(wrap)? {
        let record = record.map_err(wrap)?;
        let (name, vxyz) = name_and_vector(&record).map_err(wrap)?;
        velocities.insert(join_key.key_of(name), vxyz);
    }
    debug!(path = %path, stations = velocities.len(), "Read velocity file");
    Ok(velocities)
}

fn name_and_vector(record: &Record) -> Result<(&str, Vector3<f64>), BerneseError> {
    Ok((
        record.str("name")?,
        Vector3::new(record.float("X")?, record.float("Y")?, record.float("Z")?),
    ))
}

fn parse_datum_epoch(text: &str) -> Option<Epoch> {
    let caps = DATUM_EPOCH.captures(text)?;
    let field = |i: usize| caps[i].parse::<u8>().ok();
    Epoch::maybe_from_gregorian(
        caps[1].parse().ok()?,
        field(2)?,
        field(3)?,
        field(4)?,
        field(5)?,
        field(6)?,
        0,
        TimeScale::GPST,
    )
    .ok()
}

#[cfg(test)]
mod coord_file_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_velocity_path_for() {
        assert_eq!(velocity_path_for(Utf8Path::new("/data/F1_15300.CRD")), "/data/F1_15300.VEL");
        assert_eq!(
            velocity_path_for(Utf8Path::new("/data/F1_15300.CRD.gz")),
            "/data/F1_15300.VEL.gz"
        );
        assert_eq!(velocity_path_for(Utf8Path::new("/data/APR")), "/data/APR.VEL");
        assert_eq!(velocity_path_for(Utf8Path::new("/data/apr.crd")), "/data/apr.crd.VEL");
    }

    #[test]
    fn test_parse_datum_epoch() {
        let epoch = parse_datum_epoch("2015-10-27 12:00:00").unwrap();
        assert_eq!(
            epoch,
            Epoch::from_gregorian(2015, 10, 27, 12, 0, 0, 0, TimeScale::GPST)
        );
        assert!(parse_datum_epoch("27-10-2015 12:00:00").is_none());
        assert!(parse_datum_epoch("2015-13-45 12:00:00").is_none());
        assert!(parse_datum_epoch("").is_none());
    }

    #[test]
    fn test_join_key() {
        assert_eq!(JoinKey::Code.key_of("ABMF 97103M001"), "ABMF");
        assert_eq!(JoinKey::Name.key_of("ABMF 97103M001"), "ABMF 97103M001");
        assert_eq!(JoinKey::default(), JoinKey::Name);
    }

    #[test]
    fn test_epoch_xyz() {
        let epoch = Epoch::from_gregorian(2010, 1, 1, 0, 0, 0, 0, TimeScale::GPST);
        let station = StationCoord {
            id: 1,
            code: "ABCD".into(),
            name: "ABCD".into(),
            datum: None,
            epoch: Some(epoch),
            xyz: Vector3::new(1000.0, 2000.0, 3000.0),
            vxyz: Some(Vector3::new(0.3652420, -0.730484, 0.0)),
            flag: "A".into(),
        };

        // 1000 whole days later
        let later = epoch + Unit::Day * 1000.5;
        let xyz = station.epoch_xyz(Some(later));
        assert_abs_diff_eq!(xyz, Vector3::new(1001.0, 1998.0, 3000.0), epsilon = 1e-9);

        assert_eq!(station.epoch_xyz(None), station.xyz);
        let without_velocity = StationCoord {
            vxyz: None,
            ..station
        };
        assert_eq!(without_velocity.epoch_xyz(Some(later)), without_velocity.xyz);
    }
}
