//! # Coordinate comparison
//!
//! Aligns two or more coordinate sets on their join keys and tabulates the stations they
//! have in common.
//!
//! ## Workflow
//! -----------------
//! 1. Every [`CoordSource`] is resolved to a [`StationCoords`] map, reading paths with
//!    [`read_coord_file`].
//! 2. The join keys common to all sources are selected, optionally restricted to an
//!    explicit code list and to the stations of an auxiliary coordinate file.
//! 3. For each key, in ascending order, the geodetic position of the first source is
//!    computed on [`GRS80`] and the positions (and velocities) of all sources are collected
//!    in ascending source name order.
//! 4. With exactly two sources, the Cartesian difference (second minus first), its
//!    east/north/up decomposition and the norm of the latter are appended.
//!
//! Missing velocities are carried as `NaN` components, so velocity differences of such
//! stations are `NaN` while their position differences stay defined.
//!
//! ## Example
//! -----------------
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use bernese::compare::{compare, CompareParams, CoordSource};
//! use bernese::files::coord_file::JoinKey;
//!
//! let sources = BTreeMap::from([
//!     ("apr".to_string(), CoordSource::from("APR15300.CRD")),
//!     ("fin".to_string(), CoordSource::from("FIN15300.CRD")),
//! ]);
//! let params = CompareParams::builder().join_key(JoinKey::Code).build();
//! let table = compare(sources, &params)?;
//! println!("{:?}", table.column("offset"));
//! # Ok::<(), bernese::bernese_errors::BerneseError>(())
//! ```
pub mod summary;
pub mod table;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use camino::Utf8PathBuf;
use itertools::Itertools;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bernese_errors::BerneseError;
use crate::constants::StationCoords;
use crate::ellipsoid::GRS80;
use crate::files::coord_file::{read_coord_file, CoordReadOptions, JoinKey};

pub use summary::{render_summary, summarize, write_summary, ColumnSummary, DIFFERENCE_COLUMNS};
pub use table::{ComparisonRow, ComparisonTable};

/// Stage of the station selection at which no station was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationSetStage {
    /// Intersection of the sources' join keys.
    Sources,
    /// After restricting to the requested codes.
    Selection,
}

impl fmt::Display for StationSetStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationSetStage::Sources => write!(f, "before selection"),
            StationSetStage::Selection => write!(f, "after selection"),
        }
    }
}

/// A coordinate set to compare.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordSource {
    /// Stations already read, keyed on the comparison's join key.
    Loaded(StationCoords),
    /// Coordinate file to read.
    Path(Utf8PathBuf),
}

impl From<StationCoords> for CoordSource {
    fn from(coords: StationCoords) -> Self {
        CoordSource::Loaded(coords)
    }
}

impl From<Utf8PathBuf> for CoordSource {
    fn from(path: Utf8PathBuf) -> Self {
        CoordSource::Path(path)
    }
}

impl From<&str> for CoordSource {
    fn from(path: &str) -> Self {
        CoordSource::Path(Utf8PathBuf::from(path))
    }
}

/// Parameters of [`compare`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareParams {
    /// Key matching stations across sources.
    pub join_key: JoinKey,
    /// Restrict the comparison to these join keys.
    pub codes: Option<Vec<String>>,
    /// Restrict the comparison to the stations of this coordinate file.
    pub codes_coord_file: Option<Utf8PathBuf>,
    /// Tabulate velocities, and velocity differences for two sources.
    pub velocities: bool,
    /// Skip malformed lines of the coordinate files read.
    pub skip_errors: bool,
}

impl Default for CompareParams {
    fn default() -> Self {
        CompareParams {
            join_key: JoinKey::Name,
            codes: None,
            codes_coord_file: None,
            velocities: false,
            skip_errors: true,
        }
    }
}

impl CompareParams {
    pub fn builder() -> CompareParamsBuilder {
        CompareParamsBuilder::new()
    }

    /// Split a whitespace separated code list.
    pub fn codes_from_str(codes: &str) -> Vec<String> {
        codes.split_whitespace().map(String::from).collect()
    }

    fn read_options(&self) -> CoordReadOptions {
        CoordReadOptions::new()
            .with_join_key(self.join_key)
            .with_skip_errors(self.skip_errors)
    }
}

/// Fluent builder for [`CompareParams`].
#[derive(Debug, Clone, Default)]
pub struct CompareParamsBuilder {
    params: CompareParams,
}

impl CompareParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: CompareParams::default(),
        }
    }

    pub fn join_key(mut self, v: JoinKey) -> Self {
        self.params.join_key = v;
        self
    }
    pub fn codes<I, S>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.codes = Some(v.into_iter().map(Into::into).collect());
        self
    }
    pub fn codes_coord_file(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.params.codes_coord_file = Some(v.into());
        self
    }
    pub fn velocities(mut self, v: bool) -> Self {
        self.params.velocities = v;
        self
    }
    pub fn skip_errors(mut self, v: bool) -> Self {
        self.params.skip_errors = v;
        self
    }

    pub fn build(self) -> CompareParams {
        self.params
    }
}

/// Compare named coordinate sets station by station.
///
/// Arguments
/// -----------------
/// * `sources` – Coordinate sets keyed on the name used for their columns.
/// * `params` – Join key, station selection and velocity handling, see [`CompareParams`].
///
/// Return
/// ----------
/// * The comparison table, or
///   - [`BerneseError::NoSources`] if `sources` is empty,
///   - [`BerneseError::DuplicateColumn`] if two columns would share a name, as with a source
///     named `diff` in a two-source comparison,
///   - [`BerneseError::NoCommonStations`] if no station is common to all sources, or none
///     survives the selection,
///   - any error of [`read_coord_file`] for path sources and the selection file.
///
/// See also
/// ------------
/// * [`ComparisonTable`] – Column layout and CSV export.
/// * [`summarize`] – Statistics of the difference columns.
pub fn compare(
    sources: BTreeMap<String, CoordSource>,
    params: &CompareParams,
) -> Result<ComparisonTable, BerneseError> {
    if sources.is_empty() {
        return Err(BerneseError::NoSources);
    }
    let source_names: Vec<String> = sources.keys().cloned().collect();
    let columns = columns(&source_names, params.velocities);
    if let Some(column) = columns.iter().duplicates().next() {
        return Err(BerneseError::DuplicateColumn(column.clone()));
    }

    let source_options = params.read_options().with_velocities(params.velocities);
    let coords = sources
        .into_iter()
        .map(|(name, source)| {
            let stations = match source {
                CoordSource::Loaded(stations) => stations,
                CoordSource::Path(path) => read_coord_file(&path, &source_options)?,
            };
            Ok((name, stations))
        })
        .collect::<Result<Vec<_>, BerneseError>>()?;
    let source_count = coords.len();

    let mut keys: BTreeSet<&String> = coords[0].1.keys().collect();
    for (_, stations) in &coords[1..] {
        keys.retain(|key| stations.contains_key(*key));
    }
    if keys.is_empty() {
        return Err(BerneseError::NoCommonStations {
            stage: StationSetStage::Sources,
            sources: source_count,
        });
    }

    if let Some(codes) = &params.codes {
        let codes: BTreeSet<&String> = codes.iter().collect();
        keys.retain(|key| codes.contains(key));
    }
    if let Some(path) = &params.codes_coord_file {
        let selection = read_coord_file(path, &params.read_options())?;
        keys.retain(|key| selection.contains_key(*key));
    }
    if keys.is_empty() {
        return Err(BerneseError::NoCommonStations {
            stage: StationSetStage::Selection,
            sources: source_count,
        });
    }
    debug!(
        sources = %coords.iter().map(|(name, _)| name).join(","),
        stations = keys.len(),
        "Selected stations for comparison"
    );

    let with_differences = source_count == 2;
    let missing = Vector3::repeat(f64::NAN);

    let rows = keys
        .into_iter()
        .map(|key| {
            let stations: Vec<_> = coords.iter().map(|(_, stations)| &stations[key]).collect();
            let (mut lon, lat, hgt) = GRS80.geodetic(&stations[0].xyz);
            if lon < 0.0 {
                lon += 360.0;
            }

            let mut values = Vec::with_capacity(columns.len());
            for station in &stations {
                values.extend(station.xyz.iter());
                if params.velocities {
                    values.extend(station.vxyz.unwrap_or(missing).iter());
                }
            }

            if with_differences {
                let enu_axes = GRS80.enu_axes(lon, lat);
                let mut push_difference = |from: Vector3<f64>, to: Vector3<f64>| {
                    let dxyz = to - from;
                    let denu = enu_axes * dxyz;
                    values.extend(dxyz.iter());
                    values.extend(denu.iter());
                    values.push(denu.norm());
                };
                push_difference(stations[0].xyz, stations[1].xyz);
                if params.velocities {
                    push_difference(
                        stations[0].vxyz.unwrap_or(missing),
                        stations[1].vxyz.unwrap_or(missing),
                    );
                }
            }

            ComparisonRow {
                key: key.clone(),
                lon,
                lat,
                hgt,
                flags: stations.iter().map(|s| s.flag.clone()).collect(),
                values,
            }
        })
        .collect::<Vec<_>>();

    info!(
        sources = source_count,
        stations = rows.len(),
        velocities = params.velocities,
        "Compared coordinate sets"
    );
    Ok(ComparisonTable::new(columns, source_names, rows))
}

/// Column names of a comparison of `sources`.
fn columns(sources: &[String], velocities: bool) -> Vec<String> {
    let mut columns: Vec<String> = ["code", "lon", "lat", "hgt"].map(String::from).to_vec();
    columns.extend(sources.iter().map(|s| format!("{s}_flg")));
    for source in sources {
        columns.extend(["X", "Y", "Z"].iter().map(|c| format!("{source}_{c}")));
        if velocities {
            columns.extend(["VX", "VY", "VZ"].iter().map(|c| format!("{source}_{c}")));
        }
    }
    if sources.len() == 2 {
        columns.extend(
            ["diff_X", "diff_Y", "diff_Z", "diff_E", "diff_N", "diff_U", "offset"]
                .map(String::from),
        );
        if velocities {
            columns.extend(
                ["diff_VX", "diff_VY", "diff_VZ", "diff_VE", "diff_VN", "diff_VU", "offsetV"]
                    .map(String::from),
            );
        }
    }
    columns
}

#[cfg(test)]
mod compare_test {
    use super::*;
    use crate::files::coord_file::StationCoord;
    use approx::assert_abs_diff_eq;

    fn station(name: &str, xyz: Vector3<f64>, vxyz: Option<Vector3<f64>>) -> StationCoord {
        StationCoord {
            id: 1,
            code: name.chars().take(4).collect(),
            name: name.to_string(),
            datum: None,
            epoch: None,
            xyz,
            vxyz,
            flag: "A".into(),
        }
    }

    fn coords(entries: &[(&str, Vector3<f64>)]) -> StationCoords {
        entries
            .iter()
            .map(|(name, xyz)| (name.to_string(), station(name, *xyz, None)))
            .collect()
    }

    #[test]
    fn test_columns() {
        let sources = ["a".to_string(), "b".to_string()];
        let cols = columns(&sources, false);
        assert_eq!(
            cols,
            [
                "code", "lon", "lat", "hgt", "a_flg", "b_flg", "a_X", "a_Y", "a_Z", "b_X", "b_Y",
                "b_Z", "diff_X", "diff_Y", "diff_Z", "diff_E", "diff_N", "diff_U", "offset"
            ]
        );
        assert_eq!(columns(&sources, true).len(), cols.len() + 6 + 7);
        assert_eq!(columns(&sources[..1], true).len(), 4 + 1 + 6);
    }

    #[test]
    fn test_colliding_source_names() {
        let xyz = GRS80.xyz(10.0, 10.0, 0.0);
        let sources = BTreeMap::from([
            ("diff".to_string(), CoordSource::from(coords(&[("ABCD", xyz)]))),
            ("fin".to_string(), CoordSource::from(coords(&[("ABCD", xyz)]))),
        ]);
        let error = compare(sources.clone(), &CompareParams::default()).unwrap_err();
        assert!(matches!(error, BerneseError::DuplicateColumn(ref c) if c == "diff_X"));

        // without the difference columns the names do not clash
        let mut three = sources;
        three.insert("apr".to_string(), CoordSource::from(coords(&[("ABCD", xyz)])));
        let table = compare(three, &CompareParams::default()).unwrap();
        assert_eq!(table.column("diff_X").unwrap().len(), 1);
    }

    #[test]
    fn test_codes_from_str() {
        assert_eq!(CompareParams::codes_from_str(" ABCD  WXYZ\n"), ["ABCD", "WXYZ"]);
        assert!(CompareParams::codes_from_str("   ").is_empty());
    }

    #[test]
    fn test_builder() {
        let params = CompareParams::builder()
            .join_key(JoinKey::Code)
            .codes(["ABCD"])
            .velocities(true)
            .build();
        assert_eq!(params.join_key, JoinKey::Code);
        assert_eq!(params.codes, Some(vec!["ABCD".to_string()]));
        assert!(params.velocities);
        assert!(params.skip_errors);
        assert!(params.codes_coord_file.is_none());
    }

    #[test]
    fn test_missing_velocity_is_nan() {
        let xyz = GRS80.xyz(30.0, 45.0, 100.0);
        let first = StationCoords::from([(
            "ABCD".to_string(),
            station("ABCD", xyz, Some(Vector3::new(0.01, 0.0, 0.0))),
        )]);
        let second = StationCoords::from([("ABCD".to_string(), station("ABCD", xyz, None))]);
        let sources = BTreeMap::from([
            ("a".to_string(), CoordSource::from(first)),
            ("b".to_string(), CoordSource::from(second)),
        ]);
        let params = CompareParams::builder().velocities(true).build();
        let table = compare(sources, &params).unwrap();

        assert_abs_diff_eq!(table.column("offset").unwrap()[0], 0.0);
        assert!(table.column("b_VX").unwrap()[0].is_nan());
        assert!(table.column("diff_VE").unwrap()[0].is_nan());
        assert!(table.column("offsetV").unwrap()[0].is_nan());
        assert_abs_diff_eq!(table.column("a_VX").unwrap()[0], 0.01);
    }

    #[test]
    fn test_code_selection() {
        let xyz = GRS80.xyz(10.0, 10.0, 0.0);
        let set = coords(&[("ABCD", xyz), ("WXYZ", xyz)]);
        let sources = BTreeMap::from([
            ("a".to_string(), CoordSource::from(set.clone())),
            ("b".to_string(), CoordSource::from(set)),
        ]);

        let params = CompareParams::builder().codes(["WXYZ", "QQQQ"]).build();
        let table = compare(sources.clone(), &params).unwrap();
        assert_eq!(table.keys().collect::<Vec<_>>(), ["WXYZ"]);

        let params = CompareParams::builder().codes(["QQQQ"]).build();
        let error = compare(sources, &params).unwrap_err();
        assert!(matches!(
            error,
            BerneseError::NoCommonStations {
                stage: StationSetStage::Selection,
                sources: 2
            }
        ));
    }

    #[test]
    fn test_three_sources_have_no_differences() {
        let xyz = GRS80.xyz(10.0, 10.0, 0.0);
        let sources: BTreeMap<String, CoordSource> = ["c", "a", "b"]
            .iter()
            .map(|name| (name.to_string(), CoordSource::from(coords(&[("ABCD", xyz)]))))
            .collect();
        let table = compare(sources, &CompareParams::default()).unwrap();
        assert!(!table.has_differences());
        assert_eq!(table.sources(), ["a", "b", "c"]);
        assert_eq!(&table.columns()[4..7], ["a_flg", "b_flg", "c_flg"]);
        assert_eq!(table.rows()[0].values.len(), 9);
    }
}
