//! # Constants and type definitions for Bernese file handling
//!
//! This module centralizes the **ellipsoid parameters**, **file layout constants**, and
//! **common type definitions** used throughout the crate.
//!
//! ## Overview
//!
//! - GRS80 ellipsoid parameters used for geodetic conversions
//! - Header sizes and record layouts of the supported Bernese file families
//! - Core type aliases used across the crate
//! - Container types for decoded coordinate and cluster files

use std::collections::BTreeMap;

use crate::files::cluster_file::StationCluster;
use crate::files::coord_file::StationCoord;

// -------------------------------------------------------------------------------------------------
// Ellipsoid parameters
// -------------------------------------------------------------------------------------------------

/// GRS80 semi-major axis in meters
pub const GRS80_MAJOR_AXIS: f64 = 6_378_137.0;

/// GRS80 inverse flattening
pub const GRS80_INVERSE_FLATTENING: f64 = 298.257_222_101;

/// Days per year used when propagating station velocities
pub const DAYS_PER_YEAR: f64 = 365.242;

// -------------------------------------------------------------------------------------------------
// File layouts
// -------------------------------------------------------------------------------------------------

/// Layout of a coordinate (and velocity) file body line
pub const CRD_RECORD_FORMAT: &str = "I3,2X,A16,3F15.4,4X,A1";

/// Field names of a coordinate body line
pub const CRD_RECORD_FIELDS: &str = "id name X Y Z flag";

/// Layout of the datum/epoch line (third line) of a coordinate file
pub const CRD_DATUM_FORMAT: &str = "22X,A18,7X,A20";

/// Header lines preceding the body of a coordinate or velocity file
pub const CRD_HEADER_LINES: usize = 6;

/// Layout of a cluster file body line
pub const CLU_RECORD_FORMAT: &str = "A16,I5";

/// Layout of a fix file body line
pub const FIX_RECORD_FORMAT: &str = "A16";

/// Header lines preceding the body of a cluster file
pub const CLU_HEADER_LINES: usize = 5;

/// Header lines preceding the body of a fix file
pub const FIX_HEADER_LINES: usize = 5;

/// Layout of a residual file station/baseline line
pub const RES_LINE_FORMAT: &str = "(I3,2X,2A18,A10,3(X,I2),14X,4I2,I4,I5)";

/// Field names of a residual file station/baseline line
pub const RES_LINE_FIELDS: &str = "num st1 st2 obsdate hour min sec nf f1 f2 f3 type period";

/// Longest record, in characters, a compiled format may describe
pub const MAX_RECORD_LENGTH: usize = 65_536;

/// Largest number of values a compiled format may produce per record
pub const MAX_RECORD_FIELDS: usize = 65_536;

/// Number of leading characters of a station name forming its 4-character code
pub const STATION_CODE_LEN: usize = 4;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in meters
pub type Meter = f64;

/// Station coordinates keyed by join key (station code or full name)
pub type StationCoords = BTreeMap<String, StationCoord>;

/// Cluster membership keyed by full station name
pub type ClusterMap = BTreeMap<String, StationCluster>;

/// Derive the 4-character station code from a station name.
///
/// Names shorter than four characters are returned whole.
pub fn station_code(name: &str) -> String {
    name.chars().take(STATION_CODE_LEN).collect()
}
