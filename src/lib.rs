//! # Bernese
//!
//! Readers for the fixed-column text files of the Bernese GNSS software and a comparison
//! engine for station coordinate solutions.
//!
//! ## Modules
//! -----------------
//! * [`fortran`] – Fortran style record layouts (`I3,2X,A16,3F15.4`): compilation, line
//!   decoding and lazy file iteration, including gzip compressed files.
//! * [`files`] – Coordinate, velocity, cluster, fix and residual file readers.
//! * [`ellipsoid`] – GRS80 geodetic conversions and local east/north/up axes.
//! * [`compare`] – Station by station comparison of coordinate sets, CSV export and
//!   summary statistics.
//! * [`bernese_errors`] – The crate error type.
//!
//! ## Example
//! -----------------
//! ```rust,no_run
//! use camino::Utf8Path;
//! use bernese::files::coord_file::{read_coord_file, CoordReadOptions, JoinKey};
//!
//! let options = CoordReadOptions::new()
//!     .with_join_key(JoinKey::Code)
//!     .with_try_velocities(true);
//! let coords = read_coord_file(Utf8Path::new("APR15300.CRD"), &options)?;
//! for (code, station) in &coords {
//!     println!("{code} {:?}", station.xyz);
//! }
//! # Ok::<(), bernese::bernese_errors::BerneseError>(())
//! ```
//!
//! Logging goes through [`tracing`]; install a subscriber to see it.
pub mod bernese_errors;
pub mod compare;
pub mod constants;
pub mod ellipsoid;
pub mod files;
pub mod fortran;

pub use bernese_errors::BerneseError;
pub use compare::{compare, CompareParams, ComparisonTable, CoordSource};
pub use ellipsoid::{Ellipsoid, GRS80};
pub use fortran::{FortranFormat, Record};
