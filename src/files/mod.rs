//! # Bernese file readers
//!
//! Each reader pairs one [`FortranFormat`](crate::fortran::FortranFormat) with the header
//! conventions of its file family:
//!
//! | Module | File | Result |
//! |---|---|---|
//! | [`coord_file`] | `.CRD` (+ `.VEL`) | [`StationCoords`](crate::constants::StationCoords) |
//! | [`cluster_file`] | `.CLU` | [`ClusterMap`](crate::constants::ClusterMap) |
//! | [`fix_file`] | `.FIX` | list of [`Station`](fix_file::Station) |
//! | [`residual_file`] | residual dump | [`ResidualFile`](residual_file::ResidualFile) |
//!
//! Station codes are always the first four characters of the 16-character name.
pub mod cluster_file;
pub mod coord_file;
pub mod fix_file;
pub mod residual_file;
