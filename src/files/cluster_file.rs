//! Bernese cluster (`.CLU`) files: station to cluster membership.
//!
//! After five header lines, each body line holds a 16-character station name and a
//! 5-character cluster number (`A16,I5`). A station may appear on several lines; its
//! cluster numbers are accumulated in file order. Malformed body lines are errors.
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bernese_errors::BerneseError;
use crate::constants::{station_code, ClusterMap, CLU_HEADER_LINES, CLU_RECORD_FORMAT};
use crate::fortran::{FortranFormat, ReadOptions};

/// Clusters a station belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationCluster {
    pub code: String,
    pub name: String,
    /// Cluster numbers in file order.
    pub clusters: Vec<i64>,
}

/// Read a cluster file into a map keyed on the full station name.
///
/// Return
/// ----------
/// * The cluster map, or [`BerneseError::Io`] / [`BerneseError::RecordDecode`] if the file
///   cannot be read or a body line cannot be decoded.
pub fn read_cluster_file(path: &Utf8Path) -> Result<ClusterMap, BerneseError> {
    let format = FortranFormat::compile(CLU_RECORD_FORMAT, Some("name cluster"), true)?;
    let options = ReadOptions::new()
        .with_skip_lines(CLU_HEADER_LINES)
        .with_skip_blanks(true);

    let mut clusters = ClusterMap::new();
    for record in format.read_file(path, &options)? {
        let record = record?;
        let name = record.str("name")?;
        let cluster = record.int("cluster")?;
        clusters
            .entry(name.to_string())
            .or_insert_with(|| StationCluster {
                code: station_code(name),
                name: name.to_string(),
                clusters: Vec::new(),
            })
            .clusters
            .push(cluster);
    }

    info!(path = %path, stations = clusters.len(), "Read cluster file");
    Ok(clusters)
}
