use camino::Utf8PathBuf;
use thiserror::Error;

use crate::compare::StationSetStage;
use crate::fortran::FieldParseError;

#[derive(Error, Debug)]
pub enum BerneseError {
    #[error("Invalid format specification: {0}")]
    FormatSpec(String),

    #[error(
        "Number of field names in \"{names}\" doesn't match format \"{format}\": \
         expected {expected} names, found {found}"
    )]
    FormatFieldCount {
        names: String,
        format: String,
        expected: usize,
        found: usize,
    },

    #[error("Cannot decode record: {0}")]
    RecordDecode(#[from] FieldParseError),

    #[error("Record has no field {0} of the requested type")]
    UnknownField(String),

    #[error("No coordinate sources specified for comparison")]
    NoSources,

    #[error("No common stations to compare ({stage}) across {sources} sources")]
    NoCommonStations {
        stage: StationSetStage,
        sources: usize,
    },

    #[error("Cannot load velocity file {path}: {source}")]
    VelocityLoad {
        path: Utf8PathBuf,
        #[source]
        source: Box<BerneseError>,
    },

    #[error("Invalid datum epoch \"{epoch}\" in {path}")]
    InvalidDatumEpoch { epoch: String, path: Utf8PathBuf },

    #[error("Cannot interpret {path} as Bernese residual file: {reason}")]
    InvalidResidualFile { path: Utf8PathBuf, reason: String },

    #[error("Column not found in comparison table: {0}")]
    UnknownColumn(String),

    #[error("Unable to read {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to write comparison table: {0}")]
    IoWrite(#[source] std::io::Error),

    #[error("Source names produce the comparison column {0} twice")]
    DuplicateColumn(String),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),
}

impl BerneseError {
    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        BerneseError::Io {
            path: path.into(),
            source,
        }
    }
}
