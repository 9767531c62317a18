//! Error types shared by the batch pipelines and the map view.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::geo_io::ValidationIssue;

#[derive(Error, Debug)]
pub enum SpillmapError {
    #[error("I/O error accessing path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Malformed GeoJSON in '{path}': {source}")]
    GeoJson {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("'{0}' does not contain a GeoJSON FeatureCollection")]
    NotAFeatureCollection(PathBuf),
    #[error("GeoJSON failed validation with {} issue(s)", .0.len())]
    Invalid(Vec<ValidationIssue>),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid hex grid request: {0}")]
    HexGrid(String),
}

pub type Result<T, E = SpillmapError> = std::result::Result<T, E>;

macro_rules! io_err {
    ($path:expr, $err:expr) => {
        $crate::error::SpillmapError::Io {
            path: $path.to_path_buf(),
            source: $err,
        }
    };
}

pub(crate) use io_err;
