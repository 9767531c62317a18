//! Reading, writing and structural validation of GeoJSON FeatureCollections.

use geo_types::Coord;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use crate::error::{Result, SpillmapError, io_err};

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    /// Index of the offending feature, if the issue is inside one
    pub feature: Option<usize>,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.feature {
            Some(idx) => write!(f, "feature #{}: {}", idx, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

pub fn read_feature_collection(path: &Path) -> Result<FeatureCollection> {
    let raw = fs::read_to_string(path).map_err(|e| io_err!(path, e))?;

    let geojson = raw
        .parse::<GeoJson>()
        .map_err(|source| SpillmapError::GeoJson {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;

    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        _ => Err(SpillmapError::NotAFeatureCollection(path.to_path_buf())),
    }
}

/// Writes compact JSON, creating missing parent directories.
pub fn write_feature_collection(path: &Path, fc: &FeatureCollection) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_err!(parent, e))?;
    }

    let file = File::create(path).map_err(|e| io_err!(path, e))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer(writer, fc).map_err(|source| SpillmapError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn feature_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Coordinates of a Point feature. Any other geometry yields `None`.
pub fn point_coords(feature: &Feature) -> Option<Coord<f64>> {
    match feature.geometry.as_ref().map(|g| &g.value) {
        Some(Value::Point(position)) if position.len() >= 2 => Some(Coord {
            x: position[0],
            y: position[1],
        }),
        _ => None,
    }
}

/// Checks the collection against the GeoJSON structural grammar.
///
/// The `geojson` types already guarantee the object shapes; this looks at
/// what they cannot: position arity and finiteness, line lengths and ring
/// closure.
pub fn validate_feature_collection(fc: &FeatureCollection) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    for (idx, feature) in fc.features.iter().enumerate() {
        if let Some(geometry) = &feature.geometry {
            validate_geometry(geometry, &mut |message: String| {
                issues.push(ValidationIssue {
                    feature: Some(idx),
                    message,
                })
            });
        }
    }

    if issues.is_empty() { Ok(()) } else { Err(issues) }
}

fn validate_geometry(geometry: &Geometry, report: &mut dyn FnMut(String)) {
    match &geometry.value {
        Value::Point(p) => validate_position(p, report),
        Value::MultiPoint(points) => {
            for p in points {
                validate_position(p, report);
            }
        }
        Value::LineString(line) => validate_line(line, report),
        Value::MultiLineString(lines) => {
            for line in lines {
                validate_line(line, report);
            }
        }
        Value::Polygon(rings) => validate_polygon(rings, report),
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                validate_polygon(rings, report);
            }
        }
        Value::GeometryCollection(members) => {
            for member in members {
                validate_geometry(member, report);
            }
        }
    }
}

fn validate_position(position: &[f64], report: &mut dyn FnMut(String)) {
    if position.len() < 2 {
        report(format!(
            "position must have at least 2 elements, found {}",
            position.len()
        ));
    }
    if position.iter().any(|v| !v.is_finite()) {
        report(format!("position {:?} has a non-finite element", position));
    }
}

fn validate_line(line: &[Vec<f64>], report: &mut dyn FnMut(String)) {
    if line.len() < 2 {
        report(format!(
            "LineString needs at least 2 positions, found {}",
            line.len()
        ));
    }
    for p in line {
        validate_position(p, report);
    }
}

fn validate_polygon(rings: &[Vec<Vec<f64>>], report: &mut dyn FnMut(String)) {
    for ring in rings {
        if ring.len() < 4 {
            report(format!(
                "linear ring needs at least 4 positions, found {}",
                ring.len()
            ));
        } else if ring.first() != ring.last() {
            report("linear ring is not closed".to_string());
        }
        for p in ring {
            validate_position(p, report);
        }
    }
}
