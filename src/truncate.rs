//! Lossy coordinate truncation, used to shrink written GeoJSON.

use geojson::{FeatureCollection, Geometry, Value};

/// Ordinates kept per position; anything past elevation is dropped.
pub const MAX_ORDINATES: usize = 3;

/// Rounds to `precision` decimals, halves towards positive infinity.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor + 0.5).floor() / factor
}

pub fn truncate_collection(fc: &mut FeatureCollection, precision: u32) {
    for feature in &mut fc.features {
        if let Some(geometry) = &mut feature.geometry {
            truncate_geometry(geometry, precision);
        }
    }
}

pub fn truncate_geometry(geometry: &mut Geometry, precision: u32) {
    truncate_value(&mut geometry.value, precision);
}

pub fn truncate_value(value: &mut Value, precision: u32) {
    match value {
        Value::Point(p) => truncate_position(p, precision),
        Value::MultiPoint(points) | Value::LineString(points) => {
            truncate_positions(points, precision)
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            for line in lines {
                truncate_positions(line, precision);
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                for ring in rings {
                    truncate_positions(ring, precision);
                }
            }
        }
        Value::GeometryCollection(members) => {
            for member in members {
                truncate_geometry(member, precision);
            }
        }
    }
}

fn truncate_positions(positions: &mut [Vec<f64>], precision: u32) {
    for position in positions {
        truncate_position(position, precision);
    }
}

fn truncate_position(position: &mut Vec<f64>, precision: u32) {
    position.truncate(MAX_ORDINATES);
    for ordinate in position.iter_mut() {
        *ordinate = round_to(*ordinate, precision);
    }
}
