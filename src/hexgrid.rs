//! Hexagonal binning of well locations.
//!
//! The grid is a flat-topped hexagon tessellation laid out over a bounding
//! box. Cell size is given as a side length in great-circle units and is
//! converted to degrees separately for each axis, so cells are slightly
//! stretched away from the equator.

use geo::{Contains, Distance, Haversine};
use geo_types::{Coord, LineString, Point, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, info, warn};

use crate::config::HexGridConfig;
use crate::error::{Result, SpillmapError};
use crate::geo_io::{
    feature_collection, point_coords, read_feature_collection, write_feature_collection,
};
use crate::truncate::truncate_collection;

pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

pub const COUNT_PROPERTY: &str = "count";
pub const WELL_COUNT_PROPERTY: &str = "wellCount";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Degrees,
    Radians,
    Meters,
    Kilometers,
    Miles,
}

impl Units {
    /// Converts a central angle to a length in these units.
    pub fn from_radians(self, radians: f64) -> f64 {
        match self {
            Units::Degrees => radians.to_degrees(),
            Units::Radians => radians,
            Units::Meters => radians * EARTH_RADIUS_M,
            Units::Kilometers => radians * EARTH_RADIUS_M / 1000.0,
            Units::Miles => radians * EARTH_RADIUS_M / 1609.344,
        }
    }
}

/// Great-circle distance between two (lon, lat) points.
pub fn great_circle(a: Point<f64>, b: Point<f64>, units: Units) -> f64 {
    units.from_radians(Haversine.distance(a, b) / EARTH_RADIUS_M)
}

/// Builds the hexagons covering `bbox` (`[west, south, east, north]`).
///
/// Hexagons are fully inside the box horizontally and centred on it; the
/// output order is column by column, west to east, each column south to north.
pub fn hex_grid(bbox: [f64; 4], cell_side: f64, units: Units) -> Result<Vec<Polygon<f64>>> {
    let [west, south, east, north] = bbox;

    if bbox.iter().any(|v| !v.is_finite()) || west >= east || south >= north {
        return Err(SpillmapError::HexGrid(format!(
            "bounding box {:?} must be finite with west < east and south < north",
            bbox
        )));
    }
    if !cell_side.is_finite() || cell_side <= 0.0 {
        return Err(SpillmapError::HexGrid(format!(
            "cell side must be a positive number, got {}",
            cell_side
        )));
    }

    let center_x = (west + east) / 2.0;
    let center_y = (south + north) / 2.0;

    let x_fraction = (cell_side * 2.0)
        / great_circle(
            Point::new(west, center_y),
            Point::new(east, center_y),
            units,
        );
    let cell_width = x_fraction * (east - west);
    let y_fraction = (cell_side * 2.0)
        / great_circle(
            Point::new(center_x, south),
            Point::new(center_x, north),
            units,
        );
    let cell_height = y_fraction * (north - south);

    let radius = cell_width / 2.0;
    let hex_width = radius * 2.0;
    let hex_height = 3f64.sqrt() / 2.0 * cell_height;

    let box_width = east - west;
    let box_height = north - south;

    let x_interval = 0.75 * hex_width;
    let y_interval = hex_height;

    let x_count = ((box_width - hex_width) / (hex_width - radius / 2.0)).floor() as i64;
    let x_adjust = (x_count as f64 * x_interval - radius / 2.0 - box_width) / 2.0 - radius / 2.0
        + x_interval / 2.0;

    let y_count = ((box_height - hex_height) / hex_height).floor() as i64;
    let mut y_adjust = (box_height - y_count as f64 * hex_height) / 2.0;

    let has_offset_y = y_count as f64 * hex_height - box_height > hex_height / 2.0;
    if has_offset_y {
        y_adjust -= hex_height / 4.0;
    }

    let corners: Vec<(f64, f64)> = (0..6)
        .map(|i| {
            let angle = (2.0 * PI / 6.0) * i as f64;
            (angle.cos(), angle.sin())
        })
        .collect();

    let mut cells = Vec::new();
    for x in 0..=x_count {
        for y in 0..=y_count {
            let is_odd = x % 2 == 1;
            if y == 0 && (is_odd || has_offset_y) {
                continue;
            }

            let cx = x as f64 * x_interval + west - x_adjust;
            let mut cy = y as f64 * y_interval + south + y_adjust;
            if is_odd {
                cy -= hex_height / 2.0;
            }

            cells.push(hexagon(
                Coord { x: cx, y: cy },
                cell_width / 2.0,
                cell_height / 2.0,
                &corners,
            ));
        }
    }

    Ok(cells)
}

fn hexagon(center: Coord<f64>, rx: f64, ry: f64, corners: &[(f64, f64)]) -> Polygon<f64> {
    let mut ring: Vec<Coord<f64>> = corners
        .iter()
        .map(|(cos, sin)| Coord {
            x: center.x + rx * cos,
            y: center.y + ry * sin,
        })
        .collect();
    ring.push(ring[0]);

    Polygon::new(LineString(ring), vec![])
}

/// Number of points strictly inside `cell`. Points on an edge or vertex are
/// not counted, so a point is never credited to two neighbouring cells.
pub fn count_points(cell: &Polygon<f64>, points: &[Coord<f64>]) -> u64 {
    points
        .iter()
        .filter(|c| cell.contains(&Point::from(**c)))
        .count() as u64
}

pub fn cells_to_features(cells: &[Polygon<f64>]) -> Vec<Feature> {
    cells
        .iter()
        .map(|cell| Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::from(cell))),
            id: None,
            properties: Some(JsonObject::new()),
            foreign_members: None,
        })
        .collect()
}

/// Point coordinates of every Point feature; other geometries are ignored.
pub fn collect_points(fc: &FeatureCollection) -> Vec<Coord<f64>> {
    fc.features.iter().filter_map(point_coords).collect()
}

/// Adds `count` (dataset A) and `wellCount` (dataset B) to every polygon
/// feature, keeping whatever properties the cell already has.
pub fn annotate_cells(
    grid: &mut FeatureCollection,
    dataset_a: &[Coord<f64>],
    dataset_b: &[Coord<f64>],
) {
    for (i, feature) in grid.features.iter_mut().enumerate() {
        let polygon = match feature
            .geometry
            .as_ref()
            .map(|g| Polygon::<f64>::try_from(g.value.clone()))
        {
            Some(Ok(polygon)) => polygon,
            _ => {
                warn!("hex #{} is not a polygon, left unannotated", i);
                continue;
            }
        };

        let count = count_points(&polygon, dataset_a);
        let well_count = count_points(&polygon, dataset_b);

        if count > 0 {
            debug!("adding count of {} to hex #{}", count, i);
        }
        if well_count > 0 {
            debug!("adding count of wells {} to hex #{}", well_count, i);
        }

        feature.set_property(COUNT_PROPERTY, count);
        feature.set_property(WELL_COUNT_PROPERTY, well_count);
    }
}

/// Turns `cells` into annotated polygon features.
pub fn aggregate(
    cells: &[Polygon<f64>],
    dataset_a: &[Coord<f64>],
    dataset_b: &[Coord<f64>],
) -> FeatureCollection {
    let mut grid = feature_collection(cells_to_features(cells));
    annotate_cells(&mut grid, dataset_a, dataset_b);
    grid
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexbinReport {
    pub cells: usize,
    pub occupied_cells: usize,
    pub counted: u64,
    pub well_counted: u64,
}

fn summarize(grid: &FeatureCollection) -> HexbinReport {
    let read = |f: &Feature, key: &str| f.property(key).and_then(|v| v.as_u64()).unwrap_or(0);

    let mut report = HexbinReport {
        cells: grid.features.len(),
        occupied_cells: 0,
        counted: 0,
        well_counted: 0,
    };
    for feature in &grid.features {
        let count = read(feature, COUNT_PROPERTY);
        let well_count = read(feature, WELL_COUNT_PROPERTY);
        if count + well_count > 0 {
            report.occupied_cells += 1;
        }
        report.counted += count;
        report.well_counted += well_count;
    }
    report
}

/// Reads both point datasets, bins them into the configured grid and writes
/// the annotated grid with truncated coordinates.
pub fn run_hexbin(config: &HexGridConfig) -> Result<HexbinReport> {
    let wells = read_feature_collection(&config.wells_path)?;
    let spilled = read_feature_collection(&config.spilled_wells_path)?;

    let dataset_a = collect_points(&wells);
    let dataset_b = collect_points(&spilled);
    info!(
        "Loaded {} wells and {} spill locations",
        dataset_a.len(),
        dataset_b.len()
    );

    let cells = hex_grid(config.bbox, config.cell_side, config.units)?;
    info!(
        "Generated {} hex cells over {:?} (side {} {:?})",
        cells.len(),
        config.bbox,
        config.cell_side,
        config.units
    );

    let mut grid = aggregate(&cells, &dataset_a, &dataset_b);

    let report = summarize(&grid);
    info!(
        "{} of {} cells hold points ({} wells, {} spill wells counted)",
        report.occupied_cells, report.cells, report.counted, report.well_counted
    );

    truncate_collection(&mut grid, config.precision);

    info!("Writing hex grid to {}", config.output_path.display());
    write_feature_collection(&config.output_path, &grid)?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Centroid;

    const COLORADO: [f64; 4] = [-109.060253, 36.992426, -102.041524, 41.003444];

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (x0, y0),
                (x0 + size, y0),
                (x0 + size, y0 + size),
                (x0, y0 + size),
                (x0, y0),
            ]),
            vec![],
        )
    }

    #[test]
    fn test_cell_count_is_deterministic() {
        let first = hex_grid([0.0, 0.0, 1.0, 1.0], 0.1, Units::Degrees).unwrap();
        let second = hex_grid([0.0, 0.0, 1.0, 1.0], 0.1, Units::Degrees).unwrap();
        assert_eq!(first.len(), 27);
        assert_eq!(first, second);
    }

    #[test]
    fn test_colorado_grid_size() {
        let cells = hex_grid(COLORADO, 0.2, Units::Degrees).unwrap();
        assert_eq!(cells.len(), 179);
        for cell in &cells {
            assert_eq!(cell.exterior().0.len(), 7);
            assert_eq!(cell.exterior().0.first(), cell.exterior().0.last());
        }
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(hex_grid([1.0, 0.0, 0.0, 1.0], 0.1, Units::Degrees).is_err());
        assert!(hex_grid([0.0, 0.0, 1.0, 1.0], 0.0, Units::Degrees).is_err());
        assert!(hex_grid([0.0, 0.0, f64::NAN, 1.0], 0.1, Units::Degrees).is_err());
    }

    #[test]
    fn test_oversized_cell_yields_empty_grid() {
        let cells = hex_grid([0.0, 0.0, 1.0, 1.0], 5.0, Units::Degrees).unwrap();
        assert!(cells.is_empty());
    }

    #[test]
    fn test_units_conversion() {
        let quarter = PI / 2.0;
        assert!((Units::Degrees.from_radians(quarter) - 90.0).abs() < 1e-12);
        assert!((Units::Kilometers.from_radians(1.0) - 6371.0088).abs() < 1e-9);
        let d = great_circle(Point::new(0.0, 0.0), Point::new(1.0, 0.0), Units::Degrees);
        assert!((d - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_interior_points_counted_exactly_once() {
        let cells = hex_grid(COLORADO, 0.2, Units::Degrees).unwrap();
        let centers: Vec<Coord<f64>> = cells
            .iter()
            .map(|c| c.centroid().unwrap().0)
            .collect();

        let total: u64 = cells.iter().map(|c| count_points(c, &centers)).sum();
        assert_eq!(total, centers.len() as u64);
        for cell in &cells {
            assert_eq!(count_points(cell, &centers), 1);
        }
    }

    #[test]
    fn test_shared_boundary_point_counted_nowhere() {
        let left = square(0.0, 0.0, 1.0);
        let right = square(1.0, 0.0, 1.0);
        let on_edge = [Coord { x: 1.0, y: 0.5 }];
        let on_vertex = [Coord { x: 1.0, y: 1.0 }];

        assert_eq!(count_points(&left, &on_edge), 0);
        assert_eq!(count_points(&right, &on_edge), 0);
        assert_eq!(count_points(&left, &on_vertex), 0);
        assert_eq!(count_points(&right, &on_vertex), 0);
        assert_eq!(count_points(&right, &[Coord { x: 1.5, y: 0.5 }]), 1);
    }

    #[test]
    fn test_hexagon_vertex_not_counted() {
        let cells = hex_grid([0.0, 0.0, 1.0, 1.0], 0.1, Units::Degrees).unwrap();
        let vertex = cells[0].exterior().0[0];
        assert_eq!(count_points(&cells[0], &[vertex]), 0);
    }

    #[test]
    fn test_shared_hexagon_vertices_counted_nowhere() {
        let cells = hex_grid(COLORADO, 0.2, Units::Degrees).unwrap();
        let vertices: Vec<Coord<f64>> = cells
            .iter()
            .flat_map(|c| c.exterior().0[..6].to_vec())
            .collect();

        // neighbouring cells really do meet at common corners
        let shared = cells[1].exterior().0[..6].iter().any(|v| {
            cells
                .iter()
                .skip(2)
                .chain(std::iter::once(&cells[0]))
                .any(|other| {
                    other.exterior().0.iter().any(|w| {
                        (w.x - v.x).abs() < 1e-9 && (w.y - v.y).abs() < 1e-9
                    })
                })
        });
        assert!(shared);

        let total: u64 = cells.iter().map(|c| count_points(c, &vertices)).sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn test_annotation_merges_properties() {
        let mut features = cells_to_features(&[square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0)]);
        features[0].set_property("name", "west");
        let mut grid = feature_collection(features);

        let a = [Coord { x: 0.5, y: 0.5 }, Coord { x: 0.25, y: 0.75 }];
        let b = [Coord { x: 1.5, y: 0.5 }];
        annotate_cells(&mut grid, &a, &b);

        let west = &grid.features[0];
        assert_eq!(west.property("name").and_then(|v| v.as_str()), Some("west"));
        assert_eq!(west.property(COUNT_PROPERTY).and_then(|v| v.as_u64()), Some(2));
        assert_eq!(west.property(WELL_COUNT_PROPERTY).and_then(|v| v.as_u64()), Some(0));

        let east = &grid.features[1];
        assert_eq!(east.property(COUNT_PROPERTY).and_then(|v| v.as_u64()), Some(0));
        assert_eq!(east.property(WELL_COUNT_PROPERTY).and_then(|v| v.as_u64()), Some(1));

        let report = summarize(&grid);
        assert_eq!(report.occupied_cells, 2);
        assert_eq!(report.counted, 2);
        assert_eq!(report.well_counted, 1);
    }

    #[test]
    fn test_run_hexbin_writes_truncated_grid() {
        let dir = std::env::temp_dir().join(format!("spillmap-hex-{}", uuid::Uuid::new_v4()));
        let config = HexGridConfig {
            bbox: [0.0, 0.0, 1.0, 1.0],
            cell_side: 0.1,
            units: Units::Degrees,
            precision: 5,
            wells_path: dir.join("wells.json"),
            spilled_wells_path: dir.join("spilled_wells.json"),
            output_path: dir.join("grid.json"),
        };

        let cells = hex_grid(config.bbox, config.cell_side, config.units).unwrap();
        let center = cells[3].centroid().unwrap();
        let point = |c: Point<f64>| Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![c.x(), c.y()]))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        write_feature_collection(&config.wells_path, &feature_collection(vec![point(center)]))
            .unwrap();
        write_feature_collection(&config.spilled_wells_path, &feature_collection(vec![]))
            .unwrap();

        let report = run_hexbin(&config).unwrap();
        assert_eq!(report.cells, 27);
        assert_eq!(report.counted, 1);
        assert_eq!(report.well_counted, 0);

        let written = read_feature_collection(&config.output_path).unwrap();
        assert_eq!(written.features.len(), 27);
        let Some(Value::Polygon(rings)) = written.features[0].geometry.as_ref().map(|g| &g.value)
        else {
            panic!("expected polygon");
        };
        for position in &rings[0] {
            for v in position {
                assert_eq!((v * 1e5).round() / 1e5, *v);
            }
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
