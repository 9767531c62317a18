//! Isolines (contours) over a regular lattice of sampled points.
//!
//! Points are arranged into a grid by their distinct x and y values, marching
//! squares runs once per break, and the resulting segments are stitched into
//! polylines before being mapped back to coordinates.

use ahash::AHashMap;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use ordered_float::OrderedFloat;
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;

use crate::breaks::BreakSet;
use crate::geo_io::{feature_collection, point_coords};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IsolineError {
    #[error("feature #{0} is not a point")]
    NotAPoint(usize),
    #[error("{points} points do not form a {columns}x{rows} lattice")]
    NotAGrid {
        points: usize,
        columns: usize,
        rows: usize,
    },
    #[error("more than one point at ({0}, {1})")]
    DuplicatePoint(f64, f64),
    #[error("a grid needs at least 2 columns and 2 rows, got {columns}x{rows}")]
    TooSmall { columns: usize, rows: usize },
}

/// Sampled values on a rectangular lattice, rows ordered south to north.
#[derive(Debug, Clone)]
pub struct PointGrid {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Row-major, `ys.len()` rows of `xs.len()` values. Missing values are NaN.
    values: Vec<f64>,
}

impl PointGrid {
    pub fn from_collection(
        fc: &FeatureCollection,
        z_property: &str,
    ) -> Result<Self, IsolineError> {
        let mut samples = Vec::with_capacity(fc.features.len());
        for (idx, feature) in fc.features.iter().enumerate() {
            let coord = point_coords(feature).ok_or(IsolineError::NotAPoint(idx))?;
            let z = feature
                .property(z_property)
                .and_then(|v| v.as_f64())
                .unwrap_or(f64::NAN);
            samples.push((coord.x, coord.y, z));
        }

        let xs: BTreeSet<OrderedFloat<f64>> = samples.iter().map(|s| OrderedFloat(s.0)).collect();
        let ys: BTreeSet<OrderedFloat<f64>> = samples.iter().map(|s| OrderedFloat(s.1)).collect();
        let (columns, rows) = (xs.len(), ys.len());

        if columns < 2 || rows < 2 {
            return Err(IsolineError::TooSmall { columns, rows });
        }
        if samples.len() != columns * rows {
            return Err(IsolineError::NotAGrid {
                points: samples.len(),
                columns,
                rows,
            });
        }

        let column_of: AHashMap<OrderedFloat<f64>, usize> =
            xs.iter().enumerate().map(|(i, x)| (*x, i)).collect();
        let row_of: AHashMap<OrderedFloat<f64>, usize> =
            ys.iter().enumerate().map(|(i, y)| (*y, i)).collect();

        let mut values = vec![f64::NAN; columns * rows];
        let mut filled = vec![false; columns * rows];
        for (x, y, z) in samples {
            let slot = row_of[&OrderedFloat(y)] * columns + column_of[&OrderedFloat(x)];
            if filled[slot] {
                return Err(IsolineError::DuplicatePoint(x, y));
            }
            filled[slot] = true;
            values[slot] = z;
        }

        Ok(Self {
            xs: xs.into_iter().map(|x| x.0).collect(),
            ys: ys.into_iter().map(|y| y.0).collect(),
            values,
        })
    }

    pub fn columns(&self) -> usize {
        self.xs.len()
    }

    pub fn rows(&self) -> usize {
        self.ys.len()
    }

    fn value(&self, row: usize, column: usize) -> f64 {
        self.values[row * self.xs.len() + column]
    }

    /// Maps fractional lattice indices back to coordinates.
    fn to_position(&self, p: GridPoint) -> Vec<f64> {
        vec![interpolate_axis(&self.xs, p.x), interpolate_axis(&self.ys, p.y)]
    }
}

fn interpolate_axis(axis: &[f64], index: f64) -> f64 {
    let lower = (index.floor() as usize).min(axis.len() - 2);
    let t = index - lower as f64;
    axis[lower] + t * (axis[lower + 1] - axis[lower])
}

/// A point in lattice index space: x is the column, y is the row.
#[derive(Debug, Clone, Copy, PartialEq)]
struct GridPoint {
    x: f64,
    y: f64,
}

impl GridPoint {
    fn key(&self) -> (i64, i64) {
        ((self.x * 1e9).round() as i64, (self.y * 1e9).round() as i64)
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    start: GridPoint,
    end: GridPoint,
}

fn march_squares(grid: &PointGrid, level: f64) -> Vec<Segment> {
    let mut segments = Vec::new();

    for row in 0..grid.rows() - 1 {
        for column in 0..grid.columns() - 1 {
            let tl = grid.value(row, column);
            let tr = grid.value(row, column + 1);
            let bl = grid.value(row + 1, column);
            let br = grid.value(row + 1, column + 1);

            if tl.is_nan() || tr.is_nan() || bl.is_nan() || br.is_nan() {
                continue;
            }

            let mut case = 0u8;
            if tl >= level {
                case |= 1;
            }
            if tr >= level {
                case |= 2;
            }
            if br >= level {
                case |= 4;
            }
            if bl >= level {
                case |= 8;
            }
            if case == 0 || case == 15 {
                continue;
            }

            let (x, y) = (column as f64, row as f64);
            let top = interpolate_edge((x, y), (x + 1.0, y), tl, tr, level);
            let right = interpolate_edge((x + 1.0, y), (x + 1.0, y + 1.0), tr, br, level);
            let bottom = interpolate_edge((x, y + 1.0), (x + 1.0, y + 1.0), bl, br, level);
            let left = interpolate_edge((x, y), (x, y + 1.0), tl, bl, level);

            let mut push = |start: GridPoint, end: GridPoint| {
                if start.key() != end.key() {
                    segments.push(Segment { start, end });
                }
            };
            match case {
                1 | 14 => push(left, top),
                2 | 13 => push(top, right),
                3 | 12 => push(left, right),
                4 | 11 => push(right, bottom),
                5 => {
                    push(left, top);
                    push(right, bottom);
                }
                6 | 9 => push(top, bottom),
                7 | 8 => push(left, bottom),
                10 => {
                    push(top, right);
                    push(left, bottom);
                }
                _ => {}
            }
        }
    }

    segments
}

fn interpolate_edge(a: (f64, f64), b: (f64, f64), va: f64, vb: f64, level: f64) -> GridPoint {
    let t = if (vb - va).abs() < 1e-12 {
        0.5
    } else {
        ((level - va) / (vb - va)).clamp(0.0, 1.0)
    };
    GridPoint {
        x: a.0 + t * (b.0 - a.0),
        y: a.1 + t * (b.1 - a.1),
    }
}

/// Joins segments sharing endpoints into polylines. Closed loops repeat their
/// first point at the end.
fn stitch(segments: &[Segment]) -> Vec<Vec<GridPoint>> {
    let mut by_endpoint: AHashMap<(i64, i64), Vec<usize>> = AHashMap::new();
    for (i, s) in segments.iter().enumerate() {
        by_endpoint.entry(s.start.key()).or_default().push(i);
        by_endpoint.entry(s.end.key()).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut lines = Vec::new();

    // Takes the next unused segment touching `at` and returns its far end.
    let follow = |at: GridPoint, used: &mut [bool]| -> Option<GridPoint> {
        let candidates = by_endpoint.get(&at.key())?;
        let idx = candidates.iter().copied().find(|&i| !used[i])?;
        used[idx] = true;
        let s = segments[idx];
        Some(if s.start.key() == at.key() { s.end } else { s.start })
    };

    for i in 0..segments.len() {
        if used[i] {
            continue;
        }
        used[i] = true;

        let mut line = VecDeque::from([segments[i].start, segments[i].end]);
        let first_key = segments[i].start.key();

        while let Some(next) = line.back().copied().and_then(|at| follow(at, &mut used)) {
            line.push_back(next);
            if next.key() == first_key {
                break;
            }
        }

        let closed = line.len() > 2 && line.back().map(|p| p.key()) == Some(first_key);
        if !closed {
            while let Some(prev) = line.front().copied().and_then(|at| follow(at, &mut used)) {
                line.push_front(prev);
            }
        }

        lines.push(line.into_iter().collect());
    }

    lines
}

/// One MultiLineString feature per break that crosses the grid, with the
/// break stored under `z_property`.
pub fn isolines(grid: &PointGrid, breaks: &BreakSet, z_property: &str) -> FeatureCollection {
    let mut features = Vec::new();

    for level in breaks.iter() {
        let segments = march_squares(grid, level);
        if segments.is_empty() {
            continue;
        }

        let lines: Vec<Vec<Vec<f64>>> = stitch(&segments)
            .into_iter()
            .map(|line| line.into_iter().map(|p| grid.to_position(p)).collect())
            .collect();

        let mut properties = JsonObject::new();
        properties.insert(z_property.to_string(), level.into());

        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::MultiLineString(lines))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    feature_collection(features)
}
