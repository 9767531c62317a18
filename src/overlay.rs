//! Styled elevation overlay: isolines colored by break, per-line tooltips and
//! the legend that goes with them.

use geo::{Coord, Rect};
use geojson::{FeatureCollection, Value};
use serde::Serialize;
use std::fmt::Write;
use thiserror::Error;
use tracing::{debug, info};

use crate::breaks::{BreakError, BreakSet, compute_breaks, elevation_values};
use crate::color::ColorScale;
use crate::config::OverlayConfig;
use crate::isolines::{IsolineError, PointGrid, isolines};

pub const FEET_PER_METER: f64 = 3.28084;

pub const COLOR_PROPERTY: &str = "color";
pub const WEIGHT_PROPERTY: &str = "weight";
pub const TOOLTIP_PROPERTY: &str = "tooltip";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverlayError {
    #[error("cannot classify elevations: {0}")]
    Breaks(#[from] BreakError),
    #[error("cannot contour elevations: {0}")]
    Isolines(#[from] IsolineError),
}

/// Meters to feet, rounded to the nearest 10 ft with halves rounding up.
pub fn meters_to_feet(meters: f64) -> i64 {
    ((meters * FEET_PER_METER / 10.0 + 0.5).floor() * 10.0) as i64
}

pub fn feet_label(meters: f64) -> String {
    format!("{} Ft", meters_to_feet(meters))
}

pub fn tooltip_text(meters: f64) -> String {
    format!("Elevation: {}", feet_label(meters))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub color: String,
    pub label: String,
}

/// One swatch per break, lowest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn new(breaks: &BreakSet, scale: &ColorScale) -> Self {
        let entries = breaks
            .iter()
            .map(|value| LegendEntry {
                color: scale.hex(value),
                label: feet_label(value),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render_html(&self) -> String {
        let mut html = String::from("<ul class=\"legend\">");
        for entry in &self.entries {
            let _ = write!(
                html,
                "<li><span class=\"swatch\" style=\"background:{}\"></span>{}</li>",
                html_escape::encode_double_quoted_attribute(&entry.color),
                html_escape::encode_text(&entry.label),
            );
        }
        html.push_str("</ul>");
        html
    }
}

/// Leaflet-ordered bounds: `[[south, west], [north, east]]`.
pub fn leaflet_bounds(rect: &Rect<f64>) -> [[f64; 2]; 2] {
    [
        [rect.min().y, rect.min().x],
        [rect.max().y, rect.max().x],
    ]
}

#[derive(Debug, Clone)]
pub struct ElevationOverlay {
    pub breaks: BreakSet,
    pub isolines: FeatureCollection,
    pub legend: Legend,
    /// Extent of the drawn isolines, `None` when nothing was drawn.
    pub bounds: Option<Rect<f64>>,
}

pub fn build_overlay(
    fc: &FeatureCollection,
    config: &OverlayConfig,
) -> Result<ElevationOverlay, OverlayError> {
    let values = elevation_values(fc, &config.elevation_property);
    let breaks = compute_breaks(&values, config.break_count, config.break_mode)?;
    let scale = ColorScale::new(config.palette, &breaks);

    let grid = PointGrid::from_collection(fc, &config.elevation_property)?;
    let mut lines = isolines(&grid, &breaks, &config.elevation_property);

    for feature in &mut lines.features {
        let Some(level) = feature
            .property(&config.elevation_property)
            .and_then(|v| v.as_f64())
        else {
            continue;
        };
        feature.set_property(COLOR_PROPERTY, scale.hex(level));
        feature.set_property(WEIGHT_PROPERTY, config.line_weight);
        feature.set_property(TOOLTIP_PROPERTY, tooltip_text(level));
    }

    let bounds = collection_bounds(&lines);
    let legend = Legend::new(&breaks, &scale);

    info!(
        "Built overlay from {} samples: {} breaks, {} isoline levels",
        values.len(),
        breaks.len(),
        lines.features.len()
    );
    debug!("Breaks: {:?}", breaks.values());

    Ok(ElevationOverlay {
        breaks,
        isolines: lines,
        legend,
        bounds,
    })
}

fn collection_bounds(fc: &FeatureCollection) -> Option<Rect<f64>> {
    let mut corners: Option<(Coord<f64>, Coord<f64>)> = None;

    let mut extend = |position: &Vec<f64>| {
        if position.len() < 2 {
            return;
        }
        let c = Coord {
            x: position[0],
            y: position[1],
        };
        corners = Some(match corners {
            None => (c, c),
            Some((lo, hi)) => (
                Coord {
                    x: lo.x.min(c.x),
                    y: lo.y.min(c.y),
                },
                Coord {
                    x: hi.x.max(c.x),
                    y: hi.y.max(c.y),
                },
            ),
        });
    };

    for geometry in fc.features.iter().filter_map(|f| f.geometry.as_ref()) {
        match &geometry.value {
            Value::Point(p) => extend(p),
            Value::MultiPoint(points) | Value::LineString(points) => {
                points.iter().for_each(&mut extend)
            }
            Value::MultiLineString(lines) | Value::Polygon(lines) => {
                lines.iter().flatten().for_each(&mut extend)
            }
            Value::MultiPolygon(polygons) => {
                polygons.iter().flatten().flatten().for_each(&mut extend)
            }
            Value::GeometryCollection(_) => {}
        }
    }

    corners.map(|(lo, hi)| Rect::new(lo, hi))
}
