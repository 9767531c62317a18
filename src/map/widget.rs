use geo::Rect;
use serde::Serialize;

use crate::config::TileLayerConfig;
use crate::overlay::ElevationOverlay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ControlPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlPosition::TopLeft => "topleft",
            ControlPosition::TopRight => "topright",
            ControlPosition::BottomLeft => "bottomleft",
            ControlPosition::BottomRight => "bottomright",
        }
    }
}

/// A custom control bound to a host element by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub anchor: String,
    pub position: ControlPosition,
    /// Initial inner HTML of the anchored element.
    pub html: String,
}

/// Pixel padding kept around fitted bounds, `[x, y]` each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitPadding {
    pub top_left: [u32; 2],
    pub bottom_right: [u32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(pub usize);

/// The drawing surface a [`MapSession`](super::MapSession) drives.
///
/// Implementations only draw; every decision about when to draw lives in the
/// session.
pub trait MapWidget {
    fn add_tile_layer(&mut self, layer: &TileLayerConfig) -> LayerId;

    fn add_zoom_control(&mut self, position: ControlPosition);

    fn add_control(&mut self, control: Control);

    /// Replaces the inner HTML of a control previously added with `anchor`.
    fn set_control_content(&mut self, anchor: &str, html: String);

    fn add_overlay(&mut self, overlay: &ElevationOverlay) -> LayerId;

    fn fit_bounds(&mut self, bounds: Rect<f64>, padding: FitPadding);

    /// Tears down every layer, control and listener.
    fn remove(&mut self);
}
