use geojson::FeatureCollection;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::widget::{Control, ControlPosition, FitPadding, LayerId, MapWidget};
use crate::config::{MapConfig, OverlayConfig, SpillmapConfig};
use crate::overlay::{ElevationOverlay, OverlayError, build_overlay};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("a map is already attached to this session")]
    MapAlreadyInitialized,
    #[error("the overlay has been drawn, data can no longer be replaced")]
    OverlayPresent,
    #[error(transparent)]
    Overlay(#[from] OverlayError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// No data yet. A map may or may not be attached.
    Uninitialized,
    /// Data is loaded, no overlay has been drawn.
    Loaded,
    /// The overlay is on the map. Terminal until unmount.
    Rendered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The overlay was built and added by this update.
    Rendered,
    Idle,
}

struct AttachedMap<W> {
    widget: W,
    tile_layer: LayerId,
}

struct DrawnOverlay {
    overlay: ElevationOverlay,
    layer: LayerId,
}

/// Owns the map widget, the loaded elevation data and at most one overlay.
///
/// Data loading and map initialization may happen in either order; the
/// overlay is drawn by the first [`on_update`](Self::on_update) that finds
/// both in place.
pub struct MapSession<W: MapWidget> {
    map_config: MapConfig,
    overlay_config: OverlayConfig,
    state: ViewState,
    map: Option<AttachedMap<W>>,
    data: Option<FeatureCollection>,
    overlay: Option<DrawnOverlay>,
}

impl<W: MapWidget> MapSession<W> {
    pub fn new(config: &SpillmapConfig) -> Self {
        Self {
            map_config: config.map.clone(),
            overlay_config: config.overlay.clone(),
            state: ViewState::Uninitialized,
            map: None,
            data: None,
            overlay: None,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn is_map_ready(&self) -> bool {
        self.map.is_some()
    }

    pub fn widget(&self) -> Option<&W> {
        self.map.as_ref().map(|m| &m.widget)
    }

    pub fn tile_layer(&self) -> Option<LayerId> {
        self.map.as_ref().map(|m| m.tile_layer)
    }

    pub fn data(&self) -> Option<&FeatureCollection> {
        self.data.as_ref()
    }

    pub fn overlay(&self) -> Option<&ElevationOverlay> {
        self.overlay.as_ref().map(|d| &d.overlay)
    }

    pub fn overlay_layer(&self) -> Option<LayerId> {
        self.overlay.as_ref().map(|d| d.layer)
    }

    pub fn load_data(&mut self, fc: FeatureCollection) -> Result<(), SessionError> {
        if self.state == ViewState::Rendered {
            return Err(SessionError::OverlayPresent);
        }
        info!("Loaded {} elevation features", fc.features.len());
        self.data = Some(fc);
        self.state = ViewState::Loaded;
        Ok(())
    }

    pub fn init_map(&mut self, mut widget: W) -> Result<(), SessionError> {
        if self.map.is_some() {
            return Err(SessionError::MapAlreadyInitialized);
        }

        let tile_layer = widget.add_tile_layer(&self.map_config.tile_layer);
        widget.add_zoom_control(ControlPosition::BottomLeft);
        widget.add_control(Control {
            anchor: self.map_config.title_anchor.clone(),
            position: ControlPosition::TopLeft,
            html: format!(
                "<h1>{}</h1>",
                html_escape::encode_text(&self.map_config.title)
            ),
        });
        widget.add_control(Control {
            anchor: self.map_config.legend_anchor.clone(),
            position: ControlPosition::BottomRight,
            html: String::new(),
        });

        debug!("Map initialized at {:?}", self.map_config.center);
        self.map = Some(AttachedMap { widget, tile_layer });
        Ok(())
    }

    /// Loads data and attaches the map.
    pub fn mount(&mut self, widget: W, fc: FeatureCollection) -> Result<(), SessionError> {
        self.load_data(fc)?;
        self.init_map(widget)
    }

    pub fn on_update(&mut self) -> Result<UpdateOutcome, SessionError> {
        if self.state != ViewState::Loaded || self.overlay.is_some() {
            return Ok(UpdateOutcome::Idle);
        }
        let (Some(map), Some(data)) = (self.map.as_mut(), self.data.as_ref()) else {
            return Ok(UpdateOutcome::Idle);
        };

        let overlay = build_overlay(data, &self.overlay_config)?;

        let layer = map.widget.add_overlay(&overlay);
        map.widget
            .set_control_content(&self.map_config.legend_anchor, overlay.legend.render_html());

        match overlay.bounds {
            Some(bounds) => map.widget.fit_bounds(
                bounds,
                FitPadding {
                    top_left: self.overlay_config.padding_top_left,
                    bottom_right: self.overlay_config.padding_bottom_right,
                },
            ),
            None => warn!("Overlay has no isolines, keeping the initial view"),
        }

        self.overlay = Some(DrawnOverlay { overlay, layer });
        self.state = ViewState::Rendered;
        info!("Elevation overlay rendered");
        Ok(UpdateOutcome::Rendered)
    }

    pub fn handle_click(&self, lat: f64, lng: f64) -> String {
        let message = format!("Lat, Lon : {}, {}", lat, lng);
        info!("{}", message);
        message
    }

    /// Tears the widget down and hands it back, if one was attached.
    pub fn unmount(self) -> Option<W> {
        self.map.map(|mut m| {
            m.widget.remove();
            m.widget
        })
    }
}
