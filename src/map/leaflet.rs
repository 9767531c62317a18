use geo::Rect;
use geojson::FeatureCollection;
use serde::Serialize;
use std::fmt::Write;

use super::widget::{Control, ControlPosition, FitPadding, LayerId, MapWidget};
use crate::config::{MapConfig, TileLayerConfig};
use crate::overlay::{ElevationOverlay, leaflet_bounds};

const LEAFLET_VERSION: &str = "1.9.4";

/// Renders everything it is asked to draw into a standalone Leaflet page.
#[derive(Debug, Clone)]
pub struct LeafletPage {
    view: MapConfig,
    tile_layers: Vec<TileLayerConfig>,
    zoom_control: Option<ControlPosition>,
    controls: Vec<Control>,
    overlays: Vec<FeatureCollection>,
    fit: Option<(Rect<f64>, FitPadding)>,
    layers: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MapOptions {
    center: [f64; 2],
    zoom: u8,
    min_zoom: u8,
    max_zoom: u8,
    scroll_wheel_zoom: bool,
    zoom_control: bool,
    attribution_control: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TileOptions<'a> {
    min_zoom: u8,
    attribution: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FitOptions {
    padding_top_left: [u32; 2],
    padding_bottom_right: [u32; 2],
}

/// JSON safe to inline in a `<script>` element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

impl LeafletPage {
    pub fn new(view: &MapConfig) -> Self {
        Self {
            view: view.clone(),
            tile_layers: Vec::new(),
            zoom_control: None,
            controls: Vec::new(),
            overlays: Vec::new(),
            fit: None,
            layers: 0,
        }
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    fn next_layer(&mut self) -> LayerId {
        self.layers += 1;
        LayerId(self.layers)
    }

    pub fn to_html(&self) -> serde_json::Result<String> {
        let title = html_escape::encode_text(&self.view.title);

        let mut html = String::new();
        let _ = write!(
            html,
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@{v}/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@{v}/dist/leaflet.js"></script>
<style>
html, body, #map {{ height: 100%; margin: 0; }}
.legend {{ list-style: none; margin: 0; padding: 6px 10px; background: rgba(0, 0, 0, 0.7); color: #eee; }}
.legend .swatch {{ display: inline-block; width: 12px; height: 12px; margin-right: 6px; }}
</style>
</head>
<body>
<div id="map"></div>
"#,
            v = LEAFLET_VERSION,
        );

        for control in &self.controls {
            let _ = writeln!(
                html,
                r#"<div id="{}">{}</div>"#,
                html_escape::encode_double_quoted_attribute(&control.anchor),
                control.html
            );
        }

        let options = MapOptions {
            center: self.view.center,
            zoom: self.view.zoom,
            min_zoom: self.view.min_zoom,
            max_zoom: self.view.max_zoom,
            scroll_wheel_zoom: self.view.scroll_wheel_zoom,
            zoom_control: self.view.zoom_control,
            attribution_control: self.view.attribution_control,
        };
        let _ = writeln!(
            html,
            "<script>\nconst map = L.map('map', {});",
            script_json(&options)?
        );

        for layer in &self.tile_layers {
            let tile_options = TileOptions {
                min_zoom: layer.min_zoom,
                attribution: &layer.attribution,
            };
            let _ = writeln!(
                html,
                "L.tileLayer({}, {}).addTo(map);",
                script_json(&layer.uri)?,
                script_json(&tile_options)?
            );
        }

        if let Some(position) = self.zoom_control {
            let _ = writeln!(
                html,
                "L.control.zoom({{ position: '{}' }}).addTo(map);",
                position.as_str()
            );
        }

        html.push_str(
            "function anchoredControl(id, position) {\n  \
             const control = L.control({ position: position });\n  \
             control.onAdd = function () {\n    \
             const el = document.getElementById(id);\n    \
             L.DomEvent.disableClickPropagation(el);\n    \
             L.DomEvent.disableScrollPropagation(el);\n    \
             return el;\n  };\n  \
             control.addTo(map);\n}\n",
        );
        for control in &self.controls {
            let _ = writeln!(
                html,
                "anchoredControl({}, '{}');",
                script_json(&control.anchor)?,
                control.position.as_str()
            );
        }

        for overlay in &self.overlays {
            let _ = writeln!(
                html,
                "L.geoJSON({}, {{\n  \
                 style: function (f) {{ return {{ color: f.properties.color, weight: f.properties.weight }}; }},\n  \
                 onEachFeature: function (f, layer) {{ layer.bindTooltip(f.properties.tooltip); }}\n}}).addTo(map);",
                script_json(overlay)?
            );
        }

        html.push_str(
            "map.on('click', function (e) {\n  \
             console.log('Lat, Lon : ' + e.latlng.lat + ', ' + e.latlng.lng);\n});\n",
        );

        if let Some((bounds, padding)) = &self.fit {
            let fit = FitOptions {
                padding_top_left: padding.top_left,
                padding_bottom_right: padding.bottom_right,
            };
            let _ = writeln!(
                html,
                "map.fitBounds({}, {});",
                script_json(&leaflet_bounds(bounds))?,
                script_json(&fit)?
            );
        }

        html.push_str("</script>\n</body>\n</html>\n");
        Ok(html)
    }
}

impl MapWidget for LeafletPage {
    fn add_tile_layer(&mut self, layer: &TileLayerConfig) -> LayerId {
        self.tile_layers.push(layer.clone());
        self.next_layer()
    }

    fn add_zoom_control(&mut self, position: ControlPosition) {
        self.zoom_control = Some(position);
    }

    fn add_control(&mut self, control: Control) {
        self.controls.push(control);
    }

    fn set_control_content(&mut self, anchor: &str, html: String) {
        if let Some(control) = self.controls.iter_mut().find(|c| c.anchor == anchor) {
            control.html = html;
        }
    }

    fn add_overlay(&mut self, overlay: &ElevationOverlay) -> LayerId {
        self.overlays.push(overlay.isolines.clone());
        self.next_layer()
    }

    fn fit_bounds(&mut self, bounds: Rect<f64>, padding: FitPadding) {
        self.fit = Some((bounds, padding));
    }

    fn remove(&mut self) {
        self.tile_layers.clear();
        self.zoom_control = None;
        self.controls.clear();
        self.overlays.clear();
        self.fit = None;
    }
}
