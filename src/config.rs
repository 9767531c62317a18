use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::breaks::BreakMode;
use crate::color::Palette;
use crate::error::{Result, SpillmapError, io_err};
use crate::hexgrid::Units;

/// Top level configuration. Every section falls back to the values the demo
/// was built around, so an empty RON file `()` is a valid config.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SpillmapConfig {
    pub map: MapConfig,
    pub overlay: OverlayConfig,
    pub hexgrid: HexGridConfig,
    pub join: JoinConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    /// (lat, lng)
    pub center: [f64; 2],
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub scroll_wheel_zoom: bool,
    /// Leaflet's built-in top-left zoom control. A bottom-left one is added
    /// separately by the session.
    pub zoom_control: bool,
    pub attribution_control: bool,
    pub title: String,
    pub title_anchor: String,
    pub legend_anchor: String,
    pub tile_layer: TileLayerConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [39.618963197219145, -106.5648937225342],
            zoom: 17,
            min_zoom: 11,
            max_zoom: 22,
            scroll_wheel_zoom: false,
            zoom_control: false,
            attribution_control: true,
            title: "Elevation Isolines".to_string(),
            title_anchor: "title".to_string(),
            legend_anchor: "legend".to_string(),
            tile_layer: TileLayerConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct TileLayerConfig {
    pub uri: String,
    pub min_zoom: u8,
    pub attribution: String,
}

impl Default for TileLayerConfig {
    fn default() -> Self {
        Self {
            uri: "http://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png".to_string(),
            min_zoom: 11,
            attribution: "&copy; <a href=\"http://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors, &copy; <a href=\"http://cartodb.com/attributions\">CartoDB</a>".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct OverlayConfig {
    pub elevation_property: String,
    pub break_count: usize,
    pub break_mode: BreakMode,
    pub palette: Palette,
    pub line_weight: u32,
    /// fitBounds padding in pixels, (x, y)
    pub padding_top_left: [u32; 2],
    pub padding_bottom_right: [u32; 2],
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            elevation_property: "elevation".to_string(),
            break_count: 9,
            break_mode: BreakMode::EqualInterval,
            palette: Palette::OrRd,
            line_weight: 3,
            padding_top_left: [200, 10],
            padding_bottom_right: [10, 10],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct HexGridConfig {
    /// [west, south, east, north] in WGS84 degrees
    pub bbox: [f64; 4],
    pub cell_side: f64,
    pub units: Units,
    /// Decimal digits kept in the written grid
    pub precision: u32,
    pub wells_path: PathBuf,
    pub spilled_wells_path: PathBuf,
    pub output_path: PathBuf,
}

impl Default for HexGridConfig {
    fn default() -> Self {
        Self {
            // Colorado
            bbox: [-109.060253, 36.992426, -102.041524, 41.003444],
            cell_side: 0.2,
            units: Units::Degrees,
            precision: 5,
            wells_path: PathBuf::from("data/wells.json"),
            spilled_wells_path: PathBuf::from("data/spilled_wells.json"),
            output_path: PathBuf::from("data/us-hexgrid-spilled-oil-well.json"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct JoinConfig {
    pub csv_path: PathBuf,
    pub wells_path: PathBuf,
    pub output_path: PathBuf,
    pub csv_delimiter: char,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("project-files/Spills.csv"),
            wells_path: PathBuf::from("data/wells.json"),
            output_path: PathBuf::from("data/spilled_wells.json"),
            csv_delimiter: ',',
        }
    }
}

/// Loads a RON config file, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<SpillmapConfig> {
    let Some(path) = path else {
        return Ok(SpillmapConfig::default());
    };

    let raw = fs::read_to_string(path).map_err(|e| io_err!(path, e))?;
    ron::from_str(&raw).map_err(|e| SpillmapError::Config(format!("{}: {}", path.display(), e)))
}
