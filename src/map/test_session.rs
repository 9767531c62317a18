use geo::Rect;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::json;

use super::*;
use crate::breaks::BreakError;
use crate::config::{SpillmapConfig, TileLayerConfig};
use crate::geo_io::feature_collection;
use crate::overlay::{ElevationOverlay, OverlayError};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    TileLayer(String),
    ZoomControl(ControlPosition),
    Control(String, ControlPosition),
    ControlContent(String),
    Overlay(usize),
    FitBounds(FitPadding),
    Remove,
}

#[derive(Debug, Default)]
struct RecordingWidget {
    calls: Vec<Call>,
}

impl RecordingWidget {
    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl MapWidget for RecordingWidget {
    fn add_tile_layer(&mut self, layer: &TileLayerConfig) -> LayerId {
        self.calls.push(Call::TileLayer(layer.uri.clone()));
        LayerId(self.calls.len())
    }

    fn add_zoom_control(&mut self, position: ControlPosition) {
        self.calls.push(Call::ZoomControl(position));
    }

    fn add_control(&mut self, control: Control) {
        self.calls.push(Call::Control(control.anchor, control.position));
    }

    fn set_control_content(&mut self, anchor: &str, _html: String) {
        self.calls.push(Call::ControlContent(anchor.to_string()));
    }

    fn add_overlay(&mut self, overlay: &ElevationOverlay) -> LayerId {
        self.calls
            .push(Call::Overlay(overlay.isolines.features.len()));
        LayerId(self.calls.len())
    }

    fn fit_bounds(&mut self, _bounds: Rect<f64>, padding: FitPadding) {
        self.calls.push(Call::FitBounds(padding));
    }

    fn remove(&mut self) {
        self.calls.push(Call::Remove);
    }
}

/// 4x4 elevation samples near Vail rising 50 m per column eastward.
pub fn elevation_ramp() -> FeatureCollection {
    let mut features = Vec::new();
    for row in 0..4 {
        for column in 0..4 {
            features.push(Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    -106.566 + column as f64 * 0.0005,
                    39.618 + row as f64 * 0.0005,
                ]))),
                id: None,
                properties: json!({ "elevation": 2450.0 + column as f64 * 50.0 })
                    .as_object()
                    .cloned(),
                foreign_members: None,
            });
        }
    }
    feature_collection(features)
}

fn session() -> MapSession<RecordingWidget> {
    MapSession::new(&SpillmapConfig::default())
}

fn is_overlay(call: &Call) -> bool {
    matches!(call, Call::Overlay(_))
}

#[test]
fn test_two_updates_add_one_overlay() {
    let mut session = session();
    session
        .mount(RecordingWidget::default(), elevation_ramp())
        .unwrap();

    assert_eq!(session.on_update(), Ok(UpdateOutcome::Rendered));
    assert_eq!(session.on_update(), Ok(UpdateOutcome::Idle));
    assert_eq!(session.state(), ViewState::Rendered);

    let widget = session.widget().unwrap();
    assert_eq!(widget.count(is_overlay), 1);
    assert_eq!(
        widget.count(|c| matches!(c, Call::FitBounds(_))),
        1
    );
}

#[test]
fn test_mount_order_is_irrelevant() {
    let mut map_first = session();
    map_first.init_map(RecordingWidget::default()).unwrap();
    assert_eq!(map_first.on_update(), Ok(UpdateOutcome::Idle));
    assert_eq!(map_first.state(), ViewState::Uninitialized);
    map_first.load_data(elevation_ramp()).unwrap();
    assert_eq!(map_first.on_update(), Ok(UpdateOutcome::Rendered));

    let mut data_first = session();
    data_first.load_data(elevation_ramp()).unwrap();
    assert_eq!(data_first.on_update(), Ok(UpdateOutcome::Idle));
    assert_eq!(data_first.state(), ViewState::Loaded);
    assert!(!data_first.is_map_ready());
    data_first.init_map(RecordingWidget::default()).unwrap();
    assert_eq!(data_first.on_update(), Ok(UpdateOutcome::Rendered));

    assert_eq!(
        map_first.widget().unwrap().calls,
        data_first.widget().unwrap().calls
    );
}

#[test]
fn test_init_map_sets_up_controls() {
    let mut session = session();
    session.init_map(RecordingWidget::default()).unwrap();

    let widget = session.widget().unwrap();
    assert_eq!(
        widget.calls,
        vec![
            Call::TileLayer(TileLayerConfig::default().uri),
            Call::ZoomControl(ControlPosition::BottomLeft),
            Call::Control("title".to_string(), ControlPosition::TopLeft),
            Call::Control("legend".to_string(), ControlPosition::BottomRight),
        ]
    );
    assert_eq!(session.tile_layer(), Some(LayerId(1)));
}

#[test]
fn test_second_init_is_rejected() {
    let mut session = session();
    session.init_map(RecordingWidget::default()).unwrap();
    let before = session.widget().unwrap().calls.clone();

    assert_eq!(
        session.init_map(RecordingWidget::default()),
        Err(SessionError::MapAlreadyInitialized)
    );
    assert_eq!(session.widget().unwrap().calls, before);
}

#[test]
fn test_data_is_frozen_once_rendered() {
    let mut session = session();
    session.load_data(feature_collection(vec![])).unwrap();
    // replacing data before the overlay exists is fine
    session.load_data(elevation_ramp()).unwrap();
    session.init_map(RecordingWidget::default()).unwrap();
    session.on_update().unwrap();

    assert_eq!(
        session.load_data(elevation_ramp()),
        Err(SessionError::OverlayPresent)
    );
    assert_eq!(session.data().map(|fc| fc.features.len()), Some(16));
}

#[test]
fn test_legend_follows_overlay() {
    let mut session = session();
    session
        .mount(RecordingWidget::default(), elevation_ramp())
        .unwrap();
    session.on_update().unwrap();

    let calls = &session.widget().unwrap().calls;
    let overlay_at = calls.iter().position(is_overlay).unwrap();
    assert_eq!(
        calls[overlay_at + 1],
        Call::ControlContent("legend".to_string())
    );

    let overlay = session.overlay().unwrap();
    assert_eq!(overlay.legend.len(), overlay.breaks.len());
    assert_eq!(overlay.breaks.len(), 9);
    assert!(session.overlay_layer().is_some());
}

#[test]
fn test_failed_overlay_keeps_session_loaded() {
    let mut session = session();
    session
        .mount(RecordingWidget::default(), feature_collection(vec![]))
        .unwrap();

    assert_eq!(
        session.on_update(),
        Err(SessionError::Overlay(OverlayError::Breaks(BreakError::Empty)))
    );
    assert_eq!(session.state(), ViewState::Loaded);
    assert_eq!(session.widget().unwrap().count(is_overlay), 0);
}

#[test]
fn test_unmount_tears_down_widget() {
    let mut session = session();
    session
        .mount(RecordingWidget::default(), elevation_ramp())
        .unwrap();
    session.on_update().unwrap();

    let widget = session.unmount().unwrap();
    assert_eq!(widget.calls.last(), Some(&Call::Remove));
    assert_eq!(widget.count(|c| *c == Call::Remove), 1);
}

#[test]
fn test_unmount_without_map() {
    let session = session();
    assert!(session.unmount().is_none());
}

#[test]
fn test_click_is_logged() {
    let session = session();
    assert_eq!(
        session.handle_click(39.6189, -106.5648),
        "Lat, Lon : 39.6189, -106.5648"
    );
}
