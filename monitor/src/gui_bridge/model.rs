use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tmscore::model::{MarkerId, Station, StationId};
use tmscore::render::MarkerStyle;
use tmscore::telemetry::{ConnectionStatus, MetricsSnapshot};

/// One drawn marker as served to the map page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerView {
    pub id: StationId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub speed: Option<f64>,
    pub fill: String,
    pub label: String,
    pub popup: String,
}

impl MarkerView {
    pub fn new(station: &Station, style: &MarkerStyle) -> Self {
        Self {
            id: station.id,
            name: station.name.clone(),
            lat: station.coordinates.lat,
            lon: station.coordinates.lon,
            speed: station.speed(),
            fill: style.fill.css(),
            label: style.label.clone(),
            popup: style.popup.clone(),
        }
    }
}

/// Markers currently on the map, keyed by the handle issued when drawn.
#[derive(Debug, Clone, Default)]
pub struct MapSnapshot {
    pub markers: BTreeMap<MarkerId, MarkerView>,
    pub redraws: usize,
}

impl MapSnapshot {
    pub fn markers(&self) -> Vec<MarkerView> {
        self.markers.values().cloned().collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub connection: ConnectionStatus,
    pub metrics: MetricsSnapshot,
    pub markers: usize,
}
