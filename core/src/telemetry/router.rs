use log::debug;

use crate::catalog::StationCatalog;
use crate::model::StationId;
use crate::prelude::SyncResult;
use crate::render::{MarkerStyle, RenderSync};
use crate::telemetry::message::TelemetryMessage;
use crate::viewport::VisibleSet;

/// What happened to one inbound reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Reading for another metric.
    Filtered,
    /// Station is not in the visible set; nothing changed.
    OutOfView(StationId),
    /// Speed applied and the station's marker restyled.
    Updated(StationId),
}

/// Applies watched-metric readings to stations in the current visible set.
///
/// Readings for stations outside the viewport are dropped, so a station that
/// scrolls back into view keeps its last applied speed until a fresh reading
/// arrives.
#[derive(Debug, Clone)]
pub struct TelemetryRouter {
    metric: String,
}

impl TelemetryRouter {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
        }
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn apply(
        &self,
        message: &TelemetryMessage,
        visible: &VisibleSet,
        catalog: &mut StationCatalog,
        render: &mut dyn RenderSync,
    ) -> RouteOutcome {
        if message.name != self.metric {
            return RouteOutcome::Filtered;
        }

        let id = message.road_station_id;
        let slot = match catalog.slot(id) {
            Some(slot) if visible.contains(id) => slot,
            _ => return RouteOutcome::OutOfView(id),
        };

        let station = catalog.at_mut(slot);
        station.speed = Some(message.sensor_value);
        let style = MarkerStyle::for_station(station);
        match station.marker {
            Some(marker) => render.redraw(marker, station, &style),
            None => {
                let marker = render.draw(station, &style);
                station.marker = Some(marker);
            }
        }
        debug!("station {} speed {}", id, message.sensor_value);
        RouteOutcome::Updated(id)
    }

    /// Parses a raw payload and applies it. Other metrics are filtered before
    /// their fields are validated.
    pub fn route(
        &self,
        payload: &[u8],
        visible: &VisibleSet,
        catalog: &mut StationCatalog,
        render: &mut dyn RenderSync,
    ) -> SyncResult<RouteOutcome> {
        match TelemetryMessage::parse_metric(payload, &self.metric)? {
            Some(message) => Ok(self.apply(&message, visible, catalog, render)),
            None => Ok(RouteOutcome::Filtered),
        }
    }
}
