//! Contract with the map surface that draws station markers.

pub mod color;

use serde::{Deserialize, Serialize};

use crate::model::{MarkerId, Station};
pub use color::{color_gradient, speed_color, speed_fraction, Rgb};

/// Visual state of one station marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub fill: Rgb,
    pub label: String,
    pub popup: String,
}

impl MarkerStyle {
    pub fn for_station(station: &Station) -> Self {
        let speed = station.speed();
        let label = match speed {
            Some(value) => format_speed(value),
            None => "??".to_string(),
        };
        let popup = format!(
            "Address: {} / Avg speed: {} km/h",
            station.name,
            format_speed(speed.unwrap_or(0.0))
        );
        Self {
            fill: speed_color(speed),
            label,
            popup,
        }
    }
}

fn format_speed(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

/// Draws station markers. The core decides when these run; implementors decide how.
pub trait RenderSync {
    /// Discards every marker currently drawn.
    fn clear(&mut self);
    /// Draws a new marker and returns its handle.
    fn draw(&mut self, station: &Station, style: &MarkerStyle) -> MarkerId;
    /// Restyles one existing marker in place.
    fn redraw(&mut self, marker: MarkerId, station: &Station, style: &MarkerStyle);
}
