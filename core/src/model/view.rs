use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::model::bounds::BoundingBox;

const TILE_SIZE_PX: f64 = 256.0;

/// Persisted map position: `{"center": [lat, lon], "zoom": z}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewPosition {
    pub center: [f64; 2],
    pub zoom: f64,
}

impl Default for ViewPosition {
    fn default() -> Self {
        Self {
            center: [60.16, 24.9],
            zoom: 10.0,
        }
    }
}

/// Pixel size of the map surface, needed to turn centre + zoom into bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self {
            width_px: 1280,
            height_px: 800,
        }
    }
}

impl ViewPosition {
    /// Web Mercator bounds of a viewport of `size` centred on this position.
    pub fn bounds(&self, size: ViewportSize) -> BoundingBox {
        let [lat, lon] = self.center;
        let scale = TILE_SIZE_PX * 2f64.powf(self.zoom);
        let half_w = f64::from(size.width_px) / 2.0;
        let half_h = f64::from(size.height_px) / 2.0;

        let lon_per_px = 360.0 / scale;
        let center_y = mercator_y(lat, scale);

        BoundingBox {
            min_lat: mercator_lat(center_y + half_h, scale),
            max_lat: mercator_lat(center_y - half_h, scale),
            min_long: lon - half_w * lon_per_px,
            max_long: lon + half_w * lon_per_px,
        }
    }
}

fn mercator_y(lat_deg: f64, scale: f64) -> f64 {
    let phi = lat_deg.to_radians();
    (1.0 - (phi.tan() + 1.0 / phi.cos()).ln() / PI) / 2.0 * scale
}

fn mercator_lat(y: f64, scale: f64) -> f64 {
    (PI * (1.0 - 2.0 * y / scale)).sinh().atan().to_degrees()
}

/// A settled viewport as reported by the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportUpdate {
    pub bounds: BoundingBox,
    pub center: [f64; 2],
    pub zoom: f64,
}

impl ViewportUpdate {
    pub fn position(&self) -> ViewPosition {
        ViewPosition {
            center: self.center,
            zoom: self.zoom,
        }
    }

    pub fn from_position(position: ViewPosition, size: ViewportSize) -> Self {
        Self {
            bounds: position.bounds(size),
            center: position.center,
            zoom: position.zoom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::station::Coordinates;

    #[test]
    fn default_position_is_helsinki() {
        let position: ViewPosition =
            serde_json::from_str(r#"{"center": [60.16, 24.9], "zoom": 10}"#).unwrap();
        assert_eq!(position, ViewPosition::default());
    }

    #[test]
    fn bounds_surround_the_centre() {
        let position = ViewPosition::default();
        let bounds = position.bounds(ViewportSize::default());
        assert!(bounds.contains(&Coordinates::new(60.16, 24.9)));
        assert!(bounds.min_lat < bounds.max_lat);
    }

    #[test]
    fn longitude_span_follows_zoom() {
        let size = ViewportSize {
            width_px: 1024,
            height_px: 512,
        };
        let wide = ViewPosition {
            center: [0.0, 0.0],
            zoom: 0.0,
        }
        .bounds(size);
        assert!((wide.max_long - wide.min_long - 1440.0).abs() < 1e-9);

        let close = ViewPosition {
            center: [0.0, 0.0],
            zoom: 10.0,
        }
        .bounds(size);
        assert!((close.max_long - close.min_long - 1.40625).abs() < 1e-9);
        assert!((close.max_lat + close.min_lat).abs() < 1e-9);
    }
}
