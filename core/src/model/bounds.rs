use serde::{Deserialize, Serialize};

use crate::model::station::Coordinates;

/// Latitude/longitude box of the visible map region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_long: f64,
    pub max_long: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_long: f64, max_long: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_long,
            max_long,
        }
    }

    /// Closed-interval test on both axes; boundary points are inside.
    pub fn contains(&self, point: &Coordinates) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lon >= self.min_long
            && point.lon <= self.max_long
    }
}
