use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable road-station identifier, unique within a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub u32);

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Handle to a marker owned by the renderer. Lookup only; holding one keeps nothing alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub u64);

/// A road sensor station as held by the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub coordinates: Coordinates,
    pub(crate) speed: Option<f64>,
    pub(crate) marker: Option<MarkerId>,
}

impl Station {
    pub fn new(id: StationId, name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            id,
            name: name.into(),
            coordinates,
            speed: None,
            marker: None,
        }
    }

    /// Last applied reading in km/h; `None` until one lands.
    pub fn speed(&self) -> Option<f64> {
        self.speed
    }

    pub fn marker(&self) -> Option<MarkerId> {
        self.marker
    }
}
