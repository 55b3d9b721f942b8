use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::station::{Coordinates, StationId};

/// GeoJSON feature collection returned by the station metadata endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<StationFeature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationFeature {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: FeatureProperties,
}

/// Point geometry; coordinates are `[longitude, latitude, altitude?]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureProperties {
    #[serde(default)]
    pub road_station_id: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

impl StationFeature {
    pub fn point(id: u32, name: &str, coordinates: Coordinates) -> Self {
        let mut names = BTreeMap::new();
        names.insert("en".to_string(), name.to_string());
        Self {
            id: Some(id),
            geometry: Some(Geometry {
                coordinates: vec![coordinates.lon, coordinates.lat],
            }),
            properties: FeatureProperties {
                road_station_id: Some(id),
                name: Some(name.to_string()),
                names,
            },
        }
    }

    /// Telemetry is keyed by `roadStationId`; the feature id is only a fallback.
    pub fn station_id(&self) -> Option<StationId> {
        self.properties.road_station_id.or(self.id).map(StationId)
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match self.geometry.as_ref()?.coordinates.as_slice() {
            [lon, lat, ..] => Some(Coordinates::new(*lat, *lon)),
            _ => None,
        }
    }

    pub fn display_name(&self) -> String {
        self.properties
            .names
            .get("en")
            .or(self.properties.name.as_ref())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "id": 23001,
            "geometry": { "type": "Point", "coordinates": [24.9, 60.16, 0.0] },
            "properties": {
                "id": 23001,
                "roadStationId": 23001,
                "name": "vt1_Espoo_Tuomarila",
                "names": { "fi": "Tie 1 Espoo", "en": "Road 1 Espoo" }
            }
        }]
    }"#;

    #[test]
    fn feature_parses_metadata_shape() {
        let collection: FeatureCollection = serde_json::from_str(SAMPLE).unwrap();
        let feature = &collection.features[0];
        assert_eq!(feature.station_id(), Some(StationId(23001)));
        assert_eq!(feature.coordinates(), Some(Coordinates::new(60.16, 24.9)));
        assert_eq!(feature.display_name(), "Road 1 Espoo");
    }

    #[test]
    fn feature_falls_back_to_plain_name_and_feature_id() {
        let feature: StationFeature = serde_json::from_str(
            r#"{"id": 5,
                "geometry": {"coordinates": [25.0, 61.0]},
                "properties": {"name": "plain"}}"#,
        )
        .unwrap();
        assert_eq!(feature.station_id(), Some(StationId(5)));
        assert_eq!(feature.display_name(), "plain");
    }

    #[test]
    fn feature_without_two_coordinates_has_no_position() {
        let feature: StationFeature =
            serde_json::from_str(r#"{"id": 5, "geometry": {"coordinates": [25.0]}}"#).unwrap();
        assert_eq!(feature.coordinates(), None);
    }
}
