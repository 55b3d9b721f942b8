use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::StationId;
use crate::prelude::{SyncError, SyncResult};

/// Metric whose readings drive the displayed speed.
pub const DEFAULT_METRIC: &str = "KESKINOPEUS_5MIN_LIUKUVA_SUUNTA1";

/// One sensor reading for one station, as published on the station topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryMessage {
    pub name: String,
    pub road_station_id: StationId,
    pub sensor_value: f64,
}

impl TelemetryMessage {
    pub fn new(name: impl Into<String>, road_station_id: StationId, sensor_value: f64) -> Self {
        Self {
            name: name.into(),
            road_station_id,
            sensor_value,
        }
    }

    /// Decodes a JSON payload; extra fields are ignored, missing ones are an error.
    pub fn parse(payload: &[u8]) -> SyncResult<Self> {
        serde_json::from_slice(payload).map_err(malformed)
    }

    /// Decodes a payload only when it carries `metric`. Readings for other
    /// metrics yield `None` whatever the state of their remaining fields.
    pub fn parse_metric(payload: &[u8], metric: &str) -> SyncResult<Option<Self>> {
        let envelope: Envelope = serde_json::from_slice(payload).map_err(malformed)?;
        if envelope.name != metric {
            return Ok(None);
        }
        let road_station_id = serde_json::from_value(envelope.road_station_id)
            .map_err(|err| SyncError::MalformedMessage(format!("roadStationId: {}", err)))?;
        let sensor_value = serde_json::from_value(envelope.sensor_value)
            .map_err(|err| SyncError::MalformedMessage(format!("sensorValue: {}", err)))?;
        Ok(Some(Self {
            name: envelope.name,
            road_station_id,
            sensor_value,
        }))
    }
}

/// Name first; the other fields are only checked for the watched metric.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    name: String,
    #[serde(default)]
    road_station_id: Value,
    #[serde(default)]
    sensor_value: Value,
}

fn malformed(err: serde_json::Error) -> SyncError {
    SyncError::MalformedMessage(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_broker_payload_with_extra_fields() {
        let payload = br#"{
            "id": 5122,
            "roadStationId": 23001,
            "name": "KESKINOPEUS_5MIN_LIUKUVA_SUUNTA1",
            "oldName": "averageSpeed1",
            "sensorValue": 87.0,
            "sensorUnit": "km/h",
            "measuredTime": "2019-05-21T12:00:00Z"
        }"#;
        let message = TelemetryMessage::parse(payload).unwrap();
        assert_eq!(message, TelemetryMessage::new(DEFAULT_METRIC, StationId(23001), 87.0));
    }

    #[test]
    fn parse_rejects_missing_fields() {
        let err = TelemetryMessage::parse(br#"{"name": "X", "sensorValue": 1}"#).unwrap_err();
        assert!(matches!(err, SyncError::MalformedMessage(_)));
    }

    #[test]
    fn parse_metric_skips_other_metrics_without_checking_fields() {
        let payload =
            br#"{"name":"OHITUKSET_5MIN_LIUKUVA_SUUNTA1","roadStationId":1,"sensorValue":null}"#;
        assert_eq!(TelemetryMessage::parse_metric(payload, DEFAULT_METRIC).unwrap(), None);
        let bare = br#"{"name":"OHITUKSET_5MIN_LIUKUVA_SUUNTA1"}"#;
        assert_eq!(TelemetryMessage::parse_metric(bare, DEFAULT_METRIC).unwrap(), None);
    }

    #[test]
    fn parse_metric_checks_fields_of_the_watched_metric() {
        let payload =
            format!(r#"{{"name":"{DEFAULT_METRIC}","roadStationId":1,"sensorValue":null}}"#);
        let err = TelemetryMessage::parse_metric(payload.as_bytes(), DEFAULT_METRIC).unwrap_err();
        assert!(matches!(
            err,
            SyncError::MalformedMessage(ref reason) if reason.starts_with("sensorValue")
        ));

        let payload =
            format!(r#"{{"name":"{DEFAULT_METRIC}","roadStationId":7,"sensorValue":64.5}}"#);
        let payload = payload.as_bytes();
        assert_eq!(
            TelemetryMessage::parse_metric(payload, DEFAULT_METRIC).unwrap(),
            Some(TelemetryMessage::new(DEFAULT_METRIC, StationId(7), 64.5))
        );
    }

    #[test]
    fn parse_rejects_non_json() {
        let err = TelemetryMessage::parse(b"not json").unwrap_err();
        assert!(matches!(err, SyncError::MalformedMessage(_)));
    }
}
