use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tmscore::model::{Coordinates, FeatureCollection, StationFeature, StationId, ViewPosition};
use tmscore::telemetry::{TelemetryMessage, TelemetryTransport, TransportEvent};
use tmscore::{SyncError, SyncResult};

const OTHER_METRIC: &str = "OHITUKSET_5MIN_LIUKUVA_SUUNTA1";

/// Configuration for the synthetic station feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub seed: u64,
    pub interval_ms: u64,
    pub station_count: usize,
    pub spread_deg: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    /// Share of readings published under another metric name.
    pub other_metric_share: f64,
    /// Simulate a transport drop after this many events.
    pub drop_every: Option<u32>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            interval_ms: 250,
            station_count: 200,
            spread_deg: 0.6,
            min_speed: 20.0,
            max_speed: 130.0,
            other_metric_share: 0.3,
            drop_every: Some(500),
        }
    }
}

/// Scatters `station_count` stations around `center`.
pub fn build_catalog(config: &FeedConfig, center: &ViewPosition) -> FeatureCollection {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let [lat, lon] = center.center;
    let spread = config.spread_deg.abs().max(f64::EPSILON);
    let features = (0..config.station_count)
        .map(|index| {
            let id = 20_000 + index as u32;
            let coordinates = Coordinates::new(
                lat + rng.gen_range(-spread..spread),
                lon + rng.gen_range(-spread..spread) * 2.0,
            );
            StationFeature::point(id, &format!("Simulated station {}", id), coordinates)
        })
        .collect();
    FeatureCollection { features }
}

fn build_reading(
    config: &FeedConfig,
    metric: &str,
    ids: &[StationId],
    rng: &mut StdRng,
) -> Option<TelemetryMessage> {
    if ids.is_empty() {
        return None;
    }
    let id = ids[rng.gen_range(0..ids.len())];
    let name = if rng.gen_bool(config.other_metric_share.clamp(0.0, 1.0)) {
        OTHER_METRIC
    } else {
        metric
    };
    let (low, high) = if config.min_speed < config.max_speed {
        (config.min_speed, config.max_speed)
    } else {
        (config.max_speed, config.max_speed + 1.0)
    };
    let value = rng.gen_range(low..high).round();
    Some(TelemetryMessage::new(name, id, value))
}

/// Offline stand-in for the broker: random readings for known stations.
pub struct SimulatedTransport {
    config: FeedConfig,
    metric: String,
    ids: Vec<StationId>,
    rng: StdRng,
    connected: bool,
    events: u32,
}

impl SimulatedTransport {
    pub fn new(config: FeedConfig, metric: impl Into<String>, ids: Vec<StationId>) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            metric: metric.into(),
            ids,
            rng,
            connected: false,
            events: 0,
        }
    }
}

#[async_trait]
impl TelemetryTransport for SimulatedTransport {
    async fn connect(&mut self) -> SyncResult<()> {
        self.connected = true;
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> SyncResult<()> {
        if !self.connected {
            return Err(SyncError::Subscribe {
                topic: topic.to_string(),
                reason: "not connected".into(),
            });
        }
        Ok(())
    }

    async fn recv(&mut self) -> TransportEvent {
        if !self.connected {
            return TransportEvent::Lost("not connected".into());
        }
        tokio::time::sleep(Duration::from_millis(self.config.interval_ms)).await;
        self.events += 1;

        if let Some(every) = self.config.drop_every.filter(|n| *n > 0) {
            if self.events % every == 0 {
                self.connected = false;
                return TransportEvent::Lost("simulated drop".into());
            }
        }

        match build_reading(&self.config, &self.metric, &self.ids, &mut self.rng)
            .and_then(|message| serde_json::to_vec(&message).ok())
        {
            Some(payload) => TransportEvent::Message(payload),
            None => std::future::pending().await,
        }
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmscore::telemetry::DEFAULT_METRIC;
    use tmscore::StationCatalog;

    #[test]
    fn synthetic_catalog_is_seeded_and_complete() {
        let config = FeedConfig {
            station_count: 25,
            seed: 7,
            ..Default::default()
        };
        let first = build_catalog(&config, &ViewPosition::default());
        let second = build_catalog(&config, &ViewPosition::default());
        let catalog = StationCatalog::from_features(&first);
        assert_eq!(catalog.len(), 25);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn readings_stay_within_the_configured_range() {
        let config = FeedConfig {
            other_metric_share: 0.0,
            ..Default::default()
        };
        let ids = vec![StationId(1), StationId(2)];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let reading = build_reading(&config, DEFAULT_METRIC, &ids, &mut rng).unwrap();
            assert_eq!(reading.name, DEFAULT_METRIC);
            assert!(ids.contains(&reading.road_station_id));
            assert!(reading.sensor_value >= 20.0 && reading.sensor_value <= 130.0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn feed_drops_the_connection_on_schedule() {
        let config = FeedConfig {
            drop_every: Some(3),
            ..Default::default()
        };
        let mut transport = SimulatedTransport::new(config, DEFAULT_METRIC, vec![StationId(1)]);
        transport.connect().await.unwrap();
        transport.subscribe("tms/#").await.unwrap();

        assert!(matches!(transport.recv().await, TransportEvent::Message(_)));
        assert!(matches!(transport.recv().await, TransportEvent::Message(_)));
        assert!(matches!(transport.recv().await, TransportEvent::Lost(_)));
        assert!(transport.subscribe("tms/#").await.is_err());
    }
}
