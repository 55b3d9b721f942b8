use async_trait::async_trait;
use log::{info, warn};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use crate::model::{FeatureCollection, Station, StationId};
use crate::prelude::{SyncError, SyncResult};
use crate::telemetry::policy::ReconnectPolicy;

/// Known stations in load order, indexed by id.
///
/// Only the speed and marker attributes change after load, and only through
/// crate-internal paths (the router and the session redraw).
#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    stations: Vec<Station>,
    index: HashMap<StationId, usize>,
}

impl StationCatalog {
    /// Builds a catalog, keeping the first station for any repeated id.
    pub fn new(stations: impl IntoIterator<Item = Station>) -> Self {
        let mut catalog = Self::default();
        for station in stations {
            if catalog.index.contains_key(&station.id) {
                warn!("duplicate station {} skipped", station.id);
                continue;
            }
            catalog.index.insert(station.id, catalog.stations.len());
            catalog.stations.push(station);
        }
        catalog
    }

    pub fn from_features(collection: &FeatureCollection) -> Self {
        let mut skipped = 0usize;
        let stations = collection
            .features
            .iter()
            .filter_map(|feature| {
                match (feature.station_id(), feature.coordinates()) {
                    (Some(id), Some(coordinates)) => {
                        Some(Station::new(id, feature.display_name(), coordinates))
                    }
                    _ => {
                        warn!("metadata feature {:?} lacks an id or coordinates", feature.id);
                        skipped += 1;
                        None
                    }
                }
            })
            .collect::<Vec<_>>();
        let catalog = Self::new(stations);
        info!(
            "catalog loaded: {} stations ({} features skipped)",
            catalog.len(),
            skipped
        );
        catalog
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter()
    }

    pub fn get(&self, id: StationId) -> Option<&Station> {
        self.slot(id).map(|slot| &self.stations[slot])
    }

    pub(crate) fn slot(&self, id: StationId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub(crate) fn at(&self, slot: usize) -> &Station {
        &self.stations[slot]
    }

    pub(crate) fn at_mut(&mut self, slot: usize) -> &mut Station {
        &mut self.stations[slot]
    }
}

/// One-shot provider of the station metadata collection.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self) -> SyncResult<FeatureCollection>;
}

/// Loads the catalog, retrying failed fetches on the given schedule.
pub async fn fetch_catalog<S: MetadataSource + ?Sized>(
    source: &S,
    policy: &ReconnectPolicy,
    shutdown: &CancellationToken,
) -> SyncResult<StationCatalog> {
    let mut failures = 0u32;
    loop {
        let err = match source.fetch().await {
            Ok(collection) => return Ok(StationCatalog::from_features(&collection)),
            Err(err) => err,
        };
        failures += 1;
        if !policy.should_retry(failures) {
            return Err(SyncError::RetriesExhausted {
                attempts: failures,
                last: err.to_string(),
            });
        }
        let delay = policy.delay(failures, &mut rand::thread_rng());
        warn!(
            "{} (attempt {}), retrying in {:.1}s",
            err,
            failures,
            delay.as_secs_f32()
        );
        tokio::select! {
            _ = shutdown.cancelled() => return Err(SyncError::Shutdown),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinates, StationFeature};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn station(id: u32, lat: f64, lon: f64) -> Station {
        Station::new(StationId(id), format!("s{id}"), Coordinates::new(lat, lon))
    }

    struct FlakySource {
        failures_left: AtomicU32,
        calls: AtomicU32,
    }

    impl FlakySource {
        fn failing(times: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(times),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl MetadataSource for FlakySource {
        async fn fetch(&self) -> SyncResult<FeatureCollection> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(SyncError::MetadataFetch("503 Service Unavailable".into()));
            }
            Ok(FeatureCollection {
                features: vec![StationFeature::point(1, "one", Coordinates::new(60.16, 24.9))],
            })
        }
    }

    #[test]
    fn catalog_keeps_first_of_duplicate_ids() {
        let catalog = StationCatalog::new(vec![
            station(1, 60.0, 24.0),
            station(2, 61.0, 25.0),
            station(1, 62.0, 26.0),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(StationId(1)).unwrap().coordinates.lat, 60.0);
    }

    #[test]
    fn from_features_skips_incomplete_features() {
        let mut broken = StationFeature::point(3, "broken", Coordinates::new(0.0, 0.0));
        broken.geometry = None;
        let collection = FeatureCollection {
            features: vec![
                StationFeature::point(1, "one", Coordinates::new(60.16, 24.9)),
                broken,
            ],
        };
        let catalog = StationCatalog::from_features(&collection);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(StationId(1)).unwrap().name, "one");
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_catalog_retries_until_success() {
        let source = FlakySource::failing(2);
        let catalog = fetch_catalog(
            &source,
            &ReconnectPolicy::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_catalog_gives_up_when_policy_is_exhausted() {
        let source = FlakySource::failing(10);
        let policy = ReconnectPolicy::Fixed {
            delay_ms: 10,
            max_attempts: Some(2),
        };
        let err = fetch_catalog(&source, &policy, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::RetriesExhausted { attempts: 2, .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_catalog_stops_on_shutdown() {
        let source = FlakySource::failing(10);
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let err = fetch_catalog(&source, &ReconnectPolicy::default(), &shutdown)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Shutdown));
    }
}
