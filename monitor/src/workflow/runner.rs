use crate::generator::profile::{build_catalog, SimulatedTransport};
use crate::gui_bridge::bridge::MapBridge;
use crate::sources::metadata::{FileMetadataSource, HttpMetadataSource, StaticMetadataSource};
use crate::sources::mqtt::MqttTransport;
use crate::workflow::config::MonitorConfig;
use anyhow::{anyhow, Context};
use log::{info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tmscore::model::{StationId, ViewPosition};
use tmscore::store::{FileViewStore, ViewStore};
use tmscore::telemetry::{
    ConnectionStatus, MetricsSnapshot, SyncMetrics, TelemetryClient, TelemetryRouter,
};
use tmscore::{fetch_catalog, Session, StationCatalog, SyncResult};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const INBOUND_CAPACITY: usize = 1024;
const VIEWPORT_CAPACITY: usize = 64;

pub struct RunSummary {
    pub bridge: SocketAddr,
    pub stations: usize,
    pub visible: usize,
    pub metrics: MetricsSnapshot,
}

/// Wires catalog, telemetry client, session and map bridge for one monitor run.
pub struct Runner {
    config: MonitorConfig,
    catalog_path: Option<PathBuf>,
    simulate: bool,
}

impl Runner {
    pub fn new(config: MonitorConfig, catalog_path: Option<PathBuf>, simulate: bool) -> Self {
        Self {
            config,
            catalog_path,
            simulate,
        }
    }

    async fn load_catalog(
        &self,
        position: &ViewPosition,
        shutdown: &CancellationToken,
    ) -> anyhow::Result<StationCatalog> {
        let retry = &self.config.metadata_retry;
        let catalog = if let Some(path) = &self.catalog_path {
            info!("loading station catalog from {}", path.display());
            fetch_catalog(&FileMetadataSource::new(path), retry, shutdown).await
        } else if self.simulate {
            let collection = build_catalog(&self.config.simulation, position);
            fetch_catalog(&StaticMetadataSource::new(collection), retry, shutdown).await
        } else {
            info!("fetching station catalog from {}", self.config.metadata_url);
            let source = HttpMetadataSource::new(self.config.metadata_url.clone());
            fetch_catalog(&source, retry, shutdown).await
        };
        catalog.context("loading station catalog")
    }

    fn spawn_client(
        &self,
        ids: Vec<StationId>,
        inbound: mpsc::Sender<Vec<u8>>,
        shutdown: CancellationToken,
    ) -> (watch::Receiver<ConnectionStatus>, JoinHandle<SyncResult<()>>) {
        let topic = self.config.broker.topic.clone();
        let policy = self.config.reconnect.clone();
        if self.simulate {
            let transport = SimulatedTransport::new(
                self.config.simulation.clone(),
                self.config.metric.clone(),
                ids,
            );
            let client = TelemetryClient::new(transport, topic, policy, inbound);
            (client.status(), tokio::spawn(client.run(shutdown)))
        } else {
            info!("streaming telemetry from {}", self.config.broker.url());
            let transport = MqttTransport::new(self.config.broker.clone());
            let client = TelemetryClient::new(transport, topic, policy, inbound);
            (client.status(), tokio::spawn(client.run(shutdown)))
        }
    }

    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<RunSummary> {
        let store = FileViewStore::new(self.config.view_store.clone());
        let position = store.load_or_default().await;
        let catalog = self.load_catalog(&position, &shutdown).await?;
        if catalog.is_empty() {
            warn!("station catalog is empty; the map will stay blank");
        }
        let ids: Vec<StationId> = catalog.iter().map(|station| station.id).collect();

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (viewport_tx, viewport_rx) = mpsc::channel(VIEWPORT_CAPACITY);
        let (status, mut client_task) = self.spawn_client(ids, inbound_tx, shutdown.clone());

        let metrics = Arc::new(SyncMetrics::new());
        let bridge = MapBridge::new(status, Arc::clone(&metrics), viewport_tx);
        let (bound, server) = match bridge.serve(self.config.bind, shutdown.clone()) {
            Ok(served) => served,
            Err(err) => {
                shutdown.cancel();
                return Err(err);
            }
        };

        let mut session = Session::new(
            catalog,
            TelemetryRouter::new(self.config.metric.clone()),
            bridge.renderer(),
            Box::new(store),
        )
        .with_coalesce_window(self.config.coalesce_window())
        .with_metrics(Arc::clone(&metrics));
        session.start(&position.bounds(self.config.viewport));

        let finished = tokio::select! {
            _ = session.run(viewport_rx, inbound_rx, shutdown.clone()) => None,
            joined = &mut client_task => Some(joined),
        };
        shutdown.cancel();
        let joined = match finished {
            Some(joined) => joined,
            None => client_task.await,
        };
        if let Err(err) = server.await {
            warn!("map bridge task ended abnormally: {}", err);
        }

        joined
            .map_err(|err| anyhow!("telemetry client task failed: {}", err))?
            .context("telemetry client stopped")?;

        let summary = RunSummary {
            bridge: bound,
            stations: session.context().catalog().len(),
            visible: session.context().visible().len(),
            metrics: metrics.snapshot(),
        };
        info!(
            "session ended: {} applied, {} filtered, {} out of view, {} malformed",
            summary.metrics.applied,
            summary.metrics.filtered,
            summary.metrics.out_of_view,
            summary.metrics.malformed
        );
        Ok(summary)
    }
}
