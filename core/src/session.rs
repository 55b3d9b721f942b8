//! Coordinator that owns the catalog and visible set and feeds them to the
//! viewport index, the router and the renderer from one event loop.

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::catalog::StationCatalog;
use crate::model::{BoundingBox, ViewportUpdate};
use crate::render::{MarkerStyle, RenderSync};
use crate::store::ViewStore;
use crate::telemetry::metrics::SyncMetrics;
use crate::telemetry::router::{RouteOutcome, TelemetryRouter};
use crate::viewport::{Coalescer, ViewportIndex, VisibleSet};

pub const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_millis(1000);

/// Shared state of one session. The visible set is only ever replaced whole.
#[derive(Debug, Default)]
pub struct SyncContext {
    catalog: StationCatalog,
    visible: Arc<VisibleSet>,
}

impl SyncContext {
    pub fn new(catalog: StationCatalog) -> Self {
        Self {
            catalog,
            visible: Arc::new(VisibleSet::default()),
        }
    }

    pub fn catalog(&self) -> &StationCatalog {
        &self.catalog
    }

    pub fn visible(&self) -> Arc<VisibleSet> {
        Arc::clone(&self.visible)
    }

    fn swap_visible(&mut self, next: VisibleSet) -> Arc<VisibleSet> {
        std::mem::replace(&mut self.visible, Arc::new(next))
    }
}

pub struct Session<R> {
    context: SyncContext,
    router: TelemetryRouter,
    coalescer: Coalescer,
    pending: Option<ViewportUpdate>,
    render: R,
    store: Box<dyn ViewStore>,
    metrics: Arc<SyncMetrics>,
}

impl<R: RenderSync> Session<R> {
    pub fn new(
        catalog: StationCatalog,
        router: TelemetryRouter,
        render: R,
        store: Box<dyn ViewStore>,
    ) -> Self {
        Self {
            context: SyncContext::new(catalog),
            router,
            coalescer: Coalescer::new(DEFAULT_COALESCE_WINDOW),
            pending: None,
            render,
            store,
            metrics: Arc::new(SyncMetrics::new()),
        }
    }

    pub fn with_coalesce_window(mut self, window: Duration) -> Self {
        self.coalescer = Coalescer::new(window);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<SyncMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    pub fn render(&self) -> &R {
        &self.render
    }

    pub fn metrics(&self) -> Arc<SyncMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Initial draw for the startup viewport.
    pub fn start(&mut self, bounds: &BoundingBox) {
        self.redraw(bounds);
    }

    /// Coalesced viewport change. Returns `true` if it settled immediately.
    pub async fn viewport_moved(&mut self, update: ViewportUpdate, now: Instant) -> bool {
        if self.coalescer.trigger(now) {
            self.pending = None;
            self.settle(update).await;
            true
        } else {
            self.pending = Some(update);
            false
        }
    }

    /// Settles the latest pending viewport once the quiet window has passed.
    pub async fn poll_quiet(&mut self, now: Instant) -> bool {
        if !self.coalescer.expire(now) {
            return false;
        }
        match self.pending.take() {
            Some(update) => {
                self.settle(update).await;
                true
            }
            None => false,
        }
    }

    /// Recomputes and redraws for `update`, then persists its position.
    pub async fn settle(&mut self, update: ViewportUpdate) {
        self.redraw(&update.bounds);
        if let Err(err) = self.store.save(&update.position()).await {
            warn!("{}", err);
        }
    }

    fn redraw(&mut self, bounds: &BoundingBox) {
        let next = ViewportIndex::recompute(bounds, &self.context.catalog);
        let previous = self.context.swap_visible(next);
        let catalog = &mut self.context.catalog;

        for id in previous.ids() {
            if let Some(slot) = catalog.slot(*id) {
                catalog.at_mut(slot).marker = None;
            }
        }
        self.render.clear();

        for id in self.context.visible.ids() {
            if let Some(slot) = catalog.slot(*id) {
                let station = catalog.at_mut(slot);
                let style = MarkerStyle::for_station(station);
                let marker = self.render.draw(station, &style);
                station.marker = Some(marker);
            }
        }
        self.metrics.record_recompute();
        debug!(
            "viewport recomputed: {} of {} stations visible",
            self.context.visible.len(),
            catalog.len()
        );
    }

    /// Routes one raw telemetry payload. Malformed payloads are skipped.
    pub fn handle_payload(&mut self, payload: &[u8]) -> Option<RouteOutcome> {
        let visible = self.context.visible();
        match self
            .router
            .route(payload, &visible, &mut self.context.catalog, &mut self.render)
        {
            Ok(outcome) => {
                self.metrics.record_outcome(outcome);
                Some(outcome)
            }
            Err(err) => {
                debug!("skipping payload: {}", err);
                self.metrics.record_malformed();
                None
            }
        }
    }

    /// Event loop: viewport events, telemetry payloads and coalescer deadlines,
    /// until shutdown or until both channels close.
    pub async fn run(
        &mut self,
        mut viewport_rx: mpsc::Receiver<ViewportUpdate>,
        mut inbound_rx: mpsc::Receiver<Vec<u8>>,
        shutdown: CancellationToken,
    ) {
        let mut viewport_open = true;
        let mut inbound_open = true;

        while viewport_open || inbound_open {
            let deadline = self.coalescer.deadline();
            tokio::select! {
                _ = shutdown.cancelled() => return,
                update = viewport_rx.recv(), if viewport_open => match update {
                    Some(update) => {
                        self.viewport_moved(update, Instant::now()).await;
                    }
                    None => viewport_open = false,
                },
                payload = inbound_rx.recv(), if inbound_open => match payload {
                    Some(payload) => {
                        self.handle_payload(&payload);
                    }
                    None => inbound_open = false,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    self.poll_quiet(Instant::now()).await;
                }
            }
        }

        if let Some(update) = self.pending.take() {
            self.settle(update).await;
        }
    }
}
