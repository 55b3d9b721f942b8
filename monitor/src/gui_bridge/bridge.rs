use crate::gui_bridge::model::{MapSnapshot, MarkerView, StatusView};
use anyhow::Context;
use log::info;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tmscore::model::{MarkerId, Station, ViewportUpdate};
use tmscore::render::{MarkerStyle, RenderSync};
use tmscore::telemetry::{ConnectionStatus, SyncMetrics};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use warp::{http::StatusCode, Filter};

pub type SharedSnapshot = Arc<RwLock<MapSnapshot>>;

fn read(snapshot: &SharedSnapshot) -> RwLockReadGuard<'_, MapSnapshot> {
    snapshot.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write(snapshot: &SharedSnapshot) -> RwLockWriteGuard<'_, MapSnapshot> {
    snapshot.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Renderer that keeps the served marker snapshot in step with the session.
pub struct BridgeRenderer {
    snapshot: SharedSnapshot,
    next: u64,
}

impl RenderSync for BridgeRenderer {
    fn clear(&mut self) {
        write(&self.snapshot).markers.clear();
    }

    fn draw(&mut self, station: &Station, style: &MarkerStyle) -> MarkerId {
        self.next += 1;
        let marker = MarkerId(self.next);
        write(&self.snapshot)
            .markers
            .insert(marker, MarkerView::new(station, style));
        marker
    }

    fn redraw(&mut self, marker: MarkerId, station: &Station, style: &MarkerStyle) {
        let mut guard = write(&self.snapshot);
        guard.markers.insert(marker, MarkerView::new(station, style));
        guard.redraws += 1;
    }
}

/// HTTP face of the session for the map page: markers, status, and viewport moves.
pub struct MapBridge {
    snapshot: SharedSnapshot,
    status: watch::Receiver<ConnectionStatus>,
    metrics: Arc<SyncMetrics>,
    viewport: mpsc::Sender<ViewportUpdate>,
}

impl MapBridge {
    pub fn new(
        status: watch::Receiver<ConnectionStatus>,
        metrics: Arc<SyncMetrics>,
        viewport: mpsc::Sender<ViewportUpdate>,
    ) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(MapSnapshot::default())),
            status,
            metrics,
            viewport,
        }
    }

    pub fn renderer(&self) -> BridgeRenderer {
        BridgeRenderer {
            snapshot: self.snapshot.clone(),
            next: 0,
        }
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let markers_state = self.snapshot.clone();
        let stations_route = warp::path("stations")
            .and(warp::path::end())
            .and(warp::get())
            .map(move || warp::reply::json(&read(&markers_state).markers()));

        let status_state = self.snapshot.clone();
        let status_rx = self.status.clone();
        let metrics = self.metrics.clone();
        let status_route = warp::path("status")
            .and(warp::path::end())
            .and(warp::get())
            .map(move || {
                let view = StatusView {
                    connection: *status_rx.borrow(),
                    metrics: metrics.snapshot(),
                    markers: read(&status_state).markers.len(),
                };
                warp::reply::json(&view)
            });

        let viewport_tx = self.viewport.clone();
        let viewport_filter = warp::any().map(move || viewport_tx.clone());
        let viewport_route = warp::path("viewport")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(viewport_filter)
            .and_then(
                |update: ViewportUpdate, viewport: mpsc::Sender<ViewportUpdate>| async move {
                    let reply = match viewport.send(update).await {
                        Ok(()) => warp::reply::with_status(
                            warp::reply::json(&json!({"status": "accepted"})),
                            StatusCode::ACCEPTED,
                        ),
                        Err(_) => warp::reply::with_status(
                            warp::reply::json(&json!({"status": "session closed"})),
                            StatusCode::SERVICE_UNAVAILABLE,
                        ),
                    };
                    Ok::<_, warp::Rejection>(reply)
                },
            );

        stations_route.or(status_route).or(viewport_route)
    }

    /// Binds and serves until `shutdown` fires.
    pub fn serve(
        &self,
        addr: SocketAddr,
        shutdown: CancellationToken,
    ) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(addr, async move { shutdown.cancelled().await })
            .with_context(|| format!("binding map bridge on {}", addr))?;
        info!("map bridge listening on http://{}", bound);
        Ok((bound, tokio::spawn(server)))
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> MapSnapshot {
        read(&self.snapshot).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmscore::model::{BoundingBox, Coordinates, StationId};
    use tmscore::render::Rgb;
    use tmscore::telemetry::ConnectionState;

    fn bridge(viewport: mpsc::Sender<ViewportUpdate>) -> MapBridge {
        let (_status_tx, status_rx) = watch::channel(ConnectionStatus {
            state: ConnectionState::Subscribed,
            attempt: 0,
        });
        MapBridge::new(status_rx, Arc::new(SyncMetrics::new()), viewport)
    }

    fn style(label: &str) -> MarkerStyle {
        MarkerStyle {
            fill: Rgb::YELLOW,
            label: label.to_string(),
            popup: String::new(),
        }
    }

    #[test]
    fn renderer_tracks_draws_redraws_and_clears() {
        let (tx, _rx) = mpsc::channel(1);
        let bridge = bridge(tx);
        let mut renderer = bridge.renderer();
        let station = Station::new(StationId(1), "one", Coordinates::new(60.16, 24.9));

        let marker = renderer.draw(&station, &style("??"));
        renderer.redraw(marker, &station, &style("75"));
        let snapshot = bridge.snapshot();
        assert_eq!(snapshot.markers.len(), 1);
        assert_eq!(snapshot.markers[&marker].label, "75");
        assert_eq!(snapshot.markers[&marker].fill, "rgb(255,255,0)");
        assert_eq!(snapshot.redraws, 1);

        renderer.clear();
        assert!(bridge.snapshot().markers.is_empty());
    }

    #[tokio::test]
    async fn stations_route_serves_drawn_markers() {
        let (tx, _rx) = mpsc::channel(1);
        let bridge = bridge(tx);
        let mut renderer = bridge.renderer();
        renderer.draw(
            &Station::new(StationId(9), "nine", Coordinates::new(60.0, 25.0)),
            &style("??"),
        );

        let response = warp::test::request()
            .method("GET")
            .path("/stations")
            .reply(&bridge.routes())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let markers: Vec<MarkerView> = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].id, StationId(9));
    }

    #[tokio::test]
    async fn viewport_post_is_forwarded_to_the_session() {
        let (tx, mut rx) = mpsc::channel(1);
        let bridge = bridge(tx);
        let update = ViewportUpdate {
            bounds: BoundingBox::new(60.0, 61.0, 24.0, 25.0),
            center: [60.5, 24.5],
            zoom: 9.0,
        };

        let response = warp::test::request()
            .method("POST")
            .path("/viewport")
            .json(&update)
            .reply(&bridge.routes())
            .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(rx.recv().await.unwrap(), update);
    }

    #[tokio::test]
    async fn status_route_reports_connection_state() {
        let (tx, _rx) = mpsc::channel(1);
        let bridge = bridge(tx);
        let response = warp::test::request()
            .method("GET")
            .path("/status")
            .reply(&bridge.routes())
            .await;
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["connection"]["state"], "Subscribed");
        assert_eq!(body["metrics"]["applied"], 0);
    }
}
