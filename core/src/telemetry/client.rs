use log::{debug, error, info, warn};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::prelude::{SyncError, SyncResult};
use crate::telemetry::policy::ReconnectPolicy;
use crate::telemetry::transport::{TelemetryTransport, TransportEvent};

/// Topic filter covering every station's telemetry.
pub const DEFAULT_TOPIC: &str = "tms/#";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
    LostPendingReconnect,
}

/// Observable connection state plus consecutive failures since the last subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub attempt: u32,
}

/// Owns the streaming connection: connect, subscribe, detect loss, reconnect.
///
/// Initial connect failures, subscribe failures and transport loss all go
/// through the same retry path. Subscription does not survive a drop, so every
/// successful reconnect subscribes to the topic again before reporting
/// `Subscribed`.
pub struct TelemetryClient<T> {
    transport: T,
    topic: String,
    policy: ReconnectPolicy,
    inbound: mpsc::Sender<Vec<u8>>,
    status: watch::Sender<ConnectionStatus>,
    failures: u32,
    rng: StdRng,
}

impl<T: TelemetryTransport> TelemetryClient<T> {
    pub fn new(
        transport: T,
        topic: impl Into<String>,
        policy: ReconnectPolicy,
        inbound: mpsc::Sender<Vec<u8>>,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus {
            state: ConnectionState::Disconnected,
            attempt: 0,
        });
        Self {
            transport,
            topic: topic.into(),
            policy,
            inbound,
            status,
            failures: 0,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    fn set_state(&self, state: ConnectionState) {
        let next = ConnectionStatus {
            state,
            attempt: self.failures,
        };
        let previous = self.status.send_replace(next);
        if previous.state != state {
            info!("telemetry connection {:?} -> {:?}", previous.state, state);
        }
    }

    /// Claims the single connect slot. Refused while connecting or connected.
    pub fn begin_connect(&mut self) -> bool {
        match self.state() {
            ConnectionState::Disconnected | ConnectionState::LostPendingReconnect => {
                self.set_state(ConnectionState::Connecting);
                true
            }
            _ => false,
        }
    }

    /// Records a loss signal. Ignored unless a connection was established,
    /// so repeated signals cannot start overlapping reconnects.
    pub fn mark_lost(&mut self, reason: &str) -> bool {
        match self.state() {
            ConnectionState::Connected | ConnectionState::Subscribed => {
                warn!("telemetry connection lost: {}", reason);
                self.set_state(ConnectionState::LostPendingReconnect);
                true
            }
            state => {
                debug!("loss signal ignored in state {:?}", state);
                false
            }
        }
    }

    async fn establish(&mut self) -> SyncResult<()> {
        self.transport.connect().await?;
        self.set_state(ConnectionState::Connected);
        self.transport.subscribe(&self.topic).await?;
        self.failures = 0;
        self.set_state(ConnectionState::Subscribed);
        Ok(())
    }

    async fn retry_after(&mut self, reason: &str, shutdown: &CancellationToken) -> SyncResult<()> {
        self.failures += 1;
        self.set_state(ConnectionState::LostPendingReconnect);
        if !self.policy.should_retry(self.failures) {
            return Err(SyncError::RetriesExhausted {
                attempts: self.failures,
                last: reason.to_string(),
            });
        }
        let delay = self.policy.delay(self.failures, &mut self.rng);
        warn!(
            "reconnecting in {:.1}s (attempt {}): {}",
            delay.as_secs_f32(),
            self.failures,
            reason
        );
        tokio::select! {
            _ = shutdown.cancelled() => Err(SyncError::Shutdown),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    async fn drive(&mut self, shutdown: &CancellationToken) -> SyncResult<()> {
        loop {
            if self.begin_connect() {
                let established = tokio::select! {
                    _ = shutdown.cancelled() => return Err(SyncError::Shutdown),
                    result = self.establish() => result,
                };
                if let Err(err) = established {
                    self.retry_after(&err.to_string(), shutdown).await?;
                }
                continue;
            }

            let event = tokio::select! {
                _ = shutdown.cancelled() => return Err(SyncError::Shutdown),
                event = self.transport.recv() => event,
            };
            match event {
                TransportEvent::Message(payload) => {
                    let sent = tokio::select! {
                        _ = shutdown.cancelled() => return Err(SyncError::Shutdown),
                        sent = self.inbound.send(payload) => sent,
                    };
                    if sent.is_err() {
                        info!("telemetry consumer gone, stopping client");
                        return Ok(());
                    }
                }
                TransportEvent::Lost(reason) => {
                    if self.mark_lost(&reason) {
                        self.retry_after(&reason, shutdown).await?;
                    }
                }
            }
        }
    }

    /// Runs until shutdown, the consumer going away, or the retry budget running out.
    pub async fn run(mut self, shutdown: CancellationToken) -> SyncResult<()> {
        let result = self.drive(&shutdown).await;
        self.transport.disconnect().await;
        self.set_state(ConnectionState::Disconnected);
        match result {
            Err(SyncError::Shutdown) => Ok(()),
            Err(err) => {
                error!("telemetry client stopped: {}", err);
                Err(err)
            }
            Ok(()) => Ok(()),
        }
    }
}
