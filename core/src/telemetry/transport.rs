use async_trait::async_trait;

use crate::prelude::SyncResult;

/// Something the streaming connection reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Raw payload of one published message.
    Message(Vec<u8>),
    /// The connection dropped; subscriptions are gone with it.
    Lost(String),
}

/// Pub/sub connection carrying station telemetry.
#[async_trait]
pub trait TelemetryTransport: Send {
    /// Opens a fresh connection, discarding any previous one.
    async fn connect(&mut self) -> SyncResult<()>;
    async fn subscribe(&mut self, topic: &str) -> SyncResult<()>;
    /// Waits for the next event on an open connection.
    async fn recv(&mut self) -> TransportEvent;
    async fn disconnect(&mut self);
}
