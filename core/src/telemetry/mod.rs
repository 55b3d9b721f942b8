pub mod client;
pub mod message;
pub mod metrics;
pub mod policy;
pub mod router;
pub mod transport;

pub use client::{ConnectionState, ConnectionStatus, TelemetryClient, DEFAULT_TOPIC};
pub use message::{TelemetryMessage, DEFAULT_METRIC};
pub use metrics::{MetricsSnapshot, SyncMetrics};
pub use policy::ReconnectPolicy;
pub use router::{RouteOutcome, TelemetryRouter};
pub use transport::{TelemetryTransport, TransportEvent};
