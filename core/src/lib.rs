//! Real-time state synchronization for live road-station speed maps.
//!
//! A static station catalog is narrowed to the stations inside the current
//! viewport, telemetry readings from a pub/sub feed are merged into that
//! visible subset, and the feed connection is kept alive and resubscribed
//! across failures. Drawing is delegated to a [`render::RenderSync`]
//! implementation supplied by the host.

pub mod catalog;
pub mod model;
pub mod prelude;
pub mod render;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod viewport;

pub use catalog::{fetch_catalog, MetadataSource, StationCatalog};
pub use prelude::{SyncError, SyncResult};
pub use session::{Session, SyncContext};
