pub mod bounds;
pub mod feature;
pub mod station;
pub mod view;

pub use bounds::BoundingBox;
pub use feature::{FeatureCollection, StationFeature};
pub use station::{Coordinates, MarkerId, Station, StationId};
pub use view::{ViewPosition, ViewportSize, ViewportUpdate};
