pub mod coalesce;
pub mod index;

pub use coalesce::Coalescer;
pub use index::{ViewportIndex, VisibleSet};
