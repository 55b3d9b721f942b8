pub mod metadata;
pub mod mqtt;
