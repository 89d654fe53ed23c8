//! Storage layer: key/value table, ordered key index and eviction.
pub mod engine;
pub mod entry;
pub mod eviction;
pub mod index;
pub mod maintenance;

pub use engine::{MaintenanceReport, StorageEngine};
pub use entry::Entry;
pub use eviction::EvictionPolicy;
pub use index::IndexTree;
pub use maintenance::spawn_maintenance;
