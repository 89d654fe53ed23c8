//! echodb: an in-memory key/value store with an ordered key index,
//! frequency/recency eviction with expiry, and gossip-based node state
//! propagation.
pub mod api;
pub mod cli;
pub mod clock;
pub mod error;
pub mod gossip;
pub mod loader;
pub mod settings;
pub mod storage;
pub mod task;
pub mod version;
