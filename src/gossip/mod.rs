//! Gossip state propagation
//!
//! Each node keeps one `GossipState`, pushes it to its configured peers on a
//! timer and overwrites it with whatever a peer pushes in. There is no
//! per-peer table and no conflict resolution: the last payload to arrive
//! wins. Gossip never touches stored data.
pub mod engine;
pub mod server;
pub mod state;
pub mod transport;

pub use engine::{GossipEngine, GossipRound};
pub use server::router;
pub use state::GossipState;
pub use transport::{HttpPeerSender, PeerSender};
