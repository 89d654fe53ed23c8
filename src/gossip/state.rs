use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GossipError, Result};

/// What a node says about itself on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct GossipState {
    pub node_id: String,
    /// Seconds since the Unix epoch.
    pub last_gossip: i64,
    pub state: String,
}

impl GossipState {
    pub fn initial(node_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            node_id: node_id.to_string(),
            last_gossip: now.timestamp(),
            state: format!("Node {} is running", node_id),
        }
    }

    /// Parse a payload received from a peer. Any missing or mistyped field
    /// is a message error.
    pub fn from_wire(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| GossipError::Message(e.to_string()).into())
    }
}
