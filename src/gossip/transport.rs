//! Outbound delivery of gossip state to peers.
use std::time::Duration;

use async_trait::async_trait;

use super::state::GossipState;
use crate::api::paths;
use crate::error::{GossipError, Result};

#[async_trait]
pub trait PeerSender: Send + Sync + std::fmt::Debug {
    /// Deliver `state` to `peer`. Anything short of a 2xx acknowledgement is
    /// a delivery error.
    async fn send(&self, peer: &str, state: &GossipState) -> Result<()>;
}

/// HTTP sender; one pooled client shared by every peer.
#[derive(Clone, Debug)]
pub struct HttpPeerSender {
    client: reqwest::Client,
}

impl HttpPeerSender {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

/// `host:port` peers are reached over plain HTTP; full URLs are kept as given.
pub fn peer_url(peer: &str) -> String {
    let base = peer.trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{}{}", base, paths::gossip::GOSSIP)
    } else {
        format!("http://{}{}", base, paths::gossip::GOSSIP)
    }
}

#[async_trait]
impl PeerSender for HttpPeerSender {
    async fn send(&self, peer: &str, state: &GossipState) -> Result<()> {
        let delivery_error = |reason: String| GossipError::Delivery {
            peer: peer.to_string(),
            reason,
        };

        let response = self
            .client
            .post(peer_url(peer))
            .json(state)
            .send()
            .await
            .map_err(|e| delivery_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(delivery_error(format!("peer responded with {}", status)).into());
        }
        Ok(())
    }
}
