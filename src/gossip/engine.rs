use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, error, event, info, instrument, warn, Level};

use super::state::GossipState;
use super::transport::PeerSender;
use crate::clock::SharedClock;
use crate::error::{EchoError, Result};
use crate::settings::GossipSettings;
use crate::task::{spawn_periodic, BackgroundTask};

/// Delivery tally for one outbound round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GossipRound {
    pub delivered: usize,
    pub failed: usize,
}

/// Holds this node's gossip state, pushes it to peers on a timer and
/// accepts whatever peers push back. Last write by arrival wins.
#[derive(Clone, Debug)]
pub struct GossipEngine {
    node_id: String,
    peers: Arc<Vec<String>>,
    interval: Duration,
    state: Arc<RwLock<GossipState>>,
    sender: Arc<dyn PeerSender>,
    clock: SharedClock,
}

impl GossipEngine {
    pub fn new(settings: &GossipSettings, sender: Arc<dyn PeerSender>, clock: SharedClock) -> Result<Self> {
        settings.validate()?;
        let state = GossipState::initial(&settings.node_id, clock.now());
        Ok(Self {
            node_id: settings.node_id.clone(),
            peers: Arc::new(settings.peers.clone()),
            interval: settings.interval,
            state: Arc::new(RwLock::new(state)),
            sender,
            clock,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Current local state.
    pub fn state(&self) -> Result<GossipState> {
        let state = self.state.read().map_err(|e| {
            event!(
                Level::ERROR,
                message = "Failed to acquire gossip state lock",
                err = format!("{}", e)
            );
            EchoError::Concurrency("Failed to acquire gossip state lock".to_string())
        })?;
        Ok(state.clone())
    }

    /// Replace local state wholesale with `incoming`.
    pub fn apply(&self, incoming: GossipState) -> Result<()> {
        let mut state = self.state.write().map_err(|e| {
            event!(
                Level::ERROR,
                message = "Failed to acquire gossip state lock",
                err = format!("{}", e)
            );
            EchoError::Concurrency("Failed to acquire gossip state lock".to_string())
        })?;
        *state = incoming;
        Ok(())
    }

    /// Handle a raw inbound payload. A malformed payload leaves local state
    /// untouched.
    pub fn receive(&self, body: &[u8]) -> Result<GossipState> {
        let incoming = GossipState::from_wire(body)?;
        self.apply(incoming.clone())?;
        Ok(incoming)
    }

    /// The message sent to peers: our own id, the current status and a
    /// fresh timestamp.
    pub fn outbound_message(&self) -> Result<GossipState> {
        let current = self.state()?;
        Ok(GossipState {
            node_id: self.node_id.clone(),
            last_gossip: self.clock.now().timestamp(),
            state: current.state,
        })
    }

    /// Push the current state to every peer once. Failures are logged and
    /// left for the next round.
    #[instrument(skip(self), level = "debug")]
    pub async fn gossip_round(&self) -> GossipRound {
        let mut round = GossipRound::default();
        let message = match self.outbound_message() {
            Ok(message) => message,
            Err(err) => {
                error!(err = %err, "unable to read gossip state");
                round.failed = self.peers.len();
                return round;
            }
        };

        for peer in self.peers.iter() {
            debug!(peer = %peer, "gossiping to peer");
            match self.sender.send(peer, &message).await {
                Ok(()) => round.delivered += 1,
                Err(err) => {
                    warn!(peer = %peer, err = %err, "failed to gossip to peer");
                    round.failed += 1;
                }
            }
        }
        round
    }

    /// Start pushing state to peers every configured interval.
    pub fn start(&self) -> BackgroundTask {
        info!(
            node_id = %self.node_id,
            peers = self.peers.len(),
            interval_ms = self.interval.as_millis() as u64,
            "starting gossip"
        );
        let engine = self.clone();
        spawn_periodic("gossip", self.interval, move || {
            let engine = engine.clone();
            async move {
                engine.gossip_round().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::error::GossipError;

    #[derive(Debug, Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, GossipState)>>,
        unreachable: Vec<String>,
    }

    #[async_trait]
    impl PeerSender for RecordingSender {
        async fn send(&self, peer: &str, state: &GossipState) -> Result<()> {
            if self.unreachable.iter().any(|p| p == peer) {
                return Err(GossipError::Delivery {
                    peer: peer.to_string(),
                    reason: "connection refused".to_string(),
                }
                .into());
            }
            self.sent.lock().unwrap().push((peer.to_string(), state.clone()));
            Ok(())
        }
    }

    fn settings(peers: &[&str]) -> GossipSettings {
        GossipSettings {
            node_id: "n1".to_string(),
            peers: peers.iter().map(|p| p.to_string()).collect(),
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn inbound_overwrites_then_malformed_is_rejected() {
        let clock = Arc::new(ManualClock::default());
        let engine = GossipEngine::new(&settings(&[]), Arc::new(RecordingSender::default()), clock).unwrap();
        assert_eq!(engine.state().unwrap().state, "Node n1 is running");

        engine
            .receive(br#"{"node_id":"n2","last_gossip":100,"state":"up"}"#)
            .unwrap();
        let expected = GossipState {
            node_id: "n2".to_string(),
            last_gossip: 100,
            state: "up".to_string(),
        };
        assert_eq!(engine.state().unwrap(), expected);

        assert!(engine.receive(b"{\"node_id\":").is_err());
        assert_eq!(engine.state().unwrap(), expected);
    }

    #[tokio::test]
    async fn round_reaches_every_peer_with_fresh_timestamp() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let sender = Arc::new(RecordingSender::default());
        let engine = GossipEngine::new(&settings(&["a:1", "b:2"]), sender.clone(), clock.clone()).unwrap();

        clock.advance(chrono::Duration::seconds(30));
        let round = engine.gossip_round().await;
        assert_eq!(round, GossipRound { delivered: 2, failed: 0 });

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        for (_, message) in sent.iter() {
            assert_eq!(message.node_id, "n1");
            assert_eq!(message.last_gossip, start.timestamp() + 30);
            assert_eq!(message.state, "Node n1 is running");
        }
    }

    #[tokio::test]
    async fn failed_peer_does_not_stop_the_round() {
        let clock = Arc::new(ManualClock::default());
        let sender = Arc::new(RecordingSender {
            unreachable: vec!["down:1".to_string()],
            ..RecordingSender::default()
        });
        let engine = GossipEngine::new(&settings(&["down:1", "up:2"]), sender.clone(), clock).unwrap();

        let round = engine.gossip_round().await;
        assert_eq!(round, GossipRound { delivered: 1, failed: 1 });
        assert_eq!(sender.sent.lock().unwrap()[0].0, "up:2");
    }

    #[tokio::test]
    async fn outbound_carries_received_status_under_own_id() {
        let clock = Arc::new(ManualClock::default());
        let sender = Arc::new(RecordingSender::default());
        let engine = GossipEngine::new(&settings(&["b:2"]), sender.clone(), clock).unwrap();
        engine
            .receive(br#"{"node_id":"n2","last_gossip":100,"state":"degraded"}"#)
            .unwrap();

        engine.gossip_round().await;
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent[0].1.node_id, "n1");
        assert_eq!(sent[0].1.state, "degraded");
    }
}
