//! echodb application settings
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::config_error;
use crate::error::Result;
use crate::storage::index::MIN_DEGREE;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const STANDARD_PORT_HTTP: u16 = 8410;
pub const DEFAULT_PORT_HTTP: &str = "8410";
pub const STANDARD_PORT_GOSSIP: u16 = 8411;
pub const DEFAULT_PORT_GOSSIP: &str = "8411";

pub const DEFAULT_CAPACITY: &str = "1000";
pub const DEFAULT_LIFETIME_SECONDS: &str = "600";
pub const DEFAULT_MAINTENANCE_INTERVAL_SECONDS: &str = "60";
pub const DEFAULT_GOSSIP_INTERVAL_SECONDS: &str = "5";
pub const DEFAULT_GOSSIP_TIMEOUT_SECONDS: &str = "10";
pub const DEFAULT_INDEX_DEGREE: &str = "3";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    Gossip,
    Single,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Gossip => write!(f, "gossip"),
            RunMode::Single => write!(f, "single"),
        }
    }
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gossip" => Ok(RunMode::Gossip),
            "single" => Ok(RunMode::Single),
            _ => Err(format!("Invalid run-mode: {}", s)),
        }
    }
}

/// What a write to an existing key does to its expiry time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExpiryMode {
    /// Expiry is set once, when the key is first inserted.
    #[default]
    Fixed,
    /// Every write pushes expiry out to `now + lifetime`.
    RefreshOnWrite,
}

impl std::fmt::Display for ExpiryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpiryMode::Fixed => write!(f, "fixed"),
            ExpiryMode::RefreshOnWrite => write!(f, "refresh-on-write"),
        }
    }
}

impl std::str::FromStr for ExpiryMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(ExpiryMode::Fixed),
            "refresh-on-write" => Ok(ExpiryMode::RefreshOnWrite),
            _ => Err(format!("Invalid expiry-mode: {}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StoreSettings {
    pub capacity: usize,
    pub lifetime: Duration,
    pub maintenance_interval: Duration,
    pub index_degree: usize,
    pub expiry_mode: ExpiryMode,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            capacity: 1000,
            lifetime: Duration::from_secs(600),
            maintenance_interval: Duration::from_secs(60),
            index_degree: 3,
            expiry_mode: ExpiryMode::Fixed,
        }
    }
}

impl StoreSettings {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(config_error!("capacity must be at least 1"));
        }
        if self.index_degree < MIN_DEGREE {
            return Err(config_error!(
                "index degree must be at least {}, got {}",
                MIN_DEGREE,
                self.index_degree
            ));
        }
        if self.maintenance_interval.is_zero() {
            return Err(config_error!("maintenance interval must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct GossipSettings {
    pub node_id: String,
    pub peers: Vec<String>,
    pub interval: Duration,
    pub timeout: Duration,
}

impl GossipSettings {
    pub fn validate(&self) -> Result<()> {
        if self.node_id.is_empty() {
            return Err(config_error!("node id must not be empty"));
        }
        if self.interval.is_zero() {
            return Err(config_error!("gossip interval must be non-zero"));
        }
        if self.timeout.is_zero() {
            return Err(config_error!("gossip timeout must be non-zero"));
        }
        if let Some(peer) = self.peers.iter().find(|p| p.trim().is_empty()) {
            return Err(config_error!("invalid gossip peer address: {:?}", peer));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    // Server listen address
    pub listen_address: String,

    // HTTP API listen port
    pub listen_port: u16,

    // Gossip listener port
    pub gossip_port: u16,

    // Whether this node gossips with peers
    pub run_mode: RunMode,

    // Identity used in gossip state; derived from address when absent
    pub node_id: Option<String>,

    // Gossip peers as host:port
    pub peers: Vec<String>,

    // Store configuration
    pub capacity: usize,
    pub lifetime_seconds: u64,
    pub maintenance_interval_seconds: u64,
    pub index_degree: usize,
    pub expiry_mode: ExpiryMode,

    // Gossip timing
    pub gossip_interval_seconds: u64,
    pub gossip_timeout_seconds: u64,

    // Optional records to seed the store with at startup
    pub seed_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".to_string(),
            listen_port: STANDARD_PORT_HTTP,
            gossip_port: STANDARD_PORT_GOSSIP,
            run_mode: RunMode::Gossip,
            node_id: None,
            peers: Vec::new(),
            capacity: 1000,
            lifetime_seconds: 600,
            maintenance_interval_seconds: 60,
            index_degree: 3,
            expiry_mode: ExpiryMode::Fixed,
            gossip_interval_seconds: 5,
            gossip_timeout_seconds: 10,
            seed_file: None,
        }
    }
}

impl Settings {
    pub fn node_id(&self) -> String {
        match &self.node_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{}:{}", self.listen_address, self.gossip_port),
        }
    }

    /// Gossip only runs in gossip mode with at least one peer.
    pub fn gossip_enabled(&self) -> bool {
        self.run_mode == RunMode::Gossip && !self.peers.is_empty()
    }

    fn ip_address(&self) -> Result<IpAddr> {
        self.listen_address
            .parse::<IpAddr>()
            .map_err(|e| config_error!("invalid listen address {}: {}", self.listen_address, e))
    }

    pub fn http_socket_address(&self) -> Result<SocketAddr> {
        Ok(SocketAddr::from((self.ip_address()?, self.listen_port)))
    }

    pub fn gossip_socket_address(&self) -> Result<SocketAddr> {
        Ok(SocketAddr::from((self.ip_address()?, self.gossip_port)))
    }

    pub fn store_settings(&self) -> Result<StoreSettings> {
        let store = StoreSettings {
            capacity: self.capacity,
            lifetime: Duration::from_secs(self.lifetime_seconds),
            maintenance_interval: Duration::from_secs(self.maintenance_interval_seconds),
            index_degree: self.index_degree,
            expiry_mode: self.expiry_mode,
        };
        store.validate()?;
        Ok(store)
    }

    pub fn gossip_settings(&self) -> Result<GossipSettings> {
        let gossip = GossipSettings {
            node_id: self.node_id(),
            peers: self.peers.clone(),
            interval: Duration::from_secs(self.gossip_interval_seconds),
            timeout: Duration::from_secs(self.gossip_timeout_seconds),
        };
        gossip.validate()?;
        Ok(gossip)
    }
}
