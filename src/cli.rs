//! CLI for this application
//!
use std::path::PathBuf;

use crate::settings;

#[derive(Clone, Debug, clap::Parser)]
#[command(name = "echodb", version, about)]
pub struct Cli {
    // Server listen address
    #[clap(
        long,
        default_value = "0.0.0.0",
        env("ECHODB_LISTEN_ADDRESS"),
        help = "IP Address to listen on"
    )]
    pub listen_address: String,

    // HTTP API listen port
    #[clap(
        long,
        default_value = settings::DEFAULT_PORT_HTTP,
        env("ECHODB_HTTP_LISTEN_PORT"),
        help = "Port to bind the echodb HTTP API server to"
    )]
    pub listen_port: u16,

    // HTTP listen port for Gossip
    #[clap(
        long,
        default_value = settings::DEFAULT_PORT_GOSSIP,
        env("ECHODB_GOSSIP_LISTEN_PORT"),
        help = "Port to bind the gossip listener to"
    )]
    pub gossip_port: u16,

    // Mode of multi-node operation
    #[clap(
        long,
        default_value = "gossip",
        env("ECHODB_RUN_MODE"),
        help = "run-mode: 'gossip' or 'single'"
    )]
    pub run_mode: settings::RunMode,

    // Identity announced to peers
    #[clap(
        long,
        env("ECHODB_NODE_ID"),
        help = "Node id used in gossip state (default: listen-address:gossip-port)"
    )]
    pub node_id: Option<String>,

    // Gossip peers
    #[clap(
        long,
        env("ECHODB_PEERS"),
        value_delimiter = ',',
        help = "Gossip peers as host:port (e.g., node2:8411,node3:8411). If empty, runs in single-node mode."
    )]
    pub peers: Vec<String>,

    // Store settings: max entries before eviction
    #[clap(
        long,
        default_value = settings::DEFAULT_CAPACITY,
        env("ECHODB_CAPACITY"),
        help = "Maximum number of entries held before eviction"
    )]
    pub capacity: usize,

    // Store settings: entry lifetime
    #[clap(
        long,
        default_value = settings::DEFAULT_LIFETIME_SECONDS,
        env("ECHODB_LIFETIME_SECONDS"),
        help = "Seconds an entry lives after insertion"
    )]
    pub lifetime_seconds: u64,

    // Store settings: maintenance cadence
    #[clap(
        long,
        default_value = settings::DEFAULT_MAINTENANCE_INTERVAL_SECONDS,
        env("ECHODB_MAINTENANCE_INTERVAL_SECONDS"),
        help = "Interval in seconds between expiry/eviction passes"
    )]
    pub maintenance_interval_seconds: u64,

    // Store settings: index branching factor
    #[clap(
        long,
        default_value = settings::DEFAULT_INDEX_DEGREE,
        env("ECHODB_INDEX_DEGREE"),
        help = "Maximum keys per index node (at least 3)"
    )]
    pub index_degree: usize,

    // Store settings: expiry on overwrite
    #[clap(
        long,
        default_value = "fixed",
        env("ECHODB_EXPIRY_MODE"),
        help = "expiry-mode: 'fixed' or 'refresh-on-write'"
    )]
    pub expiry_mode: settings::ExpiryMode,

    // Gossip timing
    #[clap(
        long,
        default_value = settings::DEFAULT_GOSSIP_INTERVAL_SECONDS,
        env("ECHODB_GOSSIP_INTERVAL_SECONDS"),
        help = "Interval in seconds between gossip rounds"
    )]
    pub gossip_interval_seconds: u64,

    #[clap(
        long,
        default_value = settings::DEFAULT_GOSSIP_TIMEOUT_SECONDS,
        env("ECHODB_GOSSIP_TIMEOUT_SECONDS"),
        help = "Timeout in seconds for each gossip delivery"
    )]
    pub gossip_timeout_seconds: u64,

    // Bulk loader source
    #[clap(
        long,
        env("ECHODB_SEED_FILE"),
        help = "JSON file of {id, value, expiry_time} records to load at startup"
    )]
    pub seed_file: Option<PathBuf>,
}

impl Cli {
    pub fn into_settings(self) -> settings::Settings {
        settings::Settings {
            listen_address: self.listen_address,
            listen_port: self.listen_port,
            gossip_port: self.gossip_port,
            run_mode: self.run_mode,
            node_id: self.node_id,
            peers: self.peers,
            capacity: self.capacity,
            lifetime_seconds: self.lifetime_seconds,
            maintenance_interval_seconds: self.maintenance_interval_seconds,
            index_degree: self.index_degree,
            expiry_mode: self.expiry_mode,
            gossip_interval_seconds: self.gossip_interval_seconds,
            gossip_timeout_seconds: self.gossip_timeout_seconds,
            seed_file: self.seed_file,
        }
    }
}
