//! All Paths are recorded here for use throughout this codebase
pub mod base {
    pub const ROOT: &str = "/";
    pub const HEALTH: &str = "/health";
    pub const ABOUT: &str = "/about";
}

pub mod store {
    pub const KEY: &str = "/kv/:key";
    pub const RANGE: &str = "/range";
    pub const INDEX: &str = "/index";
    pub const MAINTENANCE: &str = "/maintenance";
}

pub mod version {
    pub const CHECK_UPDATE: &str = "/check-update";
    pub const UPDATE_VERSION: &str = "/update-version";
}

pub mod gossip {
    pub const GOSSIP: &str = "/gossip";
}

pub fn key_path(key: &str) -> String {
    store::KEY.replace(":key", key)
}
