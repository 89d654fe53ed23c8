//! Newest-version bookkeeping behind the update-check endpoints.
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::concurrency_error;
use crate::error::Result;

pub const DEFAULT_CLIENT_VERSION: &str = "v1.0.0";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpdateCheck {
    pub current_version: String,
    pub newest_version: String,
    pub needs_update: bool,
}

#[derive(Clone, Debug)]
pub struct VersionService {
    newest: Arc<RwLock<String>>,
}

impl VersionService {
    pub fn new(newest: impl Into<String>) -> Self {
        Self {
            newest: Arc::new(RwLock::new(newest.into())),
        }
    }

    pub fn newest(&self) -> Result<String> {
        let newest = self
            .newest
            .read()
            .map_err(|e| concurrency_error!("Failed to acquire version lock: {}", e))?;
        Ok(newest.clone())
    }

    pub fn set_newest(&self, version: &str) -> Result<()> {
        let mut newest = self
            .newest
            .write()
            .map_err(|e| concurrency_error!("Failed to acquire version lock: {}", e))?;
        *newest = version.to_string();
        info!(version, "newest version set");
        Ok(())
    }

    /// Any difference from the newest version counts as outdated; versions
    /// are compared as plain strings.
    pub fn check(&self, current_version: &str) -> Result<UpdateCheck> {
        let newest_version = self.newest()?;
        Ok(UpdateCheck {
            needs_update: current_version != newest_version,
            current_version: current_version.to_string(),
            newest_version,
        })
    }
}
