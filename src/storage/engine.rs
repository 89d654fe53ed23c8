use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use serde::Serialize;
use tracing::{debug, event, instrument, Level};

use super::entry::Entry;
use super::eviction::EvictionPolicy;
use super::index::IndexTree;
use crate::clock::{SharedClock, SystemClock};
use crate::config_error;
use crate::error::{EchoError, Result};
use crate::settings::{ExpiryMode, StoreSettings};

/// Table and index change together, so they sit behind one lock.
#[derive(Debug)]
struct StoreState<V> {
    table: HashMap<String, Entry<V>>,
    index: IndexTree,
}

impl<V> StoreState<V> {
    fn remove(&mut self, key: &str) -> Option<Entry<V>> {
        let entry = self.table.remove(key)?;
        self.index.delete(key);
        Some(entry)
    }
}

/// Outcome of one maintenance pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub expired: usize,
    pub evicted: usize,
    pub remaining: usize,
}

/// In-memory key/value store with an ordered key index.
///
/// Every operation, reads included, takes the same exclusive lock: a read
/// updates the entry's access statistics.
#[derive(Clone, Debug)]
pub struct StorageEngine<V> {
    state: Arc<Mutex<StoreState<V>>>,
    policy: EvictionPolicy,
    lifetime: Duration,
    expiry_mode: ExpiryMode,
    clock: SharedClock,
}

impl<V: Clone> StorageEngine<V> {
    pub fn new(settings: &StoreSettings) -> Result<Self> {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: &StoreSettings, clock: SharedClock) -> Result<Self> {
        settings.validate()?;
        let lifetime = Duration::from_std(settings.lifetime)
            .map_err(|e| config_error!("lifetime out of range: {}", e))?;
        Ok(Self {
            state: Arc::new(Mutex::new(StoreState {
                table: HashMap::new(),
                index: IndexTree::new(settings.index_degree)?,
            })),
            policy: EvictionPolicy::new(settings.capacity),
            lifetime,
            expiry_mode: settings.expiry_mode,
            clock,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState<V>>> {
        self.state.lock().map_err(|e| {
            event!(
                Level::ERROR,
                message = "Failed to acquire storage lock",
                err = format!("{}", e)
            );
            EchoError::Concurrency("Failed to acquire storage lock".to_string())
        })
    }

    pub fn capacity(&self) -> usize {
        self.policy.capacity()
    }

    /// Insert or overwrite `key`. A new key that pushes the table past
    /// capacity causes exactly one eviction.
    pub fn insert(&self, key: &str, value: V) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.lock()?;

        match state.table.get_mut(key) {
            Some(entry) => {
                entry.value = value;
                entry.touch(now);
                if self.expiry_mode == ExpiryMode::RefreshOnWrite {
                    entry.expires_at = now + self.lifetime;
                }
            }
            None => {
                state
                    .table
                    .insert(key.to_string(), Entry::new(value, now, self.lifetime));
                state.index.insert(key);
            }
        }

        if let Some(victim) = self.policy.select_victim(&state.table).map(str::to_owned) {
            debug!(key = %victim, "evicting over capacity");
            state.remove(&victim);
        }
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.remove(key);
        Ok(())
    }

    /// Look up `key`, counting the lookup as an access.
    pub fn query(&self, key: &str) -> Result<Option<V>> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        Ok(state.table.get_mut(key).map(|entry| {
            entry.touch(now);
            entry.value.clone()
        }))
    }

    /// Keys in `[start, end]`, ascending.
    pub fn range_query(&self, start: &str, end: &str) -> Result<Vec<String>> {
        let state = self.lock()?;
        Ok(state.index.range_query(start, end))
    }

    /// Drop expired entries, then evict one entry if still over capacity.
    #[instrument(skip(self), level = "debug")]
    pub fn run_maintenance(&self) -> Result<MaintenanceReport> {
        let now = self.clock.now();
        let mut state = self.lock()?;

        let expired = self.policy.expired_keys(&state.table, now);
        for key in &expired {
            state.remove(key);
        }

        let mut evicted = 0;
        if let Some(victim) = self.policy.select_victim(&state.table).map(str::to_owned) {
            state.remove(&victim);
            evicted = 1;
        }

        let report = MaintenanceReport {
            expired: expired.len(),
            evicted,
            remaining: state.table.len(),
        };
        debug!(?report, "maintenance pass complete");
        Ok(report)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.table.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Entry bookkeeping for `key` without counting as an access.
    pub fn peek(&self, key: &str) -> Result<Option<Entry<V>>> {
        Ok(self.lock()?.table.get(key).cloned())
    }

    pub fn index_height(&self) -> Result<usize> {
        Ok(self.lock()?.index.height())
    }

    pub fn index_dump(&self) -> Result<String> {
        Ok(self.lock()?.index.dump())
    }
}
