//! Eviction decisions. Nothing here mutates the table; the engine applies
//! whatever these functions pick while it holds the storage lock.
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::entry::Entry;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvictionPolicy {
    capacity: usize,
}

impl EvictionPolicy {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn over_capacity(&self, len: usize) -> bool {
        len > self.capacity
    }

    /// The single entry to drop when over capacity: least frequently used,
    /// then least recently used. Equal count and timestamp fall back to key
    /// order so the choice is deterministic.
    pub fn select_victim<'a, V>(&self, table: &'a HashMap<String, Entry<V>>) -> Option<&'a str> {
        if !self.over_capacity(table.len()) {
            return None;
        }
        table
            .iter()
            .min_by(|(a_key, a), (b_key, b)| {
                a.access_count
                    .cmp(&b.access_count)
                    .then(a.last_accessed_at.cmp(&b.last_accessed_at))
                    .then(a_key.cmp(b_key))
            })
            .map(|(key, _)| key.as_str())
    }

    /// Keys whose expiry time is strictly before `now`.
    pub fn expired_keys<V>(&self, table: &HashMap<String, Entry<V>>, now: DateTime<Utc>) -> Vec<String> {
        table
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }
}
