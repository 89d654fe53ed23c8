//! Startup seeding of the store from an external record source.
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;
use crate::storage::StorageEngine;

/// One record to seed. `expiry_time` is seconds since the epoch; zero means
/// the record carries no expiry of its own.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SeedRecord {
    pub id: u64,
    pub value: String,
    #[serde(default)]
    pub expiry_time: i64,
}

impl SeedRecord {
    pub fn key(&self) -> String {
        self.id.to_string()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_time > 0 && self.expiry_time < now.timestamp()
    }
}

pub trait SeedSource {
    /// Records in the order they should be inserted.
    fn load(&self) -> Result<Vec<SeedRecord>>;
}

/// A JSON file holding an array of records.
#[derive(Clone, Debug)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SeedSource for JsonFileSource {
    fn load(&self) -> Result<Vec<SeedRecord>> {
        let raw = std::fs::read_to_string(&self.path)?;
        let records: Vec<SeedRecord> = serde_json::from_str(&raw)?;
        debug!(path = %self.path.display(), count = records.len(), "loaded seed records");
        Ok(records)
    }
}

/// Insert every record through the normal insert path, keyed by id. Records
/// already past their own expiry time are skipped. Returns how many were
/// inserted.
pub fn seed_store<S>(source: &S, engine: &StorageEngine<Value>, now: DateTime<Utc>) -> Result<usize>
where
    S: SeedSource + ?Sized,
{
    let records = source.load()?;
    let mut seeded = 0;
    for record in records {
        if record.is_expired(now) {
            debug!(id = record.id, "skipping expired seed record");
            continue;
        }
        engine.insert(&record.key(), Value::String(record.value))?;
        seeded += 1;
    }
    info!(seeded, "seeded store");
    Ok(seeded)
}
