use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A stored value plus the bookkeeping eviction needs.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Entry<V> {
    pub value: V,
    pub access_count: u64,
    pub last_accessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<V> Entry<V> {
    pub fn new(value: V, now: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            value,
            access_count: 1,
            last_accessed_at: now,
            expires_at: now + lifetime,
        }
    }

    /// Record a read or write of this entry.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed_at = now;
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
