use std::time::Duration;

use tracing::{debug, error};

use super::engine::StorageEngine;
use crate::task::{spawn_periodic, BackgroundTask};

/// Run expiry and capacity eviction on `engine` every `period`.
///
/// Each pass runs on the blocking pool. A pass that fails or panics is
/// logged and the next tick runs as usual.
pub fn spawn_maintenance<V>(engine: StorageEngine<V>, period: Duration) -> BackgroundTask
where
    V: Clone + Send + 'static,
{
    spawn_periodic("storage-maintenance", period, move || {
        let engine = engine.clone();
        async move {
            match tokio::task::spawn_blocking(move || engine.run_maintenance()).await {
                Ok(Ok(report)) => debug!(
                    expired = report.expired,
                    evicted = report.evicted,
                    remaining = report.remaining,
                    "maintenance tick"
                ),
                Ok(Err(err)) => error!(err = %err, "maintenance tick failed"),
                Err(join_err) => error!(err = %join_err, "maintenance tick panicked"),
            }
        }
    })
}
