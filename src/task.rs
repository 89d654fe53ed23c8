//! Periodic background tasks with a stop handle.
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::concurrency_error;
use crate::error::Result;

/// Handle to a task started with [`spawn_periodic`].
#[derive(Debug)]
pub struct BackgroundTask {
    name: &'static str,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ask the task to stop and wait for it. A tick already in progress runs
    /// to completion first.
    pub async fn stop(self) -> Result<()> {
        if self.shutdown_tx.send(true).is_err() {
            warn!(task = self.name, "background task already gone");
        }
        self.handle
            .await
            .map_err(|e| concurrency_error!("background task {} failed: {}", self.name, e))
    }
}

/// Stop every task in turn. A task that fails to stop is logged and the
/// rest are still stopped. Returns how many failed.
pub async fn stop_all(tasks: Vec<BackgroundTask>) -> usize {
    let mut failed = 0;
    for task in tasks {
        let name = task.name();
        if let Err(err) = task.stop().await {
            warn!(task = name, err = %err, "background task did not stop cleanly");
            failed += 1;
        }
    }
    failed
}

/// Run `tick` every `period` until stopped. The first tick happens one full
/// period after spawning.
pub fn spawn_periodic<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> BackgroundTask
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval fires immediately once
        ticker.tick().await;
        info!(task = name, period_ms = period.as_millis() as u64, "background task started");

        loop {
            tokio::select! {
                _ = ticker.tick() => tick().await,
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!(task = name, "background task stopped");
    });

    BackgroundTask {
        name,
        shutdown_tx,
        handle,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let task = spawn_periodic("counter", Duration::from_secs(1), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        task.stop().await.unwrap();
        let seen = count.load(Ordering::SeqCst);
        assert_eq!(seen, 3);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_outlives_a_crashed_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let crashed = spawn_periodic("crashes", Duration::from_secs(1), || async {
            panic!("tick blew up");
        });
        let counter = count.clone();
        let healthy = spawn_periodic("healthy", Duration::from_secs(1), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(stop_all(vec![crashed, healthy]).await, 1);

        let seen = count.load(Ordering::SeqCst);
        assert_eq!(seen, 2);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }
}
