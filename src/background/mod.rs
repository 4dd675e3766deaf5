//! Background catalog refresher.
//!
//! Keeps the cache warm without traffic by calling
//! [`CatalogCache::refresh_if_stale_at`] once per refresh interval with the
//! tick's deadline, so each tick finds the previous tick's snapshot due. The
//! first tick fires immediately, which doubles as the startup fetch. Because
//! it goes through the same entry point as request-driven lookups, the two
//! triggers never fetch concurrently.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::{CatalogCache, RefreshOutcome};

/// Handle to the running refresher task. Dropping it leaves the task running.
#[derive(Debug)]
pub struct RefresherHandle {
    task: JoinHandle<()>,
}

impl RefresherHandle {
    /// Stops the refresher. A fetch in flight is abandoned; the cache keeps
    /// its previous snapshot.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns the refresher on the current Tokio runtime.
///
/// # Panics
///
/// Panics if `every` is zero (see [`tokio::time::interval`]).
pub fn spawn_refresher(cache: Arc<CatalogCache>, every: Duration) -> RefresherHandle {
    let task = tokio::spawn(async move {
        let mut ticker = time::interval(every);
        // A slow fetch must not be followed by a burst of catch-up ticks.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?every, "catalog refresher started");
        loop {
            let deadline = ticker.tick().await;
            match cache.refresh_if_stale_at(deadline).await {
                RefreshOutcome::Refreshed { products } => {
                    debug!(products, "scheduled catalog refresh succeeded");
                }
                // Already logged by the cache.
                RefreshOutcome::Failed(_) => {}
                other => debug!(outcome = ?other, "scheduled catalog refresh skipped"),
            }
        }
    });

    RefresherHandle { task }
}
