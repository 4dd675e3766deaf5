//! Catalog cache — a lazily refreshed, in-memory snapshot of the remote catalog.
//!
//! [`CatalogCache`] owns the current [`Snapshot`] and hands out read-only
//! `Arc` views of it. Refreshes are pull-based: a caller that finds the
//! snapshot stale performs the fetch itself, while everyone else keeps
//! reading the previous snapshot.
//!
//! ## Refresh protocol
//!
//! | Condition                                          | Outcome                      |
//! |----------------------------------------------------|------------------------------|
//! | non-empty and younger than the refresh interval     | [`RefreshOutcome::Fresh`]      |
//! | stale, last attempt began less than an interval ago | [`RefreshOutcome::BackingOff`] |
//! | stale, another caller attempted while we waited     | [`RefreshOutcome::Coalesced`]  |
//! | stale, we hold the refresh lock first               | fetch → `Refreshed` / `Failed` |
//!
//! At most one fetch is in flight at any time. Callers that queue behind an
//! in-flight fetch do not fetch again once it finishes, whatever its result.
//! A failed fetch leaves the snapshot and its refresh time untouched.
//!
//! Attempts are stamped with the instant they were judged due, not the
//! instant the fetch returned, so a snapshot is eligible again exactly one
//! interval after the attempt that produced it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogSource, FetchError, Snapshot};

/// Result of a single [`CatalogCache::refresh_if_stale`] call.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// The snapshot was fresh; nothing was fetched.
    Fresh,
    /// This call fetched and installed a new snapshot.
    Refreshed { products: usize },
    /// Another caller attempted a refresh while this one waited for the lock.
    Coalesced,
    /// The snapshot is stale but the last attempt failed too recently to retry.
    BackingOff,
    /// This call fetched and the fetch failed; the previous snapshot is kept.
    Failed(FetchError),
}

impl RefreshOutcome {
    /// Returns `true` if this call performed an outbound fetch.
    pub fn fetched(&self) -> bool {
        matches!(self, Self::Refreshed { .. } | Self::Failed(_))
    }
}

/// Point-in-time view of the cache's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatus {
    /// Products in the current snapshot.
    pub products: usize,
    /// When the attempt that installed the current snapshot began; `None` before the first success.
    pub last_refresh: Option<Instant>,
    /// When the most recent failed attempt began, if it came after the last success.
    pub last_failure: Option<Instant>,
}

// Everything the refresh protocol may write. Only `refresh_if_stale` takes the write lock.
#[derive(Debug, Default)]
struct CacheState {
    snapshot: Arc<Snapshot>,
    last_refresh: Option<Instant>,
    last_failure: Option<Instant>,
    // Bumped on every completed fetch attempt; lets waiters detect that the
    // staleness they observed has already been dealt with.
    attempts: u64,
}

enum Freshness {
    Fresh,
    BackingOff,
    Due,
}

/// Single-flight, TTL-driven cache of the product catalog.
///
/// Construct once at startup and share behind an [`Arc`].
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
/// use qr_catalog::cache::CatalogCache;
/// use qr_catalog::catalog::HttpCatalogFetcher;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = HttpCatalogFetcher::new(
///     "https://example.com/catalog.json",
///     "qr-catalog/0.1",
///     Duration::from_secs(10),
/// )?;
/// let cache = CatalogCache::new(fetcher, Duration::from_secs(10));
///
/// let snapshot = cache.get_snapshot().await;
/// println!("{} products", snapshot.len());
/// # Ok(())
/// # }
/// ```
pub struct CatalogCache {
    source: Box<dyn CatalogSource>,
    refresh_interval: Duration,
    state: RwLock<CacheState>,
    refresh_lock: Mutex<()>,
}

impl CatalogCache {
    /// Creates an empty cache that refreshes from `source` once its snapshot
    /// is older than `refresh_interval`.
    pub fn new(source: impl CatalogSource + 'static, refresh_interval: Duration) -> Self {
        Self {
            source: Box::new(source),
            refresh_interval,
            state: RwLock::new(CacheState::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// The configured time-to-live of a snapshot.
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Returns the freshest available snapshot, refreshing first if it is stale.
    ///
    /// Fetch failures are logged and swallowed: the caller then receives the
    /// previous (possibly empty) snapshot.
    pub async fn get_snapshot(&self) -> Arc<Snapshot> {
        self.refresh_if_stale().await;
        self.snapshot().await
    }

    /// Returns the current snapshot without checking freshness.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.state.read().await.snapshot)
    }

    /// Reports the cache's current bookkeeping.
    pub async fn status(&self) -> CacheStatus {
        let state = self.state.read().await;
        CacheStatus {
            products: state.snapshot.len(),
            last_refresh: state.last_refresh,
            last_failure: state.last_failure,
        }
    }

    /// Refreshes the snapshot if it is stale and eligible for a retry.
    ///
    /// This is the only code path that mutates the cache. Request-driven
    /// lookups and the background refresher both go through it, so they share
    /// the at-most-one-fetch guarantee.
    pub async fn refresh_if_stale(&self) -> RefreshOutcome {
        self.refresh_if_stale_at(Instant::now()).await
    }

    /// Like [`refresh_if_stale`](Self::refresh_if_stale), but judges staleness
    /// as of `now` and stamps any attempt it makes with `now`.
    ///
    /// The background refresher passes its tick deadline here, so a snapshot
    /// it installed on one tick is due on the next regardless of wake-up jitter.
    pub async fn refresh_if_stale_at(&self, now: Instant) -> RefreshOutcome {
        let observed = {
            let state = self.state.read().await;
            match self.freshness(&state, now) {
                Freshness::Fresh => return RefreshOutcome::Fresh,
                Freshness::BackingOff => {
                    debug!("catalog stale but last refresh failed recently; serving previous snapshot");
                    return RefreshOutcome::BackingOff;
                }
                Freshness::Due => state.attempts,
            }
        };

        let _guard = self.refresh_lock.lock().await;

        if self.state.read().await.attempts != observed {
            debug!("catalog refresh already attempted by a concurrent caller");
            return RefreshOutcome::Coalesced;
        }

        let result = self.source.fetch().await;

        let mut state = self.state.write().await;
        state.attempts += 1;
        match result {
            Ok(snapshot) => {
                let products = snapshot.len();
                state.snapshot = Arc::new(snapshot);
                state.last_refresh = Some(now);
                state.last_failure = None;
                info!(products, "catalog refreshed");
                RefreshOutcome::Refreshed { products }
            }
            Err(e) => {
                state.last_failure = Some(now);
                warn!(
                    kind = e.kind(),
                    error = %e,
                    kept_products = state.snapshot.len(),
                    "catalog refresh failed; keeping previous snapshot"
                );
                RefreshOutcome::Failed(e)
            }
        }
    }

    fn freshness(&self, state: &CacheState, now: Instant) -> Freshness {
        let expired = state
            .last_refresh
            .is_none_or(|at| now.saturating_duration_since(at) >= self.refresh_interval);

        if !state.snapshot.is_empty() && !expired {
            return Freshness::Fresh;
        }

        let failed_recently = state
            .last_failure
            .is_some_and(|at| now.saturating_duration_since(at) < self.refresh_interval);

        if failed_recently {
            Freshness::BackingOff
        } else {
            Freshness::Due
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(10);

    type Respond = Box<dyn Fn(usize) -> Result<Snapshot, FetchError> + Send + Sync>;

    // Counts calls and answers according to the zero-based call index.
    struct FakeSource {
        calls: Arc<AtomicUsize>,
        delay: Duration,
        respond: Respond,
    }

    #[async_trait]
    impl CatalogSource for FakeSource {
        async fn fetch(&self) -> Result<Snapshot, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.respond)(call)
        }
    }

    fn fake(
        delay: Duration,
        respond: impl Fn(usize) -> Result<Snapshot, FetchError> + Send + Sync + 'static,
    ) -> (CatalogCache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = FakeSource {
            calls: Arc::clone(&calls),
            delay,
            respond: Box::new(respond),
        };
        (CatalogCache::new(source, TTL), calls)
    }

    fn catalog(names: &[&str]) -> Snapshot {
        names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                Product::from_record(json!({
                    "qr_uuid": format!("a{i:07}-1111-4111-8111-111111111111"),
                    "nombre": name,
                }))
            })
            .collect()
    }

    fn unavailable() -> FetchError {
        FetchError::Status {
            url: "fake://catalog".into(),
            status: 503,
            preview: String::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn empty_cache_fetches_on_first_use() {
        let (cache, calls) = fake(Duration::ZERO, |_| Ok(catalog(&["Widget"])));

        let snapshot = cache.get_snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let status = cache.status().await;
        assert_eq!(status.products, 1);
        assert!(status.last_refresh.is_some());
        assert!(status.last_failure.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_snapshot_is_served_without_fetching() {
        let (cache, calls) = fake(Duration::ZERO, |_| Ok(catalog(&["Widget"])));
        cache.get_snapshot().await;

        tokio::time::advance(TTL - Duration::from_millis(1)).await;
        assert!(matches!(cache.refresh_if_stale().await, RefreshOutcome::Fresh));
        cache.get_snapshot().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_is_due_one_interval_after_the_fetch_began() {
        let (cache, calls) = fake(Duration::from_millis(50), |_| Ok(catalog(&["Widget"])));
        cache.get_snapshot().await;

        // The fetch took 50ms; the interval still counts from when it started.
        tokio::time::advance(TTL - Duration::from_millis(50)).await;
        assert!(cache.refresh_if_stale().await.fetched());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_are_judged_and_stamped_at_the_given_instant() {
        let (cache, calls) = fake(Duration::ZERO, |_| Ok(catalog(&["Widget"])));
        let start = Instant::now();

        assert!(cache.refresh_if_stale_at(start).await.fetched());
        assert_eq!(cache.status().await.last_refresh, Some(start));

        assert!(matches!(
            cache.refresh_if_stale_at(start + TTL - Duration::from_millis(1)).await,
            RefreshOutcome::Fresh
        ));
        assert!(cache.refresh_if_stale_at(start + TTL).await.fetched());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_snapshot_is_replaced() {
        let (cache, calls) = fake(Duration::ZERO, |call| {
            Ok(if call == 0 {
                catalog(&["Widget"])
            } else {
                catalog(&["Widget", "Gadget"])
            })
        });
        let before = cache.get_snapshot().await;

        tokio::time::advance(TTL + Duration::from_millis(1)).await;
        let after = cache.get_snapshot().await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(before.len(), 1, "readers keep the snapshot they were handed");
        assert_eq!(after.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_catalog_is_refetched_on_next_use() {
        let (cache, calls) = fake(Duration::ZERO, |_| Ok(Snapshot::empty()));

        assert!(matches!(
            cache.refresh_if_stale().await,
            RefreshOutcome::Refreshed { products: 0 }
        ));
        assert!(cache.status().await.last_refresh.is_some());

        assert!(cache.refresh_if_stale().await.fetched());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_previous_snapshot_and_refresh_time() {
        let (cache, _calls) = fake(Duration::ZERO, |call| {
            if call == 0 {
                Ok(catalog(&["Widget", "Gadget"]))
            } else {
                Err(unavailable())
            }
        });
        cache.get_snapshot().await;
        tokio::time::advance(TTL * 2).await;

        let snapshot_before = cache.snapshot().await;
        let status_before = cache.status().await;

        assert!(matches!(
            cache.refresh_if_stale().await,
            RefreshOutcome::Failed(FetchError::Status { status: 503, .. })
        ));

        let snapshot_after = cache.snapshot().await;
        let status_after = cache.status().await;
        assert_eq!(*snapshot_before, *snapshot_after);
        assert_eq!(status_before.last_refresh, status_after.last_refresh);
        assert_eq!(status_after.products, 2);
        assert!(status_after.last_failure.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_backs_off_for_one_interval() {
        let (cache, calls) = fake(Duration::ZERO, |call| {
            if call == 0 {
                Err(unavailable())
            } else {
                Ok(catalog(&["Widget"]))
            }
        });

        assert!(cache.get_snapshot().await.is_empty());
        assert!(matches!(
            cache.refresh_if_stale().await,
            RefreshOutcome::BackingOff
        ));

        tokio::time::advance(TTL - Duration::from_millis(1)).await;
        assert!(cache.get_snapshot().await.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get_snapshot().await.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.status().await.last_failure.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_fetch() {
        let (cache, calls) = fake(Duration::from_millis(100), |_| Ok(catalog(&["Widget"])));
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_snapshot().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_failed_fetch() {
        let (cache, calls) = fake(Duration::from_millis(100), |_| Err(unavailable()));
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.refresh_if_stale().await })
            })
            .collect();

        let mut fetched = 0;
        for handle in handles {
            let outcome = handle.await.unwrap();
            if outcome.fetched() {
                fetched += 1;
            }
        }
        assert_eq!(fetched, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.snapshot().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_longer_than_interval_is_not_duplicated() {
        let (cache, calls) = fake(TTL * 3, |_| Ok(catalog(&["Widget"])));
        let cache = Arc::new(cache);

        let first = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.refresh_if_stale().await }
        });
        // Let the first fetch start, then pile on while it is still in flight.
        tokio::time::sleep(TTL * 2).await;
        let second = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.refresh_if_stale().await }
        });

        assert!(matches!(
            first.await.unwrap(),
            RefreshOutcome::Refreshed { products: 1 }
        ));
        assert!(matches!(second.await.unwrap(), RefreshOutcome::Coalesced));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
