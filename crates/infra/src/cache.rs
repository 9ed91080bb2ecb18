//! In-memory TTL cache for Listing Service responses
//!
//! Entries live for the lifetime of the process at most. Every entry shares
//! the one configured time-to-live; an expired entry is never returned and is
//! evicted during the cache's pending maintenance, which the background
//! sweeper runs periodically.

use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Process-wide key/value store with a single time-to-live
///
/// Values are cloned out on `get`, so callers typically store `Arc`s.
/// Cloning the store is cheap and every clone shares the same entries.
#[derive(Clone)]
pub struct CacheStore<V> {
    entries: Cache<String, V>,
    ttl: Duration,
}

impl<V> std::fmt::Debug for CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<V> CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty store whose entries expire `ttl` after insertion
    ///
    /// # Arguments
    ///
    /// * `ttl` - Time-to-live applied to every entry
    ///
    /// # Examples
    ///
    /// ```
    /// use proplink_infra::CacheStore;
    /// use std::time::Duration;
    ///
    /// let cache: CacheStore<u32> = CacheStore::new(Duration::from_secs(3600));
    /// assert_eq!(cache.ttl(), Duration::from_secs(3600));
    /// assert_eq!(cache.entry_count(), 0);
    /// ```
    pub fn new(ttl: Duration) -> Self {
        let entries = Cache::builder().time_to_live(ttl).build();
        Self { entries, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a live entry
    pub async fn get(&self, key: &str) -> Option<V> {
        let value = self.entries.get(key).await;
        if value.is_some() {
            trace!("Cache HIT for '{}'", key);
        } else {
            trace!("Cache MISS for '{}'", key);
        }
        value
    }

    /// Store `value` under `key`, replacing any previous entry and restarting
    /// its time-to-live
    pub async fn set(&self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), value).await;
    }

    /// Return the live entry for `key`, or run `init` and store its output
    ///
    /// Concurrent callers missing on the same key wait for a single `init`
    /// instead of each running their own. A failed `init` stores nothing and
    /// its error is handed to every waiting caller.
    ///
    /// # Arguments
    ///
    /// * `key` - Cache key
    /// * `init` - Future producing the value on a miss
    ///
    /// # Errors
    ///
    /// Returns the shared error of the `init` that failed.
    pub async fn get_or_try_insert_with<F, E>(&self, key: String, init: F) -> Result<V, Arc<E>>
    where
        F: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        self.entries.try_get_with(key, init).await
    }

    /// Remove a single entry
    pub async fn invalidate(&self, key: &str) {
        self.entries.invalidate(key).await;
    }

    /// Remove every entry regardless of expiry; returns how many were live
    pub async fn clear(&self) -> usize {
        let removed = self.size().await;
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
        debug!("Cleared {} cache entries", removed);
        removed
    }

    /// Number of live entries, after running pending maintenance
    pub async fn size(&self) -> usize {
        self.entries.run_pending_tasks().await;
        self.entry_count()
    }

    /// Entry count as of the last maintenance run; may include entries that
    /// expired since
    pub fn entry_count(&self) -> usize {
        usize::try_from(self.entries.entry_count()).unwrap_or(usize::MAX)
    }

    /// Evict expired entries now
    pub async fn purge_expired(&self) {
        self.entries.run_pending_tasks().await;
    }

    /// Periodically evict expired entries; runs until the returned handle is
    /// aborted
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let before = store.entry_count();
                store.purge_expired().await;
                let purged = before.saturating_sub(store.entry_count());
                if purged > 0 {
                    debug!("Cache sweep purged {} expired entries", purged);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(60);
    const SHORT_TTL: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_entry_visible_until_ttl_elapses() {
        let cache = CacheStore::new(SHORT_TTL);
        cache.set("properties.json?limit=10", 42u32).await;
        assert_eq!(cache.get("properties.json?limit=10").await, Some(42));

        tokio::time::sleep(SHORT_TTL * 2).await;
        assert_eq!(cache.get("properties.json?limit=10").await, None);
    }

    #[tokio::test]
    async fn test_set_replaces_entry() {
        let cache = CacheStore::new(TTL);
        cache.set("k", "old").await;
        cache.set("k", "new").await;

        assert_eq!(cache.get("k").await, Some("new"));
        assert_eq!(cache.size().await, 1);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let cache = CacheStore::new(TTL);
        cache.set("a", 1u32).await;
        cache.set("b", 2u32).await;

        assert_eq!(cache.clear().await, 2);
        assert_eq!(cache.size().await, 0);
        assert_eq!(cache.get("a").await, None);
    }

    #[tokio::test]
    async fn test_invalidate_single_key() {
        let cache = CacheStore::new(TTL);
        cache.set("a", 1u32).await;
        cache.set("b", 2u32).await;

        cache.invalidate("a").await;
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, Some(2));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = CacheStore::new(SHORT_TTL);
        cache.set("a", 1u32).await;
        cache.set("b", 2u32).await;
        assert_eq!(cache.size().await, 2);

        tokio::time::sleep(SHORT_TTL * 2).await;
        cache.purge_expired().await;

        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_sweeper_purges_in_background() {
        let cache = CacheStore::new(SHORT_TTL);
        cache.set("short", 1u32).await;
        cache.purge_expired().await;
        assert_eq!(cache.entry_count(), 1);

        let handle = cache.spawn_sweeper(Duration::from_millis(50));
        tokio::time::sleep(SHORT_TTL * 4).await;

        assert_eq!(cache.entry_count(), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_concurrent_misses_run_init_once() {
        let cache: CacheStore<u32> = CacheStore::new(TTL);
        let runs = Arc::new(AtomicUsize::new(0));

        let lookups = (0..5).map(|_| {
            let runs = Arc::clone(&runs);
            cache.get_or_try_insert_with("k".to_string(), async move {
                runs.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, String>(7)
            })
        });
        let results = futures::future::join_all(lookups).await;

        assert!(results.iter().all(|r| *r.as_ref().unwrap() == 7));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_init_is_not_stored() {
        let cache: CacheStore<u32> = CacheStore::new(TTL);

        let err = cache
            .get_or_try_insert_with("k".to_string(), async { Err::<u32, _>("boom".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err.as_str(), "boom");
        assert_eq!(cache.size().await, 0);

        let value = cache
            .get_or_try_insert_with("k".to_string(), async { Ok::<_, String>(3) })
            .await
            .unwrap();
        assert_eq!(value, 3);
    }
}
