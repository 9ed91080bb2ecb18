//! In-flight request registry
//!
//! Concurrent cache misses for the same key join one outstanding upstream
//! fetch instead of each issuing their own. Coalescing happens in the
//! response cache; the registry runs each lookup on its own task so a fetch
//! that has been issued always settles and stores its result, even when
//! every caller waiting on it has gone away.

use crate::query::ResponseCache;
use proplink_core::{ProplinkError, Result};
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Tracks upstream fetches that have been issued and not yet settled
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    active: Arc<AtomicUsize>,
}

/// Decrements the in-flight count when a fetch settles or is torn down
struct ActiveFetch(Arc<AtomicUsize>);

impl ActiveFetch {
    fn enter(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(active))
    }
}

impl Drop for ActiveFetch {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `key` through `cache`, running `fetch` on a miss
    ///
    /// Callers missing on the same key at the same time share one `fetch`.
    /// The lookup runs on a detached task: dropping the returned future stops
    /// the wait, not the fetch.
    ///
    /// # Arguments
    ///
    /// * `cache` - Response cache the result is stored in
    /// * `key` - Cache key of the request
    /// * `fetch` - Upstream request to run if no live entry exists
    ///
    /// # Returns
    ///
    /// Returns the cached or freshly fetched body.
    ///
    /// # Errors
    ///
    /// Returns the fetch error, shared with every caller that waited on it,
    /// or `InvalidState` if the fetch task panicked.
    pub async fn resolve<F>(&self, cache: &ResponseCache, key: String, fetch: F) -> Result<Arc<Value>>
    where
        F: Future<Output = Result<Value>> + Send + 'static,
    {
        let cache = cache.clone();
        let active = Arc::clone(&self.active);
        let lookup_key = key.clone();

        let lookup = tokio::spawn(async move {
            cache
                .get_or_try_insert_with(lookup_key, async move {
                    let _active = ActiveFetch::enter(&active);
                    fetch.await.map(Arc::new)
                })
                .await
        });

        match lookup.await {
            Ok(result) => result.map_err(ProplinkError::from_shared),
            Err(e) => {
                warn!("Fetch task for '{}' did not complete: {}", key, e);
                Err(ProplinkError::invalid_state(format!(
                    "fetch task for '{}' did not complete",
                    key
                )))
            }
        }
    }

    /// Number of fetches currently in flight
    pub fn len(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
