//! Cached query client
//!
//! Facade over the upstream fetcher, the response cache and the in-flight
//! registry. A query is served from cache while its entry is live; a miss
//! fetches once (concurrent misses share the fetch), stores the result with
//! the global TTL and returns it. Failures are never cached.

use crate::cache::CacheStore;
use crate::dedup::InFlightRegistry;
use crate::upstream::ListingFetcher;
use proplink_core::{CacheConfig, Page, QueryParams, Resource, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

/// Cache of raw upstream responses keyed by cache key
pub type ResponseCache = CacheStore<Arc<Value>>;

/// Per-call query options
///
/// # Examples
///
/// ```
/// use proplink_infra::QueryOptions;
///
/// assert!(!QueryOptions::default().skip_cache);
/// assert!(QueryOptions::skip_cache(true).skip_cache);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Go straight to the Listing Service; neither read nor write the cache
    pub skip_cache: bool,
}

impl QueryOptions {
    pub fn skip_cache(skip_cache: bool) -> Self {
        Self { skip_cache }
    }
}

/// Listing Service client with response caching and request coalescing
#[derive(Clone)]
pub struct CachedQueryClient {
    fetcher: Arc<dyn ListingFetcher>,
    cache: ResponseCache,
    in_flight: Arc<InFlightRegistry>,
    settings: CacheConfig,
}

impl std::fmt::Debug for CachedQueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedQueryClient")
            .field("cache", &self.cache)
            .field("in_flight", &self.in_flight.len())
            .field("settings", &self.settings)
            .finish()
    }
}

impl CachedQueryClient {
    /// Create a client with its own empty cache
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Upstream adapter used on cache misses
    /// * `settings` - Cache settings; `settings.ttl()` applies to every entry
    ///
    /// # Returns
    ///
    /// Returns a client whose cache starts empty
    pub fn new(fetcher: Arc<dyn ListingFetcher>, settings: CacheConfig) -> Self {
        let cache = CacheStore::new(settings.ttl());
        Self::with_cache(fetcher, cache, settings)
    }

    /// Create a client over an existing cache store
    pub fn with_cache(
        fetcher: Arc<dyn ListingFetcher>,
        cache: ResponseCache,
        settings: CacheConfig,
    ) -> Self {
        Self {
            fetcher,
            cache,
            in_flight: Arc::new(InFlightRegistry::new()),
            settings,
        }
    }

    /// Fetch `endpoint` with `params`, serving from cache when possible
    ///
    /// A live entry is returned as is. On a miss the Listing Service is
    /// queried once, however many callers miss on the same key at the same
    /// time, and a successful body is stored for the configured TTL. An
    /// issued fetch runs to completion even if this call is dropped.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Upstream endpoint, for example `properties.json`
    /// * `params` - Query parameters; their order does not affect the key
    /// * `options` - `skip_cache` bypasses both cache read and write
    ///
    /// # Returns
    ///
    /// Returns the decoded upstream body
    ///
    /// # Errors
    ///
    /// Returns the upstream failure; failures are never cached.
    pub async fn query(
        &self,
        endpoint: &str,
        params: &QueryParams,
        options: QueryOptions,
    ) -> Result<Arc<Value>> {
        if options.skip_cache || !self.settings.enabled {
            trace!("Bypassing cache for {}", endpoint);
            return self.fetcher.fetch(endpoint, params).await.map(Arc::new);
        }

        let key = params.cache_key(endpoint);
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let fetcher = Arc::clone(&self.fetcher);
        let endpoint = endpoint.to_string();
        let params = params.clone();
        self.in_flight
            .resolve(&self.cache, key, async move {
                fetcher.fetch(&endpoint, &params).await
            })
            .await
    }

    /// Fetch one page of a resource collection
    ///
    /// # Errors
    ///
    /// Fails like [`CachedQueryClient::query`], or with `MalformedResponse`
    /// when the body is not a page envelope for `T`.
    pub async fn query_page<T: Resource>(
        &self,
        params: &QueryParams,
        options: QueryOptions,
    ) -> Result<Page<T>> {
        let value = self.query(T::ENDPOINT, params, options).await?;
        Page::from_value(&value)
    }

    /// Drop every cached response; returns how many entries were removed
    pub async fn clear_cache(&self) -> usize {
        self.cache.clear().await
    }

    pub async fn cache_size(&self) -> usize {
        self.cache.size().await
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn settings(&self) -> &CacheConfig {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proplink_core::{ErrorCategory, Listing, ProplinkError};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts fetches and answers with the request's offset
    #[derive(Default)]
    struct SpyFetcher {
        calls: AtomicUsize,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ListingFetcher for SpyFetcher {
        async fn fetch(&self, _endpoint: &str, params: &QueryParams) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(ProplinkError::upstream(500, "upstream exploded"));
            }
            let offset = params.get("offset").map(|v| v.to_string());
            Ok(json!({"properties": [{"id": 1}], "count": 1, "offset": offset}))
        }
    }

    impl SpyFetcher {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn client(fetcher: Arc<SpyFetcher>) -> CachedQueryClient {
        CachedQueryClient::new(fetcher, CacheConfig::default())
    }

    #[tokio::test]
    async fn test_second_query_is_cache_hit() {
        let fetcher = Arc::new(SpyFetcher::default());
        let client = client(fetcher.clone());
        let params = QueryParams::new().with("limit", 10usize);

        client
            .query("properties.json", &params, QueryOptions::default())
            .await
            .unwrap();
        client
            .query("properties.json", &params, QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(client.cache_size().await, 1);
    }

    #[tokio::test]
    async fn test_reordered_params_share_cache_entry() {
        let fetcher = Arc::new(SpyFetcher::default());
        let client = client(fetcher.clone());

        let a = QueryParams::new().with("limit", 10usize).with("offset", 0usize);
        let b = QueryParams::new().with("offset", 0usize).with("limit", 10usize);

        client.query("properties.json", &a, QueryOptions::default()).await.unwrap();
        client.query("properties.json", &b, QueryOptions::default()).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_skip_cache_always_fetches() {
        let fetcher = Arc::new(SpyFetcher::default());
        let client = client(fetcher.clone());
        let params = QueryParams::new();

        for _ in 0..2 {
            client
                .query("properties.json", &params, QueryOptions::skip_cache(true))
                .await
                .unwrap();
        }

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(client.cache_size().await, 0);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_fetches() {
        let fetcher = Arc::new(SpyFetcher::default());
        let settings = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let client = CachedQueryClient::new(fetcher.clone(), settings);

        for _ in 0..3 {
            client
                .query("properties.json", &QueryParams::new(), QueryOptions::default())
                .await
                .unwrap();
        }

        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let fetcher = Arc::new(SpyFetcher {
            fail: true,
            ..Default::default()
        });
        let client = client(fetcher.clone());

        for _ in 0..2 {
            let err = client
                .query("properties.json", &QueryParams::new(), QueryOptions::default())
                .await
                .unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Upstream);
        }

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(client.cache_size().await, 0);
        assert_eq!(client.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let fetcher = Arc::new(SpyFetcher::default());
        let client = client(fetcher.clone());
        let params = QueryParams::new();

        client.query("brokers.json", &params, QueryOptions::default()).await.unwrap();
        assert_eq!(client.clear_cache().await, 1);
        client.query("brokers.json", &params, QueryOptions::default()).await.unwrap();

        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let fetcher = Arc::new(SpyFetcher::default());
        let cache = CacheStore::new(Duration::from_millis(100));
        let client = CachedQueryClient::with_cache(fetcher.clone(), cache, CacheConfig::default());
        let params = QueryParams::new();

        client.query("properties.json", &params, QueryOptions::default()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        client.query("properties.json", &params, QueryOptions::default()).await.unwrap();

        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let fetcher = Arc::new(SpyFetcher {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let client = client(fetcher.clone());
        let params = QueryParams::new().with("limit", 100usize);

        let results = futures::future::join_all(
            (0..5).map(|_| client.query("properties.json", &params, QueryOptions::default())),
        )
        .await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(client.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_abandon_fetch() {
        let fetcher = Arc::new(SpyFetcher {
            delay: Some(Duration::from_millis(100)),
            ..Default::default()
        });
        let client = client(fetcher.clone());
        let params = QueryParams::new().with("offset", 0usize);

        let gave_up = tokio::time::timeout(
            Duration::from_millis(10),
            client.query("properties.json", &params, QueryOptions::default()),
        )
        .await;
        assert!(gave_up.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(client.in_flight(), 0);
        assert_eq!(client.cache_size().await, 1);

        client
            .query("properties.json", &params, QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_query_page_decodes_envelope() {
        let fetcher = Arc::new(SpyFetcher::default());
        let client = client(fetcher);

        let page: Page<Listing> = client
            .query_page(&QueryParams::new(), QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(page.count, 1);
        assert_eq!(page.records[0].id, 1);
    }
}
