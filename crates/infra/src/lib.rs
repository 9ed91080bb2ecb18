//! Proplink Infrastructure Library
//!
//! Everything that talks to the Listing Service or holds process state: the
//! upstream client, the response cache, request coalescing, the cached
//! query client, pagination aggregation and logging setup.

use proplink_core::{PaginationConfig, ProplinkConfig, Result};
use std::sync::Arc;

pub mod cache;
pub mod dedup;
pub mod logger;
pub mod pagination;
pub mod query;
pub mod upstream;

pub use cache::CacheStore;
pub use dedup::InFlightRegistry;
pub use logger::*;
pub use pagination::{Aggregated, PaginationAggregator};
pub use query::{CachedQueryClient, QueryOptions, ResponseCache};
pub use upstream::{ListingFetcher, ListingServiceClient};

/// Infrastructure version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The long-lived backend shared by every request handler
#[derive(Debug, Clone)]
pub struct ListingBackend {
    pub client: CachedQueryClient,
    pub aggregator: PaginationAggregator,
    pub pagination: PaginationConfig,
    credential_configured: bool,
}

impl ListingBackend {
    /// Assemble a backend over any fetcher
    pub fn new(
        fetcher: Arc<dyn ListingFetcher>,
        config: &ProplinkConfig,
        credential_configured: bool,
    ) -> Self {
        let client = CachedQueryClient::new(fetcher, config.cache.clone());
        let aggregator =
            PaginationAggregator::new(client.clone(), config.pagination.max_concurrency);

        Self {
            client,
            aggregator,
            pagination: config.pagination.clone(),
            credential_configured,
        }
    }

    pub fn credential_configured(&self) -> bool {
        self.credential_configured
    }

    pub async fn health(&self) -> HealthStatus {
        HealthStatus {
            credential_configured: self.credential_configured,
            cache_entries: self.client.cache_size().await,
            in_flight: self.client.in_flight(),
        }
    }
}

/// Build the production backend from configuration
///
/// Must run inside a Tokio runtime: when caching is enabled with a sweep
/// interval, a background sweeper is spawned for the life of the process.
pub fn build_backend(config: &ProplinkConfig) -> Result<ListingBackend> {
    tracing::info!("Initializing Proplink infrastructure v{}", VERSION);

    let upstream = ListingServiceClient::new(config.listing_service.clone())?;
    let configured = upstream.is_configured();
    let backend = ListingBackend::new(Arc::new(upstream), config, configured);

    if config.cache.enabled {
        if let Some(every) = config.cache.sweep_interval() {
            backend.client.cache().spawn_sweeper(every);
            tracing::debug!("Cache sweeper running every {:?}", every);
        }
    }

    tracing::info!(
        cache_enabled = config.cache.enabled,
        ttl_seconds = config.cache.ttl_seconds,
        credential_configured = configured,
        "Listing backend ready"
    );

    Ok(backend)
}

/// Point-in-time view of backend health
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthStatus {
    pub credential_configured: bool,
    pub cache_entries: usize,
    pub in_flight: usize,
}

impl HealthStatus {
    /// Without a credential every upstream request fails
    pub fn is_healthy(&self) -> bool {
        self.credential_configured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_backend_without_credential() {
        let config = ProplinkConfig::default();
        let backend = build_backend(&config).unwrap();

        let status = backend.health().await;
        assert!(!status.credential_configured);
        assert!(!status.is_healthy());
        assert_eq!(status.cache_entries, 0);
    }

    #[tokio::test]
    async fn test_build_backend_with_credential() {
        let mut config = ProplinkConfig::default();
        config.listing_service.api_key = Some("secret".to_string());

        let backend = build_backend(&config).unwrap();
        assert!(backend.credential_configured());
        assert!(backend.health().await.is_healthy());
        assert_eq!(backend.pagination, config.pagination);
    }

    #[tokio::test]
    async fn test_blank_credential_is_not_configured() {
        let mut config = ProplinkConfig::default();
        config.listing_service.api_key = Some("   ".to_string());

        let backend = build_backend(&config).unwrap();
        assert!(!backend.credential_configured());
    }
}
