//! Listing Service client for Proplink infrastructure
//!
//! One call is one authenticated GET. The credential is part of the URL
//! path, so URLs are never logged and transport errors are stripped of them
//! before they travel further.

use async_trait::async_trait;
use proplink_core::{ListingServiceConfig, ProplinkError, QueryParams, Result};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Source of raw Listing Service responses
///
/// The production implementation is [`ListingServiceClient`]; tests plug in
/// simulated upstreams.
#[async_trait]
pub trait ListingFetcher: Send + Sync {
    /// GET `endpoint` with `params` and return the decoded JSON body verbatim
    async fn fetch(&self, endpoint: &str, params: &QueryParams) -> Result<Value>;
}

/// HTTP client for the Listing Service
#[derive(Debug, Clone)]
pub struct ListingServiceClient {
    config: ListingServiceConfig,
    client: reqwest::Client,
}

impl ListingServiceClient {
    /// Create a new Listing Service client
    ///
    /// A missing credential does not fail construction; it is reported loudly
    /// here and then on every fetch as a configuration error.
    pub fn new(config: ListingServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        if config.credential().is_none() {
            warn!(
                "Listing Service API key is not configured; property and broker requests will fail until PROPLINK_LISTING_SERVICE__API_KEY is set"
            );
        }

        Ok(Self { config, client })
    }

    /// True when a credential is available
    pub fn is_configured(&self) -> bool {
        self.config.credential().is_some()
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        let key = self.config.credential().ok_or_else(|| {
            ProplinkError::configuration("Listing Service API key is not configured")
        })?;

        let url = format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            key,
            endpoint.trim_start_matches('/')
        );
        Ok(Url::parse(&url)?)
    }
}

#[async_trait]
impl ListingFetcher for ListingServiceClient {
    async fn fetch(&self, endpoint: &str, params: &QueryParams) -> Result<Value> {
        let url = self.endpoint_url(endpoint)?;

        debug!(endpoint, params = params.len(), "Requesting Listing Service page");

        let response = self
            .client
            .get(url)
            .query(&params.to_query_pairs())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProplinkError::timeout(format!("GET {}", endpoint))
                } else {
                    ProplinkError::network(format!(
                        "Failed to reach Listing Service for {}: {}",
                        endpoint,
                        e.without_url()
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint, status = status.as_u16(), "Listing Service rejected request");
            return Err(ProplinkError::upstream(status.as_u16(), body));
        }

        let body = response.text().await.map_err(|e| {
            ProplinkError::network(format!(
                "Failed to read Listing Service response for {}: {}",
                endpoint,
                e.without_url()
            ))
        })?;

        serde_json::from_str(&body).map_err(|e| {
            ProplinkError::malformed(format!("{} did not return valid JSON: {}", endpoint, e))
        })
    }
}
