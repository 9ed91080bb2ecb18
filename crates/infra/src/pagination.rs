//! Pagination aggregator
//!
//! The Listing Service only serves `limit`/`offset` pages. Filters it does
//! not understand need the whole catalog; lookups by id need a bounded scan.

use crate::query::{CachedQueryClient, QueryOptions};
use futures::stream::{self, StreamExt, TryStreamExt};
use proplink_core::{Page, QueryParams, Resource, Result};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Records gathered across several upstream pages
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated<T> {
    pub records: Vec<T>,
    /// Upstream `count` as reported by the first page
    pub total_count: usize,
    /// True when the hard cap stopped collection before `total_count`
    pub truncated: bool,
}

impl<T> Aggregated<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Pages through the cached query client
#[derive(Debug, Clone)]
pub struct PaginationAggregator {
    client: CachedQueryClient,
    max_concurrency: usize,
}

impl PaginationAggregator {
    pub fn new(client: CachedQueryClient, max_concurrency: usize) -> Self {
        Self {
            client,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn client(&self) -> &CachedQueryClient {
        &self.client
    }

    async fn page<T: Resource>(
        &self,
        base: &QueryParams,
        offset: usize,
        limit: usize,
        options: QueryOptions,
    ) -> Result<Page<T>> {
        let params = base.clone().with("limit", limit).with("offset", offset);
        self.client.query_page::<T>(&params, options).await
    }

    /// Collect every record matching `base`, up to `hard_cap` records
    ///
    /// After the first page reveals the total, the remaining pages are
    /// fetched with at most `max_concurrency` requests outstanding and
    /// concatenated in offset order. Some deployments of the Listing Service
    /// cap their page size below `page_size`; when the first page comes back
    /// short while `count` says more exist, its length becomes the stride.
    ///
    /// # Arguments
    ///
    /// * `base` - Upstream parameters shared by every page
    /// * `page_size` - Records requested per page
    /// * `hard_cap` - Most records ever collected
    /// * `options` - Cache options applied to every page
    ///
    /// # Returns
    ///
    /// Returns the records with `truncated` set whenever fewer than the
    /// upstream `count` were collected
    ///
    /// # Errors
    ///
    /// Any failed page fails the whole call.
    pub async fn aggregate_all<T: Resource>(
        &self,
        base: &QueryParams,
        page_size: usize,
        hard_cap: usize,
        options: QueryOptions,
    ) -> Result<Aggregated<T>> {
        let page_size = page_size.max(1);
        let first = self.page::<T>(base, 0, page_size, options).await?;
        let total_count = first.count;
        let target = total_count.min(hard_cap);
        let stride = first.records.len();
        let mut records = first.records;

        if stride > 0 && records.len() < target {
            if stride < page_size {
                debug!(
                    endpoint = T::ENDPOINT,
                    requested = page_size,
                    served = stride,
                    "Listing Service caps its page size"
                );
            }
            let offsets: Vec<usize> = (stride..target).step_by(stride).collect();
            debug!(
                endpoint = T::ENDPOINT,
                total_count,
                pages = offsets.len() + 1,
                "Aggregating catalog"
            );

            let rest: Vec<Page<T>> = stream::iter(offsets)
                .map(|offset| self.page::<T>(base, offset, page_size, options))
                .buffered(self.max_concurrency)
                .try_collect()
                .await?;

            for page in rest {
                records.extend(page.records);
            }
        }

        records.truncate(hard_cap);
        let truncated = records.len() < total_count;
        if truncated {
            warn!(
                endpoint = T::ENDPOINT,
                collected = records.len(),
                total_count,
                hard_cap,
                "Catalog aggregation incomplete"
            );
        }

        Ok(Aggregated {
            records,
            total_count,
            truncated,
        })
    }

    /// Scan pages in order, keeping records whose id is in `target_ids`
    ///
    /// Stops once every target is found, the catalog is exhausted, or
    /// `hard_cap` records have been scanned. The cap always holds: each
    /// request asks for no more than what is left under it. Pages shorter
    /// than requested do not end the scan while `count` says more exist.
    ///
    /// # Arguments
    ///
    /// * `base` - Upstream parameters shared by every page
    /// * `target_ids` - Ids to look for
    /// * `batch_size` - Records requested per page
    /// * `hard_cap` - Most records ever scanned
    /// * `options` - Cache options applied to every page
    ///
    /// # Returns
    ///
    /// Returns the matching records in catalog order, each id at most once;
    /// `truncated` is set when the cap stopped the scan with targets missing
    pub async fn aggregate_until_match<T: Resource>(
        &self,
        base: &QueryParams,
        target_ids: &HashSet<i64>,
        batch_size: usize,
        hard_cap: usize,
        options: QueryOptions,
    ) -> Result<Aggregated<T>> {
        let batch_size = batch_size.max(1);
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        let mut scanned = 0;
        let mut total_count = 0;

        while scanned < hard_cap && seen.len() < target_ids.len() {
            let limit = batch_size.min(hard_cap - scanned);
            let page = self.page::<T>(base, scanned, limit, options).await?;
            total_count = page.count;

            let fetched = page.records.len();
            scanned += fetched;
            for record in page.records {
                let id = record.id();
                if target_ids.contains(&id) && seen.insert(id) {
                    found.push(record);
                }
            }

            if fetched == 0 || scanned >= total_count {
                break;
            }
        }

        let truncated = seen.len() < target_ids.len() && scanned >= hard_cap;
        debug!(
            endpoint = T::ENDPOINT,
            scanned,
            found = found.len(),
            wanted = target_ids.len(),
            "Until-match scan finished"
        );

        Ok(Aggregated {
            records: found,
            total_count,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::ListingFetcher;
    use async_trait::async_trait;
    use proplink_core::{CacheConfig, ErrorCategory, Listing, ProplinkError};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Simulated catalog of `total` listings with ids `1..=total`
    struct Catalog {
        total: usize,
        calls: AtomicUsize,
        fail_at_offset: Option<usize>,
        max_page: Option<usize>,
    }

    impl Catalog {
        fn new(total: usize) -> Self {
            Self {
                total,
                calls: AtomicUsize::new(0),
                fail_at_offset: None,
                max_page: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn usize_param(params: &QueryParams, key: &str) -> usize {
        params
            .get(key)
            .and_then(|v| v.to_string().parse().ok())
            .unwrap_or(0)
    }

    #[async_trait]
    impl ListingFetcher for Catalog {
        async fn fetch(&self, _endpoint: &str, params: &QueryParams) -> proplink_core::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let offset = usize_param(params, "offset");
            let limit = usize_param(params, "limit");
            let limit = self.max_page.map_or(limit, |max| limit.min(max));

            if self.fail_at_offset == Some(offset) {
                return Err(ProplinkError::upstream(502, "bad gateway"));
            }

            let end = (offset + limit).min(self.total);
            let records: Vec<Value> = (offset.min(end)..end)
                .map(|i| json!({"id": i as i64 + 1}))
                .collect();
            Ok(json!({"properties": records, "count": self.total}))
        }
    }

    fn aggregator(catalog: Arc<Catalog>) -> PaginationAggregator {
        let client = CachedQueryClient::new(catalog, CacheConfig::default());
        PaginationAggregator::new(client, 4)
    }

    fn ids(records: &[Listing]) -> Vec<i64> {
        records.iter().map(|l| l.id).collect()
    }

    #[tokio::test]
    async fn test_aggregate_all_collects_every_page_in_order() {
        for total in [0usize, 1, 99, 100, 101, 250, 300] {
            let catalog = Arc::new(Catalog::new(total));
            let aggregator = aggregator(catalog.clone());

            let result: Aggregated<Listing> = aggregator
                .aggregate_all(&QueryParams::new(), 100, 5000, QueryOptions::default())
                .await
                .unwrap();

            assert_eq!(result.len(), total, "total {}", total);
            assert_eq!(ids(&result.records), (1..=total as i64).collect::<Vec<_>>());
            assert_eq!(result.total_count, total);
            assert!(!result.truncated);
            assert_eq!(catalog.calls(), total.div_ceil(100).max(1));
        }
    }

    #[tokio::test]
    async fn test_aggregate_all_stops_at_hard_cap() {
        let catalog = Arc::new(Catalog::new(1000));
        let aggregator = aggregator(catalog.clone());

        let result: Aggregated<Listing> = aggregator
            .aggregate_all(&QueryParams::new(), 100, 250, QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(result.len(), 250);
        assert_eq!(result.total_count, 1000);
        assert!(result.truncated);
        assert_eq!(catalog.calls(), 3);
    }

    #[tokio::test]
    async fn test_aggregate_all_fails_when_any_page_fails() {
        let catalog = Arc::new(Catalog {
            fail_at_offset: Some(200),
            ..Catalog::new(450)
        });
        let aggregator = aggregator(catalog);

        let err = aggregator
            .aggregate_all::<Listing>(&QueryParams::new(), 100, 5000, QueryOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Upstream);
        assert!(err.to_string().contains("bad gateway"));
    }

    #[tokio::test]
    async fn test_until_match_respects_hard_cap() {
        let catalog = Arc::new(Catalog::new(10_000));
        let aggregator = aggregator(catalog.clone());
        let targets: HashSet<i64> = [9_999, 10_000].into_iter().collect();

        let result: Aggregated<Listing> = aggregator
            .aggregate_until_match(&QueryParams::new(), &targets, 100, 300, QueryOptions::default())
            .await
            .unwrap();

        assert!(result.is_empty());
        assert!(result.truncated);
        assert!(catalog.calls() <= 3);
    }

    #[tokio::test]
    async fn test_until_match_stops_once_all_found() {
        let catalog = Arc::new(Catalog::new(1000));
        let aggregator = aggregator(catalog.clone());
        let targets: HashSet<i64> = [150, 3].into_iter().collect();

        let result: Aggregated<Listing> = aggregator
            .aggregate_until_match(&QueryParams::new(), &targets, 100, 1000, QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(ids(&result.records), vec![3, 150]);
        assert!(!result.truncated);
        assert_eq!(catalog.calls(), 2);
    }

    #[tokio::test]
    async fn test_until_match_stops_when_catalog_exhausted() {
        let catalog = Arc::new(Catalog::new(120));
        let aggregator = aggregator(catalog.clone());
        let targets: HashSet<i64> = [5, 9_000].into_iter().collect();

        let result: Aggregated<Listing> = aggregator
            .aggregate_until_match(&QueryParams::new(), &targets, 100, 1000, QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(ids(&result.records), vec![5]);
        assert!(!result.truncated);
        assert_eq!(catalog.calls(), 2);
    }

    #[tokio::test]
    async fn test_aggregate_all_follows_capped_page_size() {
        let catalog = Arc::new(Catalog {
            max_page: Some(50),
            ..Catalog::new(220)
        });
        let aggregator = aggregator(catalog.clone());

        let result: Aggregated<Listing> = aggregator
            .aggregate_all(&QueryParams::new(), 100, 5000, QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(ids(&result.records), (1..=220).collect::<Vec<_>>());
        assert_eq!(result.total_count, 220);
        assert!(!result.truncated);
        assert_eq!(catalog.calls(), 5);
    }

    #[tokio::test]
    async fn test_aggregate_all_capped_pages_respect_hard_cap() {
        let catalog = Arc::new(Catalog {
            max_page: Some(50),
            ..Catalog::new(220)
        });
        let aggregator = aggregator(catalog.clone());

        let result: Aggregated<Listing> = aggregator
            .aggregate_all(&QueryParams::new(), 100, 120, QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(ids(&result.records), (1..=120).collect::<Vec<_>>());
        assert!(result.truncated);
        assert_eq!(catalog.calls(), 3);
    }

    #[tokio::test]
    async fn test_until_match_continues_past_capped_pages() {
        let catalog = Arc::new(Catalog {
            max_page: Some(50),
            ..Catalog::new(220)
        });
        let aggregator = aggregator(catalog.clone());
        let targets: HashSet<i64> = [180].into_iter().collect();

        let result: Aggregated<Listing> = aggregator
            .aggregate_until_match(&QueryParams::new(), &targets, 100, 1000, QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(ids(&result.records), vec![180]);
        assert!(!result.truncated);
        assert_eq!(catalog.calls(), 4);
    }
}
