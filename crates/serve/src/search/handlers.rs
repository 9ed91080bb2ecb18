//! Listing search handlers
//!
//! # Endpoints
//!
//! - `GET /search` - one page of listings, post-filtered when asked
//! - `GET /saved?ids=1,2,3` - a known set of listings by id
//! - `GET /properties/:id` - a single full listing

use crate::handlers::AppState;
use crate::search::types::{parse_ids, project, ApiError, ListingsResponse, SearchParams};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use proplink_core::{apply, Listing, QueryParams};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Creates the listing routes
pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(handle_search))
        .route("/saved", get(handle_saved))
        .route("/properties/:id", get(handle_property))
}

/// GET search handler
///
/// Without post-filters the Listing Service page for `limit`/`offset` is
/// returned as-is and `count` is the upstream total. With any post-filter the
/// catalog is aggregated, filtered, then sliced, and `count` is the number of
/// matches. When the catalog exceeds the configured hard cap the message
/// says how much of it was scanned.
///
/// # Examples
///
/// ```text
/// GET /search?limit=10&offset=10&saleOrLease=sale
/// GET /search?brokerId=12&fullData=true
/// ```
pub async fn handle_search(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ListingsResponse>, ApiError> {
    let params = SearchParams::from_query(&query);
    let backend = &state.backend;
    let options = params.query_options();

    info!(
        "GET search request: limit={}, offset={}, filtered={}",
        params.limit,
        params.offset,
        !params.filters.is_empty()
    );

    if params.filters.is_empty() {
        let request = params
            .upstream_params()
            .with("limit", params.limit)
            .with("offset", params.offset);
        let page = backend.client.query_page::<Listing>(&request, options).await?;

        return Ok(Json(ListingsResponse::found(
            project(page.records, params.full_data),
            page.count,
        )));
    }

    let catalog = backend
        .aggregator
        .aggregate_all::<Listing>(
            &params.upstream_params(),
            backend.pagination.page_size,
            backend.pagination.catalog_hard_cap,
            options,
        )
        .await?;

    let result = apply(&catalog.records, &params.filters, params.offset, params.limit);
    let scanned = catalog.records.len();
    debug!(
        scanned,
        matched = result.total_matched,
        "Post-filtered catalog"
    );

    let properties = project(result.page, params.full_data);
    if catalog.truncated {
        warn!(
            scanned,
            total = catalog.total_count,
            "Search matched against a partial catalog"
        );
        return Ok(Json(ListingsResponse::partial(
            properties,
            result.total_matched,
            scanned,
            catalog.total_count,
        )));
    }

    Ok(Json(ListingsResponse::found(properties, result.total_matched)))
}

/// GET saved handler
///
/// Looks up the listings named in `ids` with a bounded scan of the catalog,
/// then applies the same filters and pagination as search. Results keep the
/// Listing Service's order. An empty or unusable `ids` list answers at once
/// without contacting the Listing Service.
pub async fn handle_saved(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ListingsResponse>, ApiError> {
    let ids = parse_ids(query.get("ids").map(String::as_str));
    if ids.is_empty() {
        return Ok(Json(ListingsResponse::empty("No saved properties requested")));
    }

    let params = SearchParams::from_query(&query);
    let backend = &state.backend;
    info!("GET saved request: {} ids", ids.len());

    let targets: HashSet<i64> = ids.into_iter().collect();
    let found = backend
        .aggregator
        .aggregate_until_match::<Listing>(
            &QueryParams::new(),
            &targets,
            backend.pagination.saved_batch_size,
            backend.pagination.saved_hard_cap,
            params.query_options(),
        )
        .await?;

    let result = apply(&found.records, &params.filters, params.offset, params.limit);

    Ok(Json(ListingsResponse::found(
        project(result.page, params.full_data),
        result.total_matched,
    )))
}

/// GET a single full listing by id
pub async fn handle_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ListingsResponse>, ApiError> {
    let not_found = || ApiError::NotFound(format!("Property {} not found", id));
    let property_id: i64 = id.trim().parse().map_err(|_| not_found())?;

    let params = SearchParams::from_query(&query);
    let backend = &state.backend;
    let targets = HashSet::from([property_id]);

    let found = backend
        .aggregator
        .aggregate_until_match::<Listing>(
            &QueryParams::new(),
            &targets,
            backend.pagination.page_size,
            backend.pagination.catalog_hard_cap,
            params.query_options(),
        )
        .await?;

    let listing = found.records.into_iter().next().ok_or_else(not_found)?;
    Ok(Json(ListingsResponse::found(project(vec![listing], true), 1)))
}
