//! Search API types and request/response structures
//!
//! Query strings are parsed permissively: a value that does not parse is
//! treated as if it had not been supplied, so a bad `minPrice=abc` disables
//! that one constraint instead of failing the request.
//!
//! # Examples
//!
//! ```rust
//! use std::collections::HashMap;
//! use proplink_serve::search::types::SearchParams;
//!
//! let query: HashMap<String, String> = [
//!     ("limit".to_string(), "5".to_string()),
//!     ("minPrice".to_string(), "abc".to_string()),
//!     ("saleOrLease".to_string(), "sale".to_string()),
//! ]
//! .into_iter()
//! .collect();
//!
//! let params = SearchParams::from_query(&query);
//! assert_eq!(params.limit, 5);
//! assert_eq!(params.filters.min_price, None);
//! assert!(!params.filters.is_empty());
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use proplink_core::{
    to_card, Card, Listing, ListingFilters, ProplinkError, QueryParams, SaleOrLease,
};
use proplink_infra::QueryOptions;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use tracing::{error, warn};

pub const DEFAULT_LIMIT: usize = 20;

/// Errors surfaced by the listing endpoints
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested record does not exist within the scan bound
    #[error("{0}")]
    NotFound(String),

    /// Anything that went wrong talking to the Listing Service
    #[error(transparent)]
    Backend(#[from] ProplinkError),
}

impl ApiError {
    /// HTTP status for this error; backend failures are logged here
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Backend(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Backend(e) => {
                error!(category = %e.category(), "Listing request failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ListingsResponse::failure(self.to_string()));
        (status, body).into_response()
    }
}

/// A listing as returned to clients, full or reduced to a card
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ListingView {
    Full(Box<Listing>),
    Card(Card),
}

impl ListingView {
    pub fn id(&self) -> i64 {
        match self {
            ListingView::Full(listing) => listing.id,
            ListingView::Card(card) => card.id,
        }
    }
}

/// Render `records` as full listings or cards
pub fn project(records: Vec<Listing>, full_data: bool) -> Vec<ListingView> {
    if full_data {
        records
            .into_iter()
            .map(|l| ListingView::Full(Box::new(l)))
            .collect()
    } else {
        records
            .iter()
            .map(|l| ListingView::Card(to_card(l)))
            .collect()
    }
}

/// Response envelope shared by the listing endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ListingsResponse {
    pub success: bool,
    pub properties: Vec<ListingView>,
    /// Total matching records, not the length of `properties`
    pub count: usize,
    pub message: String,
}

impl ListingsResponse {
    pub fn found(properties: Vec<ListingView>, count: usize) -> Self {
        let message = format!("Retrieved {} of {} properties", properties.len(), count);
        Self {
            success: true,
            properties,
            count,
            message,
        }
    }

    /// Matches from a catalog scan that stopped before the whole catalog
    pub fn partial(properties: Vec<ListingView>, count: usize, scanned: usize, total: usize) -> Self {
        let message = format!(
            "Retrieved {} of {} properties (partial: scanned {} of {} listings)",
            properties.len(),
            count,
            scanned,
            total
        );
        Self {
            success: true,
            properties,
            count,
            message,
        }
    }

    pub fn empty<S: Into<String>>(message: S) -> Self {
        Self {
            success: true,
            properties: Vec::new(),
            count: 0,
            message: message.into(),
        }
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            properties: Vec::new(),
            count: 0,
            message: message.into(),
        }
    }
}

/// Parse a numeric parameter, treating anything unparseable as absent
fn parse_opt<T: FromStr>(query: &HashMap<String, String>, key: &str) -> Option<T> {
    let raw = query.get(key)?.trim();
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            if !raw.is_empty() {
                warn!("Ignoring unparseable query parameter {}={:?}", key, raw);
            }
            None
        }
    }
}

fn parse_float(query: &HashMap<String, String>, key: &str) -> Option<f64> {
    parse_opt::<f64>(query, key).filter(|v| v.is_finite())
}

fn parse_flag(query: &HashMap<String, String>, key: &str) -> bool {
    query
        .get(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(false)
}

fn parse_text(query: &HashMap<String, String>, key: &str) -> Option<String> {
    query
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parameters shared by `/search` and `/saved`
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub limit: usize,
    pub offset: usize,
    /// Return full listings instead of cards
    pub full_data: bool,
    pub skip_cache: bool,
    /// Passed to the Listing Service as `broker_id`
    pub broker_id: Option<i64>,
    /// Passed to the Listing Service as `property_type`
    pub property_type: Option<String>,
    pub filters: ListingFilters,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            full_data: false,
            skip_cache: false,
            broker_id: None,
            property_type: None,
            filters: ListingFilters::default(),
        }
    }
}

impl SearchParams {
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let filters = ListingFilters {
            min_price: parse_float(query, "minPrice"),
            max_price: parse_float(query, "maxPrice"),
            sale_or_lease: parse_text(query, "saleOrLease").map(|s| SaleOrLease::from(s.as_str())),
            min_cap_rate: parse_float(query, "minCapRate"),
            max_cap_rate: parse_float(query, "maxCapRate"),
            min_square_footage: parse_float(query, "minSquareFootage"),
            max_square_footage: parse_float(query, "maxSquareFootage"),
            search: parse_text(query, "search"),
        };

        Self {
            limit: parse_opt(query, "limit").unwrap_or(DEFAULT_LIMIT),
            offset: parse_opt(query, "offset").unwrap_or(0),
            full_data: parse_flag(query, "fullData"),
            skip_cache: parse_flag(query, "skipCache"),
            broker_id: parse_opt(query, "brokerId"),
            property_type: parse_text(query, "propertyType"),
            filters,
        }
    }

    /// Parameters the Listing Service evaluates natively
    pub fn upstream_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        params
            .insert_opt("broker_id", self.broker_id)
            .insert_opt("property_type", self.property_type.clone());
        params
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions::skip_cache(self.skip_cache)
    }
}

/// Parse a comma-separated id list, dropping blanks, junk and duplicates
pub fn parse_ids(raw: Option<&str>) -> Vec<i64> {
    let mut ids = Vec::new();
    for part in raw.unwrap_or_default().split(',') {
        if let Ok(id) = part.trim().parse::<i64>() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}
