//! HTTP handlers for Proplink serve crate

use crate::search::{ApiError, SearchParams};
use crate::ServerConfig;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
};
use proplink_core::{Broker, ProplinkConfig, ProplinkError, QueryParams, Result};
use proplink_infra::{build_backend, ListingBackend, QueryOptions};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Application state shared across handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub backend: ListingBackend,
    pub config: ServerConfig,
}

impl AppState {
    /// Build the production backend from configuration
    pub fn new(config: &ProplinkConfig) -> Result<Self> {
        Ok(Self {
            backend: build_backend(config)?,
            config: ServerConfig::from(&config.server),
        })
    }

    /// Create application state around an existing backend (for testing)
    pub fn from_backend(config: ServerConfig, backend: ListingBackend) -> Self {
        Self { backend, config }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BrokersResponse {
    pub success: bool,
    pub brokers: Vec<Broker>,
    pub count: usize,
    pub message: String,
}

impl BrokersResponse {
    fn found(brokers: Vec<Broker>) -> Self {
        let count = brokers.len();
        Self {
            success: true,
            brokers,
            count,
            message: format!("Retrieved {} brokers", count),
        }
    }

    fn failure(message: String) -> Self {
        Self {
            success: false,
            brokers: Vec::new(),
            count: 0,
            message,
        }
    }
}

/// Broker endpoint errors, rendered in the broker envelope
#[derive(Debug)]
pub struct BrokerError(ApiError);

impl From<ApiError> for BrokerError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl From<ProplinkError> for BrokerError {
    fn from(err: ProplinkError) -> Self {
        Self(ApiError::Backend(err))
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let body = Json(BrokersResponse::failure(self.0.to_string()));
        (status, body).into_response()
    }
}

fn query_options(query: &HashMap<String, String>) -> QueryOptions {
    SearchParams::from_query(query).query_options()
}

/// Handler for the full broker roster
pub async fn handle_list_brokers(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> std::result::Result<Json<BrokersResponse>, BrokerError> {
    let backend = &state.backend;
    let roster = backend
        .aggregator
        .aggregate_all::<Broker>(
            &QueryParams::new(),
            backend.pagination.page_size,
            backend.pagination.catalog_hard_cap,
            query_options(&query),
        )
        .await?;

    tracing::info!("Listing {} brokers", roster.records.len());
    Ok(Json(BrokersResponse::found(roster.records)))
}

/// Handler for a single broker
pub async fn handle_get_broker(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> std::result::Result<Json<BrokersResponse>, BrokerError> {
    let not_found = || ApiError::NotFound(format!("Broker {} not found", id));
    let broker_id: i64 = id.trim().parse().map_err(|_| not_found())?;

    let backend = &state.backend;
    let found = backend
        .aggregator
        .aggregate_until_match::<Broker>(
            &QueryParams::new(),
            &HashSet::from([broker_id]),
            backend.pagination.page_size,
            backend.pagination.catalog_hard_cap,
            query_options(&query),
        )
        .await?;

    if found.is_empty() {
        return Err(not_found().into());
    }
    Ok(Json(BrokersResponse::found(found.records)))
}
