//! API module for Proplink serve crate

use crate::handlers::{handle_get_broker, handle_list_brokers, AppState};
use crate::search::search_routes;
use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;

/// API routes configuration
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/brokers", get(handle_list_brokers))
        .route("/brokers/:id", get(handle_get_broker))
        .route("/cache/clear", post(clear_cache))
        .route("/cache/stats", get(cache_stats))
        .merge(search_routes())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.backend.health().await;
    Json(HealthResponse {
        status: if health.is_healthy() { "healthy" } else { "degraded" }.to_string(),
        version: crate::VERSION.to_string(),
        timestamp: chrono::Utc::now(),
        credential_configured: health.credential_configured,
        cache_entries: health.cache_entries,
    })
}

/// Drop every cached Listing Service response
pub async fn clear_cache(State(state): State<AppState>) -> impl IntoResponse {
    let cleared = state.backend.client.clear_cache().await;
    tracing::info!("Cache cleared by operator: {} entries", cleared);
    Json(CacheClearResponse {
        success: true,
        cleared,
    })
}

pub async fn cache_stats(State(state): State<AppState>) -> impl IntoResponse {
    let client = &state.backend.client;
    Json(CacheStatsResponse {
        enabled: client.settings().enabled,
        entries: client.cache_size().await,
        in_flight: client.in_flight(),
        ttl_seconds: client.settings().ttl_seconds,
    })
}

// Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub credential_configured: bool,
    pub cache_entries: usize,
}

#[derive(Debug, Serialize)]
pub struct CacheClearResponse {
    pub success: bool,
    pub cleared: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsResponse {
    pub enabled: bool,
    pub entries: usize,
    pub in_flight: usize,
    pub ttl_seconds: u64,
}
