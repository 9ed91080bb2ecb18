//! Server module for Proplink serve crate

use crate::api::create_routes;
use crate::handlers::AppState;
use crate::ServerConfig;
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        Method,
    },
    Router,
};
use proplink_core::{ProplinkConfig, ProplinkError, Result};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Proplink HTTP server
pub struct ProplinkServer {
    config: ServerConfig,
    app: Router,
}

impl ProplinkServer {
    /// Create a server over prepared application state
    pub fn new(state: AppState) -> Self {
        let config = state.config.clone();
        let app = create_app(state);
        Self { config, app }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr = self.config.bind_address();
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| ProplinkError::validation(format!("Invalid address {}: {}", addr, e)))?;

        tracing::info!("Starting Proplink server on {}", addr);

        let listener = tokio::net::TcpListener::bind(socket_addr)
            .await
            .map_err(|e| ProplinkError::network(format!("Failed to bind to {}: {}", addr, e)))?;

        axum::serve(listener, self.app)
            .await
            .map_err(|e| ProplinkError::network(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The fully layered router
    pub fn router(&self) -> Router {
        self.app.clone()
    }
}

/// Create the Axum application with middleware
pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();
    let mut app = create_routes(state);

    app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(config.max_request_size)),
    );

    if config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([ACCEPT, CONTENT_TYPE]);

        app = app.layer(cors);
    }

    app
}

/// Server builder for configuration
pub struct ServerBuilder {
    settings: ProplinkConfig,
}

impl ServerBuilder {
    /// Start from a loaded configuration
    pub fn from_config(settings: ProplinkConfig) -> Self {
        Self { settings }
    }

    /// Set the host address
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.settings.server.host = host.into();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.settings.server.port = port;
        self
    }

    /// Build the server, wiring up the Listing Service backend
    ///
    /// Must be called inside a Tokio runtime.
    pub fn build(self) -> Result<ProplinkServer> {
        let state = AppState::new(&self.settings)?;
        Ok(ProplinkServer::new(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cli_overrides_replace_configured_address() {
        let mut settings = ProplinkConfig::default();
        settings.server.cors_enabled = false;

        let server = ServerBuilder::from_config(settings)
            .host("0.0.0.0")
            .port(8080)
            .build()
            .unwrap();

        assert_eq!(server.config().bind_address(), "0.0.0.0:8080");
        assert!(!server.config().cors_enabled);
    }

    #[tokio::test]
    async fn test_builder_keeps_loaded_settings() {
        let mut settings = ProplinkConfig::default();
        settings.server.port = 9123;
        settings.listing_service.api_key = Some("key".to_string());

        let server = ServerBuilder::from_config(settings).build().unwrap();
        assert_eq!(server.config().port, 9123);
    }
}
