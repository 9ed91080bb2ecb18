//! Proplink Serve Library
//!
//! HTTP interface for the Proplink listing gateway.

use proplink_core::ServerSettings;

pub mod api;
pub mod handlers;
pub mod search;
pub mod server;

pub use handlers::*;
pub use server::*;

/// Server version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            cors_enabled: settings.cors_enabled,
            max_request_size: settings.max_request_size,
        }
    }
}

impl ServerConfig {
    /// `host:port` as given in configuration
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
