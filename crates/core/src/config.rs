//! Configuration types for Proplink
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional YAML/TOML/JSON file, then `PROPLINK_<SECTION>__<KEY>` environment
//! variables (for example `PROPLINK_LISTING_SERVICE__API_KEY`).

use crate::{ProplinkError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProplinkConfig {
    #[serde(default)]
    pub listing_service: ListingServiceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream Listing Service connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingServiceConfig {
    /// Base URL; the credential is appended as the next path segment
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Service credential. Absent means every upstream call fails fast.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ListingServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ListingServiceConfig {
    /// The credential, if one is configured and not blank
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// In-memory response cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Time to live applied to every entry
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// How often expired entries are purged in the background; 0 disables
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_seconds > 0).then(|| Duration::from_secs(self.sweep_interval_seconds))
    }
}

/// Page sizes and scan bounds used when aggregating upstream pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Upper bound on records fetched when aggregating the whole catalog
    #[serde(default = "default_catalog_hard_cap")]
    pub catalog_hard_cap: usize,
    #[serde(default = "default_page_size")]
    pub saved_batch_size: usize,
    /// Upper bound on records scanned when looking up saved ids
    #[serde(default = "default_saved_hard_cap")]
    pub saved_hard_cap: usize,
    /// Maximum number of concurrent page requests during fan-out
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            catalog_hard_cap: default_catalog_hard_cap(),
            saved_batch_size: default_page_size(),
            saved_hard_cap: default_saved_hard_cap(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            max_request_size: default_max_request_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_base_url() -> String {
    "https://buildout.com/api/v1".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_ttl_seconds() -> u64 {
    3600
}

fn default_sweep_interval_seconds() -> u64 {
    300
}

fn default_page_size() -> usize {
    100
}

fn default_catalog_hard_cap() -> usize {
    5000
}

fn default_saved_hard_cap() -> usize {
    1000
}

fn default_max_concurrency() -> usize {
    8
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_request_size() -> usize {
    1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ProplinkConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            if !path.exists() {
                return Err(ProplinkError::not_found(format!(
                    "configuration file {}",
                    path.display()
                )));
            }
            tracing::debug!("Loading configuration file {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("PROPLINK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load configuration from a file only, ignoring the environment
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(path.as_ref()).required(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Validate configuration
    ///
    /// A missing credential is deliberately not an error here: the service
    /// still starts and reports the problem on every upstream request.
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.listing_service.base_url)?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ProplinkError::validation(
                "Listing Service URL must use http or https scheme",
            ));
        }

        if self.listing_service.timeout_seconds == 0 {
            return Err(ProplinkError::validation(
                "Listing Service timeout must be greater than 0",
            ));
        }

        if self.cache.enabled && self.cache.ttl_seconds == 0 {
            return Err(ProplinkError::validation(
                "Cache TTL must be greater than 0 when caching is enabled",
            ));
        }

        let pagination = &self.pagination;
        if pagination.page_size == 0 || pagination.saved_batch_size == 0 {
            return Err(ProplinkError::validation(
                "Page and batch sizes must be greater than 0",
            ));
        }
        if pagination.max_concurrency == 0 {
            return Err(ProplinkError::validation(
                "max_concurrency must be greater than 0",
            ));
        }
        if pagination.catalog_hard_cap < pagination.page_size {
            return Err(ProplinkError::validation(
                "catalog_hard_cap must be at least one page",
            ));
        }

        if self.server.port == 0 {
            return Err(ProplinkError::validation("Port cannot be 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ProplinkConfig::default();
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert!(config.cache.enabled);
        assert_eq!(config.pagination.page_size, 100);
        assert_eq!(config.pagination.saved_batch_size, 100);
        assert_eq!(config.pagination.saved_hard_cap, 1000);
        assert!(config.listing_service.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_credential_is_absent() {
        let service = ListingServiceConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(service.credential().is_none());

        let service = ListingServiceConfig {
            api_key: Some("abc123".to_string()),
            ..Default::default()
        };
        assert_eq!(service.credential(), Some("abc123"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ProplinkConfig::default();
        config.pagination.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = ProplinkConfig::default();
        config.listing_service.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = ProplinkConfig::default();
        config.cache.ttl_seconds = 0;
        assert!(config.validate().is_err());

        config.cache.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sweep_interval_zero_disables() {
        let cache = CacheConfig {
            sweep_interval_seconds: 0,
            ..Default::default()
        };
        assert!(cache.sweep_interval().is_none());
        assert_eq!(
            CacheConfig::default().sweep_interval(),
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "listing_service:\n  api_key: secret\ncache:\n  ttl_seconds: 60\npagination:\n  page_size: 50"
        )
        .unwrap();

        let config = ProplinkConfig::from_file(file.path()).unwrap();
        assert_eq!(config.listing_service.credential(), Some("secret"));
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.pagination.page_size, 50);
        assert_eq!(config.pagination.saved_hard_cap, 1000);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let err = ProplinkConfig::load(Some(Path::new("/nonexistent/proplink.yaml"))).unwrap_err();
        assert!(err.is_not_found());
    }
}
