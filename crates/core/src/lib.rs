//! Proplink Core Library
//!
//! Domain types and pure logic for the Proplink listing gateway: listing and
//! broker records, query parameters and cache keys, the post-filter engine,
//! the card projection, errors and configuration.

pub mod config;
pub mod error;
pub mod filter;
pub mod params;
pub mod projection;
pub mod types;

// Re-export commonly used types
pub use config::{
    CacheConfig, ListingServiceConfig, LoggingConfig, PaginationConfig, ProplinkConfig,
    ServerSettings,
};
pub use error::{ErrorCategory, ProplinkError, Result};
pub use filter::{apply, paginate, FilteredPage, ListingFilters};
pub use params::{ParamValue, QueryParams};
pub use projection::{to_card, Card};
pub use types::{Broker, Listing, Page, Photo, PhotoFormats, Resource, SaleOrLease};

/// Get version information
pub fn version_info() -> String {
    format!(
        "Proplink v{}\nListing Service gateway",
        env!("CARGO_PKG_VERSION")
    )
}
