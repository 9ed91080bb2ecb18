//! Listing search API
//!
//! - `types`: query parsing, response envelope and error mapping
//! - `handlers`: HTTP handlers for `/search`, `/saved` and `/properties/:id`
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum::Router;
//! use proplink_serve::search::search_routes;
//! use proplink_serve::AppState;
//!
//! # fn example(state: AppState) {
//! let app: Router = search_routes().with_state(state);
//! # }
//! ```

pub mod handlers;
pub mod types;

pub use handlers::{handle_property, handle_saved, handle_search, search_routes};
pub use types::{parse_ids, project, ApiError, ListingView, ListingsResponse, SearchParams};
