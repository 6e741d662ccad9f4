//! Router configuration for the tile server.
//!
//! # Route Structure
//!
//! ```text
//! /health                                  - Health check
//! /tables                                  - List tile tables
//! /tables/{table}                          - Table metadata
//! /tiles/{table}/{z}/{x}/{y}[.png|.jpg]    - Tile endpoint
//! /tiles/{table}/{z}/{x}/{y}/exists        - Tile availability
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gpkg_tiles::server::{create_router, RouterConfig};
//! use gpkg_tiles::store::DirectoryTileStore;
//! use gpkg_tiles::tile::TileRetriever;
//!
//! let retriever = TileRetriever::new(DirectoryTileStore::new("./tiles"));
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(retriever, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    exists_handler, health_handler, table_handler, tables_handler, tile_handler, AppState,
};
use crate::store::TileStore;
use crate::tile::{TileRetriever, DEFAULT_TILE_SIZE};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Output tile size when a request does not give one
    pub tile_size: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache max-age is 1 hour (3600 seconds)
    /// - Tiles are 256x256
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            tile_size: DEFAULT_TILE_SIZE,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router with CORS and optional request tracing.
pub fn create_router<S>(retriever: TileRetriever<S>, config: RouterConfig) -> Router
where
    S: TileStore + 'static,
{
    let app_state = AppState::new(retriever)
        .with_cache_max_age(config.cache_max_age)
        .with_tile_size(config.tile_size);

    let cors = build_cors_layer(&config);

    // {y} captures both "{y}" and "{y}.png"; the exists route shares the
    // parameter name so the two paths do not conflict
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/tables", get(tables_handler::<S>))
        .route("/tables/{table}", get(table_handler::<S>))
        .route("/tiles/{table}/{z}/{x}/{y}", get(tile_handler::<S>))
        .route("/tiles/{table}/{z}/{x}/{y}/exists", get(exists_handler::<S>))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        // No origins allowed
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
