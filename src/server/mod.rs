//! HTTP server layer.
//!
//! Serves tiles from any [`TileStore`](crate::store::TileStore) through a
//! [`TileRetriever`](crate::tile::TileRetriever), so tables with a scaling
//! record answer requests for missing zoom levels.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │          GET /tiles/{table}/{z}/{x}/{y}[.png|.jpg]              │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (tiles, tables, health)  │  │  (router config, CORS)      │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    exists_handler, health_handler, table_handler, tables_handler, tile_handler, AppState,
    ErrorResponse, ExistsResponse, HandlerError, ExistsPathParams, HealthResponse, TableResponse,
    TablesResponse, TilePathParams, TileQueryParams,
};
pub use routes::{create_router, RouterConfig};
