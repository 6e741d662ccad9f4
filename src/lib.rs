//! # gpkg-tiles
//!
//! GeoPackage geometry blobs, CRS-aware bounding boxes and a tile pyramid
//! engine that fills missing zoom levels from neighbouring ones.
//!
//! ## Features
//!
//! - **Geometry blobs**: decode and encode the `GP` header, flags, SRS id and
//!   envelope around a WKB body, tolerating unparseable bodies
//! - **Bounding boxes**: WGS84 extents, tile extents and reprojection between
//!   coordinate reference systems
//! - **Tile math**: XYZ tile addressing on the Web Mercator grid
//! - **Tile scaling**: per-table fallback policy searching coarser or finer
//!   zoom levels, with the found pixels cropped or composited to fit
//! - **Serving**: an Axum tile server over directory-backed tile tables
//!
//! ## Architecture
//!
//! - [`geometry`] - Geometry blob codec and envelopes
//! - [`projection`] - Bounding boxes and CRS transforms
//! - [`tile`] - Tile math, scaling policy, retriever and export
//! - [`store`] - Tile storage backends and caching
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use gpkg_tiles::{MemoryTileStore, TileRequest, TileRetriever, TileScaling, TileScalingType};
//!
//! # async fn run(png: bytes::Bytes) -> Result<(), gpkg_tiles::TileError> {
//! let store = MemoryTileStore::new()
//!     .with_tile("osm", 3, 4, 2, png)
//!     .with_scaling(TileScaling::new("osm", TileScalingType::InOut).with_zoom_out(Some(2)));
//!
//! let retriever = TileRetriever::new(store);
//!
//! // Zoom 4 is missing; the zoom 3 parent is cropped and scaled up
//! let tile = retriever.get_tile(&TileRequest::new("osm", 4, 8, 5)).await?;
//! assert!(tile.is_some_and(|t| t.was_scaled));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod projection;
pub mod server;
pub mod store;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, Command, DecodeConfig, EncodeConfig, ExportConfig, ServeConfig, TilesConfig};
pub use error::{FormatError, GeometryBodyError, ProjectionError, StoreError, TileError};
pub use geometry::{ByteOrder, EncodedGeometry, Envelope, GeoWkb, GeometryData, GeometryFlags, WkbCodec};
pub use projection::{BoundingBox, CrsTransformer, ProjectionRegistry};
pub use server::{create_router, AppState, RouterConfig};
pub use store::{CachedTileStore, DirectoryTileStore, MemoryTileStore, TileCache, TileStore};
pub use tile::{
    export_xyz, tile_range_for_extent, TileFormat, TileMatrix, TileRange, TileRequest, TileResult,
    TileRetriever, TileScaling, TileScalingType,
};
