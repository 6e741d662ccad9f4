//! Tile pyramid engine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │     HTTP Handlers / export_xyz          │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             TileRetriever               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ TileScaling  │  │  ImageScaler +  │  │
//! │  │ (candidate   │  │  TileImageCodec │  │
//! │  │  zooms)      │  │  (crop/scale)   │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               TileStore                 │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`math`]: (lon, lat, zoom) ↔ (column, row), resolutions, extent ranges
//! - [`TileMatrix`]: per-zoom layout of a tile table
//! - [`TileScaling`]: fallback policy and ordered candidate zooms
//! - [`TileRetriever`]: exact lookup, fallback search and rescaling
//! - [`export_xyz`]: packs a table into a `{z}/{x}/{y}` directory tree

pub mod math;

mod export;
mod matrix;
mod raster;
mod retriever;
mod scaling;

pub use export::{export_xyz, ExportSummary};
pub use math::{
    latitude_to_tile_row, longitude_to_tile_column, resolution, tile_column_to_longitude,
    tile_range_for_extent, tile_row_to_latitude, TileRange, DEFAULT_TILE_SIZE, MAX_ZOOM,
};
pub use matrix::TileMatrix;
pub use raster::{
    clamp_quality, validate_dimensions, ImageScaler, ResizeScaler, TileFormat, TileImageCodec,
    DEFAULT_JPEG_QUALITY, MAX_TILE_DIMENSION,
};
pub use retriever::{TileRequest, TileResult, TileRetriever};
pub use scaling::{ScalingCandidate, ScalingDirection, TileScaling, TileScalingType};
