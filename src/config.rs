//! Command-line configuration.
//!
//! Every subcommand is a clap derive struct; options that make sense for a
//! long-running server can also be set from `GPKG_`-prefixed environment
//! variables.
//!
//! # Environment Variables
//!
//! - `GPKG_HOST` - Server bind address (default: 0.0.0.0)
//! - `GPKG_PORT` - Server port (default: 3000)
//! - `GPKG_ROOT` - Directory holding XYZ tile tables
//! - `GPKG_CACHE_TILES` - Tile cache capacity in bytes (default: 64MB)
//! - `GPKG_TILE_SIZE` - Default output tile size in pixels (default: 256)
//! - `GPKG_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `GPKG_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::projection::BoundingBox;
use crate::store::DEFAULT_TILE_CACHE_CAPACITY;
use crate::tile::{DEFAULT_TILE_SIZE, MAX_TILE_DIMENSION, MAX_ZOOM};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

/// Default SRS id for encoded geometries (WGS 84).
pub const DEFAULT_SRS_ID: i32 = 4326;

// =============================================================================
// CLI Arguments
// =============================================================================

/// gpkg-tiles - GeoPackage geometry and tile pyramid tools.
#[derive(Parser, Debug, Clone)]
#[command(name = "gpkg-tiles")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve tile tables over HTTP with zoom-fallback scaling
    Serve(ServeConfig),

    /// Decode a hex-encoded GeoPackage geometry blob and print it as JSON
    Decode(DecodeConfig),

    /// Encode a point as a GeoPackage geometry blob in hex
    Encode(EncodeConfig),

    /// Print the tile range covering a bounding box at a zoom level
    Tiles(TilesConfig),

    /// Export a tile table into an XYZ directory tree
    Export(ExportConfig),
}

// =============================================================================
// Serve
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "GPKG_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "GPKG_PORT")]
    pub port: u16,

    /// Directory holding one `{table}/{z}/{x}/{y}.png` tree per tile table.
    #[arg(long, env = "GPKG_ROOT")]
    pub root: PathBuf,

    /// Tile cache capacity in bytes.
    #[arg(long, default_value_t = DEFAULT_TILE_CACHE_CAPACITY, env = "GPKG_CACHE_TILES")]
    pub cache_tiles: usize,

    /// Output tile size when a request gives no width or height.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "GPKG_TILE_SIZE")]
    pub tile_size: u32,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "GPKG_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "GPKG_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.root.as_os_str().is_empty() {
            return Err("Tile root is required. Set --root or GPKG_ROOT".to_string());
        }
        if self.cache_tiles == 0 {
            return Err("cache_tiles must be greater than 0".to_string());
        }
        if self.tile_size == 0 || self.tile_size > MAX_TILE_DIMENSION {
            return Err(format!(
                "tile_size must be between 1 and {MAX_TILE_DIMENSION}"
            ));
        }
        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Decode / Encode
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct DecodeConfig {
    /// Geometry blob as hex
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,

    /// File holding the raw geometry blob
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl DecodeConfig {
    pub fn validate(&self) -> Result<(), String> {
        match (&self.hex, &self.file) {
            (None, None) => Err("One of --hex or --file is required".to_string()),
            (Some(hex), None) if hex.trim().is_empty() => Err("--hex is empty".to_string()),
            _ => Ok(()),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EncodeConfig {
    #[arg(long, allow_hyphen_values = true)]
    pub x: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub y: f64,

    /// Spatial reference system id written to the header
    #[arg(long, default_value_t = DEFAULT_SRS_ID)]
    pub srs_id: i32,

    /// Write the SRS id and envelope big-endian
    #[arg(long, default_value_t = false)]
    pub big_endian: bool,

    /// Include the XY envelope in the header
    #[arg(long, default_value_t = false)]
    pub envelope: bool,
}

impl EncodeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err("Point coordinates must be finite".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Tiles / Export
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct TilesConfig {
    /// Extent in degrees as minLon,minLat,maxLon,maxLat
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: BoundingBox,

    #[arg(long)]
    pub zoom: u32,
}

impl TilesConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_bbox(&self.bbox)?;
        if self.zoom > MAX_ZOOM {
            return Err(format!("zoom must be at most {MAX_ZOOM}"));
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExportConfig {
    /// Directory holding the source tile tables
    #[arg(long, env = "GPKG_ROOT")]
    pub root: PathBuf,

    /// Tile table to export
    #[arg(long)]
    pub table: String,

    /// Output directory for the `{z}/{x}/{y}` tree
    #[arg(long)]
    pub out: PathBuf,

    /// Extent in degrees as minLon,minLat,maxLon,maxLat (default: whole world)
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: Option<BoundingBox>,

    #[arg(long, default_value_t = 0)]
    pub min_zoom: u32,

    #[arg(long)]
    pub max_zoom: u32,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ExportConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.table.is_empty() {
            return Err("--table is required".to_string());
        }
        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "min_zoom ({}) must not exceed max_zoom ({})",
                self.min_zoom, self.max_zoom
            ));
        }
        if self.max_zoom > MAX_ZOOM {
            return Err(format!("max_zoom must be at most {MAX_ZOOM}"));
        }
        validate_bbox(&self.bbox())
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox.unwrap_or_else(BoundingBox::world)
    }
}

fn validate_bbox(bbox: &BoundingBox) -> Result<(), String> {
    if bbox.min_longitude > bbox.max_longitude || bbox.min_latitude > bbox.max_latitude {
        return Err(format!(
            "Bounding box minimums must not exceed maximums: {},{},{},{}",
            bbox.min_longitude, bbox.min_latitude, bbox.max_longitude, bbox.max_latitude
        ));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
