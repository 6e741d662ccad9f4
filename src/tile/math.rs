//! Slippy-map tile coordinate math.
//!
//! Tiles are addressed as (zoom, column, row) over spherical Web Mercator:
//!
//! ```text
//!   zoom 0          zoom 1             columns grow eastward from -180°
//! +-------+     +-------+-------+      rows grow southward from +85.05°
//! | (0,0) |     | (0,0) | (1,0) |
//! +-------+     +-------+-------+      2^z columns and 2^z rows per level
//!               | (0,1) | (1,1) |
//!               +-------+-------+
//! ```
//!
//! Export and lookup share these functions so tile boundaries agree exactly.
//! Computed indices outside `[0, 2^z - 1]` are clamped, never rejected.

use std::f64::consts::PI;

use serde::Serialize;

use crate::projection::{
    BoundingBox, WEB_MERCATOR_HALF_WORLD, WEB_MERCATOR_MAX_LATITUDE, WEB_MERCATOR_MIN_LATITUDE,
};

/// Deepest zoom level addressable with `u32` tile indices
pub const MAX_ZOOM: u32 = 30;

/// Standard tile edge in pixels
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Width of the Web Mercator world in meters
pub const WORLD_WIDTH_METERS: f64 = 2.0 * WEB_MERCATOR_HALF_WORLD;

/// Meters per pixel at zoom 0..=19 for 256-pixel tiles
const RESOLUTIONS: [f64; 20] = [
    156543.03392804097,
    78271.51696402048,
    39135.75848201024,
    19567.87924100512,
    9783.93962050256,
    4891.96981025128,
    2445.98490512564,
    1222.99245256282,
    611.49622628141,
    305.748113140705,
    152.8740565703525,
    76.43702828517625,
    38.21851414258813,
    19.109257071294063,
    9.554628535647032,
    4.777314267823516,
    2.388657133911758,
    1.194328566955879,
    0.5971642834779395,
    0.29858214173896974,
];

/// Number of tiles along each axis at a zoom level.
#[inline]
pub fn tiles_per_side(zoom: u32) -> u32 {
    1u32 << zoom.min(MAX_ZOOM)
}

#[inline]
fn clamp_index(value: f64, zoom: u32) -> u32 {
    let max = f64::from(tiles_per_side(zoom) - 1);
    // NaN clamps to 0 through the saturating cast
    value.floor().clamp(0.0, max) as u32
}

/// Tile column containing a longitude.
pub fn longitude_to_tile_column(longitude: f64, zoom: u32) -> u32 {
    let n = f64::from(tiles_per_side(zoom));
    clamp_index((longitude + 180.0) / 360.0 * n, zoom)
}

/// Tile row containing a latitude.
///
/// Latitudes beyond the Web Mercator limits land in the first or last row.
pub fn latitude_to_tile_row(latitude: f64, zoom: u32) -> u32 {
    let n = f64::from(tiles_per_side(zoom));
    let latitude = latitude.clamp(WEB_MERCATOR_MIN_LATITUDE, WEB_MERCATOR_MAX_LATITUDE);
    let lat_rad = latitude * PI / 180.0;
    let merc = (lat_rad.tan() + 1.0 / lat_rad.cos()).ln();
    clamp_index((1.0 - merc / PI) / 2.0 * n, zoom)
}

/// Longitude of a tile's western edge.
pub fn tile_column_to_longitude(column: u32, zoom: u32) -> f64 {
    f64::from(column) / f64::from(tiles_per_side(zoom)) * 360.0 - 180.0
}

/// Latitude of a tile's northern edge.
pub fn tile_row_to_latitude(row: u32, zoom: u32) -> f64 {
    let n = PI - 2.0 * PI * f64::from(row) / f64::from(tiles_per_side(zoom));
    n.sinh().atan().to_degrees()
}

/// Ground resolution in meters per pixel for 256-pixel tiles.
///
/// Levels 0-19 come from a lookup table; deeper levels use the formula.
pub fn resolution(zoom: u32) -> f64 {
    RESOLUTIONS
        .get(zoom as usize)
        .copied()
        .unwrap_or_else(|| WORLD_WIDTH_METERS / (f64::from(DEFAULT_TILE_SIZE) * 2f64.powi(zoom as i32)))
}

// =============================================================================
// TileRange
// =============================================================================

/// Inclusive block of tiles at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileRange {
    pub zoom: u32,
    pub min_column: u32,
    pub max_column: u32,
    pub min_row: u32,
    pub max_row: u32,
}

impl TileRange {
    /// Number of tiles in the range.
    pub fn count(&self) -> u64 {
        u64::from(self.max_column - self.min_column + 1) * u64::from(self.max_row - self.min_row + 1)
    }

    pub fn contains(&self, column: u32, row: u32) -> bool {
        (self.min_column..=self.max_column).contains(&column)
            && (self.min_row..=self.max_row).contains(&row)
    }

    /// Tiles in row-major order as `(column, row)`.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.min_row..=self.max_row)
            .flat_map(move |row| (self.min_column..=self.max_column).map(move |col| (col, row)))
    }
}

/// Tiles covering a WGS84 extent at a zoom level.
///
/// Rows grow southward, so the northern edge gives the minimum row.
pub fn tile_range_for_extent(bbox: &BoundingBox, zoom: u32) -> TileRange {
    let min_column = longitude_to_tile_column(bbox.min_longitude, zoom);
    let max_column = longitude_to_tile_column(bbox.max_longitude, zoom);
    let min_row = latitude_to_tile_row(bbox.max_latitude, zoom);
    let max_row = latitude_to_tile_row(bbox.min_latitude, zoom);

    TileRange {
        zoom,
        min_column: min_column.min(max_column),
        max_column: min_column.max(max_column),
        min_row: min_row.min(max_row),
        max_row: min_row.max(max_row),
    }
}

// =============================================================================
// Tests
// =============================================================================
