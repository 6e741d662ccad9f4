//! Per-zoom tile matrix descriptions.

use serde::{Deserialize, Serialize};

use crate::projection::{BoundingBox, WEB_MERCATOR_HALF_WORLD};

use super::math::{tiles_per_side, WORLD_WIDTH_METERS};

/// Layout of one zoom level of a tile table.
///
/// Pixel sizes are in CRS units per pixel; for Web Mercator tables that is
/// meters. The matrix origin is the north-west corner of the world extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileMatrix {
    pub zoom_level: u32,
    pub matrix_width: u32,
    pub matrix_height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub pixel_x_size: f64,
    pub pixel_y_size: f64,
}

impl TileMatrix {
    /// Standard Web Mercator level: 2^z x 2^z square tiles.
    pub fn web_mercator(zoom_level: u32, tile_size: u32) -> Self {
        let side = tiles_per_side(zoom_level);
        let pixel_size = WORLD_WIDTH_METERS / (f64::from(tile_size) * f64::from(side));
        Self {
            zoom_level,
            matrix_width: side,
            matrix_height: side,
            tile_width: tile_size,
            tile_height: tile_size,
            pixel_x_size: pixel_size,
            pixel_y_size: pixel_size,
        }
    }

    /// Whether a column and row fall inside the matrix.
    pub fn contains(&self, column: u32, row: u32) -> bool {
        column < self.matrix_width && row < self.matrix_height
    }

    /// Tile edge lengths in CRS units.
    pub fn tile_span(&self) -> (f64, f64) {
        (
            f64::from(self.tile_width) * self.pixel_x_size,
            f64::from(self.tile_height) * self.pixel_y_size,
        )
    }

    /// Web Mercator extent of a tile, or `None` outside the matrix.
    pub fn tile_bounds(&self, column: u32, row: u32) -> Option<BoundingBox> {
        if !self.contains(column, row) {
            return None;
        }

        let (span_x, span_y) = self.tile_span();
        let min_x = -WEB_MERCATOR_HALF_WORLD + f64::from(column) * span_x;
        let max_y = WEB_MERCATOR_HALF_WORLD - f64::from(row) * span_y;
        Some(BoundingBox::new(min_x, min_x + span_x, max_y - span_y, max_y))
    }

    /// Tile containing a Web Mercator point, or `None` outside the matrix.
    pub fn tile_at(&self, x: f64, y: f64) -> Option<(u32, u32)> {
        let (span_x, span_y) = self.tile_span();
        let column = ((x + WEB_MERCATOR_HALF_WORLD) / span_x).floor();
        let row = ((WEB_MERCATOR_HALF_WORLD - y) / span_y).floor();
        if column < 0.0 || row < 0.0 {
            return None;
        }

        let (column, row) = (column as u32, row as u32);
        self.contains(column, row).then_some((column, row))
    }
}
