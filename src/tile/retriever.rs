//! Tile retrieval with zoom fallback.
//!
//! # Pipeline
//!
//! ```text
//! get_tile(table, z, x, y, w, h)
//!     │
//!     ├─ exact tile present? ──yes──► size matches? ──yes──► stored bytes
//!     │                                     └──no──► decode → scale → encode
//!     │ no
//!     ├─ scaling record? ──no──► None
//!     │
//!     └─ for each candidate zoom, in policy order:
//!          out (z-d): ancestor (x>>d, y>>d) → crop 1/2^d window → scale up
//!          in  (z+d): present children of the 2^d x 2^d block
//!                     → scale each down → composite
//!        first candidate with data wins; none ──► None
//! ```
//!
//! Candidate probes run one after another so the same request always
//! resolves to the same source tile.

use bytes::Bytes;
use image::{imageops, RgbaImage};
use tracing::debug;

use crate::error::TileError;
use crate::store::TileStore;

use super::math::{tiles_per_side, DEFAULT_TILE_SIZE, MAX_ZOOM};
use super::raster::{validate_dimensions, ImageScaler, ResizeScaler, TileFormat, TileImageCodec};
use super::scaling::{ScalingCandidate, ScalingDirection, TileScaling};

// =============================================================================
// Request / Result
// =============================================================================

/// Parameters for a tile request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    pub table: String,
    pub zoom: u32,
    pub column: u32,
    pub row: u32,
    pub width: u32,
    pub height: u32,
}

impl TileRequest {
    /// Request a tile at the default 256x256 size.
    pub fn new(table: impl Into<String>, zoom: u32, column: u32, row: u32) -> Self {
        Self {
            table: table.into(),
            zoom,
            column,
            row,
            width: DEFAULT_TILE_SIZE,
            height: DEFAULT_TILE_SIZE,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// A retrieved tile.
#[derive(Debug, Clone)]
pub struct TileResult {
    /// Encoded image bytes
    pub data: Bytes,

    /// Zoom level the pixels came from
    pub source_zoom: u32,

    /// Whether the tile was synthesized from another zoom level
    pub was_scaled: bool,

    pub width: u32,
    pub height: u32,
    pub format: TileFormat,
}

// =============================================================================
// TileRetriever
// =============================================================================

/// Looks up tiles in a [`TileStore`], falling back to other zoom levels
/// according to the table's [`TileScaling`] record.
pub struct TileRetriever<S, I = ResizeScaler> {
    store: S,
    scaler: I,
    codec: TileImageCodec,
}

impl<S: TileStore> TileRetriever<S, ResizeScaler> {
    /// Create a retriever with the default scaler and PNG output.
    pub fn new(store: S) -> Self {
        Self::with_scaler(store, ResizeScaler::default())
    }
}

impl<S: TileStore, I: ImageScaler> TileRetriever<S, I> {
    pub fn with_scaler(store: S, scaler: I) -> Self {
        Self {
            store,
            scaler,
            codec: TileImageCodec::default(),
        }
    }

    /// Set the codec used for resized and synthesized tiles.
    pub fn with_codec(mut self, codec: TileImageCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Retrieve a tile, scaling from another zoom level if needed.
    ///
    /// Returns `Ok(None)` when neither the exact tile nor any scaling
    /// candidate exists.
    ///
    /// # Errors
    /// - `InvalidZoom`, `TileOutOfBounds` or `InvalidDimensions` for bad requests
    /// - `Store` if the backing store fails
    /// - `DecodeError` / `EncodeError` if stored images cannot be processed
    pub async fn get_tile(&self, request: &TileRequest) -> Result<Option<TileResult>, TileError> {
        validate_address(request.zoom, request.column, request.row)?;
        validate_dimensions(request.width, request.height)?;

        let table = request.table.as_str();
        let (zoom, column, row) = (request.zoom, request.column, request.row);
        let (width, height) = (request.width, request.height);

        if let Some(data) = self.store.query_tile(table, zoom, column, row).await? {
            debug!(table, zoom, column, row, "Exact tile hit");
            return self.exact_result(data, zoom, width, height).map(Some);
        }

        let Some((scaling, min_zoom, max_zoom)) = self.scaling_context(table).await? else {
            return Ok(None);
        };

        let candidates = scaling.candidates(zoom, min_zoom, max_zoom);
        debug!(
            table,
            zoom,
            column,
            row,
            candidates = ?candidates.iter().map(|c| c.zoom).collect::<Vec<_>>(),
            "Exact tile missing, searching scaling candidates"
        );

        for candidate in candidates {
            let image = match candidate.direction {
                ScalingDirection::Out => {
                    self.from_ancestor(table, &candidate, column, row, width, height)
                        .await?
                }
                ScalingDirection::In => {
                    self.from_descendants(table, &candidate, column, row, width, height)
                        .await?
                }
            };

            if let Some(image) = image {
                debug!(
                    table,
                    zoom,
                    column,
                    row,
                    source_zoom = candidate.zoom,
                    "Serving scaled tile"
                );
                return Ok(Some(TileResult {
                    data: self.codec.encode(&image)?,
                    source_zoom: candidate.zoom,
                    was_scaled: true,
                    width,
                    height,
                    format: self.codec.format(),
                }));
            }
        }

        Ok(None)
    }

    /// Whether `get_tile` would find a tile, without decoding any pixels.
    pub async fn has_tile(
        &self,
        table: &str,
        zoom: u32,
        column: u32,
        row: u32,
    ) -> Result<bool, TileError> {
        validate_address(zoom, column, row)?;

        if self.store.contains_tile(table, zoom, column, row).await? {
            return Ok(true);
        }

        let Some((scaling, min_zoom, max_zoom)) = self.scaling_context(table).await? else {
            return Ok(false);
        };

        for candidate in scaling.candidates(zoom, min_zoom, max_zoom) {
            let range = candidate.source_range(column, row);
            let found = match candidate.direction {
                ScalingDirection::Out => {
                    self.store
                        .contains_tile(table, candidate.zoom, range.min_column, range.min_row)
                        .await?
                }
                ScalingDirection::In => !self.store.present_tiles(table, &range).await?.is_empty(),
            };
            if found {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Scaling record and zoom range, or `None` if the table cannot scale.
    async fn scaling_context(
        &self,
        table: &str,
    ) -> Result<Option<(TileScaling, u32, u32)>, TileError> {
        let Some(scaling) = self.store.tile_scaling_for(table).await? else {
            return Ok(None);
        };
        let Some((min_zoom, max_zoom)) = self.store.tile_zoom_range(table).await? else {
            return Ok(None);
        };
        Ok(Some((scaling, min_zoom, max_zoom)))
    }

    fn exact_result(
        &self,
        data: Bytes,
        zoom: u32,
        width: u32,
        height: u32,
    ) -> Result<TileResult, TileError> {
        // Stored bytes pass through only in a format the response can name
        if let Some(format) = TileFormat::detect(&data) {
            if self.codec.dimensions(&data)? == (width, height) {
                return Ok(TileResult {
                    data,
                    source_zoom: zoom,
                    was_scaled: false,
                    width,
                    height,
                    format,
                });
            }
        }

        let image = self.codec.decode(&data)?;
        let resized = self.scaler.scale(&image, width, height);
        Ok(TileResult {
            data: self.codec.encode(&resized)?,
            source_zoom: zoom,
            was_scaled: false,
            width,
            height,
            format: self.codec.format(),
        })
    }

    /// Crop the matching window out of an ancestor tile and scale it up.
    async fn from_ancestor(
        &self,
        table: &str,
        candidate: &ScalingCandidate,
        column: u32,
        row: u32,
        width: u32,
        height: u32,
    ) -> Result<Option<RgbaImage>, TileError> {
        let range = candidate.source_range(column, row);
        let Some(data) = self
            .store
            .query_tile(table, candidate.zoom, range.min_column, range.min_row)
            .await?
        else {
            return Ok(None);
        };

        let source = self.codec.decode(&data)?;
        let (src_w, src_h) = source.dimensions();
        let factor = 1u64 << candidate.delta;
        let mask = factor - 1;

        let (x0, x1) = window(u64::from(column) & mask, factor, src_w);
        let (y0, y1) = window(u64::from(row) & mask, factor, src_h);

        let cropped = self.scaler.crop(&source, x0, y0, x1 - x0, y1 - y0);
        Ok(Some(self.scaler.scale(&cropped, width, height)))
    }

    /// Composite the present child tiles of a zoom-in candidate.
    ///
    /// Only tiles the store lists are read, so the work follows the stored
    /// data rather than the 4^d size of the block.
    async fn from_descendants(
        &self,
        table: &str,
        candidate: &ScalingCandidate,
        column: u32,
        row: u32,
        width: u32,
        height: u32,
    ) -> Result<Option<RgbaImage>, TileError> {
        let range = candidate.source_range(column, row);
        let span = 1u64 << candidate.delta;
        let mut canvas: Option<RgbaImage> = None;

        for (c, r) in self.store.present_tiles(table, &range).await? {
            let Some(data) = self.store.query_tile(table, candidate.zoom, c, r).await? else {
                continue;
            };

            let (x0, x1) = window(u64::from(c - range.min_column), span, width);
            let (y0, y1) = window(u64::from(r - range.min_row), span, height);

            let child = self.codec.decode(&data)?;
            let scaled = self.scaler.scale(&child, x1 - x0, y1 - y0);
            let target = canvas.get_or_insert_with(|| RgbaImage::new(width, height));
            imageops::replace(target, &scaled, i64::from(x0), i64::from(y0));
        }

        Ok(canvas)
    }
}

fn validate_address(zoom: u32, column: u32, row: u32) -> Result<(), TileError> {
    if zoom > MAX_ZOOM {
        return Err(TileError::InvalidZoom {
            zoom,
            max: MAX_ZOOM,
        });
    }

    let max = tiles_per_side(zoom) - 1;
    if column > max || row > max {
        return Err(TileError::TileOutOfBounds {
            zoom,
            column,
            row,
            max,
        });
    }
    Ok(())
}

/// Pixel window `[start, end)` of part `index` of `parts` along an edge of
/// `len` pixels. Never empty, so more parts than pixels still gives each part
/// one pixel.
fn window(index: u64, parts: u64, len: u32) -> (u32, u32) {
    let len64 = u64::from(len);
    let start = (index * len64 / parts).min(len64.saturating_sub(1));
    let end = ((index + 1) * len64 / parts).max(start + 1).min(len64.max(1));
    (start as u32, end as u32)
}

// =============================================================================
// Tests
// =============================================================================
