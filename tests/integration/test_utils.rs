//! Test utilities for integration tests.
//!
//! Helpers for fabricating tile images and geometry blobs, plus a store
//! wrapper that counts backend reads.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};

use gpkg_tiles::error::StoreError;
use gpkg_tiles::store::{MemoryTileStore, TileStore};
use gpkg_tiles::tile::{TileScaling, TileScalingType};

// =============================================================================
// Images
// =============================================================================

/// Encode a solid-colour RGBA PNG.
pub fn create_test_png(width: u32, height: u32, color: [u8; 4]) -> Bytes {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .expect("Failed to encode test PNG");
    Bytes::from(buf)
}

/// Encode a solid-colour RGB JPEG.
pub fn create_test_jpeg(width: u32, height: u32, color: [u8; 3]) -> Bytes {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .encode_image(&img)
        .expect("Failed to encode test JPEG");
    Bytes::from(buf)
}

pub fn is_valid_png(data: &[u8]) -> bool {
    data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
}

pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 4 && data[0..2] == [0xFF, 0xD8] && data[data.len() - 2..] == [0xFF, 0xD9]
}

pub fn decode_rgba(data: &[u8]) -> RgbaImage {
    image::load_from_memory(data)
        .expect("Failed to decode test image")
        .to_rgba8()
}

// =============================================================================
// Fixture Stores
// =============================================================================

/// Column and row of the only tile in the scaling fixture table, at zoom 16.
pub const FIXTURE_TILE: (u32, u32, u32) = (16, 13683, 24889);

/// A table holding a single 256x256 tile at zoom 16 with the given policy.
pub fn fixture_store(scaling_type: TileScalingType) -> MemoryTileStore {
    let (zoom, column, row) = FIXTURE_TILE;
    MemoryTileStore::new()
        .with_tile(
            "fixture",
            zoom,
            column,
            row,
            create_test_png(256, 256, [200, 40, 40, 255]),
        )
        .with_scaling(
            TileScaling::new("fixture", scaling_type)
                .with_zoom_in(Some(2))
                .with_zoom_out(Some(1)),
        )
}

/// Write a tile into an XYZ directory tree.
pub async fn write_directory_tile(
    root: &Path,
    table: &str,
    (zoom, column, row): (u32, u32, u32),
    ext: &str,
    data: &[u8],
) {
    let dir = root
        .join(table)
        .join(zoom.to_string())
        .join(column.to_string());
    tokio::fs::create_dir_all(&dir).await.unwrap();
    tokio::fs::write(dir.join(format!("{row}.{ext}")), data)
        .await
        .unwrap();
}

// =============================================================================
// Counting Store
// =============================================================================

/// A store wrapper that counts `query_tile` calls reaching the backend.
#[derive(Clone)]
pub struct CountingTileStore<S> {
    inner: S,
    queries: Arc<AtomicUsize>,
}

impl<S: TileStore> CountingTileStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared handle to the counter, usable after the store is moved.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.queries)
    }
}

#[async_trait]
impl<S: TileStore> TileStore for CountingTileStore<S> {
    async fn table_names(&self) -> Result<Vec<String>, StoreError> {
        self.inner.table_names().await
    }

    async fn query_tile(
        &self,
        table: &str,
        zoom: u32,
        column: u32,
        row: u32,
    ) -> Result<Option<Bytes>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query_tile(table, zoom, column, row).await
    }

    async fn tile_zoom_range(&self, table: &str) -> Result<Option<(u32, u32)>, StoreError> {
        self.inner.tile_zoom_range(table).await
    }

    async fn tile_scaling_for(&self, table: &str) -> Result<Option<TileScaling>, StoreError> {
        self.inner.tile_scaling_for(table).await
    }
}

// =============================================================================
// Geometry Blobs
// =============================================================================

/// Hand-assembled little-endian point blob with an XY envelope.
pub fn point_blob_le(srs_id: i32, x: f64, y: f64) -> Vec<u8> {
    let mut blob = Vec::new();
    blob.extend_from_slice(b"GP");
    blob.push(0); // version
    blob.push(0b0000_0011); // XY envelope, little-endian
    blob.extend_from_slice(&srs_id.to_le_bytes());
    for v in [x, x, y, y] {
        blob.extend_from_slice(&v.to_le_bytes());
    }
    // WKB point, little-endian
    blob.push(1);
    blob.extend_from_slice(&1u32.to_le_bytes());
    blob.extend_from_slice(&x.to_le_bytes());
    blob.extend_from_slice(&y.to_le_bytes());
    blob
}
