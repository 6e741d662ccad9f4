//! Tile storage backends.
//!
//! The retriever talks to storage only through the [`TileStore`] trait:
//!
//! ```text
//! ┌──────────────────────┐
//! │    TileRetriever     │
//! └──────────┬───────────┘
//!            │ query_tile / tile_zoom_range / tile_scaling_for
//!            ▼
//! ┌──────────────────────┐
//! │   CachedTileStore    │  optional LRU over encoded tiles
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │ DirectoryTileStore   │  {root}/{table}/{z}/{x}/{y}.png
//! │ MemoryTileStore      │  in-process maps
//! └──────────────────────┘
//! ```

mod cache;
mod directory;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;
use crate::tile::{TileMatrix, TileRange, TileScaling, DEFAULT_TILE_SIZE};

pub use cache::{CachedTileStore, TileCache, TileCacheKey, DEFAULT_TILE_CACHE_CAPACITY};
pub use directory::{DirectoryTileStore, TILE_SCALING_FILE};
pub use memory::MemoryTileStore;

/// Read access to tile tables.
///
/// All methods are read-only. A missing tile is `Ok(None)`; an unknown table
/// is `Err(StoreError::TableNotFound)`.
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Names of the tile tables in this store.
    async fn table_names(&self) -> Result<Vec<String>, StoreError>;

    /// Encoded image bytes for a tile, if present.
    async fn query_tile(
        &self,
        table: &str,
        zoom: u32,
        column: u32,
        row: u32,
    ) -> Result<Option<Bytes>, StoreError>;

    /// Lowest and highest zoom levels holding tiles, or `None` for an empty table.
    async fn tile_zoom_range(&self, table: &str) -> Result<Option<(u32, u32)>, StoreError>;

    /// Scaling record for a table, if it has one.
    async fn tile_scaling_for(&self, table: &str) -> Result<Option<TileScaling>, StoreError>;

    /// Whether a tile is present.
    async fn contains_tile(
        &self,
        table: &str,
        zoom: u32,
        column: u32,
        row: u32,
    ) -> Result<bool, StoreError> {
        Ok(self.query_tile(table, zoom, column, row).await?.is_some())
    }

    /// `(column, row)` of every tile present inside `range`, in row-major order.
    ///
    /// The default probes each address in the range. Backends that can list
    /// their contents should override it so the cost follows the stored data
    /// instead of the size of the range.
    async fn present_tiles(
        &self,
        table: &str,
        range: &TileRange,
    ) -> Result<Vec<(u32, u32)>, StoreError> {
        let mut present = Vec::new();
        for (column, row) in range.iter() {
            if self.contains_tile(table, range.zoom, column, row).await? {
                present.push((column, row));
            }
        }
        Ok(present)
    }

    /// Tile matrix of one zoom level. Defaults to the Web Mercator layout.
    async fn tile_matrix(&self, table: &str, zoom: u32) -> Result<Option<TileMatrix>, StoreError> {
        let matrix = self
            .tile_zoom_range(table)
            .await?
            .filter(|(min, max)| (*min..=*max).contains(&zoom))
            .map(|_| TileMatrix::web_mercator(zoom, DEFAULT_TILE_SIZE));
        Ok(matrix)
    }
}

#[async_trait]
impl<T: TileStore + ?Sized> TileStore for Arc<T> {
    async fn table_names(&self) -> Result<Vec<String>, StoreError> {
        (**self).table_names().await
    }

    async fn query_tile(
        &self,
        table: &str,
        zoom: u32,
        column: u32,
        row: u32,
    ) -> Result<Option<Bytes>, StoreError> {
        (**self).query_tile(table, zoom, column, row).await
    }

    async fn tile_zoom_range(&self, table: &str) -> Result<Option<(u32, u32)>, StoreError> {
        (**self).tile_zoom_range(table).await
    }

    async fn tile_scaling_for(&self, table: &str) -> Result<Option<TileScaling>, StoreError> {
        (**self).tile_scaling_for(table).await
    }

    async fn contains_tile(
        &self,
        table: &str,
        zoom: u32,
        column: u32,
        row: u32,
    ) -> Result<bool, StoreError> {
        (**self).contains_tile(table, zoom, column, row).await
    }

    async fn present_tiles(
        &self,
        table: &str,
        range: &TileRange,
    ) -> Result<Vec<(u32, u32)>, StoreError> {
        (**self).present_tiles(table, range).await
    }

    async fn tile_matrix(&self, table: &str, zoom: u32) -> Result<Option<TileMatrix>, StoreError> {
        (**self).tile_matrix(table, zoom).await
    }
}
