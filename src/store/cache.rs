//! LRU cache for encoded tiles.
//!
//! [`CachedTileStore`] wraps any [`TileStore`] and keeps recently read tile
//! bytes in a [`TileCache`]. Scaling lookups probe many neighbouring tiles,
//! so repeated requests around the same area mostly hit memory.
//!
//! # Size-Based Eviction
//!
//! The cache tracks the total size of cached tiles in bytes and evicts
//! least-recently-used entries when the capacity is exceeded. Misses are not
//! cached, so tiles added to the backing store become visible immediately.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::tile::{TileMatrix, TileRange, TileScaling};

use super::TileStore;

/// Default cache capacity: 64MB
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 64 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: usize = 10_000;

// =============================================================================
// Cache Key
// =============================================================================

/// Identifies one stored tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileCacheKey {
    pub table: Arc<str>,
    pub zoom: u32,
    pub column: u32,
    pub row: u32,
}

impl TileCacheKey {
    pub fn new(table: impl Into<Arc<str>>, zoom: u32, column: u32, row: u32) -> Self {
        Self {
            table: table.into(),
            zoom,
            column,
            row,
        }
    }
}

// =============================================================================
// Tile Cache
// =============================================================================

struct CacheState {
    entries: LruCache<TileCacheKey, Bytes>,
    size: usize,
}

/// LRU cache for encoded tiles with size-based capacity.
///
/// Safe to share across tasks via `Arc`.
pub struct TileCache {
    state: Mutex<CacheState>,
    max_size: usize,
}

impl TileCache {
    /// Create a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TILE_CACHE_CAPACITY)
    }

    /// Create a cache holding at most `max_size` bytes of tile data.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache bounded by both total bytes and entry count.
    ///
    /// An entry count of zero is treated as one.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(max_entries),
                size: 0,
            }),
            max_size,
        }
    }

    /// Get a tile, marking it recently used.
    pub async fn get(&self, key: &TileCacheKey) -> Option<Bytes> {
        self.state.lock().await.entries.get(key).cloned()
    }

    /// Check for a tile without updating LRU order.
    pub async fn contains(&self, key: &TileCacheKey) -> bool {
        self.state.lock().await.entries.contains(key)
    }

    /// Store a tile, evicting least-recently-used entries while over capacity.
    pub async fn put(&self, key: TileCacheKey, data: Bytes) {
        let mut state = self.state.lock().await;
        let data_size = data.len();

        // push() hands back the replaced value or the entry evicted by the count bound
        if let Some((_, old)) = state.entries.push(key, data) {
            state.size = state.size.saturating_sub(old.len());
        }
        state.size += data_size;

        while state.size > self.max_size {
            match state.entries.pop_lru() {
                Some((_, evicted)) => state.size = state.size.saturating_sub(evicted.len()),
                None => break,
            }
        }
    }

    /// Remove a tile, returning it if it was cached.
    pub async fn remove(&self, key: &TileCacheKey) -> Option<Bytes> {
        let mut state = self.state.lock().await;
        let data = state.entries.pop(key)?;
        state.size = state.size.saturating_sub(data.len());
        Some(data)
    }

    /// Drop every cached tile of a table.
    pub async fn invalidate_table(&self, table: &str) {
        let mut state = self.state.lock().await;
        let keys: Vec<TileCacheKey> = state
            .entries
            .iter()
            .filter(|(k, _)| &*k.table == table)
            .map(|(k, _)| k.clone())
            .collect();
        for key in keys {
            if let Some(data) = state.entries.pop(&key) {
                state.size = state.size.saturating_sub(data.len());
            }
        }
    }

    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.size = 0;
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    /// Current total size of cached tiles in bytes.
    pub async fn size(&self) -> usize {
        self.state.lock().await.size
    }

    /// Maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Cached Store
// =============================================================================

/// [`TileStore`] that caches tile bytes read from an inner store.
pub struct CachedTileStore<S> {
    inner: S,
    cache: TileCache,
}

impl<S: TileStore> CachedTileStore<S> {
    pub fn new(inner: S, cache: TileCache) -> Self {
        Self { inner, cache }
    }

    pub fn with_capacity(inner: S, max_size: usize) -> Self {
        Self::new(inner, TileCache::with_capacity(max_size))
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }
}

#[async_trait]
impl<S: TileStore> TileStore for CachedTileStore<S> {
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
        let key = TileCacheKey::new(table, zoom, column, row);
        if let Some(data) = self.cache.get(&key).await {
            return Ok(Some(data));
        }

        let tile = self.inner.query_tile(table, zoom, column, row).await?;
        if let Some(data) = &tile {
            self.cache.put(key, data.clone()).await;
        }
        Ok(tile)
    }

    async fn present_tiles(
        &self,
        table: &str,
        range: &TileRange,
    ) -> Result<Vec<(u32, u32)>, StoreError> {
        self.inner.present_tiles(table, range).await
    }

    async fn tile_zoom_range(&self, table: &str) -> Result<Option<(u32, u32)>, StoreError> {
        self.inner.tile_zoom_range(table).await
    }

    async fn tile_scaling_for(&self, table: &str) -> Result<Option<TileScaling>, StoreError> {
        self.inner.tile_scaling_for(table).await
    }

    async fn tile_matrix(&self, table: &str, zoom: u32) -> Result<Option<TileMatrix>, StoreError> {
        self.inner.tile_matrix(table, zoom).await
    }
}

// =============================================================================
// Tests
// =============================================================================
