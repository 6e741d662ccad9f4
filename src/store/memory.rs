use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::tile::{TileRange, TileScaling};

use super::TileStore;

#[derive(Debug, Default)]
struct MemoryTable {
    /// Keyed by (zoom, column, row)
    tiles: BTreeMap<(u32, u32, u32), Bytes>,
    scaling: Option<TileScaling>,
}

/// Tile store held entirely in memory.
///
/// Useful for tests and for embedding small pyramids.
#[derive(Debug, Default)]
pub struct MemoryTileStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tile while building the store.
    pub fn with_tile(mut self, table: &str, zoom: u32, column: u32, row: u32, data: impl Into<Bytes>) -> Self {
        self.tables
            .get_mut()
            .entry(table.to_string())
            .or_default()
            .tiles
            .insert((zoom, column, row), data.into());
        self
    }

    /// Attach a scaling record while building the store.
    pub fn with_scaling(mut self, scaling: TileScaling) -> Self {
        let name = scaling.table_name.clone();
        self.tables.get_mut().entry(name).or_default().scaling = Some(scaling);
        self
    }

    /// Create an empty table.
    pub async fn create_table(&self, table: &str) {
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default();
    }

    /// Insert or replace a tile, creating the table if needed.
    pub async fn insert_tile(&self, table: &str, zoom: u32, column: u32, row: u32, data: Bytes) {
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .tiles
            .insert((zoom, column, row), data);
    }

    /// Insert or replace a table's scaling record.
    pub async fn set_tile_scaling(&self, scaling: TileScaling) {
        let name = scaling.table_name.clone();
        self.tables.write().await.entry(name).or_default().scaling = Some(scaling);
    }

    /// Remove a table's scaling record, returning it.
    pub async fn remove_tile_scaling(&self, table: &str) -> Option<TileScaling> {
        self.tables
            .write()
            .await
            .get_mut(table)
            .and_then(|t| t.scaling.take())
    }

    /// Number of tiles in a table.
    pub async fn tile_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map_or(0, |t| t.tiles.len())
    }
}

fn not_found(table: &str) -> StoreError {
    StoreError::TableNotFound(table.to_string())
}

#[async_trait]
impl TileStore for MemoryTileStore {
    async fn table_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn query_tile(
        &self,
        table: &str,
        zoom: u32,
        column: u32,
        row: u32,
    ) -> Result<Option<Bytes>, StoreError> {
        let tables = self.tables.read().await;
        let table_data = tables.get(table).ok_or_else(|| not_found(table))?;
        Ok(table_data.tiles.get(&(zoom, column, row)).cloned())
    }

    async fn present_tiles(
        &self,
        table: &str,
        range: &TileRange,
    ) -> Result<Vec<(u32, u32)>, StoreError> {
        let tables = self.tables.read().await;
        let table_data = tables.get(table).ok_or_else(|| not_found(table))?;

        let start = (range.zoom, range.min_column, range.min_row);
        let end = (range.zoom, range.max_column, range.max_row);
        let mut present: Vec<(u32, u32)> = table_data
            .tiles
            .range(start..=end)
            .map(|((_, column, row), _)| (*column, *row))
            .filter(|(column, row)| range.contains(*column, *row))
            .collect();
        present.sort_by_key(|(column, row)| (*row, *column));
        Ok(present)
    }

    async fn tile_zoom_range(&self, table: &str) -> Result<Option<(u32, u32)>, StoreError> {
        let tables = self.tables.read().await;
        let table_data = tables.get(table).ok_or_else(|| not_found(table))?;

        let min = table_data.tiles.keys().next().map(|(z, _, _)| *z);
        let max = table_data.tiles.keys().next_back().map(|(z, _, _)| *z);
        Ok(min.zip(max))
    }

    async fn tile_scaling_for(&self, table: &str) -> Result<Option<TileScaling>, StoreError> {
        let tables = self.tables.read().await;
        let table_data = tables.get(table).ok_or_else(|| not_found(table))?;
        Ok(table_data.scaling.clone())
    }
}
