//! Tile tables stored as XYZ directory trees.
//!
//! ```text
//! {root}/
//!   {table}/
//!     tile_scaling.json          optional scaling record
//!     {z}/{x}/{y}.png            tiles (.png, .jpg or .jpeg)
//! ```
//!
//! This is the same layout `export_xyz` writes, so an exported pyramid can be
//! served directly.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tokio::fs;
use tracing::debug;

use crate::error::StoreError;
use crate::tile::{TileRange, TileScaling, TileScalingType};

use super::TileStore;

/// File holding a table's scaling record
pub const TILE_SCALING_FILE: &str = "tile_scaling.json";

const TILE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Contents of `tile_scaling.json`; the table name comes from the directory.
#[derive(Debug, Deserialize)]
struct ScalingFile {
    scaling_type: TileScalingType,
    #[serde(default)]
    zoom_in: Option<u32>,
    #[serde(default)]
    zoom_out: Option<u32>,
}

/// Tile store reading XYZ trees from the filesystem.
#[derive(Debug, Clone)]
pub struct DirectoryTileStore {
    root: PathBuf,
}

impl DirectoryTileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a table. Names that could escape the root never match.
    fn table_dir(&self, table: &str) -> Result<PathBuf, StoreError> {
        let valid = !table.is_empty() && !table.starts_with('.') && !table.contains(['/', '\\']);
        if !valid {
            return Err(StoreError::TableNotFound(table.to_string()));
        }
        Ok(self.root.join(table))
    }

    async fn existing_table_dir(&self, table: &str) -> Result<PathBuf, StoreError> {
        let dir = self.table_dir(table)?;
        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(StoreError::TableNotFound(table.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::TableNotFound(table.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Numeric names of the subdirectories of `dir`.
async fn numeric_subdirs(dir: &Path) -> Result<Vec<u32>, StoreError> {
    let mut entries = fs::read_dir(dir).await?;
    let mut values = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        if let Some(value) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) {
            values.push(value);
        }
    }
    Ok(values)
}

/// Row numbers of the tile files in a column directory. Missing dir is empty.
async fn tile_rows(dir: &Path) -> Result<Vec<u32>, StoreError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut rows = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let is_tile = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| TILE_EXTENSIONS.contains(&ext));
        let row = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<u32>().ok());
        if let (true, Some(row)) = (is_tile, row) {
            rows.push(row);
        }
    }
    rows.sort_unstable();
    rows.dedup();
    Ok(rows)
}

/// Column directories of a zoom directory. Missing dir is empty.
async fn tile_columns(dir: &Path) -> Result<Vec<u32>, StoreError> {
    match fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => numeric_subdirs(dir).await,
        Ok(_) => Ok(Vec::new()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Whether a zoom directory holds at least one tile file.
async fn zoom_has_tiles(dir: &Path) -> Result<bool, StoreError> {
    for column in tile_columns(dir).await? {
        if !tile_rows(&dir.join(column.to_string())).await?.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

#[async_trait]
impl TileStore for DirectoryTileStore {
    async fn table_names(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
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
        let dir = self.existing_table_dir(table).await?;
        let base = dir.join(zoom.to_string()).join(column.to_string());

        for ext in TILE_EXTENSIONS {
            let path = base.join(format!("{row}.{ext}"));
            match fs::read(&path).await {
                Ok(data) => return Ok(Some(Bytes::from(data))),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    async fn present_tiles(
        &self,
        table: &str,
        range: &TileRange,
    ) -> Result<Vec<(u32, u32)>, StoreError> {
        let zoom_dir = self
            .existing_table_dir(table)
            .await?
            .join(range.zoom.to_string());

        let mut present = Vec::new();
        for column in tile_columns(&zoom_dir).await? {
            if !(range.min_column..=range.max_column).contains(&column) {
                continue;
            }
            for row in tile_rows(&zoom_dir.join(column.to_string())).await? {
                if range.contains(column, row) {
                    present.push((column, row));
                }
            }
        }
        present.sort_unstable_by_key(|(column, row)| (*row, *column));
        Ok(present)
    }

    async fn tile_zoom_range(&self, table: &str) -> Result<Option<(u32, u32)>, StoreError> {
        let dir = self.existing_table_dir(table).await?;

        let mut zooms = Vec::new();
        for zoom in numeric_subdirs(&dir).await? {
            if zoom_has_tiles(&dir.join(zoom.to_string())).await? {
                zooms.push(zoom);
            }
        }
        let range = zooms.iter().min().copied().zip(zooms.iter().max().copied());
        Ok(range)
    }

    async fn tile_scaling_for(&self, table: &str) -> Result<Option<TileScaling>, StoreError> {
        let path = self.existing_table_dir(table).await?.join(TILE_SCALING_FILE);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let file: ScalingFile =
            serde_json::from_slice(&raw).map_err(|e| StoreError::InvalidData {
                message: format!("{}: {e}", path.display()),
            })?;

        debug!(table, scaling_type = %file.scaling_type, "Loaded tile scaling record");
        Ok(Some(
            TileScaling::new(table, file.scaling_type)
                .with_zoom_in(file.zoom_in)
                .with_zoom_out(file.zoom_out),
        ))
    }
}
