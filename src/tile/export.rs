//! Export of a tile table into an XYZ directory tree.
//!
//! Every tile of [`tile_range_for_extent`] is requested through the
//! retriever, so tables with a scaling record fill gaps from neighbouring
//! zoom levels. Output is `{out_dir}/{z}/{x}/{y}.{png|jpg}`, readable by
//! `DirectoryTileStore`.

use std::ops::RangeInclusive;
use std::path::Path;

use serde::Serialize;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{StoreError, TileError};
use crate::projection::BoundingBox;
use crate::store::TileStore;

use super::math::tile_range_for_extent;
use super::raster::ImageScaler;
use super::retriever::{TileRequest, TileRetriever};

/// Counts from one export run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Tiles written, exact and scaled
    pub written: u64,
    /// Written tiles that came from another zoom level
    pub scaled: u64,
    /// Tiles with no data at all
    pub missing: u64,
}

/// Write every tile covering `bbox` for each zoom in `zooms`.
///
/// # Errors
/// Retrieval errors are returned as-is; filesystem failures surface as
/// `TileError::Store(StoreError::Io)`.
pub async fn export_xyz<S: TileStore, I: ImageScaler>(
    retriever: &TileRetriever<S, I>,
    table: &str,
    bbox: &BoundingBox,
    zooms: RangeInclusive<u32>,
    out_dir: &Path,
) -> Result<ExportSummary, TileError> {
    let mut summary = ExportSummary::default();

    for zoom in zooms {
        let range = tile_range_for_extent(bbox, zoom);
        let before = summary;

        for (column, row) in range.iter() {
            let request = TileRequest::new(table, zoom, column, row);
            let Some(tile) = retriever.get_tile(&request).await? else {
                summary.missing += 1;
                continue;
            };

            let dir = out_dir.join(zoom.to_string()).join(column.to_string());
            fs::create_dir_all(&dir).await.map_err(StoreError::from)?;
            let path = dir.join(format!("{row}.{}", tile.format.extension()));
            fs::write(&path, &tile.data).await.map_err(StoreError::from)?;
            debug!(path = %path.display(), source_zoom = tile.source_zoom, "Wrote tile");

            summary.written += 1;
            if tile.was_scaled {
                summary.scaled += 1;
            }
        }

        info!(
            table,
            zoom,
            tiles = range.count(),
            written = summary.written - before.written,
            scaled = summary.scaled - before.scaled,
            missing = summary.missing - before.missing,
            "Exported zoom level"
        );
    }

    Ok(summary)
}
