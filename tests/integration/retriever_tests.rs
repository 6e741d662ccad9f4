//! Retriever integration tests over real stores.
//!
//! Tests verify:
//! - Directory-backed tables with a scaling record
//! - Exact hits returned untouched, fallbacks re-encoded as PNG
//! - Cache effectiveness for repeated fallback lookups
//! - Export of a scaled table into a servable tree

use std::sync::atomic::Ordering;

use gpkg_tiles::error::{StoreError, TileError};
use gpkg_tiles::projection::BoundingBox;
use gpkg_tiles::store::{CachedTileStore, DirectoryTileStore, MemoryTileStore, TileStore, TILE_SCALING_FILE};
use gpkg_tiles::tile::{
    export_xyz, TileFormat, TileRequest, TileRetriever, TileScaling, TileScalingType,
};

use super::test_utils::{
    create_test_jpeg, create_test_png, decode_rgba, is_valid_png, write_directory_tile,
    CountingTileStore,
};

// =============================================================================
// Directory Store
// =============================================================================

#[tokio::test]
async fn test_directory_table_with_scaling_record() {
    let root = tempfile::tempdir().unwrap();
    let jpeg = create_test_jpeg(256, 256, [10, 120, 200]);
    write_directory_tile(root.path(), "aerial", (3, 4, 2), "jpg", &jpeg).await;
    tokio::fs::write(
        root.path().join("aerial").join(TILE_SCALING_FILE),
        r#"{"scaling_type": "out", "zoom_out": 2}"#,
    )
    .await
    .unwrap();

    let retriever = TileRetriever::new(DirectoryTileStore::new(root.path()));

    // Exact hit keeps the stored JPEG bytes
    let exact = retriever
        .get_tile(&TileRequest::new("aerial", 3, 4, 2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exact.data, jpeg);
    assert_eq!(exact.format, TileFormat::Jpeg);
    assert!(!exact.was_scaled);

    // Zoom 4 and 5 fall back to the zoom 3 tile; zoom 6 is beyond zoom_out
    let scaled = retriever
        .get_tile(&TileRequest::new("aerial", 5, 17, 9))
        .await
        .unwrap()
        .unwrap();
    assert!(scaled.was_scaled);
    assert_eq!(scaled.source_zoom, 3);
    assert_eq!(scaled.format, TileFormat::Png);
    assert!(is_valid_png(&scaled.data));

    // Zoom range comes from the directory tree, so deeper probes only see zoom 3
    assert!(retriever.has_tile("aerial", 4, 8, 5).await.unwrap());
    assert!(retriever.has_tile("aerial", 5, 19, 11).await.unwrap());
    assert!(!retriever.has_tile("aerial", 6, 32, 16).await.unwrap());
    assert!(!retriever.has_tile("aerial", 4, 0, 0).await.unwrap());
}

#[tokio::test]
async fn test_unknown_table_is_an_error() {
    let root = tempfile::tempdir().unwrap();
    let retriever = TileRetriever::new(DirectoryTileStore::new(root.path()));

    let result = retriever.get_tile(&TileRequest::new("missing", 0, 0, 0)).await;
    assert!(matches!(
        result,
        Err(TileError::Store(StoreError::TableNotFound(_)))
    ));
}

#[tokio::test]
async fn test_zoom_in_fallback_from_directory() {
    let root = tempfile::tempdir().unwrap();
    let red = create_test_png(256, 256, [255, 0, 0, 255]);
    let blue = create_test_png(256, 256, [0, 0, 255, 255]);
    // Two of the four zoom 2 children of tile (1, 0, 0)
    write_directory_tile(root.path(), "t", (2, 0, 0), "png", &red).await;
    write_directory_tile(root.path(), "t", (2, 1, 1), "png", &blue).await;
    tokio::fs::write(
        root.path().join("t").join(TILE_SCALING_FILE),
        r#"{"scaling_type": "in"}"#,
    )
    .await
    .unwrap();

    let retriever = TileRetriever::new(DirectoryTileStore::new(root.path()));
    let tile = retriever
        .get_tile(&TileRequest::new("t", 1, 0, 0))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(tile.source_zoom, 2);
    let img = decode_rgba(&tile.data);
    assert_eq!(img.dimensions(), (256, 256));
    assert_eq!(img.get_pixel(10, 10).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(200, 200).0, [0, 0, 255, 255]);
    // Missing children leave transparent quadrants
    assert_eq!(img.get_pixel(200, 10).0[3], 0);
    assert_eq!(img.get_pixel(10, 200).0[3], 0);
}

// =============================================================================
// Caching
// =============================================================================

#[tokio::test]
async fn test_cached_store_absorbs_repeated_fallbacks() {
    let inner = MemoryTileStore::new()
        .with_tile("t", 2, 1, 1, create_test_png(256, 256, [1, 2, 3, 255]))
        .with_scaling(TileScaling::new("t", TileScalingType::Out));
    let counting = CountingTileStore::new(inner);
    let queries = counting.counter();

    let retriever = TileRetriever::new(CachedTileStore::with_capacity(counting, 1024 * 1024));
    let request = TileRequest::new("t", 3, 2, 3);

    retriever.get_tile(&request).await.unwrap().unwrap();
    let after_first = queries.load(Ordering::SeqCst);
    assert_eq!(after_first, 2, "exact miss plus ancestor hit");

    // Misses are not cached, the ancestor hit is
    retriever.get_tile(&request).await.unwrap().unwrap();
    assert_eq!(queries.load(Ordering::SeqCst), after_first + 1);
}

// =============================================================================
// Sizes
// =============================================================================

#[tokio::test]
async fn test_non_square_output() {
    let store = MemoryTileStore::new()
        .with_tile("t", 0, 0, 0, create_test_png(256, 256, [0, 255, 0, 255]))
        .with_scaling(TileScaling::new("t", TileScalingType::Out));
    let retriever = TileRetriever::new(store);

    let tile = retriever
        .get_tile(&TileRequest::new("t", 1, 1, 0).with_size(512, 128))
        .await
        .unwrap()
        .unwrap();
    assert_eq!((tile.width, tile.height), (512, 128));
    assert_eq!(decode_rgba(&tile.data).dimensions(), (512, 128));

    let err = retriever
        .get_tile(&TileRequest::new("t", 0, 0, 0).with_size(0, 256))
        .await;
    assert!(matches!(err, Err(TileError::InvalidDimensions { .. })));
}

// =============================================================================
// Export
// =============================================================================

#[tokio::test]
async fn test_export_then_serve_without_scaling() {
    let source = tempfile::tempdir().unwrap();
    let png = create_test_png(256, 256, [50, 50, 50, 255]);
    write_directory_tile(source.path(), "base", (0, 0, 0), "png", &png).await;
    tokio::fs::write(
        source.path().join("base").join(TILE_SCALING_FILE),
        r#"{"scaling_type": "out"}"#,
    )
    .await
    .unwrap();

    let retriever = TileRetriever::new(DirectoryTileStore::new(source.path()));
    let target = tempfile::tempdir().unwrap();
    let summary = export_xyz(
        &retriever,
        "base",
        &BoundingBox::world(),
        0..=2,
        &target.path().join("filled"),
    )
    .await
    .unwrap();

    assert_eq!(summary.written, 1 + 4 + 16);
    assert_eq!(summary.scaled, 4 + 16);
    assert_eq!(summary.missing, 0);

    // The exported tree answers every tile exactly
    let exported = DirectoryTileStore::new(target.path());
    assert_eq!(exported.tile_zoom_range("filled").await.unwrap(), Some((0, 2)));
    assert_eq!(exported.tile_scaling_for("filled").await.unwrap(), None);
    assert!(exported.contains_tile("filled", 2, 3, 3).await.unwrap());
}
