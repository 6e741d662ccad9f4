//! Tile scaling integration tests.
//!
//! Tests verify:
//! - `has_tile` against a table holding a single zoom 16 tile under each policy
//! - Candidate zoom ordering for the combined policies
//! - Bounding box projection used to size exports

use gpkg_tiles::projection::{
    BoundingBox, ProjectionRegistry, WEB_MERCATOR_HALF_WORLD, WEB_MERCATOR_MAX_LATITUDE,
    WEB_MERCATOR_MIN_LATITUDE,
};
use gpkg_tiles::tile::{
    tile_range_for_extent, TileRequest, TileRetriever, TileScaling, TileScalingType,
};

use super::test_utils::{fixture_store, FIXTURE_TILE};

/// (zoom, column, row) probes around the fixture tile.
const Z17: (u32, u32, u32) = (17, 27366, 49778);
const Z18: (u32, u32, u32) = (18, 54732, 99556);
const Z15: (u32, u32, u32) = (15, 6841, 12444);
const Z14: (u32, u32, u32) = (14, 3420, 6222);
const Z13: (u32, u32, u32) = (13, 1710, 3111);

async fn has(retriever: &TileRetriever<gpkg_tiles::MemoryTileStore>, probe: (u32, u32, u32)) -> bool {
    let (zoom, column, row) = probe;
    retriever
        .has_tile("fixture", zoom, column, row)
        .await
        .unwrap()
}

// =============================================================================
// has_tile Fixtures
// =============================================================================

#[tokio::test]
async fn test_zoom_in_policy_fixture() {
    let retriever = TileRetriever::new(fixture_store(TileScalingType::In));

    assert!(!has(&retriever, Z17).await);
    assert!(!has(&retriever, Z18).await);
    assert!(has(&retriever, Z15).await);
    assert!(has(&retriever, Z14).await);
    assert!(!has(&retriever, Z13).await);
}

#[tokio::test]
async fn test_zoom_out_policy_fixture() {
    let retriever = TileRetriever::new(fixture_store(TileScalingType::Out));

    assert!(has(&retriever, Z17).await);
    assert!(!has(&retriever, Z18).await);
    assert!(!has(&retriever, Z15).await);
    assert!(!has(&retriever, Z14).await);
    assert!(!has(&retriever, Z13).await);
}

#[tokio::test]
async fn test_combined_policies_fixture() {
    for scaling_type in [
        TileScalingType::InOut,
        TileScalingType::OutIn,
        TileScalingType::ClosestInOut,
        TileScalingType::ClosestOutIn,
    ] {
        let retriever = TileRetriever::new(fixture_store(scaling_type));

        assert!(has(&retriever, Z17).await, "{scaling_type}");
        assert!(!has(&retriever, Z18).await, "{scaling_type}");
        assert!(has(&retriever, Z15).await, "{scaling_type}");
        assert!(has(&retriever, Z14).await, "{scaling_type}");
        assert!(!has(&retriever, Z13).await, "{scaling_type}");
    }
}

#[tokio::test]
async fn test_fixture_tile_itself_and_neighbour() {
    let retriever = TileRetriever::new(fixture_store(TileScalingType::In));
    assert!(has(&retriever, FIXTURE_TILE).await);

    let (zoom, column, row) = FIXTURE_TILE;
    assert!(!has(&retriever, (zoom, column + 1, row)).await);
}

#[tokio::test]
async fn test_scaled_tile_reports_source_zoom() {
    let retriever = TileRetriever::new(fixture_store(TileScalingType::Out));
    let (zoom, column, row) = Z17;

    let tile = retriever
        .get_tile(&TileRequest::new("fixture", zoom, column, row))
        .await
        .unwrap()
        .unwrap();
    assert!(tile.was_scaled);
    assert_eq!(tile.source_zoom, 16);
    assert_eq!((tile.width, tile.height), (256, 256));
}

// =============================================================================
// Candidate Ordering
// =============================================================================

#[test]
fn test_policy_orders_over_wide_range() {
    let order = |scaling_type| {
        TileScaling::new("t", scaling_type)
            .with_zoom_in(Some(2))
            .with_zoom_out(Some(2))
            .candidate_zooms(10, 0, 20)
    };

    assert_eq!(order(TileScalingType::In), vec![11, 12]);
    assert_eq!(order(TileScalingType::Out), vec![9, 8]);
    assert_eq!(order(TileScalingType::InOut), vec![11, 12, 9, 8]);
    assert_eq!(order(TileScalingType::OutIn), vec![9, 8, 11, 12]);
    assert_eq!(order(TileScalingType::ClosestInOut), vec![11, 9, 12, 8]);
    assert_eq!(order(TileScalingType::ClosestOutIn), vec![9, 11, 8, 12]);
}

// =============================================================================
// Projection
// =============================================================================

#[test]
fn test_project_over_wide_box_clamps_first() {
    let registry = ProjectionRegistry::new();
    let bbox = BoundingBox::new(-200.0, 200.0, -90.0, 90.0);

    let clamped = bbox.clamped_to_web_mercator();
    assert_eq!(
        clamped,
        BoundingBox::new(-180.0, 180.0, WEB_MERCATOR_MIN_LATITUDE, WEB_MERCATOR_MAX_LATITUDE)
    );

    let projected = bbox
        .project(Some("EPSG:4326"), Some("epsg:3857"), &registry)
        .unwrap();
    let world = BoundingBox::new(
        -WEB_MERCATOR_HALF_WORLD,
        WEB_MERCATOR_HALF_WORLD,
        -WEB_MERCATOR_HALF_WORLD,
        WEB_MERCATOR_HALF_WORLD,
    );
    assert!(projected.approx_eq(&world, 1e-3), "{projected:?}");
    assert!(projected.min_latitude.is_finite() && projected.max_latitude.is_finite());
}

#[test]
fn test_tile_extent_covers_one_tile() {
    let (zoom, column, row) = FIXTURE_TILE;
    let bbox = BoundingBox::from_tile(zoom, column, row);

    // Shrink slightly so edge rounding stays inside the tile
    let inner = BoundingBox::new(
        bbox.min_longitude + 1e-9,
        bbox.max_longitude - 1e-9,
        bbox.min_latitude + 1e-9,
        bbox.max_latitude - 1e-9,
    );
    let range = tile_range_for_extent(&inner, zoom);
    assert_eq!(range.count(), 1);
    assert!(range.contains(column, row));
}
