//! API integration tests for the HTTP tile endpoints.
//!
//! Tests verify:
//! - Tile retrieval with and without extensions, scaled and exact
//! - Existence checks and table metadata
//! - HTTP response codes, JSON error bodies and headers

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use gpkg_tiles::store::MemoryTileStore;
use gpkg_tiles::tile::{TileRetriever, TileScaling, TileScalingType};
use gpkg_tiles::{create_router, RouterConfig};

use super::test_utils::{
    create_test_jpeg, create_test_png, decode_rgba, is_valid_jpeg, is_valid_png,
};

fn test_router() -> Router {
    let store = MemoryTileStore::new()
        .with_tile("osm", 1, 0, 0, create_test_png(256, 256, [255, 0, 0, 255]))
        .with_tile("osm", 1, 1, 0, create_test_png(256, 256, [0, 255, 0, 255]))
        .with_scaling(
            TileScaling::new("osm", TileScalingType::InOut)
                .with_zoom_in(Some(1))
                .with_zoom_out(Some(2)),
        )
        .with_tile("photo", 0, 0, 0, create_test_jpeg(256, 256, [90, 90, 90]));

    create_router(
        TileRetriever::new(store),
        RouterConfig::new().with_tracing(false),
    )
}

async fn get(router: Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router.oneshot(request).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Tiles
// =============================================================================

#[tokio::test]
async fn test_exact_tile() {
    let response = get(test_router(), "/tiles/osm/1/0/0.png").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=3600"
    );
    assert_eq!(response.headers().get("x-tile-source-zoom").unwrap(), "1");
    assert_eq!(response.headers().get("x-tile-scaled").unwrap(), "false");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, create_test_png(256, 256, [255, 0, 0, 255]));
}

#[tokio::test]
async fn test_tile_without_extension() {
    let response = get(test_router(), "/tiles/osm/1/1/0").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
}

#[tokio::test]
async fn test_zoom_out_fallback() {
    let response = get(test_router(), "/tiles/osm/2/1/1.png").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-tile-source-zoom").unwrap(), "1");
    assert_eq!(response.headers().get("x-tile-scaled").unwrap(), "true");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let img = decode_rgba(&body);
    assert_eq!(img.get_pixel(128, 128).0, [255, 0, 0, 255]);
}

#[tokio::test]
async fn test_zoom_in_fallback() {
    let response = get(test_router(), "/tiles/osm/0/0/0").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-tile-source-zoom").unwrap(), "1");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let img = decode_rgba(&body);
    assert_eq!(img.get_pixel(10, 10).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(200, 10).0, [0, 255, 0, 255]);
}

#[tokio::test]
async fn test_requested_size() {
    let response = get(test_router(), "/tiles/osm/1/0/0.png?width=512&height=512").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(decode_rgba(&body).dimensions(), (512, 512));
}

#[tokio::test]
async fn test_transcode_to_requested_format() {
    let response = get(test_router(), "/tiles/osm/1/0/0.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/jpeg");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_jpeg(&body));

    let response = get(test_router(), "/tiles/photo/0/0/0.png").await;
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_png(&body));

    // No extension keeps the stored format
    let response = get(test_router(), "/tiles/photo/0/0/0").await;
    assert_eq!(response.headers().get("content-type").unwrap(), "image/jpeg");
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_missing_tile_is_404_json() {
    // Only zoom 1 holds data, so there is nothing to scale from
    let response = get(test_router(), "/tiles/osm/1/1/1.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let error = body_json(response).await;
    assert_eq!(error["error"], "tile_not_found");
    assert_eq!(error["status"], 404);
}

#[tokio::test]
async fn test_missing_table() {
    let response = get(test_router(), "/tiles/nope/0/0/0.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "table_not_found");
}

#[tokio::test]
async fn test_out_of_bounds_and_invalid_requests() {
    let response = get(test_router(), "/tiles/osm/1/2/0.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "tile_out_of_bounds");

    let response = get(test_router(), "/tiles/osm/31/0/0.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_zoom");

    let response = get(test_router(), "/tiles/osm/1/0/0.gif").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");

    let response = get(test_router(), "/tiles/osm/1/0/0.png?width=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_dimensions");
}

// =============================================================================
// Exists / Tables / Health
// =============================================================================

#[tokio::test]
async fn test_exists_endpoint() {
    let response = get(test_router(), "/tiles/osm/2/0/0/exists").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["exists"], true);

    let response = get(test_router(), "/tiles/osm/1/1/1/exists").await;
    assert_eq!(body_json(response).await["exists"], false);

    let response = get(test_router(), "/tiles/photo/1/0/0/exists").await;
    assert_eq!(body_json(response).await["exists"], false);
}

#[tokio::test]
async fn test_tables_endpoints() {
    let response = get(test_router(), "/tables").await;
    assert_eq!(response.status(), StatusCode::OK);
    let tables = body_json(response).await;
    assert_eq!(tables["tables"], serde_json::json!(["osm", "photo"]));

    let response = get(test_router(), "/tables/osm").await;
    assert_eq!(response.status(), StatusCode::OK);
    let table = body_json(response).await;
    assert_eq!(table["min_zoom"], 1);
    assert_eq!(table["max_zoom"], 1);
    assert_eq!(table["tile_scaling"]["scaling_type"], "in_out");
    assert_eq!(table["tile_scaling"]["zoom_out"], 2);
    assert_eq!(table["tile_matrices"][0]["matrix_width"], 2);

    let response = get(test_router(), "/tables/photo").await;
    assert!(body_json(response).await["tile_scaling"].is_null());

    let response = get(test_router(), "/tables/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_check() {
    let response = get(test_router(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let health = body_json(response).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
}
