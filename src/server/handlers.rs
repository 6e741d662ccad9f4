//! HTTP request handlers for the tile API.
//!
//! # Endpoints
//!
//! - `GET /tiles/{table}/{z}/{x}/{y}[.png|.jpg]` - Serve a tile
//! - `GET /tiles/{table}/{z}/{x}/{y}/exists` - Check tile availability
//! - `GET /tables` - List tile tables
//! - `GET /tables/{table}` - Table zoom range and scaling record
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{StoreError, TileError};
use crate::store::TileStore;
use crate::tile::{
    TileFormat, TileImageCodec, TileMatrix, TileRequest, TileRetriever, TileScaling,
    DEFAULT_TILE_SIZE,
};

const X_TILE_SOURCE_ZOOM: HeaderName = HeaderName::from_static("x-tile-source-zoom");
const X_TILE_SCALED: HeaderName = HeaderName::from_static("x-tile-scaled");

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the tile retriever.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: TileStore> {
    pub retriever: Arc<TileRetriever<S>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Output size when a request has no `width`/`height`
    pub tile_size: u32,
}

impl<S: TileStore> AppState<S> {
    pub fn new(retriever: TileRetriever<S>) -> Self {
        Self {
            retriever: Arc::new(retriever),
            cache_max_age: 3600,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }

    pub fn with_cache_max_age(mut self, cache_max_age: u32) -> Self {
        self.cache_max_age = cache_max_age;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }
}

impl<S: TileStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            retriever: Arc::clone(&self.retriever),
            cache_max_age: self.cache_max_age,
            tile_size: self.tile_size,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile requests.
///
/// Extracted from: `/tiles/{table}/{z}/{x}/{y}` where the last segment is
/// the row with an optional `.png`, `.jpg` or `.jpeg` extension
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    pub table: String,
    pub z: u32,
    pub x: u32,

    /// Tile row with optional extension (e.g., "0" or "0.png")
    #[serde(rename = "y")]
    pub filename: String,
}

impl TilePathParams {
    /// Split the filename into the row and the requested output format.
    ///
    /// Returns `None` for a non-numeric row or an unknown extension.
    pub fn y(&self) -> Option<(u32, Option<TileFormat>)> {
        let (stem, format) = match self.filename.split_once('.') {
            Some((stem, ext)) => (stem, Some(TileFormat::from_extension(ext)?)),
            None => (self.filename.as_str(), None),
        };
        Some((stem.parse().ok()?, format))
    }
}

/// Path parameters for the exists endpoint.
#[derive(Debug, Deserialize)]
pub struct ExistsPathParams {
    pub table: String,
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

/// Query parameters for tile requests.
#[derive(Debug, Default, Deserialize)]
pub struct TileQueryParams {
    /// Output width in pixels (defaults to the server tile size)
    #[serde(default)]
    pub width: Option<u32>,

    /// Output height in pixels (defaults to the server tile size)
    #[serde(default)]
    pub height: Option<u32>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "table_not_found", "tile_not_found")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Response from the tables list endpoint.
#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

/// Response from the table metadata endpoint.
#[derive(Debug, Serialize)]
pub struct TableResponse {
    pub table: String,

    /// Lowest zoom level with tiles (absent for an empty table)
    pub min_zoom: Option<u32>,

    /// Highest zoom level with tiles (absent for an empty table)
    pub max_zoom: Option<u32>,

    /// Tile scaling record, if the table has one
    pub tile_scaling: Option<TileScaling>,

    /// Tile matrices for every zoom level in range
    pub tile_matrices: Vec<TileMatrix>,
}

/// Response from the tile exists endpoint.
#[derive(Debug, Serialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Status code, error type and message for an error response.
fn error_parts(err: &TileError) -> (StatusCode, &'static str, String) {
    match err {
        TileError::Store(StoreError::TableNotFound(table)) => (
            StatusCode::NOT_FOUND,
            "table_not_found",
            format!("Tile table not found: {table}"),
        ),
        TileError::Store(StoreError::Io(msg)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            format!("Storage error: {msg}"),
        ),
        TileError::Store(StoreError::InvalidData { message }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "invalid_data",
            format!("Invalid stored data: {message}"),
        ),
        TileError::InvalidZoom { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_zoom", err.to_string())
        }
        TileError::TileOutOfBounds { .. } => (
            StatusCode::BAD_REQUEST,
            "tile_out_of_bounds",
            err.to_string(),
        ),
        TileError::InvalidDimensions { .. } => (
            StatusCode::BAD_REQUEST,
            "invalid_dimensions",
            err.to_string(),
        ),
        TileError::DecodeError { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "decode_error",
            err.to_string(),
        ),
        TileError::EncodeError { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "encode_error",
            err.to_string(),
        ),
    }
}

/// Log at a level matching the status and build the JSON error response.
///
/// - 5xx errors are logged at ERROR level
/// - 404s at DEBUG level (common and expected)
/// - other 4xx errors at WARN level
fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Resource not found: {}",
            message
        );
    } else if status.is_client_error() {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let body = ErrorResponse::with_status(error_type, message, status);
    (status, Json(body)).into_response()
}

impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = error_parts(&self);
        error_response(status, error_type, message)
    }
}

/// Errors returned by handlers.
#[derive(Debug)]
pub enum HandlerError {
    Tile(TileError),

    /// Neither the tile nor any scaling candidate exists
    TileNotFound {
        table: String,
        z: u32,
        x: u32,
        y: u32,
    },

    /// Malformed path segment
    BadRequest(String),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::Tile(err) => err.into_response(),
            HandlerError::TileNotFound { table, z, x, y } => error_response(
                StatusCode::NOT_FOUND,
                "tile_not_found",
                format!("No tile at {table}/{z}/{x}/{y}"),
            ),
            HandlerError::BadRequest(message) => {
                error_response(StatusCode::BAD_REQUEST, "invalid_request", message)
            }
        }
    }
}

impl From<TileError> for HandlerError {
    fn from(err: TileError) -> Self {
        HandlerError::Tile(err)
    }
}

impl From<StoreError> for HandlerError {
    fn from(err: StoreError) -> Self {
        HandlerError::Tile(err.into())
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /tiles/{table}/{z}/{x}/{y}[.png|.jpg]`
///
/// # Query Parameters
///
/// - `width`, `height`: output size in pixels (default: server tile size)
///
/// # Response
///
/// - `200 OK`: tile image. Without an extension the tile is returned in its
///   stored format; with one it is transcoded when the formats differ.
/// - `400 Bad Request`: invalid zoom, coordinates or size
/// - `404 Not Found`: unknown table, or no tile even after scaling
/// - `500 Internal Server Error`: storage or image processing error
///
/// # Headers
///
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Tile-Source-Zoom`: zoom level the pixels came from
/// - `X-Tile-Scaled: true|false`
pub async fn tile_handler<S: TileStore>(
    State(state): State<AppState<S>>,
    Path(params): Path<TilePathParams>,
    Query(query): Query<TileQueryParams>,
) -> Result<Response, HandlerError> {
    let (y, requested_format) = params.y().ok_or_else(|| {
        HandlerError::BadRequest(format!("Invalid tile filename: {}", params.filename))
    })?;

    let width = query.width.unwrap_or(state.tile_size);
    let height = query.height.unwrap_or(state.tile_size);
    let request = TileRequest::new(&params.table, params.z, params.x, y).with_size(width, height);

    let Some(tile) = state.retriever.get_tile(&request).await? else {
        return Err(HandlerError::TileNotFound {
            table: params.table,
            z: params.z,
            x: params.x,
            y,
        });
    };

    let (data, format) = match requested_format {
        Some(format) if format != tile.format => (transcode(&tile.data, format)?, format),
        _ => (tile.data, tile.format),
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", state.cache_max_age),
            ),
            (X_TILE_SOURCE_ZOOM, tile.source_zoom.to_string()),
            (X_TILE_SCALED, tile.was_scaled.to_string()),
        ],
        data,
    )
        .into_response())
}

fn transcode(data: &[u8], format: TileFormat) -> Result<Bytes, TileError> {
    let codec = TileImageCodec::new(format);
    let image = codec.decode(data)?;
    codec.encode(&image)
}

/// Handle tile availability checks.
///
/// # Endpoint
///
/// `GET /tiles/{table}/{z}/{x}/{y}/exists`
///
/// Answers whether a tile request would succeed, counting scaling
/// fallbacks, without decoding any image.
pub async fn exists_handler<S: TileStore>(
    State(state): State<AppState<S>>,
    Path(params): Path<ExistsPathParams>,
) -> Result<Json<ExistsResponse>, HandlerError> {
    let exists = state
        .retriever
        .has_tile(&params.table, params.z, params.x, params.y)
        .await?;
    Ok(Json(ExistsResponse { exists }))
}

/// Handle tables list requests.
///
/// `GET /tables`
pub async fn tables_handler<S: TileStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<TablesResponse>, HandlerError> {
    let tables = state.retriever.store().table_names().await?;
    Ok(Json(TablesResponse { tables }))
}

/// Handle table metadata requests.
///
/// # Endpoint
///
/// `GET /tables/{table}`
///
/// # Response
///
/// ```json
/// {
///   "table": "osm",
///   "min_zoom": 0,
///   "max_zoom": 2,
///   "tile_scaling": {"table_name": "osm", "scaling_type": "in_out", "zoom_in": 2, "zoom_out": null},
///   "tile_matrices": [...]
/// }
/// ```
pub async fn table_handler<S: TileStore>(
    State(state): State<AppState<S>>,
    Path(table): Path<String>,
) -> Result<Json<TableResponse>, HandlerError> {
    let store = state.retriever.store();
    let zoom_range = store.tile_zoom_range(&table).await?;
    let tile_scaling = store.tile_scaling_for(&table).await?;

    let mut tile_matrices = Vec::new();
    if let Some((min_zoom, max_zoom)) = zoom_range {
        for zoom in min_zoom..=max_zoom {
            if let Some(matrix) = store.tile_matrix(&table, zoom).await? {
                tile_matrices.push(matrix);
            }
        }
    }

    Ok(Json(TableResponse {
        table,
        min_zoom: zoom_range.map(|(min, _)| min),
        max_zoom: zoom_range.map(|(_, max)| max),
        tile_scaling,
        tile_matrices,
    }))
}

/// Handle health check requests.
///
/// `GET /health` returns `{"status": "healthy", "version": "..."}`.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
