//! gpkg-tiles - GeoPackage geometry and tile pyramid tools.
//!
//! This binary wires the library into a tile server and a handful of
//! one-shot commands.

use std::process::ExitCode;

use clap::Parser;
use geo::CoordsIter;
use geo_types::{Geometry, Point};
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gpkg_tiles::{
    config::{Cli, Command, DecodeConfig, EncodeConfig, ExportConfig, ServeConfig, TilesConfig},
    geometry::{ByteOrder, GeometryData},
    server::{create_router, RouterConfig},
    store::{CachedTileStore, DirectoryTileStore, TileStore},
    tile::{export_xyz, tile_range_for_extent, TileRetriever},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Decode(config) => run_decode(config),
        Command::Encode(config) => run_encode(config),
        Command::Tiles(config) => run_tiles(config),
        Command::Export(config) => run_export(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "gpkg_tiles=debug,tower_http=debug"
    } else {
        "gpkg_tiles=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("gpkg-tiles v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Tile root: {}", config.root.display());
    info!("  Tile size: {}px", config.tile_size);
    info!("  Cache: {}MB tiles", config.cache_tiles / (1024 * 1024));

    let store = DirectoryTileStore::new(&config.root);
    match store.table_names().await {
        Ok(tables) if tables.is_empty() => {
            warn!("  No tile tables found under {}", config.root.display());
        }
        Ok(tables) => info!("  Tables: {}", tables.join(", ")),
        Err(e) => {
            error!("Failed to read tile root {}: {}", config.root.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let retriever = TileRetriever::new(CachedTileStore::with_capacity(store, config.cache_tiles));
    let router = create_router(retriever, build_router_config(&config));

    let addr = config.bind_address();
    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/tables", addr);
    info!("    curl http://{}/tiles/<table>/0/0/0.png", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tile_size(config.tile_size)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Geometry Commands
// =============================================================================

fn run_decode(config: DecodeConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let bytes = match (&config.hex, &config.file) {
        (Some(hex), _) => hex::decode(hex.trim()).map_err(|e| format!("invalid hex: {e}")),
        (None, Some(path)) => {
            std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))
        }
        (None, None) => Err("no input".to_string()),
    };
    let bytes = match bytes {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let data = match GeometryData::decode(&bytes) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let flags = data.flags();
    let output = json!({
        "srs_id": data.srs_id(),
        "byte_order": format!("{:?}", data.byte_order()),
        "extended": flags.extended,
        "empty": flags.empty,
        "envelope_indicator": flags.envelope_indicator,
        "header_len": data.header_len(),
        "envelope": data.envelope(),
        "dimensions": data.dimensions().map(|d| format!("{d:?}")),
        "geometry": data.geometry().map(geometry_summary),
        "geometry_error": data.geometry_error().map(|e| e.to_string()),
    });
    print_json(&output)
}

fn run_encode(config: EncodeConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let byte_order = if config.big_endian {
        ByteOrder::BigEndian
    } else {
        ByteOrder::LittleEndian
    };

    let mut data = GeometryData::new(config.srs_id, Point::new(config.x, config.y).into())
        .with_byte_order(byte_order);
    if !config.envelope {
        data = data.with_envelope(None);
    }

    let encoded = data.encode();
    if let Some(e) = &encoded.geometry_error {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    println!("{}", hex::encode_upper(&encoded.bytes));
    ExitCode::SUCCESS
}

/// Type name, coordinate count and XY bounds of a geometry.
fn geometry_summary(geometry: &Geometry<f64>) -> serde_json::Value {
    let kind = match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    };
    json!({
        "type": kind,
        "coordinates": geometry.coords_count(),
        "bounds": gpkg_tiles::geometry::Envelope::of_geometry(geometry),
    })
}

// =============================================================================
// Tile Commands
// =============================================================================

fn run_tiles(config: TilesConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let range = tile_range_for_extent(&config.bbox, config.zoom);
    print_json(&json!({
        "range": range,
        "count": range.count(),
    }))
}

async fn run_export(config: ExportConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let retriever = TileRetriever::new(DirectoryTileStore::new(&config.root));
    let bbox = config.bbox();

    info!(
        table = %config.table,
        out = %config.out.display(),
        min_zoom = config.min_zoom,
        max_zoom = config.max_zoom,
        "Exporting tile table"
    );

    match export_xyz(
        &retriever,
        &config.table,
        &bbox,
        config.min_zoom..=config.max_zoom,
        &config.out,
    )
    .await
    {
        Ok(summary) => print_json(&json!(summary)),
        Err(e) => {
            error!("Export failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_json(value: &serde_json::Value) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
