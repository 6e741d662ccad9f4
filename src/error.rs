use thiserror::Error;

/// Fatal errors while reading a GeoPackage geometry blob header.
///
/// Any of these aborts the decode call: nothing past the failing field can be
/// trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The blob does not start with the ASCII magic "GP"
    #[error("Bad magic number: expected \"GP\" (0x47 0x50), got 0x{:02X} 0x{:02X}", .found[0], .found[1])]
    BadMagicNumber { found: [u8; 2] },

    /// Only binary version 0 (GeoPackage version 1) is understood
    #[error("Unsupported geometry blob version: {0} (only version 0 is supported)")]
    UnsupportedVersion(u8),

    /// Reserved bits set, or an envelope indicator outside 0-4
    #[error("Malformed flags byte: 0b{0:08b}")]
    MalformedFlags(u8),

    /// The buffer ends before the header or envelope it declares
    #[error("Truncated geometry blob: need at least {required} bytes, got {actual}")]
    Truncated { required: usize, actual: usize },
}

/// Recoverable errors in the WKB body of a geometry blob.
///
/// These are attached to a decoded or encoded [`GeometryData`](crate::geometry::GeometryData)
/// instead of being returned as `Err`, so the SRS id and envelope stay usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryBodyError {
    /// WKB bytes could not be parsed into a geometry
    #[error("Failed to parse WKB geometry: {0}")]
    Parse(String),

    /// Geometry could not be serialized to WKB
    #[error("Failed to serialize WKB geometry: {0}")]
    Serialize(String),

    /// A non-empty blob was requested without a geometry to serialize
    #[error("Geometry is missing from a non-empty geometry blob")]
    Missing,
}

/// Errors from the reprojection component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// CRS name is neither registered nor in the EPSG database
    #[error("Unknown coordinate reference system: {0}")]
    UnknownCrs(String),

    /// A proj4 definition could not be parsed
    #[error("Invalid projection definition for {crs}: {message}")]
    InvalidDefinition { crs: String, message: String },

    /// Point transformation failed
    #[error("Transform from {from} to {to} failed: {message}")]
    Transform {
        from: String,
        to: String,
        message: String,
    },
}

/// Errors raised by tile storage backends.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Underlying I/O failure (filesystem, connection)
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// Stored data could not be interpreted
    #[error("Invalid stored data: {message}")]
    InvalidData { message: String },

    /// The named tile table does not exist
    #[error("Tile table not found: {0}")]
    TableNotFound(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Errors that can occur while retrieving or rendering a tile.
///
/// A tile that simply does not exist (exactly or via scaling) is not an error;
/// retrieval returns `Ok(None)` for that case.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Storage backend failure
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Zoom level beyond the supported pyramid depth
    #[error("Invalid zoom level: {zoom} (maximum is {max})")]
    InvalidZoom { zoom: u32, max: u32 },

    /// Column or row outside the 2^z x 2^z grid
    #[error("Tile ({column}, {row}) is out of bounds at zoom {zoom} (max index {max})")]
    TileOutOfBounds {
        zoom: u32,
        column: u32,
        row: u32,
        max: u32,
    },

    /// Requested output size is zero or too large
    #[error("Invalid output dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Stored tile bytes are not a decodable image
    #[error("Failed to decode tile image: {message}")]
    DecodeError { message: String },

    /// Rescaled tile could not be encoded
    #[error("Failed to encode tile image: {message}")]
    EncodeError { message: String },
}
