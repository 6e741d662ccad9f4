//! GeoPackage geometry blobs.
//!
//! Feature geometries in a GeoPackage are stored as a small binary header
//! followed by standard Well-Known Binary:
//!
//! ```text
//! +-------+---------+-------+--------+-------------------+-------------+
//! | "GP"  | version | flags | srs_id | envelope (0-64 B) | WKB body    |
//! +-------+---------+-------+--------+-------------------+-------------+
//!   2 B      1 B      1 B     4 B
//! ```
//!
//! - [`GeometryData`] decodes and encodes whole blobs
//! - [`Envelope`] models the header extent and its dimensionality
//! - [`WkbCodec`] is the seam to the WKB body, with [`GeoWkb`] as default
//! - [`ByteOrder`] governs the header fields only; WKB has its own marker

mod body;
mod byte_order;
mod codec;
mod envelope;

pub use body::{wkb_dimensions, GeoWkb, WkbCodec};
pub use byte_order::ByteOrder;
pub use codec::{
    EncodedGeometry, GeometryData, GeometryFlags, GEOMETRY_HEADER_SIZE, GEOMETRY_MAGIC,
    GEOMETRY_VERSION,
};
pub use envelope::{envelope_length, Envelope, MAX_ENVELOPE_INDICATOR};
