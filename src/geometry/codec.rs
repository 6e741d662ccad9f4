//! GeoPackage geometry blob encoding and decoding.
//!
//! # Blob Layout
//!
//! ```text
//! Bytes 0-1: Magic "GP" (0x47 0x50)
//! Byte  2:   Version (0 = GeoPackage binary version 1)
//! Byte  3:   Flags
//!              bits 7-6: reserved, must be 0
//!              bit  5:   extended geometry type (0 standard, 1 extended)
//!              bit  4:   empty geometry
//!              bits 3-1: envelope contents indicator (0-4)
//!              bit  0:   byte order of SRS id and envelope (0 BE, 1 LE)
//! Bytes 4-7: SRS id (i32, declared byte order)
//! Envelope:  0, 4, 6 or 8 doubles (declared byte order)
//! Remaining: WKB geometry
//! ```
//!
//! Header problems are fatal and surface as [`FormatError`]. Problems in the
//! WKB body are not: the decoded [`GeometryData`] carries them in
//! [`GeometryData::geometry_error`] so the SRS id and envelope remain usable.
//!
//! A decoded blob keeps its WKB body bytes and writes them back unchanged on
//! encode, so Z and M ordinates survive even though the parsed geometry is XY.
//! Replacing the geometry drops the stored body.

use bytes::{BufMut, Bytes, BytesMut};
use geo_traits::Dimensions;
use geo_types::Geometry;
use tracing::warn;

use crate::error::{FormatError, GeometryBodyError};

use super::body::{wkb_dimensions, GeoWkb, WkbCodec};
use super::byte_order::ByteOrder;
use super::envelope::{envelope_length, Envelope, MAX_ENVELOPE_INDICATOR};

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes opening every geometry blob ("GP")
pub const GEOMETRY_MAGIC: [u8; 2] = *b"GP";

/// The only supported binary version
pub const GEOMETRY_VERSION: u8 = 0;

/// Size of the fixed header (magic, version, flags, SRS id)
pub const GEOMETRY_HEADER_SIZE: usize = 8;

const FLAG_RESERVED_MASK: u8 = 0b1100_0000;
const FLAG_EXTENDED: u8 = 0b0010_0000;
const FLAG_EMPTY: u8 = 0b0001_0000;
const FLAG_ENVELOPE_MASK: u8 = 0b0000_1110;
const FLAG_ENVELOPE_SHIFT: u8 = 1;

// =============================================================================
// GeometryFlags
// =============================================================================

/// Decoded flags byte of a geometry blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryFlags {
    /// Vendor-extended geometry type
    pub extended: bool,

    /// Empty geometry
    pub empty: bool,

    /// Envelope contents indicator (0-4)
    pub envelope_indicator: u8,

    /// Byte order of the SRS id and envelope
    pub byte_order: ByteOrder,
}

impl GeometryFlags {
    /// Parse and validate a flags byte.
    ///
    /// # Errors
    /// `MalformedFlags` if a reserved bit is set or the envelope indicator is 5-7.
    pub fn parse(flags: u8) -> Result<Self, FormatError> {
        if flags & FLAG_RESERVED_MASK != 0 {
            return Err(FormatError::MalformedFlags(flags));
        }

        let envelope_indicator = (flags & FLAG_ENVELOPE_MASK) >> FLAG_ENVELOPE_SHIFT;
        if envelope_indicator > MAX_ENVELOPE_INDICATOR {
            return Err(FormatError::MalformedFlags(flags));
        }

        Ok(Self {
            extended: flags & FLAG_EXTENDED != 0,
            empty: flags & FLAG_EMPTY != 0,
            envelope_indicator,
            byte_order: ByteOrder::from_flags(flags),
        })
    }

    /// Pack into a flags byte.
    pub fn to_byte(self) -> u8 {
        let mut flags = self.byte_order.flag_bit();
        flags |= (self.envelope_indicator << FLAG_ENVELOPE_SHIFT) & FLAG_ENVELOPE_MASK;
        if self.empty {
            flags |= FLAG_EMPTY;
        }
        if self.extended {
            flags |= FLAG_EXTENDED;
        }
        flags
    }
}

// =============================================================================
// GeometryData
// =============================================================================

/// A feature geometry as stored in a GeoPackage geometry column.
///
/// Built either by decoding a blob ([`GeometryData::decode`]) or from an
/// in-memory geometry ([`GeometryData::new`]) and then encoded for storage.
///
/// Equality compares header fields, geometry and coordinate dimensions, not
/// the byte layout of a kept WKB body.
#[derive(Debug, Clone)]
pub struct GeometryData {
    srs_id: i32,
    byte_order: ByteOrder,
    envelope: Option<Envelope>,
    geometry: Option<Geometry<f64>>,
    /// WKB body as decoded, written back verbatim until the geometry is replaced
    wkb: Option<Bytes>,
    empty: bool,
    extended: bool,
    geometry_error: Option<GeometryBodyError>,
}

impl GeometryData {
    /// Wrap a geometry, computing its XY envelope.
    ///
    /// A geometry with no extent (for example an empty multipoint) yields an
    /// empty-flagged blob without a WKB body.
    pub fn new(srs_id: i32, geometry: Geometry<f64>) -> Self {
        match Envelope::of_geometry(&geometry) {
            Some(envelope) => Self {
                srs_id,
                byte_order: ByteOrder::default(),
                envelope: Some(envelope),
                geometry: Some(geometry),
                wkb: None,
                empty: false,
                extended: false,
                geometry_error: None,
            },
            None => Self::empty(srs_id),
        }
    }

    /// An empty geometry for the given SRS.
    pub fn empty(srs_id: i32) -> Self {
        Self {
            srs_id,
            byte_order: ByteOrder::default(),
            envelope: None,
            geometry: None,
            wkb: None,
            empty: true,
            extended: false,
            geometry_error: None,
        }
    }

    /// Set the header byte order.
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Replace the envelope (`None` writes no envelope).
    pub fn with_envelope(mut self, envelope: Option<Envelope>) -> Self {
        self.envelope = envelope;
        self
    }

    /// Replace the geometry, recomputing the XY envelope.
    ///
    /// The stored WKB body is dropped; the new geometry is serialized on encode.
    pub fn with_geometry(self, geometry: Geometry<f64>) -> Self {
        GeometryData::new(self.srs_id, geometry)
            .with_byte_order(self.byte_order)
            .with_extended(self.extended)
    }

    /// Mark the blob as using a vendor-extended geometry type.
    pub fn with_extended(mut self, extended: bool) -> Self {
        self.extended = extended;
        self
    }

    pub fn srs_id(&self) -> i32 {
        self.srs_id
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn envelope(&self) -> Option<&Envelope> {
        self.envelope.as_ref()
    }

    /// The parsed geometry. `None` for empty blobs or when the body failed to parse.
    pub fn geometry(&self) -> Option<&Geometry<f64>> {
        self.geometry.as_ref()
    }

    /// WKB body bytes kept from decoding.
    pub fn wkb(&self) -> Option<&[u8]> {
        self.wkb.as_deref()
    }

    /// Coordinate dimensions of the geometry. Decoded bodies report what the
    /// WKB declares; in-memory geometries are XY.
    pub fn dimensions(&self) -> Option<Dimensions> {
        match (&self.wkb, &self.geometry) {
            (Some(wkb), _) => wkb_dimensions(wkb),
            (None, Some(_)) => Some(Dimensions::Xy),
            (None, None) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    /// Non-fatal WKB body error captured during decode.
    pub fn geometry_error(&self) -> Option<&GeometryBodyError> {
        self.geometry_error.as_ref()
    }

    /// Envelope indicator derived from the envelope's dimensionality.
    pub fn envelope_indicator(&self) -> u8 {
        self.envelope.as_ref().map_or(0, Envelope::indicator)
    }

    /// Flags byte as it will be written, recomputed from the current state.
    pub fn flags(&self) -> GeometryFlags {
        GeometryFlags {
            extended: self.extended,
            empty: self.empty,
            envelope_indicator: self.envelope_indicator(),
            byte_order: self.byte_order,
        }
    }

    /// Length of header plus envelope, i.e. the offset of the WKB body.
    pub fn header_len(&self) -> usize {
        GEOMETRY_HEADER_SIZE + self.envelope.as_ref().map_or(0, |e| e.to_values().len() * 8)
    }

    /// Decode a geometry blob using the default WKB codec.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        Self::decode_with(bytes, &GeoWkb)
    }

    /// Decode a geometry blob with a specific WKB codec.
    ///
    /// Magic and version are checked before anything else. A WKB body that
    /// fails to parse does not fail the call; see [`GeometryData::geometry_error`].
    ///
    /// # Errors
    /// - `BadMagicNumber` if the blob does not start with "GP"
    /// - `UnsupportedVersion` if the version byte is not 0
    /// - `MalformedFlags` for reserved bits or an envelope indicator above 4
    /// - `Truncated` if the buffer ends inside the header or envelope
    pub fn decode_with(bytes: &[u8], codec: &dyn WkbCodec) -> Result<Self, FormatError> {
        require_len(bytes, GEOMETRY_MAGIC.len())?;
        let magic = [bytes[0], bytes[1]];
        if magic != GEOMETRY_MAGIC {
            return Err(FormatError::BadMagicNumber { found: magic });
        }

        require_len(bytes, 3)?;
        if bytes[2] != GEOMETRY_VERSION {
            return Err(FormatError::UnsupportedVersion(bytes[2]));
        }

        require_len(bytes, 4)?;
        let flags = GeometryFlags::parse(bytes[3])?;
        let byte_order = flags.byte_order;

        require_len(bytes, GEOMETRY_HEADER_SIZE)?;
        let srs_id = byte_order.read_i32(&bytes[4..8]);

        // Indicator was validated by GeometryFlags::parse
        let envelope_len = envelope_length(flags.envelope_indicator).unwrap_or(0);
        let body_offset = GEOMETRY_HEADER_SIZE + envelope_len;
        require_len(bytes, body_offset)?;

        let envelope = if envelope_len > 0 {
            let values: Vec<f64> = bytes[GEOMETRY_HEADER_SIZE..body_offset]
                .chunks_exact(8)
                .map(|chunk| byte_order.read_f64(chunk))
                .collect();
            Envelope::from_values(flags.envelope_indicator, &values)
        } else {
            None
        };

        let body = &bytes[body_offset..];
        let (geometry, wkb, geometry_error) = if flags.empty {
            (None, None, None)
        } else {
            match codec.parse(body) {
                Ok(geometry) => (Some(geometry), Some(Bytes::copy_from_slice(body)), None),
                Err(err) => {
                    warn!(srs_id, error = %err, "Geometry blob has an unreadable WKB body");
                    (None, None, Some(err))
                }
            }
        };

        Ok(Self {
            srs_id,
            byte_order,
            envelope,
            geometry,
            wkb,
            empty: flags.empty,
            extended: flags.extended,
            geometry_error,
        })
    }

    /// Encode as a geometry blob using the default WKB codec.
    pub fn encode(&self) -> EncodedGeometry {
        self.encode_with(&GeoWkb)
    }

    /// Encode as a geometry blob with a specific WKB codec.
    ///
    /// The flags byte is always recomputed from the envelope, empty and
    /// extended state. A body kept from decoding is written as is; otherwise
    /// the geometry is serialized. If that fails only the header and envelope
    /// are emitted and the error is returned alongside.
    pub fn encode_with(&self, codec: &dyn WkbCodec) -> EncodedGeometry {
        let mut buf = BytesMut::with_capacity(self.header_len() + 64);

        buf.put_slice(&GEOMETRY_MAGIC);
        buf.put_u8(GEOMETRY_VERSION);
        buf.put_u8(self.flags().to_byte());
        self.byte_order.put_i32(&mut buf, self.srs_id);

        if let Some(envelope) = &self.envelope {
            for value in envelope.to_values() {
                self.byte_order.put_f64(&mut buf, value);
            }
        }

        let mut geometry_error = None;
        match (&self.wkb, &self.geometry, self.empty) {
            (_, _, true) => {}
            (Some(wkb), _, false) => buf.put_slice(wkb),
            (None, Some(geometry), false) => match codec.serialize(geometry) {
                Ok(wkb) => buf.put_slice(&wkb),
                Err(err) => geometry_error = Some(err),
            },
            (None, None, false) => geometry_error = Some(GeometryBodyError::Missing),
        }

        EncodedGeometry {
            bytes: buf.freeze(),
            geometry_error,
        }
    }
}

impl PartialEq for GeometryData {
    fn eq(&self, other: &Self) -> bool {
        self.srs_id == other.srs_id
            && self.byte_order == other.byte_order
            && self.envelope == other.envelope
            && self.geometry == other.geometry
            && self.empty == other.empty
            && self.extended == other.extended
            && self.geometry_error == other.geometry_error
            && self.dimensions() == other.dimensions()
    }
}

/// Output of [`GeometryData::encode`].
///
/// When `geometry_error` is set, `bytes` holds only the header and envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedGeometry {
    pub bytes: Bytes,
    pub geometry_error: Option<GeometryBodyError>,
}

impl EncodedGeometry {
    /// Whether the blob includes its WKB body.
    pub fn is_complete(&self) -> bool {
        self.geometry_error.is_none()
    }
}

fn require_len(bytes: &[u8], required: usize) -> Result<(), FormatError> {
    if bytes.len() < required {
        return Err(FormatError::Truncated {
            required,
            actual: bytes.len(),
        });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
