//! Byte order handling for geometry blob headers.
//!
//! The SRS id and envelope doubles of a GeoPackage geometry blob are stored in
//! the byte order declared by bit 0 of the flags byte. The WKB body carries its
//! own byte-order marker and is not affected by this setting.

use bytes::BufMut;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a geometry blob header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    /// Big-endian (flags bit 0 cleared)
    BigEndian,
    /// Little-endian (flags bit 0 set)
    #[default]
    LittleEndian,
}

impl ByteOrder {
    /// Byte order encoded by bit 0 of a flags byte.
    #[inline]
    pub fn from_flags(flags: u8) -> Self {
        if flags & 0x01 == 0 {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    /// Value of the byte-order bit for this order.
    #[inline]
    pub const fn flag_bit(self) -> u8 {
        match self {
            ByteOrder::BigEndian => 0,
            ByteOrder::LittleEndian => 1,
        }
    }

    /// Read an i32 from the first 4 bytes of a slice.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 4 bytes.
    #[inline]
    pub fn read_i32(self, bytes: &[u8]) -> i32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::LittleEndian => i32::from_le_bytes(raw),
            ByteOrder::BigEndian => i32::from_be_bytes(raw),
        }
    }

    /// Read an IEEE-754 double from the first 8 bytes of a slice.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 8 bytes.
    #[inline]
    pub fn read_f64(self, bytes: &[u8]) -> f64 {
        let raw = [
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ];
        match self {
            ByteOrder::LittleEndian => f64::from_le_bytes(raw),
            ByteOrder::BigEndian => f64::from_be_bytes(raw),
        }
    }

    /// Append an i32 in this byte order.
    #[inline]
    pub fn put_i32(self, buf: &mut impl BufMut, value: i32) {
        match self {
            ByteOrder::LittleEndian => buf.put_i32_le(value),
            ByteOrder::BigEndian => buf.put_i32(value),
        }
    }

    /// Append a double in this byte order.
    #[inline]
    pub fn put_f64(self, buf: &mut impl BufMut, value: f64) {
        match self {
            ByteOrder::LittleEndian => buf.put_f64_le(value),
            ByteOrder::BigEndian => buf.put_f64(value),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
