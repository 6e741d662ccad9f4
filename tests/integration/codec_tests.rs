//! Geometry blob integration tests.
//!
//! Tests verify:
//! - Hand-assembled blobs decode to the expected header and body
//! - Encode/decode agreement across envelope shapes and byte orders
//! - Fatal header errors versus recoverable body errors

use geo_traits::Dimensions;
use geo_types::{line_string, point, polygon, Geometry};

use gpkg_tiles::error::FormatError;
use gpkg_tiles::geometry::{ByteOrder, Envelope, GeometryData, GEOMETRY_HEADER_SIZE};

use super::test_utils::point_blob_le;

// =============================================================================
// Decoding
// =============================================================================

#[test]
fn test_decode_hand_built_point() {
    let blob = point_blob_le(4326, -77.0365, 38.8977);
    let data = GeometryData::decode(&blob).unwrap();

    assert_eq!(data.srs_id(), 4326);
    assert_eq!(data.byte_order(), ByteOrder::LittleEndian);
    assert_eq!(data.envelope_indicator(), 1);
    assert_eq!(data.header_len(), GEOMETRY_HEADER_SIZE + 32);
    assert_eq!(
        data.envelope(),
        Some(&Envelope::new(-77.0365, -77.0365, 38.8977, 38.8977))
    );
    assert_eq!(
        data.geometry(),
        Some(&Geometry::Point(point!(x: -77.0365, y: 38.8977)))
    );
    assert!(data.geometry_error().is_none());
}

#[test]
fn test_encoded_bytes_match_hand_built_blob() {
    let data = GeometryData::new(4326, point!(x: 1.5, y: -2.25).into());
    let encoded = data.encode();

    assert!(encoded.is_complete());
    let expected = point_blob_le(4326, 1.5, -2.25);
    let header_len = data.header_len();
    assert_eq!(encoded.bytes.len(), expected.len());
    assert_eq!(&encoded.bytes[..header_len], &expected[..header_len]);
    let ours = GeometryData::decode(&encoded.bytes).unwrap();
    let theirs = GeometryData::decode(&expected).unwrap();
    assert_eq!(ours.geometry(), theirs.geometry());
    assert_eq!(ours.envelope(), theirs.envelope());
}

#[test]
fn test_reserved_flag_bits_rejected() {
    for reserved in [0b0100_0000u8, 0b1000_0000, 0b1100_0000] {
        let mut blob = point_blob_le(4326, 0.0, 0.0);
        blob[3] |= reserved;
        assert!(matches!(
            GeometryData::decode(&blob),
            Err(FormatError::MalformedFlags(_))
        ));
    }
}

#[test]
fn test_envelope_indicator_above_four_rejected() {
    for indicator in 5u8..=7 {
        let mut blob = point_blob_le(4326, 0.0, 0.0);
        blob[3] = (indicator << 1) | 1;
        assert!(matches!(
            GeometryData::decode(&blob),
            Err(FormatError::MalformedFlags(_))
        ));
    }
}

#[test]
fn test_corrupt_body_keeps_header() {
    let mut blob = point_blob_le(3857, 10.0, 20.0);
    blob.truncate(GEOMETRY_HEADER_SIZE + 32 + 3);

    let data = GeometryData::decode(&blob).unwrap();
    assert_eq!(data.srs_id(), 3857);
    assert_eq!(data.envelope().map(|e| e.max_y), Some(20.0));
    assert!(data.geometry().is_none());
    assert!(data.geometry_error().is_some());
}

// =============================================================================
// Z and M Bodies
// =============================================================================

/// Little-endian blob with an XYZ envelope around an ISO PointZ body.
fn point_z_blob(x: f64, y: f64, z: f64) -> Vec<u8> {
    let mut blob = vec![b'G', b'P', 0, 0b0000_0101];
    blob.extend_from_slice(&4979i32.to_le_bytes());
    for v in [x, x, y, y, z, z] {
        blob.extend_from_slice(&v.to_le_bytes());
    }
    blob.push(1);
    blob.extend_from_slice(&1001u32.to_le_bytes());
    for v in [x, y, z] {
        blob.extend_from_slice(&v.to_le_bytes());
    }
    blob
}

#[test]
fn test_xyz_point_survives_roundtrip() {
    let blob = point_z_blob(1.0, 2.0, 3.0);
    let data = GeometryData::decode(&blob).unwrap();

    assert!(data.geometry_error().is_none());
    assert_eq!(data.dimensions(), Some(Dimensions::Xyz));
    assert_eq!(data.envelope_indicator(), 2);
    assert_eq!(data.envelope().and_then(|e| e.max_z()), Some(3.0));
    assert_eq!(
        data.geometry(),
        Some(&Geometry::Point(point!(x: 1.0, y: 2.0)))
    );

    let encoded = data.encode();
    assert!(encoded.is_complete());
    assert_eq!(encoded.bytes, blob);

    // Same XY view, different dimensions
    let flat = GeometryData::new(4979, point!(x: 1.0, y: 2.0).into())
        .with_envelope(data.envelope().copied());
    assert_ne!(data, flat);
}

#[test]
fn test_xyz_body_kept_when_header_changes() {
    let blob = point_z_blob(-5.0, 7.5, 120.0);
    let header_len = GEOMETRY_HEADER_SIZE + 48;

    let reordered = GeometryData::decode(&blob)
        .unwrap()
        .with_byte_order(ByteOrder::BigEndian);
    let encoded = reordered.encode();

    assert_eq!(&encoded.bytes[header_len..], &blob[header_len..]);
    let decoded = GeometryData::decode(&encoded.bytes).unwrap();
    assert_eq!(decoded.dimensions(), Some(Dimensions::Xyz));
    assert_eq!(decoded.envelope(), reordered.envelope());
}

// =============================================================================
// Encode / Decode Agreement
// =============================================================================

#[test]
fn test_roundtrip_envelope_shapes_and_byte_orders() {
    let geometry: Geometry<f64> = polygon![
        (x: 0.0, y: 0.0),
        (x: 4.0, y: 0.0),
        (x: 4.0, y: 3.0),
        (x: 0.0, y: 0.0),
    ]
    .into();
    let xy = Envelope::new(0.0, 4.0, 0.0, 3.0);
    let envelopes = [
        None,
        Some(xy),
        Some(xy.with_z(-1.0, 1.0)),
        Some(xy.with_m(5.0, 6.0)),
        Some(xy.with_z(-1.0, 1.0).with_m(5.0, 6.0)),
    ];

    for byte_order in [ByteOrder::BigEndian, ByteOrder::LittleEndian] {
        for envelope in envelopes {
            let original = GeometryData::new(32631, geometry.clone())
                .with_byte_order(byte_order)
                .with_envelope(envelope);

            let encoded = original.encode();
            assert!(encoded.is_complete());
            let decoded = GeometryData::decode(&encoded.bytes).unwrap();
            assert_eq!(decoded, original, "{byte_order:?} {envelope:?}");
            assert_eq!(decoded.encode().bytes, encoded.bytes);
        }
    }
}

#[test]
fn test_envelope_queries_on_decoded_lines() {
    let a = GeometryData::new(4326, line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 2.0)].into());
    let b = GeometryData::new(4326, line_string![(x: 1.0, y: 1.0), (x: 3.0, y: 5.0)].into());

    let a = GeometryData::decode(&a.encode().bytes).unwrap();
    let b = GeometryData::decode(&b.encode().bytes).unwrap();
    let (ea, eb) = (a.envelope().unwrap(), b.envelope().unwrap());

    assert!(ea.intersects(eb));
    assert!(!ea.contains(eb));
    assert_eq!(ea.expand_to_include(eb), Envelope::new(0.0, 3.0, 0.0, 5.0));
}

#[test]
fn test_empty_geometry_roundtrip() {
    let empty = GeometryData::empty(0);
    let encoded = empty.encode();
    assert_eq!(encoded.bytes.len(), GEOMETRY_HEADER_SIZE);

    let decoded = GeometryData::decode(&encoded.bytes).unwrap();
    assert!(decoded.is_empty());
    assert!(decoded.geometry().is_none());
    assert!(decoded.geometry_error().is_none());
}
