//! WKB body parsing and serialization.
//!
//! The geometry blob codec treats the WKB body as an opaque payload handed to
//! a [`WkbCodec`]. [`GeoWkb`] is the default implementation, built on the
//! `wkb` crate and producing `geo_types` geometries.
//!
//! `geo_types` is XY only. Z and M ordinates of a parsed body survive only in
//! the raw bytes kept by the blob codec; [`wkb_dimensions`] reports them.

use geo_traits::to_geo::ToGeoGeometry;
use geo_traits::{Dimensions, GeometryTrait};
use geo_types::Geometry;
use wkb::reader::Wkb;

use crate::error::GeometryBodyError;

/// Parser/serializer for the WKB body of a geometry blob.
pub trait WkbCodec: Send + Sync {
    /// Parse WKB bytes into a geometry.
    fn parse(&self, bytes: &[u8]) -> Result<Geometry<f64>, GeometryBodyError>;

    /// Serialize a geometry as WKB.
    fn serialize(&self, geometry: &Geometry<f64>) -> Result<Vec<u8>, GeometryBodyError>;
}

/// [`WkbCodec`] backed by the `wkb` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoWkb;

impl WkbCodec for GeoWkb {
    fn parse(&self, bytes: &[u8]) -> Result<Geometry<f64>, GeometryBodyError> {
        let wkb = Wkb::try_new(bytes).map_err(|e| GeometryBodyError::Parse(e.to_string()))?;
        wkb.try_to_geometry().ok_or_else(|| {
            GeometryBodyError::Parse("geometry has no geo-types representation".to_string())
        })
    }

    fn serialize(&self, geometry: &Geometry<f64>) -> Result<Vec<u8>, GeometryBodyError> {
        let mut buf = Vec::new();
        wkb::writer::write_geometry(&mut buf, geometry, &Default::default())
            .map_err(|e| GeometryBodyError::Serialize(e.to_string()))?;
        Ok(buf)
    }
}

/// Coordinate dimensions declared by a WKB body, or `None` if it does not parse.
pub fn wkb_dimensions(bytes: &[u8]) -> Option<Dimensions> {
    Wkb::try_new(bytes).ok().map(|wkb| wkb.dim())
}
