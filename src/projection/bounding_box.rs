//! Geographic extents and their reprojection.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ProjectionError;
use crate::geometry::Envelope;
use crate::tile::math::{tile_column_to_longitude, tile_row_to_latitude, tiles_per_side};

use super::registry::{ProjectionRegistry, EPSG_WEB_MERCATOR, EPSG_WGS84};

/// Southern latitude limit of the Web Mercator domain
pub const WEB_MERCATOR_MIN_LATITUDE: f64 = -85.05112877980659;

/// Northern latitude limit of the Web Mercator domain
pub const WEB_MERCATOR_MAX_LATITUDE: f64 = 85.0511287798066;

/// Axis-aligned extent.
///
/// Field names follow the geographic case; once projected into a planar CRS
/// the longitude fields hold X and the latitude fields hold Y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,
}

impl BoundingBox {
    pub fn new(min_longitude: f64, max_longitude: f64, min_latitude: f64, max_latitude: f64) -> Self {
        Self {
            min_longitude,
            max_longitude,
            min_latitude,
            max_latitude,
        }
    }

    /// The whole world in WGS84 degrees.
    pub fn world() -> Self {
        Self::new(-180.0, 180.0, -90.0, 90.0)
    }

    /// Extent of an XYZ tile in WGS84 degrees.
    ///
    /// Column and row are clamped to the last tile of the zoom level.
    pub fn from_tile(zoom: u32, column: u32, row: u32) -> Self {
        let last = tiles_per_side(zoom) - 1;
        let (column, row) = (column.min(last), row.min(last));
        Self::new(
            tile_column_to_longitude(column, zoom),
            tile_column_to_longitude(column + 1, zoom),
            tile_row_to_latitude(row + 1, zoom),
            tile_row_to_latitude(row, zoom),
        )
    }

    /// Component-wise equality.
    pub fn equals(&self, other: &BoundingBox) -> bool {
        self == other
    }

    /// Component-wise equality within a tolerance.
    pub fn approx_eq(&self, other: &BoundingBox, epsilon: f64) -> bool {
        (self.min_longitude - other.min_longitude).abs() <= epsilon
            && (self.max_longitude - other.max_longitude).abs() <= epsilon
            && (self.min_latitude - other.min_latitude).abs() <= epsilon
            && (self.max_latitude - other.max_latitude).abs() <= epsilon
    }

    pub fn width(&self) -> f64 {
        self.max_longitude - self.min_longitude
    }

    pub fn height(&self) -> f64 {
        self.max_latitude - self.min_latitude
    }

    /// GeoJSON Feature with a Polygon geometry.
    ///
    /// The ring runs NW, NE, SE, SW and closes back on NW. Winding is not
    /// normalized.
    pub fn to_polygon_geojson(&self) -> Value {
        let nw = [self.min_longitude, self.max_latitude];
        let ne = [self.max_longitude, self.max_latitude];
        let se = [self.max_longitude, self.min_latitude];
        let sw = [self.min_longitude, self.min_latitude];

        json!({
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[nw, ne, se, sw, nw]]
            }
        })
    }

    /// Copy with latitude and longitude clamped to the Web Mercator domain.
    pub fn clamped_to_web_mercator(&self) -> Self {
        let lon = |v: f64| v.clamp(-180.0, 180.0);
        let lat = |v: f64| v.clamp(WEB_MERCATOR_MIN_LATITUDE, WEB_MERCATOR_MAX_LATITUDE);
        Self::new(
            lon(self.min_longitude),
            lon(self.max_longitude),
            lat(self.min_latitude),
            lat(self.max_latitude),
        )
    }

    /// Reproject between coordinate reference systems.
    ///
    /// Returns the box unchanged when either CRS is absent or both name the
    /// same system. For EPSG:4326 to EPSG:3857 the box is first clamped to
    /// the Web Mercator domain.
    ///
    /// Only the two corners (min, min) and (max, max) are transformed and the
    /// result is rebuilt from them. This is accurate for axis-aligned extents
    /// of modest size but is not a full polygon reprojection: curved edges in
    /// the target CRS are not accounted for.
    ///
    /// # Errors
    /// `UnknownCrs`, `InvalidDefinition` or `Transform` from the registry.
    pub fn project(
        &self,
        from: Option<&str>,
        to: Option<&str>,
        registry: &ProjectionRegistry,
    ) -> Result<BoundingBox, ProjectionError> {
        let (Some(from), Some(to)) = (from, to) else {
            return Ok(*self);
        };

        let from = ProjectionRegistry::normalize(from);
        let to = ProjectionRegistry::normalize(to);
        if from == to {
            return Ok(*self);
        }

        let source = if from == EPSG_WGS84 && to == EPSG_WEB_MERCATOR {
            self.clamped_to_web_mercator()
        } else {
            *self
        };

        let transformer = registry.transformer(&from, &to)?;
        let (x1, y1) = transformer.transform(source.min_longitude, source.min_latitude)?;
        let (x2, y2) = transformer.transform(source.max_longitude, source.max_latitude)?;

        Ok(BoundingBox::new(x1.min(x2), x1.max(x2), y1.min(y2), y1.max(y2)))
    }
}

impl From<BoundingBox> for Envelope {
    fn from(bbox: BoundingBox) -> Self {
        Envelope::new(
            bbox.min_longitude,
            bbox.max_longitude,
            bbox.min_latitude,
            bbox.max_latitude,
        )
    }
}

impl From<&Envelope> for BoundingBox {
    fn from(envelope: &Envelope) -> Self {
        BoundingBox::new(envelope.min_x, envelope.max_x, envelope.min_y, envelope.max_y)
    }
}

/// Parses `minLon,minLat,maxLon,maxLat`, the usual command-line order.
impl FromStr for BoundingBox {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid bounding box '{s}': {e}"))?;

        match values.as_slice() {
            [min_lon, min_lat, max_lon, max_lat] => {
                if min_lon > max_lon || min_lat > max_lat {
                    return Err(format!("invalid bounding box '{s}': min exceeds max"));
                }
                Ok(BoundingBox::new(*min_lon, *max_lon, *min_lat, *max_lat))
            }
            _ => Err(format!(
                "invalid bounding box '{s}': expected minLon,minLat,maxLon,maxLat"
            )),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
