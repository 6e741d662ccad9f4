//! Coordinate reference system definitions and point transforms.
//!
//! A [`ProjectionRegistry`] maps CRS names to proj4 definitions. It is passed
//! explicitly to whatever needs to reproject, so the set of available systems
//! is visible at each call site.
//!
//! Lookup order for a name:
//! 1. Definitions registered on this registry (EPSG:4326 and EPSG:3857 are preloaded)
//! 2. The `crs-definitions` EPSG database, for `EPSG:<code>` names
//!
//! Transforms between EPSG:4326 and EPSG:3857 use closed-form spherical
//! Mercator math; everything else goes through `proj4rs`.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::error::ProjectionError;

// =============================================================================
// Constants
// =============================================================================

/// Canonical name of WGS84 geographic coordinates
pub const EPSG_WGS84: &str = "EPSG:4326";

/// Canonical name of spherical Web Mercator
pub const EPSG_WEB_MERCATOR: &str = "EPSG:3857";

/// Half the Web Mercator world width in meters
pub const WEB_MERCATOR_HALF_WORLD: f64 = 20037508.342789244;

const WGS84_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs";
const WEB_MERCATOR_PROJ4: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wktext +no_defs";

// =============================================================================
// ProjectionRegistry
// =============================================================================

/// Named proj4 definitions available for reprojection.
#[derive(Debug, Clone)]
pub struct ProjectionRegistry {
    definitions: HashMap<String, String>,
}

impl Default for ProjectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectionRegistry {
    /// Create a registry with EPSG:4326 and EPSG:3857 preloaded.
    pub fn new() -> Self {
        let mut definitions = HashMap::new();
        definitions.insert(EPSG_WGS84.to_string(), WGS84_PROJ4.to_string());
        definitions.insert(EPSG_WEB_MERCATOR.to_string(), WEB_MERCATOR_PROJ4.to_string());
        Self { definitions }
    }

    /// Normalize a CRS name: trimmed, upper-cased, bare numbers become `EPSG:<n>`.
    pub fn normalize(name: &str) -> String {
        let trimmed = name.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            return format!("EPSG:{trimmed}");
        }
        trimmed.to_ascii_uppercase()
    }

    /// Register (or replace) a proj4 definition under a name.
    ///
    /// # Errors
    /// `InvalidDefinition` if `proj4rs` cannot parse the definition.
    pub fn register(&mut self, name: &str, proj4: &str) -> Result<(), ProjectionError> {
        let key = Self::normalize(name);
        Proj::from_proj_string(proj4).map_err(|e| ProjectionError::InvalidDefinition {
            crs: key.clone(),
            message: format!("{e:?}"),
        })?;
        self.definitions.insert(key, proj4.to_string());
        Ok(())
    }

    /// Whether a name resolves to a definition.
    pub fn contains(&self, name: &str) -> bool {
        self.definition(name).is_ok()
    }

    /// Resolve the proj4 definition for a name.
    ///
    /// # Errors
    /// `UnknownCrs` if the name is neither registered nor a known EPSG code.
    pub fn definition(&self, name: &str) -> Result<String, ProjectionError> {
        let key = Self::normalize(name);
        if let Some(def) = self.definitions.get(&key) {
            return Ok(def.clone());
        }

        key.strip_prefix("EPSG:")
            .and_then(|code| code.parse::<u16>().ok())
            .and_then(crs_definitions::from_code)
            .map(|def| def.proj4.to_string())
            .ok_or(ProjectionError::UnknownCrs(key))
    }

    /// Build a transformer between two CRS names.
    ///
    /// # Errors
    /// `UnknownCrs` or `InvalidDefinition` if either side cannot be resolved.
    pub fn transformer(&self, from: &str, to: &str) -> Result<CrsTransformer, ProjectionError> {
        let from = Self::normalize(from);
        let to = Self::normalize(to);

        let strategy = if from == to {
            Strategy::Identity
        } else if self.is_builtin(&from, EPSG_WGS84) && self.is_builtin(&to, EPSG_WEB_MERCATOR) {
            Strategy::LonLatToMercator
        } else if self.is_builtin(&from, EPSG_WEB_MERCATOR) && self.is_builtin(&to, EPSG_WGS84) {
            Strategy::MercatorToLonLat
        } else {
            Strategy::Proj(Box::new(ProjPair::new(self, &from, &to)?))
        };

        Ok(CrsTransformer { from, to, strategy })
    }

    /// True when `name` is `builtin` and has not been re-registered.
    fn is_builtin(&self, name: &str, builtin: &str) -> bool {
        let expected = if builtin == EPSG_WGS84 {
            WGS84_PROJ4
        } else {
            WEB_MERCATOR_PROJ4
        };
        name == builtin && self.definitions.get(name).map(String::as_str) == Some(expected)
    }
}

// =============================================================================
// CrsTransformer
// =============================================================================

/// Point transformer between two coordinate reference systems.
///
/// Geographic coordinates are in degrees on both sides.
pub struct CrsTransformer {
    from: String,
    to: String,
    strategy: Strategy,
}

enum Strategy {
    Identity,
    LonLatToMercator,
    MercatorToLonLat,
    Proj(Box<ProjPair>),
}

struct ProjPair {
    source: Proj,
    target: Proj,
    source_is_geographic: bool,
    target_is_geographic: bool,
}

impl ProjPair {
    fn new(registry: &ProjectionRegistry, from: &str, to: &str) -> Result<Self, ProjectionError> {
        let source_def = registry.definition(from)?;
        let target_def = registry.definition(to)?;

        let parse = |crs: &str, def: &str| {
            Proj::from_proj_string(def).map_err(|e| ProjectionError::InvalidDefinition {
                crs: crs.to_string(),
                message: format!("{e:?}"),
            })
        };

        Ok(Self {
            source: parse(from, &source_def)?,
            target: parse(to, &target_def)?,
            source_is_geographic: is_geographic(&source_def),
            target_is_geographic: is_geographic(&target_def),
        })
    }
}

impl fmt::Debug for CrsTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrsTransformer")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl CrsTransformer {
    pub fn from_crs(&self) -> &str {
        &self.from
    }

    pub fn to_crs(&self) -> &str {
        &self.to
    }

    /// Transform one point.
    ///
    /// # Errors
    /// `Transform` if the projection library rejects the point.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        match &self.strategy {
            Strategy::Identity => Ok((x, y)),
            Strategy::LonLatToMercator => Ok(lon_lat_to_mercator(x, y)),
            Strategy::MercatorToLonLat => Ok(mercator_to_lon_lat(x, y)),
            Strategy::Proj(pair) => {
                // proj4rs works in radians for geographic systems
                let mut point = if pair.source_is_geographic {
                    (x.to_radians(), y.to_radians(), 0.0)
                } else {
                    (x, y, 0.0)
                };

                transform(&pair.source, &pair.target, &mut point).map_err(|e| {
                    ProjectionError::Transform {
                        from: self.from.clone(),
                        to: self.to.clone(),
                        message: format!("{e:?}"),
                    }
                })?;

                if !point.0.is_finite() || !point.1.is_finite() {
                    return Err(ProjectionError::Transform {
                        from: self.from.clone(),
                        to: self.to.clone(),
                        message: format!("non-finite result for ({x}, {y})"),
                    });
                }

                if pair.target_is_geographic {
                    Ok((point.0.to_degrees(), point.1.to_degrees()))
                } else {
                    Ok((point.0, point.1))
                }
            }
        }
    }
}

fn is_geographic(proj4: &str) -> bool {
    proj4.contains("+proj=longlat") || proj4.contains("+proj=latlong")
}

/// WGS84 degrees to spherical Web Mercator meters.
pub fn lon_lat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = lon * WEB_MERCATOR_HALF_WORLD / 180.0;
    let y = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
    (x, y * WEB_MERCATOR_HALF_WORLD / 180.0)
}

/// Spherical Web Mercator meters to WGS84 degrees.
pub fn mercator_to_lon_lat(x: f64, y: f64) -> (f64, f64) {
    let lon = x / WEB_MERCATOR_HALF_WORLD * 180.0;
    let lat = y / WEB_MERCATOR_HALF_WORLD * 180.0;
    let lat = 180.0 / PI * (2.0 * (lat * PI / 180.0).exp().atan() - PI / 2.0);
    (lon, lat)
}

// =============================================================================
// Tests
// =============================================================================
