//! Bounding boxes and CRS reprojection.

mod bounding_box;
mod registry;

pub use bounding_box::{BoundingBox, WEB_MERCATOR_MAX_LATITUDE, WEB_MERCATOR_MIN_LATITUDE};
pub use registry::{
    lon_lat_to_mercator, mercator_to_lon_lat, CrsTransformer, ProjectionRegistry,
    EPSG_WEB_MERCATOR, EPSG_WGS84, WEB_MERCATOR_HALF_WORLD,
};
