//! Geometry envelopes.
//!
//! An envelope is the axis-aligned extent stored in a geometry blob header so
//! readers can filter features without parsing the WKB body. The header
//! records its dimensionality as a 3-bit indicator:
//!
//! ```text
//! 0: no envelope          (0 doubles)
//! 1: [minx, maxx, miny, maxy]                              (4 doubles, 32 bytes)
//! 2: [minx, maxx, miny, maxy, minz, maxz]                  (6 doubles, 48 bytes)
//! 3: [minx, maxx, miny, maxy, minm, maxm]                  (6 doubles, 48 bytes)
//! 4: [minx, maxx, miny, maxy, minz, maxz, minm, maxm]      (8 doubles, 64 bytes)
//! ```

use geo::BoundingRect;
use geo_types::Geometry;
use serde::Serialize;

/// Largest valid envelope contents indicator.
pub const MAX_ENVELOPE_INDICATOR: u8 = 4;

/// Number of bytes of envelope data for an indicator value.
///
/// Returns `None` for the invalid indicators 5, 6 and 7.
pub const fn envelope_length(indicator: u8) -> Option<usize> {
    match indicator {
        0 => Some(0),
        1 => Some(32),
        2 | 3 => Some(48),
        4 => Some(64),
        _ => None,
    }
}

/// Axis-aligned bounding box with optional Z and M ranges.
///
/// The Z range is present iff `has_z()` and likewise for M. Use the `with_*`
/// builders to attach them; a fresh envelope is XY only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Envelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    z: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    m: Option<(f64, f64)>,
}

impl Envelope {
    /// Create an XY envelope.
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            z: None,
            m: None,
        }
    }

    /// Attach a Z range.
    pub fn with_z(mut self, min_z: f64, max_z: f64) -> Self {
        self.z = Some((min_z, max_z));
        self
    }

    /// Attach an M range.
    pub fn with_m(mut self, min_m: f64, max_m: f64) -> Self {
        self.m = Some((min_m, max_m));
        self
    }

    /// XY extent of a geometry, or `None` for an empty geometry.
    pub fn of_geometry(geometry: &Geometry<f64>) -> Option<Self> {
        geometry
            .bounding_rect()
            .map(|rect| Self::new(rect.min().x, rect.max().x, rect.min().y, rect.max().y))
    }

    pub fn has_z(&self) -> bool {
        self.z.is_some()
    }

    pub fn has_m(&self) -> bool {
        self.m.is_some()
    }

    pub fn min_z(&self) -> Option<f64> {
        self.z.map(|(min, _)| min)
    }

    pub fn max_z(&self) -> Option<f64> {
        self.z.map(|(_, max)| max)
    }

    pub fn min_m(&self) -> Option<f64> {
        self.m.map(|(min, _)| min)
    }

    pub fn max_m(&self) -> Option<f64> {
        self.m.map(|(_, max)| max)
    }

    /// Header indicator value (1-4) for this envelope's dimensionality.
    pub fn indicator(&self) -> u8 {
        match (self.has_z(), self.has_m()) {
            (false, false) => 1,
            (true, false) => 2,
            (false, true) => 3,
            (true, true) => 4,
        }
    }

    /// Envelope values in blob order.
    pub fn to_values(&self) -> Vec<f64> {
        let mut values = vec![self.min_x, self.max_x, self.min_y, self.max_y];
        if let Some((min, max)) = self.z {
            values.extend([min, max]);
        }
        if let Some((min, max)) = self.m {
            values.extend([min, max]);
        }
        values
    }

    /// Build an envelope from blob-ordered values for a given indicator.
    ///
    /// Returns `None` if the indicator is 0 or invalid, or if `values` holds
    /// fewer doubles than the indicator requires.
    pub fn from_values(indicator: u8, values: &[f64]) -> Option<Self> {
        let expected = envelope_length(indicator)? / 8;
        if expected == 0 || values.len() < expected {
            return None;
        }

        let mut envelope = Self::new(values[0], values[1], values[2], values[3]);
        match indicator {
            2 => envelope = envelope.with_z(values[4], values[5]),
            3 => envelope = envelope.with_m(values[4], values[5]),
            4 => {
                envelope = envelope
                    .with_z(values[4], values[5])
                    .with_m(values[6], values[7])
            }
            _ => {}
        }
        Some(envelope)
    }

    /// Whether the XY extents overlap (touching edges count).
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Whether `other` lies entirely within this envelope in XY.
    pub fn contains(&self, other: &Envelope) -> bool {
        self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_y <= other.min_y
            && self.max_y >= other.max_y
    }

    /// Smallest envelope covering both. Z/M ranges are kept only when both
    /// sides carry them.
    pub fn expand_to_include(&self, other: &Envelope) -> Envelope {
        let merge = |a: Option<(f64, f64)>, b: Option<(f64, f64)>| match (a, b) {
            (Some(a), Some(b)) => Some((a.0.min(b.0), a.1.max(b.1))),
            _ => None,
        };
        Envelope {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
            z: merge(self.z, other.z),
            m: merge(self.m, other.m),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
