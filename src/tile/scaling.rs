//! Tile scaling policies.
//!
//! When a tile is missing at the requested zoom, a table's [`TileScaling`]
//! record says where else to look. Zooming *in* probes finer levels (z+1,
//! z+2, ...) whose child tiles are scaled down into the requested footprint.
//! Zooming *out* probes coarser levels (z-1, z-2, ...) whose ancestor tile is
//! cropped and scaled up.
//!
//! ```text
//!   z-1  +---------------+        out: crop the quadrant, scale up
//!        |       |       |
//!        |-------+-------|
//!        |  req  |       |
//!   z    +-------+-------+
//!   z+1  [a][b]                  in: composite 2x2 children, scale down
//!        [c][d]
//! ```
//!
//! The enumeration is deterministic: the same inputs always give the same
//! ordered candidate list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::math::{TileRange, MAX_ZOOM};

// =============================================================================
// TileScalingType
// =============================================================================

/// Search order for missing tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileScalingType {
    /// Finer levels only
    In,
    /// Coarser levels only
    Out,
    /// Every finer level, then every coarser level
    InOut,
    /// Every coarser level, then every finer level
    OutIn,
    /// Nearest level first; finer wins ties
    ClosestInOut,
    /// Nearest level first; coarser wins ties
    ClosestOutIn,
}

impl TileScalingType {
    pub const ALL: [TileScalingType; 6] = [
        TileScalingType::In,
        TileScalingType::Out,
        TileScalingType::InOut,
        TileScalingType::OutIn,
        TileScalingType::ClosestInOut,
        TileScalingType::ClosestOutIn,
    ];

    /// Stored name of the policy.
    pub fn name(self) -> &'static str {
        match self {
            TileScalingType::In => "in",
            TileScalingType::Out => "out",
            TileScalingType::InOut => "in_out",
            TileScalingType::OutIn => "out_in",
            TileScalingType::ClosestInOut => "closest_in_out",
            TileScalingType::ClosestOutIn => "closest_out_in",
        }
    }

    /// Whether the policy may probe finer levels.
    pub fn is_zoom_in(self) -> bool {
        self != TileScalingType::Out
    }

    /// Whether the policy may probe coarser levels.
    pub fn is_zoom_out(self) -> bool {
        self != TileScalingType::In
    }
}

impl fmt::Display for TileScalingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TileScalingType {
    type Err = String;

    /// Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        TileScalingType::ALL
            .into_iter()
            .find(|t| t.name() == normalized)
            .ok_or_else(|| format!("unknown tile scaling type '{s}'"))
    }
}

// =============================================================================
// Candidates
// =============================================================================

/// Direction of a candidate relative to the requested zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingDirection {
    In,
    Out,
}

/// A zoom level to probe for a missing tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScalingCandidate {
    pub zoom: u32,
    pub direction: ScalingDirection,
    /// Absolute level difference from the requested zoom
    pub delta: u32,
}

impl ScalingCandidate {
    /// Tiles at the candidate zoom covering the requested tile.
    ///
    /// Zooming in gives the 2^d x 2^d block of descendants; zooming out gives
    /// the single ancestor.
    pub fn source_range(&self, column: u32, row: u32) -> TileRange {
        match self.direction {
            ScalingDirection::In => {
                let span = 1u32 << self.delta;
                TileRange {
                    zoom: self.zoom,
                    min_column: column << self.delta,
                    max_column: (column << self.delta) + span - 1,
                    min_row: row << self.delta,
                    max_row: (row << self.delta) + span - 1,
                }
            }
            ScalingDirection::Out => TileRange {
                zoom: self.zoom,
                min_column: column >> self.delta,
                max_column: column >> self.delta,
                min_row: row >> self.delta,
                max_row: row >> self.delta,
            },
        }
    }
}

// =============================================================================
// TileScaling
// =============================================================================

/// Scaling record for one tile table.
///
/// `zoom_in` and `zoom_out` cap how many levels may be searched in each
/// direction. `None` is unbounded and `Some(0)` disables the direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileScaling {
    pub table_name: String,
    pub scaling_type: TileScalingType,
    #[serde(default)]
    pub zoom_in: Option<u32>,
    #[serde(default)]
    pub zoom_out: Option<u32>,
}

impl TileScaling {
    pub fn new(table_name: impl Into<String>, scaling_type: TileScalingType) -> Self {
        Self {
            table_name: table_name.into(),
            scaling_type,
            zoom_in: None,
            zoom_out: None,
        }
    }

    pub fn with_zoom_in(mut self, zoom_in: Option<u32>) -> Self {
        self.zoom_in = zoom_in;
        self
    }

    pub fn with_zoom_out(mut self, zoom_out: Option<u32>) -> Self {
        self.zoom_out = zoom_out;
        self
    }

    /// Whether finer levels will be searched.
    pub fn is_zoom_in(&self) -> bool {
        self.scaling_type.is_zoom_in() && self.zoom_in != Some(0)
    }

    /// Whether coarser levels will be searched.
    pub fn is_zoom_out(&self) -> bool {
        self.scaling_type.is_zoom_out() && self.zoom_out != Some(0)
    }

    /// Finer levels to probe, nearest first.
    fn zoom_in_levels(&self, zoom: u32, min_zoom: u32, max_zoom: u32) -> Vec<u32> {
        if !self.is_zoom_in() {
            return Vec::new();
        }
        let limit = self
            .zoom_in
            .map_or(max_zoom, |levels| zoom.saturating_add(levels))
            .min(max_zoom)
            .min(MAX_ZOOM);
        (zoom.saturating_add(1)..=limit)
            .filter(|z| *z >= min_zoom)
            .collect()
    }

    /// Coarser levels to probe, nearest first.
    fn zoom_out_levels(&self, zoom: u32, min_zoom: u32, max_zoom: u32) -> Vec<u32> {
        if !self.is_zoom_out() || zoom == 0 {
            return Vec::new();
        }
        let limit = self
            .zoom_out
            .map_or(min_zoom, |levels| zoom.saturating_sub(levels))
            .max(min_zoom);
        (limit..zoom).rev().filter(|z| *z <= max_zoom).collect()
    }

    /// Ordered zoom levels to probe after a miss at `zoom`, given the table's
    /// available range `[min_zoom, max_zoom]`.
    ///
    /// The requested zoom itself is never included.
    pub fn candidate_zooms(&self, zoom: u32, min_zoom: u32, max_zoom: u32) -> Vec<u32> {
        self.candidates(zoom, min_zoom, max_zoom)
            .into_iter()
            .map(|c| c.zoom)
            .collect()
    }

    /// Ordered candidates with their direction, see [`TileScaling::candidate_zooms`].
    pub fn candidates(&self, zoom: u32, min_zoom: u32, max_zoom: u32) -> Vec<ScalingCandidate> {
        let tag = |direction: ScalingDirection| {
            move |z: u32| ScalingCandidate {
                zoom: z,
                direction,
                delta: z.abs_diff(zoom),
            }
        };

        let zoom_in: Vec<ScalingCandidate> = self
            .zoom_in_levels(zoom, min_zoom, max_zoom)
            .into_iter()
            .map(tag(ScalingDirection::In))
            .collect();
        let zoom_out: Vec<ScalingCandidate> = self
            .zoom_out_levels(zoom, min_zoom, max_zoom)
            .into_iter()
            .map(tag(ScalingDirection::Out))
            .collect();

        match self.scaling_type {
            TileScalingType::In => zoom_in,
            TileScalingType::Out => zoom_out,
            TileScalingType::InOut => zoom_in.into_iter().chain(zoom_out).collect(),
            TileScalingType::OutIn => zoom_out.into_iter().chain(zoom_in).collect(),
            TileScalingType::ClosestInOut => merge_closest(zoom_in, zoom_out),
            TileScalingType::ClosestOutIn => merge_closest(zoom_out, zoom_in),
        }
    }
}

/// Merge two nearest-first lists by delta; `preferred` wins ties.
fn merge_closest(
    preferred: Vec<ScalingCandidate>,
    other: Vec<ScalingCandidate>,
) -> Vec<ScalingCandidate> {
    let mut merged = Vec::with_capacity(preferred.len() + other.len());
    let mut preferred = preferred.into_iter().peekable();
    let mut other = other.into_iter().peekable();

    loop {
        let next = match (preferred.peek(), other.peek()) {
            (Some(p), Some(o)) if o.delta < p.delta => other.next(),
            (Some(_), _) => preferred.next(),
            (None, Some(_)) => other.next(),
            (None, None) => break,
        };
        merged.extend(next);
    }

    merged
}

// =============================================================================
// Tests
// =============================================================================
