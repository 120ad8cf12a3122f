//! Traced and labeled geometry.
//!
//! A [`RawTrace`] is what connectivity analysis produces: an ordered
//! point list with no meaning attached. The classifier turns each
//! surviving trace into a [`Feature`] carrying a [`FeatureKind`], a
//! confidence in `[0, 1]`, and free-form annotations.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Confidence the tracer assigns to every raw trace.
pub const RAW_TRACE_CONFIDENCE: f64 = 0.8;

/// Semantic label of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Outer hull silhouette, or a long mid-height horizontal.
    HullProfile,
    /// Long horizontal near the bottom of the frame.
    Waterline,
    /// Long vertical.
    Mast,
    /// Long horizontal near the top of the frame, and the yacht catch-all.
    DeckEdge,
    /// Medium-length feature in interior/general drawings.
    Cabin,
    /// Short-feature catch-all in interior/general drawings.
    Keel,
}

impl FeatureKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::HullProfile,
        Self::Waterline,
        Self::Mast,
        Self::DeckEdge,
        Self::Cabin,
        Self::Keel,
    ];

    /// Wire name (`hull_profile`, `waterline`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HullProfile => "hull_profile",
            Self::Waterline => "waterline",
            Self::Mast => "mast",
            Self::DeckEdge => "deck_edge",
            Self::Cabin => "cabin",
            Self::Keel => "keel",
        }
    }

    /// CAD layer name: the uppercased wire name.
    #[must_use]
    pub const fn layer_name(self) -> &'static str {
        match self {
            Self::HullProfile => "HULL_PROFILE",
            Self::Waterline => "WATERLINE",
            Self::Mast => "MAST",
            Self::DeckEdge => "DECK_EDGE",
            Self::Cabin => "CABIN",
            Self::Keel => "KEEL",
        }
    }

    /// CSS class used by the SVG writer.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::HullProfile => "hull-profile",
            Self::Waterline => "waterline",
            Self::Mast => "mast",
            Self::DeckEdge => "deck-edge",
            Self::Cabin => "cabin",
            Self::Keel => "keel",
        }
    }

    /// Whether serializers draw this kind as a multi-vertex polyline.
    ///
    /// All other kinds are reduced to a single endpoint-to-endpoint line.
    #[must_use]
    pub const fn is_polyline(self) -> bool {
        matches!(self, Self::HullProfile | Self::DeckEdge)
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single annotation value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Numeric annotation.
    Number(f64),
    /// Textual annotation.
    Text(String),
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Per-feature annotations, ordered by key so output is deterministic.
pub type Metadata = BTreeMap<String, MetaValue>;

/// An unlabeled point sequence from the line tracer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrace {
    /// Points in discovery order.
    pub points: Vec<Point>,
    /// Always [`RAW_TRACE_CONFIDENCE`] when produced by the tracer.
    pub confidence: f64,
}

impl RawTrace {
    /// Wrap a discovered point list.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            confidence: RAW_TRACE_CONFIDENCE,
        }
    }

    /// Number of points in the trace.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the trace has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A labeled polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Semantic label.
    #[serde(rename = "type")]
    pub kind: FeatureKind,
    /// Points in the order the tracer discovered them.
    pub points: Vec<Point>,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f64,
    /// Free-form annotations (length, orientation, position, method).
    #[serde(default)]
    pub metadata: Metadata,
}

impl Feature {
    /// First point, if any.
    #[must_use]
    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    /// Last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Endpoint-to-endpoint distance in pixels. Zero when empty.
    #[must_use]
    pub fn chord_length(&self) -> f64 {
        match (self.first(), self.last()) {
            (Some(a), Some(b)) => a.distance(b),
            _ => 0.0,
        }
    }

    /// Largest side of the axis-aligned bounding box of the points.
    #[must_use]
    pub fn bounding_span(&self) -> f64 {
        bounding_box(&self.points).map_or(0.0, |(min, max)| (max.x - min.x).max(max.y - min.y))
    }

    /// A copy with every coordinate divided by `divisor`.
    ///
    /// The original feature is left untouched.
    #[must_use]
    pub fn scaled(&self, divisor: f64) -> Self {
        Self {
            kind: self.kind,
            points: self
                .points
                .iter()
                .map(|p| Point::new(p.x / divisor, p.y / divisor))
                .collect(),
            confidence: self.confidence,
            metadata: self.metadata.clone(),
        }
    }
}

/// Axis-aligned bounding box of `points` as `(min, max)` corners.
///
/// Returns `None` for an empty slice.
#[must_use]
pub fn bounding_box(points: &[Point]) -> Option<(Point, Point)> {
    let first = *points.first()?;
    Some(points.iter().fold((first, first), |(min, max), p| {
        (
            Point::new(min.x.min(p.x), min.y.min(p.y)),
            Point::new(max.x.max(p.x), max.y.max(p.y)),
        )
    }))
}

/// Coarse real-world size derived from the dominant feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionEstimate {
    /// Width in metres.
    pub width: f64,
    /// Height in metres.
    pub height: f64,
    /// Depth in metres.
    pub depth: f64,
    /// Human-readable size class, `"unknown"` when nothing was found.
    #[serde(rename = "type")]
    pub kind: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

impl DimensionEstimate {
    /// The estimate for an empty feature list.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            depth: 0.0,
            kind: "unknown".to_owned(),
            confidence: 0.0,
        }
    }
}
