//! Feature classification: label raw traces with rule-based heuristics.
//!
//! Each trace is reduced to three signals:
//!
//! - **length**: chord between first and last point (not path length),
//! - **orientation**: horizontal when `|Δx| > |Δy|` over that chord,
//!   vertical when `|Δy| > |Δx|`, otherwise diagonal,
//! - **centroid**: mean of all points, used as a position proxy.
//!
//! The [`ConversionMode`] picks the label table. Points are never
//! reordered or resampled here.
//!
//! This is step 4 in the pipeline, after line tracing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::feature::{Feature, FeatureKind, Metadata, RawTrace};
use crate::types::{Dimensions, PipelineError, Point};

/// Traces with fewer points are dropped before labeling.
pub const MIN_POINTS: usize = 3;

/// Traces whose chord is shorter than this (in pixels) are dropped.
pub const MIN_CHORD_PX: f64 = 20.0;

/// Horizontal traces longer than this fraction of the canvas width are
/// "long".
const LONG_HORIZONTAL: f64 = 0.3;

/// Vertical traces longer than this fraction of the canvas height are
/// "long".
const LONG_VERTICAL: f64 = 0.4;

/// Traces longer than this fraction of the shorter canvas side are
/// "medium".
const MEDIUM: f64 = 0.2;

/// Centroids above this fraction of the height are in the top band;
/// below `1 - TOP_BAND` they are in the bottom band.
const TOP_BAND: f64 = 0.3;

/// Selects the label table used by the classifier and estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    /// Yacht side profiles: waterline, deck edge, hull, mast.
    #[default]
    Yacht,
    /// Interior components (cabinetry, panels, berths).
    Interior,
    /// Anything else.
    General,
}

impl ConversionMode {
    /// Lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yacht => "yacht",
            Self::Interior => "interior",
            Self::General => "general",
        }
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yacht" => Ok(Self::Yacht),
            "interior" => Ok(Self::Interior),
            "general" => Ok(Self::General),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown conversion mode {other:?} (expected yacht, interior or general)"
            ))),
        }
    }
}

/// Chord orientation of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// `|Δx| > |Δy|`.
    Horizontal,
    /// `|Δy| > |Δx|`.
    Vertical,
    /// `|Δx| == |Δy|`.
    Diagonal,
}

impl Orientation {
    /// Metadata tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
            Self::Diagonal => "diagonal",
        }
    }
}

/// The geometric signals the label tables look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    /// Chord length in pixels.
    pub length: f64,
    /// Chord orientation.
    pub orientation: Orientation,
    /// Mean of all points.
    pub centroid: Point,
}

impl Measurements {
    /// Measure a point list. Returns `None` when it is empty.
    #[must_use]
    pub fn of(points: &[Point]) -> Option<Self> {
        let first = *points.first()?;
        let last = *points.last()?;
        let dx = (last.x - first.x).abs();
        let dy = (last.y - first.y).abs();
        let orientation = if dx > dy {
            Orientation::Horizontal
        } else if dy > dx {
            Orientation::Vertical
        } else {
            Orientation::Diagonal
        };

        #[allow(clippy::cast_precision_loss)]
        let n = points.len() as f64;
        let (sum_x, sum_y) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));

        Some(Self {
            length: first.distance(last),
            orientation,
            centroid: Point::new(sum_x / n, sum_y / n),
        })
    }
}

/// Label every trace that survives the length filter.
///
/// Traces with fewer than [`MIN_POINTS`] points, or whose chord is
/// shorter than [`MIN_CHORD_PX`], are dropped. The rest become
/// features in input order.
#[must_use = "returns the labeled features"]
pub fn classify(traces: &[RawTrace], canvas: Dimensions, mode: ConversionMode) -> Vec<Feature> {
    let features: Vec<Feature> = traces
        .iter()
        .filter_map(|trace| classify_trace(trace, canvas, mode))
        .collect();
    log::debug!(
        "classified {} of {} traces in {mode} mode",
        features.len(),
        traces.len(),
    );
    features
}

/// Label a single trace, or `None` if it fails the length filter.
#[must_use]
pub fn classify_trace(trace: &RawTrace, canvas: Dimensions, mode: ConversionMode) -> Option<Feature> {
    if trace.len() < MIN_POINTS {
        log::trace!("dropping trace with {} points", trace.len());
        return None;
    }
    let m = Measurements::of(&trace.points)?;
    if m.length < MIN_CHORD_PX {
        log::trace!("dropping trace with {:.1}px chord", m.length);
        return None;
    }

    let (kind, confidence) = match mode {
        ConversionMode::Yacht => label_yacht(&m, canvas),
        ConversionMode::Interior | ConversionMode::General => label_component(&m, canvas),
    };

    Some(Feature {
        kind,
        points: trace.points.clone(),
        confidence: clamp_confidence(confidence),
        metadata: describe(&m, canvas, mode, trace.len()),
    })
}

/// Which third of the canvas height the centroid falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Top,
    Middle,
    Bottom,
}

fn band(centroid: Point, height: f64) -> Band {
    if centroid.y > height * (1.0 - TOP_BAND) {
        Band::Bottom
    } else if centroid.y < height * TOP_BAND {
        Band::Top
    } else {
        Band::Middle
    }
}

/// Canvas-relative size classes shared by both tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    LongHorizontal(Band),
    LongVertical,
    Medium,
    Short,
}

fn shape(m: &Measurements, canvas: Dimensions) -> Shape {
    let w = f64::from(canvas.width);
    let h = f64::from(canvas.height);
    if m.orientation == Orientation::Horizontal && m.length > w * LONG_HORIZONTAL {
        Shape::LongHorizontal(band(m.centroid, h))
    } else if m.orientation == Orientation::Vertical && m.length > h * LONG_VERTICAL {
        Shape::LongVertical
    } else if m.length > w.min(h) * MEDIUM {
        Shape::Medium
    } else {
        Shape::Short
    }
}

fn label_yacht(m: &Measurements, canvas: Dimensions) -> (FeatureKind, f64) {
    match shape(m, canvas) {
        Shape::LongHorizontal(Band::Bottom) => (FeatureKind::Waterline, 0.9),
        Shape::LongHorizontal(Band::Top) => (FeatureKind::DeckEdge, 0.8),
        Shape::LongHorizontal(Band::Middle) => (FeatureKind::HullProfile, 0.85),
        Shape::LongVertical => (FeatureKind::Mast, 0.8),
        Shape::Medium => (FeatureKind::HullProfile, 0.75),
        Shape::Short => (FeatureKind::DeckEdge, 0.6),
    }
}

fn label_component(m: &Measurements, canvas: Dimensions) -> (FeatureKind, f64) {
    match shape(m, canvas) {
        Shape::LongHorizontal(Band::Top) => (FeatureKind::DeckEdge, 0.8),
        Shape::LongHorizontal(Band::Bottom) => (FeatureKind::Waterline, 0.8),
        Shape::LongHorizontal(Band::Middle) => (FeatureKind::HullProfile, 0.7),
        Shape::LongVertical => (FeatureKind::Mast, 0.8),
        Shape::Medium => (FeatureKind::Cabin, 0.7),
        Shape::Short => (FeatureKind::Keel, 0.6),
    }
}

/// Clamp to `[0, 1]`; a non-finite score falls back to 0.5.
fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

fn describe(m: &Measurements, canvas: Dimensions, mode: ConversionMode, points: usize) -> Metadata {
    let percent = |v: f64, extent: u32| {
        if extent == 0 {
            0.0
        } else {
            v / f64::from(extent) * 100.0
        }
    };

    let mut meta = Metadata::new();
    meta.insert("length".into(), format!("{:.1}", m.length).into());
    meta.insert("orientation".into(), m.orientation.as_str().into());
    meta.insert(
        "position".into(),
        format!(
            "{:.1}%, {:.1}%",
            percent(m.centroid.x, canvas.width),
            percent(m.centroid.y, canvas.height),
        )
        .into(),
    );
    meta.insert(
        "detectionMethod".into(),
        format!("{}_heuristic", mode.as_str()).into(),
    );
    #[allow(clippy::cast_precision_loss)]
    let point_count = points as f64;
    meta.insert("pointCount".into(), point_count.into());
    meta
}
