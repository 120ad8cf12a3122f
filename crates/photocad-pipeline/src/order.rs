//! Point ordering within a trace.
//!
//! The tracer emits points in depth-first discovery order, which
//! zig-zags across thick or branching components. CAD consumers that
//! expect a smooth walk can opt into re-chaining here. The default
//! leaves discovery order untouched, since re-chaining changes the
//! shape of the output polyline.
//!
//! # Strategy pattern
//!
//! [`PointOrder`] selects the strategy at runtime; [`TraceOrdering`] is
//! the seam new strategies plug into.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::feature::RawTrace;
use crate::types::{PipelineError, Point};

/// Selects how points inside each trace are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointOrder {
    /// Keep the tracer's DFS discovery order.
    #[default]
    Discovery,

    /// Starting from the first discovered point, repeatedly step to the
    /// nearest point not yet taken.
    ///
    /// O(n²) per trace. Produces a walk without long back-jumps on thin
    /// lines; branches still force a jump.
    NearestNeighbor,
}

impl PointOrder {
    /// Wire name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::NearestNeighbor => "nearest_neighbor",
        }
    }
}

impl fmt::Display for PointOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointOrder {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "discovery" => Ok(Self::Discovery),
            "nearest_neighbor" => Ok(Self::NearestNeighbor),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown point order {other:?} (expected discovery or nearest_neighbor)"
            ))),
        }
    }
}

/// Trait for point ordering strategies.
pub trait TraceOrdering {
    /// Reorder the points of one trace.
    fn order(&self, trace: RawTrace) -> RawTrace;
}

impl TraceOrdering for PointOrder {
    fn order(&self, trace: RawTrace) -> RawTrace {
        match *self {
            Self::Discovery => trace,
            Self::NearestNeighbor => RawTrace {
                points: nearest_neighbor_chain(&trace.points),
                confidence: trace.confidence,
            },
        }
    }
}

/// Greedy nearest-neighbor walk over `points`, starting at index 0.
///
/// Ties go to the earlier-discovered point.
fn nearest_neighbor_chain(points: &[Point]) -> Vec<Point> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };

    let mut taken = vec![false; points.len()];
    let mut chain = Vec::with_capacity(points.len());
    taken[0] = true;
    chain.push(first);
    let mut current = first;

    for _ in 1..points.len() {
        let mut best: Option<usize> = None;
        let mut best_dist = f64::INFINITY;
        for (j, candidate) in points.iter().enumerate() {
            if taken[j] {
                continue;
            }
            let dist = current.distance_squared(*candidate);
            if dist < best_dist {
                best_dist = dist;
                best = Some(j);
            }
        }
        // At least one point is untaken on every iteration.
        let Some(j) = best else {
            break;
        };
        taken[j] = true;
        current = points[j];
        chain.push(current);
    }

    chain
}
