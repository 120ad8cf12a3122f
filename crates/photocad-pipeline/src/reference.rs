//! User-placed reference markers.

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// A marker with an id assigned by insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    /// Insertion-order id, starting at 0.
    pub id: u32,
    /// Position in pixel coordinates.
    #[serde(flatten)]
    pub point: Point,
}

/// An ordered collection of reference points.
///
/// Ids are dense from 0 in insertion order. Removing a point leaves a
/// gap: its id is never handed out again until [`clear`](Self::clear).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSet {
    points: Vec<ReferencePoint>,
    next_id: u32,
}

impl ReferenceSet {
    /// An empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            points: Vec::new(),
            next_id: 0,
        }
    }

    /// Append a point and return its id.
    pub fn add(&mut self, point: Point) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.points.push(ReferencePoint { id, point });
        id
    }

    /// Remove the point with `id`, if present.
    pub fn remove(&mut self, id: u32) -> Option<ReferencePoint> {
        let pos = self.points.iter().position(|p| p.id == id)?;
        Some(self.points.remove(pos))
    }

    /// Drop every point and restart ids at 0.
    pub fn clear(&mut self) {
        self.points.clear();
        self.next_id = 0;
    }

    /// Points in insertion order.
    #[must_use]
    pub fn points(&self) -> &[ReferencePoint] {
        &self.points
    }

    /// Number of points held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if no points are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl FromIterator<Point> for ReferenceSet {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        let mut set = Self::new();
        for p in iter {
            set.add(p);
        }
        set
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_from_zero() {
        let set: ReferenceSet = [Point::new(1.0, 1.0), Point::new(2.0, 2.0), Point::new(3.0, 3.0)]
            .into_iter()
            .collect();
        let ids: Vec<u32> = set.points().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let mut set = ReferenceSet::new();
        set.add(Point::new(0.0, 0.0));
        let middle = set.add(Point::new(1.0, 0.0));
        set.add(Point::new(2.0, 0.0));

        let removed = set.remove(middle).unwrap();
        assert_eq!(removed.point, Point::new(1.0, 0.0));
        assert_eq!(set.add(Point::new(3.0, 0.0)), 3);

        let ids: Vec<u32> = set.points().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 2, 3]);
    }

    #[test]
    fn removing_unknown_id_is_a_no_op() {
        let mut set = ReferenceSet::new();
        set.add(Point::new(0.0, 0.0));
        assert!(set.remove(7).is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn clear_restarts_ids() {
        let mut set = ReferenceSet::new();
        set.add(Point::new(0.0, 0.0));
        set.add(Point::new(1.0, 0.0));
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.add(Point::new(5.0, 5.0)), 0);
    }

    #[test]
    fn serializes_flat() {
        let p = ReferencePoint {
            id: 4,
            point: Point::new(1.5, 2.0),
        };
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"id":4,"x":1.5,"y":2.0}"#);
        let back: ReferencePoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
