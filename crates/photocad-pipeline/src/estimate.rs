//! Dimension estimation: bucket the dominant feature into a size tier.
//!
//! The primary feature is the one whose own bounding box has the
//! largest side. That pixel span is looked up in a fixed per-mode tier
//! table; each tier carries nominal real-world dimensions in metres.
//! The tables are domain lookups, not proportions of the span.
//!
//! This is step 5 in the pipeline, after classification.

use crate::classify::ConversionMode;
use crate::feature::{DimensionEstimate, Feature};

/// Confidence used when the primary feature's own score is unusable.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// One row of a tier table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tier {
    /// Spans strictly below this (in pixels) fall in this tier.
    pub below: f64,
    /// Size class label.
    pub label: &'static str,
    /// Nominal width in metres.
    pub width: f64,
    /// Nominal height in metres.
    pub height: f64,
    /// Nominal depth in metres.
    pub depth: f64,
}

const fn tier(below: f64, label: &'static str, width: f64, height: f64, depth: f64) -> Tier {
    Tier {
        below,
        label,
        width,
        height,
        depth,
    }
}

const YACHT: [Tier; 4] = [
    tier(200.0, "Small Yacht (< 30ft)", 9.0, 12.0, 3.2),
    tier(400.0, "Medium Yacht (30-45ft)", 12.0, 16.0, 3.8),
    tier(600.0, "Large Yacht (45-60ft)", 16.0, 20.0, 4.5),
    tier(f64::INFINITY, "Superyacht (60ft+)", 24.0, 28.0, 5.5),
];

const INTERIOR: [Tier; 4] = [
    tier(150.0, "Small Fitting", 0.3, 0.3, 0.2),
    tier(350.0, "Cabinet/Panel", 0.8, 0.6, 0.4),
    tier(600.0, "Bulkhead/Berth", 1.8, 1.2, 0.6),
    tier(f64::INFINITY, "Large Interior Section", 3.0, 2.0, 1.0),
];

const GENERAL: [Tier; 4] = [
    tier(100.0, "Small Object", 0.1, 0.1, 0.05),
    tier(300.0, "Medium Object", 0.5, 0.5, 0.3),
    tier(600.0, "Large Object", 1.5, 1.5, 1.0),
    tier(f64::INFINITY, "Very Large Object", 5.0, 5.0, 3.0),
];

impl ConversionMode {
    /// The size tier table for this mode, ordered by ascending span.
    #[must_use]
    pub const fn tiers(self) -> &'static [Tier] {
        match self {
            Self::Yacht => &YACHT,
            Self::Interior => &INTERIOR,
            Self::General => &GENERAL,
        }
    }
}

/// Estimate real-world size from the labeled features.
///
/// An empty list, or a primary feature with zero span, yields
/// [`DimensionEstimate::unknown`].
#[must_use = "returns the size estimate"]
pub fn estimate_dimensions(features: &[Feature], mode: ConversionMode) -> DimensionEstimate {
    let Some((primary, span)) = primary_feature(features) else {
        log::debug!("no features to estimate from");
        return DimensionEstimate::unknown();
    };
    if span <= 0.0 || !span.is_finite() {
        log::warn!("primary feature has a degenerate span ({span}); size unknown");
        return DimensionEstimate::unknown();
    }

    let tiers = mode.tiers();
    // The last tier is unbounded, so a finite span always lands somewhere.
    let Some(t) = tiers.iter().find(|t| span < t.below).or_else(|| tiers.last()) else {
        return DimensionEstimate::unknown();
    };

    let confidence = if primary.confidence.is_finite() {
        primary.confidence.clamp(0.0, 1.0)
    } else {
        FALLBACK_CONFIDENCE
    };

    log::debug!(
        "primary {} spans {span:.1}px: {} in {mode} mode",
        primary.kind,
        t.label,
    );

    DimensionEstimate {
        width: t.width,
        height: t.height,
        depth: t.depth,
        kind: t.label.to_owned(),
        confidence,
    }
}

/// The feature with the largest bounding span, and that span.
///
/// Ties go to the earlier feature.
#[must_use]
pub fn primary_feature(features: &[Feature]) -> Option<(&Feature, f64)> {
    features.iter().fold(None, |best, f| {
        let span = f.bounding_span();
        match best {
            Some((_, best_span)) if span <= best_span => best,
            _ => Some((f, span)),
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::feature::{FeatureKind, Metadata};
    use crate::types::Point;

    fn horizontal(kind: FeatureKind, length: f64, confidence: f64) -> Feature {
        Feature {
            kind,
            points: vec![Point::new(10.0, 10.0), Point::new(10.0 + length, 12.0)],
            confidence,
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn empty_list_is_unknown() {
        for mode in [
            ConversionMode::Yacht,
            ConversionMode::Interior,
            ConversionMode::General,
        ] {
            assert_eq!(estimate_dimensions(&[], mode), DimensionEstimate::unknown());
        }
    }

    #[test]
    fn yacht_tiers_by_span() {
        let cases = [
            (150.0, "Small Yacht (< 30ft)", 9.0),
            (200.0, "Medium Yacht (30-45ft)", 12.0),
            (450.0, "Large Yacht (45-60ft)", 16.0),
            (900.0, "Superyacht (60ft+)", 24.0),
        ];
        for (length, label, width) in cases {
            let f = horizontal(FeatureKind::Waterline, length, 0.9);
            let e = estimate_dimensions(&[f], ConversionMode::Yacht);
            assert_eq!(e.kind, label, "span {length}");
            assert!((e.width - width).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn interior_and_general_use_their_own_tables() {
        let f = horizontal(FeatureKind::Cabin, 250.0, 0.7);
        let interior = estimate_dimensions(std::slice::from_ref(&f), ConversionMode::Interior);
        assert_eq!(interior.kind, "Cabinet/Panel");
        assert!((interior.height - 0.6).abs() < f64::EPSILON);

        let general = estimate_dimensions(&[f], ConversionMode::General);
        assert_eq!(general.kind, "Medium Object");
        assert!((general.depth - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn primary_is_largest_span_and_confidence_is_inherited() {
        let small = horizontal(FeatureKind::DeckEdge, 50.0, 0.6);
        let big = horizontal(FeatureKind::Mast, 500.0, 0.8);
        let e = estimate_dimensions(&[small, big], ConversionMode::Yacht);
        assert_eq!(e.kind, "Large Yacht (45-60ft)");
        assert!((e.confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn ties_go_to_the_first_feature() {
        let a = horizontal(FeatureKind::DeckEdge, 100.0, 0.6);
        let b = horizontal(FeatureKind::Mast, 100.0, 0.8);
        let pair = [a, b];
        let (primary, _) = primary_feature(&pair).unwrap();
        assert_eq!(primary.kind, FeatureKind::DeckEdge);
    }

    #[test]
    fn unusable_confidence_falls_back() {
        let f = horizontal(FeatureKind::Waterline, 300.0, f64::NAN);
        let e = estimate_dimensions(&[f], ConversionMode::Yacht);
        assert!((e.confidence - FALLBACK_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_span_is_unknown() {
        let f = Feature {
            kind: FeatureKind::Keel,
            points: vec![Point::new(4.0, 4.0); 3],
            confidence: 0.6,
            metadata: Metadata::new(),
        };
        let e = estimate_dimensions(&[f], ConversionMode::General);
        assert_eq!(e, DimensionEstimate::unknown());
    }

    #[test]
    fn tier_tables_ascend_and_end_unbounded() {
        for mode in [
            ConversionMode::Yacht,
            ConversionMode::Interior,
            ConversionMode::General,
        ] {
            let tiers = mode.tiers();
            assert!(tiers.windows(2).all(|w| w[0].below < w[1].below));
            assert!(tiers.last().unwrap().below.is_infinite());
        }
    }
}
