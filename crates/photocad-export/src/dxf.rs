//! DXF export serializer.
//!
//! Writes a minimal ENTITIES-only drawing-exchange file: group code and
//! value on alternating lines, wrapped in
//! `0/SECTION/2/ENTITIES ... 0/ENDSEC/0/EOF`.
//!
//! - [`FeatureKind::is_polyline`] kinds become a closed `POLYLINE` with
//!   one `VERTEX` per point, terminated by `SEQEND`.
//! - Every other kind becomes a single `LINE` from first to last point.
//! - A feature with one point degrades to a zero-length `LINE`; a
//!   feature with no points is skipped.
//!
//! Each entity sits on a layer named after its kind (`HULL_PROFILE`,
//! ...). Coordinates are divided by the scale divisor and written with
//! exactly 3 decimals. Image Y (downward) is written as-is.
//!
//! Two `TEXT` entities on the `DIMENSIONS` layer close the section:
//! the estimated size class, then its confidence.

use std::fmt::Write;

use photocad_pipeline::{DimensionEstimate, Feature, Point};

use crate::Drawing;

/// Layer for the trailing estimate annotations.
pub const DIMENSIONS_LAYER: &str = "DIMENSIONS";

/// Annotation text height, in pixels before scaling.
const TEXT_HEIGHT_PX: f64 = 10.0;

/// Serialize a drawing into DXF text.
///
/// Never fails; an empty feature list still yields a valid, empty
/// ENTITIES section plus the two annotations.
#[must_use]
pub fn to_dxf(drawing: &Drawing<'_>) -> String {
    let divisor = drawing.scale.divisor();
    let mut out = String::new();

    pair(&mut out, 0, "SECTION");
    pair(&mut out, 2, "ENTITIES");

    for feature in drawing.features {
        write_feature(&mut out, feature, divisor);
    }
    write_annotations(&mut out, drawing.estimate, divisor);

    pair(&mut out, 0, "ENDSEC");
    pair(&mut out, 0, "EOF");
    out
}

fn write_feature(out: &mut String, feature: &Feature, divisor: f64) {
    let layer = feature.kind.layer_name();
    match feature.points.as_slice() {
        [] => {
            log::debug!("skipping {} feature with no points", feature.kind);
        }
        points @ [_, _, ..] if feature.kind.is_polyline() => {
            pair(out, 0, "POLYLINE");
            pair(out, 8, layer);
            pair(out, 66, 1);
            pair(out, 70, 1);
            for p in points {
                pair(out, 0, "VERTEX");
                pair(out, 8, layer);
                coordinate(out, 10, p.x / divisor);
                coordinate(out, 20, p.y / divisor);
            }
            pair(out, 0, "SEQEND");
        }
        [only] => write_line(out, layer, *only, *only, divisor),
        [first, .., last] => write_line(out, layer, *first, *last, divisor),
    }
}

fn write_line(out: &mut String, layer: &str, a: Point, b: Point, divisor: f64) {
    pair(out, 0, "LINE");
    pair(out, 8, layer);
    coordinate(out, 10, a.x / divisor);
    coordinate(out, 20, a.y / divisor);
    coordinate(out, 11, b.x / divisor);
    coordinate(out, 21, b.y / divisor);
}

fn write_annotations(out: &mut String, estimate: &DimensionEstimate, divisor: f64) {
    let height = TEXT_HEIGHT_PX / divisor;
    let lines = [
        format!(
            "Estimated Size: {} ({:.2}m x {:.2}m x {:.2}m)",
            estimate.kind, estimate.width, estimate.height, estimate.depth,
        ),
        format!("Confidence: {:.0}%", estimate.confidence * 100.0),
    ];
    for (row, text) in (2u8..).zip(lines) {
        pair(out, 0, "TEXT");
        pair(out, 8, DIMENSIONS_LAYER);
        coordinate(out, 10, 0.0);
        coordinate(out, 20, -height * f64::from(row));
        coordinate(out, 40, height);
        pair(out, 1, text);
    }
}

/// One group code / value pair.
fn pair(out: &mut String, code: u16, value: impl std::fmt::Display) {
    let _ = writeln!(out, "{code}\n{value}");
}

/// A coordinate pair with the fixed 3-decimal format.
fn coordinate(out: &mut String, code: u16, value: f64) {
    let _ = writeln!(out, "{code}\n{value:.3}");
}

#[cfg(test)]
mod tests {
    use photocad_pipeline::{Dimensions, FeatureKind, Metadata, Scale};

    use super::*;

    fn feature(kind: FeatureKind, points: &[(f64, f64)]) -> Feature {
        Feature {
            kind,
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            confidence: 0.8,
            metadata: Metadata::new(),
        }
    }

    fn render(features: &[Feature], scale: Scale) -> String {
        let estimate = DimensionEstimate::unknown();
        to_dxf(&Drawing {
            features,
            estimate: &estimate,
            reference_points: &[],
            scale,
            canvas: Dimensions {
                width: 200,
                height: 100,
            },
        })
    }

    #[test]
    fn empty_drawing_is_a_valid_envelope() {
        let dxf = render(&[], Scale::UNCALIBRATED);
        assert!(dxf.starts_with("0\nSECTION\n2\nENTITIES\n"));
        assert!(dxf.ends_with("0\nENDSEC\n0\nEOF\n"));
        assert_eq!(dxf.matches("\nTEXT\n").count(), 2);
        assert!(!dxf.contains("POLYLINE"));
        // Every value sits on its own line, after its group code.
        assert_eq!(dxf.lines().count() % 2, 0);
    }

    #[test]
    fn non_polyline_kinds_become_endpoint_lines() {
        let f = feature(
            FeatureKind::Waterline,
            &[(10.0, 80.0), (50.0, 81.0), (90.5, 80.25)],
        );
        let dxf = render(&[f], Scale::UNCALIBRATED);
        assert!(dxf.contains(
            "0\nLINE\n8\nWATERLINE\n10\n10.000\n20\n80.000\n11\n90.500\n21\n80.250\n"
        ));
        assert!(!dxf.contains("50.000"));
    }

    #[test]
    fn polyline_kinds_become_closed_polylines() {
        let f = feature(
            FeatureKind::HullProfile,
            &[(0.0, 0.0), (10.0, 5.0), (20.0, 0.0)],
        );
        let dxf = render(&[f], Scale::UNCALIBRATED);
        assert!(dxf.contains("0\nPOLYLINE\n8\nHULL_PROFILE\n66\n1\n70\n1\n"));
        assert_eq!(dxf.matches("\nVERTEX\n").count(), 3);
        assert!(dxf.contains("0\nVERTEX\n8\nHULL_PROFILE\n10\n10.000\n20\n5.000\n"));
        assert!(dxf.contains("0\nSEQEND\n"));
    }

    #[test]
    fn coordinates_are_divided_by_scale() {
        let f = feature(FeatureKind::Mast, &[(100.0, 0.0), (100.0, 250.0)]);
        let dxf = render(&[f], Scale::from_pixels_per_meter(1000.0));
        assert!(dxf.contains("10\n0.100\n20\n0.000\n11\n0.100\n21\n0.250\n"));
    }

    #[test]
    fn single_point_features_degrade_to_zero_length_lines() {
        let deck = feature(FeatureKind::DeckEdge, &[(3.0, 4.0)]);
        let keel = feature(FeatureKind::Keel, &[(7.0, 8.0)]);
        let dxf = render(&[deck, keel], Scale::UNCALIBRATED);
        assert!(dxf.contains("8\nDECK_EDGE\n10\n3.000\n20\n4.000\n11\n3.000\n21\n4.000\n"));
        assert!(dxf.contains("8\nKEEL\n10\n7.000\n20\n8.000\n11\n7.000\n21\n8.000\n"));
        assert!(!dxf.contains("POLYLINE"));
    }

    #[test]
    fn empty_features_are_skipped() {
        let f = feature(FeatureKind::Cabin, &[]);
        let dxf = render(&[f], Scale::UNCALIBRATED);
        assert!(!dxf.contains("CABIN"));
    }

    #[test]
    fn annotations_report_estimate() {
        let estimate = DimensionEstimate {
            width: 9.0,
            height: 12.0,
            depth: 3.2,
            kind: "Small Yacht (< 30ft)".to_string(),
            confidence: 0.85,
        };
        let dxf = to_dxf(&Drawing {
            features: &[],
            estimate: &estimate,
            reference_points: &[],
            scale: Scale::UNCALIBRATED,
            canvas: Dimensions {
                width: 10,
                height: 10,
            },
        });
        assert!(dxf.contains("8\nDIMENSIONS\n"));
        assert!(dxf.contains("1\nEstimated Size: Small Yacht (< 30ft) (9.00m x 12.00m x 3.20m)\n"));
        assert!(dxf.contains("1\nConfidence: 85%\n"));
    }
}
