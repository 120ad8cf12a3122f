//! SVG export serializer.
//!
//! Builds the document with the [`svg`] crate. The root is sized to the
//! canvas in pixels and geometry stays in pixel space regardless of the
//! scale; SVG is a preview format.
//!
//! - [`FeatureKind::is_polyline`] kinds become one `<path>` through every
//!   point.
//! - Every other kind becomes one `<line>` from first to last point.
//!
//! Both carry the kind's CSS class (`hull-profile`, `waterline`, ...),
//! styled by an embedded `<style>` block. A text overlay reports the
//! size estimate, one `<text>` per row at fixed y offsets.
//!
//! [`FeatureKind::is_polyline`]: photocad_pipeline::FeatureKind::is_polyline

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Element, Line, Path};
use svg::node::{Node, Text, Value};

use photocad_pipeline::{DimensionEstimate, Feature, FeatureKind, Point};

use crate::Drawing;

/// Y offsets of the overlay rows.
pub const OVERLAY_ROWS: [u32; 5] = [25, 45, 65, 85, 105];

/// X offset of the overlay.
const OVERLAY_X: u32 = 10;

/// Stroke colour per kind.
const fn stroke(kind: FeatureKind) -> &'static str {
    match kind {
        FeatureKind::HullProfile => "#1f4e79",
        FeatureKind::Waterline => "#2e86c1",
        FeatureKind::Mast => "#7d3c98",
        FeatureKind::DeckEdge => "#b9770e",
        FeatureKind::Cabin => "#1e8449",
        FeatureKind::Keel => "#922b21",
    }
}

fn stylesheet() -> String {
    FeatureKind::ALL
        .iter()
        .map(|&k| {
            format!(
                ".{} {{ fill: none; stroke: {}; stroke-width: 2; }}",
                k.css_class(),
                stroke(k)
            )
        })
        .chain(std::iter::once(
            ".overlay { font-family: sans-serif; font-size: 14px; fill: #222; }".to_owned(),
        ))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build an SVG path `d` attribute through every point.
///
/// Returns an empty string for fewer than 2 points.
#[must_use]
pub fn build_path_data(points: &[Point]) -> String {
    let [first, rest @ ..] = points else {
        return String::new();
    };
    if rest.is_empty() {
        return String::new();
    }
    let mut data = Data::new().move_to((first.x, first.y));
    for p in rest {
        data = data.line_to((p.x, p.y));
    }
    String::from(Value::from(data))
}

/// Serialize a drawing into an SVG string.
///
/// Never fails; an empty feature list still yields a valid document
/// with the overlay.
#[must_use]
pub fn to_svg(drawing: &Drawing<'_>) -> String {
    let w = drawing.canvas.width;
    let h = drawing.canvas.height;
    let mut style = Element::new("style");
    style.append(Text::new(stylesheet()));

    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h))
        .add(style);

    for feature in drawing.features {
        if let Some(node) = feature_node(feature) {
            doc = doc.add(node);
        }
    }

    doc = doc.add(overlay(drawing.estimate));

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

fn feature_node(feature: &Feature) -> Option<Box<dyn Node>> {
    let class = feature.kind.css_class();
    if feature.kind.is_polyline() && feature.points.len() >= 2 {
        let path = Path::new()
            .set("class", class)
            .set("d", build_path_data(&feature.points));
        return Some(Box::new(path));
    }
    let (first, last) = (feature.first()?, feature.last()?);
    let line = Line::new()
        .set("class", class)
        .set("x1", first.x)
        .set("y1", first.y)
        .set("x2", last.x)
        .set("y2", last.y);
    Some(Box::new(line))
}

/// Overlay rows for the estimate. Lengths are shown in centimetres.
#[must_use]
pub fn overlay_lines(estimate: &DimensionEstimate) -> [String; 5] {
    [
        format!("Type: {}", estimate.kind),
        format!("Width: {:.0} cm", estimate.width * 100.0),
        format!("Height: {:.0} cm", estimate.height * 100.0),
        format!("Depth: {:.0} cm", estimate.depth * 100.0),
        format!("Confidence: {:.0}%", estimate.confidence * 100.0),
    ]
}

fn overlay(estimate: &DimensionEstimate) -> Element {
    let mut group = Element::new("g");
    group.assign("class", "overlay");
    for (y, line) in OVERLAY_ROWS.into_iter().zip(overlay_lines(estimate)) {
        let mut text = Element::new("text");
        text.assign("x", OVERLAY_X);
        text.assign("y", y);
        text.append(Text::new(line));
        group.append(text);
    }
    group
}

#[cfg(test)]
mod tests {
    use photocad_pipeline::{Dimensions, Metadata, Scale};

    use super::*;

    fn feature(kind: FeatureKind, points: &[(f64, f64)]) -> Feature {
        Feature {
            kind,
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            confidence: 0.8,
            metadata: Metadata::new(),
        }
    }

    fn render(features: &[Feature], estimate: &DimensionEstimate, scale: Scale) -> String {
        to_svg(&Drawing {
            features,
            estimate,
            reference_points: &[],
            scale,
            canvas: Dimensions {
                width: 320,
                height: 240,
            },
        })
    }

    #[test]
    fn empty_drawing_is_valid_svg() {
        let svg = render(&[], &DimensionEstimate::unknown(), Scale::UNCALIBRATED);
        assert!(svg.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<svg"));
        assert!(svg.contains("width=\"320\""));
        assert!(svg.contains("height=\"240\""));
        assert!(svg.contains("viewBox=\"0 0 320 240\""));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(!svg.contains("<path"));
        assert!(!svg.contains("<line"));
    }

    #[test]
    fn polyline_kinds_become_paths_others_lines() {
        let hull = feature(
            FeatureKind::HullProfile,
            &[(10.0, 20.0), (30.0, 40.0), (50.0, 20.0)],
        );
        let mast = feature(
            FeatureKind::Mast,
            &[(100.0, 10.0), (101.0, 60.0), (100.0, 200.0)],
        );
        let svg = render(&[hull, mast], &DimensionEstimate::unknown(), Scale::UNCALIBRATED);
        assert_eq!(svg.matches("<path").count(), 1);
        assert!(svg.contains("class=\"hull-profile\""));
        assert!(svg.contains("d=\"M10,20 L30,40 L50,20\""));
        assert_eq!(svg.matches("<line").count(), 1);
        assert!(svg.contains("class=\"mast\""));
        assert!(svg.contains("y2=\"200\""));
        assert!(!svg.contains("y2=\"60\""));
    }

    #[test]
    fn geometry_stays_in_pixels_when_calibrated() {
        let mast = feature(FeatureKind::Mast, &[(100.0, 10.0), (100.0, 200.0)]);
        let svg = render(
            &[mast],
            &DimensionEstimate::unknown(),
            Scale::from_pixels_per_meter(1000.0),
        );
        assert!(svg.contains("x1=\"100\""));
        assert!(svg.contains("y2=\"200\""));
    }

    #[test]
    fn single_point_polyline_kind_falls_back_to_line() {
        let deck = feature(FeatureKind::DeckEdge, &[(5.0, 6.0)]);
        let svg = render(&[deck], &DimensionEstimate::unknown(), Scale::UNCALIBRATED);
        assert!(!svg.contains("<path"));
        assert!(svg.contains("class=\"deck-edge\""));
        assert!(svg.contains("x2=\"5\""));
    }

    #[test]
    fn overlay_reports_estimate_in_centimetres() {
        let estimate = DimensionEstimate {
            width: 0.8,
            height: 0.6,
            depth: 0.4,
            kind: "Cabinet/Panel".to_string(),
            confidence: 0.7,
        };
        let svg = render(&[], &estimate, Scale::UNCALIBRATED);
        for y in OVERLAY_ROWS {
            assert!(svg.contains(&format!("y=\"{y}\"")), "missing row {y}");
        }
        assert!(svg.contains("Type: Cabinet/Panel"));
        assert!(svg.contains("Width: 80 cm"));
        assert!(svg.contains("Height: 60 cm"));
        assert!(svg.contains("Depth: 40 cm"));
        assert!(svg.contains("Confidence: 70%"));
    }

    #[test]
    fn build_path_data_needs_two_points() {
        assert_eq!(build_path_data(&[]), "");
        assert_eq!(build_path_data(&[Point::new(1.0, 1.0)]), "");
        assert_eq!(
            build_path_data(&[Point::new(1.0, 2.0), Point::new(3.0, 4.0)]),
            "M1,2 L3,4"
        );
    }

    #[test]
    fn overlay_text_is_escaped() {
        let estimate = DimensionEstimate {
            kind: "Small Yacht (< 30ft)".to_string(),
            ..DimensionEstimate::unknown()
        };
        let svg = render(&[], &estimate, Scale::UNCALIBRATED);
        assert!(svg.contains("Type: Small Yacht (&lt; 30ft)"));
    }
}
