//! JSON export serializer and reader.
//!
//! The only lossless format. A document has four members:
//!
//! - `metadata`: generator tag, scale divisor, unit string, RFC 3339
//!   timestamp, canvas size and optional original image size,
//! - `features`: kind, points in scale units rounded to 3 decimals,
//!   confidence and annotations,
//! - `referencePoints`: `id`, `x`, `y` in scale units,
//! - `estimate`: the size estimate.
//!
//! [`parse`] reads a document back and
//! [`CadDocument::features_in_pixels`] undoes the scale, so writing
//! the result again with the same scale reproduces the point arrays
//! byte for byte.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use photocad_pipeline::{DimensionEstimate, Feature, Point, ReferencePoint, Scale};

use crate::{Drawing, ExportContext, ExportError, GENERATOR, round3};

/// Document header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Always [`GENERATOR`] for documents written here.
    pub generator: String,
    /// Divisor applied to every coordinate (1 when uncalibrated).
    pub scale: f64,
    /// `"pixels"` or `"meters"`.
    pub units: String,
    /// RFC 3339 export time.
    pub timestamp: String,
    /// Canvas width in pixels.
    pub image_width: u32,
    /// Canvas height in pixels.
    pub image_height: u32,
    /// Original photograph width, when it differs from the canvas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_width: Option<u32>,
    /// Original photograph height, when it differs from the canvas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_height: Option<u32>,
}

/// A complete JSON drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CadDocument {
    /// Document header.
    pub metadata: DocumentMetadata,
    /// Features in scale units.
    pub features: Vec<Feature>,
    /// Reference points in scale units.
    #[serde(default)]
    pub reference_points: Vec<ReferencePoint>,
    /// Size estimate, in metres.
    pub estimate: DimensionEstimate,
}

impl CadDocument {
    /// Build a document from a drawing, converting to scale units.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Timestamp`] if the current time cannot be
    /// formatted (only when no timestamp override is given).
    pub fn from_drawing(
        drawing: &Drawing<'_>,
        context: &ExportContext<'_>,
    ) -> Result<Self, ExportError> {
        let divisor = drawing.scale.divisor();
        let timestamp = match context.timestamp {
            Some(ts) => ts.to_owned(),
            None => OffsetDateTime::now_utc().format(&Rfc3339)?,
        };

        Ok(Self {
            metadata: DocumentMetadata {
                generator: GENERATOR.to_owned(),
                scale: divisor,
                units: drawing.scale.unit_label().to_owned(),
                timestamp,
                image_width: drawing.canvas.width,
                image_height: drawing.canvas.height,
                original_width: context.original.map(|d| d.width),
                original_height: context.original.map(|d| d.height),
            },
            features: drawing
                .features
                .iter()
                .map(|f| {
                    let mut scaled = f.scaled(divisor);
                    for p in &mut scaled.points {
                        *p = Point::new(round3(p.x), round3(p.y));
                    }
                    scaled
                })
                .collect(),
            reference_points: drawing
                .reference_points
                .iter()
                .map(|r| ReferencePoint {
                    id: r.id,
                    point: to_units(r.point, divisor),
                })
                .collect(),
            estimate: drawing.estimate.clone(),
        })
    }

    /// The scale the document was written with.
    #[must_use]
    pub fn scale(&self) -> Scale {
        if self.metadata.units == "pixels" {
            Scale::UNCALIBRATED
        } else {
            Scale::from_pixels_per_meter(self.metadata.scale)
        }
    }

    fn multiplier(&self) -> f64 {
        let m = self.metadata.scale;
        if m.is_finite() && m > 0.0 { m } else { 1.0 }
    }

    /// Features converted back to pixel coordinates.
    #[must_use]
    pub fn features_in_pixels(&self) -> Vec<Feature> {
        let m = self.multiplier();
        self.features
            .iter()
            .map(|f| Feature {
                points: f.points.iter().map(|p| Point::new(p.x * m, p.y * m)).collect(),
                ..f.clone()
            })
            .collect()
    }

    /// Reference points converted back to pixel coordinates.
    #[must_use]
    pub fn reference_points_in_pixels(&self) -> Vec<ReferencePoint> {
        let m = self.multiplier();
        self.reference_points
            .iter()
            .map(|r| ReferencePoint {
                id: r.id,
                point: Point::new(r.point.x * m, r.point.y * m),
            })
            .collect()
    }
}

fn to_units(p: Point, divisor: f64) -> Point {
    Point::new(round3(p.x / divisor), round3(p.y / divisor))
}

/// Serialize a drawing into pretty-printed JSON.
///
/// # Errors
///
/// Returns [`ExportError::Timestamp`] if the current time cannot be
/// formatted, or [`ExportError::Json`] if encoding fails.
pub fn to_json(drawing: &Drawing<'_>, context: &ExportContext<'_>) -> Result<String, ExportError> {
    let doc = CadDocument::from_drawing(drawing, context)?;
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Read a document written by [`to_json`].
///
/// # Errors
///
/// Returns [`ExportError::Json`] for malformed input or unknown kinds.
pub fn parse(text: &str) -> Result<CadDocument, ExportError> {
    Ok(serde_json::from_str(text)?)
}
