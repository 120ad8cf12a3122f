//! photocad-export: Pure CAD serializers (sans-IO)
//!
//! Renders labeled features, the size estimate and reference points as
//! DXF, SVG or JSON text. Every writer returns a `String`; persistence
//! is the caller's business.
//!
//! Only JSON is lossless. DXF and SVG drop per-feature confidence and
//! metadata.

pub mod dxf;
pub mod json;
pub mod svg;

use photocad_pipeline::{
    DimensionEstimate, Dimensions, Feature, OutputFormat, ProcessResult, ReferencePoint, Scale,
};

pub use dxf::to_dxf;
pub use json::{CadDocument, DocumentMetadata, parse, to_json};
pub use svg::to_svg;

/// Generator tag written into JSON documents.
pub const GENERATOR: &str = "photocad";

/// Errors from the JSON writer and reader.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The document could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The export timestamp could not be formatted.
    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Everything a serializer draws.
#[derive(Debug, Clone, Copy)]
pub struct Drawing<'a> {
    /// Labeled features in pixel coordinates.
    pub features: &'a [Feature],
    /// Size estimate for the dimension annotations.
    pub estimate: &'a DimensionEstimate,
    /// User markers in pixel coordinates.
    pub reference_points: &'a [ReferencePoint],
    /// Pixels per metre; uncalibrated leaves coordinates in pixels.
    pub scale: Scale,
    /// Canvas size in pixels.
    pub canvas: Dimensions,
}

impl<'a> Drawing<'a> {
    /// Draw a pipeline result.
    #[must_use]
    pub fn new(
        result: &'a ProcessResult,
        scale: Scale,
        reference_points: &'a [ReferencePoint],
    ) -> Self {
        Self {
            features: &result.features,
            estimate: &result.estimate,
            reference_points,
            scale,
            canvas: result.dimensions,
        }
    }
}

/// Document-level details that are not part of the drawing itself.
///
/// Only the JSON writer reads these.
#[derive(Debug, Clone, Default)]
pub struct ExportContext<'a> {
    /// RFC 3339 timestamp to embed. `None` stamps the current UTC time.
    pub timestamp: Option<&'a str>,
    /// Size of the original photograph when the processed canvas was
    /// derived from a larger image.
    pub original: Option<Dimensions>,
}

/// Render `drawing` in `format`.
///
/// # Errors
///
/// Only the JSON path can fail; see [`to_json`].
pub fn serialize(
    format: OutputFormat,
    drawing: &Drawing<'_>,
    context: &ExportContext<'_>,
) -> Result<String, ExportError> {
    log::debug!(
        "serializing {} features as {format} ({})",
        drawing.features.len(),
        drawing.scale.unit_label(),
    );
    match format {
        OutputFormat::Dxf => Ok(to_dxf(drawing)),
        OutputFormat::Svg => Ok(to_svg(drawing)),
        OutputFormat::Json => to_json(drawing, context),
    }
}

/// Round to 3 decimal places.
#[must_use]
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
