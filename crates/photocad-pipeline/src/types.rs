//! Shared types for the photocad pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::classify::ConversionMode;
use crate::edge::EdgeMethod;
use crate::feature::{DimensionEstimate, Feature, RawTrace};
use crate::order::PointOrder;

/// Re-export `RgbaImage` as the pipeline's pixel buffer so downstream
/// crates can hand buffers in without depending on `image` directly.
///
/// Every stage that produces a raster (grayscale, edge mask) keeps the
/// 4-channel layout: intensity in R, G and B, 255 in alpha.
pub type PixelBuffer = image::RgbaImage;

/// A 2D point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an existing pixel buffer.
    #[must_use]
    pub fn of(buffer: &PixelBuffer) -> Self {
        Self {
            width: buffer.width(),
            height: buffer.height(),
        }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Pixels-per-metre conversion factor.
///
/// A zero, negative or non-finite value means "uncalibrated": distances
/// pass through unchanged and are labelled as pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scale(f64);

impl Scale {
    /// The unset scale. Coordinates stay in pixels.
    pub const UNCALIBRATED: Self = Self(0.0);

    /// Wrap a raw pixels-per-metre value.
    #[must_use]
    pub const fn from_pixels_per_meter(pixels_per_meter: f64) -> Self {
        Self(pixels_per_meter)
    }

    /// The raw pixels-per-metre value as supplied.
    #[must_use]
    pub const fn pixels_per_meter(self) -> f64 {
        self.0
    }

    /// Whether this scale maps pixels to real-world units.
    #[must_use]
    pub fn is_calibrated(self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }

    /// The value every pixel coordinate is divided by on export.
    #[must_use]
    pub fn divisor(self) -> f64 {
        if self.is_calibrated() { self.0 } else { 1.0 }
    }

    /// Unit label written next to converted coordinates.
    #[must_use]
    pub fn unit_label(self) -> &'static str {
        if self.is_calibrated() {
            "meters"
        } else {
            "pixels"
        }
    }

    /// Convert a pixel distance or coordinate into scale units.
    #[must_use]
    pub fn to_units(self, pixels: f64) -> f64 {
        pixels / self.divisor()
    }
}

/// Which serializer renders the final drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Drawing-exchange text (`0/SECTION/2/ENTITIES ... 0/EOF`).
    Dxf,
    /// Scalable vector markup.
    Svg,
    /// Structured data text; the only lossless format.
    #[default]
    Json,
}

impl OutputFormat {
    /// Conventional file extension, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Dxf => "dxf",
            Self::Svg => "svg",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dxf" => Ok(Self::Dxf),
            "svg" => Ok(Self::Svg),
            "json" => Ok(Self::Json),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown output format {other:?} (expected dxf, svg or json)"
            ))),
        }
    }
}

/// Configuration for one pipeline run.
///
/// Supplied wholesale by the caller before each run and never mutated
/// while the run is in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessingSettings {
    /// Edge operator applied to the grayscale image.
    pub edge_method: EdgeMethod,

    /// Raw gradient magnitude an edge pixel must exceed. Not normalized;
    /// 50 to 200 is the usable range for 8-bit photographs.
    pub threshold: f64,

    /// Pixels per metre. Zero leaves the drawing in pixel units.
    pub scale: Scale,

    /// Which serializer renders the drawing.
    pub output_format: OutputFormat,

    /// Which label table the classifier and estimator use.
    pub conversion_mode: ConversionMode,

    /// Traces with fewer points than this are discarded by the tracer.
    pub min_line_length: usize,

    /// Point order within each trace. Discovery order is the default;
    /// nearest-neighbor re-chaining is opt-in.
    pub point_order: PointOrder,
}

impl ProcessingSettings {
    /// Default edge threshold.
    pub const DEFAULT_THRESHOLD: f64 = 100.0;

    /// Default minimum trace length in points.
    pub const DEFAULT_MIN_LINE_LENGTH: usize = 10;

    /// Check numeric fields for values no run could use.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when the threshold is
    /// negative or non-finite, or when the scale is negative or
    /// non-finite. A zero scale is valid and means "uncalibrated".
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "threshold must be a finite non-negative number, got {}",
                self.threshold
            )));
        }
        let scale = self.scale.pixels_per_meter();
        if !scale.is_finite() || scale < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "scale must be a finite non-negative number, got {scale}"
            )));
        }
        Ok(())
    }
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            edge_method: EdgeMethod::default(),
            threshold: Self::DEFAULT_THRESHOLD,
            scale: Scale::UNCALIBRATED,
            output_format: OutputFormat::default(),
            conversion_mode: ConversionMode::default(),
            min_line_length: Self::DEFAULT_MIN_LINE_LENGTH,
            point_order: PointOrder::default(),
        }
    }
}

/// Result of running the full pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Labeled features, in tracer discovery order.
    pub features: Vec<Feature>,

    /// Coarse size estimate derived from the dominant feature.
    pub estimate: DimensionEstimate,

    /// Dimensions of the processed buffer in pixels.
    ///
    /// Serializers use this as the canvas size (e.g. SVG `width`).
    pub dimensions: Dimensions,
}

/// Result of running the pipeline with every intermediate kept.
///
/// Does not derive `PartialEq` or serde; raster intermediates are
/// compared by their raw bytes in tests.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Stage 0: the caller's buffer, copied.
    pub original: PixelBuffer,
    /// Stage 1: grayscale reduction.
    pub grayscale: PixelBuffer,
    /// Stage 2: binary edge mask.
    pub edges: PixelBuffer,
    /// Stage 3: raw traces that passed `min_line_length`.
    pub traces: Vec<RawTrace>,
    /// Stage 4: labeled features.
    pub features: Vec<Feature>,
    /// Stage 5: size estimate.
    pub estimate: DimensionEstimate,
    /// Source dimensions in pixels.
    pub dimensions: Dimensions,
}

impl StagedResult {
    /// Drop the intermediates and keep what serializers need.
    #[must_use]
    pub fn into_result(self) -> ProcessResult {
        ProcessResult {
            features: self.features,
            estimate: self.estimate,
            dimensions: self.dimensions,
        }
    }
}

/// Errors that can occur during pipeline processing.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Raw pixel data does not match the stated dimensions.
    #[error("invalid pixel buffer: {0}")]
    InvalidBuffer(String),

    /// Settings are outside the range any run could use, or name an
    /// unknown method/format/mode.
    #[error("invalid processing settings: {0}")]
    InvalidConfig(String),
}

/// Serde-compatible proxy for `PipelineError`.
///
/// `image::ImageError` does not implement serde, so the `ImageDecode`
/// variant stores its `Display` string instead.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidBuffer(String),
    InvalidConfig(String),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidBuffer(s) => PipelineErrorProxy::InvalidBuffer(s.clone()),
            Self::InvalidConfig(s) => PipelineErrorProxy::InvalidConfig(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The typed image error cannot be rebuilt; keep its message.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::InvalidBuffer(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InvalidBuffer(s) => Self::InvalidBuffer(s),
            PipelineErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
        })
    }
}
