//! photocad-pipeline: photograph to labeled geometry (sans-IO).
//!
//! Turns a raster photograph into labeled polylines through:
//! grayscale -> edge detection -> line tracing -> point ordering ->
//! classification -> dimension estimation.
//!
//! This crate has **no I/O dependencies**. It operates on in-memory
//! pixel buffers and returns structured data. Rendering the result as
//! DXF, SVG or JSON lives in `photocad-export`.

pub mod calibrate;
pub mod classify;
pub mod diagnostics;
pub mod edge;
pub mod estimate;
pub mod feature;
pub mod grayscale;
pub mod order;
pub mod raster;
pub mod reference;
pub mod trace;
pub mod types;

use web_time::Instant;

pub use calibrate::{CalibrationError, Calibrator, LengthUnit, calibrate, scale_between};
pub use classify::{ConversionMode, classify};
pub use diagnostics::PipelineDiagnostics;
pub use edge::{EdgeMethod, detect_edges};
pub use estimate::estimate_dimensions;
pub use feature::{DimensionEstimate, Feature, FeatureKind, MetaValue, Metadata, RawTrace};
pub use grayscale::grayscale;
pub use order::{PointOrder, TraceOrdering};
pub use raster::{decode, pixel_buffer_from_raw};
pub use reference::{ReferencePoint, ReferenceSet};
pub use trace::trace_lines;
pub use types::{
    Dimensions, OutputFormat, PipelineError, PixelBuffer, Point, ProcessResult,
    ProcessingSettings, Scale, StagedResult,
};

use diagnostics::{StageDiagnostics, StageMetrics};

/// Run the full pipeline over a pixel buffer.
///
/// # Pipeline steps
///
/// 1. Grayscale reduction
/// 2. Edge detection (Sobel, Laplacian, or Canny as a Sobel alias)
/// 3. Line tracing with the `min_line_length` filter
/// 4. Point ordering (discovery order unless opted out)
/// 5. Classification by conversion mode
/// 6. Dimension estimation from the dominant feature
///
/// An image with no edges is not an error: the result simply has no
/// features and an `"unknown"` estimate.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `settings` fail
/// [`ProcessingSettings::validate`].
pub fn process(
    image: &PixelBuffer,
    settings: &ProcessingSettings,
) -> Result<ProcessResult, PipelineError> {
    run_stages(image, settings).map(StageRun::into_result)
}

/// Decode image bytes and run the full pipeline.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty,
/// [`PipelineError::ImageDecode`] if the format is unrecognized, and
/// [`PipelineError::InvalidConfig`] for unusable settings.
pub fn process_bytes(
    image_bytes: &[u8],
    settings: &ProcessingSettings,
) -> Result<ProcessResult, PipelineError> {
    settings.validate()?;
    let image = raster::decode(image_bytes)?;
    process(&image, settings)
}

/// Run the pipeline and keep every intermediate.
///
/// Produces the same features and estimate as [`process`].
///
/// # Errors
///
/// Same as [`process`].
pub fn process_staged(
    image: &PixelBuffer,
    settings: &ProcessingSettings,
) -> Result<StagedResult, PipelineError> {
    let run = run_stages(image, settings)?;
    Ok(StagedResult {
        original: image.clone(),
        grayscale: run.grayscale,
        edges: run.edges,
        traces: run.traces,
        features: run.features,
        estimate: run.estimate,
        dimensions: run.dimensions,
    })
}

/// Run the pipeline, timing and counting every stage.
///
/// # Errors
///
/// Same as [`process`].
pub fn process_with_diagnostics(
    image: &PixelBuffer,
    settings: &ProcessingSettings,
) -> Result<(ProcessResult, PipelineDiagnostics), PipelineError> {
    let StageRun {
        features,
        estimate,
        dimensions,
        diagnostics,
        ..
    } = run_stages(image, settings)?;
    Ok((
        ProcessResult {
            features,
            estimate,
            dimensions,
        },
        diagnostics,
    ))
}

/// Every stage output of one run, plus its diagnostics.
struct StageRun {
    grayscale: PixelBuffer,
    edges: PixelBuffer,
    traces: Vec<RawTrace>,
    features: Vec<Feature>,
    estimate: DimensionEstimate,
    dimensions: Dimensions,
    diagnostics: PipelineDiagnostics,
}

impl StageRun {
    fn into_result(self) -> ProcessResult {
        ProcessResult {
            features: self.features,
            estimate: self.estimate,
            dimensions: self.dimensions,
        }
    }
}

/// The single stage chain behind every `process*` entry point.
fn run_stages(
    image: &PixelBuffer,
    settings: &ProcessingSettings,
) -> Result<StageRun, PipelineError> {
    settings.validate()?;
    let dimensions = Dimensions::of(image);
    warn_if_empty(dimensions);
    let total_start = Instant::now();

    // 1. Grayscale.
    let t = Instant::now();
    let gray = grayscale::grayscale(image);
    let grayscale_diag = StageDiagnostics {
        duration: t.elapsed(),
        metrics: StageMetrics::Grayscale {
            width: dimensions.width,
            height: dimensions.height,
        },
    };

    // 2. Edge detection.
    let t = Instant::now();
    let edges = edge::detect_edges(&gray, settings.edge_method, settings.threshold);
    let edge_diag = StageDiagnostics {
        duration: t.elapsed(),
        metrics: StageMetrics::EdgeDetection {
            method: settings.edge_method.to_string(),
            threshold: settings.threshold,
            edge_pixel_count: edge::count_edge_pixels(&edges),
            total_pixel_count: dimensions.pixel_count(),
        },
    };

    // 3. Line tracing.
    let t = Instant::now();
    let traces = trace::trace_lines(&edges, settings.min_line_length);
    let stats = diagnostics::trace_stats(&traces);
    let trace_diag = StageDiagnostics {
        duration: t.elapsed(),
        metrics: StageMetrics::LineTracing {
            trace_count: traces.len(),
            total_point_count: stats.total,
            min_trace_points: stats.min,
            max_trace_points: stats.max,
            mean_trace_points: stats.mean,
            min_line_length: settings.min_line_length,
        },
    };

    // 4. Point ordering.
    let t = Instant::now();
    let traces = order_traces(traces, settings.point_order);
    let order_diag = StageDiagnostics {
        duration: t.elapsed(),
        metrics: StageMetrics::Ordering {
            strategy: settings.point_order.to_string(),
            trace_count: traces.len(),
        },
    };

    // 5. Classification.
    let t = Instant::now();
    let features = classify::classify(&traces, dimensions, settings.conversion_mode);
    let classify_diag = StageDiagnostics {
        duration: t.elapsed(),
        metrics: StageMetrics::Classification {
            mode: settings.conversion_mode.to_string(),
            input_trace_count: traces.len(),
            feature_count: features.len(),
            dropped_count: traces.len() - features.len(),
            histogram: diagnostics::kind_histogram(&features),
        },
    };

    // 6. Estimation.
    let t = Instant::now();
    let estimate = estimate::estimate_dimensions(&features, settings.conversion_mode);
    let estimate_diag = StageDiagnostics {
        duration: t.elapsed(),
        metrics: StageMetrics::Estimation {
            kind: estimate.kind.clone(),
            confidence: estimate.confidence,
        },
    };

    let diagnostics = PipelineDiagnostics {
        grayscale: grayscale_diag,
        edge_detection: edge_diag,
        line_tracing: trace_diag,
        ordering: order_diag,
        classification: classify_diag,
        estimation: estimate_diag,
        total_duration: total_start.elapsed(),
        summary: diagnostics::PipelineSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            trace_count: traces.len(),
            feature_count: features.len(),
        },
    };

    Ok(StageRun {
        grayscale: gray,
        edges,
        traces,
        features,
        estimate,
        dimensions,
        diagnostics,
    })
}

fn order_traces(traces: Vec<RawTrace>, order: PointOrder) -> Vec<RawTrace> {
    traces.into_iter().map(|t| order.order(t)).collect()
}

fn warn_if_empty(dimensions: Dimensions) {
    if dimensions.pixel_count() == 0 {
        log::warn!(
            "processing an empty {}x{} image",
            dimensions.width,
            dimensions.height
        );
    }
}
