//! Pipeline diagnostics: timing and counts for each stage.
//!
//! Collected by [`process_with_diagnostics`](crate::process_with_diagnostics)
//! alongside the normal result. Intended for threshold tuning: the edge
//! density and trace statistics show quickly whether a threshold is too
//! loose or too strict for a given photograph.
//!
//! Timestamps are captured via the `web-time` crate, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native.
//! Durations are serialized as fractional seconds.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::feature::{Feature, RawTrace};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: grayscale reduction.
    pub grayscale: StageDiagnostics,
    /// Stage 2: edge detection.
    pub edge_detection: StageDiagnostics,
    /// Stage 3: line tracing.
    pub line_tracing: StageDiagnostics,
    /// Stage 3b: point ordering within traces.
    pub ordering: StageDiagnostics,
    /// Stage 4: classification.
    pub classification: StageDiagnostics,
    /// Stage 5: dimension estimation.
    pub estimation: StageDiagnostics,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Grayscale reduction.
    Grayscale {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
    /// Edge detection.
    EdgeDetection {
        /// Operator name.
        method: String,
        /// Raw magnitude threshold.
        threshold: f64,
        /// Pixels set to 255 in the mask.
        edge_pixel_count: u64,
        /// Total pixel count, for edge density.
        total_pixel_count: u64,
    },
    /// Line tracing.
    LineTracing {
        /// Traces kept.
        trace_count: usize,
        /// Points across all kept traces.
        total_point_count: usize,
        /// Fewest points in a kept trace.
        min_trace_points: usize,
        /// Most points in a kept trace.
        max_trace_points: usize,
        /// Mean points per kept trace.
        mean_trace_points: f64,
        /// The `min_line_length` filter in effect.
        min_line_length: usize,
    },
    /// Point ordering.
    Ordering {
        /// Strategy name.
        strategy: String,
        /// Traces reordered.
        trace_count: usize,
    },
    /// Classification.
    Classification {
        /// Label table in effect.
        mode: String,
        /// Traces offered to the classifier.
        input_trace_count: usize,
        /// Features produced.
        feature_count: usize,
        /// Traces dropped by the length filter.
        dropped_count: usize,
        /// Feature count per kind (wire name).
        histogram: BTreeMap<String, usize>,
    },
    /// Dimension estimation.
    Estimation {
        /// Size class chosen.
        kind: String,
        /// Confidence of the estimate.
        confidence: f64,
    },
}

/// High-level summary for the entire run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Traces found.
    pub trace_count: usize,
    /// Features produced.
    pub feature_count: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Grayscale", &self.grayscale),
            ("Edge Detection", &self.edge_detection),
            ("Line Tracing", &self.line_tracing),
            ("Point Ordering", &self.ordering),
            ("Classification", &self.classification),
            ("Estimation", &self.estimation),
        ];

        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Traces: {}  |  Features: {}",
            self.summary.trace_count, self.summary.feature_count,
        ));

        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Grayscale { width, height } => format!("{width}x{height}"),
        StageMetrics::EdgeDetection {
            method,
            threshold,
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("{method} t={threshold:.1} edges={edge_pixel_count} ({density:.1}%)")
        }
        StageMetrics::LineTracing {
            trace_count,
            total_point_count,
            min_trace_points,
            max_trace_points,
            mean_trace_points,
            min_line_length,
        } => format!(
            "{trace_count} traces >= {min_line_length}, {total_point_count} pts (min={min_trace_points} max={max_trace_points} mean={mean_trace_points:.1})",
        ),
        StageMetrics::Ordering {
            strategy,
            trace_count,
        } => format!("{strategy} over {trace_count} traces"),
        StageMetrics::Classification {
            mode,
            input_trace_count,
            feature_count,
            dropped_count,
            histogram,
        } => {
            let kinds: Vec<String> = histogram.iter().map(|(k, n)| format!("{k}={n}")).collect();
            format!(
                "{mode} {input_trace_count} -> {feature_count} ({dropped_count} dropped) [{}]",
                kinds.join(" "),
            )
        }
        StageMetrics::Estimation { kind, confidence } => {
            format!("{kind} ({:.0}%)", confidence * 100.0)
        }
    }
}

/// Statistics for a set of raw traces.
pub(crate) struct TraceStats {
    pub total: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

pub(crate) fn trace_stats(traces: &[RawTrace]) -> TraceStats {
    let total: usize = traces.iter().map(RawTrace::len).sum();
    let min = traces.iter().map(RawTrace::len).min().unwrap_or(0);
    let max = traces.iter().map(RawTrace::len).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let mean = if traces.is_empty() {
        0.0
    } else {
        total as f64 / traces.len() as f64
    };
    TraceStats {
        total,
        min,
        max,
        mean,
    }
}

/// Feature count per kind, keyed by wire name.
pub(crate) fn kind_histogram(features: &[Feature]) -> BTreeMap<String, usize> {
    let mut histogram = BTreeMap::new();
    for f in features {
        *histogram.entry(f.kind.as_str().to_owned()).or_insert(0) += 1;
    }
    histogram
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::feature::{FeatureKind, Metadata};
    use crate::types::Point;

    fn stage(ms: u64, metrics: StageMetrics) -> StageDiagnostics {
        StageDiagnostics {
            duration: Duration::from_millis(ms),
            metrics,
        }
    }

    fn sample() -> PipelineDiagnostics {
        PipelineDiagnostics {
            grayscale: stage(
                2,
                StageMetrics::Grayscale {
                    width: 100,
                    height: 100,
                },
            ),
            edge_detection: stage(
                8,
                StageMetrics::EdgeDetection {
                    method: "sobel".to_string(),
                    threshold: 100.0,
                    edge_pixel_count: 108,
                    total_pixel_count: 10_000,
                },
            ),
            line_tracing: stage(
                3,
                StageMetrics::LineTracing {
                    trace_count: 1,
                    total_point_count: 108,
                    min_trace_points: 108,
                    max_trace_points: 108,
                    mean_trace_points: 108.0,
                    min_line_length: 10,
                },
            ),
            ordering: stage(
                0,
                StageMetrics::Ordering {
                    strategy: "discovery".to_string(),
                    trace_count: 1,
                },
            ),
            classification: stage(
                1,
                StageMetrics::Classification {
                    mode: "yacht".to_string(),
                    input_trace_count: 1,
                    feature_count: 0,
                    dropped_count: 1,
                    histogram: BTreeMap::new(),
                },
            ),
            estimation: stage(
                0,
                StageMetrics::Estimation {
                    kind: "unknown".to_string(),
                    confidence: 0.0,
                },
            ),
            total_duration: Duration::from_millis(14),
            summary: PipelineSummary {
                image_width: 100,
                image_height: 100,
                pixel_count: 10_000,
                trace_count: 1,
                feature_count: 0,
            },
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn trace_stats_empty() {
        let stats = trace_stats(&[]);
        assert_eq!((stats.total, stats.min, stats.max), (0, 0, 0));
        assert!(stats.mean.abs() < f64::EPSILON);
    }

    #[test]
    fn trace_stats_computes() {
        let traces = vec![
            RawTrace::new(vec![Point::new(0.0, 0.0); 2]),
            RawTrace::new(vec![Point::new(0.0, 0.0); 4]),
        ];
        let stats = trace_stats(&traces);
        assert_eq!((stats.total, stats.min, stats.max), (6, 2, 4));
        assert!((stats.mean - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn histogram_counts_by_wire_name() {
        let f = |kind| Feature {
            kind,
            points: Vec::new(),
            confidence: 0.5,
            metadata: Metadata::new(),
        };
        let histogram = kind_histogram(&[
            f(FeatureKind::Mast),
            f(FeatureKind::DeckEdge),
            f(FeatureKind::Mast),
        ]);
        assert_eq!(histogram.get("mast"), Some(&2));
        assert_eq!(histogram.get("deck_edge"), Some(&1));
        assert_eq!(histogram.len(), 2);
    }

    #[test]
    fn report_lists_every_stage() {
        let report = sample().report();
        assert!(report.contains("Pipeline Diagnostics Report"));
        for name in [
            "Grayscale",
            "Edge Detection",
            "Line Tracing",
            "Point Ordering",
            "Classification",
            "Estimation",
        ] {
            assert!(report.contains(name), "missing {name}");
        }
        assert!(report.contains("edges=108 (1.1%)"));
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!((json["total_duration"].as_f64().unwrap() - 0.014).abs() < 1e-9);
        let back: PipelineDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.summary.trace_count, 1);
    }
}
