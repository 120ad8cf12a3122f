//! photocad: turn a photograph into a labeled CAD drawing.
//!
//! Reads an image file, runs the pipeline, and writes DXF, SVG or JSON
//! to a file or stdout. Optionally prints per-stage diagnostics.
//!
//! # Usage
//!
//! ```text
//! photocad [OPTIONS] <IMAGE_PATH>
//! photocad boat.jpg --format dxf --calibrate 120,410,980,415,12m -o boat.dxf
//! ```
//!
//! Logging goes to stderr via `env_logger`; `RUST_LOG` overrides `-v`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use photocad_export::{Drawing, ExportContext};
use photocad_pipeline::{
    CalibrationError, ConversionMode, Dimensions, EdgeMethod, LengthUnit, OutputFormat, Point,
    PointOrder, ProcessingSettings, ReferenceSet, Scale, scale_between,
};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Convert a photograph into labeled polylines for CAD.
#[derive(Debug, Parser)]
#[command(name = "photocad", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Edge operator (canny, sobel, laplacian).
    #[arg(long, default_value_t = EdgeMethod::default())]
    edge_method: EdgeMethod,

    /// Raw gradient magnitude an edge pixel must exceed.
    #[arg(long, default_value_t = ProcessingSettings::DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Pixels per metre. 0 leaves the drawing in pixels.
    #[arg(long, default_value_t = 0.0)]
    scale: f64,

    /// Output format (dxf, svg, json).
    #[arg(long, default_value_t = OutputFormat::default())]
    format: OutputFormat,

    /// Label table (yacht, interior, general).
    #[arg(long, default_value_t = ConversionMode::default())]
    mode: ConversionMode,

    /// Traces with fewer points are discarded.
    #[arg(long, default_value_t = ProcessingSettings::DEFAULT_MIN_LINE_LENGTH)]
    min_line_length: usize,

    /// Point order within traces (discovery, nearest-neighbor).
    #[arg(long, default_value_t = PointOrder::default())]
    point_order: PointOrder,

    /// Full settings as a JSON string.
    ///
    /// When provided, the individual settings flags above are ignored.
    /// Missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Reference marker `X,Y` in pixels. Repeatable.
    #[arg(long = "reference", value_name = "X,Y", value_parser = parse_point)]
    references: Vec<Point>,

    /// Calibrate from two points and a known distance:
    /// `X1,Y1,X2,Y2,DIST[UNIT]` with UNIT one of mm, cm, m, in, ft
    /// (default m). Overrides `--scale`.
    #[arg(long, value_name = "X1,Y1,X2,Y2,DIST", value_parser = parse_calibration)]
    calibrate: Option<Calibration>,

    /// Original photograph size `WIDTHxHEIGHT`, recorded in JSON output.
    #[arg(long, value_name = "WxH", value_parser = parse_dimensions)]
    original_size: Option<Dimensions>,

    /// RFC 3339 timestamp for JSON output instead of the current time.
    #[arg(long, value_parser = parse_timestamp)]
    timestamp: Option<String>,

    /// Write the drawing here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the per-stage diagnostics report to stderr.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of the human-readable report.
    #[arg(long, requires = "diagnostics")]
    diagnostics_json: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// A parsed `--calibrate` argument.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Calibration {
    a: Point,
    b: Point,
    distance: f64,
    unit: LengthUnit,
}

impl Calibration {
    fn scale(self) -> Result<Scale, CalibrationError> {
        scale_between(self.a, self.b, self.distance, self.unit)
    }
}

fn parse_number(s: &str) -> Result<f64, String> {
    s.trim()
        .parse::<f64>()
        .map_err(|e| format!("{s:?} is not a number: {e}"))
}

fn parse_point(s: &str) -> Result<Point, String> {
    let parts: Vec<&str> = s.split(',').collect();
    let [x, y] = parts.as_slice() else {
        return Err(format!("expected X,Y, got {s:?}"));
    };
    Ok(Point::new(parse_number(x)?, parse_number(y)?))
}

fn parse_calibration(s: &str) -> Result<Calibration, String> {
    let parts: Vec<&str> = s.split(',').collect();
    let [x1, y1, x2, y2, dist] = parts.as_slice() else {
        return Err(format!("expected X1,Y1,X2,Y2,DIST[UNIT], got {s:?}"));
    };
    let dist = dist.trim();
    let value = dist.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let unit = &dist[value.len()..];
    let unit = if unit.is_empty() {
        LengthUnit::default()
    } else {
        unit.parse::<LengthUnit>().map_err(|e| e.to_string())?
    };
    Ok(Calibration {
        a: Point::new(parse_number(x1)?, parse_number(y1)?),
        b: Point::new(parse_number(x2)?, parse_number(y2)?),
        distance: parse_number(value)?,
        unit,
    })
}

fn parse_dimensions(s: &str) -> Result<Dimensions, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|e| format!("{v:?} is not a pixel count: {e}"))
    };
    Ok(Dimensions {
        width: parse(w)?,
        height: parse(h)?,
    })
}

fn parse_timestamp(s: &str) -> Result<String, String> {
    OffsetDateTime::parse(s, &Rfc3339)
        .map(|_| s.to_owned())
        .map_err(|e| format!("{s:?} is not an RFC 3339 timestamp: {e}"))
}

/// Build [`ProcessingSettings`] from CLI arguments.
///
/// `--config-json` wins over the individual flags; `--calibrate` wins
/// over any configured scale.
fn settings_from_cli(cli: &Cli) -> Result<ProcessingSettings, String> {
    let mut settings = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        ProcessingSettings {
            edge_method: cli.edge_method,
            threshold: cli.threshold,
            scale: Scale::from_pixels_per_meter(cli.scale),
            output_format: cli.format,
            conversion_mode: cli.mode,
            min_line_length: cli.min_line_length,
            point_order: cli.point_order,
        }
    };

    if let Some(calibration) = cli.calibrate {
        settings.scale = calibration
            .scale()
            .map_err(|e| format!("Error calibrating: {e}"))?;
        log::info!(
            "calibrated to {:.3} px/m ({})",
            settings.scale.pixels_per_meter(),
            settings.scale.unit_label(),
        );
    }

    settings
        .validate()
        .map_err(|e| format!("Invalid settings: {e}"))?;
    Ok(settings)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            log::error!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let settings = settings_from_cli(cli)?;

    let image_bytes = std::fs::read(&cli.image_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?;
    log::info!(
        "image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    log::debug!("settings: {settings:?}");

    let image =
        photocad_pipeline::decode(&image_bytes).map_err(|e| format!("Pipeline error: {e}"))?;

    let result = if cli.diagnostics {
        let (result, diagnostics) = photocad_pipeline::process_with_diagnostics(&image, &settings)
            .map_err(|e| format!("Pipeline error: {e}"))?;
        if cli.diagnostics_json {
            let json = serde_json::to_string_pretty(&diagnostics)
                .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
            eprintln!("{json}");
        } else {
            eprintln!("{}", diagnostics.report());
        }
        result
    } else {
        photocad_pipeline::process(&image, &settings).map_err(|e| format!("Pipeline error: {e}"))?
    };

    log::info!(
        "{} features, estimate: {} ({:.0}%)",
        result.features.len(),
        result.estimate.kind,
        result.estimate.confidence * 100.0,
    );

    let markers: ReferenceSet = cli.references.iter().copied().collect();
    let drawing = Drawing::new(&result, settings.scale, markers.points());
    let context = ExportContext {
        timestamp: cli.timestamp.as_deref(),
        original: cli.original_size,
    };
    let text = photocad_export::serialize(settings.output_format, &drawing, &context)
        .map_err(|e| format!("Export error: {e}"))?;

    match cli.output {
        Some(ref path) => {
            std::fs::write(path, &text)
                .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
            log::info!(
                "{} written to {} ({} bytes)",
                settings.output_format,
                path.display(),
                text.len(),
            );
        }
        None => print!("{text}"),
    }
    Ok(())
}
