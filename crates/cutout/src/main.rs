//! cutout: command-line front end for the foam cutout pipeline.
//!
//! Reads a background-removed photo, traces every object, and either
//! prints per-stage diagnostics (`trace`) or calibrates, packs, and
//! writes the order artifacts (`layout`): layout JSON, SVG preview, DXF,
//! and a fit report.
//!
//! # Usage
//!
//! ```text
//! cutout trace [OPTIONS] <IMAGE_PATH>
//! cutout layout [OPTIONS] --out-dir <DIR> <IMAGE_PATH>
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use cutout_export::{ExportConfig, ExportModel, FitReport, OffsetKind, SvgMetadata};
use cutout_pipeline::calibrate::{ReferenceObject, measure_segmented};
use cutout_pipeline::diagnostics::{Clock, process_with_diagnostics};
use cutout_pipeline::layout::{CASE_PRESETS, CasePreset};
use cutout_pipeline::segmentation::{PollPolicy, PollResponse, StatusSource, ThreadSleeper};
use cutout_pipeline::{
    CalibrationInput, CaseFootprint, ContourTracerKind, Layout, LayoutItem, PipelineConfig,
    PixelBuffer, Session, StagedResult, calibrate,
};

/// A local file is already cleaned, so its job completes on first poll.
const LOCAL_POLL: PollPolicy = PollPolicy {
    interval: Duration::ZERO,
    max_attempts: 1,
};

/// Turn background-removed photos of gear into packed foam cutouts.
#[derive(Parser)]
#[command(name = "cutout", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trace outlines and print per-stage diagnostics.
    Trace(TraceArgs),
    /// Trace, calibrate, pack into a case, and write order artifacts.
    Layout(LayoutArgs),
}

/// Pixel-stage parameters shared by every subcommand.
#[derive(Args)]
struct PipelineArgs {
    /// Path to the cleaned input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Smallest object kept, in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MIN_AREA)]
    min_area: u32,

    /// Closing radius used to bridge gaps, in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_GAP_FILL)]
    gap_fill: u8,

    /// Extra dilation around each object, in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MARGIN)]
    margin: u8,

    /// Smoothing level (0-5).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SMOOTHING_LEVEL)]
    smoothing_level: u8,

    /// Contour tracing strategy.
    #[arg(long, value_enum, default_value_t = Tracer::MooreNeighbor)]
    tracer: Tracer,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

#[derive(Args)]
struct TraceArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Write the traced polygon set as JSON to this file.
    #[arg(long)]
    polygons: Option<PathBuf>,

    /// Re-run the geometry stages on the same cleaned image with this
    /// config JSON (repeatable) and print a summary line for each.
    #[arg(long, value_name = "CONFIG_JSON")]
    reprocess: Vec<String>,
}

#[derive(Args)]
struct LayoutArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Directory for layout.json, layout.svg, layout.dxf, and fit-report.json.
    #[arg(long)]
    out_dir: PathBuf,

    /// Known pixels per inch.
    #[arg(long, conflicts_with = "reference")]
    ppi: Option<f64>,

    /// Reference object id (credit-card, us-quarter, ruler-6in, dollar-bill).
    #[arg(long)]
    reference: Option<String>,

    /// Which traced object is the reference, in segmentation order.
    #[arg(long, default_value_t = 0, requires = "reference")]
    reference_index: usize,

    /// Case preset id.
    #[arg(long, default_value = "generic-24x18", conflicts_with_all = ["case_width", "case_height"])]
    case: String,

    /// Custom case inner width in inches.
    #[arg(long, requires = "case_height")]
    case_width: Option<f64>,

    /// Custom case inner height in inches.
    #[arg(long, requires = "case_width")]
    case_height: Option<f64>,

    /// Pocket depth in inches.
    #[arg(long, default_value_t = LayoutItem::DEFAULT_DEPTH)]
    depth: f64,

    /// Manufacturing tolerance in inches.
    #[arg(long, default_value_t = ExportConfig::DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Simplification applied after offsetting, in inches.
    #[arg(long, default_value_t = ExportConfig::DEFAULT_SIMPLIFY_THRESHOLD)]
    simplify_threshold: f64,

    /// How the tolerance is applied.
    #[arg(long, value_enum, default_value_t = Offset::CentroidScale)]
    offset: Offset,

    /// Fail unless the layout is ready for manufacturing.
    #[arg(long)]
    strict: bool,
}

/// Contour tracer selection.
#[derive(Clone, Copy, ValueEnum)]
enum Tracer {
    /// 8-connected Moore-neighbor boundary following.
    MooreNeighbor,
    /// Suzuki-Abe border following.
    BorderFollowing,
}

/// Offset strategy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Offset {
    /// Isotropic scale about the centroid.
    CentroidScale,
    /// Miter-limited offset along edge normals.
    EdgeNormal,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(args: &PipelineArgs) -> Result<PipelineConfig, String> {
    if let Some(ref json) = args.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        min_area: args.min_area,
        gap_fill: args.gap_fill,
        margin: args.margin,
        smoothing_level: args.smoothing_level,
        contour_tracer: match args.tracer {
            Tracer::MooreNeighbor => ContourTracerKind::MooreNeighbor,
            Tracer::BorderFollowing => ContourTracerKind::BorderFollowing,
        },
    })
}

fn case_from_cli(args: &LayoutArgs) -> Result<CaseFootprint, String> {
    if let (Some(width), Some(height)) = (args.case_width, args.case_height) {
        if !(width > 0.0 && height > 0.0) {
            return Err(format!("case size {width}x{height} must be positive"));
        }
        return Ok(CaseFootprint::new(width, height));
    }
    CasePreset::find(&args.case)
        .map(CasePreset::footprint)
        .ok_or_else(|| {
            let known: Vec<&str> = CASE_PRESETS.iter().map(|p| p.id).collect();
            format!("unknown case preset {:?} (known: {})", args.case, known.join(", "))
        })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Trace(args) => run_trace(args),
        Command::Layout(args) => run_layout(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

/// Status source for an image that is already background-removed on
/// disk: the job id is the path and completes immediately.
struct LocalFile;

impl StatusSource for LocalFile {
    fn poll(&mut self, job_id: &str) -> PollResponse {
        PollResponse::completed(job_id)
    }
}

/// Run the input through a segmentation [`Session`] so later passes can
/// reprocess the cached cleaned image.
fn load(args: &PipelineArgs) -> Result<(Session, PipelineConfig), String> {
    let config = config_from_cli(args)?;
    let mut session = Session::new(LOCAL_POLL);
    session
        .submit(args.image_path.display().to_string())
        .map_err(|e| format!("Segmentation error: {e}"))?;
    let location = session
        .wait(&mut LocalFile, &mut ThreadSleeper)
        .map_err(|e| format!("Segmentation error: {e}"))?;

    let bytes = std::fs::read(&location).map_err(|e| format!("Error reading {location}: {e}"))?;
    tracing::info!(path = %location, bytes = bytes.len(), "loaded image");
    let buffer = PixelBuffer::decode(&bytes).map_err(|e| format!("Error decoding image: {e}"))?;
    session
        .complete(buffer)
        .map_err(|e| format!("Segmentation error: {e}"))?;
    Ok((session, config))
}

fn cleaned(session: &Session) -> Result<&PixelBuffer, String> {
    session
        .cleaned()
        .ok_or_else(|| "no cleaned image for the current job".to_owned())
}

fn run_trace(args: &TraceArgs) -> Result<(), String> {
    let (session, config) = load(&args.pipeline)?;
    let (staged, diagnostics) = process_with_diagnostics(cleaned(&session)?, &config, &StdClock)
        .map_err(|e| format!("Pipeline error: {e}"))?;

    if args.json {
        let json = serde_json::to_string_pretty(&diagnostics)
            .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
        println!("{json}");
    } else {
        println!("{}", diagnostics.report());
    }

    if let Some(ref path) = args.polygons {
        let json = serde_json::to_string_pretty(&staged.polygons)
            .map_err(|e| format!("Error serializing polygons: {e}"))?;
        write(path, &json)?;
    }

    for (i, json) in args.reprocess.iter().enumerate() {
        let config: PipelineConfig = serde_json::from_str(json)
            .map_err(|e| format!("Error parsing --reprocess #{}: {e}", i + 1))?;
        let set = session
            .reprocess(&config)
            .map_err(|e| format!("Reprocess error: {e}"))?;
        let points: usize = set.objects.iter().map(|o| o.polygon.len()).sum();
        println!(
            "reprocess #{}: {} objects, {points} points, {} dropped",
            i + 1,
            set.objects.len(),
            set.drops.total()
        );
    }
    Ok(())
}

fn run_layout(args: &LayoutArgs) -> Result<(), String> {
    let (session, config) = load(&args.pipeline)?;
    let case = case_from_cli(args)?;
    let staged = cutout_pipeline::process_staged(cleaned(&session)?, &config)
        .map_err(|e| format!("Pipeline error: {e}"))?;
    let set = &staged.polygons;
    if set.drops.total() > 0 {
        tracing::info!(dropped = set.drops.total(), "some objects were dropped");
    }

    let (input, reference_index) = calibration_input(args, &staged)?;
    let calibration = calibrate(&input).map_err(|e| format!("Calibration error: {e}"))?;
    if let Some(warning) = calibration.warning {
        eprintln!("Warning: {warning}");
    }
    tracing::info!(ppi = calibration.pixels_per_inch, "calibrated");

    let mut layout = Layout::new(case);
    for object in set
        .objects
        .iter()
        .filter(|o| Some(o.index) != reference_index)
    {
        let outline = calibration.to_inches(&object.polygon);
        layout
            .add(format!("object {}", object.index), &outline, args.depth)
            .map_err(|e| format!("Layout error: {e}"))?;
    }
    let overflowed = layout.pack();
    for id in &overflowed {
        eprintln!("Warning: {id} did not fit and was placed at the safe-zone origin");
    }

    let export = ExportConfig {
        tolerance: args.tolerance,
        simplify_threshold: args.simplify_threshold,
        offset: match args.offset {
            Offset::CentroidScale => OffsetKind::CentroidScale,
            Offset::EdgeNormal => OffsetKind::EdgeNormal,
        },
    };
    let report = FitReport::new(&layout, export.tolerance);
    let model = ExportModel::compose(&layout, &export).map_err(|e| format!("Export error: {e}"))?;

    let title = args
        .pipeline
        .image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("cutout");
    let desc = format!(
        "{} items, tolerance {} in, {}x{} in case",
        layout.items().len(),
        export.tolerance,
        case.width,
        case.height
    );
    let svg = cutout_export::to_svg(
        &model,
        &SvgMetadata {
            title: Some(title),
            description: Some(&desc),
        },
    );
    let dxf = cutout_export::to_dxf(&model).map_err(|e| format!("Export error: {e}"))?;
    let items = cutout_export::items_to_json(layout.items()).map_err(|e| format!("Export error: {e}"))?;
    let fit = serde_json::to_string_pretty(&report)
        .map_err(|e| format!("Error serializing fit report: {e}"))?;

    std::fs::create_dir_all(&args.out_dir)
        .map_err(|e| format!("Error creating {}: {e}", args.out_dir.display()))?;
    write(&args.out_dir.join("layout.json"), &items)?;
    write(&args.out_dir.join("layout.svg"), &svg)?;
    write(&args.out_dir.join("layout.dxf"), &dxf)?;
    write(&args.out_dir.join("fit-report.json"), &fit)?;

    println!(
        "{} items, {}% inside the safe zone",
        layout.items().len(),
        report.fit_percentage
    );

    if args.strict {
        report
            .require_manufacturable()
            .map_err(|e| format!("Not ready for manufacturing: {e}"))?;
    }
    Ok(())
}

/// Resolve the calibration input and, for a reference, which traced
/// object it is so it can be left out of the layout.
///
/// The reference is measured from its segmented mask, before margin and
/// smoothing grow the outline.
fn calibration_input(
    args: &LayoutArgs,
    staged: &StagedResult,
) -> Result<(CalibrationInput, Option<usize>), String> {
    let set = &staged.polygons;
    if let Some(pixels_per_inch) = args.ppi {
        return Ok((CalibrationInput::Manual { pixels_per_inch }, None));
    }
    let Some(ref id) = args.reference else {
        return Ok((CalibrationInput::None, None));
    };

    let reference = ReferenceObject::find(id).ok_or_else(|| format!("unknown reference object {id:?}"))?;
    let object = set.objects.get(args.reference_index).ok_or_else(|| {
        format!(
            "reference index {} out of range ({} objects traced)",
            args.reference_index,
            set.objects.len()
        )
    })?;
    let measured = measure_segmented(staged, object.index)
        .ok_or_else(|| format!("no segmented mask for object {}", object.index))?;
    Ok((
        CalibrationInput::Reference(reference.measured(measured)),
        Some(object.index),
    ))
}

fn write(path: &Path, contents: &str) -> Result<(), String> {
    std::fs::write(path, contents).map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
