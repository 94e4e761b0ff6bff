//! cutout-pipeline: Pure foam cutout geometry pipeline (sans-IO).
//!
//! Turns a background-removed pixel buffer into closed outlines and
//! packs them inside a case:
//! mask building -> refinement -> contour tracing -> simplification ->
//! calibration -> layout -> fit check.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! buffers and returns structured data. Serialization to DXF, SVG, and
//! JSON lives in `cutout-export`; files and the command line live in
//! `cutout`.

pub mod buffer;
pub mod cache;
pub mod calibrate;
pub mod contour;
pub mod diagnostics;
pub mod fit;
pub mod hit_test;
pub mod layout;
pub mod mask;
pub mod pipeline;
pub mod refine;
pub mod segmentation;
pub mod session;
pub mod simplify;
pub mod types;

pub use buffer::PixelBuffer;
pub use cache::{CacheError, CleanedImageCache};
pub use calibrate::{
    Calibration, CalibrationError, CalibrationInput, CalibrationReference, ReferenceObject,
    calibrate,
};
pub use contour::{ContourTracer, ContourTracerKind};
pub use diagnostics::{Clock, PipelineDiagnostics, process_with_diagnostics};
pub use layout::{CaseFootprint, CasePreset, Layout, LayoutConfig, LayoutItem, Rotation};
pub use pipeline::{Pipeline, PipelineStage, StagedResult};
pub use session::Session;
pub use types::{
    Dimensions, Drops, ObjectPolygon, PipelineConfig, PipelineError, PixelBox, Point, Polygon,
    PolygonSet, Rect, Unit,
};

/// Run the pixel stages of the pipeline in one call.
///
/// Builds one mask per connected foreground region, refines each mask,
/// traces its outer boundary, and simplifies the result. Objects that do
/// not survive a stage are counted in [`PolygonSet::drops`] rather than
/// raised as errors.
///
/// The function is pure: the same buffer and config always produce the
/// same set, so callers re-run it whenever a parameter changes.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails validation.
pub fn process(buffer: &PixelBuffer, config: &PipelineConfig) -> Result<PolygonSet, PipelineError> {
    Ok(Pipeline::new(buffer, config.clone())
        .segment()?
        .refine()
        .trace()
        .smooth()
        .into_polygon_set())
}

/// Like [`process`], but keeps every intermediate product.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails validation.
pub fn process_staged(
    buffer: &PixelBuffer,
    config: &PipelineConfig,
) -> Result<StagedResult, PipelineError> {
    Ok(Pipeline::new(buffer, config.clone())
        .segment()?
        .refine()
        .trace()
        .smooth()
        .into_result())
}
