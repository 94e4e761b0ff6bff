//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process`] which runs the pixel stages in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use cutout_pipeline::{Pipeline, PipelineConfig, PipelineError, PixelBuffer};
//! # fn run(buffer: &PixelBuffer) -> Result<(), PipelineError> {
//! let smoothed = Pipeline::new(buffer, PipelineConfig::default())
//!     .segment()?
//!     .refine()
//!     .trace()
//!     .smooth();
//!
//! let staged = smoothed.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline
//! state, carrying all previously computed intermediates. Only
//! segmentation can fail (on an invalid config); later stages record
//! dropped objects in [`Drops`] instead.
//!
//! # Memory
//!
//! Every stage from [`Segmented`] onward keeps one full-frame bitmap per
//! object, and [`Refined`] keeps two. For many objects on a large photo
//! this adds up; callers that only need the outlines should prefer
//! [`crate::process`].

use serde::Serialize;

use crate::buffer::PixelBuffer;
use crate::contour::{ContourTracer, TraceError};
use crate::diagnostics::StageMetrics;
use crate::mask::ObjectMask;
use crate::types::{Dimensions, Drops, ObjectPolygon, PipelineConfig, PipelineError, PixelBox, PolygonSet};

/// Entry point for the staged API.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline;

impl Pipeline {
    /// Start a run over `buffer`.
    pub const fn new(buffer: &PixelBuffer, config: PipelineConfig) -> Pending<'_> {
        Pending {
            buffer,
            config,
            hint: None,
        }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`segment`](Self::segment) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .segment() to continue"]
#[derive(Debug)]
pub struct Pending<'a> {
    buffer: &'a PixelBuffer,
    config: PipelineConfig,
    hint: Option<PixelBox>,
}

impl Pending<'_> {
    /// The source buffer.
    #[must_use]
    pub const fn buffer(&self) -> &PixelBuffer {
        self.buffer
    }

    /// Restrict segmentation to an externally supplied bounding box.
    pub fn with_hint(mut self, hint: PixelBox) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Split the buffer into object masks and advance to [`Segmented`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the config fails
    /// [`PipelineConfig::validate`].
    pub fn segment(self) -> Result<Segmented, PipelineError> {
        self.config.validate()?;
        let masks = crate::mask::build_masks_in(self.buffer, self.config.min_area, self.hint);
        Ok(Segmented {
            config: self.config,
            dimensions: self.buffer.dimensions(),
            masks,
        })
    }
}

// ───────────────────────── Stage 1: Segmented ────────────────────────

/// Pipeline state after splitting the buffer into per-object masks.
///
/// Call [`refine`](Self::refine) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .refine() to continue"]
#[derive(Debug)]
pub struct Segmented {
    config: PipelineConfig,
    dimensions: Dimensions,
    masks: Vec<ObjectMask>,
}

impl Segmented {
    /// Raw object masks in segmentation order.
    #[must_use]
    pub fn masks(&self) -> &[ObjectMask] {
        &self.masks
    }

    /// Fill holes, close gaps, and add margin; advance to [`Refined`].
    pub fn refine(self) -> Refined {
        let mut drops = Drops::default();
        let refined = self
            .masks
            .iter()
            .filter_map(|mask| {
                let out = crate::refine::refine(mask, self.config.gap_fill, self.config.margin);
                if out.is_none() {
                    tracing::warn!(index = mask.index, "mask vanished during refinement");
                    drops.empty_masks += 1;
                }
                out
            })
            .collect();
        Refined {
            config: self.config,
            dimensions: self.dimensions,
            masks: self.masks,
            refined,
            drops,
        }
    }
}

// ───────────────────────── Stage 2: Refined ──────────────────────────

/// Pipeline state after mask refinement.
///
/// Call [`trace`](Self::trace) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .trace() to continue"]
#[derive(Debug)]
pub struct Refined {
    config: PipelineConfig,
    dimensions: Dimensions,
    masks: Vec<ObjectMask>,
    refined: Vec<ObjectMask>,
    drops: Drops,
}

impl Refined {
    /// Refined masks in segmentation order.
    #[must_use]
    pub fn refined(&self) -> &[ObjectMask] {
        &self.refined
    }

    /// Trace each refined mask's outer boundary; advance to [`Traced`].
    ///
    /// Masks whose trace is too short or never closes are dropped and
    /// counted.
    pub fn trace(self) -> Traced {
        let mut drops = self.drops;
        let mut traced = Vec::with_capacity(self.refined.len());
        for mask in &self.refined {
            match self.config.contour_tracer.trace(&mask.bitmap) {
                Ok(polygon) => traced.push(ObjectPolygon {
                    index: mask.index,
                    polygon,
                }),
                Err(err) => {
                    tracing::warn!(index = mask.index, %err, "dropping contour");
                    match err {
                        TraceError::EmptyMask => drops.empty_masks += 1,
                        TraceError::TooFewPoints { .. } => drops.too_few_points += 1,
                        TraceError::Overrun => drops.trace_overruns += 1,
                    }
                }
            }
        }
        Traced {
            config: self.config,
            dimensions: self.dimensions,
            masks: self.masks,
            refined: self.refined,
            traced,
            drops,
        }
    }
}

// ───────────────────────── Stage 3: Traced ───────────────────────────

/// Pipeline state after contour tracing.
///
/// Call [`smooth`](Self::smooth) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing; call .smooth() to continue"]
#[derive(Debug)]
pub struct Traced {
    config: PipelineConfig,
    dimensions: Dimensions,
    masks: Vec<ObjectMask>,
    refined: Vec<ObjectMask>,
    traced: Vec<ObjectPolygon>,
    drops: Drops,
}

impl Traced {
    /// Raw traced outlines.
    #[must_use]
    pub fn traced(&self) -> &[ObjectPolygon] {
        &self.traced
    }

    /// Simplify and smooth every outline; advance to [`Smoothed`].
    pub fn smooth(self) -> Smoothed {
        let mut drops = self.drops;
        let level = self.config.smoothing_level;
        let smoothed = self
            .traced
            .iter()
            .filter_map(|object| {
                match crate::simplify::smooth_polygon(&object.polygon, level) {
                    Ok(polygon) => Some(ObjectPolygon {
                        index: object.index,
                        polygon,
                    }),
                    Err(err) => {
                        tracing::warn!(index = object.index, %err, "dropping polygon");
                        drops.degenerate += 1;
                        None
                    }
                }
            })
            .collect();
        Smoothed {
            config: self.config,
            dimensions: self.dimensions,
            masks: self.masks,
            refined: self.refined,
            traced: self.traced,
            smoothed,
            drops,
        }
    }
}

// ───────────────────────── Stage 4: Smoothed ─────────────────────────

/// Pipeline state after smoothing. This is the final stage.
///
/// Call [`into_result`](Self::into_result) for every intermediate, or
/// [`into_polygon_set`](Self::into_polygon_set) for the outlines only.
#[must_use = "call .into_result() or .into_polygon_set() to extract the output"]
#[derive(Debug)]
pub struct Smoothed {
    config: PipelineConfig,
    dimensions: Dimensions,
    masks: Vec<ObjectMask>,
    refined: Vec<ObjectMask>,
    traced: Vec<ObjectPolygon>,
    smoothed: Vec<ObjectPolygon>,
    drops: Drops,
}

impl Smoothed {
    /// Final outlines.
    #[must_use]
    pub fn smoothed(&self) -> &[ObjectPolygon] {
        &self.smoothed
    }

    /// Objects dropped so far.
    #[must_use]
    pub const fn drops(&self) -> Drops {
        self.drops
    }

    /// The config this run used.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Discard intermediates and keep the outlines.
    #[must_use]
    pub fn into_polygon_set(self) -> PolygonSet {
        PolygonSet {
            objects: self.smoothed,
            drops: self.drops,
            dimensions: self.dimensions,
        }
    }

    /// Consume the pipeline and return every intermediate.
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            masks: self.masks,
            refined: self.refined,
            traced: self.traced,
            polygons: PolygonSet {
                objects: self.smoothed,
                drops: self.drops,
                dimensions: self.dimensions,
            },
        }
    }
}

/// Every intermediate of one pipeline run.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Raw object masks.
    pub masks: Vec<ObjectMask>,
    /// Masks after hole fill, closing, and margin.
    pub refined: Vec<ObjectMask>,
    /// Outlines straight from the tracer.
    pub traced: Vec<ObjectPolygon>,
    /// Smoothed outlines and drop counts.
    pub polygons: PolygonSet,
}

// ──────────────────────── PipelineStage trait ─────────────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 5;

/// Metadata and metrics shared by every stage, for diagnostics.
pub trait PipelineStage {
    /// Human-readable name of this stage.
    const NAME: &'static str;

    /// Zero-based index of this stage (`0` for [`Pending`] through `4`
    /// for [`Smoothed`]).
    const INDEX: usize;

    /// Metrics describing the work done to reach this stage, or `None`
    /// for [`Pending`].
    fn metrics(&self) -> Option<StageMetrics>;
}

impl PipelineStage for Pending<'_> {
    const NAME: &'static str = "source";
    const INDEX: usize = 0;

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }
}

impl PipelineStage for Segmented {
    const NAME: &'static str = "segment";
    const INDEX: usize = 1;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Segment {
            width: self.dimensions.width,
            height: self.dimensions.height,
            mask_count: self.masks.len(),
            total_area: self.masks.iter().map(|m| u64::from(m.area)).sum(),
        })
    }
}

impl PipelineStage for Refined {
    const NAME: &'static str = "refine";
    const INDEX: usize = 2;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Refine {
            gap_fill: self.config.gap_fill,
            margin: self.config.margin,
            area_before: self.masks.iter().map(|m| u64::from(m.area)).sum(),
            area_after: self.refined.iter().map(|m| u64::from(m.area)).sum(),
            empty_masks: self.drops.empty_masks,
        })
    }
}

impl PipelineStage for Traced {
    const NAME: &'static str = "trace";
    const INDEX: usize = 3;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Trace {
            tracer: format!("{:?}", self.config.contour_tracer),
            polygon_count: self.traced.len(),
            total_point_count: crate::diagnostics::total_points(&self.traced),
            too_few_points: self.drops.too_few_points,
            overruns: self.drops.trace_overruns,
        })
    }
}

impl PipelineStage for Smoothed {
    const NAME: &'static str = "smooth";
    const INDEX: usize = 4;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Smooth {
            smoothing_level: self.config.smoothing_level,
            points_before: crate::diagnostics::total_points(&self.traced),
            points_after: crate::diagnostics::total_points(&self.smoothed),
            degenerate: self.drops.degenerate,
        })
    }
}

/// Serializable summary of a [`StagedResult`] without the bitmaps.
#[derive(Debug, Clone, Serialize)]
pub struct StagedSummary<'a> {
    /// Raw outlines.
    pub traced: &'a [ObjectPolygon],
    /// Final outlines and drops.
    pub polygons: &'a PolygonSet,
}

impl StagedResult {
    /// Borrow the vector parts for serialization.
    #[must_use]
    pub fn summary(&self) -> StagedSummary<'_> {
        StagedSummary {
            traced: &self.traced,
            polygons: &self.polygons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::ContourTracerKind;

    /// Two opaque rectangles on a clear background.
    fn two_blocks() -> PixelBuffer {
        let (w, h) = (120_u32, 80_u32);
        let alpha = (0..h)
            .flat_map(|y| {
                (0..w).map(move |x| {
                    let a = (10..50).contains(&x) && (10..40).contains(&y);
                    let b = (70..110).contains(&x) && (20..70).contains(&y);
                    if a || b { 255 } else { 0 }
                })
            })
            .collect();
        PixelBuffer::from_alpha(w, h, alpha).unwrap()
    }

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            min_area: 50,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn stages_expose_intermediates() {
        let buffer = two_blocks();
        let segmented = Pipeline::new(&buffer, small_config()).segment().unwrap();
        assert_eq!(segmented.masks().len(), 2);

        let refined = segmented.refine();
        assert_eq!(refined.refined().len(), 2);
        assert!(refined.refined()[0].area > refined.masks[0].area);

        let traced = refined.trace();
        assert_eq!(traced.traced().len(), 2);

        let smoothed = traced.smooth();
        assert_eq!(smoothed.smoothed().len(), 2);
        assert_eq!(smoothed.drops().total(), 0);
        for (raw, smooth) in smoothed.traced.iter().zip(smoothed.smoothed()) {
            assert!(smooth.polygon.len() <= raw.polygon.len());
        }
    }

    #[test]
    fn invalid_config_fails_at_segment() {
        let buffer = two_blocks();
        let config = PipelineConfig {
            smoothing_level: 9,
            ..small_config()
        };
        assert!(matches!(
            Pipeline::new(&buffer, config).segment(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn hint_limits_to_one_object() {
        let buffer = two_blocks();
        let hint = PixelBox {
            min_x: 60,
            min_y: 0,
            max_x: 119,
            max_y: 79,
        };
        let set = Pipeline::new(&buffer, small_config())
            .with_hint(hint)
            .segment()
            .unwrap()
            .refine()
            .trace()
            .smooth()
            .into_polygon_set();
        assert_eq!(set.objects.len(), 1);
        let b = set.objects[0].polygon.bounds().unwrap();
        assert!(b.x >= 60.0);
    }

    #[test]
    fn tiny_object_is_dropped_not_fatal() {
        // A 3x3 blob survives min_area but traces to fewer than 10 points
        // once margin and gap fill are off.
        let mut alpha = vec![0_u8; 30 * 30];
        for y in 5..8 {
            for x in 5..8 {
                alpha[y * 30 + x] = 255;
            }
        }
        let buffer = PixelBuffer::from_alpha(30, 30, alpha).unwrap();
        let config = PipelineConfig {
            min_area: 1,
            gap_fill: 0,
            margin: 0,
            ..PipelineConfig::default()
        };
        let set = Pipeline::new(&buffer, config)
            .segment()
            .unwrap()
            .refine()
            .trace()
            .smooth()
            .into_polygon_set();
        assert!(set.objects.is_empty());
        assert_eq!(set.drops.too_few_points, 1);
    }

    #[test]
    fn stage_metadata() {
        assert_eq!(<Segmented as PipelineStage>::NAME, "segment");
        assert_eq!(<Smoothed as PipelineStage>::INDEX, STAGE_COUNT - 1);
        let buffer = two_blocks();
        let pending = Pipeline::new(&buffer, small_config());
        assert!(pending.metrics().is_none());
        let segmented = pending.segment().unwrap();
        assert!(matches!(
            segmented.metrics(),
            Some(StageMetrics::Segment { mask_count: 2, .. })
        ));
    }

    #[test]
    fn border_following_tracer_also_works() {
        let buffer = two_blocks();
        let config = PipelineConfig {
            contour_tracer: ContourTracerKind::BorderFollowing,
            ..small_config()
        };
        let set = Pipeline::new(&buffer, config)
            .segment()
            .unwrap()
            .refine()
            .trace()
            .smooth()
            .into_polygon_set();
        assert_eq!(set.objects.len(), 2);
    }
}
