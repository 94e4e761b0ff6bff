//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! parameter tuning. [`process_with_diagnostics`] runs the staged
//! pipeline and records how long each stage took and what it produced.
//!
//! Timestamps come from an injected [`Clock`] so this crate stays free
//! of platform time sources and tests can run deterministically.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;
use crate::pipeline::{Pipeline, PipelineStage, StagedResult};
use crate::types::{ObjectPolygon, PipelineConfig, PipelineError};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time passed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: mask building.
    pub segment: StageDiagnostics,
    /// Stage 2: hole fill, closing, and margin.
    pub refine: StageDiagnostics,
    /// Stage 3: boundary tracing.
    pub trace: StageDiagnostics,
    /// Stage 4: simplification and smoothing.
    pub smooth: StageDiagnostics,
    /// Total duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Mask building metrics.
    Segment {
        /// Buffer width in pixels.
        width: u32,
        /// Buffer height in pixels.
        height: u32,
        /// Masks kept after the area threshold.
        mask_count: usize,
        /// Pixels across all kept masks.
        total_area: u64,
    },
    /// Refinement metrics.
    Refine {
        /// Closing radius.
        gap_fill: u8,
        /// Dilation margin.
        margin: u8,
        /// Mask pixels before refinement.
        area_before: u64,
        /// Mask pixels after refinement.
        area_after: u64,
        /// Masks that came out empty.
        empty_masks: usize,
    },
    /// Contour tracing metrics.
    Trace {
        /// Which tracer was used.
        tracer: String,
        /// Outlines kept.
        polygon_count: usize,
        /// Points across kept outlines.
        total_point_count: usize,
        /// Outlines dropped for being too short.
        too_few_points: usize,
        /// Traces that hit the step cap.
        overruns: usize,
    },
    /// Simplification and smoothing metrics.
    Smooth {
        /// Level applied.
        smoothing_level: u8,
        /// Points before.
        points_before: usize,
        /// Points after.
        points_after: usize,
        /// Outlines left with fewer than three points.
        degenerate: usize,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source width in pixels.
    pub image_width: u32,
    /// Source height in pixels.
    pub image_height: u32,
    /// Outlines in the final set.
    pub object_count: usize,
    /// Objects dropped along the way.
    pub dropped: usize,
    /// Points across the final outlines.
    pub final_point_count: usize,
}

/// Run the staged pipeline, timing every stage with `clock`.
///
/// # Errors
///
/// Returns [`PipelineError`] if segmentation rejects the config.
pub fn process_with_diagnostics<C: Clock>(
    buffer: &PixelBuffer,
    config: &PipelineConfig,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let start = clock.now();

    let t = clock.now();
    let segmented = Pipeline::new(buffer, config.clone()).segment()?;
    let segment = stage(&segmented, clock.elapsed(&t))?;

    let t = clock.now();
    let refined = segmented.refine();
    let refine = stage(&refined, clock.elapsed(&t))?;

    let t = clock.now();
    let traced = refined.trace();
    let trace = stage(&traced, clock.elapsed(&t))?;

    let t = clock.now();
    let smoothed = traced.smooth();
    let smooth = stage(&smoothed, clock.elapsed(&t))?;

    let staged = smoothed.into_result();
    let total_duration = clock.elapsed(&start);

    let summary = PipelineSummary {
        image_width: staged.polygons.dimensions.width,
        image_height: staged.polygons.dimensions.height,
        object_count: staged.polygons.objects.len(),
        dropped: staged.polygons.drops.total(),
        final_point_count: total_points(&staged.polygons.objects),
    };

    tracing::debug!(
        objects = summary.object_count,
        dropped = summary.dropped,
        total_ms = duration_ms(total_duration),
        "pipeline finished"
    );

    Ok((
        staged,
        PipelineDiagnostics {
            segment,
            refine,
            trace,
            smooth,
            total_duration,
            summary,
        },
    ))
}

fn stage<S: PipelineStage>(s: &S, duration: Duration) -> Result<StageDiagnostics, PipelineError> {
    let metrics = s.metrics().ok_or(PipelineError::MissingMetrics(S::NAME))?;
    Ok(StageDiagnostics { duration, metrics })
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}",
            self.summary.image_width, self.summary.image_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Segment", &self.segment),
            ("Refine", &self.refine),
            ("Trace", &self.trace),
            ("Smooth", &self.smooth),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Objects: {}  |  Dropped: {}  |  Final points: {}",
            self.summary.object_count, self.summary.dropped, self.summary.final_point_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Segment {
            width,
            height,
            mask_count,
            total_area,
        } => format!("{width}x{height} -> {mask_count} masks, {total_area} px"),
        StageMetrics::Refine {
            gap_fill,
            margin,
            area_before,
            area_after,
            empty_masks,
        } => format!(
            "gap={gap_fill} margin={margin} {area_before}->{area_after} px, {empty_masks} emptied"
        ),
        StageMetrics::Trace {
            tracer,
            polygon_count,
            total_point_count,
            too_few_points,
            overruns,
        } => format!(
            "{tracer} {polygon_count} outlines, {total_point_count} pts (short={too_few_points} overrun={overruns})"
        ),
        StageMetrics::Smooth {
            smoothing_level,
            points_before,
            points_after,
            degenerate,
        } => format!(
            "level={smoothing_level} {points_before}->{points_after} pts, {degenerate} degenerate"
        ),
    }
}

/// Total points across a slice of outlines.
pub(crate) fn total_points(objects: &[ObjectPolygon]) -> usize {
    objects.iter().map(|o| o.polygon.len()).sum()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Clock that advances one millisecond per reading.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.0.get() - since)
        }
    }

    fn block_buffer() -> PixelBuffer {
        let alpha = (0..60_u32 * 60)
            .map(|i| {
                let (x, y) = (i % 60, i / 60);
                if (10..50).contains(&x) && (15..45).contains(&y) {
                    255
                } else {
                    0
                }
            })
            .collect();
        PixelBuffer::from_alpha(60, 60, alpha).unwrap()
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        assert!((duration_ms(d) - 1234.0).abs() < 0.01);
    }

    #[test]
    fn untouched_stage_has_no_metrics() {
        let buffer = block_buffer();
        let pending = Pipeline::new(&buffer, PipelineConfig::default());
        let err = stage(&pending, Duration::ZERO).unwrap_err();
        assert!(matches!(err, PipelineError::MissingMetrics("source")));
        assert_eq!(err.to_string(), "stage source has no metrics to report");
    }

    #[test]
    fn diagnostics_cover_every_stage() {
        let buffer = block_buffer();
        let config = PipelineConfig {
            min_area: 10,
            ..PipelineConfig::default()
        };
        let (staged, diag) =
            process_with_diagnostics(&buffer, &config, &TickClock(Cell::new(0))).unwrap();

        assert_eq!(staged.polygons.objects.len(), 1);
        assert_eq!(diag.summary.object_count, 1);
        assert_eq!(diag.summary.image_width, 60);
        assert!(matches!(
            diag.segment.metrics,
            StageMetrics::Segment { mask_count: 1, total_area: 1200, .. }
        ));
        assert!(diag.segment.duration > Duration::ZERO);
        assert!(diag.total_duration >= diag.smooth.duration);
    }

    #[test]
    fn report_mentions_stages() {
        let buffer = block_buffer();
        let config = PipelineConfig {
            min_area: 10,
            ..PipelineConfig::default()
        };
        let (_, diag) =
            process_with_diagnostics(&buffer, &config, &TickClock(Cell::new(0))).unwrap();
        let report = diag.report();
        assert!(report.contains("Pipeline Diagnostics Report"));
        assert!(report.contains("Refine"));
        assert!(report.contains("MooreNeighbor"));
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let stage = StageDiagnostics {
            duration: Duration::from_millis(1500),
            metrics: StageMetrics::Smooth {
                smoothing_level: 2,
                points_before: 10,
                points_after: 5,
                degenerate: 0,
            },
        };
        let json = serde_json::to_value(&stage).unwrap();
        assert_eq!(json["duration"], 1.5);
        let back: StageDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.duration, Duration::from_millis(1500));
    }
}
