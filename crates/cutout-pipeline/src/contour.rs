//! Contour tracing: turn a refined mask into its outer boundary polygon.
//!
//! This module defines the [`ContourTracer`] trait for pluggable tracing
//! algorithms and the [`ContourTracerKind`] enum for selecting one at
//! runtime. Both produce exactly one closed polygon per mask, in pixel
//! coordinates, or a [`TraceError`] explaining why the mask yields none.

use serde::{Deserialize, Serialize};

use crate::types::{GrayImage, Point, Polygon};

/// Traces shorter than this are noise and are dropped.
pub const MIN_TRACE_POINTS: usize = 10;

/// Hard cap on boundary-following steps. Reaching it means the trace
/// never closed and the result is discarded.
pub const MAX_TRACE_STEPS: usize = 50_000;

/// The 8 neighbor offsets, clockwise on screen starting from east.
const DIRECTIONS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Where to resume the neighbor search relative to the previous move.
const SEARCH_OFFSET: usize = 6;

/// Why a mask produced no polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    /// The mask has no set pixels.
    #[error("mask is empty")]
    EmptyMask,

    /// The trace closed with too few points to be a real object.
    #[error("trace has {count} points, need at least {min}", min = MIN_TRACE_POINTS)]
    TooFewPoints {
        /// Points actually traced.
        count: usize,
    },

    /// The boundary walk hit [`MAX_TRACE_STEPS`] without returning to
    /// its start.
    #[error("boundary trace did not close within {max} steps", max = MAX_TRACE_STEPS)]
    Overrun,
}

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContourTracerKind {
    /// 8-connected Moore-neighbor boundary following, implemented here.
    ///
    /// Walks only boundary pixels, so the result is the outer silhouette
    /// regardless of interior structure.
    #[default]
    MooreNeighbor,

    /// Suzuki-Abe border following via `imageproc::contours::find_contours`,
    /// keeping the longest outer border.
    BorderFollowing,
}

/// Trait for contour tracing strategies.
///
/// Input: a binary mask (non-zero = object).
/// Output: the object's outer boundary as a closed pixel polygon.
pub trait ContourTracer {
    /// Trace the outer boundary of `mask`.
    ///
    /// # Errors
    ///
    /// Returns a [`TraceError`] when the mask yields no usable polygon.
    fn trace(&self, mask: &GrayImage) -> Result<Polygon, TraceError>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, mask: &GrayImage) -> Result<Polygon, TraceError> {
        let points = match *self {
            Self::MooreNeighbor => trace_moore(mask)?,
            Self::BorderFollowing => trace_border_following(mask)?,
        };
        if points.len() < MIN_TRACE_POINTS {
            return Err(TraceError::TooFewPoints {
                count: points.len(),
            });
        }
        Ok(Polygon::pixels(points))
    }
}

/// Whether `(x, y)` is inside the grid and set.
fn is_set(mask: &GrayImage, x: i64, y: i64) -> bool {
    match (u32::try_from(x), u32::try_from(y)) {
        (Ok(x), Ok(y)) if x < mask.width() && y < mask.height() => mask.get_pixel(x, y).0[0] > 0,
        _ => false,
    }
}

/// A set pixel with at least one unset (or off-grid) 8-neighbor.
fn is_boundary(mask: &GrayImage, x: i64, y: i64) -> bool {
    is_set(mask, x, y)
        && DIRECTIONS
            .iter()
            .any(|&(dx, dy)| !is_set(mask, x + dx, y + dy))
}

/// First set pixel in row-major order.
fn first_set_pixel(mask: &GrayImage) -> Option<(i64, i64)> {
    mask.enumerate_pixels()
        .find(|(_, _, p)| p.0[0] > 0)
        .map(|(x, y, _)| (i64::from(x), i64::from(y)))
}

/// Moore-neighbor boundary following.
///
/// Starts at the first set pixel in row-major order. At each step the
/// 8 neighbors are searched clockwise beginning [`SEARCH_OFFSET`]
/// positions past the previous move direction; the first neighbor that
/// is itself a boundary pixel becomes the next point. Stops on return
/// to the start pixel.
#[allow(clippy::cast_precision_loss)]
fn trace_moore(mask: &GrayImage) -> Result<Vec<Point>, TraceError> {
    let start = first_set_pixel(mask).ok_or(TraceError::EmptyMask)?;
    let mut points = vec![Point::new(start.0 as f64, start.1 as f64)];
    let mut current = start;
    let mut direction = 0_usize;

    for _ in 0..MAX_TRACE_STEPS {
        let next = (0..DIRECTIONS.len()).find_map(|i| {
            let d = (direction + SEARCH_OFFSET + i) % DIRECTIONS.len();
            let (dx, dy) = DIRECTIONS[d];
            let candidate = (current.0 + dx, current.1 + dy);
            is_boundary(mask, candidate.0, candidate.1).then_some((d, candidate))
        });

        // An isolated pixel has nowhere to go.
        let Some((d, candidate)) = next else {
            return Ok(points);
        };
        if candidate == start {
            return Ok(points);
        }
        direction = d;
        current = candidate;
        points.push(Point::new(current.0 as f64, current.1 as f64));
    }

    tracing::warn!(
        start_x = start.0,
        start_y = start.1,
        "boundary trace exceeded step cap"
    );
    Err(TraceError::Overrun)
}

/// Suzuki-Abe border following via `imageproc`.
///
/// Keeps the outer border with the most points, which for a single
/// connected mask is its silhouette.
fn trace_border_following(mask: &GrayImage) -> Result<Vec<Point>, TraceError> {
    let contours: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(mask);

    contours
        .into_iter()
        .filter(|c| matches!(c.border_type, imageproc::contours::BorderType::Outer))
        .max_by_key(|c| c.points.len())
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect()
        })
        .ok_or(TraceError::EmptyMask)
}
