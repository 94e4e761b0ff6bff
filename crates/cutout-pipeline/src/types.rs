//! Shared types for the cutout geometry pipeline.

use serde::{Deserialize, Serialize};

use crate::contour::ContourTracerKind;

/// Re-export `GrayImage` so downstream crates can reference mask
/// bitmaps without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can hand decoded images
/// to the pipeline without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point. Pixel or inch coordinates depending on the owning
/// [`Polygon`]'s [`Unit`]; y grows downward in both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
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

    /// Point at fraction `t` of the way from `self` to `other`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            t.mul_add(other.x - self.x, self.x),
            t.mul_add(other.y - self.y, self.y),
        )
    }
}

/// Unit tag carried by every [`Polygon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Image pixels, before calibration.
    #[default]
    Pixel,
    /// Real-world inches, after calibration.
    Inch,
}

/// An ordered, implicitly closed sequence of points.
///
/// The last point joins back to the first; the closing point is not
/// repeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
    unit: Unit,
}

impl Polygon {
    /// Create a polygon from points in the given unit.
    #[must_use]
    pub const fn new(points: Vec<Point>, unit: Unit) -> Self {
        Self { points, unit }
    }

    /// Create a polygon in pixel coordinates.
    #[must_use]
    pub const fn pixels(points: Vec<Point>) -> Self {
        Self::new(points, Unit::Pixel)
    }

    /// Create a polygon in inches.
    #[must_use]
    pub const fn inches(points: Vec<Point>) -> Self {
        Self::new(points, Unit::Inch)
    }

    /// Returns `true` if the polygon has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Unit of the coordinates.
    #[must_use]
    pub const fn unit(&self) -> Unit {
        self.unit
    }

    /// All vertices, without the repeated closing point.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Consumes the polygon and returns its vertices.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Axis-aligned bounds, or `None` for an empty polygon.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        Rect::enclosing(&self.points)
    }

    /// Mean of the vertices, or `None` for an empty polygon.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> Option<Point> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f64;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Point::new(sx / n, sy / n))
    }

    /// Signed shoelace area. Positive when the vertices run
    /// counter-clockwise in a y-up frame.
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.points)
    }

    /// Multiply every coordinate by `factor` and retag the unit.
    #[must_use]
    pub fn scaled(&self, factor: f64, unit: Unit) -> Self {
        Self::new(
            self.points
                .iter()
                .map(|p| Point::new(p.x * factor, p.y * factor))
                .collect(),
            unit,
        )
    }

    /// Shift every point by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.points
                .iter()
                .map(|p| Point::new(p.x + dx, p.y + dy))
                .collect(),
            self.unit,
        )
    }

    /// Translate so the bounding box starts at the origin.
    #[must_use]
    pub fn to_origin(&self) -> Self {
        self.bounds()
            .map_or_else(|| self.clone(), |b| self.translated(-b.x, -b.y))
    }
}

/// Signed shoelace area of an implicitly closed ring.
#[must_use]
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x.mul_add(b.y, -(b.x * a.y))
        })
        .sum();
    twice / 2.0
}

/// An axis-aligned rectangle in continuous coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle containing every point, or `None` if empty.
    #[must_use]
    pub fn enclosing(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(
            self.width.mul_add(0.5, self.x),
            self.height.mul_add(0.5, self.y),
        )
    }

    /// Area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Grow by `pad` on every side.
    #[must_use]
    pub fn padded(&self, pad: f64) -> Self {
        Self::new(
            self.x - pad,
            self.y - pad,
            pad.mul_add(2.0, self.width),
            pad.mul_add(2.0, self.height),
        )
    }

    /// Whether the interiors overlap. Rectangles sharing only an edge
    /// do not intersect.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Whether `other` lies entirely inside `self` (edges inclusive).
    #[must_use]
    pub fn contains_rect(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Smallest rectangle containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }
}

/// Inclusive pixel bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    /// Leftmost column.
    pub min_x: u32,
    /// Topmost row.
    pub min_y: u32,
    /// Rightmost column (inclusive).
    pub max_x: u32,
    /// Bottom row (inclusive).
    pub max_y: u32,
}

impl PixelBox {
    /// A box covering a single pixel.
    #[must_use]
    pub const fn at(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    /// The box covering a whole `width` x `height` grid, or `None` when
    /// either side is zero.
    #[must_use]
    pub const fn full(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            min_x: 0,
            min_y: 0,
            max_x: width - 1,
            max_y: height - 1,
        })
    }

    /// Grow to include `(x, y)`.
    pub fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Clip to a `width` x `height` grid; `None` if nothing remains.
    #[must_use]
    pub fn clamped(&self, width: u32, height: u32) -> Option<Self> {
        let full = Self::full(width, height)?;
        if self.min_x > full.max_x || self.min_y > full.max_y {
            return None;
        }
        Some(Self {
            min_x: self.min_x,
            min_y: self.min_y,
            max_x: self.max_x.min(full.max_x),
            max_y: self.max_y.min(full.max_y),
        })
    }

    /// Number of columns covered.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Number of rows covered.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Bounding box of the non-zero pixels of a bitmap.
    #[must_use]
    pub fn of_foreground(bitmap: &GrayImage) -> Option<Self> {
        let mut bounds: Option<Self> = None;
        for (x, y, pixel) in bitmap.enumerate_pixels() {
            if pixel.0[0] > 0 {
                match bounds.as_mut() {
                    Some(b) => b.include(x, y),
                    None => bounds = Some(Self::at(x, y)),
                }
            }
        }
        bounds
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

/// Tunable parameters for the pixel stages of the pipeline.
///
/// Every field has a default, and missing fields in serialized configs
/// fall back to those defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Minimum connected-region area in pixels. Smaller regions are
    /// treated as noise and discarded.
    pub min_area: u32,

    /// Radius in pixels of the morphological closing that bridges gaps
    /// and shallow concavities.
    pub gap_fill: u8,

    /// Radius in pixels of the final outward dilation that loosens the
    /// cutout fit.
    pub margin: u8,

    /// Smoothing level, 0 through [`Self::MAX_SMOOTHING_LEVEL`].
    pub smoothing_level: u8,

    /// Which boundary tracer to use.
    pub contour_tracer: ContourTracerKind,
}

impl PipelineConfig {
    /// Default for [`min_area`](Self::min_area).
    pub const DEFAULT_MIN_AREA: u32 = 500;
    /// Default for [`gap_fill`](Self::gap_fill).
    pub const DEFAULT_GAP_FILL: u8 = 3;
    /// Default for [`margin`](Self::margin).
    pub const DEFAULT_MARGIN: u8 = 2;
    /// Default for [`smoothing_level`](Self::smoothing_level).
    pub const DEFAULT_SMOOTHING_LEVEL: u8 = 2;
    /// Highest accepted smoothing level.
    pub const MAX_SMOOTHING_LEVEL: u8 = 5;

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `smoothing_level`
    /// exceeds [`Self::MAX_SMOOTHING_LEVEL`].
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.smoothing_level > Self::MAX_SMOOTHING_LEVEL {
            return Err(PipelineError::InvalidConfig(format!(
                "smoothing_level must be at most {}, got {}",
                Self::MAX_SMOOTHING_LEVEL,
                self.smoothing_level
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_area: Self::DEFAULT_MIN_AREA,
            gap_fill: Self::DEFAULT_GAP_FILL,
            margin: Self::DEFAULT_MARGIN,
            smoothing_level: Self::DEFAULT_SMOOTHING_LEVEL,
            contour_tracer: ContourTracerKind::default(),
        }
    }
}

/// One traced, cleaned object outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPolygon {
    /// Index of the source mask in segmentation order.
    pub index: usize,
    /// Closed outline.
    pub polygon: Polygon,
}

/// Counts of objects dropped along the way. None of these are errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drops {
    /// Masks that became empty during refinement.
    pub empty_masks: usize,
    /// Traces shorter than the minimum point count.
    pub too_few_points: usize,
    /// Traces that hit the step cap without closing.
    pub trace_overruns: usize,
    /// Polygons left with fewer than three points after smoothing.
    pub degenerate: usize,
}

impl Drops {
    /// Total number of dropped objects.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.empty_masks + self.too_few_points + self.trace_overruns + self.degenerate
    }
}

/// Output of [`process`](crate::process): every surviving outline, in
/// pixel coordinates, plus what was dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonSet {
    /// Surviving outlines in segmentation order.
    pub objects: Vec<ObjectPolygon>,
    /// Objects discarded by the pixel stages.
    pub drops: Drops,
    /// Dimensions of the source buffer.
    pub dimensions: Dimensions,
}

/// Errors that can occur in the pixel stages of the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// An alpha buffer did not match its declared dimensions.
    #[error("alpha buffer has {actual} bytes, expected {expected}")]
    BufferSize {
        /// `width * height`.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// A stage was timed before it had done any work.
    #[error("stage {0} has no metrics to report")]
    MissingMetrics(&'static str),
}
