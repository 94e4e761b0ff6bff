//! Polygon simplification and smoothing.
//!
//! Traced outlines follow the pixel staircase and carry far more points
//! than the cutter needs. [`smooth_polygon`] reduces them in two passes
//! controlled by a single smoothing level `L` (0 to 5):
//!
//! 1. Ramer-Douglas-Peucker with tolerance `0.02 * L`.
//! 2. Up to `min(L, 2)` rounds of Chaikin corner cutting.
//!
//! If the result still exceeds [`MAX_SMOOTHED_POINTS`], it is simplified
//! once more with [`RESIMPLIFY_TOLERANCE`]. The output never has more
//! points than the input.

use crate::types::{Point, Polygon};

/// Tolerance added per smoothing level.
pub const TOLERANCE_PER_LEVEL: f64 = 0.02;

/// Most Chaikin rounds ever applied.
pub const MAX_CHAIKIN_PASSES: u8 = 2;

/// Point budget after smoothing.
pub const MAX_SMOOTHED_POINTS: usize = 200;

/// Tolerance of the extra pass used when the budget is exceeded.
pub const RESIMPLIFY_TOLERANCE: f64 = 0.01;

/// Why a polygon did not survive smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("smoothed polygon has {count} points, need at least 3")]
pub struct DegeneratePolygon {
    /// Points left after smoothing.
    pub count: usize,
}

/// Simplify then smooth a closed polygon at the given level.
///
/// # Errors
///
/// Returns [`DegeneratePolygon`] if fewer than three points remain.
pub fn smooth_polygon(polygon: &Polygon, level: u8) -> Result<Polygon, DegeneratePolygon> {
    let input_len = polygon.len();
    let tolerance = TOLERANCE_PER_LEVEL * f64::from(level);
    let mut points = simplify_points(polygon.points(), tolerance);

    // Chaikin doubles the point count; stop early rather than exceed
    // the input.
    for _ in 0..level.min(MAX_CHAIKIN_PASSES) {
        if points.len() < 3 || points.len() * 2 > input_len {
            break;
        }
        points = chaikin(&points);
    }

    if points.len() > MAX_SMOOTHED_POINTS {
        points = simplify_points(&points, RESIMPLIFY_TOLERANCE);
    }

    if points.len() < 3 {
        return Err(DegeneratePolygon {
            count: points.len(),
        });
    }
    Ok(Polygon::new(points, polygon.unit()))
}

/// Simplify a closed polygon with Ramer-Douglas-Peucker.
///
/// The ring is treated as an open chain from its first to its last
/// vertex (the closing edge is implicit), so both of those vertices are
/// always kept. Points within `tolerance` of the chord are removed.
#[must_use = "returns the simplified polygon"]
pub fn simplify(polygon: &Polygon, tolerance: f64) -> Polygon {
    Polygon::new(simplify_points(polygon.points(), tolerance), polygon.unit())
}

/// One round of Chaikin corner cutting over a closed ring.
///
/// Every edge `p0 -> p1`, including the closing edge, is replaced by the
/// points at 1/4 and 3/4 along it.
#[must_use = "returns the smoothed polygon"]
pub fn chaikin_pass(polygon: &Polygon) -> Polygon {
    Polygon::new(chaikin(polygon.points()), polygon.unit())
}

fn simplify_points(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    rdp_recurse(points, 0, points.len() - 1, tolerance, &mut kept);

    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

fn chaikin(points: &[Point]) -> Vec<Point> {
    let n = points.len();
    let mut out = Vec::with_capacity(n * 2);
    for (i, &p0) in points.iter().enumerate() {
        let p1 = points[(i + 1) % n];
        out.push(p0.lerp(p1, 0.25));
        out.push(p0.lerp(p1, 0.75));
    }
    out
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// chord between them. If that distance exceeds `tolerance`, the point
/// is kept and both halves are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line through `a` and `b`.
///
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Unit;

    /// Pixel staircase around a `w` x `h` rectangle, like a raw trace.
    #[allow(clippy::cast_precision_loss)]
    fn pixel_rectangle(w: u32, h: u32) -> Polygon {
        let mut pts = Vec::new();
        for x in 0..w {
            pts.push(Point::new(f64::from(x), 0.0));
        }
        for y in 1..h {
            pts.push(Point::new(f64::from(w - 1), f64::from(y)));
        }
        for x in (0..w - 1).rev() {
            pts.push(Point::new(f64::from(x), f64::from(h - 1)));
        }
        for y in (1..h - 1).rev() {
            pts.push(Point::new(0.0, f64::from(y)));
        }
        Polygon::pixels(pts)
    }

    /// Jagged circle with `n` vertices.
    #[allow(clippy::cast_precision_loss)]
    fn noisy_circle(n: usize) -> Polygon {
        let pts = (0..n)
            .map(|i| {
                let t = i as f64 / n as f64 * std::f64::consts::TAU;
                let r = if i % 2 == 0 { 100.0 } else { 99.0 };
                Point::new(r * t.cos() + 150.0, r * t.sin() + 150.0)
            })
            .collect();
        Polygon::pixels(pts)
    }

    #[test]
    fn collinear_points_collapse_to_endpoints() {
        let pl = Polygon::pixels(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(3.0, 3.0),
            Point::new(4.0, 4.0),
        ]);
        let result = simplify(&pl, 0.1);
        assert_eq!(result.len(), 2);
        assert_eq!(result.points()[0], Point::new(0.0, 0.0));
        assert_eq!(result.points()[1], Point::new(4.0, 4.0));
    }

    #[test]
    fn zigzag_retains_peaks() {
        let pl = Polygon::pixels(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 5.0),
            Point::new(4.0, 0.0),
            Point::new(6.0, 5.0),
            Point::new(8.0, 0.0),
        ]);
        assert_eq!(simplify(&pl, 1.0).len(), 5);
        assert_eq!(simplify(&pl, 10.0).len(), 2);
    }

    #[test]
    fn chaikin_pass_doubles_and_cuts_corners() {
        let square = Polygon::inches(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ]);
        let cut = chaikin_pass(&square);
        assert_eq!(cut.len(), 8);
        assert_eq!(cut.unit(), Unit::Inch);
        assert_eq!(cut.points()[0], Point::new(1.0, 0.0));
        assert_eq!(cut.points()[1], Point::new(3.0, 0.0));
        // Closing edge (0,4) -> (0,0) is cut too.
        assert_eq!(cut.points()[7], Point::new(0.0, 1.0));
    }

    #[test]
    fn rectangle_trace_reduces_to_corners_and_rounds() {
        let raw = pixel_rectangle(40, 20);
        let smoothed = smooth_polygon(&raw, 2).unwrap();
        assert!(smoothed.len() < raw.len());
        // Straight runs collapse; the corners survive, then get cut.
        assert!(smoothed.len() <= 4 * 4 * 2);
        for corner in [Point::new(39.0, 0.0), Point::new(39.0, 19.0)] {
            assert!(
                !smoothed.points().contains(&corner),
                "corner {corner:?} should be cut"
            );
        }
    }

    #[test]
    fn level_zero_only_drops_collinear_points() {
        let raw = pixel_rectangle(10, 10);
        let smoothed = smooth_polygon(&raw, 0).unwrap();
        assert_eq!(smoothed.len(), 5);
    }

    #[test]
    fn output_never_exceeds_input() {
        for level in 0..=5 {
            for poly in [pixel_rectangle(30, 12), noisy_circle(600), noisy_circle(40)] {
                let out = smooth_polygon(&poly, level).unwrap();
                assert!(
                    out.len() <= poly.len(),
                    "level {level}: {} > {}",
                    out.len(),
                    poly.len()
                );
            }
        }
    }

    #[test]
    fn dense_smooth_outline_is_reduced() {
        let pts = (0..2000)
            .map(|i| {
                let t = f64::from(i) / 2000.0 * std::f64::consts::TAU;
                Point::new(100.0f64.mul_add(t.cos(), 150.0), 100.0f64.mul_add(t.sin(), 150.0))
            })
            .collect();
        let poly = Polygon::pixels(pts);
        let out = smooth_polygon(&poly, 1).unwrap();
        assert!(out.len() < poly.len() / 2, "got {} points", out.len());
    }

    #[test]
    fn degenerate_input_is_rejected() {
        let line = Polygon::pixels(vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0)]);
        assert_eq!(
            smooth_polygon(&line, 3),
            Err(DegeneratePolygon { count: 2 })
        );
    }

    #[test]
    fn smoothing_is_deterministic() {
        let poly = noisy_circle(500);
        assert_eq!(smooth_polygon(&poly, 4), smooth_polygon(&poly, 4));
    }

    #[test]
    fn perpendicular_distance_diagonal_segment() {
        let d = perpendicular_distance(
            Point::new(2.0, -1.0),
            Point::new(0.0, 0.0),
            Point::new(4.0, 2.0),
        );
        let expected = 8.0 / 20.0_f64.sqrt();
        assert!((d - expected).abs() < 1e-10, "got {d}, expected {expected}");
    }

    #[test]
    fn perpendicular_distance_coincident_endpoints() {
        let d = perpendicular_distance(
            Point::new(3.0, 4.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
        );
        assert!((d - 5.0).abs() < 1e-10);
    }
}
