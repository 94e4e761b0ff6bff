//! Manufacturing-tolerance offsets.
//!
//! A pocket is cut slightly larger than the traced outline so the item
//! drops in without binding. Two strategies are available:
//!
//! - [`OffsetKind::CentroidScale`] pushes every vertex away from the
//!   vertex centroid by the tolerance. Cheap and exact for convex,
//!   roughly symmetric outlines, but it distorts concave ones (the inner
//!   corner of an L-bracket moves along the wrong direction).
//! - [`OffsetKind::EdgeNormal`] moves every vertex along the bisector of
//!   its two edge normals, so each edge ends up parallel to the original
//!   at the tolerance distance. Sharp spikes are clamped by
//!   [`MITER_LIMIT`].
//!
//! Negative distances shrink instead of grow.

use serde::{Deserialize, Serialize};

use cutout_pipeline::{Point, Polygon};

/// Longest miter, as a multiple of the offset distance.
pub const MITER_LIMIT: f64 = 4.0;

/// Vectors shorter than this are treated as zero.
const EPSILON: f64 = 1e-12;

/// Selects the offset strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OffsetKind {
    /// Isotropic scale about the vertex centroid.
    #[default]
    CentroidScale,

    /// Miter-limited offset along vertex normals.
    EdgeNormal,
}

/// Trait for offset strategies.
pub trait Offsetter {
    /// Grow `polygon` outward by `distance` (shrink if negative).
    fn offset(&self, polygon: &Polygon, distance: f64) -> Polygon;
}

impl Offsetter for OffsetKind {
    fn offset(&self, polygon: &Polygon, distance: f64) -> Polygon {
        match self {
            Self::CentroidScale => centroid_scale(polygon, distance),
            Self::EdgeNormal => edge_normal(polygon, distance),
        }
    }
}

/// Scale every vertex's vector from the centroid by
/// `(length + distance) / length`.
///
/// A vertex that would cross the centroid while shrinking collapses onto
/// it instead.
#[must_use = "returns the offset polygon"]
pub fn centroid_scale(polygon: &Polygon, distance: f64) -> Polygon {
    let Some(c) = polygon.centroid() else {
        return polygon.clone();
    };
    let points = polygon
        .points()
        .iter()
        .map(|&p| {
            let (vx, vy) = (p.x - c.x, p.y - c.y);
            let len = vx.hypot(vy);
            if len < EPSILON {
                return p;
            }
            let factor = ((len + distance) / len).max(0.0);
            Point::new(vx.mul_add(factor, c.x), vy.mul_add(factor, c.y))
        })
        .collect();
    Polygon::new(points, polygon.unit())
}

/// Move every vertex along its outward bisector so adjacent edges end
/// up `distance` away from where they were.
#[must_use = "returns the offset polygon"]
pub fn edge_normal(polygon: &Polygon, distance: f64) -> Polygon {
    let ring = distinct(polygon.points());
    let n = ring.len();
    if n < 3 {
        return polygon.clone();
    }

    // Outward is to the right of travel for a counter-clockwise ring.
    let outward = if polygon.signed_area() >= 0.0 { 1.0 } else { -1.0 };
    let normal = |a: Point, b: Point| {
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len = dx.hypot(dy);
        (outward * dy / len, -outward * dx / len)
    };

    let limit = MITER_LIMIT * distance.abs();
    let points = (0..n)
        .map(|i| {
            let prev = ring[(i + n - 1) % n];
            let here = ring[i];
            let next = ring[(i + 1) % n];
            let n1 = normal(prev, here);
            let n2 = normal(here, next);

            let (mx, my) = (n1.0 + n2.0, n1.1 + n2.1);
            let m_len = mx.hypot(my);
            if m_len < EPSILON {
                // The edges double back on themselves.
                return Point::new(n1.0.mul_add(distance, here.x), n1.1.mul_add(distance, here.y));
            }
            let (ux, uy) = (mx / m_len, my / m_len);
            let cos_half = ux.mul_add(n1.0, uy * n1.1);
            let miter = (distance / cos_half).clamp(-limit, limit);
            Point::new(ux.mul_add(miter, here.x), uy.mul_add(miter, here.y))
        })
        .collect();
    Polygon::new(points, polygon.unit())
}

/// Drop consecutive duplicates, including a closing point equal to the
/// first.
fn distinct(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().is_none_or(|&last| last.distance_squared(p) > EPSILON) {
            out.push(p);
        }
    }
    while out.len() > 1
        && out
            .first()
            .zip(out.last())
            .is_some_and(|(&a, &b)| a.distance_squared(b) <= EPSILON)
    {
        out.pop();
    }
    out
}
