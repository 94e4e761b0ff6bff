//! Point-in-polygon hit testing for interactive selection.

use crate::types::Point;

/// Whether `point` lies inside the closed ring `polygon`.
///
/// Even-odd ray casting: a horizontal ray from `point` toward +x crosses
/// the boundary an odd number of times iff the point is inside. Points
/// exactly on an edge may land on either side. Rings with fewer than
/// three points contain nothing.
#[must_use]
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for (i, &a) in polygon.iter().enumerate() {
        let b = polygon[j];
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ]
    }

    /// L shape: a 4x4 square missing its top-right 2x2 quadrant.
    fn ell() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(4.0, 2.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ]
    }

    #[test]
    fn center_is_inside() {
        assert!(point_in_polygon(Point::new(2.0, 2.0), &square()));
    }

    #[test]
    fn outside_points_are_outside() {
        let sq = square();
        assert!(!point_in_polygon(Point::new(-1.0, 2.0), &sq));
        assert!(!point_in_polygon(Point::new(5.0, 2.0), &sq));
        assert!(!point_in_polygon(Point::new(2.0, 9.0), &sq));
    }

    #[test]
    fn concave_notch_is_outside() {
        let l = ell();
        assert!(!point_in_polygon(Point::new(3.0, 1.0), &l));
        assert!(point_in_polygon(Point::new(1.0, 1.0), &l));
        assert!(point_in_polygon(Point::new(3.0, 3.0), &l));
    }

    #[test]
    fn winding_direction_does_not_matter() {
        let mut sq = square();
        sq.reverse();
        assert!(point_in_polygon(Point::new(1.0, 3.0), &sq));
    }

    #[test]
    fn degenerate_ring_contains_nothing() {
        let line = [Point::new(0.0, 0.0), Point::new(4.0, 4.0)];
        assert!(!point_in_polygon(Point::new(2.0, 2.0), &line));
        assert!(!point_in_polygon(Point::new(0.0, 0.0), &[]));
    }
}
