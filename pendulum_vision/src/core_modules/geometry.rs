// THEORY:
// Plane geometry for the blob stage: image-plane points, circles, and the minimal
// enclosing circle of a point set.
//
// The enclosing circle is computed on the convex hull of the input (only hull points
// can touch the optimal circle), then with the incremental Welzl construction. The
// hull comes from `imageproc`; neither it nor `image` has an enclosing-circle routine,
// so that last step is local. A boundary of a few hundred pixels usually has a hull of
// a few dozen points, which keeps the cubic worst case of the construction irrelevant.

use imageproc::point::Point;
use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-7;

/// A point in image coordinates (x right, y down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point2,
    pub radius: f64,
}

impl Circle {
    pub fn contains(&self, p: Point2) -> bool {
        self.center.distance_to(p) <= self.radius + EPSILON
    }

    fn from_diameter(a: Point2, b: Point2) -> Self {
        let center = Point2::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
        Self {
            center,
            radius: center.distance_to(a).max(center.distance_to(b)),
        }
    }

    /// Circumcircle of three points, or the widest diameter circle if they are collinear.
    fn from_triangle(a: Point2, b: Point2, c: Point2) -> Self {
        let (bx, by) = (b.x - a.x, b.y - a.y);
        let (cx, cy) = (c.x - a.x, c.y - a.y);
        let d = 2.0 * (bx * cy - by * cx);
        if d.abs() < EPSILON {
            return [
                Self::from_diameter(a, b),
                Self::from_diameter(a, c),
                Self::from_diameter(b, c),
            ]
            .into_iter()
            .fold(Self::from_diameter(a, b), |best, next| {
                if next.radius > best.radius { next } else { best }
            });
        }
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (cy * b2 - by * c2) / d;
        let uy = (bx * c2 - cx * b2) / d;
        let center = Point2::new(a.x + ux, a.y + uy);
        Self {
            center,
            radius: center
                .distance_to(a)
                .max(center.distance_to(b))
                .max(center.distance_to(c)),
        }
    }
}

/// Convex hull vertices of a pixel set, via `imageproc`. Duplicates are removed first;
/// sets of fewer than three distinct points are returned as they are.
pub fn convex_hull(points: &[(i32, i32)]) -> Vec<(i32, i32)> {
    let mut pts = points.to_vec();
    pts.sort_unstable();
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }
    let pts: Vec<Point<i32>> = pts.into_iter().map(|(x, y)| Point::new(x, y)).collect();
    imageproc::geometry::convex_hull(pts.as_slice())
        .into_iter()
        .map(|p| (p.x, p.y))
        .collect()
}

/// Incremental Welzl construction over `points`.
fn welzl(points: &[Point2]) -> Option<Circle> {
    let first = *points.first()?;
    let mut circle = Circle {
        center: first,
        radius: 0.0,
    };
    for i in 1..points.len() {
        if circle.contains(points[i]) {
            continue;
        }
        circle = Circle {
            center: points[i],
            radius: 0.0,
        };
        for j in 0..i {
            if circle.contains(points[j]) {
                continue;
            }
            circle = Circle::from_diameter(points[i], points[j]);
            for k in 0..j {
                if !circle.contains(points[k]) {
                    circle = Circle::from_triangle(points[i], points[j], points[k]);
                }
            }
        }
    }
    Some(circle)
}

/// Smallest circle containing every point. `None` for an empty set.
pub fn min_enclosing_circle(points: &[(i32, i32)]) -> Option<Circle> {
    let to_point = |&(x, y): &(i32, i32)| Point2::new(x as f64, y as f64);
    let hull: Vec<Point2> = convex_hull(points).iter().map(to_point).collect();
    let circle = welzl(&hull)?;
    if points.iter().map(to_point).all(|p| circle.contains(p)) {
        return Some(circle);
    }
    // Degenerate hull output (collinear input): solve on the full set.
    let all: Vec<Point2> = points.iter().map(to_point).collect();
    welzl(&all)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn hull_keeps_corners_and_drops_interior_points() {
        let square = [(0, 0), (2, 0), (2, 2), (0, 2), (1, 1), (0, 0)];
        let hull = convex_hull(&square);
        assert_eq!(hull.len(), 4);
        for corner in [(0, 0), (2, 0), (2, 2), (0, 2)] {
            assert!(hull.contains(&corner));
        }
        assert!(!hull.contains(&(1, 1)));
    }

    #[test]
    fn collinear_pixels_are_still_enclosed() {
        let line: Vec<(i32, i32)> = (0..=20).map(|x| (x, 3)).collect();
        let c = min_enclosing_circle(&line).unwrap();
        assert!(close(c.center.x, 10.0) && close(c.center.y, 3.0));
        assert!(close(c.radius, 10.0));
    }

    #[test]
    fn empty_and_single_point_sets() {
        assert!(min_enclosing_circle(&[]).is_none());
        let c = min_enclosing_circle(&[(5, 7)]).unwrap();
        assert_eq!(c.center, Point2::new(5.0, 7.0));
        assert_eq!(c.radius, 0.0);
    }

    #[test]
    fn two_points_span_a_diameter() {
        let c = min_enclosing_circle(&[(0, 0), (10, 0)]).unwrap();
        assert!(close(c.center.x, 5.0) && close(c.center.y, 0.0));
        assert!(close(c.radius, 5.0));
    }

    #[test]
    fn circle_through_a_plus_shape() {
        let c = min_enclosing_circle(&[(10, 0), (0, 10), (-10, 0), (0, -10), (3, 4)]).unwrap();
        assert!(close(c.center.x, 0.0) && close(c.center.y, 0.0));
        assert!(close(c.radius, 10.0));
    }

    #[test]
    fn obtuse_triangle_uses_its_longest_side() {
        let c = min_enclosing_circle(&[(0, 0), (10, 0), (5, 1)]).unwrap();
        assert!(close(c.center.x, 5.0) && close(c.center.y, 0.0));
        assert!(close(c.radius, 5.0));
    }

    #[test]
    fn every_point_is_enclosed() {
        let points: Vec<(i32, i32)> = (0..50).map(|i| ((i * 37) % 23, (i * 11) % 29)).collect();
        let c = min_enclosing_circle(&points).unwrap();
        for (x, y) in points {
            assert!(c.contains(Point2::new(x as f64, y as f64)));
        }
    }
}
