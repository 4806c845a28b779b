use std::cmp::Ordering;

use crate::geometry::Point;

fn cross(o: &Point, a: &Point, b: &Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Graham scan. Returns the hull vertices in counter-clockwise order (y-up)
/// starting from the lowest, then leftmost, point. Collinear boundary points
/// are dropped. Fewer than three points come back unchanged.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let pivot_index = points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let pivot = points[pivot_index];

    let mut rest: Vec<Point> = points
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != pivot_index)
        .map(|(_, p)| *p)
        .collect();

    rest.sort_by(|a, b| {
        let angle_a = (a.y - pivot.y).atan2(a.x - pivot.x);
        let angle_b = (b.y - pivot.y).atan2(b.x - pivot.x);
        match angle_a.total_cmp(&angle_b) {
            Ordering::Equal => pivot.distance_to(a).total_cmp(&pivot.distance_to(b)),
            other => other,
        }
    });

    let mut hull: Vec<Point> = Vec::with_capacity(points.len());
    hull.push(pivot);
    for p in rest {
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], &p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::area;

    #[test]
    fn test_square_with_interior_points() {
        let mut pts = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
        ];
        pts.extend([
            Point::new(5.0, 5.0),
            Point::new(2.0, 3.0),
            Point::new(7.0, 1.0),
            Point::new(9.0, 9.0),
            Point::new(1.0, 8.0),
        ]);
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        for corner in &pts[..4] {
            assert!(hull.contains(corner));
        }
        assert!((area(&hull) - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_small_input_unchanged() {
        let pts = vec![Point::new(3.0, 3.0), Point::new(1.0, 1.0)];
        assert_eq!(convex_hull(&pts), pts);
    }

    #[test]
    fn test_collinear_points_dropped() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point::new(5.0, 0.0)));
    }

    #[test]
    fn test_hull_starts_at_lowest_leftmost() {
        let pts = vec![
            Point::new(4.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(2.0, 5.0),
        ];
        assert_eq!(convex_hull(&pts)[0], Point::new(0.0, 0.0));
    }
}
