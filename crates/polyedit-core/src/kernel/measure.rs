use crate::geometry::Point;

/// Shoelace sum over the implicitly closed ring, halved. Positive for
/// counter-clockwise rings in a y-up frame.
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

/// Unsigned polygon area. Zero for fewer than three points.
pub fn area(points: &[Point]) -> f64 {
    signed_area(points).abs()
}

/// Length of the closed ring, wrapping from the last point back to the first.
pub fn perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let open: f64 = points.windows(2).map(|w| w[0].distance_to(&w[1])).sum();
    open + points[points.len() - 1].distance_to(&points[0])
}

/// Clockwise in a y-up frame, i.e. twice the signed area is negative.
/// Inputs with at most one point count as clockwise.
pub fn is_clockwise(points: &[Point]) -> bool {
    if points.len() <= 1 {
        return true;
    }
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += (b.x - a.x) * (b.y + a.y);
    }
    sum > 0.0
}

/// Even-odd ray casting. Points exactly on an edge resolve consistently for
/// a given input but may land on either side.
pub fn point_in_polygon(point: &Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Area centroid of the ring, or the vertex mean when the area vanishes.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let a = signed_area(points);
    if a.abs() > 1e-12 {
        let n = points.len();
        let (mut cx, mut cy) = (0.0, 0.0);
        for i in 0..n {
            let p = points[i];
            let q = points[(i + 1) % n];
            let cross = p.x * q.y - q.x * p.y;
            cx += (p.x + q.x) * cross;
            cy += (p.y + q.y) * cross;
        }
        return Some(Point::new(cx / (6.0 * a), cy / (6.0 * a)));
    }
    let count = points.len() as f64;
    let sx: f64 = points.iter().map(|p| p.x).sum();
    let sy: f64 = points.iter().map(|p| p.y).sum();
    Some(Point::new(sx / count, sy / count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
            Point::new(100.0, 0.0),
        ]
    }

    #[test]
    fn test_area_of_square() {
        assert!((area(&square()) - 10_000.0).abs() < 1e-10);
    }

    #[test]
    fn test_area_degenerate() {
        assert_eq!(area(&[]), 0.0);
        assert_eq!(area(&[Point::new(5.0, 5.0)]), 0.0);
        assert_eq!(area(&[Point::new(5.0, 5.0), Point::new(6.0, 6.0)]), 0.0);
    }

    #[test]
    fn test_area_winding_and_rotation_invariant() {
        let pts = vec![
            Point::new(1.0, 1.0),
            Point::new(7.0, 2.0),
            Point::new(9.0, 8.0),
            Point::new(3.0, 6.0),
            Point::new(2.0, 4.0),
        ];
        let mut reversed = pts.clone();
        reversed.reverse();
        let mut rotated = pts.clone();
        rotated.rotate_left(2);
        assert!((area(&pts) - area(&reversed)).abs() < 1e-10);
        assert!((area(&pts) - area(&rotated)).abs() < 1e-10);
    }

    #[test]
    fn test_area_non_finite_propagates() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(f64::NAN, 1.0),
            Point::new(1.0, 1.0),
        ];
        assert!(area(&pts).is_nan());
    }

    #[test]
    fn test_perimeter() {
        assert!((perimeter(&square()) - 400.0).abs() < 1e-10);
        assert_eq!(perimeter(&[Point::new(1.0, 1.0)]), 0.0);
        let two = [Point::new(0.0, 0.0), Point::new(3.0, 4.0)];
        assert!((perimeter(&two) - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_is_clockwise() {
        // (0,0) -> (0,100) -> (100,100) -> (100,0) turns right in a y-up frame.
        assert!(is_clockwise(&square()));
        let mut ccw = square();
        ccw.reverse();
        assert!(!is_clockwise(&ccw));
        assert!(is_clockwise(&[]));
        assert!(is_clockwise(&[Point::new(3.0, 3.0)]));
    }

    #[test]
    fn test_point_in_polygon() {
        let sq = square();
        assert!(point_in_polygon(&Point::new(50.0, 50.0), &sq));
        assert!(!point_in_polygon(&Point::new(150.0, 50.0), &sq));
        assert!(!point_in_polygon(&Point::new(50.0, 50.0), &sq[..2]));
        assert!(!point_in_polygon(&Point::new(f64::NAN, 50.0), &sq));
        let edge = Point::new(0.0, 50.0);
        assert_eq!(point_in_polygon(&edge, &sq), point_in_polygon(&edge, &sq));
    }

    #[test]
    fn test_centroid() {
        let c = centroid(&square()).unwrap();
        assert!((c.x - 50.0).abs() < 1e-9);
        assert!((c.y - 50.0).abs() < 1e-9);
        assert!(centroid(&[]).is_none());
        let line = [Point::new(0.0, 0.0), Point::new(2.0, 0.0)];
        assert_eq!(centroid(&line), Some(Point::new(1.0, 0.0)));
    }
}
