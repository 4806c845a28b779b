use crate::geometry::Point;

use super::signed_area;

/// Outward unit normal of the edge `a→b` for a ring with the given orientation.
fn outward_normal(a: &Point, b: &Point, counter_clockwise: bool) -> (f64, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return (0.0, 0.0);
    }
    if counter_clockwise {
        (dy / len, -dx / len)
    } else {
        (-dy / len, dx / len)
    }
}

/// Offset every vertex outward by `distance` along the bisector of its two
/// edge normals. This is an approximation of a Minkowski buffer: sharp
/// corners come out shorter than a true miter.
///
/// With `segments > 1`, convex corners are replaced by a round join of
/// `segments` points swept between the two edge normals.
///
/// Returns an unchanged copy for `distance <= 0` or fewer than three points.
pub fn buffer_polygon(points: &[Point], distance: f64, segments: usize) -> Vec<Point> {
    if !(distance > 0.0) || points.len() < 3 {
        return points.to_vec();
    }

    let n = points.len();
    let ccw = signed_area(points) > 0.0;
    let mut out = Vec::with_capacity(n * segments.max(1));

    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];

        let n_prev = outward_normal(&prev, &cur, ccw);
        let n_next = outward_normal(&cur, &next, ccw);

        let turn = (cur.x - prev.x) * (next.y - cur.y) - (cur.y - prev.y) * (next.x - cur.x);
        let convex = if ccw { turn > 0.0 } else { turn < 0.0 };

        if segments > 1 && convex {
            let start = n_prev.1.atan2(n_prev.0);
            let mut sweep = n_next.1.atan2(n_next.0) - start;
            while sweep > std::f64::consts::PI {
                sweep -= std::f64::consts::TAU;
            }
            while sweep <= -std::f64::consts::PI {
                sweep += std::f64::consts::TAU;
            }
            for k in 0..segments {
                let angle = start + sweep * k as f64 / (segments - 1) as f64;
                out.push(Point::new(
                    cur.x + angle.cos() * distance,
                    cur.y + angle.sin() * distance,
                ));
            }
            continue;
        }

        let mut bx = n_prev.0 + n_next.0;
        let mut by = n_prev.1 + n_next.1;
        let len = (bx * bx + by * by).sqrt();
        if len < 1e-12 {
            (bx, by) = n_prev;
        } else {
            bx /= len;
            by /= len;
        }
        out.push(Point::new(cur.x + bx * distance, cur.y + by * distance));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{area, point_in_polygon};

    fn ccw_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_buffer_grows_either_winding() {
        let sq = ccw_square();
        let mut cw = sq.clone();
        cw.reverse();
        for ring in [sq, cw] {
            let grown = buffer_polygon(&ring, 1.0, 1);
            assert_eq!(grown.len(), 4);
            assert!(area(&grown) > area(&ring));
            for (a, b) in ring.iter().zip(&grown) {
                assert!((a.distance_to(b) - 1.0).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_bisector_direction() {
        let grown = buffer_polygon(&ccw_square(), 2.0_f64.sqrt(), 1);
        assert!((grown[0].x + 1.0).abs() < 1e-10);
        assert!((grown[0].y + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_round_join() {
        let grown = buffer_polygon(&ccw_square(), 1.0, 5);
        assert_eq!(grown.len(), 20);
        for p in &grown {
            assert!(!point_in_polygon(p, &ccw_square()));
        }
        // Each side moves out by the full distance.
        assert!(area(&grown) > 100.0 + 4.0 * 10.0);
    }

    #[test]
    fn test_noop_cases() {
        let sq = ccw_square();
        assert_eq!(buffer_polygon(&sq, 0.0, 1), sq);
        assert_eq!(buffer_polygon(&sq, -2.0, 1), sq);
        assert_eq!(buffer_polygon(&sq, f64::NAN, 1), sq);
        assert_eq!(buffer_polygon(&sq[..2], 3.0, 1), sq[..2].to_vec());
    }
}
