use crate::geometry::Point;

use super::CLOSURE_EPSILON;

/// Distance from `p` to the line through `a` and `b`, or to `a` itself when
/// the chord has no length (closed rings start and end on the same point).
fn perpendicular_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return p.distance_to(a);
    }
    ((dy * p.x - dx * p.y + b.x * a.y - b.y * a.x) / len).abs()
}

/// Ramer-Douglas-Peucker reduction.
///
/// The recursion is unrolled onto an explicit stack of `(first, last)` ranges
/// so outlines with tens of thousands of vertices cannot overflow the thread
/// stack. Each range keeps its farthest point when that point is more than
/// `tolerance` from the chord; the kept flags are then read off in order,
/// which is the same splice the recursive formulation produces.
///
/// With `preserve_topology`, an input whose first and last points coincide
/// (within 1e-3) comes back closed as well.
pub fn simplify(points: &[Point], tolerance: f64, preserve_topology: bool) -> Vec<Point> {
    if points.len() <= 3 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut stack = vec![(0usize, last)];
    while let Some((first, end)) = stack.pop() {
        if end <= first + 1 {
            continue;
        }
        let mut max_dist = 0.0;
        let mut index = first;
        for i in (first + 1)..end {
            let d = perpendicular_distance(&points[i], &points[first], &points[end]);
            if d > max_dist {
                max_dist = d;
                index = i;
            }
        }
        if max_dist > tolerance && index != first {
            keep[index] = true;
            stack.push((index, end));
            stack.push((first, index));
        }
    }

    let mut result: Vec<Point> = points
        .iter()
        .zip(&keep)
        .filter(|(_, k)| **k)
        .map(|(p, _)| *p)
        .collect();

    let was_closed = points[0].distance_to(&points[last]) < CLOSURE_EPSILON;
    if preserve_topology && was_closed {
        if let Some(tail) = result.last_mut() {
            *tail = points[0];
        }
    }
    result
}
