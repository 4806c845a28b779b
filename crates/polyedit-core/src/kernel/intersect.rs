use serde::{Deserialize, Serialize};

use crate::geometry::Point;

use super::PARALLEL_EPSILON;

/// Hits this close to an edge end snap onto the vertex.
const VERTEX_SNAP: f64 = 1e-9;

/// Where a cutting segment crosses one edge of a ring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeHit {
    /// Edge `i` runs from vertex `i` to vertex `i + 1` (wrapping).
    pub edge_index: usize,
    /// Position along the edge, in `[0, 1)`.
    pub edge_t: f64,
    /// Position along the cutting segment, in `[0, 1]`.
    pub line_t: f64,
    pub point: Point,
}

/// Parameters `(t, u)` of the crossing of `p1→p2` with `p3→p4`, both within `[0, 1]`.
fn crossing_params(p1: &Point, p2: &Point, p3: &Point, p4: &Point) -> Option<(f64, f64)> {
    let d1x = p2.x - p1.x;
    let d1y = p2.y - p1.y;
    let d2x = p4.x - p3.x;
    let d2y = p4.y - p3.y;
    let det = d1x * d2y - d1y * d2x;
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }
    let ox = p3.x - p1.x;
    let oy = p3.y - p1.y;
    let t = (ox * d2y - oy * d2x) / det;
    let u = (ox * d1y - oy * d1x) / det;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some((t, u))
    } else {
        None
    }
}

/// Intersection point of segments `p1→p2` and `p3→p4`, if they cross.
pub fn line_intersection(p1: &Point, p2: &Point, p3: &Point, p4: &Point) -> Option<Point> {
    crossing_params(p1, p2, p3, p4)
        .map(|(t, _)| Point::new(p1.x + t * (p2.x - p1.x), p1.y + t * (p2.y - p1.y)))
}

/// Every crossing of `start→end` with the edges of the closed ring `points`,
/// ordered by edge.
///
/// Edges are half-open, so a cut through a vertex is reported once, as a hit
/// at `edge_t == 0` on the edge leaving that vertex.
pub fn segment_intersections(points: &[Point], start: &Point, end: &Point) -> Vec<EdgeHit> {
    let n = points.len();
    if n < 2 {
        return Vec::new();
    }
    let mut hits: Vec<EdgeHit> = Vec::new();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let Some((line_t, edge_t)) = crossing_params(start, end, &a, &b) else {
            continue;
        };
        let hit = if edge_t >= 1.0 - VERTEX_SNAP {
            EdgeHit {
                edge_index: (i + 1) % n,
                edge_t: 0.0,
                line_t,
                point: b,
            }
        } else if edge_t <= VERTEX_SNAP {
            EdgeHit {
                edge_index: i,
                edge_t: 0.0,
                line_t,
                point: a,
            }
        } else {
            EdgeHit {
                edge_index: i,
                edge_t,
                line_t,
                point: Point::new(a.x + edge_t * (b.x - a.x), a.y + edge_t * (b.y - a.y)),
            }
        };
        hits.push(hit);
    }
    hits.sort_by(|a, b| {
        a.edge_index
            .cmp(&b.edge_index)
            .then(a.edge_t.total_cmp(&b.edge_t))
    });
    hits.dedup_by(|a, b| a.edge_index == b.edge_index && a.edge_t == 0.0 && b.edge_t == 0.0);
    hits
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
    fn test_crossing_segments() {
        let p = line_intersection(
            &Point::new(0.0, 0.0),
            &Point::new(10.0, 10.0),
            &Point::new(0.0, 10.0),
            &Point::new(10.0, 0.0),
        )
        .unwrap();
        assert!((p.x - 5.0).abs() < 1e-10);
        assert!((p.y - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_parallel_and_disjoint() {
        let parallel = line_intersection(
            &Point::new(0.0, 0.0),
            &Point::new(10.0, 0.0),
            &Point::new(0.0, 1.0),
            &Point::new(10.0, 1.0),
        );
        assert!(parallel.is_none());
        let short = line_intersection(
            &Point::new(0.0, 0.0),
            &Point::new(1.0, 1.0),
            &Point::new(0.0, 10.0),
            &Point::new(10.0, 0.0),
        );
        assert!(short.is_none());
        let degenerate = line_intersection(
            &Point::new(1.0, 1.0),
            &Point::new(1.0, 1.0),
            &Point::new(0.0, 10.0),
            &Point::new(10.0, 0.0),
        );
        assert!(degenerate.is_none());
    }

    #[test]
    fn test_nan_yields_none() {
        let p = line_intersection(
            &Point::new(f64::NAN, 0.0),
            &Point::new(10.0, 10.0),
            &Point::new(0.0, 10.0),
            &Point::new(10.0, 0.0),
        );
        assert!(p.is_none());
    }

    #[test]
    fn test_segment_crosses_square_twice() {
        let hits = segment_intersections(&square(), &Point::new(-10.0, 50.0), &Point::new(110.0, 50.0));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].edge_index, 0);
        assert_eq!(hits[1].edge_index, 2);
        assert!((hits[0].point.y - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_cut_through_vertex_counts_once() {
        // Diagonal through (0,0) and (100,100).
        let hits = segment_intersections(&square(), &Point::new(-10.0, -10.0), &Point::new(110.0, 110.0));
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.edge_t == 0.0));
        assert_eq!(hits[0].point, Point::new(0.0, 0.0));
        assert_eq!(hits[1].point, Point::new(100.0, 100.0));
    }
}
