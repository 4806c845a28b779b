use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{BBox, Point, Polygon};

use super::{area, centroid, segment_intersections, EdgeHit};

/// Cutting segments shorter than this are rejected.
pub const MIN_SLICE_LENGTH: f64 = 1.0;

const REFINE_ITERATIONS: usize = 40;

/// Why a slice line cannot split a polygon.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SliceRejection {
    #[error("insufficient polygon points")]
    InsufficientPoints,
    #[error("slice line too short")]
    LineTooShort,
    #[error("expected 2 intersections, found {0}")]
    IntersectionCount(usize),
    #[error("slice produces a degenerate part")]
    DegeneratePart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceValidation {
    pub is_valid: bool,
    pub intersection_count: usize,
    pub reason: Option<SliceRejection>,
}

/// The most even split found by [`find_balanced_slice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancedSlice {
    pub line_start: Point,
    pub line_end: Point,
    pub parts: (Polygon, Polygon),
    /// `|area(A) - area(B)|`.
    pub imbalance: f64,
}

/// Splits the ring at two hits. Part A runs from the first hit forward to the
/// second, part B continues from the second hit around to the first. A hit
/// sitting on a vertex replaces that vertex rather than duplicating it.
fn split_at(points: &[Point], first: &EdgeHit, second: &EdgeHit) -> (Vec<Point>, Vec<Point>) {
    let n = points.len();
    let a = first.edge_index;
    let b = second.edge_index;

    let mut part_a = Vec::with_capacity(b - a + 2);
    part_a.push(first.point);
    let a_end = if second.edge_t == 0.0 { b } else { b + 1 };
    part_a.extend_from_slice(&points[(a + 1).min(a_end)..a_end]);
    part_a.push(second.point);

    let mut part_b = Vec::with_capacity(n - (b - a) + 2);
    part_b.push(second.point);
    part_b.extend_from_slice(&points[b + 1..]);
    let b_end = if first.edge_t == 0.0 { a } else { a + 1 };
    part_b.extend_from_slice(&points[..b_end]);
    part_b.push(first.point);

    (part_a, part_b)
}

fn plan_slice(
    points: &[Point],
    start: &Point,
    end: &Point,
) -> (usize, Result<(Vec<Point>, Vec<Point>), SliceRejection>) {
    let hits = segment_intersections(points, start, end);
    let count = hits.len();
    if points.len() < 3 {
        return (count, Err(SliceRejection::InsufficientPoints));
    }
    if !(start.distance_to(end) >= MIN_SLICE_LENGTH) {
        return (count, Err(SliceRejection::LineTooShort));
    }
    if count != 2 {
        return (count, Err(SliceRejection::IntersectionCount(count)));
    }
    let (part_a, part_b) = split_at(points, &hits[0], &hits[1]);
    if part_a.len() < 3 || part_b.len() < 3 {
        return (count, Err(SliceRejection::DegeneratePart));
    }
    (count, Ok((part_a, part_b)))
}

/// Checks whether `start→end` cuts `polygon` into exactly two parts.
pub fn validate_slice_line(polygon: &Polygon, start: &Point, end: &Point) -> SliceValidation {
    let (intersection_count, plan) = plan_slice(&polygon.points, start, end);
    match plan {
        Ok(_) => SliceValidation {
            is_valid: true,
            intersection_count,
            reason: None,
        },
        Err(reason) => SliceValidation {
            is_valid: false,
            intersection_count,
            reason: Some(reason),
        },
    }
}

/// Cuts `polygon` along `start→end`.
///
/// Only a line crossing the outline exactly twice is a valid cut; anything
/// else returns `None` rather than a best-effort split. The two parts are
/// new polygons (fresh ids, same type, confidence and color) whose areas sum
/// to the original's.
pub fn slice_polygon(polygon: &Polygon, start: &Point, end: &Point) -> Option<(Polygon, Polygon)> {
    try_slice_polygon(polygon, start, end).ok()
}

/// [`slice_polygon`] that reports why a line was rejected, in one pass over
/// the outline.
pub fn try_slice_polygon(
    polygon: &Polygon,
    start: &Point,
    end: &Point,
) -> Result<(Polygon, Polygon), SliceRejection> {
    let (_, plan) = plan_slice(&polygon.points, start, end);
    let (part_a, part_b) = plan?;
    Ok((polygon.derive(part_a), polygon.derive(part_b)))
}

struct Candidate {
    imbalance: f64,
    start: Point,
    end: Point,
    parts: (Vec<Point>, Vec<Point>),
}

/// Searches for the cut that splits `polygon` into two parts of most nearly
/// equal area.
///
/// `precision` is the number of sampled directions over a half turn and the
/// number of offsets sampled across the polygon for each direction (clamped
/// to `4..=360`). The best sample is then refined along its offset axis.
/// Returns `None` for degenerate polygons or when no sampled line yields a
/// valid two-crossing cut.
pub fn find_balanced_slice(polygon: &Polygon, precision: usize) -> Option<BalancedSlice> {
    let points = &polygon.points;
    if points.len() < 3 {
        return None;
    }
    let bbox = BBox::from_points(points)?;
    let center = centroid(points)?;
    let reach = bbox.diagonal() + 1.0;
    if !reach.is_finite() || !center.is_finite() {
        return None;
    }

    let samples = precision.clamp(4, 360);

    let evaluate = |angle: f64, offset: f64| -> Option<Candidate> {
        let (sin, cos) = angle.sin_cos();
        let origin = Point::new(center.x - sin * offset, center.y + cos * offset);
        let start = Point::new(origin.x - cos * reach, origin.y - sin * reach);
        let end = Point::new(origin.x + cos * reach, origin.y + sin * reach);
        let (_, plan) = plan_slice(points, &start, &end);
        plan.ok().map(|parts| Candidate {
            imbalance: (area(&parts.0) - area(&parts.1)).abs(),
            start,
            end,
            parts,
        })
    };

    let mut best: Option<(f64, f64, f64, Candidate)> = None;
    for ai in 0..samples {
        let angle = std::f64::consts::PI * ai as f64 / samples as f64;
        let (sin, cos) = angle.sin_cos();
        let (lo, hi) = points.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
            let proj = -(p.x - center.x) * sin + (p.y - center.y) * cos;
            (lo.min(proj), hi.max(proj))
        });
        let step = (hi - lo) / samples as f64;
        for oi in 1..samples {
            let offset = lo + step * oi as f64;
            if let Some(candidate) = evaluate(angle, offset) {
                if best
                    .as_ref()
                    .map_or(true, |(_, _, _, b)| candidate.imbalance < b.imbalance)
                {
                    best = Some((angle, offset, step, candidate));
                }
            }
        }
    }

    let (angle, offset, step, mut winner) = best?;

    // For a fixed direction the area on one side grows monotonically with the
    // offset, so the imbalance is unimodal around the best sample.
    let (mut lo, mut hi) = (offset - step, offset + step);
    for _ in 0..REFINE_ITERATIONS {
        let m1 = lo + (hi - lo) / 3.0;
        let m2 = hi - (hi - lo) / 3.0;
        let f1 = evaluate(angle, m1);
        let f2 = evaluate(angle, m2);
        let s1 = f1.as_ref().map_or(f64::INFINITY, |c| c.imbalance);
        let s2 = f2.as_ref().map_or(f64::INFINITY, |c| c.imbalance);
        if s1 <= s2 {
            hi = m2;
        } else {
            lo = m1;
        }
        for candidate in [f1, f2].into_iter().flatten() {
            if candidate.imbalance < winner.imbalance {
                winner = candidate;
            }
        }
    }

    Some(BalancedSlice {
        line_start: winner.start,
        line_end: winner.end,
        parts: (polygon.derive(winner.parts.0), polygon.derive(winner.parts.1)),
        imbalance: winner.imbalance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PolygonType;

    fn square() -> Polygon {
        Polygon::new(
            "sq",
            vec![
                Point::new(0.0, 0.0),
                Point::new(0.0, 100.0),
                Point::new(100.0, 100.0),
                Point::new(100.0, 0.0),
            ],
            PolygonType::External,
        )
    }

    fn u_shape() -> Polygon {
        Polygon::new(
            "u",
            vec![
                Point::new(0.0, 0.0),
                Point::new(0.0, 100.0),
                Point::new(30.0, 100.0),
                Point::new(30.0, 30.0),
                Point::new(70.0, 30.0),
                Point::new(70.0, 100.0),
                Point::new(100.0, 100.0),
                Point::new(100.0, 0.0),
            ],
            PolygonType::External,
        )
    }

    #[test]
    fn test_square_sliced_horizontally() {
        let sq = square();
        let (a, b) =
            slice_polygon(&sq, &Point::new(-10.0, 50.0), &Point::new(110.0, 50.0)).unwrap();
        assert!((a.area() - 5000.0).abs() < 1e-9);
        assert!((b.area() - 5000.0).abs() < 1e-9);
        assert_ne!(a.id, sq.id);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_slice_through_vertices() {
        let sq = square();
        let (a, b) =
            slice_polygon(&sq, &Point::new(-10.0, -10.0), &Point::new(110.0, 110.0)).unwrap();
        assert_eq!(a.points.len(), 3);
        assert_eq!(b.points.len(), 3);
        assert!((a.area() + b.area() - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_validation_reasons() {
        let sq = square();
        let v = validate_slice_line(&sq, &Point::new(50.0, 50.0), &Point::new(50.2, 50.0));
        assert_eq!(v.reason, Some(SliceRejection::LineTooShort));

        let v = validate_slice_line(&sq, &Point::new(-10.0, 50.0), &Point::new(50.0, 50.0));
        assert!(!v.is_valid);
        assert_eq!(v.intersection_count, 1);
        assert_eq!(
            v.reason.map(|r| r.to_string()),
            Some("expected 2 intersections, found 1".to_string())
        );

        let mut tiny = sq.clone();
        tiny.points.truncate(2);
        let v = validate_slice_line(&tiny, &Point::new(-10.0, 50.0), &Point::new(110.0, 50.0));
        assert_eq!(v.reason, Some(SliceRejection::InsufficientPoints));

        let v = validate_slice_line(&sq, &Point::new(-10.0, 50.0), &Point::new(110.0, 50.0));
        assert!(v.is_valid);
        assert_eq!(v.intersection_count, 2);
    }

    #[test]
    fn test_four_crossings_rejected() {
        let u = u_shape();
        let start = Point::new(-10.0, 60.0);
        let end = Point::new(110.0, 60.0);
        let v = validate_slice_line(&u, &start, &end);
        assert_eq!(v.intersection_count, 4);
        assert!(slice_polygon(&u, &start, &end).is_none());
    }

    #[test]
    fn test_gate_matches_validation() {
        let u = u_shape();
        let lines = [
            (Point::new(-10.0, 10.0), Point::new(110.0, 10.0)),
            (Point::new(-10.0, 60.0), Point::new(110.0, 60.0)),
            (Point::new(50.0, -10.0), Point::new(50.0, 50.0)),
            (Point::new(15.0, -10.0), Point::new(15.0, 110.0)),
            (Point::new(0.0, 0.0), Point::new(0.5, 0.5)),
            (Point::new(-5.0, 0.0), Point::new(105.0, 0.0)),
        ];
        for (s, e) in lines {
            let v = validate_slice_line(&u, &s, &e);
            let sliced = slice_polygon(&u, &s, &e);
            assert_eq!(sliced.is_some(), v.is_valid && v.intersection_count == 2);
            match try_slice_polygon(&u, &s, &e) {
                Ok(_) => assert!(v.is_valid),
                Err(reason) => assert_eq!(Some(reason), v.reason),
            }
        }
    }

    #[test]
    fn test_area_conserved_recursively() {
        let u = u_shape();
        let total = u.area();
        let (a, b) = slice_polygon(&u, &Point::new(15.0, -10.0), &Point::new(15.0, 110.0)).unwrap();
        assert!(((a.area() + b.area()) - total).abs() / total < 1e-3);
        let bigger = if a.area() > b.area() { a } else { b };
        let (c, d) =
            slice_polygon(&bigger, &Point::new(-10.0, 10.0), &Point::new(110.0, 10.0)).unwrap();
        assert!(((c.area() + d.area()) - bigger.area()).abs() / bigger.area() < 1e-3);
    }

    #[test]
    fn test_balanced_slice_square() {
        let sq = square();
        let balanced = find_balanced_slice(&sq, 16).unwrap();
        assert!(balanced.imbalance < 1.0);
        let (a, b) = &balanced.parts;
        assert!((a.area() - 5000.0).abs() < 1.0);
        assert!((a.area() + b.area() - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_balanced_slice_concave() {
        let u = u_shape();
        let balanced = find_balanced_slice(&u, 24).unwrap();
        let total = u.area();
        assert!(balanced.imbalance / total < 0.01);
    }

    #[test]
    fn test_balanced_slice_degenerate() {
        let mut p = square();
        p.points.truncate(2);
        assert!(find_balanced_slice(&p, 16).is_none());
        p.points = vec![Point::new(f64::NAN, 0.0); 4];
        assert!(find_balanced_slice(&p, 16).is_none());
    }
}
