//! Morphometric descriptors of a segmented outline.
//!
//! Ratios follow the ImageJ conventions: circularity and convexity use the
//! perimeter including holes, compactness is `P²/(4πA)`. Any ratio whose
//! denominator is zero reports `0.0`.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::geometry::{BBox, Point};
use crate::kernel::{area, convex_hull, perimeter};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeMetrics {
    pub area: f64,
    pub perimeter: f64,
    pub perimeter_with_holes: f64,
    pub equivalent_diameter: f64,
    pub circularity: f64,
    pub convex_perimeter: f64,
    pub convex_area: f64,
    pub convexity: f64,
    pub solidity: f64,
    pub compactness: f64,
    pub sphericity: f64,
    pub extent: f64,
    pub bounding_box_width: f64,
    pub bounding_box_height: f64,
    pub feret_diameter_max: f64,
    pub feret_diameter_min: f64,
    pub feret_aspect_ratio: f64,
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Width and height of the minimum-area rectangle enclosing `hull`, found by
/// aligning a rectangle with each hull edge in turn.
fn min_area_rect(hull: &[Point]) -> (f64, f64) {
    if hull.len() < 2 {
        return (0.0, 0.0);
    }
    let mut best: Option<(f64, f64, f64)> = None;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        let len = a.distance_to(&b);
        if len == 0.0 {
            continue;
        }
        let (ux, uy) = ((b.x - a.x) / len, (b.y - a.y) / len);
        let (mut min_u, mut max_u, mut min_v, mut max_v) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
        for p in hull {
            let u = (p.x - a.x) * ux + (p.y - a.y) * uy;
            let v = -(p.x - a.x) * uy + (p.y - a.y) * ux;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }
        let (w, h) = (max_u - min_u, max_v - min_v);
        if best.map_or(true, |(area, _, _)| w * h < area) {
            best = Some((w * h, w, h));
        }
    }
    best.map_or((0.0, 0.0), |(_, w, h)| (w, h))
}

impl ShapeMetrics {
    /// Metrics of `outline`; `holes` only contribute to the boundary length.
    pub fn compute(outline: &[Point], holes: &[&[Point]]) -> Self {
        let a = area(outline);
        let p = perimeter(outline);
        let p_holes = p + holes.iter().map(|h| perimeter(h)).sum::<f64>();

        let hull = convex_hull(outline);
        let hull_perimeter = perimeter(&hull);
        let hull_area = area(&hull);

        let (bbox_w, bbox_h) = BBox::from_points(outline).map_or((0.0, 0.0), |b| (b.width(), b.height()));
        let (rect_w, rect_h) = min_area_rect(&hull);
        let feret_max = rect_w.max(rect_h);
        let feret_min = rect_w.min(rect_h);

        let equivalent_diameter = (4.0 * a / PI).sqrt();

        Self {
            area: a,
            perimeter: p,
            perimeter_with_holes: p_holes,
            equivalent_diameter,
            circularity: ratio(4.0 * PI * a, p_holes * p_holes).min(1.0),
            convex_perimeter: hull_perimeter,
            convex_area: hull_area,
            convexity: ratio(hull_perimeter, p_holes),
            solidity: ratio(a, hull_area),
            compactness: if a > 0.0 { p * p / (4.0 * PI * a) } else { 0.0 },
            sphericity: ratio(PI * equivalent_diameter, p),
            extent: ratio(a, bbox_w * bbox_h),
            bounding_box_width: bbox_w,
            bounding_box_height: bbox_h,
            feret_diameter_max: feret_max,
            feret_diameter_min: feret_min,
            feret_aspect_ratio: ratio(feret_max, feret_min),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(r: f64, n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| {
                let t = i as f64 / n as f64 * std::f64::consts::TAU;
                Point::new(r * t.cos(), r * t.sin())
            })
            .collect()
    }

    #[test]
    fn test_circle_is_round() {
        let m = ShapeMetrics::compute(&circle(50.0, 720), &[]);
        assert!((m.circularity - 1.0).abs() < 1e-3);
        assert!((m.compactness - 1.0).abs() < 1e-3);
        assert!((m.solidity - 1.0).abs() < 1e-9);
        assert!((m.equivalent_diameter - 100.0).abs() < 0.1);
        assert!((m.feret_aspect_ratio - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_rectangle() {
        let rect = vec![
            Point::new(0.0, 0.0),
            Point::new(40.0, 0.0),
            Point::new(40.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let m = ShapeMetrics::compute(&rect, &[]);
        assert!((m.area - 400.0).abs() < 1e-10);
        assert!((m.extent - 1.0).abs() < 1e-10);
        assert!((m.feret_diameter_max - 40.0).abs() < 1e-10);
        assert!((m.feret_diameter_min - 10.0).abs() < 1e-10);
        assert!((m.feret_aspect_ratio - 4.0).abs() < 1e-10);
        assert!((m.convexity - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_holes_extend_boundary() {
        let outer = circle(50.0, 360);
        let hole = circle(10.0, 360);
        let plain = ShapeMetrics::compute(&outer, &[]);
        let holed = ShapeMetrics::compute(&outer, &[&hole]);
        assert!(holed.perimeter_with_holes > plain.perimeter_with_holes);
        assert!(holed.circularity < plain.circularity);
        assert_eq!(holed.perimeter, plain.perimeter);
    }

    #[test]
    fn test_degenerate_input_is_zeroed() {
        let m = ShapeMetrics::compute(&[Point::new(1.0, 1.0)], &[]);
        assert_eq!(m.area, 0.0);
        assert_eq!(m.circularity, 0.0);
        assert_eq!(m.compactness, 0.0);
        assert_eq!(m.feret_aspect_ratio, 0.0);
    }
}
