use serde::{Deserialize, Serialize};

use crate::kernel;

/// A 2D point in image coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// An axis-aligned bounding box. Always derived from points, never stored as
/// the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_corners(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(Point::new(min_x, min_y), Point::new(max_x, max_y))
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        })
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn diagonal(&self) -> f64 {
        self.min.distance_to(&self.max)
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Grow the box by `amount` on every side.
    pub fn expand(&self, amount: f64) -> Self {
        Self {
            min: self.min.translate(-amount, -amount),
            max: self.max.translate(amount, amount),
        }
    }
}

/// Whether a polygon outlines a region or cuts a hole into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolygonType {
    #[default]
    External,
    Internal,
}

fn default_confidence() -> f64 {
    1.0
}

fn default_color() -> String {
    "#ff0000".to_string()
}

/// A segmentation outline. The ring is implicitly closed (last point connects
/// back to the first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub id: String,
    pub points: Vec<Point>,
    #[serde(rename = "type", default)]
    pub polygon_type: PolygonType,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_color")]
    pub color: String,
}

impl Polygon {
    pub fn new(id: impl Into<String>, points: Vec<Point>, polygon_type: PolygonType) -> Self {
        Self {
            id: id.into(),
            points,
            polygon_type,
            confidence: default_confidence(),
            color: default_color(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = color.to_string();
        self
    }

    /// A copy of this polygon's attributes with a fresh id and new points.
    pub fn derive(&self, points: Vec<Point>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            points,
            polygon_type: self.polygon_type,
            confidence: self.confidence,
            color: self.color.clone(),
        }
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(&self.points)
    }

    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_hole(&self) -> bool {
        self.polygon_type == PolygonType::Internal
    }

    /// Fewer than three distinct points: a transient state during creation.
    pub fn is_degenerate(&self) -> bool {
        let mut distinct: Vec<&Point> = Vec::with_capacity(3);
        for p in &self.points {
            if !distinct.iter().any(|d| *d == p) {
                distinct.push(p);
                if distinct.len() >= 3 {
                    return false;
                }
            }
        }
        true
    }

    pub fn area(&self) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        kernel::area(&self.points)
    }

    pub fn perimeter(&self) -> f64 {
        kernel::perimeter(&self.points)
    }
}

/// Drop consecutive duplicate points, including a closing point equal to the first.
pub fn dedup_consecutive(points: &[Point]) -> Vec<Point> {
    let mut cleaned: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if cleaned.last() != Some(p) {
            cleaned.push(*p);
        }
    }
    if cleaned.len() > 1 && cleaned.first() == cleaned.last() {
        cleaned.pop();
    }
    cleaned
}

/// Keep polygons meeting the optional area and confidence floors.
pub fn filter_polygons(
    polygons: &[Polygon],
    min_area: Option<f64>,
    min_confidence: Option<f64>,
) -> Vec<Polygon> {
    let filtered: Vec<Polygon> = polygons
        .iter()
        .filter(|p| min_area.map_or(true, |min| p.area() >= min))
        .filter(|p| min_confidence.map_or(true, |min| p.confidence >= min))
        .cloned()
        .collect();
    log::debug!(
        "Filtered from {} to {} polygons",
        polygons.len(),
        filtered.len()
    );
    filtered
}
