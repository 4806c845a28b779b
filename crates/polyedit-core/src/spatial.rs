use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::{BBox, Point, Polygon};

/// Vertex index over a flat point set for viewport culling.
///
/// Two index arrays hold the point indices sorted by x and by y. A query
/// binary-searches both, walks whichever axis range is narrower, and checks
/// the other coordinate. Points with a non-finite coordinate are left out of
/// both arrays and can never match.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    points: Vec<Point>,
    by_x: Vec<usize>,
    by_y: Vec<usize>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from a point set.
    pub fn build(points: &[Point]) -> Self {
        let mut index = Self::new();
        index.update(points);
        index
    }

    /// Replace the indexed point set. Prior state is discarded entirely.
    pub fn update(&mut self, points: &[Point]) {
        self.points.clear();
        self.points.extend_from_slice(points);

        self.by_x.clear();
        self.by_x
            .extend((0..points.len()).filter(|&i| points[i].is_finite()));
        self.by_y.clear();
        self.by_y.extend_from_slice(&self.by_x);

        let pts = &self.points;
        self.by_x.sort_unstable_by(|&a, &b| pts[a].x.total_cmp(&pts[b].x));
        self.by_y.sort_unstable_by(|&a, &b| pts[a].y.total_cmp(&pts[b].y));
    }

    /// Indices of points inside `[min_x - buffer, max_x + buffer] × [min_y - buffer, max_y + buffer]`,
    /// in no particular order.
    pub fn query(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64, buffer: f64) -> Vec<usize> {
        let (lo_x, hi_x) = (min_x - buffer, max_x + buffer);
        let (lo_y, hi_y) = (min_y - buffer, max_y + buffer);
        if !(lo_x <= hi_x && lo_y <= hi_y) {
            return Vec::new();
        }

        let pts = &self.points;
        let x_start = self.by_x.partition_point(|&i| pts[i].x < lo_x);
        let x_end = self.by_x.partition_point(|&i| pts[i].x <= hi_x);
        let y_start = self.by_y.partition_point(|&i| pts[i].y < lo_y);
        let y_end = self.by_y.partition_point(|&i| pts[i].y <= hi_y);

        if x_end - x_start <= y_end - y_start {
            self.by_x[x_start..x_end]
                .iter()
                .copied()
                .filter(|&i| pts[i].y >= lo_y && pts[i].y <= hi_y)
                .collect()
        } else {
            self.by_y[y_start..y_end]
                .iter()
                .copied()
                .filter(|&i| pts[i].x >= lo_x && pts[i].x <= hi_x)
                .collect()
        }
    }

    pub fn query_bbox(&self, bbox: &BBox, buffer: f64) -> Vec<usize> {
        self.query(bbox.min.x, bbox.min.y, bbox.max.x, bbox.max.y, buffer)
    }

    /// Indices of points within `radius` of `center`.
    pub fn query_radius(&self, center: &Point, radius: f64) -> Vec<usize> {
        let mut hits = self.query(center.x, center.y, center.x, center.y, radius);
        hits.retain(|&i| self.points[i].distance_to(center) <= radius);
        hits
    }

    pub fn point(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    /// Number of points in the indexed set (including non-finite ones).
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// An entry in the polygon R-tree, referencing a polygon by its position in
/// the caller's slice.
#[derive(Debug, Clone)]
pub struct PolygonEntry {
    pub polygon_index: usize,
    pub bbox: BBox,
}

impl RTreeObject for PolygonEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

/// Polygon-level culling: which outlines touch the viewport.
pub struct PolygonIndex {
    tree: RTree<PolygonEntry>,
}

impl PolygonIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk-load from a polygon set. Empty or non-finite outlines are skipped.
    pub fn build(polygons: &[Polygon]) -> Self {
        let entries: Vec<PolygonEntry> = polygons
            .iter()
            .enumerate()
            .filter_map(|(polygon_index, p)| {
                let bbox = p.bbox()?;
                (bbox.min.is_finite() && bbox.max.is_finite())
                    .then_some(PolygonEntry { polygon_index, bbox })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Polygons whose bounding box contains `point`.
    pub fn query_point(&self, point: &Point) -> Vec<usize> {
        let at = AABB::from_point([point.x, point.y]);
        self.tree
            .locate_in_envelope_intersecting(&at)
            .map(|e| e.polygon_index)
            .collect()
    }

    /// Polygons whose bounding box intersects `viewport`.
    pub fn query_viewport(&self, viewport: &BBox) -> Vec<usize> {
        let envelope = AABB::from_corners(
            [viewport.min.x, viewport.min.y],
            [viewport.max.x, viewport.max.y],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.polygon_index)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for PolygonIndex {
    fn default() -> Self {
        Self::new()
    }
}
