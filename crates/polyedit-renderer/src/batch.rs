use serde::{Deserialize, Serialize};

use polyedit_core::{BBox, Polygon};

use crate::strategy::BatchStrategy;

/// Priority bonus for the selected polygon. Larger than every other term combined.
pub const SELECTED_PRIORITY: f64 = 1000.0;
/// Priority bonus for holes, so they draw over the fills they cut.
pub const HOLE_PRIORITY: f64 = 50.0;
/// Priority of a polygon centered on the viewport, falling to zero at the corners.
pub const PROXIMITY_PRIORITY: f64 = 100.0;
/// Complexity weight of a hole relative to a fill with the same vertex count.
pub const HOLE_COMPLEXITY_WEIGHT: f64 = 1.2;
/// Average polygon complexity above which a batch is drawn simplified.
pub const SIMPLIFY_COMPLEXITY: f64 = 1000.0;
/// Batches at or above this priority draw per-vertex markers.
pub const VERTEX_PRIORITY: f64 = 500.0;

/// The view state batches are built for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderContext {
    pub zoom: f64,
    /// Visible region in image coordinates.
    pub viewport: BBox,
    pub selected_polygon_id: Option<String>,
    pub is_animating: bool,
    /// Bumped by the owner whenever polygon contents change.
    #[serde(default)]
    pub data_revision: u64,
}

impl RenderContext {
    fn is_selected(&self, polygon: &Polygon) -> bool {
        self.selected_polygon_id.as_deref() == Some(polygon.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderLevel {
    Minimal,
    Reduced,
    Normal,
    Detailed,
}

impl RenderLevel {
    const ALL: [RenderLevel; 4] = [
        RenderLevel::Minimal,
        RenderLevel::Reduced,
        RenderLevel::Normal,
        RenderLevel::Detailed,
    ];

    fn from_score(score: usize) -> Self {
        Self::ALL[score.min(Self::ALL.len() - 1)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderHints {
    pub use_simplification: bool,
    pub simplification_tolerance: f64,
    pub render_vertices: bool,
    pub render_level: RenderLevel,
    pub batch_size: usize,
}

/// A group of polygons drawn together in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderBatch {
    pub id: String,
    pub polygons: Vec<Polygon>,
    pub bounding_box: BBox,
    /// Sum of member complexities.
    pub complexity: f64,
    /// Highest member priority.
    pub priority: f64,
    pub render_hints: RenderHints,
}

pub fn polygon_complexity(polygon: &Polygon) -> f64 {
    let vertices = polygon.vertex_count() as f64;
    if polygon.is_hole() {
        vertices * HOLE_COMPLEXITY_WEIGHT
    } else {
        vertices
    }
}

pub fn polygon_priority(polygon: &Polygon, context: &RenderContext) -> f64 {
    let mut priority = 0.0;
    if context.is_selected(polygon) {
        priority += SELECTED_PRIORITY;
    }
    if polygon.is_hole() {
        priority += HOLE_PRIORITY;
    }
    let reach = context.viewport.diagonal() / 2.0;
    if let Some(bbox) = polygon.bbox() {
        if reach > 0.0 {
            let distance = bbox.center().distance_to(&context.viewport.center());
            let closeness = (1.0 - distance / reach).clamp(0.0, 1.0);
            if closeness.is_finite() {
                priority += PROXIMITY_PRIORITY * closeness;
            }
        }
    }
    priority
}

struct Scored<'a> {
    polygon: &'a Polygon,
    bbox: BBox,
    complexity: f64,
    priority: f64,
}

fn hints_for(
    polygons: usize,
    complexity: f64,
    priority: f64,
    context: &RenderContext,
) -> RenderHints {
    let average = complexity / polygons.max(1) as f64;
    let base = if priority >= SELECTED_PRIORITY {
        3
    } else if priority >= PROXIMITY_PRIORITY {
        2
    } else if priority >= HOLE_PRIORITY {
        1
    } else {
        0
    };
    let penalty = if average > 5.0 * SIMPLIFY_COMPLEXITY {
        2
    } else if average > SIMPLIFY_COMPLEXITY {
        1
    } else {
        0
    };
    RenderHints {
        use_simplification: average > SIMPLIFY_COMPLEXITY,
        simplification_tolerance: (1.0 / context.zoom).clamp(0.25, 4.0),
        render_vertices: priority >= VERTEX_PRIORITY,
        render_level: RenderLevel::from_score(base - penalty.min(base)),
        batch_size: polygons,
    }
}

fn close_batch(members: Vec<Scored<'_>>, context: &RenderContext) -> Option<RenderBatch> {
    let bounding_box = members
        .iter()
        .map(|s| s.bbox)
        .reduce(|a, b| a.union(&b))?;
    let complexity: f64 = members.iter().map(|s| s.complexity).sum();
    let priority = members
        .iter()
        .map(|s| s.priority)
        .fold(f64::NEG_INFINITY, f64::max);
    let render_hints = hints_for(members.len(), complexity, priority, context);
    Some(RenderBatch {
        id: uuid::Uuid::new_v4().to_string(),
        polygons: members.into_iter().map(|s| s.polygon.clone()).collect(),
        bounding_box,
        complexity,
        priority,
        render_hints,
    })
}

/// Score, tier and pack `polygons` into batches, highest priority tier first.
/// Polygons without points are skipped.
pub fn build_batches(
    polygons: &[Polygon],
    context: &RenderContext,
    strategy: &BatchStrategy,
) -> Vec<RenderBatch> {
    let scored: Vec<Scored<'_>> = polygons
        .iter()
        .filter_map(|polygon| {
            Some(Scored {
                bbox: polygon.bbox()?,
                complexity: polygon_complexity(polygon),
                priority: polygon_priority(polygon, context),
                polygon,
            })
        })
        .collect();
    if scored.is_empty() {
        return Vec::new();
    }

    let (lo, hi) = scored.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
        (lo.min(s.priority), hi.max(s.priority))
    });
    let tier_count = strategy.priority_tiers.max(1);
    let width = (hi - lo) / tier_count as f64;
    let mut tiers: Vec<Vec<Scored<'_>>> = (0..tier_count).map(|_| Vec::new()).collect();
    for s in scored {
        let tier = if width > 0.0 {
            (((hi - s.priority) / width) as usize).min(tier_count - 1)
        } else {
            0
        };
        tiers[tier].push(s);
    }

    let max_size = strategy.max_batch_size.max(1);
    let mut batches = Vec::new();
    for mut tier in tiers {
        if strategy.spatial_sort {
            tier.sort_by(|a, b| {
                a.bbox
                    .min
                    .y
                    .total_cmp(&b.bbox.min.y)
                    .then(a.bbox.min.x.total_cmp(&b.bbox.min.x))
            });
        } else {
            tier.sort_by(|a, b| b.priority.total_cmp(&a.priority));
        }

        let mut current: Vec<Scored<'_>> = Vec::new();
        let mut current_complexity = 0.0;
        for s in tier {
            let full = current.len() >= max_size
                || current_complexity + s.complexity > strategy.complexity_threshold;
            if full && !current.is_empty() {
                batches.extend(close_batch(std::mem::take(&mut current), context));
                current_complexity = 0.0;
            }
            current_complexity += s.complexity;
            current.push(s);
        }
        batches.extend(close_batch(current, context));
    }

    log::trace!(
        "Built {} batches from {} polygons with the {} strategy",
        batches.len(),
        polygons.len(),
        strategy.name
    );
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyedit_core::{Point, PolygonType};

    fn rect(id: &str, x: f64, y: f64, vertices: usize, polygon_type: PolygonType) -> Polygon {
        let points = (0..vertices)
            .map(|i| {
                let t = i as f64 / vertices as f64 * std::f64::consts::TAU;
                Point::new(x + 5.0 * t.cos(), y + 5.0 * t.sin())
            })
            .collect();
        Polygon::new(id, points, polygon_type)
    }

    fn context(selected: Option<&str>) -> RenderContext {
        RenderContext {
            zoom: 1.0,
            viewport: BBox::from_corners(0.0, 0.0, 1000.0, 1000.0),
            selected_polygon_id: selected.map(str::to_string),
            is_animating: false,
            data_revision: 0,
        }
    }

    #[test]
    fn test_priority_terms() {
        let ctx = context(Some("sel"));
        let center = rect("a", 500.0, 500.0, 8, PolygonType::External);
        let corner = rect("b", 0.0, 0.0, 8, PolygonType::External);
        let hole = rect("c", 0.0, 0.0, 8, PolygonType::Internal);
        let selected = rect("sel", 0.0, 0.0, 8, PolygonType::External);

        assert!((polygon_priority(&center, &ctx) - 100.0).abs() < 1e-9);
        assert!(polygon_priority(&corner, &ctx) < 1.0);
        assert!(polygon_priority(&hole, &ctx) >= 50.0);
        assert!(polygon_priority(&selected, &ctx) >= 1000.0);
        assert!((polygon_complexity(&hole) - 9.6).abs() < 1e-9);
    }

    #[test]
    fn test_selected_batch_comes_first() {
        let mut polygons: Vec<Polygon> = (0..60)
            .map(|i| {
                let ty = if i % 7 == 0 { PolygonType::Internal } else { PolygonType::External };
                rect(&format!("p{i}"), (i * 16) as f64, (i * 16) as f64, 12, ty)
            })
            .collect();
        polygons.push(rect("sel", 990.0, 990.0, 12, PolygonType::External));
        let ctx = context(Some("sel"));
        let batches = build_batches(&polygons, &ctx, &BatchStrategy::BALANCED);

        let first = &batches[0];
        assert!(first.polygons.iter().any(|p| p.id == "sel"));
        assert!(batches.iter().all(|b| first.priority >= b.priority));
        assert!(first.render_hints.render_vertices);
        assert_eq!(first.render_hints.render_level, RenderLevel::Detailed);

        let total: usize = batches.iter().map(|b| b.polygons.len()).sum();
        assert_eq!(total, polygons.len());
    }

    #[test]
    fn test_packing_respects_limits() {
        let polygons: Vec<Polygon> = (0..100)
            .map(|i| rect(&format!("p{i}"), i as f64, 0.0, 400, PolygonType::External))
            .collect();
        let single_tier = BatchStrategy {
            priority_tiers: 1,
            ..BatchStrategy::DETAILED
        };
        let batches = build_batches(&polygons, &context(None), &single_tier);
        for batch in &batches {
            assert!(batch.polygons.len() <= 25);
            assert!(batch.complexity <= 2000.0);
            assert_eq!(batch.render_hints.batch_size, batch.polygons.len());
        }
        assert_eq!(batches.len(), 20);
    }

    #[test]
    fn test_oversized_polygon_gets_own_batch() {
        let polygons = vec![
            rect("big", 10.0, 10.0, 20_000, PolygonType::External),
            rect("small", 20.0, 20.0, 10, PolygonType::External),
        ];
        let batches = build_batches(&polygons, &context(None), &BatchStrategy::BALANCED);
        let big = batches
            .iter()
            .find(|b| b.polygons.iter().any(|p| p.id == "big"))
            .unwrap();
        assert_eq!(big.polygons.len(), 1);
        assert!(big.render_hints.use_simplification);
        assert_eq!(big.render_hints.simplification_tolerance, 1.0);
    }

    #[test]
    fn test_empty_input() {
        let empty = Polygon::new("e", Vec::new(), PolygonType::External);
        assert!(build_batches(&[empty], &context(None), &BatchStrategy::BALANCED).is_empty());
    }
}
