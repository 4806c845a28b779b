use serde::Serialize;

use crate::batch::RenderContext;

/// Polygon count above which a scene is batched coarsely.
pub const LARGE_SCENE_POLYGONS: usize = 1000;

/// Zoom above which batches are kept small for detail.
pub const HIGH_ZOOM: f64 = 2.0;

/// How one `create_batches` call groups polygons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStrategy {
    pub name: &'static str,
    pub max_batch_size: usize,
    /// Summed complexity at which a batch is closed.
    pub complexity_threshold: f64,
    pub spatial_sort: bool,
    pub priority_tiers: usize,
}

impl BatchStrategy {
    pub const ANIMATING: Self = Self {
        name: "animating",
        max_batch_size: 50,
        complexity_threshold: 5_000.0,
        spatial_sort: false,
        priority_tiers: 2,
    };

    pub const LARGE_SCENE: Self = Self {
        name: "largeScene",
        max_batch_size: 200,
        complexity_threshold: 50_000.0,
        spatial_sort: true,
        priority_tiers: 3,
    };

    pub const DETAILED: Self = Self {
        name: "detailed",
        max_batch_size: 25,
        complexity_threshold: 2_000.0,
        spatial_sort: true,
        priority_tiers: 5,
    };

    pub const BALANCED: Self = Self {
        name: "balanced",
        max_batch_size: 100,
        complexity_threshold: 10_000.0,
        spatial_sort: true,
        priority_tiers: 4,
    };

    /// First matching row wins: animation, then scene size, then zoom.
    pub fn select(polygon_count: usize, context: &RenderContext) -> Self {
        if context.is_animating {
            Self::ANIMATING
        } else if polygon_count > LARGE_SCENE_POLYGONS {
            Self::LARGE_SCENE
        } else if context.zoom > HIGH_ZOOM {
            Self::DETAILED
        } else {
            Self::BALANCED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyedit_core::BBox;

    fn context(zoom: f64, is_animating: bool) -> RenderContext {
        RenderContext {
            zoom,
            viewport: BBox::from_corners(0.0, 0.0, 100.0, 100.0),
            selected_polygon_id: None,
            is_animating,
            data_revision: 0,
        }
    }

    #[test]
    fn test_decision_table() {
        assert_eq!(BatchStrategy::select(5000, &context(4.0, true)), BatchStrategy::ANIMATING);
        assert_eq!(BatchStrategy::select(5000, &context(4.0, false)), BatchStrategy::LARGE_SCENE);
        assert_eq!(BatchStrategy::select(10, &context(4.0, false)), BatchStrategy::DETAILED);
        assert_eq!(BatchStrategy::select(10, &context(1.0, false)), BatchStrategy::BALANCED);
        assert_eq!(BatchStrategy::select(1000, &context(2.0, false)), BatchStrategy::BALANCED);
    }
}
