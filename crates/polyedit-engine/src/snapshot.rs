use serde::Serialize;

use polyedit_core::Polygon;
use polyedit_renderer::{BatchCacheStats, VertexInteraction, Viewport};

/// The editor state one frame is drawn from. Borrowed, never retained.
#[derive(Debug, Clone)]
pub struct EditorSnapshot<'a> {
    pub polygons: &'a [Polygon],
    /// Must change whenever `polygons` changes; indices are rebuilt on change.
    pub revision: u64,
    pub viewport: Viewport,
    pub interaction: VertexInteraction,
    pub is_animating: bool,
}

impl<'a> EditorSnapshot<'a> {
    pub fn new(polygons: &'a [Polygon], revision: u64, viewport: Viewport) -> Self {
        Self {
            polygons,
            revision,
            viewport,
            interaction: VertexInteraction::default(),
            is_animating: false,
        }
    }
}

/// What one call to [`EditorEngine::render_frame`](crate::EditorEngine::render_frame) did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStats {
    pub indices_rebuilt: bool,
    /// The surface was cleared and the batch list started from the top.
    pub pass_started: bool,
    pub visible_polygons: usize,
    pub batches_total: usize,
    pub batches_drawn: usize,
    pub batches_remaining: usize,
    pub vertex_instances: usize,
    pub instanced_draw_calls: usize,
    pub cache: BatchCacheStats,
}
