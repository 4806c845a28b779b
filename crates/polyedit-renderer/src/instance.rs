use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use polyedit_core::Point;

bitflags::bitflags! {
    /// Interaction state of one vertex marker.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct VertexState: u32 {
        const HOVERED  = 0b0000_0001;
        const SELECTED = 0b0000_0010;
        const DRAGGING = 0b0000_0100;
    }
}

/// One vertex marker as laid out in the instance buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VertexInstance {
    /// Image coordinates.
    pub position: [f32; 2],
    /// Image units.
    pub radius: f32,
    pub color: [f32; 3],
    pub opacity: f32,
    /// [`VertexState`] bits.
    pub flags: u32,
}

impl VertexInstance {
    pub fn state(&self) -> VertexState {
        VertexState::from_bits_truncate(self.flags)
    }
}

/// Addresses one vertex of one polygon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexRef {
    pub polygon_id: String,
    pub vertex_index: usize,
}

impl VertexRef {
    pub fn new(polygon_id: impl Into<String>, vertex_index: usize) -> Self {
        Self {
            polygon_id: polygon_id.into(),
            vertex_index,
        }
    }

    fn is(&self, polygon_id: &str, vertex_index: usize) -> bool {
        self.vertex_index == vertex_index && self.polygon_id == polygon_id
    }
}

/// Pointer interaction state supplied by the editor each frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VertexInteraction {
    pub selected_polygon_id: Option<String>,
    pub hovered: Option<VertexRef>,
    pub dragging: Option<VertexRef>,
    /// Offset of the dragged vertex from its stored position, in image units.
    pub drag_offset: Option<Point>,
}

impl VertexInteraction {
    pub fn state_of(&self, polygon_id: &str, vertex_index: usize) -> VertexState {
        let mut state = VertexState::empty();
        if self.selected_polygon_id.as_deref() == Some(polygon_id) {
            state |= VertexState::SELECTED;
        }
        if self.hovered.as_ref().is_some_and(|v| v.is(polygon_id, vertex_index)) {
            state |= VertexState::HOVERED;
        }
        if self.dragging.as_ref().is_some_and(|v| v.is(polygon_id, vertex_index)) {
            state |= VertexState::DRAGGING;
        }
        state
    }
}
