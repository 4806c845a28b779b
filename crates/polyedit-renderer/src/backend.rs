use serde::Serialize;
use thiserror::Error;

use crate::batch::RenderBatch;
use crate::color::Rgb;
use crate::instance::VertexInstance;
use crate::viewport::Viewport;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("backend does not support {0}")]
    CapabilityUnavailable(&'static str),
    #[error("invalid surface size {width}x{height}")]
    InvalidSurface { width: u32, height: u32 },
    #[error("draw issued outside a frame")]
    FrameNotStarted,
    #[error("invalid renderer config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendCapabilities {
    pub instancing: bool,
    pub max_instances: usize,
}

/// Counters for one finished frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameReport {
    pub batches_drawn: usize,
    pub polygons_drawn: usize,
    pub instanced_draw_calls: usize,
    pub instances_drawn: usize,
}

/// A drawing surface. Calls arrive as `begin_frame`, any number of
/// `draw_batch`, at most one `draw_instanced`, then `end_frame`.
///
/// Batches persist across frames until a frame begins with `clear` set, so
/// a batch list drawn over several frames adds up to one picture. Instanced
/// markers belong to a single frame.
pub trait RenderBackend {
    fn name(&self) -> &str;

    fn capabilities(&self) -> BackendCapabilities;

    fn begin_frame(&mut self, viewport: &Viewport, clear: bool) -> Result<(), RendererError>;

    /// Draw the polygons of one batch. `fallback` colors polygons whose
    /// color string does not parse.
    fn draw_batch(&mut self, batch: &RenderBatch, fallback: Rgb) -> Result<(), RendererError>;

    /// Draw every vertex marker in a single call.
    fn draw_instanced(&mut self, instances: &[VertexInstance]) -> Result<(), RendererError>;

    fn end_frame(&mut self) -> Result<FrameReport, RendererError>;

    /// RGBA of a device pixel in the last finished frame, for backends that
    /// can read their surface back.
    fn read_pixel(&self, _x: u32, _y: u32) -> Option<[u8; 4]> {
        None
    }
}
