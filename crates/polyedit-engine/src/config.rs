use serde::{Deserialize, Serialize};

use polyedit_renderer::{BatchConfig, RendererConfig};
use polyedit_workers::PoolConfig;

/// Everything an [`EditorEngine`](crate::EditorEngine) is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub pool: PoolConfig,
    pub batching: BatchConfig,
    pub renderer: RendererConfig,
    /// Render surface size in device pixels.
    pub surface_width: u32,
    pub surface_height: u32,
    /// Vertices this far outside the viewport (image units) still get markers.
    pub vertex_cull_buffer: f64,
    /// Candidate angles tried by a balanced slice request.
    pub balanced_slice_precision: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            batching: BatchConfig::default(),
            renderer: RendererConfig::default(),
            surface_width: 1280,
            surface_height: 800,
            vertex_cull_buffer: 20.0,
            balanced_slice_precision: 36,
        }
    }
}

impl EngineConfig {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
