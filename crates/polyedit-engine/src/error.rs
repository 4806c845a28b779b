use thiserror::Error;

use polyedit_renderer::RendererError;
use polyedit_workers::PoolError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("Renderer error: {0}")]
    Renderer(#[from] RendererError),
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
