//! # polyedit renderer
//!
//! Frame-side half of the editor: groups polygons into prioritized render
//! batches, drains them across animation frames, and draws vertex markers as
//! one instanced call per frame through a pluggable backend. Also answers
//! pointer hit-tests against the markers drawn last.

pub mod backend;
pub mod batch;
pub mod cache;
pub mod color;
pub mod config;
pub mod instance;
pub mod manager;
pub mod progressive;
pub mod renderer;
pub mod software;
pub mod strategy;
pub mod viewport;

pub use backend::{BackendCapabilities, FrameReport, RenderBackend, RendererError};
pub use batch::{RenderBatch, RenderContext, RenderHints, RenderLevel};
pub use cache::BatchCacheStats;
pub use color::Rgb;
pub use config::{BatchConfig, RendererConfig, StateStyle};
pub use instance::{VertexInstance, VertexInteraction, VertexRef, VertexState};
pub use manager::RenderBatchManager;
pub use progressive::{Clock, FrameProgress, FrameScheduler, SystemClock};
pub use renderer::VertexRenderer;
pub use software::SoftwareBackend;
pub use strategy::BatchStrategy;
pub use viewport::Viewport;
