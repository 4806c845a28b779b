//! # polyedit engine
//!
//! The caller-owned facade an editor drives each animation frame. It keeps
//! the spatial indices in step with the polygon revision, feeds the batch
//! manager and renderer, and routes slice/simplify work to the worker pool.
//! Results come back as events; committing them is up to the caller.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod snapshot;

pub use config::EngineConfig;
pub use engine::EditorEngine;
pub use error::EngineError;
pub use event::EngineEvent;
pub use snapshot::{EditorSnapshot, FrameStats};
