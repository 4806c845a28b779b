//! # polyedit workers
//!
//! A bounded pool of OS threads for geometry work that is too slow for the
//! interactive thread. Jobs are moved in, results moved out, and each
//! submitted task resolves exactly once: with its result, a task error, a
//! worker fault, or pool termination.

pub mod config;
pub mod job;
pub mod pool;
pub mod protocol;
pub mod stats;
mod worker;

pub use config::PoolConfig;
pub use job::Job;
pub use pool::{PoolError, TaskHandle, WorkerPool};
pub use protocol::{GeometryOperation, GeometryResult, TaskId, WorkerId, WorkerRequest, WorkerResponse};
pub use stats::PoolStats;
pub use worker::WorkerState;
