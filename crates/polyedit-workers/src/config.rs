use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Worker pool sizing and lifecycle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolConfig {
    /// Upper bound on live workers. Zero is treated as one.
    pub max_workers: usize,
    /// A worker is replaced after completing this many tasks.
    pub max_tasks_per_worker: usize,
    /// Idle workers older than this are retired by the periodic sweep.
    pub idle_timeout_ms: u64,
    /// How often the sweep runs.
    pub cleanup_interval_ms: u64,
    /// Number of recent execution times kept for the rolling average.
    pub stats_window: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            max_tasks_per_worker: 100,
            idle_timeout_ms: 30_000,
            cleanup_interval_ms: 10_000,
            stats_window: 100,
        }
    }
}

impl PoolConfig {
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn worker_limit(&self) -> usize {
        self.max_workers.max(1)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms.max(1))
    }
}
