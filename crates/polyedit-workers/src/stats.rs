use std::collections::VecDeque;

use serde::Serialize;

/// Snapshot of pool load and recent throughput.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub total_workers: usize,
    pub busy_workers: usize,
    pub idle_workers: usize,
    pub queued_tasks: usize,
    pub pending_tasks: usize,
    pub workers_created: usize,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    pub worker_faults: u64,
    /// Mean of the recent execution times, `None` until a task has finished.
    pub average_execution_ms: Option<f64>,
    /// Time to drain the current backlog at the recent average rate.
    pub estimated_completion_ms: Option<f64>,
}

/// Rolling record of task execution times.
#[derive(Debug, Clone)]
pub(crate) struct ExecutionStats {
    window: VecDeque<f64>,
    capacity: usize,
    pub completed: u64,
    pub failed: u64,
    pub faults: u64,
}

impl ExecutionStats {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            completed: 0,
            failed: 0,
            faults: 0,
        }
    }

    pub fn record(&mut self, execution_ms: f64, success: bool) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(execution_ms);
        if success {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn record_fault(&mut self) {
        self.faults += 1;
    }

    pub fn average_ms(&self) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        Some(self.window.iter().sum::<f64>() / self.window.len() as f64)
    }

    /// Backlog is processed `workers` tasks at a time.
    pub fn estimate_ms(&self, backlog: usize, workers: usize) -> Option<f64> {
        let average = self.average_ms()?;
        let waves = backlog.div_ceil(workers.max(1));
        Some(average * waves as f64)
    }
}
