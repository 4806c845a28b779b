use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::batch::RenderBatch;
use crate::config::BatchConfig;

/// Millisecond time source for frame budgeting.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameProgress {
    pub drawn: usize,
    pub remaining: usize,
    pub elapsed_ms: f64,
}

/// Drains a batch list across animation frames.
///
/// Each frame draws batches in order until the allowance (budget times
/// fraction) is used up, then yields. At least one batch is drawn per frame,
/// so progress is guaranteed however slow a batch is.
pub struct FrameScheduler<C: Clock = SystemClock> {
    batches: Arc<Vec<RenderBatch>>,
    cursor: usize,
    allowance_ms: f64,
    clock: C,
}

impl FrameScheduler<SystemClock> {
    pub fn new(config: &BatchConfig) -> Self {
        Self::with_clock(config, SystemClock::default())
    }
}

impl<C: Clock> FrameScheduler<C> {
    pub fn with_clock(config: &BatchConfig, clock: C) -> Self {
        Self {
            batches: Arc::new(Vec::new()),
            cursor: 0,
            allowance_ms: config.frame_allowance_ms(),
            clock,
        }
    }

    /// Start over with a new batch list. A list identical to the current one
    /// keeps its position.
    pub fn replace(&mut self, batches: Arc<Vec<RenderBatch>>) {
        if Arc::ptr_eq(&self.batches, &batches) {
            return;
        }
        self.batches = batches;
        self.cursor = 0;
    }

    /// Rewind to the first batch for a full redraw.
    pub fn restart(&mut self) {
        self.cursor = 0;
    }

    /// No batch of the current list has been drawn yet.
    pub fn is_at_start(&self) -> bool {
        self.cursor == 0
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.batches.len()
    }

    pub fn remaining(&self) -> usize {
        self.batches.len().saturating_sub(self.cursor)
    }

    /// Draw the next slice of batches. An error from `draw` stops the frame;
    /// the failing batch is retried next frame.
    pub fn run_frame<E>(
        &mut self,
        mut draw: impl FnMut(&RenderBatch) -> Result<(), E>,
    ) -> Result<FrameProgress, E> {
        let started = self.clock.now_ms();
        let mut drawn = 0;
        while let Some(batch) = self.batches.get(self.cursor) {
            draw(batch)?;
            self.cursor += 1;
            drawn += 1;
            if self.clock.now_ms() - started >= self.allowance_ms {
                break;
            }
        }
        let progress = FrameProgress {
            drawn,
            remaining: self.remaining(),
            elapsed_ms: self.clock.now_ms() - started,
        };
        if progress.remaining > 0 {
            log::trace!("Yielding with {} batches left", progress.remaining);
        }
        Ok(progress)
    }
}
