use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use thiserror::Error;

use crate::config::PoolConfig;
use crate::job::Job;
use crate::protocol::{GeometryOperation, TaskId, WorkerId, WorkerRequest};
use crate::stats::{ExecutionStats, PoolStats};
use crate::worker::{Worker, WorkerEvent};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool terminated")]
    Terminated,
    #[error("worker {worker} faulted: {message}")]
    WorkerFault { worker: WorkerId, message: String },
    #[error("task {id} failed: {message}")]
    TaskFailed { id: TaskId, message: String },
    #[error("failed to spawn worker: {0}")]
    Spawn(#[from] io::Error),
    #[error("task {0} was dropped without a result")]
    Disconnected(TaskId),
}

/// Receives the outcome of one submitted task.
#[derive(Debug)]
pub struct TaskHandle<O> {
    id: TaskId,
    receiver: Receiver<Result<O, PoolError>>,
}

impl<O> TaskHandle<O> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The outcome, if it has arrived. Yields it once; later calls report
    /// [`PoolError::Disconnected`].
    pub fn try_take(&self) -> Option<Result<O, PoolError>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PoolError::Disconnected(self.id))),
        }
    }
}

struct PendingTask<O> {
    reply: Sender<Result<O, PoolError>>,
    worker: Option<WorkerId>,
}

/// Runs jobs on a bounded set of OS threads.
///
/// Workers are spawned on demand up to the configured limit. Each worker has
/// its own inbox; all of them report on one shared event channel which the
/// pool drains in [`poll`](Self::poll) or [`wait`](Self::wait). When every
/// worker is busy, tasks queue in submission order. A panicking job takes
/// down only its own worker and rejects only the tasks assigned to it.
pub struct WorkerPool<J: Job = GeometryOperation> {
    config: PoolConfig,
    workers: BTreeMap<WorkerId, Worker<J>>,
    pending: HashMap<TaskId, PendingTask<J::Output>>,
    queue: VecDeque<WorkerRequest<J>>,
    events_tx: Sender<WorkerEvent<J::Output>>,
    events_rx: Receiver<WorkerEvent<J::Output>>,
    next_task_id: TaskId,
    next_worker_id: WorkerId,
    stats: ExecutionStats,
    last_sweep: Instant,
    terminated: bool,
}

impl<J: Job> WorkerPool<J> {
    pub fn new(config: PoolConfig) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let stats = ExecutionStats::new(config.stats_window);
        Self {
            config,
            workers: BTreeMap::new(),
            pending: HashMap::new(),
            queue: VecDeque::new(),
            events_tx,
            events_rx,
            next_task_id: 1,
            next_worker_id: 0,
            stats,
            last_sweep: Instant::now(),
            terminated: false,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Submit a job. It starts immediately on an idle or newly spawned worker,
    /// or waits in the queue.
    pub fn execute(&mut self, job: J) -> Result<TaskHandle<J::Output>, PoolError> {
        if self.terminated {
            return Err(PoolError::Terminated);
        }
        let id = self.next_task_id;
        self.next_task_id += 1;

        let (reply, receiver) = crossbeam_channel::bounded(1);
        self.pending.insert(id, PendingTask { reply, worker: None });
        let request = WorkerRequest {
            id,
            transferable_payload_size: job.payload_size(),
            operation: job,
        };

        match self.acquire_worker() {
            Ok(Some(worker)) => self.dispatch(worker, request),
            Ok(None) => {
                log::trace!(
                    "Queued {} task {id}, {} waiting",
                    request.operation.kind(),
                    self.queue.len() + 1
                );
                self.queue.push_back(request);
            }
            Err(err) => {
                self.pending.remove(&id);
                return Err(err);
            }
        }
        Ok(TaskHandle { id, receiver })
    }

    /// Drain worker events without blocking, start queued tasks and run the
    /// idle sweep if it is due. Returns the number of events handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        self.fill_workers();
        self.maybe_sweep(Instant::now());
        handled
    }

    /// Block the calling thread until `handle` resolves.
    pub fn wait(&mut self, handle: &TaskHandle<J::Output>) -> Result<J::Output, PoolError> {
        loop {
            if let Some(outcome) = handle.try_take() {
                return outcome;
            }
            match self.events_rx.recv_timeout(self.config.cleanup_interval()) {
                Ok(event) => {
                    self.handle_event(event);
                    self.fill_workers();
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.fill_workers();
                    self.maybe_sweep(Instant::now());
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(PoolError::Disconnected(handle.id));
                }
            }
        }
    }

    /// Submit every job, then wait for all of them. Results keep input order.
    pub fn execute_parallel<I>(&mut self, jobs: I) -> Vec<Result<J::Output, PoolError>>
    where
        I: IntoIterator<Item = J>,
    {
        let handles: Vec<_> = jobs.into_iter().map(|job| self.execute(job)).collect();
        handles
            .into_iter()
            .map(|handle| match handle {
                Ok(handle) => self.wait(&handle),
                Err(err) => Err(err),
            })
            .collect()
    }

    /// Like [`execute_parallel`](Self::execute_parallel), but at most
    /// `batch_size` jobs are in flight at a time.
    pub fn execute_batched(
        &mut self,
        jobs: Vec<J>,
        batch_size: usize,
    ) -> Vec<Result<J::Output, PoolError>> {
        let batch_size = batch_size.max(1);
        let mut results = Vec::with_capacity(jobs.len());
        let mut jobs = jobs.into_iter().peekable();
        while jobs.peek().is_some() {
            let chunk: Vec<J> = jobs.by_ref().take(batch_size).collect();
            results.extend(self.execute_parallel(chunk));
        }
        results
    }

    /// Reject every outstanding task and stop all workers. Later submissions
    /// fail with [`PoolError::Terminated`].
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        for (_, task) in self.pending.drain() {
            let _ = task.reply.send(Err(PoolError::Terminated));
        }
        self.queue.clear();
        let workers = std::mem::take(&mut self.workers);
        log::debug!("Terminating pool with {} workers", workers.len());
        for (_, worker) in workers {
            worker.shutdown();
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn stats(&self) -> PoolStats {
        let busy_workers = self.workers.values().filter(|w| !w.is_idle()).count();
        let backlog = self.queue.len() + busy_workers;
        PoolStats {
            total_workers: self.workers.len(),
            busy_workers,
            idle_workers: self.workers.len() - busy_workers,
            queued_tasks: self.queue.len(),
            pending_tasks: self.pending.len(),
            workers_created: self.next_worker_id,
            completed_tasks: self.stats.completed,
            failed_tasks: self.stats.failed,
            worker_faults: self.stats.faults,
            average_execution_ms: self.stats.average_ms(),
            estimated_completion_ms: self
                .stats
                .estimate_ms(backlog, self.config.worker_limit()),
        }
    }

    /// An idle worker, a freshly spawned one, or `None` when at the limit.
    fn acquire_worker(&mut self) -> Result<Option<WorkerId>, PoolError> {
        if let Some(worker) = self.workers.values().find(|w| w.is_idle()) {
            return Ok(Some(worker.id));
        }
        if self.workers.len() >= self.config.worker_limit() {
            return Ok(None);
        }
        let id = self.next_worker_id;
        match Worker::spawn(id, self.events_tx.clone()) {
            Ok(worker) => {
                self.next_worker_id += 1;
                self.workers.insert(id, worker);
                Ok(Some(id))
            }
            Err(err) if self.workers.is_empty() => Err(PoolError::Spawn(err)),
            Err(err) => {
                log::warn!("Could not spawn worker, queueing instead: {err}");
                Ok(None)
            }
        }
    }

    fn dispatch(&mut self, worker_id: WorkerId, request: WorkerRequest<J>) {
        let task = request.id;
        let Some(worker) = self.workers.get_mut(&worker_id) else {
            self.queue.push_front(request);
            return;
        };
        match worker.assign(request) {
            Ok(()) => {
                if let Some(pending) = self.pending.get_mut(&task) {
                    pending.worker = Some(worker_id);
                }
            }
            Err(request) => {
                log::warn!("Worker {worker_id} is gone, requeueing task {task}");
                if let Some(worker) = self.workers.remove(&worker_id) {
                    worker.join();
                }
                self.queue.push_front(request);
            }
        }
    }

    fn fill_workers(&mut self) {
        while !self.queue.is_empty() {
            match self.acquire_worker() {
                Ok(Some(worker)) => {
                    if let Some(request) = self.queue.pop_front() {
                        self.dispatch(worker, request);
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    log::error!("No worker available for {} queued tasks: {err}", self.queue.len());
                    break;
                }
            }
        }
    }

    fn handle_event(&mut self, event: WorkerEvent<J::Output>) {
        match event {
            WorkerEvent::Finished { worker, response } => {
                self.stats.record(response.execution_time_ms, response.success);
                let id = response.id;
                match self.pending.remove(&id) {
                    Some(task) => {
                        let outcome = if response.success {
                            response.result.ok_or_else(|| PoolError::TaskFailed {
                                id,
                                message: "response carried no result".to_string(),
                            })
                        } else {
                            Err(PoolError::TaskFailed {
                                id,
                                message: response.error.unwrap_or_default(),
                            })
                        };
                        let _ = task.reply.send(outcome);
                    }
                    None => log::debug!("Dropping response for unknown task {id}"),
                }

                let recycle = match self.workers.get_mut(&worker) {
                    Some(w) => {
                        w.finish_task();
                        w.tasks_completed >= self.config.max_tasks_per_worker
                    }
                    None => false,
                };
                if recycle {
                    log::debug!("Recycling worker {worker} after {} tasks", self.config.max_tasks_per_worker);
                    self.retire(worker);
                }
            }
            WorkerEvent::Faulted {
                worker,
                task,
                message,
            } => {
                log::warn!("Worker {worker} faulted on task {task}: {message}");
                self.stats.record_fault();
                if let Some(w) = self.workers.remove(&worker) {
                    w.join();
                }
                let doomed: Vec<TaskId> = self
                    .pending
                    .iter()
                    .filter(|(_, p)| p.worker == Some(worker))
                    .map(|(id, _)| *id)
                    .collect();
                for id in doomed {
                    if let Some(p) = self.pending.remove(&id) {
                        let _ = p.reply.send(Err(PoolError::WorkerFault {
                            worker,
                            message: message.clone(),
                        }));
                    }
                }
            }
        }
    }

    fn retire(&mut self, worker: WorkerId) {
        if let Some(w) = self.workers.remove(&worker) {
            w.shutdown();
        }
    }

    fn maybe_sweep(&mut self, now: Instant) {
        if now.duration_since(self.last_sweep) < self.config.cleanup_interval() {
            return;
        }
        self.last_sweep = now;
        let timeout = self.config.idle_timeout();
        let stale: Vec<WorkerId> = self
            .workers
            .values()
            .filter(|w| w.is_idle() && now.duration_since(w.last_active) >= timeout)
            .map(|w| w.id)
            .collect();
        if !stale.is_empty() {
            log::debug!("Retiring {} idle workers", stale.len());
        }
        for id in stale {
            self.retire(id);
        }
    }
}

impl<J: Job> Drop for WorkerPool<J> {
    fn drop(&mut self) {
        self.terminate();
    }
}
