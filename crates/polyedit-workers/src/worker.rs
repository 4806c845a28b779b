use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

use crate::job::Job;
use crate::protocol::{TaskId, WorkerId, WorkerRequest, WorkerResponse};

pub(crate) enum WorkerMessage<J> {
    Run(WorkerRequest<J>),
    Shutdown,
}

/// What a worker reports back on the pool's shared event channel.
pub(crate) enum WorkerEvent<O> {
    Finished {
        worker: WorkerId,
        response: WorkerResponse<O>,
    },
    /// The job panicked. The worker thread has stopped.
    Faulted {
        worker: WorkerId,
        task: TaskId,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkerState {
    Idle,
    Busy,
}

/// The pool's handle on one worker thread.
pub(crate) struct Worker<J: Job> {
    pub id: WorkerId,
    pub state: WorkerState,
    pub current_task: Option<TaskId>,
    pub tasks_completed: usize,
    pub last_active: Instant,
    inbox: Sender<WorkerMessage<J>>,
    thread: Option<JoinHandle<()>>,
}

impl<J: Job> Worker<J> {
    pub fn spawn(id: WorkerId, events: Sender<WorkerEvent<J::Output>>) -> io::Result<Self> {
        let (inbox, messages) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name(format!("polyedit-worker-{id}"))
            .spawn(move || run_worker::<J>(id, messages, events))?;
        log::debug!("Spawned worker {id}");
        Ok(Self {
            id,
            state: WorkerState::Idle,
            current_task: None,
            tasks_completed: 0,
            last_active: Instant::now(),
            inbox,
            thread: Some(thread),
        })
    }

    /// Hand a task to the worker. The request comes back if the thread is gone.
    pub fn assign(&mut self, request: WorkerRequest<J>) -> Result<(), WorkerRequest<J>> {
        let task = request.id;
        match self.inbox.send(WorkerMessage::Run(request)) {
            Ok(()) => {
                self.state = WorkerState::Busy;
                self.current_task = Some(task);
                self.last_active = Instant::now();
                Ok(())
            }
            Err(err) => match err.into_inner() {
                WorkerMessage::Run(request) => Err(request),
                WorkerMessage::Shutdown => Ok(()),
            },
        }
    }

    pub fn finish_task(&mut self) {
        self.state = WorkerState::Idle;
        self.current_task = None;
        self.tasks_completed += 1;
        self.last_active = Instant::now();
    }

    pub fn is_idle(&self) -> bool {
        self.state == WorkerState::Idle
    }

    /// Ask the thread to stop after its current task and detach from it.
    pub fn shutdown(mut self) {
        let _ = self.inbox.send(WorkerMessage::Shutdown);
        self.thread.take();
    }

    /// Wait for a thread that has already stopped or is stopping.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Worker {} thread ended abnormally", self.id);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

fn run_worker<J: Job>(
    id: WorkerId,
    messages: Receiver<WorkerMessage<J>>,
    events: Sender<WorkerEvent<J::Output>>,
) {
    while let Ok(message) = messages.recv() {
        let request = match message {
            WorkerMessage::Run(request) => request,
            WorkerMessage::Shutdown => break,
        };
        let task = request.id;
        let kind = request.operation.kind();
        log::trace!(
            "Worker {id} running {kind} task {task} ({} bytes)",
            request.transferable_payload_size
        );

        let started = Instant::now();
        let operation = request.operation;
        match panic::catch_unwind(AssertUnwindSafe(move || operation.run())) {
            Ok(outcome) => {
                let elapsed = started.elapsed().as_secs_f64() * 1000.0;
                let response = WorkerResponse::from_outcome(task, outcome, elapsed);
                if events
                    .send(WorkerEvent::Finished { worker: id, response })
                    .is_err()
                {
                    break;
                }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Worker {id} faulted on {kind} task {task}: {message}");
                let _ = events.send(WorkerEvent::Faulted {
                    worker: id,
                    task,
                    message,
                });
                return;
            }
        }
    }
    log::debug!("Worker {id} stopped");
}
