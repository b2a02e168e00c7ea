// the single worker thread
use super::numeric;
use super::service::Shared;
use super::task::Task;
use crate::config::{Precision, StopPolicy};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// What the worker thread is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Blocked until a task is queued or shutdown is requested.
    Waiting,
    /// Computing a task's result.
    Processing,
}

const STATE_STOPPED: u8 = 0;
const STATE_WAITING: u8 = 1;
const STATE_PROCESSING: u8 = 2;

/// Lock-free view of the worker's state for observers.
#[derive(Debug)]
pub(crate) struct WorkerStateCell(AtomicU8);

impl WorkerStateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(STATE_STOPPED))
    }

    pub fn set(&self, state: Option<WorkerState>) {
        let raw = match state {
            None => STATE_STOPPED,
            Some(WorkerState::Waiting) => STATE_WAITING,
            Some(WorkerState::Processing) => STATE_PROCESSING,
        };
        self.0.store(raw, Ordering::Release);
    }

    pub fn get(&self) -> Option<WorkerState> {
        match self.0.load(Ordering::Acquire) {
            STATE_WAITING => Some(WorkerState::Waiting),
            STATE_PROCESSING => Some(WorkerState::Processing),
            _ => None,
        }
    }
}

pub(crate) struct Worker {
    shared: Arc<Shared>,
    precision: Precision,
    stop_policy: StopPolicy,
}

impl Worker {
    pub fn new(shared: Arc<Shared>, precision: Precision, stop_policy: StopPolicy) -> Self {
        Self {
            shared,
            precision,
            stop_policy,
        }
    }

    // main loop
    pub fn run(self) {
        tracing::debug!(precision = ?self.precision, policy = ?self.stop_policy, "worker started");

        let mut processed = 0u64;
        while let Some(task) = self.next_task() {
            self.process(task);
            processed += 1;
        }

        self.shared.worker_state.set(None);
        tracing::debug!(processed, "worker exited");
    }

    /// Block until there is a task to run, or return `None` when it is time to exit.
    fn next_task(&self) -> Option<Task> {
        let mut state = self.shared.state.lock();
        let mut idle_since: Option<Instant> = None;

        let task = loop {
            if state.shutdown && self.stop_policy == StopPolicy::Abandon {
                break None;
            }
            if let Some(task) = state.queue.pop() {
                break Some(task);
            }
            // Drain: the queue is empty, nothing left to finish.
            if state.shutdown {
                break None;
            }

            if idle_since.is_none() {
                idle_since = Some(Instant::now());
                self.shared.worker_state.set(Some(WorkerState::Waiting));
            }
            self.shared.work_ready.wait(&mut state);
        };

        if task.is_some() {
            self.shared.worker_state.set(Some(WorkerState::Processing));
        }
        drop(state);

        if let (Some(since), Some(metrics)) = (idle_since, self.shared.metrics.as_ref()) {
            metrics.record_idle_time(since.elapsed());
        }

        task
    }

    fn process(&self, task: Task) {
        let started = Instant::now();
        let result = numeric::evaluate_with(self.precision, task.kind, task.argument);
        let finished = Instant::now();

        if result.is_none() {
            tracing::warn!(id = %task.id, kind = ?task.kind, "unrecognized operation, result left unset");
        }

        let stored = self.shared.state.lock().log.complete(task.id, result, finished);
        self.shared.task_done.notify_all();

        if !stored {
            // Only a pending slot accepts a result; anything else is a bookkeeping bug.
            tracing::error!(id = %task.id, "result for a task that is not pending was dropped");
            return;
        }

        tracing::trace!(id = %task.id, kind = task.kind.name(), argument = task.argument, ?result, "task completed");

        if let Some(metrics) = self.shared.metrics.as_ref() {
            metrics.record_task_completed(
                started.saturating_duration_since(task.admitted_at),
                finished.saturating_duration_since(started),
            );
            if result.is_none() {
                metrics.record_task_unrecognized();
            }
        }
    }
}
