//! The task service: admission, blocking fetch, and worker lifecycle.
//!
//! All mutable state sits behind a single mutex. Two condition variables hang
//! off it: `work_ready` wakes the worker when a task is queued, `task_done`
//! wakes fetchers whenever a result lands.

use super::task::{OpKind, Task, TaskId, TaskStatus};
use super::task_log::{PendingQueue, TaskLog};
use super::worker::{Worker, WorkerState, WorkerStateCell};
use crate::config::{Config, StopPolicy};
use crate::error::{Error, Result};
use crate::telemetry::{Metrics, MetricsSnapshot};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

pub(crate) struct State {
    pub lifecycle: Lifecycle,
    pub shutdown: bool,
    pub log: TaskLog,
    pub queue: PendingQueue,
}

/// State shared between producers and the worker thread.
pub(crate) struct Shared {
    pub state: Mutex<State>,
    pub work_ready: Condvar,
    pub task_done: Condvar,
    pub worker_state: WorkerStateCell,
    pub metrics: Option<Metrics>,
}

/// Serial task execution service.
///
/// Any number of producers may [`submit`](Self::submit) concurrently; one
/// worker thread runs the tasks in admission order, and each producer can
/// [`fetch`](Self::fetch) the result for a specific id, blocking until it is
/// ready. Share it between threads with an `Arc`.
///
/// ```no_run
/// use sutra_rs::{OpKind, TaskService};
///
/// let service = TaskService::with_defaults()?;
/// service.start()?;
///
/// let id = service.submit(OpKind::SquareRoot, 4.0)?;
/// assert_eq!(service.fetch(id)?.result, Some(2.0));
///
/// service.stop()?;
/// # Ok::<(), sutra_rs::Error>(())
/// ```
pub struct TaskService {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    config: Config,
}

impl TaskService {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let metrics = config.enable_telemetry.then(Metrics::new);
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                lifecycle: Lifecycle::Idle,
                shutdown: false,
                log: TaskLog::new(),
                queue: PendingQueue::new(),
            }),
            work_ready: Condvar::new(),
            task_done: Condvar::new(),
            worker_state: WorkerStateCell::new(),
            metrics,
        });

        Ok(Self {
            shared,
            worker: Mutex::new(None),
            config,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(Config::default())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Launch the worker thread. Callable once; a stopped service cannot be restarted.
    pub fn start(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        match state.lifecycle {
            Lifecycle::Running => return Err(Error::AlreadyStarted),
            Lifecycle::Stopped => return Err(Error::Stopped),
            Lifecycle::Idle => {}
        }

        let worker = Worker::new(
            self.shared.clone(),
            self.config.precision,
            self.config.stop_policy,
        );

        let mut builder = thread::Builder::new().name(self.config.thread_name.clone());
        if let Some(stack_size) = self.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let handle = builder
            .spawn(move || worker.run())
            .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

        *self.worker.lock() = Some(handle);
        state.lifecycle = Lifecycle::Running;
        tracing::info!(thread = %self.config.thread_name, "task service started");

        Ok(())
    }

    /// Admit a task and hand it to the worker. Returns the id to fetch it by.
    pub fn submit(&self, kind: OpKind, argument: f64) -> Result<TaskId> {
        let mut state = self.shared.state.lock();
        match state.lifecycle {
            Lifecycle::Idle => return Err(Error::NotStarted),
            Lifecycle::Stopped => return Err(Error::Stopped),
            Lifecycle::Running => {}
        }

        if let Some(capacity) = self.config.max_pending {
            if state.queue.len() >= capacity {
                drop(state);
                if let Some(metrics) = self.shared.metrics.as_ref() {
                    metrics.record_task_rejected();
                }
                return Err(Error::QueueFull { capacity });
            }
        }

        let task = state.log.admit(kind, argument);
        state.queue.push(task);
        drop(state);

        self.shared.work_ready.notify_one();
        if let Some(metrics) = self.shared.metrics.as_ref() {
            metrics.record_task_submitted();
        }
        tracing::trace!(id = %task.id, kind = ?kind, argument, "task admitted");

        Ok(task.id)
    }

    /// Block until the task with `id` has a result and return a copy of it.
    ///
    /// Uses `Config::fetch_timeout` when set. Without a timeout this waits
    /// forever for ids that are abandoned by `stop()` or never submitted.
    pub fn fetch(&self, id: TaskId) -> Result<Task> {
        match self.config.fetch_timeout {
            Some(timeout) => self.fetch_timeout(id, timeout),
            None => {
                let state = self.lock_started()?;
                Ok(self.wait_completed(state, id))
            }
        }
    }

    /// Like [`fetch`](Self::fetch), but gives up after `timeout`.
    ///
    /// A timeout too large to express as a deadline waits without one.
    pub fn fetch_timeout(&self, id: TaskId, timeout: Duration) -> Result<Task> {
        let began = Instant::now();
        let mut state = self.lock_started()?;
        let Some(deadline) = began.checked_add(timeout) else {
            return Ok(self.wait_completed(state, id));
        };

        loop {
            if let Some(task) = state.log.completed_task(id) {
                return Ok(task);
            }
            if self
                .shared
                .task_done
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                if let Some(task) = state.log.completed_task(id) {
                    return Ok(task);
                }
                tracing::debug!(%id, status = ?state.log.status(id), "fetch timed out");
                return Err(Error::Timeout {
                    id,
                    waited: began.elapsed(),
                });
            }
        }
    }

    /// The completed task, or `None` if its result is not in yet.
    pub fn try_fetch(&self, id: TaskId) -> Result<Option<Task>> {
        let state = self.lock_started()?;
        Ok(state.log.completed_task(id))
    }

    pub fn status(&self, id: TaskId) -> TaskStatus {
        self.shared.state.lock().log.status(id)
    }

    pub fn admitted(&self) -> usize {
        self.shared.state.lock().log.admitted()
    }

    pub fn completed(&self) -> usize {
        self.shared.state.lock().log.completed()
    }

    /// Tasks queued and not yet picked up by the worker.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().lifecycle == Lifecycle::Running
    }

    /// `None` when no worker thread is alive.
    pub fn worker_state(&self) -> Option<WorkerState> {
        self.shared.worker_state.get()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared
            .metrics
            .as_ref()
            .map(Metrics::snapshot)
            .unwrap_or_default()
    }

    /// Stop admitting tasks, shut the worker down, and join it.
    ///
    /// Under [`StopPolicy::Abandon`] tasks still queued are marked
    /// [`TaskStatus::Abandoned`]; fetches waiting on them are not woken with
    /// an error and only a bounded fetch returns. Under
    /// [`StopPolicy::Drain`] the worker finishes the queue first.
    /// Stopping an already stopped service is a no-op.
    pub fn stop(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        match state.lifecycle {
            Lifecycle::Idle => return Err(Error::NotStarted),
            Lifecycle::Stopped => return Ok(()),
            Lifecycle::Running => {}
        }

        state.lifecycle = Lifecycle::Stopped;
        state.shutdown = true;

        let mut abandoned = 0u64;
        if self.config.stop_policy == StopPolicy::Abandon {
            let queued: Vec<TaskId> = state.queue.drain().map(|task| task.id).collect();
            for id in queued {
                state.log.abandon(id);
                abandoned += 1;
            }
        }
        let still_queued = state.queue.len();
        drop(state);

        if abandoned > 0 {
            tracing::warn!(abandoned, "stopping with queued tasks, they will never complete");
            if let Some(metrics) = self.shared.metrics.as_ref() {
                metrics.record_tasks_abandoned(abandoned);
            }
        } else {
            tracing::debug!(draining = still_queued, "stopping task service");
        }

        // wake everyone up to check the shutdown flag
        self.shared.work_ready.notify_all();
        self.shared.task_done.notify_all();

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            handle.join().map_err(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::error!(%message, "worker thread panicked");
                Error::WorkerPanic(message)
            })?;
        }

        tracing::info!("task service stopped");
        Ok(())
    }

    fn wait_completed(&self, mut state: MutexGuard<'_, State>, id: TaskId) -> Task {
        loop {
            if let Some(task) = state.log.completed_task(id) {
                return task;
            }
            self.shared.task_done.wait(&mut state);
        }
    }

    fn lock_started(&self) -> Result<MutexGuard<'_, State>> {
        let state = self.shared.state.lock();
        if state.lifecycle == Lifecycle::Idle {
            return Err(Error::NotStarted);
        }
        Ok(state)
    }
}

impl Drop for TaskService {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("TaskService")
            .field("lifecycle", &state.lifecycle)
            .field("admitted", &state.log.admitted())
            .field("completed", &state.log.completed())
            .field("pending", &state.queue.len())
            .field("worker_state", &self.shared.worker_state.get())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Precision;

    fn started(config: Config) -> TaskService {
        let service = TaskService::new(config).unwrap();
        service.start().unwrap();
        service
    }

    #[test]
    fn test_lifecycle_misuse() {
        let service = TaskService::with_defaults().unwrap();

        assert!(matches!(service.submit(OpKind::Sine, 0.0), Err(Error::NotStarted)));
        assert!(matches!(service.fetch(TaskId::new(0)), Err(Error::NotStarted)));
        assert!(matches!(service.try_fetch(TaskId::new(0)), Err(Error::NotStarted)));
        assert!(matches!(service.stop(), Err(Error::NotStarted)));

        service.start().unwrap();
        assert!(matches!(service.start(), Err(Error::AlreadyStarted)));

        service.stop().unwrap();
        assert!(service.stop().is_ok());
        assert!(matches!(service.start(), Err(Error::Stopped)));
        let late = service.submit(OpKind::Sine, 0.0).unwrap_err();
        assert!(matches!(late, Error::Stopped));
        assert!(late.is_lifecycle());
        assert!(!Error::QueueFull { capacity: 1 }.is_lifecycle());
    }

    #[test]
    fn test_submit_fetch_in_order() {
        let service = started(Config::default());

        let a = service.submit(OpKind::Sine, 0.0).unwrap();
        let b = service.submit(OpKind::SquareRoot, 4.0).unwrap();
        let c = service.submit(OpKind::Square, 3.0).unwrap();
        assert_eq!((a.as_u64(), b.as_u64(), c.as_u64()), (0, 1, 2));

        assert!(service.fetch(a).unwrap().result.unwrap().abs() < 1e-12);
        assert_eq!(service.fetch(b).unwrap().result, Some(2.0));
        assert_eq!(service.fetch(c).unwrap().result, Some(9.0));
        assert_eq!(service.status(c), TaskStatus::Completed);

        service.stop().unwrap();
    }

    #[test]
    fn test_completed_results_survive_stop() {
        let service = started(Config::default());
        let id = service.submit(OpKind::Square, 5.0).unwrap();
        service.fetch(id).unwrap();
        service.stop().unwrap();

        assert_eq!(service.fetch(id).unwrap().result, Some(25.0));
        assert_eq!(service.try_fetch(id).unwrap().unwrap().result, Some(25.0));
    }

    #[test]
    fn test_single_precision_worker() {
        let service = started(Config::builder().precision(Precision::Single).build().unwrap());
        let id = service.submit(OpKind::Sine, 1.0).unwrap();
        assert_eq!(service.fetch(id).unwrap().result, Some((1.0f32).sin() as f64));
        service.stop().unwrap();
    }

    #[test]
    fn test_unrecognized_kind_is_unset() {
        let service = started(Config::default());
        let id = service.submit(OpKind::from_code(7), 3.0).unwrap();

        let task = service.fetch(id).unwrap();
        assert!(task.is_unset());
        assert_eq!(task.kind, OpKind::Unrecognized(7));
        assert_eq!(service.status(id), TaskStatus::Completed);

        service.stop().unwrap();
        assert_eq!(service.metrics().tasks_unrecognized, 1);
    }

    #[test]
    fn test_fetch_timeout_on_unknown_id() {
        let service = started(Config::default());
        let err = service
            .fetch_timeout(TaskId::new(99), Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { id, .. } if id == TaskId::new(99)));
        assert_eq!(service.status(TaskId::new(99)), TaskStatus::Unknown);
        service.stop().unwrap();
    }

    #[test]
    fn test_configured_fetch_timeout() {
        let service = started(
            Config::builder()
                .fetch_timeout(Duration::from_millis(20))
                .build()
                .unwrap(),
        );
        assert!(matches!(service.fetch(TaskId::new(5)), Err(Error::Timeout { .. })));
        service.stop().unwrap();
    }

    #[test]
    fn test_unbounded_timeout_does_not_overflow() {
        let service = started(Config::default());
        let id = service.submit(OpKind::Square, 4.0).unwrap();
        let task = service.fetch_timeout(id, Duration::MAX).unwrap();
        assert_eq!(task.result, Some(16.0));
        service.stop().unwrap();

        let service = started(Config::builder().fetch_timeout(Duration::MAX).build().unwrap());
        let id = service.submit(OpKind::SquareRoot, 9.0).unwrap();
        assert_eq!(service.fetch(id).unwrap().result, Some(3.0));
        service.stop().unwrap();
    }

    #[test]
    fn test_stop_abandons_queue_without_worker_progress() {
        let service = TaskService::with_defaults().unwrap();
        // Admit work with no worker thread, so nothing can be picked up before stop.
        service.shared.state.lock().lifecycle = Lifecycle::Running;

        let ids: Vec<_> = (0..5)
            .map(|i| service.submit(OpKind::Sine, i as f64).unwrap())
            .collect();
        assert_eq!(service.pending(), 5);

        service.stop().unwrap();

        assert_eq!(service.pending(), 0);
        assert_eq!(service.completed(), 0);
        for &id in &ids {
            assert_eq!(service.status(id), TaskStatus::Abandoned);
            assert!(service.try_fetch(id).unwrap().is_none());
        }
        let err = service
            .fetch_timeout(ids[4], Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { id, .. } if id == ids[4]));
        assert_eq!(service.metrics().tasks_abandoned, 5);
    }

    #[test]
    fn test_telemetry_disabled() {
        let service = started(Config::builder().enable_telemetry(false).build().unwrap());
        let id = service.submit(OpKind::Square, 2.0).unwrap();
        service.fetch(id).unwrap();
        service.stop().unwrap();

        assert_eq!(service.metrics(), MetricsSnapshot::default());
    }

    #[test]
    fn test_drop_stops_worker() {
        let service = started(Config::default());
        let id = service.submit(OpKind::Square, 2.0).unwrap();
        service.fetch(id).unwrap();
        drop(service);
    }

    #[test]
    fn test_worker_state_tracks_lifecycle() {
        let service = TaskService::with_defaults().unwrap();
        assert_eq!(service.worker_state(), None);

        service.start().unwrap();
        let id = service.submit(OpKind::Sine, 1.0).unwrap();
        service.fetch(id).unwrap();
        assert!(service.worker_state().is_some());

        service.stop().unwrap();
        assert_eq!(service.worker_state(), None);
    }
}
