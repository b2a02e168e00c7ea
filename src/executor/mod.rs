//! Task execution infrastructure.
//!
//! This module provides the task model, the shared task log and pending
//! queue, the single worker thread, and the [`TaskService`] that ties them
//! together.

pub mod numeric;
pub mod service;
pub mod task;
pub(crate) mod task_log;
pub mod worker;

pub use numeric::Numeric;
pub use service::TaskService;
pub use task::{OpKind, Task, TaskId, TaskStatus};
pub use worker::WorkerState;
