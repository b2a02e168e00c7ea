//! SUTRA - Serial Task Execution Service
//!
//! Many producers submit small numeric tasks, a single worker thread runs
//! them in admission order, and each producer blocks on the result of the
//! specific task it cares about.
//!
//! # Quick Start
//!
//! ```no_run
//! use sutra_rs::prelude::*;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let service = Arc::new(TaskService::with_defaults().unwrap());
//! service.start().unwrap();
//!
//! let producer = {
//!     let service = service.clone();
//!     thread::spawn(move || service.submit(OpKind::Square, 3.0).unwrap())
//! };
//! let id = producer.join().unwrap();
//!
//! let task = service.fetch(id).unwrap();
//! println!("{}", task); // 3^2 = 9
//!
//! service.stop().unwrap();
//! ```
//!
//! # Features
//!
//! - **Serial execution**: one worker, strict FIFO, ids in admission order
//! - **Targeted waits**: `fetch` blocks on one id, with optional timeout
//! - **Explicit shutdown policy**: abandon or drain queued work on `stop`
//! - **Configurable precision**: compute in `f32` or `f64`
//! - **Telemetry**: counters and latency histograms with JSON/console export

// Lint configuration
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod telemetry;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder, Precision, StopPolicy};
pub use error::{Error, Result};
pub use executor::{OpKind, Task, TaskId, TaskService, TaskStatus, WorkerState};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_basic_round_trip() {
        let service = TaskService::with_defaults().unwrap();
        service.start().unwrap();

        let id = service.submit(OpKind::SquareRoot, 16.0).unwrap();
        assert_eq!(service.fetch(id).unwrap().result, Some(4.0));

        service.stop().unwrap();
    }

    #[test]
    fn test_shared_between_threads() {
        let service = Arc::new(TaskService::with_defaults().unwrap());
        service.start().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let service = service.clone();
                thread::spawn(move || {
                    let id = service.submit(OpKind::Square, i as f64).unwrap();
                    service.fetch(id).unwrap()
                })
            })
            .collect();

        for handle in handles {
            let task = handle.join().unwrap();
            assert_eq!(task.result, Some(task.argument * task.argument));
        }

        service.stop().unwrap();
    }
}
