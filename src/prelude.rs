pub use crate::config::{Config, ConfigBuilder, Precision, StopPolicy};
pub use crate::error::{Error, Result};
pub use crate::executor::{OpKind, Task, TaskId, TaskService, TaskStatus, WorkerState};
pub use crate::telemetry::{MetricsExporter, MetricsSnapshot};
