//! Telemetry for the task service.
//!
//! Counters and latency histograms collected by the service and worker,
//! plus exporters for dumping a snapshot.

pub mod export;
pub mod metrics;

pub use export::{ConsoleExporter, JsonExporter, MetricsExporter};
pub use metrics::{Metrics, MetricsSnapshot};
