//! Metrics export functionality for various formats.

use super::metrics::MetricsSnapshot;
use crate::error::{Error, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Trait for exporting metrics to different formats
pub trait MetricsExporter: Send + Sync {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()>;
}

/// Export metrics to a JSON file
#[derive(Debug)]
pub struct JsonExporter {
    output_path: PathBuf,
}

impl JsonExporter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }
}

impl MetricsExporter for JsonExporter {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let serializable = SerializableSnapshot::from(snapshot);
        let json = serde_json::to_string_pretty(&serializable)
            .map_err(|e| Error::serialization(format!("metrics to JSON: {}", e)))?;

        std::fs::write(&self.output_path, json)?;
        tracing::debug!(path = %self.output_path.display(), "metrics exported");

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
struct SerializableSnapshot {
    uptime_secs: f64,
    tasks_submitted: u64,
    tasks_completed: u64,
    tasks_unrecognized: u64,
    tasks_abandoned: u64,
    tasks_rejected: u64,
    idle_time_ms: u64,
    busy_time_ms: u64,
    avg_queue_wait_us: f64,
    p99_queue_wait_us: f64,
    avg_execution_us: f64,
    p50_execution_us: f64,
    p99_execution_us: f64,
    max_execution_us: f64,
    utilization: f64,
    tasks_per_second: f64,
}

impl From<&MetricsSnapshot> for SerializableSnapshot {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        Self {
            uptime_secs: snapshot.uptime.as_secs_f64(),
            tasks_submitted: snapshot.tasks_submitted,
            tasks_completed: snapshot.tasks_completed,
            tasks_unrecognized: snapshot.tasks_unrecognized,
            tasks_abandoned: snapshot.tasks_abandoned,
            tasks_rejected: snapshot.tasks_rejected,
            idle_time_ms: snapshot.idle_time_ns / 1_000_000,
            busy_time_ms: snapshot.busy_time_ns / 1_000_000,
            avg_queue_wait_us: snapshot.avg_queue_wait_ns as f64 / 1_000.0,
            p99_queue_wait_us: snapshot.p99_queue_wait_ns as f64 / 1_000.0,
            avg_execution_us: snapshot.avg_execution_ns as f64 / 1_000.0,
            p50_execution_us: snapshot.p50_execution_ns as f64 / 1_000.0,
            p99_execution_us: snapshot.p99_execution_ns as f64 / 1_000.0,
            max_execution_us: snapshot.max_execution_ns as f64 / 1_000.0,
            utilization: snapshot.utilization(),
            tasks_per_second: snapshot.tasks_per_second(),
        }
    }
}

/// Export metrics to stdout
#[derive(Debug, Default)]
pub struct ConsoleExporter {
    verbose: bool,
}

impl ConsoleExporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl MetricsExporter for ConsoleExporter {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        println!("=== Task Service Metrics ===");
        println!("Uptime: {:.2}s", snapshot.uptime.as_secs_f64());
        println!("Tasks submitted: {}", snapshot.tasks_submitted);
        println!("Tasks completed: {}", snapshot.tasks_completed);
        println!("Tasks unrecognized: {}", snapshot.tasks_unrecognized);
        println!("Tasks abandoned: {}", snapshot.tasks_abandoned);
        println!("Tasks rejected: {}", snapshot.tasks_rejected);
        println!("Worker utilization: {:.1}%", snapshot.utilization() * 100.0);
        println!("Tasks/sec: {:.2}", snapshot.tasks_per_second());

        if self.verbose {
            println!("\nQueue wait:");
            println!("  Average: {:.2}μs", snapshot.avg_queue_wait_ns as f64 / 1_000.0);
            println!("  P99: {:.2}μs", snapshot.p99_queue_wait_ns as f64 / 1_000.0);

            println!("\nExecution:");
            println!("  Average: {:.2}μs", snapshot.avg_execution_ns as f64 / 1_000.0);
            println!("  P50: {:.2}μs", snapshot.p50_execution_ns as f64 / 1_000.0);
            println!("  P99: {:.2}μs", snapshot.p99_execution_ns as f64 / 1_000.0);
            println!("  Max: {:.2}μs", snapshot.max_execution_ns as f64 / 1_000.0);
        }

        println!("============================");

        Ok(())
    }
}
