//! Metrics collection for service monitoring.

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// One hour in nanoseconds, 3 significant figures.
const HISTOGRAM_MAX_NS: u64 = 3_600_000_000_000;
const HISTOGRAM_SIGFIG: u8 = 3;

fn new_histogram() -> Histogram<u64> {
    Histogram::new_with_max(HISTOGRAM_MAX_NS, HISTOGRAM_SIGFIG)
        .expect("histogram bounds are constant and valid")
}

/// Service metrics collector
#[derive(Debug)]
pub struct Metrics {
    // Task counters
    tasks_submitted: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_unrecognized: AtomicU64,
    tasks_abandoned: AtomicU64,
    tasks_rejected: AtomicU64,

    // Worker time split
    idle_time_ns: AtomicU64,
    busy_time_ns: AtomicU64,

    // Admission to pick-up, and pick-up to result
    queue_wait_histogram: RwLock<Histogram<u64>>,
    execution_histogram: RwLock<Histogram<u64>>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            tasks_submitted: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_unrecognized: AtomicU64::new(0),
            tasks_abandoned: AtomicU64::new(0),
            tasks_rejected: AtomicU64::new(0),
            idle_time_ns: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
            queue_wait_histogram: RwLock::new(new_histogram()),
            execution_histogram: RwLock::new(new_histogram()),
            start_time: Instant::now(),
        }
    }

    pub fn record_task_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_rejected(&self) {
        self.tasks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a processed task with how long it queued and how long it ran.
    pub fn record_task_completed(&self, queue_wait: Duration, execution: Duration) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);

        let execution_ns = duration_ns(execution);
        self.busy_time_ns.fetch_add(execution_ns, Ordering::Relaxed);

        let _ = self
            .queue_wait_histogram
            .write()
            .record(duration_ns(queue_wait).min(HISTOGRAM_MAX_NS));
        let _ = self
            .execution_histogram
            .write()
            .record(execution_ns.min(HISTOGRAM_MAX_NS));
    }

    pub fn record_task_unrecognized(&self) {
        self.tasks_unrecognized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tasks_abandoned(&self, count: u64) {
        self.tasks_abandoned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_idle_time(&self, idle: Duration) {
        self.idle_time_ns.fetch_add(duration_ns(idle), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let queue_wait = self.queue_wait_histogram.read();
        let execution = self.execution_histogram.read();

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_unrecognized: self.tasks_unrecognized.load(Ordering::Relaxed),
            tasks_abandoned: self.tasks_abandoned.load(Ordering::Relaxed),
            tasks_rejected: self.tasks_rejected.load(Ordering::Relaxed),
            idle_time_ns: self.idle_time_ns.load(Ordering::Relaxed),
            busy_time_ns: self.busy_time_ns.load(Ordering::Relaxed),
            avg_queue_wait_ns: mean(&queue_wait),
            p99_queue_wait_ns: queue_wait.value_at_quantile(0.99),
            avg_execution_ns: mean(&execution),
            p50_execution_ns: execution.value_at_quantile(0.50),
            p99_execution_ns: execution.value_at_quantile(0.99),
            max_execution_ns: execution.max(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn duration_ns(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

fn mean(histogram: &Histogram<u64>) -> u64 {
    if histogram.len() > 0 {
        histogram.mean() as u64
    } else {
        0
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub tasks_unrecognized: u64,
    pub tasks_abandoned: u64,
    pub tasks_rejected: u64,
    pub idle_time_ns: u64,
    pub busy_time_ns: u64,
    pub avg_queue_wait_ns: u64,
    pub p99_queue_wait_ns: u64,
    pub avg_execution_ns: u64,
    pub p50_execution_ns: u64,
    pub p99_execution_ns: u64,
    pub max_execution_ns: u64,
}

impl MetricsSnapshot {
    /// Fraction of worker time spent computing (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        let total_time = self.idle_time_ns + self.busy_time_ns;
        if total_time == 0 {
            return 0.0;
        }
        self.busy_time_ns as f64 / total_time as f64
    }

    pub fn tasks_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.tasks_completed as f64 / seconds
    }

    /// Admitted tasks that have neither completed nor been abandoned.
    pub fn in_flight(&self) -> u64 {
        self.tasks_submitted
            .saturating_sub(self.tasks_completed)
            .saturating_sub(self.tasks_abandoned)
    }
}
