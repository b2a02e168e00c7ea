//! Task representation.

use std::fmt;
use std::time::Instant;

/// Sequence number assigned at admission. Equal to the number of tasks
/// admitted before this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(raw: u64) -> Self {
        TaskId(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Slot position, or `None` when the id does not fit in `usize`.
    pub(crate) fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl From<u64> for TaskId {
    fn from(raw: u64) -> Self {
        TaskId(raw)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Operation the worker applies to a task's argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Sine,
    SquareRoot,
    Square,
    /// A numeric tag with no known operation. Processed without a result.
    Unrecognized(u32),
}

impl OpKind {
    /// Map a legacy numeric tag: 1 = sine, 2 = square root, 3 = square.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => OpKind::Sine,
            2 => OpKind::SquareRoot,
            3 => OpKind::Square,
            other => OpKind::Unrecognized(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            OpKind::Sine => 1,
            OpKind::SquareRoot => 2,
            OpKind::Square => 3,
            OpKind::Unrecognized(code) => code,
        }
    }

    pub fn is_recognized(self) -> bool {
        !matches!(self, OpKind::Unrecognized(_))
    }

    /// Short name used in logs and result file names.
    pub fn name(self) -> &'static str {
        match self {
            OpKind::Sine => "sin",
            OpKind::SquareRoot => "sqrt",
            OpKind::Square => "pow",
            OpKind::Unrecognized(_) => "unrecognized",
        }
    }
}

/// Where a task is in its life inside the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// No task with this id has been admitted.
    Unknown,
    Pending,
    Completed,
    /// Still queued when the service stopped under `StopPolicy::Abandon`.
    Abandoned,
}

/// One unit of work and, once processed, its result.
///
/// `result` is `None` until the worker has run the task. On a completed
/// task, `None` means the kind was [`OpKind::Unrecognized`].
#[derive(Debug, Clone, Copy)]
pub struct Task {
    pub id: TaskId,
    pub kind: OpKind,
    pub argument: f64,
    pub result: Option<f64>,
    pub admitted_at: Instant,
    pub finished_at: Option<Instant>,
}

impl Task {
    pub(crate) fn admit(id: TaskId, kind: OpKind, argument: f64) -> Self {
        Task {
            id,
            kind,
            argument,
            result: None,
            admitted_at: Instant::now(),
            finished_at: None,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.result.is_none()
    }
}

impl PartialEq for Task {
    // Timestamps are bookkeeping, not identity.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.argument.to_bits() == other.argument.to_bits()
            && self.result.map(f64::to_bits) == other.result.map(f64::to_bits)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self.result {
            Some(value) => value.to_string(),
            None => "unset".to_string(),
        };
        match self.kind {
            OpKind::Sine => write!(f, "sin({}) = {}", self.argument, result),
            OpKind::SquareRoot => write!(f, "sqrt({}) = {}", self.argument, result),
            OpKind::Square => write!(f, "{}^2 = {}", self.argument, result),
            OpKind::Unrecognized(code) => {
                write!(f, "op#{}({}) = {}", code, self.argument, result)
            }
        }
    }
}
