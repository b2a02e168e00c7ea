use crate::executor::TaskId;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("service not started")]
    NotStarted,

    #[error("service already started")]
    AlreadyStarted,

    #[error("service stopped")]
    Stopped,

    #[error("timed out after {waited:?} waiting for task {id}")]
    Timeout { id: TaskId, waited: Duration },

    #[error("pending queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("config error: {0}")]
    Config(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("worker panic: {0}")]
    WorkerPanic(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Error::Serialization(msg.into())
    }

    /// True for errors caused by calling the service in the wrong lifecycle state.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Error::NotStarted | Error::AlreadyStarted | Error::Stopped)
    }
}
