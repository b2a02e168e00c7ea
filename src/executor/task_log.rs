//! Append-only task log and the FIFO of tasks waiting for the worker.
//!
//! Neither type synchronizes on its own; the service keeps both behind one lock.

use super::task::{OpKind, Task, TaskId, TaskStatus};
use std::collections::VecDeque;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Slot {
    task: Task,
    status: TaskStatus,
}

/// Every admitted task, indexed by id.
#[derive(Debug, Default)]
pub(crate) struct TaskLog {
    slots: Vec<Slot>,
    completed: usize,
}

impl TaskLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new pending task. Its id is the number of tasks admitted so far.
    pub fn admit(&mut self, kind: OpKind, argument: f64) -> Task {
        let id = TaskId::new(self.slots.len() as u64);
        let task = Task::admit(id, kind, argument);
        self.slots.push(Slot {
            task,
            status: TaskStatus::Pending,
        });
        task
    }

    /// Store the worker's result. Only a pending slot accepts one.
    pub fn complete(&mut self, id: TaskId, result: Option<f64>, finished_at: Instant) -> bool {
        match id.index().and_then(|i| self.slots.get_mut(i)) {
            Some(slot) if slot.status == TaskStatus::Pending => {
                slot.task.result = result;
                slot.task.finished_at = Some(finished_at);
                slot.status = TaskStatus::Completed;
                self.completed += 1;
                true
            }
            _ => false,
        }
    }

    pub fn abandon(&mut self, id: TaskId) {
        if let Some(slot) = id.index().and_then(|i| self.slots.get_mut(i)) {
            if slot.status == TaskStatus::Pending {
                slot.status = TaskStatus::Abandoned;
            }
        }
    }

    pub fn status(&self, id: TaskId) -> TaskStatus {
        id.index()
            .and_then(|i| self.slots.get(i))
            .map_or(TaskStatus::Unknown, |slot| slot.status)
    }

    /// The task if its result has been written.
    pub fn completed_task(&self, id: TaskId) -> Option<Task> {
        id.index()
            .and_then(|i| self.slots.get(i))
            .filter(|slot| slot.status == TaskStatus::Completed)
            .map(|slot| slot.task)
    }

    pub fn admitted(&self) -> usize {
        self.slots.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }
}

/// Strict FIFO of admitted tasks the worker has not picked up.
#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    tasks: VecDeque<Task>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    pub fn pop(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Task> + '_ {
        self.tasks.drain(..)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_follow_admission_order() {
        let mut log = TaskLog::new();
        for expected in 0..5u64 {
            let task = log.admit(OpKind::Sine, expected as f64);
            assert_eq!(task.id, TaskId::new(expected));
        }
        assert_eq!(log.admitted(), 5);
        assert_eq!(log.completed(), 0);
    }

    #[test]
    fn test_admitted_is_not_completed() {
        let mut log = TaskLog::new();
        let task = log.admit(OpKind::Square, 3.0);

        assert_eq!(log.status(task.id), TaskStatus::Pending);
        assert!(log.completed_task(task.id).is_none());

        assert!(log.complete(task.id, Some(9.0), Instant::now()));
        assert_eq!(log.status(task.id), TaskStatus::Completed);
        assert_eq!(log.completed_task(task.id).unwrap().result, Some(9.0));
        assert_eq!(log.completed(), 1);
    }

    #[test]
    fn test_result_written_once() {
        let mut log = TaskLog::new();
        let task = log.admit(OpKind::Square, 2.0);

        assert!(log.complete(task.id, Some(4.0), Instant::now()));
        assert!(!log.complete(task.id, Some(5.0), Instant::now()));
        assert_eq!(log.completed_task(task.id).unwrap().result, Some(4.0));
        assert_eq!(log.completed(), 1);
    }

    #[test]
    fn test_abandoned_never_completes() {
        let mut log = TaskLog::new();
        let task = log.admit(OpKind::Sine, 1.0);

        log.abandon(task.id);
        assert_eq!(log.status(task.id), TaskStatus::Abandoned);
        assert!(!log.complete(task.id, Some(1.0), Instant::now()));
        assert!(log.completed_task(task.id).is_none());
    }

    #[test]
    fn test_unknown_ids() {
        let log = TaskLog::new();
        assert_eq!(log.status(TaskId::new(0)), TaskStatus::Unknown);
        assert!(log.completed_task(TaskId::new(10)).is_none());
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut log = TaskLog::new();
        let mut queue = PendingQueue::new();
        for i in 0..3 {
            queue.push(log.admit(OpKind::Square, i as f64));
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop().unwrap().id, TaskId::new(0));
        assert_eq!(queue.pop().unwrap().id, TaskId::new(1));

        let rest: Vec<_> = queue.drain().map(|t| t.id).collect();
        assert_eq!(rest, vec![TaskId::new(2)]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_unaddressable_id_is_unknown() {
        let mut log = TaskLog::new();
        log.admit(OpKind::Sine, 0.0);

        let far = TaskId::new(u64::MAX);
        assert_eq!(log.status(far), TaskStatus::Unknown);
        assert!(log.completed_task(far).is_none());
        assert!(!log.complete(far, Some(1.0), Instant::now()));
        log.abandon(far);
        assert_eq!(log.completed(), 0);
    }
}
