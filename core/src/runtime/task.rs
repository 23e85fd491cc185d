//! Cooperative tasks (spec.md §2 GLOSSARY "Task", §4.8, §9 "Coroutine-like
//! control flow. There is none; the execution model is cooperative tasks.
//! A task is a closure plus a reschedule flag.").
//!
//! A task's body is a boolean-returning closure — "did work this turn" —
//! matching spec.md §4.8 exactly. Explicit suspension is available through
//! [`TaskContext`], handed to the closure on every call: `fast_reschedule`
//! re-enqueues at the tail immediately, `reschedule_after` defers to the
//! timer wheel, and returning `false` without calling either parks the
//! task until [`super::scheduler::Scheduler::wake`] is invoked externally
//! (spec.md §4.8 "Suspension points").

use std::cell::Cell;
use std::time::Instant;

/// Identifies one task within a [`super::scheduler::Scheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(pub usize);

/// What a task's closure requested this turn, read by the scheduler right
/// after the call returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum ReschedDecision {
    Immediate,
    After(Instant),
}

/// Handed to a task's body on every invocation. Calling neither method
/// leaves the decision to the closure's boolean return value (spec.md
/// §4.8: true means "did work, reschedule"; false means "park").
#[derive(Default)]
pub struct TaskContext {
    pending: Cell<Option<ReschedDecision>>,
}

impl TaskContext {
    /// Yields: re-enqueue this task at the tail of the run queue.
    pub fn fast_reschedule(&self) {
        self.pending.set(Some(ReschedDecision::Immediate));
    }

    /// Defers this task to the timer wheel; it becomes runnable again no
    /// earlier than `at`.
    pub fn reschedule_after(&self, at: Instant) {
        self.pending.set(Some(ReschedDecision::After(at)));
    }

    pub(super) fn take_decision(&self) -> Option<ReschedDecision> {
        self.pending.take()
    }
}

pub(super) type TaskBody = Box<dyn FnMut(&TaskContext) -> bool + Send>;

pub(super) struct Task {
    pub(super) body: TaskBody,
}
