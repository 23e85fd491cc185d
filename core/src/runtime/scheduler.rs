//! Per-thread cooperative task scheduler (spec.md §4.8 "Scheduling
//! model", §5 "Parallel kernel threads, each running a cooperative,
//! non-preemptive scheduler over runnable tasks").
//!
//! One [`Scheduler`] belongs to exactly one worker thread; nothing here is
//! `Sync`, matching spec.md §5 ("Flow tables... are per-thread, no lock on
//! the hot path") applied to the scheduler itself. Cross-thread handoff
//! goes through [`super::pipeliner::Pipeliner`], the one framework-provided
//! primitive that is allowed to touch more than one thread's state.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::task::{ReschedDecision, Task, TaskContext, TaskId};
use super::timer::TimerWheel;

/// A driver-stop flag a handler can raise from any thread to ask every
/// worker's scheduler loop to return promptly (spec.md §4.8
/// "Cancellation", §5: "Driver-stop is cooperative; tasks check and
/// return.").
#[derive(Clone, Default)]
pub struct DriverStop(Arc<AtomicBool>);

impl DriverStop {
    pub fn new() -> Self {
        DriverStop::default()
    }

    pub fn please_stop_driver(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One thread's runnable-task queue, timer wheel, and parked-task set.
pub struct Scheduler {
    tasks: Vec<Option<Task>>,
    run_queue: VecDeque<TaskId>,
    queued: HashSet<TaskId>,
    timers: TimerWheel,
    stop: DriverStop,
}

impl Scheduler {
    pub fn new(stop: DriverStop) -> Self {
        Scheduler {
            tasks: Vec::new(),
            run_queue: VecDeque::new(),
            queued: HashSet::new(),
            timers: TimerWheel::new(),
            stop,
        }
    }

    pub fn driver_stop(&self) -> &DriverStop {
        &self.stop
    }

    /// Installs a new task, runnable immediately (spec.md §4.8: "Packet
    /// source elements typically install a task").
    pub fn spawn(&mut self, body: impl FnMut(&TaskContext) -> bool + Send + 'static) -> TaskId {
        let id = TaskId(self.tasks.len());
        self.tasks.push(Some(Task { body: Box::new(body) }));
        self.enqueue(id);
        id
    }

    /// Wakes a parked task by putting it back on the run queue, the
    /// external counterpart to a task returning `false` (spec.md §4.8:
    /// "park until `reschedule()` is invoked externally").
    pub fn wake(&mut self, id: TaskId) {
        self.enqueue(id);
    }

    fn enqueue(&mut self, id: TaskId) {
        if self.queued.insert(id) {
            self.run_queue.push_back(id);
        }
    }

    /// Moves every timer that has expired by `now` onto the run queue.
    pub fn advance_timers(&mut self, now: Instant) {
        for id in self.timers.expire(now) {
            self.enqueue(id);
        }
    }

    pub fn next_timer_expiry(&self) -> Option<Instant> {
        self.timers.next_expiry()
    }

    /// Runs the single task at the head of the run queue, if any.
    /// Returns whether a task ran and reported that it did work — the
    /// backoff hint spec.md §4.8 describes ("a task returns a boolean
    /// indicating whether it did work").
    pub fn run_once(&mut self) -> bool {
        let Some(id) = self.run_queue.pop_front() else {
            return false;
        };
        self.queued.remove(&id);

        let Some(slot) = self.tasks.get_mut(id.0) else {
            return false;
        };
        let Some(mut task) = slot.take() else {
            return false;
        };

        let ctx = TaskContext::default();
        let did_work = (task.body)(&ctx);

        match ctx.take_decision() {
            Some(ReschedDecision::Immediate) => self.enqueue(id),
            Some(ReschedDecision::After(at)) => self.timers.schedule(id, at),
            None if did_work => self.enqueue(id),
            None => {}
        }

        self.tasks[id.0] = Some(task);
        did_work
    }

    /// Runs tasks until the run queue drains or the driver-stop flag is
    /// raised, firing any timers whose expiry has already passed at
    /// `now`. Returns the number of tasks that reported doing work.
    pub fn run_until_idle(&mut self, now: Instant) -> usize {
        self.advance_timers(now);
        let mut worked = 0;
        while !self.stop.is_stopped() {
            if !self.run_once() {
                break;
            }
            worked += 1;
        }
        worked
    }

    pub fn runnable_len(&self) -> usize {
        self.run_queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn task_returning_true_is_rescheduled_at_tail() {
        let mut scheduler = Scheduler::new(DriverStop::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        scheduler.spawn(move |_ctx| {
            calls2.fetch_add(1, Ordering::Relaxed);
            true
        });

        for _ in 0..3 {
            assert!(scheduler.run_once());
        }
        assert_eq!(calls.load(Ordering::Relaxed), 3);
        assert_eq!(scheduler.runnable_len(), 1, "still rescheduled for a 4th run");
    }

    #[test]
    fn task_returning_false_parks_until_woken() {
        let mut scheduler = Scheduler::new(DriverStop::new());
        let id = scheduler.spawn(|_ctx| false);
        assert!(!scheduler.run_once());
        assert_eq!(scheduler.runnable_len(), 0);
        scheduler.wake(id);
        assert_eq!(scheduler.runnable_len(), 1);
    }

    #[test]
    fn reschedule_after_defers_to_timer_wheel() {
        let mut scheduler = Scheduler::new(DriverStop::new());
        let base = Instant::now();
        let deadline = base + std::time::Duration::from_millis(5);
        scheduler.spawn(move |ctx| {
            ctx.reschedule_after(deadline);
            true
        });
        assert!(scheduler.run_once());
        assert_eq!(scheduler.runnable_len(), 0, "deferred to the timer wheel, not the run queue");
        scheduler.advance_timers(deadline);
        assert_eq!(scheduler.runnable_len(), 1);
    }

    #[test]
    fn driver_stop_halts_run_until_idle() {
        let stop = DriverStop::new();
        let mut scheduler = Scheduler::new(stop.clone());
        scheduler.spawn(move |ctx| {
            ctx.fast_reschedule();
            true
        });
        stop.please_stop_driver();
        let worked = scheduler.run_until_idle(Instant::now());
        assert_eq!(worked, 0);
    }
}
