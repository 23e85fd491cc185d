//! Timer min-heap (spec.md §4.8 "Timers & notifiers": "Timers are a
//! min-heap keyed by expiry time; a thread's timer expiry triggers a
//! callback which typically wakes a task.").
//!
//! Distinct from [`crate::flow::timeout::timer_wheel`]'s bucketed FCB
//! eviction wheel — this one is the execution model's general-purpose
//! "wake this task no earlier than `at`" primitive, used by
//! [`super::task::TaskContext::reschedule_after`].

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use super::task::TaskId;

/// A min-heap of `(expiry, insertion order, task)` triples. The insertion
/// sequence number is a tie-break so two timers expiring at the same
/// instant fire in scheduling order rather than an arbitrary heap order.
#[derive(Default)]
pub struct TimerWheel {
    heap: BinaryHeap<Reverse<(Instant, u64, TaskId)>>,
    next_seq: u64,
}

impl TimerWheel {
    pub fn new() -> Self {
        TimerWheel::default()
    }

    pub fn schedule(&mut self, task: TaskId, at: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse((at, seq, task)));
    }

    /// Pops every timer whose expiry is `<= now`, in expiry order.
    pub fn expire(&mut self, now: Instant) -> Vec<TaskId> {
        let mut fired = Vec::new();
        while let Some(&Reverse((at, _, _))) = self.heap.peek() {
            if at > now {
                break;
            }
            let Reverse((_, _, task)) = self.heap.pop().expect("peek just confirmed an entry");
            fired.push(task);
        }
        fired
    }

    pub fn next_expiry(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse((at, _, _))| *at)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn expires_only_entries_at_or_before_now() {
        let base = Instant::now();
        let mut wheel = TimerWheel::new();
        wheel.schedule(TaskId(1), base + Duration::from_millis(10));
        wheel.schedule(TaskId(2), base + Duration::from_millis(20));

        assert!(wheel.expire(base).is_empty());
        assert_eq!(wheel.expire(base + Duration::from_millis(10)), vec![TaskId(1)]);
        assert_eq!(wheel.expire(base + Duration::from_millis(20)), vec![TaskId(2)]);
        assert!(wheel.is_empty());
    }

    #[test]
    fn equal_expiry_fires_in_scheduling_order() {
        let at = Instant::now();
        let mut wheel = TimerWheel::new();
        wheel.schedule(TaskId(1), at);
        wheel.schedule(TaskId(2), at);
        wheel.schedule(TaskId(3), at);
        assert_eq!(wheel.expire(at), vec![TaskId(1), TaskId(2), TaskId(3)]);
    }
}
