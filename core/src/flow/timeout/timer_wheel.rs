//! Timer-wheel flow eviction (spec.md §4.4).
//!
//! "On insert, schedule the FCB at slot `now + timeout`; a maintenance
//! pass walks the current slot, evicting FCBs whose `recent − lastseen ≥
//! timeout` and rescheduling the rest at `timeout − age`." One tick
//! advances the wheel by one slot and returns the ids to evict.

use std::time::{Duration, Instant};

struct Entry {
    id: usize,
    lastseen: Instant,
    timeout: Duration,
}

pub struct TimerWheel {
    slots: Vec<Vec<Entry>>,
    slot_duration: Duration,
    current: usize,
}

impl TimerWheel {
    pub fn new(slot_count: usize, slot_duration: Duration) -> Self {
        assert!(slot_count > 0, "timer wheel needs at least one slot");
        TimerWheel {
            slots: (0..slot_count).map(|_| Vec::new()).collect(),
            slot_duration,
            current: 0,
        }
    }

    fn ticks_for(&self, duration: Duration) -> usize {
        let ticks = duration.as_nanos() / self.slot_duration.as_nanos().max(1);
        (ticks as usize).max(1).min(self.slots.len() - 1)
    }

    /// Schedules `id`, seen at `lastseen`, for eviction no earlier than
    /// `timeout` from now.
    pub fn schedule(&mut self, id: usize, lastseen: Instant, timeout: Duration) {
        let offset = self.ticks_for(timeout);
        let slot = (self.current + offset) % self.slots.len();
        self.slots[slot].push(Entry { id, lastseen, timeout });
    }

    /// Advances the wheel by one slot at time `now`, returning ids whose
    /// age has reached their timeout; everything else still alive in that
    /// slot is rescheduled at `timeout - age`.
    pub fn tick(&mut self, now: Instant) -> Vec<usize> {
        self.current = (self.current + 1) % self.slots.len();
        let due = std::mem::take(&mut self.slots[self.current]);
        let mut evicted = Vec::new();
        for entry in due {
            let age = now.saturating_duration_since(entry.lastseen);
            if age >= entry.timeout {
                evicted.push(entry.id);
            } else {
                let remaining = entry.timeout - age;
                let offset = self.ticks_for(remaining);
                let slot = (self.current + offset) % self.slots.len();
                self.slots[slot].push(Entry {
                    id: entry.id,
                    lastseen: entry.lastseen,
                    timeout: entry.timeout,
                });
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_once_timeout_elapses() {
        let mut wheel = TimerWheel::new(16, Duration::from_millis(1));
        let start = Instant::now();
        wheel.schedule(42, start, Duration::from_millis(10));
        for tick in 1..10 {
            let evicted = wheel.tick(start + Duration::from_millis(tick));
            assert!(evicted.is_empty(), "should not evict before the timeout elapses");
        }
        let evicted = wheel.tick(start + Duration::from_millis(11));
        assert_eq!(evicted, vec![42]);
    }
}
