//! Flow eviction schemes (spec.md §4.4, §9 Open Questions: "at least one of
//! (timer-wheel, lazy) ... exposed through a single configurable interface").

pub mod lazy;
pub mod timer_wheel;

pub use lazy::LazyTimeouts;
pub use timer_wheel::TimerWheel;

use std::time::{Duration, Instant};

/// The single configurable eviction interface the classifier drives,
/// regardless of which scheme is selected.
pub enum EvictionScheme {
    TimerWheel(TimerWheel),
    Lazy(LazyTimeouts),
}

impl EvictionScheme {
    /// Records that flow `id` was seen at `now` and should not be evicted
    /// before `timeout` elapses.
    pub fn touch(&mut self, id: usize, now: Instant, timeout: Duration) {
        match self {
            EvictionScheme::TimerWheel(wheel) => wheel.schedule(id, now, timeout),
            EvictionScheme::Lazy(lazy) => lazy.touch(id, now, timeout),
        }
    }

    /// Lazy-mode transparent expiry check; always `false` under
    /// timer-wheel mode, since that scheme evicts out-of-band via `sweep`.
    pub fn is_expired(&self, id: usize, now: Instant) -> bool {
        match self {
            EvictionScheme::TimerWheel(_) => false,
            EvictionScheme::Lazy(lazy) => lazy.is_expired(id, now),
        }
    }

    /// Advances a timer-wheel scheme by one slot, returning ids to evict;
    /// always empty under lazy mode.
    pub fn sweep(&mut self, now: Instant) -> Vec<usize> {
        match self {
            EvictionScheme::TimerWheel(wheel) => wheel.tick(now),
            EvictionScheme::Lazy(_) => Vec::new(),
        }
    }
}
