//! Minimal logging facade, carried as ambient stack even though spec.md
//! marks "logging" as an external collaborator concern — what's out of
//! scope is a specific sink/format, not the seam elements log through.
//!
//! Grounded in FastClick's `click_chatter`/rate-limited error calls: one
//! free-standing [`Logger`] trait, a severity enum, and a [`RateLimiter`]
//! that implements the "first occurrence is logged" rule from spec.md §7.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug)]
pub struct LogRecord<'a> {
    pub level: LogLevel,
    pub target: &'a str,
    pub message: &'a str,
}

/// Implemented by whatever sink a host process wires in. Never called on
/// the packet hot path — only from `configure`/`initialize`, handler
/// writes, and rate-limited counters.
pub trait Logger: Send + Sync {
    fn log(&self, record: LogRecord<'_>);
}

/// Default logger: discards everything. Used when no host sink is wired.
#[derive(Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _record: LogRecord<'_>) {}
}

/// A logger used by tests and examples; writes to stderr.
pub struct StderrLogger;

impl Logger for StderrLogger {
    fn log(&self, record: LogRecord<'_>) {
        eprintln!("[{:?}] {}: {}", record.level, record.target, record.message);
    }
}

/// Rate limiter for per-element drop/error counters (spec.md §7: "a
/// per-element drop counter is incremented, and the first occurrence is
/// logged"). `should_log` returns true at most once per `interval`.
pub struct RateLimiter {
    interval: Duration,
    last_logged: spin::Mutex<Option<Instant>>,
    hit_count: AtomicU64,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        RateLimiter {
            interval,
            last_logged: spin::Mutex::new(None),
            hit_count: AtomicU64::new(0),
        }
    }

    /// Returns true the first time it is called, and again at most once
    /// per `interval` thereafter. Always increments the underlying counter.
    pub fn should_log(&self) -> bool {
        self.hit_count.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        let mut last = self.last_logged.lock();
        match *last {
            Some(previous) if now.duration_since(previous) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count.load(Ordering::Relaxed)
    }
}

/// A simple atomic counter, the building block for per-element drop/error
/// counters referenced across spec.md §4.4, §7, and for gauges like
/// `flows_active` (spec.md §8: "counter `table_fill == 1` then `0`") that
/// must come back down as well as go up.
#[derive(Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub const fn new() -> Self {
        Counter(AtomicU64::new(0))
    }

    pub fn incr(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Subtracts one, saturating at zero rather than wrapping — a gauge
    /// going down more often than it went up is a bug elsewhere, not
    /// something this counter should paper over with a wraparound value.
    pub fn decr(&self) -> u64 {
        self.0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)))
            .unwrap_or(0)
            .saturating_sub(1)
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decr_saturates_at_zero() {
        let counter = Counter::new();
        assert_eq!(counter.decr(), 0);
        counter.incr();
        counter.incr();
        assert_eq!(counter.decr(), 1);
        assert_eq!(counter.decr(), 0);
        assert_eq!(counter.decr(), 0);
    }
}
