//! Lazy (epoch-based) flow eviction (spec.md §4.4).
//!
//! "Each entry carries an epoch; lookup compares epoch to `recent`;
//! entries older than `timeout` are transparently treated as absent and
//! may be reclaimed on next insert." No maintenance pass: expiry is
//! checked on access, and the classifier is responsible for actually
//! reclaiming an expired slot (spec.md §8 scenario 4).

use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Epoch {
    lastseen: Instant,
    timeout: Duration,
}

#[derive(Default)]
pub struct LazyTimeouts {
    epochs: HashMap<usize, Epoch>,
}

impl LazyTimeouts {
    pub fn new() -> Self {
        LazyTimeouts::default()
    }

    pub fn touch(&mut self, id: usize, now: Instant, timeout: Duration) {
        self.epochs.insert(id, Epoch { lastseen: now, timeout });
    }

    /// True if `id` has no recorded epoch, or its age at `now` has reached
    /// its timeout — in both cases the caller must treat the flow as
    /// absent even though the table entry may still physically exist.
    pub fn is_expired(&self, id: usize, now: Instant) -> bool {
        match self.epochs.get(&id) {
            None => true,
            Some(epoch) => now.saturating_duration_since(epoch.lastseen) >= epoch.timeout,
        }
    }

    pub fn remove(&mut self, id: usize) {
        self.epochs.remove(&id);
    }
}
