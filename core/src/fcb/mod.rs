//! The flow control block: per-flow state with a reserved user area
//! (spec.md §3 "FlowControlBlock", §4.5, §4.6).
//!
//! Grounded in `original_source/include/click/flow_common.hh`'s
//! `FlowControlBlock`/`FCBPool` pair: a fixed header (refcount, `lastseen`,
//! release-callback chain) plus a trailing opaque byte area whose size is
//! fixed once per graph by the flow classifier (spec.md §4.6).

pub mod pool;
pub mod stack;

pub use pool::FcbPool;
pub use stack::FcbStack;

use std::time::Instant;

/// A LIFO chain entry registered by a flow element along the path that
/// owns this flow (spec.md §4.6 `fcb_set_release_fnt`/`fcb_remove_release_fnt`).
/// Invoked in reverse registration order when the FCB's refcount reaches
/// zero, then discarded — this *is* the `release_fnt` spec.md §4.5
/// describes as running "exactly once, before the pool accepts the object".
pub type ReleaseFn = Box<dyn FnMut(&mut FlowControlBlock) + Send>;

/// Outcome of [`FlowControlBlock::acquire`]/[`FlowControlBlock::release`].
#[derive(Debug, PartialEq, Eq)]
pub enum RefOutcome {
    /// Still referenced.
    Alive,
    /// Refcount just reached zero; the release chain has already run.
    /// The caller must now return the FCB to its [`FcbPool`].
    Reclaimed,
}

/// Fixed header plus a reserved opaque data area (spec.md §3).
pub struct FlowControlBlock {
    refcount: usize,
    lastseen: Instant,
    /// Desired eviction timeout; `fcb_acquire_timeout` combines multiple
    /// requests along a path by taking the max (spec.md §4.6).
    timeout: Option<std::time::Duration>,
    release_chain: Vec<ReleaseFn>,
    /// Opaque bytes reserved by the classifier for flow elements along the
    /// path; zeroed at construction and (optionally) on reclaim.
    data: Vec<u8>,
}

impl FlowControlBlock {
    pub fn new(data_size: usize) -> Self {
        FlowControlBlock {
            refcount: 0,
            lastseen: Instant::now(),
            timeout: None,
            release_chain: Vec::new(),
            data: vec![0u8; data_size],
        }
    }

    pub fn refcount(&self) -> usize {
        self.refcount
    }

    pub fn lastseen(&self) -> Instant {
        self.lastseen
    }

    pub fn touch(&mut self, at: Instant) {
        self.lastseen = at;
    }

    pub fn timeout(&self) -> Option<std::time::Duration> {
        self.timeout
    }

    /// Requests an eviction timeout; combines with any existing request by
    /// keeping the maximum (spec.md §4.6: "multiple elements along a path
    /// combine by taking the max" — carried from `original_source`'s
    /// "do not shorten an existing timeout" rule).
    pub fn request_timeout(&mut self, requested: std::time::Duration) {
        self.timeout = Some(match self.timeout {
            Some(existing) if existing >= requested => existing,
            _ => requested,
        });
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Adds `n` to the refcount (spec.md §4.5 `acquire(n)`).
    pub fn acquire(&mut self, n: usize) {
        self.refcount += n;
    }

    /// Subtracts `n` from the refcount. Panics if this would underflow —
    /// a double-release is a contract violation asserted in debug (spec.md
    /// §7). When the count transitions to zero, every registered release
    /// callback runs in LIFO order and [`RefOutcome::Reclaimed`] is
    /// returned so the caller can return the FCB to its pool.
    pub fn release(&mut self, n: usize) -> RefOutcome {
        assert!(n <= self.refcount, "FCB refcount underflow: double release");
        self.refcount -= n;
        if self.refcount == 0 {
            let mut chain = std::mem::take(&mut self.release_chain);
            while let Some(mut callback) = chain.pop() {
                callback(self);
            }
            self.timeout = None;
            RefOutcome::Reclaimed
        } else {
            RefOutcome::Alive
        }
    }

    /// Pushes a callback onto the LIFO release chain (spec.md §4.6
    /// `fcb_set_release_fnt`).
    pub fn push_release_fnt(&mut self, callback: ReleaseFn) {
        self.release_chain.push(callback);
    }

    /// Drops the most recently pushed callback count entries matching a
    /// predicate-free pop, mirroring `fcb_remove_release_fnt`'s "undo the
    /// most recent registration" use (element cleanup running before a
    /// flow actually ends). Returns whether anything was removed.
    pub fn pop_release_fnt(&mut self) -> bool {
        self.release_chain.pop().is_some()
    }

    pub fn release_chain_len(&self) -> usize {
        self.release_chain.len()
    }
}
