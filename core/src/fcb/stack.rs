//! The current-FCB execution context (spec.md §4.4 point 4, §4.6).
//!
//! Grounded in `original_source/include/click/flowelement.hh`'s
//! `fcb_stack`: a per-thread stack of "currently active" FCB pointers so
//! that any flow element reached while processing a batch can reach the
//! FCB the classifier installed for that batch, without every element in
//! between having to thread it through as an explicit parameter. This
//! crate scopes the stack to one [`FcbStack`] value per worker thread
//! (rather than a process-wide `thread_local!`) — the classifier owns it
//! and threads it explicitly to `push_flow` calls, which is the same
//! "one stack per thread" shape without relying on global mutable state.

use super::FlowControlBlock;

/// A LIFO stack of raw pointers to FCBs currently "in scope" on this
/// thread. Entries are pushed by [`FcbStack::enter`] for the duration of a
/// downstream call and popped by the returned guard's `Drop`, so the
/// pointer is always valid for exactly as long as it is reachable —
/// mirroring the call-scoped lifetime of the source's stack-allocated
/// `FCB*` local variable.
#[derive(Default)]
pub struct FcbStack {
    entries: Vec<*mut FlowControlBlock>,
}

/// Pops its FCB off the stack when dropped. Must not outlive the `FcbStack`
/// it was produced from.
pub struct FcbGuard<'a> {
    stack: &'a mut FcbStack,
}

impl Drop for FcbGuard<'_> {
    fn drop(&mut self) {
        self.stack.entries.pop();
    }
}

impl FcbStack {
    pub fn new() -> Self {
        FcbStack::default()
    }

    /// Installs `fcb` as the current FCB for the lifetime of the returned
    /// guard. Nested `enter` calls (a flow element calling into another
    /// flow-aware subgraph) are supported: the innermost FCB shadows the
    /// outer one until its guard drops.
    pub fn enter<'a>(&'a mut self, fcb: &mut FlowControlBlock) -> FcbGuard<'a> {
        self.entries.push(fcb as *mut FlowControlBlock);
        FcbGuard { stack: self }
    }

    /// The innermost currently-installed FCB, if any.
    ///
    /// # Safety invariant
    /// Every pointer on `entries` was pushed by `enter` and is popped by
    /// its `FcbGuard` before the referenced `FlowControlBlock` can go out
    /// of scope, so dereferencing the top entry is always valid here.
    pub fn current(&mut self) -> Option<&mut FlowControlBlock> {
        let ptr = *self.entries.last()?;
        // SAFETY: see the invariant documented above.
        Some(unsafe { &mut *ptr })
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }
}

/// Adjusts the current FCB's refcount in lock-step with packet accounting
/// (spec.md §4.6 `fcb_acquire`/`fcb_release`).
pub fn fcb_acquire(fcb: &mut FlowControlBlock, n: usize) {
    fcb.acquire(n);
}

pub fn fcb_release(fcb: &mut FlowControlBlock, n: usize) -> super::RefOutcome {
    fcb.release(n)
}

/// Records a desired eviction timeout, never shortening an existing one
/// (spec.md §4.6 `fcb_acquire_timeout`).
pub fn fcb_acquire_timeout(fcb: &mut FlowControlBlock, requested: std::time::Duration) {
    fcb.request_timeout(requested);
}

pub fn fcb_set_release_fnt(fcb: &mut FlowControlBlock, callback: super::ReleaseFn) {
    fcb.push_release_fnt(callback);
}

/// Removes the most recently registered release callback, mirroring
/// `fcb_remove_release_fnt`'s use when an element tears itself down before
/// the flow as a whole ends. Returns whether an entry was present.
pub fn fcb_remove_release_fnt(fcb: &mut FlowControlBlock) -> bool {
    fcb.pop_release_fnt()
}
