//! Per-thread FCB allocator with global spill (spec.md §4.5).
//!
//! Grounded in `original_source/include/click/flow_common.hh`'s two-level
//! `FCBPool`: a per-thread freelist capped at `POOL_SIZE`, overflow moved
//! as one whole chunk into a spinlock-protected global list capped at
//! `POOL_COUNT` chunks. Under-allocation pulls a whole chunk back from the
//! global list before falling back to a fresh allocation.

use std::sync::Arc;

use super::FlowControlBlock;

/// Per-thread freelist capacity, carried from `SFCB_POOL_SIZE` in the source.
pub const POOL_SIZE: usize = 2048;
/// Maximum number of whole chunks held on the global spill list, carried
/// from `SFCB_POOL_COUNT`.
pub const POOL_COUNT: usize = 32;

type Chunk = Vec<Box<FlowControlBlock>>;

/// The spinlock-protected global spill list shared by every thread's
/// [`FcbPool`] for one graph (spec.md §5 "Global FCB spill list: protected
/// by a single spinlock, touched only on per-thread-pool overflow/underflow").
#[derive(Default)]
pub struct GlobalSpill {
    chunks: spin::Mutex<Vec<Chunk>>,
}

impl GlobalSpill {
    pub fn new() -> Arc<Self> {
        Arc::new(GlobalSpill::default())
    }

    fn try_pop(&self) -> Option<Chunk> {
        self.chunks.lock().pop()
    }

    fn try_push(&self, chunk: Chunk) -> Option<Chunk> {
        let mut guard = self.chunks.lock();
        if guard.len() >= POOL_COUNT {
            Some(chunk)
        } else {
            guard.push(chunk);
            None
        }
    }
}

/// One thread's FCB allocator. Not `Sync` — each worker thread owns one,
/// all sharing the same [`GlobalSpill`] handle (spec.md §5: "FCBs: per-thread
/// ownership; cross-thread transfer is disallowed without first copying").
pub struct FcbPool {
    data_size: usize,
    zero_on_release: bool,
    local: Vec<Box<FlowControlBlock>>,
    global: Arc<GlobalSpill>,
}

impl FcbPool {
    pub fn new(data_size: usize, zero_on_release: bool, global: Arc<GlobalSpill>) -> Self {
        FcbPool {
            data_size,
            zero_on_release,
            local: Vec::new(),
            global,
        }
    }

    /// Allocates one FCB: from the per-thread freelist, then from the
    /// global spill list (pulling back a whole chunk), then fresh
    /// (spec.md §4.5: "Under-allocation is served from the global list
    /// first, then by creating a new object").
    pub fn allocate(&mut self) -> Box<FlowControlBlock> {
        if let Some(fcb) = self.local.pop() {
            return fcb;
        }
        if let Some(mut chunk) = self.global.try_pop() {
            let fcb = chunk.pop().expect("spilled chunks are never empty");
            self.local = chunk;
            return fcb;
        }
        Box::new(FlowControlBlock::new(self.data_size))
    }

    /// Returns a reclaimed (refcount == 0) FCB to the pool, zeroing its
    /// data area first if `zero_on_release` was set at construction
    /// (spec.md §4.5 invariant). Overflow beyond `POOL_SIZE` spills the
    /// whole local chunk to the global list; if the global list is
    /// already at `POOL_COUNT`, the spilled chunk is dropped (deallocated)
    /// rather than grown without bound.
    pub fn release(&mut self, mut fcb: Box<FlowControlBlock>) {
        debug_assert_eq!(fcb.refcount(), 0, "release of a still-referenced FCB is a contract violation");
        if self.zero_on_release {
            fcb.data_mut().fill(0);
        }
        self.local.push(fcb);
        if self.local.len() > POOL_SIZE {
            let overflow = std::mem::take(&mut self.local);
            self.global.try_push(overflow);
        }
    }

    pub fn local_len(&self) -> usize {
        self.local.len()
    }
}
