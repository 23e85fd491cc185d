//! Flow classification data plane (spec.md §4.4, the "FlowIPManager family").
//!
//! Ties together the [`super::table::FlowTable`], [`super::cache::LastFlowCache`],
//! [`super::timeout::EvictionScheme`], and an [`crate::fcb::FcbPool`] into the
//! per-packet algorithm spec.md §4.4 describes: compute key, lookup-or-allocate,
//! install the FCB, and accumulate consecutive same-flow packets into one batch.

use std::time::{Duration, Instant};

use crate::fcb::{FcbPool, FlowControlBlock, RefOutcome};
use crate::observability::Counter;
use crate::packet::{Packet, PacketBatch};

use super::cache::LastFlowCache;
use super::key::FlowKey;
use super::table::{FlowTable, TableFull};
use super::timeout::EvictionScheme;

/// Reads the already-parsed 5-tuple off a packet. Header parsing is an
/// external collaborator (spec.md §1 Out of scope); the classifier only
/// needs this narrow seam to reach it.
pub trait FlowKeyExtractor: Send {
    fn extract(&self, packet: &Packet) -> Option<FlowKey>;
}

/// How an insert-when-full was resolved (spec.md §4.4 Failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullPolicy {
    /// Refuse the new flow; the packet is dropped (default).
    Refuse,
    /// Evict the least-recently-seen entry to make room (lazy mode only).
    EvictLru,
}

/// Per-flow-element byte offsets computed by
/// [`FlowClassifier::layout_flow_elements`] (spec.md §4.6: "the classifier
/// lays out these reservations contiguously and records per-element
/// offsets").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowDataLayout {
    /// `offsets[i]` is the byte offset the `i`-th flow element (in the
    /// order its `flow_data_size` was passed in) was assigned within the
    /// shared reservation.
    pub offsets: Vec<usize>,
    /// Total bytes every FCB on this graph must reserve; the size a
    /// classifier's [`FcbPool`] must be constructed with.
    pub total_size: usize,
}

pub struct FlowClassifier {
    table: FlowTable,
    cache: LastFlowCache,
    eviction: EvictionScheme,
    pool: FcbPool,
    fcbs: std::collections::HashMap<usize, Box<FlowControlBlock>>,
    keys: std::collections::HashMap<usize, FlowKey>,
    next_id: usize,
    default_timeout: Duration,
    full_policy: FullPolicy,
    pub table_full: Counter,
    pub flows_active: Counter,
}

impl FlowClassifier {
    /// Lays out `flow_data_size`s declared by the flow elements along one
    /// graph's path, contiguously and in the given order, returning each
    /// one's assigned offset plus the total reservation every FCB on this
    /// graph needs (spec.md §4.6). Called once, before constructing the
    /// [`FcbPool`] this classifier will own, so every FCB it spawns has
    /// room for every flow element on the path — mirrors
    /// `flow_common.hh`'s compile-time-accumulated `FlowControlBlock`
    /// layout, done here at graph-build time instead.
    pub fn layout_flow_elements(sizes: &[usize]) -> FlowDataLayout {
        let mut offsets = Vec::with_capacity(sizes.len());
        let mut total = 0usize;
        for &size in sizes {
            offsets.push(total);
            total += size;
        }
        FlowDataLayout { offsets, total_size: total }
    }

    pub fn new(table_capacity: usize, pool: FcbPool, eviction: EvictionScheme, default_timeout: Duration, full_policy: FullPolicy) -> Self {
        FlowClassifier {
            table: FlowTable::with_capacity(table_capacity),
            cache: LastFlowCache::new(),
            eviction,
            pool,
            fcbs: std::collections::HashMap::new(),
            keys: std::collections::HashMap::new(),
            next_id: 0,
            default_timeout,
            full_policy,
            table_full: Counter::new(),
            flows_active: Counter::new(),
        }
    }

    /// Looks up `key`, allocating a new flow (and FCB) on a miss. Returns
    /// the internal flow id, or `None` if the table is full and the
    /// configured policy refuses new flows (spec.md §4.4 steps 1-3).
    pub fn lookup_or_insert(&mut self, key: FlowKey, now: Instant) -> Option<usize> {
        if let Some(id) = self.cache.get(&key) {
            self.touch(id, now);
            return Some(id);
        }
        if let Some(id) = self.table.find(&key) {
            if matches!(&self.eviction, EvictionScheme::Lazy(_)) && self.eviction.is_expired(id, now) {
                self.evict(id, &key);
            } else {
                self.cache.set(key, id);
                self.touch(id, now);
                return Some(id);
            }
        }

        let id = self.next_id;
        match self.table.insert(key, id) {
            Ok(None) => {
                self.next_id += 1;
                self.spawn_flow(id, key, now);
                self.cache.set(key, id);
                Some(id)
            }
            Ok(Some(_previous)) => unreachable!("fresh id cannot already be present"),
            Err(TableFull) => self.handle_full(key, now),
        }
    }

    fn handle_full(&mut self, key: FlowKey, now: Instant) -> Option<usize> {
        self.table_full.incr();
        if self.full_policy != FullPolicy::EvictLru {
            return None;
        }
        let lru = self
            .keys
            .iter()
            .min_by_key(|(id, _)| self.fcbs.get(id).map(|fcb| fcb.lastseen()))
            .map(|(id, key)| (*id, *key));
        let Some((lru_id, lru_key)) = lru else {
            return None;
        };
        self.evict(lru_id, &lru_key);
        let id = self.next_id;
        self.next_id += 1;
        self.table.insert(key, id).ok()?;
        self.spawn_flow(id, key, now);
        self.cache.set(key, id);
        Some(id)
    }

    fn spawn_flow(&mut self, id: usize, key: FlowKey, now: Instant) {
        let mut fcb = self.pool.allocate();
        fcb.touch(now);
        fcb.acquire(1);
        self.fcbs.insert(id, fcb);
        self.keys.insert(id, key);
        self.eviction.touch(id, now, self.default_timeout);
        self.flows_active.incr();
    }

    fn touch(&mut self, id: usize, now: Instant) {
        if let Some(fcb) = self.fcbs.get_mut(&id) {
            fcb.touch(now);
        }
        self.eviction.touch(id, now, self.default_timeout);
    }

    fn evict(&mut self, id: usize, key: &FlowKey) {
        self.table.remove(key);
        self.cache.invalidate(key);
        self.keys.remove(&id);
        if let Some(fcb) = self.fcbs.remove(&id) {
            self.flows_active.decr();
            self.return_fcb(fcb);
        }
    }

    fn return_fcb(&mut self, mut fcb: Box<FlowControlBlock>) {
        if fcb.refcount() > 0 {
            if fcb.release(fcb.refcount()) == RefOutcome::Reclaimed {
                self.pool.release(fcb);
            }
        } else {
            self.pool.release(fcb);
        }
    }

    /// Runs a timer-wheel maintenance pass (a no-op under lazy mode),
    /// evicting and returning any ids it reports.
    pub fn sweep(&mut self, now: Instant) {
        let evicted = self.eviction.sweep(now);
        for id in evicted {
            if let Some(key) = self.keys.get(&id).copied() {
                self.evict(id, &key);
            }
        }
    }

    pub fn fcb(&self, id: usize) -> Option<&FlowControlBlock> {
        self.fcbs.get(&id)
    }

    pub fn fcb_mut(&mut self, id: usize) -> Option<&mut FlowControlBlock> {
        self.fcbs.get_mut(&id)
    }

    pub fn contains(&self, key: &FlowKey) -> bool {
        self.table.find(key).is_some()
    }

    /// Groups `batch` into contiguous same-flow runs, invoking `emit` with
    /// each flow id and its run (spec.md §4.4 point 4: "append the packet
    /// to a batch accumulator keyed by flow id... emit the batch when the
    /// key changes").
    pub fn process_batch(
        &mut self,
        batch: PacketBatch,
        extractor: &dyn FlowKeyExtractor,
        now: Instant,
        mut emit: impl FnMut(usize, PacketBatch),
    ) {
        let mut current_id: Option<usize> = None;
        let mut run: Vec<Packet> = Vec::new();
        for packet in batch {
            let Some(key) = extractor.extract(&packet) else {
                continue;
            };
            let Some(id) = self.lookup_or_insert(key, now) else {
                continue;
            };
            match current_id {
                Some(prev) if prev == id => run.push(packet),
                Some(prev) => {
                    emit(prev, PacketBatch::from_vec(std::mem::take(&mut run)));
                    run.push(packet);
                    current_id = Some(id);
                }
                None => {
                    run.push(packet);
                    current_id = Some(id);
                }
            }
        }
        if let Some(id) = current_id {
            if !run.is_empty() {
                emit(id, PacketBatch::from_vec(run));
            }
        }
    }
}
