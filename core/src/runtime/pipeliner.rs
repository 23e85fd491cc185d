//! Cross-thread FIFO handoff element (spec.md §5 "the one framework-provided
//! element allowed to cross a thread boundary").
//!
//! Grounded in `original_source/elements/standard/pipeliner.cc` /
//! `pipeliner.hh`: a push input on the producer's thread enqueues onto a
//! per-producer-thread ring; a task on the consumer's thread drains every
//! ring in round-robin and pushes the drained batches out its single
//! output. The source keeps one ring per thread to avoid false sharing
//! between producers and uses `NOTIFIER` support so the consumer task can
//! park instead of busy-polling empty rings; this port keeps the same
//! per-thread-ring shape with a [`spin::Mutex`] around each ring (the
//! source uses a lock-free MPSC ring, but spec.md §9 "Concurrency
//! primitives" explicitly allows a correctness-first substitute here) and
//! a [`super::notifier::Notifier`] to wake the consumer task.

use spin::Mutex;

use crate::element::{graph::DispatchContext, CleanupStage, Element};
use crate::error::ErrorHandler;
use crate::handler::HandlerRegistry;
use crate::packet::PacketBatch;
use crate::port::{Capability, PortArity, Processing};

use super::notifier::Notifier;
use super::task::TaskId;

/// One producer thread's queue of batches waiting to cross over to the
/// consumer thread, plus drop/send counters (source's per-thread
/// `_stats`).
struct Ring {
    queue: Mutex<std::collections::VecDeque<PacketBatch>>,
    capacity: usize,
    dropped: std::sync::atomic::AtomicU64,
    sent: std::sync::atomic::AtomicU64,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Ring {
            queue: Mutex::new(std::collections::VecDeque::new()),
            capacity,
            dropped: std::sync::atomic::AtomicU64::new(0),
            sent: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

/// A cross-thread FIFO. `push_single`/`push_batch` (called from a
/// producer thread) enqueue onto that producer's ring; [`Pipeliner::run_task`]
/// (driven from the consumer thread) drains every ring round-robin and
/// pushes the drained batches out port 0 (spec.md §5, §4.8).
pub struct Pipeliner {
    rings: Vec<Ring>,
    next_drain: std::sync::atomic::AtomicUsize,
    notifier: Notifier,
    /// Which ring index corresponds to the calling thread; set by
    /// [`Pipeliner::push_batch`]'s caller via the producer-thread id,
    /// matching the source's `click_current_cpu_id()` lookup.
    ring_for_thread: Box<dyn Fn() -> usize + Send + Sync>,
}

impl Pipeliner {
    /// `thread_count` rings are pre-allocated, one per producer thread.
    /// `ring_for_thread` maps the calling thread to its ring index — in
    /// tests this is usually a fixed index; in a real deployment it reads
    /// a thread-local worker id.
    pub fn new(thread_count: usize, ring_capacity: usize, ring_for_thread: impl Fn() -> usize + Send + Sync + 'static) -> Self {
        Pipeliner {
            rings: (0..thread_count.max(1)).map(|_| Ring::new(ring_capacity)).collect(),
            next_drain: std::sync::atomic::AtomicUsize::new(0),
            notifier: Notifier::new(),
            ring_for_thread: Box::new(ring_for_thread),
        }
    }

    /// Registers `task` to be woken when a batch is enqueued onto an empty
    /// set of rings, mirroring the source's notifier-backed consumer task.
    pub fn listen(&mut self, task: TaskId) {
        self.notifier.listen(task);
    }

    pub fn enqueue(&self, batch: PacketBatch) {
        let ring_index = (self.ring_for_thread)() % self.rings.len();
        let ring = &self.rings[ring_index];
        let mut queue = ring.queue.lock();
        if queue.len() >= ring.capacity {
            ring.dropped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            return;
        }
        queue.push_back(batch);
        ring.sent.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    /// Total batches dropped across every ring because it was full
    /// (source's `dropped()` handler).
    pub fn dropped(&self) -> u64 {
        self.rings.iter().map(|r| r.dropped.load(std::sync::atomic::Ordering::Relaxed)).sum()
    }

    pub fn sent(&self) -> u64 {
        self.rings.iter().map(|r| r.sent.load(std::sync::atomic::Ordering::Relaxed)).sum()
    }

    /// Drains one batch from the next non-empty ring in round-robin order,
    /// matching the source's fairness between producer threads. Public and
    /// `&self`-only (every ring is behind its own mutex) so a consumer can
    /// drain directly from its own thread without going through
    /// [`Element::run_task`] and the (non-`Sync`) graph arena.
    pub fn drain_one(&self) -> Option<PacketBatch> {
        let start = self.next_drain.load(std::sync::atomic::Ordering::Relaxed);
        for offset in 0..self.rings.len() {
            let index = (start + offset) % self.rings.len();
            if let Some(batch) = self.rings[index].queue.lock().pop_front() {
                self.next_drain.store((index + 1) % self.rings.len(), std::sync::atomic::Ordering::Relaxed);
                return Some(batch);
            }
        }
        None
    }
}

impl Element for Pipeliner {
    fn class_name(&self) -> &'static str {
        "Pipeliner"
    }

    fn port_count(&self) -> (PortArity, PortArity) {
        (PortArity::exact(1), PortArity::exact(1))
    }

    fn processing(&self) -> Processing {
        Processing::Push
    }

    fn capability(&self) -> Capability {
        Capability::Batch
    }

    fn allows_cross_thread_edge(&self) -> bool {
        true
    }

    fn configure(&mut self, _args: &[String], _errh: &mut ErrorHandler) {}

    fn add_handlers(&self, _registry: &mut HandlerRegistry) {}

    fn push_batch(&mut self, _port: usize, batch: PacketBatch, _ctx: &mut DispatchContext<'_>) {
        self.enqueue(batch);
        for task in self.notifier.wake() {
            let _ = task;
        }
    }

    /// Drains every ring and pushes the result out port 0, until a drain
    /// finds nothing. Returns whether it drained at least one batch
    /// (spec.md §4.8 task-body convention).
    fn run_task(&mut self, ctx: &mut DispatchContext<'_>) -> bool {
        let mut did_work = false;
        while let Some(batch) = self.drain_one() {
            ctx.push_output(0, batch);
            did_work = true;
        }
        did_work
    }

    fn cleanup(&mut self, _stage: CleanupStage) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementGraph;
    use crate::packet::Packet;

    struct Sink {
        seen: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
    }

    impl Element for Sink {
        fn class_name(&self) -> &'static str {
            "Sink"
        }

        fn capability(&self) -> Capability {
            Capability::Batch
        }

        fn processing(&self) -> Processing {
            Processing::Push
        }

        fn push_batch(&mut self, _port: usize, batch: PacketBatch, _ctx: &mut DispatchContext<'_>) {
            let mut seen = self.seen.lock().unwrap();
            for packet in batch {
                seen.push(packet.data()[0]);
            }
        }
    }

    #[test]
    fn round_robin_drain_preserves_fifo_order_per_ring() {
        let pipeliner = Pipeliner::new(2, 16, || 0);
        pipeliner.enqueue(PacketBatch::make_from_packet(Packet::from_bytes(vec![1])));
        pipeliner.enqueue(PacketBatch::make_from_packet(Packet::from_bytes(vec![2])));
        let first = pipeliner.drain_one().unwrap();
        assert_eq!(first.first().data()[0], 1);
        let second = pipeliner.drain_one().unwrap();
        assert_eq!(second.first().data()[0], 2);
        assert!(pipeliner.drain_one().is_none());
    }

    #[test]
    fn full_ring_increments_dropped_counter() {
        let pipeliner = Pipeliner::new(1, 1, || 0);
        pipeliner.enqueue(PacketBatch::make_from_packet(Packet::from_bytes(vec![1])));
        pipeliner.enqueue(PacketBatch::make_from_packet(Packet::from_bytes(vec![2])));
        assert_eq!(pipeliner.dropped(), 1);
        assert_eq!(pipeliner.sent(), 1);
    }

    #[test]
    fn push_then_run_task_forwards_to_downstream_element() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut graph = ElementGraph::new();
        let sink = graph.add_element(Box::new(Sink { seen: seen.clone() }), 1, 0, Some(1));
        let pipeliner = graph.add_element(Box::new(Pipeliner::new(1, 16, || 0)), 1, 1, Some(0));
        graph.connect(pipeliner, 0, sink, 0).unwrap();

        let mut errh = ErrorHandler::new();
        graph.freeze(&[Vec::new(), Vec::new()], &mut errh).unwrap();

        graph.inject(pipeliner, 0, PacketBatch::make_from_packet(Packet::from_bytes(vec![7])));
        assert!(graph.run_task(pipeliner));
        assert_eq!(*seen.lock().unwrap(), vec![7]);
        assert!(!graph.run_task(pipeliner), "nothing left to drain");
    }
}
