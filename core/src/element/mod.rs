//! Element lifecycle, capability mixins, and the graph arena (spec.md §4.3,
//! §9 "Cyclic graphs").
//!
//! `Element` is the dyn-safe trait every node in the graph implements; it is
//! deliberately thin (class identity, lifecycle, and the two required
//! push/pull batch entry points). Authors are not expected to implement it
//! directly — the [`capability`] module provides ergonomic generic traits
//! (`SimpleAction`, `SimpleActionBatch`, `Classify`) plus adaptor structs
//! that implement `Element` on their behalf, mirroring the source's CRTP
//! mixins as monomorphised generic wrappers (spec.md §9). `PushFlow` is the
//! odd one out: its adaptor (`capability::FlowElement`) needs the current
//! flow's FCB alongside the batch, which `Element::push_batch` has no slot
//! for, so it is driven directly by whatever owns that flow's `FcbStack`
//! rather than through the graph's ordinary dispatch (spec.md §4.6).

pub mod capability;
pub mod graph;

pub use graph::{DispatchContext, ElementGraph, ElementNode};

use crate::error::ErrorHandler;
use crate::handler::HandlerRegistry;
use crate::packet::{Packet, PacketBatch};
use crate::port::{Capability, PortArity, Processing};

/// Identifies one element within an [`ElementGraph`] arena. Non-owning —
/// ports and bindings store `(ElementId, port_index)` pairs rather than
/// pointers, so cyclic graphs need no special casing (spec.md §9).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

/// Teardown ordering markers passed to [`Element::cleanup`] (spec.md §4.3:
/// "symmetric teardown, idempotent, ordered so that releasers run before
/// allocators' destructors").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CleanupStage {
    /// `configure` failed; `initialize` never ran.
    ConfigureFailed,
    /// `initialize` failed partway through the graph; elements already
    /// initialized are torn down in reverse order.
    InitializeFailed,
    /// Normal shutdown of a fully initialized graph.
    Initialized,
}

/// A configured processing unit with typed input/output ports.
///
/// Required methods: [`Element::class_name`] and the two batch entry
/// points. `push_batch`/`push_single` default to calling one another —
/// exactly one of the pair must be overridden by a concrete element (spec.md
/// §4.3: "a derived element implements only one of" the listed shapes); the
/// same holds for `pull_batch`/`pull_single`. Overriding neither recurses
/// forever, which is the Rust analogue of the source never instantiating a
/// mixin that provides no primitive action.
pub trait Element: Send {
    fn class_name(&self) -> &'static str;

    /// Declared min/max arity for (inputs, outputs); spec.md §6 `port_count()`.
    fn port_count(&self) -> (PortArity, PortArity) {
        (PortArity::exact(1), PortArity::exact(1))
    }

    fn processing(&self) -> Processing {
        Processing::Agnostic
    }

    /// Which input ports may reach which output ports (spec.md §6
    /// `flow_code()`); `"x/x"` means every input may reach every output.
    fn flow_code(&self) -> &'static str {
        "x/x"
    }

    /// Whether this element's ports speak batches natively. Declared once
    /// and cached into every [`crate::port::PortBinding`] that targets this
    /// element (spec.md §4.2 "declared once at initialisation").
    fn capability(&self) -> Capability {
        Capability::Single
    }

    /// Opts an edge touching this element out of the single-thread
    /// requirement checked at `freeze` time (spec.md §5: "reject
    /// configurations where a pull or push chain crosses threads without
    /// going through an explicit cross-thread element"). Only
    /// [`crate::runtime::Pipeliner`] overrides this to `true`.
    fn allows_cross_thread_edge(&self) -> bool {
        false
    }

    /// Parse declarative arguments. May not call peers (spec.md §4.3).
    fn configure(&mut self, _args: &[String], _errh: &mut ErrorHandler) {}

    /// Called after all elements are configured; peer access allowed,
    /// tasks/timers may be scheduled here.
    fn initialize(&mut self, _errh: &mut ErrorHandler) -> Result<(), ()> {
        Ok(())
    }

    fn cleanup(&mut self, _stage: CleanupStage) {}

    fn add_handlers(&self, _registry: &mut HandlerRegistry) {}

    /// Driven by a scheduler-owned task rather than by an incoming push
    /// (spec.md §4.8: "Packet source elements typically install a task
    /// whose body pulls or pushes a batch downstream."). Returns whether
    /// it did work this turn, the same convention as the task body itself.
    /// The default is a no-op for elements that are driven purely by
    /// push/pull calls from their neighbors.
    fn run_task(&mut self, _ctx: &mut DispatchContext<'_>) -> bool {
        false
    }

    fn push_batch(&mut self, port: usize, batch: PacketBatch, ctx: &mut DispatchContext<'_>) {
        for packet in batch {
            self.push_single(port, packet, ctx);
        }
    }

    fn push_single(&mut self, port: usize, packet: Packet, ctx: &mut DispatchContext<'_>) {
        self.push_batch(port, PacketBatch::make_from_packet(packet), ctx);
    }

    fn pull_batch(&mut self, port: usize, max: Option<usize>, ctx: &mut DispatchContext<'_>) -> Option<PacketBatch> {
        let limit = max.unwrap_or(usize::MAX);
        let mut packets = Vec::new();
        while packets.len() < limit {
            match self.pull_single(port, ctx) {
                Some(packet) => packets.push(packet),
                None => break,
            }
        }
        if packets.is_empty() {
            None
        } else {
            Some(PacketBatch::from_vec(packets))
        }
    }

    fn pull_single(&mut self, port: usize, ctx: &mut DispatchContext<'_>) -> Option<Packet> {
        let batch = self.pull_batch(port, Some(1), ctx)?;
        let mut packets = batch.into_vec();
        packets.pop()
    }
}
