//! Generic capability mixins (spec.md §4.3, §9 "CRTP/template mixins").
//!
//! An author implements exactly one of these ergonomic, non-object-safe
//! traits; an adaptor struct wraps the implementation and provides the
//! dyn-safe [`super::Element`] the graph actually stores. Monomorphisation
//! means there is no extra indirection inside the adaptor itself — the one
//! indirect call the design notes call for happens at the port boundary,
//! not here.

use super::{DispatchContext, Element};
use crate::fcb::{FcbStack, FlowControlBlock};
use crate::packet::{Packet, PacketBatch};
use crate::port::{Capability, Processing};

/// Produces zero or one packet per input packet (spec.md §4.3
/// `simple_action`).
pub trait SimpleAction: Send {
    fn simple_action(&mut self, packet: Packet) -> Option<Packet>;
}

/// Produces zero or one output batch per input batch (spec.md §4.3
/// `simple_action_batch`); the natively batch-oriented counterpart of
/// [`SimpleAction`].
pub trait SimpleActionBatch: Send {
    fn simple_action_batch(&mut self, batch: PacketBatch) -> Option<PacketBatch>;
}

/// A pure demultiplexer: maps a packet to the output port index it should
/// be pushed to (spec.md §4.3 `classify`).
pub trait Classify: Send {
    fn classify(&mut self, packet: &Packet) -> usize;
    fn output_count(&self) -> usize;
}

/// A flow-aware element that processes a batch alongside its reserved
/// slice of the current flow's [`FlowControlBlock`] (spec.md §4.3
/// `push_flow(port, FCB*, batch)`, §4.6 "Flow element context").
pub trait PushFlow: Send {
    /// Bytes this element reserves inside every FCB it sees (spec.md §4.6
    /// `flow_data_size`). The owning classifier lays out every flow
    /// element's reservation along a path contiguously and assigns each
    /// one a fixed byte offset before any traffic flows.
    fn flow_data_size(&self) -> usize;

    fn push_flow(&mut self, port: usize, fcb_data: &mut [u8], batch: PacketBatch, ctx: &mut DispatchContext<'_>);
}

/// Wraps a [`SimpleAction`] into a full, single-capability [`Element`].
/// Input port 0 only; output port 0 only — spec.md's mixins describe
/// per-packet transforms, not fan-out, so multi-port routing belongs to
/// [`ClassifyElement`] instead.
pub struct PerPacketElement<T> {
    pub inner: T,
    class_name: &'static str,
}

impl<T> PerPacketElement<T> {
    pub fn new(class_name: &'static str, inner: T) -> Self {
        PerPacketElement { inner, class_name }
    }
}

impl<T: SimpleAction> Element for PerPacketElement<T> {
    fn class_name(&self) -> &'static str {
        self.class_name
    }

    fn capability(&self) -> Capability {
        Capability::Single
    }

    fn processing(&self) -> Processing {
        Processing::Push
    }

    fn push_single(&mut self, _port: usize, packet: Packet, ctx: &mut DispatchContext<'_>) {
        if let Some(out) = self.inner.simple_action(packet) {
            ctx.push_output_single(0, out);
        }
    }

    fn push_batch(&mut self, port: usize, batch: PacketBatch, ctx: &mut DispatchContext<'_>) {
        for packet in batch {
            self.push_single(port, packet, ctx);
        }
    }
}

/// Wraps a [`SimpleActionBatch`] into a full, batch-capability [`Element`].
pub struct PerBatchElement<T> {
    pub inner: T,
    class_name: &'static str,
}

impl<T> PerBatchElement<T> {
    pub fn new(class_name: &'static str, inner: T) -> Self {
        PerBatchElement { inner, class_name }
    }
}

impl<T: SimpleActionBatch> Element for PerBatchElement<T> {
    fn class_name(&self) -> &'static str {
        self.class_name
    }

    fn capability(&self) -> Capability {
        Capability::Batch
    }

    fn processing(&self) -> Processing {
        Processing::Push
    }

    fn push_batch(&mut self, _port: usize, batch: PacketBatch, ctx: &mut DispatchContext<'_>) {
        if let Some(out) = self.inner.simple_action_batch(batch) {
            ctx.push_output(0, out);
        }
    }
}

/// Wraps a [`Classify`] into a full [`Element`] that routes each packet to
/// `classify`'s returned output port index, preserving intra-batch order
/// per destination port (spec.md §8 scenario 3 "batch fan-out").
pub struct ClassifyElement<T> {
    pub inner: T,
    class_name: &'static str,
}

impl<T: Classify> ClassifyElement<T> {
    pub fn new(class_name: &'static str, inner: T) -> Self {
        ClassifyElement { inner, class_name }
    }
}

impl<T: Classify> Element for ClassifyElement<T> {
    fn class_name(&self) -> &'static str {
        self.class_name
    }

    fn capability(&self) -> Capability {
        Capability::Single
    }

    fn processing(&self) -> Processing {
        Processing::Push
    }

    fn push_single(&mut self, _port: usize, packet: Packet, ctx: &mut DispatchContext<'_>) {
        let out_port = self.inner.classify(&packet);
        debug_assert!(out_port < self.inner.output_count(), "classify returned an out-of-range port");
        ctx.push_output_single(out_port, packet);
    }

    fn push_batch(&mut self, port: usize, batch: PacketBatch, ctx: &mut DispatchContext<'_>) {
        for packet in batch {
            self.push_single(port, packet, ctx);
        }
    }
}

/// A round-robin classifier: cycles through its output ports in order,
/// one packet each, wrapping back to port 0. Used by the batch fan-out
/// round-trip scenario (spec.md §8 scenario 3) and as a worked example of
/// [`Classify`].
pub struct RoundRobin {
    outputs: usize,
    next: usize,
}

impl RoundRobin {
    pub fn new(outputs: usize) -> Self {
        assert!(outputs > 0, "round-robin switch needs at least one output");
        RoundRobin { outputs, next: 0 }
    }
}

impl Classify for RoundRobin {
    fn classify(&mut self, _packet: &Packet) -> usize {
        let port = self.next;
        self.next = (self.next + 1) % self.outputs;
        port
    }

    fn output_count(&self) -> usize {
        self.outputs
    }
}

/// Wraps a [`PushFlow`] implementation, owning the byte offset a
/// [`crate::flow::FlowClassifier`] assigned it within the shared FCB
/// reservation (spec.md §4.6). Unlike [`PerPacketElement`]/
/// [`PerBatchElement`]/[`ClassifyElement`], this adaptor is not driven
/// through [`Element::push_batch`]: a flow element's defining trait is
/// that it needs the *current flow's* FCB alongside the batch, and the
/// graph's ordinary push/pull path has no slot for that. It is instead
/// driven directly by whatever owns the flow's [`FcbStack`] — typically
/// the classifier's own batch-accumulator loop (spec.md §4.4 point 4) —
/// via [`FlowElement::dispatch`].
pub struct FlowElement<T> {
    pub inner: T,
    class_name: &'static str,
    offset: usize,
}

impl<T: PushFlow> FlowElement<T> {
    pub fn new(class_name: &'static str, inner: T) -> Self {
        FlowElement {
            inner,
            class_name,
            offset: 0,
        }
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// Bytes this element needs reserved in every FCB (spec.md §4.6
    /// `flow_data_size`).
    pub fn flow_data_size(&self) -> usize {
        self.inner.flow_data_size()
    }

    /// Records the byte offset a classifier's layout pass assigned this
    /// element within the shared, per-graph FCB reservation.
    pub fn set_flow_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn flow_offset(&self) -> usize {
        self.offset
    }

    /// Enters `fcb_stack` for the duration of the call — so any flow
    /// element reached further downstream can still reach `fcb` via
    /// [`FcbStack::current`] — then hands `inner` its reserved slice of
    /// `fcb`'s data area (spec.md §4.6: "receives a typed pointer to its
    /// slice of the current FCB").
    pub fn dispatch(&mut self, port: usize, fcb_stack: &mut FcbStack, fcb: &mut FlowControlBlock, batch: PacketBatch, ctx: &mut DispatchContext<'_>) {
        let size = self.inner.flow_data_size();
        let offset = self.offset;
        let _guard = fcb_stack.enter(fcb);
        let data = &mut fcb.data_mut()[offset..offset + size];
        self.inner.push_flow(port, data, batch, ctx);
    }
}
