//! The element arena (spec.md §9 "Cyclic graphs": "Represent the graph as
//! an arena of elements indexed by id, with ports storing `(id,
//! port_index)` pairs").
//!
//! Each node's element lives behind a `RefCell` so that a push/pull call
//! can recurse into a neighbour while the caller's own borrow is still
//! live, without requiring `unsafe`. A cycle that re-enters the same
//! element while it is already being called panics on the `RefCell`
//! borrow — the intended behaviour, since spec.md §7 treats unexpected
//! re-entrancy as a contract violation to be asserted, not silently
//! tolerated.

use std::cell::RefCell;

use super::{CleanupStage, Element, ElementId};
use crate::error::{ErrorHandler, FrameworkError};
use crate::packet::{Packet, PacketBatch};
use crate::port::{dispatch, Capability, PortBinding};

/// One node's ports plus the boxed element itself. Port bindings live here,
/// not inside the `Element` trait object, so the arena can resolve and
/// rewrite them without the element needing to know its own id.
pub struct ElementNode {
    element: RefCell<Box<dyn Element>>,
    inputs: Vec<Option<PortBinding>>,
    outputs: Vec<Option<PortBinding>>,
    /// Declared thread assignment; `None` means "unassigned", which
    /// `freeze` treats as thread 0 for ordering-check purposes.
    thread: Option<usize>,
}

impl ElementNode {
    pub fn class_name(&self) -> &'static str {
        self.element.borrow().class_name()
    }
}

/// A directed multigraph of elements, built once by [`crate::config::GraphConfig::build`]
/// and then frozen before any packet flows (spec.md §4.2, §4.3).
pub struct ElementGraph {
    nodes: Vec<ElementNode>,
    frozen: bool,
}

impl ElementGraph {
    pub fn new() -> Self {
        ElementGraph {
            nodes: Vec::new(),
            frozen: false,
        }
    }

    /// Adds an element with the given input/output port counts, all
    /// initially unbound. Returns the id it was assigned.
    pub fn add_element(
        &mut self,
        element: Box<dyn Element>,
        input_ports: usize,
        output_ports: usize,
        thread: Option<usize>,
    ) -> ElementId {
        let id = ElementId(self.nodes.len());
        self.nodes.push(ElementNode {
            element: RefCell::new(element),
            inputs: vec![None; input_ports],
            outputs: vec![None; output_ports],
            thread,
        });
        id
    }

    pub fn get(&self, id: ElementId) -> &ElementNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Connects `src`'s output port to `dst`'s input port. Both bindings
    /// are written symmetrically; `peer_capability` is resolved by reading
    /// the peer's declared [`Element::capability`] at connect time.
    pub fn connect(&mut self, src: ElementId, src_port: usize, dst: ElementId, dst_port: usize) -> Result<(), FrameworkError> {
        if self.frozen {
            return Err(FrameworkError::new(
                crate::error::codes::CONFIG_BAD_ARGUMENT,
                "cannot connect ports after the graph has been frozen",
            ));
        }
        let dst_capability = self.nodes[dst.0].element.borrow().capability();
        let src_capability = self.nodes[src.0].element.borrow().capability();

        let src_node = &mut self.nodes[src.0];
        let out = src_node
            .outputs
            .get_mut(src_port)
            .ok_or_else(|| FrameworkError::new(crate::error::codes::CONFIG_PORT_ARITY, "output port index out of range"))?;
        *out = Some(PortBinding {
            peer: dst,
            peer_port: dst_port,
            peer_capability: dst_capability,
        });

        let dst_node = &mut self.nodes[dst.0];
        let inp = dst_node
            .inputs
            .get_mut(dst_port)
            .ok_or_else(|| FrameworkError::new(crate::error::codes::CONFIG_PORT_ARITY, "input port index out of range"))?;
        *inp = Some(PortBinding {
            peer: src,
            peer_port: src_port,
            peer_capability: src_capability,
        });

        Ok(())
    }

    /// Runs `configure` then `initialize` on every element in insertion
    /// order, then checks that every port is bound (spec.md §4.2 Failure:
    /// "No port may be unbound at initialisation completion"). On success
    /// the graph is frozen: no further `connect` calls are accepted.
    pub fn freeze(&mut self, args_by_element: &[Vec<String>], errh: &mut ErrorHandler) -> Result<(), ()> {
        for (node, args) in self.nodes.iter().zip(args_by_element) {
            node.element.borrow_mut().configure(args, errh);
        }
        if errh.has_errors() {
            for node in &self.nodes {
                node.element.borrow_mut().cleanup(CleanupStage::ConfigureFailed);
            }
            return Err(());
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if node.element.borrow_mut().initialize(errh).is_err() {
                for earlier in self.nodes[..index].iter().rev() {
                    earlier.element.borrow_mut().cleanup(CleanupStage::InitializeFailed);
                }
                return Err(());
            }
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if node.inputs.iter().any(Option::is_none) || node.outputs.iter().any(Option::is_none) {
                errh.fatal(FrameworkError::new(
                    crate::error::codes::CONFIG_PORT_UNBOUND,
                    format!("element {} ({}) has an unbound port", index, node.class_name()),
                ));
                return Err(());
            }
        }

        self.check_thread_assignment(errh)?;

        self.frozen = true;
        Ok(())
    }

    /// Rejects configurations where a push/pull chain crosses a thread
    /// boundary without going through an element that opts in via
    /// [`Element::allows_cross_thread_edge`] (spec.md §5).
    fn check_thread_assignment(&self, errh: &mut ErrorHandler) -> Result<(), ()> {
        for (index, node) in self.nodes.iter().enumerate() {
            let my_thread = node.thread.unwrap_or(0);
            for binding in node.outputs.iter().flatten() {
                let peer = &self.nodes[binding.peer.0];
                let peer_thread = peer.thread.unwrap_or(0);
                let crosses = peer_thread != my_thread;
                let allowed = node.element.borrow().allows_cross_thread_edge() || peer.element.borrow().allows_cross_thread_edge();
                if crosses && !allowed {
                    errh.fatal(FrameworkError::new(
                        crate::error::codes::CONFIG_CROSS_THREAD,
                        format!(
                            "element {} ({}) pushes across threads ({} -> {}) without an explicit cross-thread element",
                            index,
                            node.class_name(),
                            my_thread,
                            peer_thread
                        ),
                    ));
                    return Err(());
                }
            }
        }
        Ok(())
    }

    pub fn cleanup(&mut self) {
        for node in self.nodes.iter().rev() {
            node.element.borrow_mut().cleanup(CleanupStage::Initialized);
        }
    }

    /// Entry point for pushing a batch into one of `id`'s *input* ports as
    /// if it arrived from outside the graph (used by tests and by source
    /// elements driven externally).
    pub fn inject(&self, id: ElementId, port: usize, batch: PacketBatch) {
        let mut ctx = DispatchContext { graph: self, current: id };
        self.nodes[id.0].element.borrow_mut().push_batch(port, batch, &mut ctx);
    }

    /// Drives `id`'s scheduler-owned task body (spec.md §4.8; see
    /// [`Element::run_task`]). Returns whether it did work this turn.
    pub fn run_task(&self, id: ElementId) -> bool {
        let mut ctx = DispatchContext { graph: self, current: id };
        self.nodes[id.0].element.borrow_mut().run_task(&mut ctx)
    }
}

impl Default for ElementGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Passed to every `push`/`pull` call so an element can reach its bound
/// neighbours without holding a reference to the whole graph by value.
pub struct DispatchContext<'g> {
    graph: &'g ElementGraph,
    current: ElementId,
}

impl<'g> DispatchContext<'g> {
    pub fn current(&self) -> ElementId {
        self.current
    }

    /// Pushes `batch` out of the current element's output `port`,
    /// resolving the four push cases of spec.md §4.2 against the bound
    /// peer's cached capability.
    pub fn push_output(&mut self, port: usize, batch: PacketBatch) {
        let Some(binding) = self.graph.nodes[self.current.0].outputs[port] else {
            return;
        };
        self.dispatch_push(&binding, batch);
    }

    /// Pushes a single `packet` out of the current element's output
    /// `port`, promoting it to a one-element batch only if the bound peer
    /// needs one (spec.md §4.2 case 3: "single→batch promotes to a
    /// one-element batch at the boundary; single→single needs no
    /// adaptation"). Lets single-capability elements (e.g.
    /// [`super::capability::PerPacketElement`]) push one packet at a time
    /// without the caller itself deciding whether to wrap it first.
    pub fn push_output_single(&mut self, port: usize, packet: Packet) {
        let Some(binding) = self.graph.nodes[self.current.0].outputs[port] else {
            return;
        };
        let mut peer_ctx = DispatchContext {
            graph: self.graph,
            current: binding.peer,
        };
        let mut peer = self.graph.nodes[binding.peer.0].element.borrow_mut();
        match dispatch::push_single_through(&binding, packet) {
            dispatch::PushCall::Batch(batch) => peer.push_batch(binding.peer_port, batch, &mut peer_ctx),
            dispatch::PushCall::EachSingle(batch) => {
                for packet in batch {
                    peer.push_single(binding.peer_port, packet, &mut peer_ctx);
                }
            }
        }
    }

    fn dispatch_push(&mut self, binding: &PortBinding, batch: PacketBatch) {
        let mut peer_ctx = DispatchContext {
            graph: self.graph,
            current: binding.peer,
        };
        let mut peer = self.graph.nodes[binding.peer.0].element.borrow_mut();
        match dispatch::push_through(binding, batch) {
            dispatch::PushCall::Batch(batch) => peer.push_batch(binding.peer_port, batch, &mut peer_ctx),
            dispatch::PushCall::EachSingle(batch) => {
                for packet in batch {
                    peer.push_single(binding.peer_port, packet, &mut peer_ctx);
                }
            }
        }
    }

    /// Pulls up to `max` packets through the current element's input
    /// `port`, from whichever peer is bound there.
    pub fn pull_input(&mut self, port: usize, max: Option<usize>) -> Option<PacketBatch> {
        let binding = self.graph.nodes[self.current.0].inputs[port]?;
        let mut peer_ctx = DispatchContext {
            graph: self.graph,
            current: binding.peer,
        };
        let mut peer = self.graph.nodes[binding.peer.0].element.borrow_mut();
        match dispatch::pull_through(&binding) {
            Capability::Batch => peer.pull_batch(binding.peer_port, max, &mut peer_ctx),
            Capability::Single => {
                let limit = max.unwrap_or(usize::MAX);
                let mut packets = Vec::new();
                while packets.len() < limit {
                    match peer.pull_single(binding.peer_port, &mut peer_ctx) {
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
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::Processing;

    struct Echo {
        seen: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
    }

    impl Element for Echo {
        fn class_name(&self) -> &'static str {
            "Echo"
        }

        fn capability(&self) -> Capability {
            Capability::Single
        }

        fn processing(&self) -> Processing {
            Processing::Push
        }

        fn push_single(&mut self, _port: usize, packet: Packet, _ctx: &mut DispatchContext<'_>) {
            self.seen.lock().unwrap().push(packet.data()[0]);
        }
    }

    struct Forwarder;

    impl Element for Forwarder {
        fn class_name(&self) -> &'static str {
            "Forwarder"
        }

        fn capability(&self) -> Capability {
            Capability::Batch
        }

        fn push_batch(&mut self, _port: usize, batch: PacketBatch, ctx: &mut DispatchContext<'_>) {
            ctx.push_output(0, batch);
        }
    }

    #[test]
    fn push_crosses_one_hop_through_graph() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut graph = ElementGraph::new();
        let echo = graph.add_element(Box::new(Echo { seen: seen.clone() }), 1, 0, None);
        let forwarder = graph.add_element(Box::new(Forwarder), 1, 1, None);
        graph.connect(forwarder, 0, echo, 0).unwrap();

        let mut errh = ErrorHandler::new();
        graph.freeze(&[Vec::new(), Vec::new()], &mut errh).unwrap();

        graph.inject(forwarder, 0, PacketBatch::make_from_packet(Packet::from_bytes(vec![42])));

        assert_eq!(*seen.lock().unwrap(), vec![42]);
    }

    #[test]
    fn freeze_rejects_unbound_ports() {
        let mut graph = ElementGraph::new();
        graph.add_element(Box::new(Forwarder), 1, 1, None);
        let mut errh = ErrorHandler::new();
        assert!(graph.freeze(&[Vec::new()], &mut errh).is_err());
        assert!(errh.has_errors());
    }
}
