//! `flowgraph-core`: the runtime core of a modular, graph-based
//! packet-processing framework in the style of Click/FastClick.
//!
//! An `ElementGraph` wires together independently configured processing
//! units ("elements") through typed `Port`s. Packets are classified into
//! flows, carry a per-flow control block ([`fcb::FlowControlBlock`]) through
//! the graph, and — for TCP connections — pass through a
//! [`tcp::ByteStreamMaintainer`] that tracks in-path sequence/ack rewriting.
//!
//! Out of scope (see `SPEC_FULL.md`): concrete protocol parsers, driver
//! glue (DPDK/Netmap), a configuration-file language, and any specific
//! handler RPC transport. This crate only implements the dataflow runtime
//! that such collaborators plug into.

pub mod config;
pub mod element;
pub mod error;
pub mod fcb;
pub mod flow;
pub mod handler;
pub mod observability;
pub mod packet;
pub mod port;
pub mod runtime;
pub mod tcp;

pub use error::{ErrorHandler, FrameworkError, Severity};
pub use packet::{Packet, PacketBatch};
