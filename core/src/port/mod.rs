//! Port binding & dispatch (spec.md §4.2).
//!
//! After the graph is frozen every port records a direct dispatch target —
//! the peer's element id, port index, and its resolved batch/single
//! capability — so the hot path never re-derives how to call a neighbour.
//! `Box<dyn Element>` already gives a single indirect (vtable) call per
//! hop; what this module adds on top is the *batch/single adaptation*
//! decision, made once at bind time instead of once per packet.

pub mod dispatch;

pub use dispatch::{pull_through, push_through};

use crate::element::ElementId;

/// Whether an element's port speaks batches natively or only single
/// packets. Declared per-element (see [`crate::element::Element::capability`])
/// and cached into the [`PortBinding`] of every port that targets it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Batch,
    Single,
}

/// Control-flow direction of one port (spec.md §2 GLOSSARY).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Processing {
    Push,
    Pull,
    /// Direction decided by the port's neighbours at bind time; resolves to
    /// `Push` or `Pull` once the graph is frozen.
    Agnostic,
}

/// Minimum/maximum arity for a group of ports, parsed from strings like
/// `"1/1"`, `"1-/1"`, `"1/1-2"`, `"-/-"` (spec.md §6 `port_count()`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortArity {
    pub min: usize,
    pub max: Option<usize>,
}

impl PortArity {
    pub const fn exact(n: usize) -> Self {
        PortArity {
            min: n,
            max: Some(n),
        }
    }

    pub const fn at_least(n: usize) -> Self {
        PortArity { min: n, max: None }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

/// A resolved, one-time dispatch target installed on a port once the graph
/// is frozen. No port may remain unbound after initialization completes
/// (spec.md §4.2 Failure) — callers use [`Option<PortBinding>`] on the
/// element side and reject the graph if any input/output slot is `None`.
#[derive(Clone, Copy, Debug)]
pub struct PortBinding {
    pub peer: ElementId,
    pub peer_port: usize,
    pub peer_capability: Capability,
}
