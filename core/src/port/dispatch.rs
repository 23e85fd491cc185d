//! The four push/pull × batch/single dispatch cases (spec.md §4.2).
//!
//! A [`crate::port::PortBinding`] already tells a caller *which* element and
//! port to call and whether that peer is batch- or single-capable; these two
//! free functions are where the batch/single boundary adaptation actually
//! happens, so the rule lives in one place instead of being duplicated at
//! every call site in `element::graph`.

use super::{Capability, PortBinding};
use crate::packet::{Packet, PacketBatch};

/// What to call, and with what, once a [`PortBinding`] is resolved.
pub enum PushCall {
    /// Peer is batch-capable: hand the whole batch over in one call.
    Batch(PacketBatch),
    /// Peer is single-only: the caller must iterate and push once per packet.
    EachSingle(PacketBatch),
}

/// Decides how to push `batch` toward `binding`'s peer (spec.md §4.2 cases
/// 1 and 2: batch→batch is one call, batch→single iterates).
pub fn push_through(binding: &PortBinding, batch: PacketBatch) -> PushCall {
    match binding.peer_capability {
        Capability::Batch => PushCall::Batch(batch),
        Capability::Single => PushCall::EachSingle(batch),
    }
}

/// Decides how to push a lone `packet` toward `binding`'s peer (spec.md
/// §4.2 case 3: single→batch promotes to a one-element batch at the
/// boundary; single→single needs no adaptation).
pub fn push_single_through(binding: &PortBinding, packet: Packet) -> PushCall {
    match binding.peer_capability {
        Capability::Batch => PushCall::Batch(PacketBatch::make_from_packet(packet)),
        Capability::Single => PushCall::EachSingle(PacketBatch::make_from_packet(packet)),
    }
}

/// Pull is the mirror of push: the puller asks the bound peer for up to
/// `max` packets. Batch/single adaptation on the *return* path is handled
/// the same way as push, by whoever receives the result (spec.md §4.2
/// "Pull: symmetric with an optional max bound").
pub fn pull_through(binding: &PortBinding) -> Capability {
    binding.peer_capability
}
