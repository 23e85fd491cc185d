//! Per-direction TCP bytestream maintainer (spec.md §3 "Bytestream
//! maintainer", §4.7).
//!
//! The ack/seq maps are `BTreeMap<u32, i32>` ordered by plain integer
//! comparison, matching `original_source/lib/bytestreammaintainer.cc`'s own
//! red-black trees — wrap-aware (`SEQ_LT`) comparison is applied only in
//! the `mapAck`/`mapSeq` bound check, exactly where the source applies it,
//! not to the trees' ordering itself (both halves of a live connection's
//! key range stay close enough together that plain integer order and
//! wrap-aware order agree, and periodic `prune` keeps it that way).

use std::collections::BTreeMap;

use super::seqno::seq_lt;

/// How often (in acks observed) `prune` actually walks the trees. The
/// source references `BS_PRUNE_THRESHOLD` without a visible definition in
/// the retrieved excerpt; 100 is a conservative default of the same order
/// of magnitude as FastClick's other per-ack bookkeeping intervals.
pub const PRUNE_THRESHOLD: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TcpMaintainerError {
    #[error("maintainer used before initialize()")]
    NotInitialized,
    #[error("maintainer already initialized")]
    AlreadyInitialized,
}

pub struct ByteStreamMaintainer {
    ack_tree: BTreeMap<u32, i32>,
    seq_tree: BTreeMap<u32, i32>,
    initialized: bool,
    prune_counter: u32,

    pub last_ack_sent: u32,
    pub last_ack_received: u32,
    pub last_seq_sent: u32,
    pub last_payload_length: u32,
    pub window_size: u16,
    pub window_scale: u8,
    pub use_window_scale: bool,
    pub mss: u16,
    pub congestion_window: u32,
    pub ssthresh: u32,
    pub dup_acks: u32,
}

impl Default for ByteStreamMaintainer {
    fn default() -> Self {
        ByteStreamMaintainer {
            ack_tree: BTreeMap::new(),
            seq_tree: BTreeMap::new(),
            initialized: false,
            prune_counter: 0,
            last_ack_sent: 0,
            last_ack_received: 0,
            last_seq_sent: 0,
            last_payload_length: 0,
            window_size: 32120,
            window_scale: 1,
            use_window_scale: false,
            mss: 536,
            congestion_window: 536,
            ssthresh: 65535,
            dup_acks: 0,
        }
    }
}

impl ByteStreamMaintainer {
    pub fn new() -> Self {
        ByteStreamMaintainer::default()
    }

    /// Inserts the zero-offset sentinel at `flow_start`, establishing the
    /// invariant that mapping is defined everywhere after the first data
    /// byte or SYN (spec.md §4.7 "Initialisation").
    pub fn initialize(&mut self, flow_start: u32) -> Result<(), TcpMaintainerError> {
        if self.initialized {
            return Err(TcpMaintainerError::AlreadyInitialized);
        }
        self.ack_tree.insert(flow_start, 0);
        self.seq_tree.insert(flow_start, 0);
        self.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Translates an incoming ack from wire view back to original-stream
    /// view (spec.md §4.7 "Ack/seq mapping algorithm").
    pub fn map_ack(&self, position: u32) -> u32 {
        map_position(&self.ack_tree, position, position)
    }

    /// Translates an outgoing sequence number from original-stream view to
    /// wire view. Queries one position earlier than asked so that
    /// modifications made *at* the queried position (within the packet
    /// itself) do not apply to the mapping of its own sequence number —
    /// see the source's comment on retransmissions of a just-modified
    /// packet.
    pub fn map_seq(&self, position: u32) -> u32 {
        map_position(&self.seq_tree, position.wrapping_sub(1), position)
    }

    pub fn insert_in_ack_tree(&mut self, position: u32, offset: i32) {
        self.ack_tree.insert(position, offset);
    }

    pub fn insert_in_seq_tree(&mut self, position: u32, offset: i32) {
        self.seq_tree.insert(position, offset);
    }

    /// The offset carried by the greatest key in the ack tree, or 0 if the
    /// tree is empty (`commit` uses this to seed its running offset).
    pub fn last_offset_in_ack_tree(&self) -> i32 {
        self.ack_tree.iter().next_back().map(|(_, offset)| *offset).unwrap_or(0)
    }

    /// Removes every entry with a key `< position` from the ack tree, and
    /// the corresponding (ack-mapped) entries from the seq tree, but only
    /// once every [`PRUNE_THRESHOLD`] calls (spec.md §4.7 "Pruning").
    pub fn prune(&mut self, position: u32) {
        self.prune_counter += 1;
        if self.prune_counter < PRUNE_THRESHOLD {
            return;
        }
        self.prune_counter = 0;
        self.ack_tree.retain(|key, _| !seq_lt(*key, position));
        let position_seq = self.map_ack(position);
        self.seq_tree.retain(|key, _| !seq_lt(*key, position_seq));
    }

    pub fn ack_tree_len(&self) -> usize {
        self.ack_tree.len()
    }

    pub fn seq_tree_len(&self) -> usize {
        self.seq_tree.len()
    }
}

/// Shared body of `mapAck`/`mapSeq`: find the greatest key `<= query`,
/// apply its offset, then clamp against the predecessor's bound so
/// monotonicity holds under concatenated insertions and deletions.
fn map_position(tree: &BTreeMap<u32, i32>, query: u32, position: u32) -> u32 {
    let Some((&node_key, &node_offset)) = tree.range(..=query).next_back() else {
        return position;
    };
    let new_position = position.wrapping_add(node_offset as u32);

    let pred_offset = tree.range(..node_key).next_back().map(|(_, offset)| *offset).unwrap_or(0);
    let pred_bound = node_key.wrapping_add(pred_offset as u32);

    if seq_lt(new_position, pred_bound) {
        pred_bound
    } else {
        new_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialized_maps_are_identity() {
        let maintainer = ByteStreamMaintainer::new();
        assert_eq!(maintainer.map_ack(12345), 12345);
        assert_eq!(maintainer.map_seq(12345), 12345);
    }

    #[test]
    fn bytestream_deletion_scenario() {
        // Scenario 2 (spec.md §8): initial seq 1000, modifications
        // [(1005,-2),(1020,+3)].
        let mut maintainer = ByteStreamMaintainer::new();
        maintainer.initialize(1000).unwrap();
        maintainer.insert_in_seq_tree(1005, -2);
        maintainer.insert_in_seq_tree(1020, 1);
        maintainer.insert_in_ack_tree(1018, 2);
        maintainer.insert_in_ack_tree(1021, -1);

        assert_eq!(maintainer.map_seq(1000), 1000);
        assert_eq!(maintainer.map_seq(1005), 1005);
        assert_eq!(maintainer.map_seq(1006), 1004);
        assert_eq!(maintainer.map_seq(1020), 1018);
        assert_eq!(maintainer.map_seq(1021), 1022);

        assert_eq!(maintainer.map_ack(1018), 1020);
        assert_eq!(maintainer.map_ack(1022), 1021);
    }

    #[test]
    fn prune_only_acts_every_threshold_calls() {
        let mut maintainer = ByteStreamMaintainer::new();
        maintainer.initialize(0).unwrap();
        maintainer.insert_in_ack_tree(10, 0);
        maintainer.insert_in_seq_tree(10, 0);
        for _ in 0..PRUNE_THRESHOLD - 1 {
            maintainer.prune(10);
            assert_eq!(maintainer.ack_tree_len(), 2);
        }
        maintainer.prune(10);
        assert_eq!(maintainer.ack_tree_len(), 1);
    }
}
