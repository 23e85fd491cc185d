//! Per-packet modification list, committed into a maintainer's ack/seq
//! trees (spec.md §3 "Modification list", §4.7 "Commit of a modification
//! list").
//!
//! Grounded in `original_source/lib/modificationlist.cc`: an ordered list
//! of `(position, offset)` nodes, built up by repeated
//! [`ModificationList::add_modification`] calls as a packet is edited
//! in-path, then folded into a [`super::maintainer::ByteStreamMaintainer`]
//! exactly once via [`ModificationList::commit`]. The source stores nodes
//! in a pool-allocated intrusive singly-linked list; a plain `Vec` kept in
//! position order gives the same "walk in order, splice in the middle"
//! shape without a separate allocator.

use super::maintainer::ByteStreamMaintainer;
use super::seqno::{seq_leq, seq_lt};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ModificationNode {
    position: u32,
    offset: i32,
}

/// An ordered, per-packet (or per-batch-in-flight) record of pending byte
/// inserts/removals. Refuses further modifications once [`Self::commit`]
/// has run (spec.md §3 invariant: "On `commit`, the list is folded into
/// the maintainer's ack and seq trees and cleared").
#[derive(Default)]
pub struct ModificationList {
    nodes: Vec<ModificationNode>,
    committed: bool,
}

impl ModificationList {
    pub fn new() -> Self {
        ModificationList::default()
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Records one modification: `offset` bytes inserted (positive) or
    /// removed (negative) at `position`, a byte index relative to the
    /// *current* content of the packet as edits accumulate. `first_position`
    /// is the earliest position this modification may be translated back
    /// to — the start of the region the caller is allowed to touch.
    ///
    /// Returns `false` once the list has already been committed (spec.md
    /// §3: a committed list accepts no further edits).
    ///
    /// Walks the existing nodes in order; for every node whose position is
    /// strictly less than the requested one, the requested position is
    /// translated backward by that node's offset — from "current content"
    /// coordinates into "initial content" coordinates — clamped to never
    /// go below `first_position` or below the node's own position. This
    /// mirrors `addModification`'s translation loop verbatim (spec.md §4.7,
    /// §9 Open Questions: later edits at an already-occupied position *add*
    /// to the existing offset, which matches the source's observed
    /// behaviour more precisely than a flat "replace" rule).
    pub fn add_modification(&mut self, first_position: u32, mut position: u32, offset: i32) -> bool {
        if self.committed {
            return false;
        }

        let mut insert_at = 0;
        while insert_at < self.nodes.len() && seq_leq(self.nodes[insert_at].position, position) {
            let node = self.nodes[insert_at];
            if seq_lt(node.position, position) {
                let mut translated = position.wrapping_sub(node.offset as u32);
                if seq_lt(translated, first_position) {
                    translated = first_position;
                }
                if seq_lt(translated, node.position) {
                    translated = node.position;
                }
                position = translated;
            }
            insert_at += 1;
        }

        if insert_at > 0 && self.nodes[insert_at - 1].position == position {
            self.nodes[insert_at - 1].offset += offset;
        } else {
            self.nodes.insert(insert_at, ModificationNode { position, offset });
        }

        self.merge_nodes();
        true
    }

    /// Merges adjacent deletions that overlap in range (spec.md §3
    /// invariant: "overlapping deletions are merged"). A node is folded
    /// into its predecessor when the predecessor is itself a deletion, the
    /// node's position falls within the predecessor's deleted range, and
    /// both carry the same sign — exactly `mergeNodes`' rule in the
    /// source, including its worked example: deleting `"ef"` at position 4
    /// (`(4,-2)`) then `"bcdg"` at position 1 (`(1,-4)`) merges into
    /// `(1,-6)`.
    fn merge_nodes(&mut self) {
        let mut i = 1;
        while i < self.nodes.len() {
            let prev = self.nodes[i - 1];
            let node = self.nodes[i];
            let range = prev.position.wrapping_add(prev.offset.unsigned_abs());
            if seq_lt(node.position, range) && prev.offset < 0 && same_sign(node.offset, prev.offset) {
                self.nodes[i - 1].offset += node.offset;
                self.nodes.remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Folds every node into `maintainer`'s ack and seq trees, in order,
    /// tracking a running cumulative offset, then empties the list and
    /// marks it committed (spec.md §4.7 "Commit of a modification list").
    ///
    /// For each node: the ack-tree key is the node's position shifted by
    /// the offset accumulated *before* this node, with the *negated*
    /// post-node running offset; the seq-tree key is the node's own
    /// (untranslated) position, with the post-node running offset applied
    /// directly — the sign flip on the ack side is what makes `mapAck`
    /// and `mapSeq` mutually inverse at committed node boundaries (spec.md
    /// §8 round-trip identity).
    pub fn commit(&mut self, maintainer: &mut ByteStreamMaintainer) {
        let mut running_offset = -maintainer.last_offset_in_ack_tree();
        for node in self.nodes.drain(..) {
            let ack_position = node.position.wrapping_add(running_offset as u32);
            running_offset = running_offset.wrapping_add(node.offset);
            maintainer.insert_in_ack_tree(ack_position, -running_offset);
            maintainer.insert_in_seq_tree(node.position, running_offset);
        }
        self.committed = true;
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.committed = false;
    }
}

fn same_sign(x: i32, y: i32) -> bool {
    (x <= 0) == (y <= 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_deletions_merge_per_source_worked_example() {
        let mut list = ModificationList::new();
        // "abcdefgh" -> remove "ef" at position 4 -> "abcdgh"
        assert!(list.add_modification(0, 4, -2));
        // Then remove "bcdg" at (now-current) position 1, length 4.
        assert!(list.add_modification(0, 1, -4));
        assert_eq!(list.len(), 1, "overlapping deletions collapse into one node");
    }

    #[test]
    fn commit_empties_the_list_and_marks_committed() {
        let mut maintainer = ByteStreamMaintainer::new();
        maintainer.initialize(1000).unwrap();
        let mut list = ModificationList::new();
        list.add_modification(1000, 1005, -2);
        assert!(!list.is_empty());
        list.commit(&mut maintainer);
        assert!(list.is_empty());
        assert!(list.is_committed());
    }

    #[test]
    fn committed_list_refuses_further_modifications() {
        let mut maintainer = ByteStreamMaintainer::new();
        maintainer.initialize(1000).unwrap();
        let mut list = ModificationList::new();
        list.commit(&mut maintainer);
        assert!(!list.add_modification(1000, 1010, 1));
    }

    #[test]
    fn single_insertion_commit_shifts_seq_mapping_forward() {
        let mut maintainer = ByteStreamMaintainer::new();
        maintainer.initialize(1000).unwrap();
        let mut list = ModificationList::new();
        // Insert 3 bytes at original position 1010: bytes after 1010 move
        // forward by 3 on the wire.
        list.add_modification(1000, 1010, 3);
        list.commit(&mut maintainer);

        assert_eq!(maintainer.map_seq(1010), 1010);
        assert_eq!(maintainer.map_seq(1011), 1014);
        assert_eq!(maintainer.map_ack(1014), 1011);
    }
}
