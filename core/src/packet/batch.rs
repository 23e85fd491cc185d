//! PacketBatch: a non-empty ordered run of packets handed between elements
//! as one unit (spec.md §3, §4.1).
//!
//! The source represents a batch as an intrusive singly-linked list threaded
//! through the packets themselves, with the count and tail pointer stashed
//! in the head packet's annotation slots. That representation only exists
//! to avoid a second allocation in C++; the observable contract is "O(1)
//! amortized append, split produces two valid batches, fast_kill releases
//! everything". A `Vec<Packet>` gives the same contract without unsafe
//! aliasing between a packet's owning box and a raw tail pointer into it, so
//! that is what this crate uses — see `DESIGN.md` for the full rationale.

use super::Packet;

/// A non-empty, ordered collection of packets. Constructing a `PacketBatch`
/// always requires at least one packet (spec.md §3 invariant).
pub struct PacketBatch {
    packets: Vec<Packet>,
}

impl PacketBatch {
    /// Promotes a single packet to a one-element batch.
    pub fn make_from_packet(packet: Packet) -> Self {
        PacketBatch {
            packets: vec![packet],
        }
    }

    /// Builds a batch from a non-empty `Vec`. Panics on an empty vector —
    /// callers that might have zero packets should check first, the same
    /// way the source treats an empty batch as a distinct, special case
    /// (spec.md §8 "Empty batch" boundary behaviour).
    pub fn from_vec(packets: Vec<Packet>) -> Self {
        assert!(!packets.is_empty(), "PacketBatch must be non-empty");
        PacketBatch { packets }
    }

    pub fn count(&self) -> usize {
        self.packets.len()
    }

    /// Appends one packet at the tail, O(1) amortized.
    pub fn append_packet(&mut self, packet: Packet) {
        self.packets.push(packet);
    }

    /// Appends another batch at the tail, O(1) amortized, consuming it.
    pub fn append_batch(&mut self, other: PacketBatch) {
        self.packets.extend(other.packets);
    }

    /// Splits off the first `n` packets as a new batch, leaving the
    /// remainder (also non-empty) in `self`. Returns `None` if `n` is 0 or
    /// `n >= count()` — both parts must stay valid, non-empty batches.
    pub fn split(&mut self, n: usize) -> Option<PacketBatch> {
        if n == 0 || n >= self.packets.len() {
            return None;
        }
        let head: Vec<Packet> = self.packets.drain(..n).collect();
        Some(PacketBatch { packets: head })
    }

    /// Releases every packet in the batch.
    pub fn fast_kill(self) {
        drop(self);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Packet> {
        self.packets.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Packet> {
        self.packets.iter_mut()
    }

    pub fn into_vec(self) -> Vec<Packet> {
        self.packets
    }

    pub fn first(&self) -> &Packet {
        &self.packets[0]
    }

    pub fn last(&self) -> &Packet {
        self.packets.last().expect("batch is non-empty by construction")
    }
}

impl IntoIterator for PacketBatch {
    type Item = Packet;
    type IntoIter = std::vec::IntoIter<Packet>;

    fn into_iter(self) -> Self::IntoIter {
        self.packets.into_iter()
    }
}

impl<'a> IntoIterator for &'a PacketBatch {
    type Item = &'a Packet;
    type IntoIter = std::slice::Iter<'a, Packet>;

    fn into_iter(self) -> Self::IntoIter {
        self.packets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_of(n: usize) -> PacketBatch {
        let packets = (0..n).map(|i| Packet::from_bytes(vec![i as u8])).collect();
        PacketBatch::from_vec(packets)
    }

    #[test]
    fn make_from_packet_is_one_element() {
        let b = PacketBatch::make_from_packet(Packet::from_bytes(vec![1]));
        assert_eq!(b.count(), 1);
    }

    #[test]
    fn append_batch_preserves_order() {
        let mut a = batch_of(3);
        let b = batch_of(2);
        a.append_batch(b);
        assert_eq!(a.count(), 5);
        let values: Vec<u8> = a.iter().map(|p| p.data()[0]).collect();
        assert_eq!(values, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn split_produces_two_valid_batches() {
        let mut a = batch_of(13);
        let head = a.split(5).unwrap();
        assert_eq!(head.count(), 5);
        assert_eq!(a.count(), 8);
        let head_values: Vec<u8> = head.iter().map(|p| p.data()[0]).collect();
        assert_eq!(head_values, vec![0, 1, 2, 3, 4]);
        let rest_values: Vec<u8> = a.iter().map(|p| p.data()[0]).collect();
        assert_eq!(rest_values, vec![5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn split_rejects_degenerate_splits() {
        let mut a = batch_of(3);
        assert!(a.split(0).is_none());
        assert!(a.split(3).is_none());
        assert_eq!(a.count(), 3);
    }

    #[test]
    fn fast_kill_drops_everything() {
        let b = batch_of(10);
        b.fast_kill();
    }
}
