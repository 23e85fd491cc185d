//! Wrap-aware sequence number comparison (spec.md §9: "Always use
//! `(int32_t)(a − b) < 0`, never `a < b`. Factor into a dedicated `SeqNo`
//! newtype that overloads comparison.").

use std::cmp::Ordering;

/// A 32-bit TCP sequence or acknowledgement number with wrap-aware
/// ordering. `SeqNo(0xFFFFFFF0) < SeqNo(0x00000010)` because the distance
/// going forward from the first to the second is smaller than wrapping the
/// other way, even though the raw integers compare the opposite way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SeqNo(pub u32);

impl SeqNo {
    pub fn wrapping_add_signed(self, delta: i32) -> SeqNo {
        SeqNo(self.0.wrapping_add(delta as u32))
    }
}

/// `SEQ_LT(a, b)` from the source: `(int32_t)(a - b) < 0`.
pub fn seq_lt(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

/// `SEQ_LEQ(a, b)`: `a == b || SEQ_LT(a, b)`.
pub fn seq_leq(a: u32, b: u32) -> bool {
    a == b || seq_lt(a, b)
}

impl PartialOrd for SeqNo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SeqNo {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0 == other.0 {
            Ordering::Equal
        } else if seq_lt(self.0, other.0) {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_around_compares_by_forward_distance() {
        assert!(seq_lt(0xFFFF_FFF0, 0x0000_0010));
        assert!(!seq_lt(0x0000_0010, 0xFFFF_FFF0));
        assert!(SeqNo(0xFFFF_FFF0) < SeqNo(0x0000_0010));
    }

    #[test]
    fn equal_values_are_neither_less_nor_greater() {
        assert!(!seq_lt(100, 100));
        assert!(seq_leq(100, 100));
    }

    #[test]
    fn ordinary_forward_order_matches_integer_order() {
        assert!(seq_lt(100, 200));
        assert!(!seq_lt(200, 100));
    }
}
