//! Per-thread flow classification table (spec.md §3, §4.4).
//!
//! An open-addressing hash table with power-of-two capacity and linear
//! probing, matching spec.md §3's "Capacity is a power of two; rehashing
//! to a larger table is optional". Growth is opt-in (`grow`) rather than
//! automatic, so the "table full" boundary behaviour in spec.md §8 is
//! deterministic under a fixed capacity instead of silently resizing it
//! away.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::key::FlowKey;

#[derive(Clone)]
enum Slot {
    Empty,
    Occupied { key: FlowKey, id: usize },
    Tombstone,
}

/// Raised by [`FlowTable::insert`] when no slot is available and the
/// caller has not grown the table (spec.md §4.4 "Insert-when-full").
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("flow classification table is full")]
pub struct TableFull;

pub struct FlowTable {
    slots: Vec<Slot>,
    mask: usize,
    len: usize,
}

fn hash_key(key: &FlowKey) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

impl FlowTable {
    /// Builds a table with at least `capacity` slots, rounded up to the
    /// next power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        FlowTable {
            slots: vec![Slot::Empty; capacity],
            mask: capacity - 1,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.capacity() as f64
    }

    /// Returns the internal flow id for `key`, if present.
    pub fn find(&self, key: &FlowKey) -> Option<usize> {
        let mut idx = hash_key(key) as usize & self.mask;
        for _ in 0..self.slots.len() {
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Occupied { key: k, id } if k == key => return Some(*id),
                _ => idx = (idx + 1) & self.mask,
            }
        }
        None
    }

    /// Inserts or updates `key -> id`. Returns the previous id if `key`
    /// already existed, `Ok(None)` for a fresh insert, or [`TableFull`] if
    /// the table has no empty or tombstoned slot and `key` is new.
    pub fn insert(&mut self, key: FlowKey, id: usize) -> Result<Option<usize>, TableFull> {
        let mut idx = hash_key(&key) as usize & self.mask;
        let mut first_tombstone: Option<usize> = None;
        for _ in 0..self.slots.len() {
            match &self.slots[idx] {
                Slot::Occupied { key: k, id: existing } if *k == key => {
                    let previous = *existing;
                    self.slots[idx] = Slot::Occupied { key, id };
                    return Ok(Some(previous));
                }
                Slot::Empty => {
                    let target = first_tombstone.unwrap_or(idx);
                    self.slots[target] = Slot::Occupied { key, id };
                    self.len += 1;
                    return Ok(None);
                }
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(idx);
                    }
                }
                Slot::Occupied { .. } => {}
            }
            idx = (idx + 1) & self.mask;
        }
        if let Some(target) = first_tombstone {
            self.slots[target] = Slot::Occupied { key, id };
            self.len += 1;
            return Ok(None);
        }
        Err(TableFull)
    }

    /// Removes `key`, returning its id if present.
    pub fn remove(&mut self, key: &FlowKey) -> Option<usize> {
        let mut idx = hash_key(key) as usize & self.mask;
        for _ in 0..self.slots.len() {
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Occupied { key: k, id } if k == key => {
                    let id = *id;
                    self.slots[idx] = Slot::Tombstone;
                    self.len -= 1;
                    return Some(id);
                }
                _ => idx = (idx + 1) & self.mask,
            }
        }
        None
    }

    /// Doubles capacity and reinserts every live entry. Implementation-
    /// defined growth policy per spec.md §3; callers decide when (or
    /// whether) to invoke it.
    pub fn grow(&mut self) {
        let mut grown = FlowTable::with_capacity(self.capacity() * 2);
        for slot in &self.slots {
            if let Slot::Occupied { key, id } = slot {
                grown.insert(*key, *id).expect("freshly doubled table cannot be full");
            }
        }
        *self = grown;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FlowKey, usize)> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Occupied { key, id } => Some((key, *id)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::key::Protocol;
    use std::net::Ipv4Addr;

    fn key(n: u16) -> FlowKey {
        FlowKey::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), Protocol::Tcp, n, 80)
    }

    #[test]
    fn insert_find_remove_round_trip() {
        let mut table = FlowTable::with_capacity(16);
        assert_eq!(table.insert(key(1), 100), Ok(None));
        assert_eq!(table.find(&key(1)), Some(100));
        assert_eq!(table.remove(&key(1)), Some(100));
        assert_eq!(table.find(&key(1)), None);
    }

    #[test]
    fn capacity_rounds_up_to_power_of_two() {
        let table = FlowTable::with_capacity(5);
        assert_eq!(table.capacity(), 8);
    }

    #[test]
    fn insert_when_full_reports_table_full() {
        let mut table = FlowTable::with_capacity(4);
        for i in 0..4 {
            table.insert(key(i), i as usize).unwrap();
        }
        assert_eq!(table.insert(key(99), 999), Err(TableFull));
    }

    #[test]
    fn grow_preserves_existing_entries() {
        let mut table = FlowTable::with_capacity(2);
        table.insert(key(1), 1).unwrap();
        table.insert(key(2), 2).unwrap();
        table.grow();
        assert_eq!(table.capacity(), 4);
        assert_eq!(table.find(&key(1)), Some(1));
        assert_eq!(table.find(&key(2)), Some(2));
    }

    #[test]
    fn tombstones_are_reused_on_insert() {
        let mut table = FlowTable::with_capacity(4);
        table.insert(key(1), 1).unwrap();
        table.remove(&key(1));
        table.insert(key(2), 2).unwrap();
        table.insert(key(3), 3).unwrap();
        table.insert(key(4), 4).unwrap();
        assert_eq!(table.len(), 3);
    }
}
