//! Single-entry last-flow cache (spec.md §4.4 "Caching optimisation").
//!
//! Consecutive packets of the same flow bypass the hash lookup entirely.
//! Purely an optimisation: disabling it (or never hitting) must not change
//! observable behaviour, only avoid a [`super::table::FlowTable::find`] call.

use super::key::FlowKey;

#[derive(Default)]
pub struct LastFlowCache {
    entry: Option<(FlowKey, usize)>,
}

impl LastFlowCache {
    pub fn new() -> Self {
        LastFlowCache::default()
    }

    /// Returns the cached id if `key` matches the last cached key.
    pub fn get(&self, key: &FlowKey) -> Option<usize> {
        match &self.entry {
            Some((cached_key, id)) if cached_key == key => Some(*id),
            _ => None,
        }
    }

    pub fn set(&mut self, key: FlowKey, id: usize) {
        self.entry = Some((key, id));
    }

    /// Invalidates the cache if it currently points at `key` (used when a
    /// flow is evicted or removed so a stale hit cannot be served).
    pub fn invalidate(&mut self, key: &FlowKey) {
        if matches!(&self.entry, Some((cached_key, _)) if cached_key == key) {
            self.entry = None;
        }
    }
}
