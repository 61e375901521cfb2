//! Bounded LRU store for decoded block buffers.
//!
//! Decoding a media block is far more expensive than a memory copy, so
//! [`CachedSource`](crate::source::CachedSource) memoizes whole decoded
//! blocks here. Recency is a strict logical order over add/get events;
//! no wall clock is involved.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Opaque handle to a cached buffer.
pub type CacheId = u64;

struct CacheEntry {
    data: Vec<u8>,
    last_used: u64,
}

/// A bounded LRU store of byte buffers.
///
/// Both a byte-total bound and an entry-count bound are enforced on every
/// insert. Eviction is silent except for the single-item-too-large case.
pub struct CacheStore {
    max_bytes: usize,
    max_entries: usize,
    used_bytes: usize,
    /// Logical timestamp, bumped on every insert and every successful lookup.
    clock: u64,
    /// Id counter; fresh ids skip over live entries on wraparound.
    next_id: CacheId,
    entries: HashMap<CacheId, CacheEntry>,
}

impl CacheStore {
    /// Create a store holding at most `max_bytes` total bytes across at
    /// most `max_entries` buffers.
    pub fn new(max_bytes: usize, max_entries: usize) -> Self {
        Self {
            max_bytes,
            max_entries,
            used_bytes: 0,
            clock: 0,
            next_id: 0,
            entries: HashMap::new(),
        }
    }

    /// Insert a buffer, evicting least-recently-used entries until both
    /// bounds are satisfied. Returns the new entry's id.
    pub fn add(&mut self, data: Vec<u8>) -> Result<CacheId> {
        let size = data.len();
        if size > self.max_bytes {
            return Err(Error::CacheItemTooLarge {
                size,
                capacity: self.max_bytes,
            });
        }

        while self.used_bytes + size > self.max_bytes
            || self.entries.len() + 1 > self.max_entries
        {
            if self.evict_lru().is_none() {
                break;
            }
        }

        loop {
            self.next_id = self.next_id.wrapping_add(1);
            if !self.entries.contains_key(&self.next_id) {
                break;
            }
        }
        let id = self.next_id;

        self.entries.insert(
            id,
            CacheEntry {
                data,
                last_used: self.clock,
            },
        );
        self.used_bytes += size;
        self.clock += 1;

        Ok(id)
    }

    /// Look up a buffer by id, bumping its recency on a hit.
    ///
    /// Returns `None` for unknown or evicted ids.
    pub fn get(&mut self, id: CacheId) -> Option<&[u8]> {
        let stamp = self.clock;
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.last_used = stamp;
                self.clock += 1;
                Some(&entry.data)
            }
            None => None,
        }
    }

    /// Evict the least-recently-used entry, returning its id.
    pub fn evict_lru(&mut self) -> Option<CacheId> {
        let id = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(id, _)| *id)?;
        if let Some(entry) = self.entries.remove(&id) {
            self.used_bytes -= entry.data.len();
            log::debug!("evicted cache entry {} ({} bytes)", id, entry.data.len());
        }
        Some(id)
    }

    /// Total bytes currently stored.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Number of entries currently stored.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut store = CacheStore::new(1024, 16);
        let id = store.add(vec![1, 2, 3]).unwrap();
        assert_eq!(store.get(id), Some(&[1u8, 2, 3][..]));
        assert_eq!(store.used_bytes(), 3);
        assert_eq!(store.entry_count(), 1);
    }

    #[test]
    fn test_unknown_id_is_absent() {
        let mut store = CacheStore::new(1024, 16);
        assert!(store.get(42).is_none());
    }

    #[test]
    fn test_item_larger_than_capacity_rejected() {
        let mut store = CacheStore::new(8, 16);
        let err = store.add(vec![0u8; 9]).unwrap_err();
        assert!(matches!(err, Error::CacheItemTooLarge { size: 9, capacity: 8 }));
    }

    #[test]
    fn test_entry_count_bound_evicts_oldest() {
        let mut store = CacheStore::new(1024, 3);
        let id0 = store.add(vec![0]).unwrap();
        let id1 = store.add(vec![1]).unwrap();
        let id2 = store.add(vec![2]).unwrap();
        // Fourth insert with no intervening gets evicts exactly the first.
        let id3 = store.add(vec![3]).unwrap();
        assert!(store.get(id0).is_none());
        assert!(store.get(id1).is_some());
        assert!(store.get(id2).is_some());
        assert!(store.get(id3).is_some());
    }

    #[test]
    fn test_get_promotes_entry() {
        let mut store = CacheStore::new(1024, 2);
        let id0 = store.add(vec![0]).unwrap();
        let id1 = store.add(vec![1]).unwrap();
        // Touch id0 so id1 becomes the LRU entry.
        assert!(store.get(id0).is_some());
        let id2 = store.add(vec![2]).unwrap();
        assert!(store.get(id0).is_some());
        assert!(store.get(id1).is_none());
        assert!(store.get(id2).is_some());
    }

    #[test]
    fn test_byte_bound_evicts_until_fit() {
        let mut store = CacheStore::new(10, 16);
        let id0 = store.add(vec![0u8; 4]).unwrap();
        let id1 = store.add(vec![0u8; 4]).unwrap();
        // 8 bytes used; a 6-byte insert evicts only the oldest entry,
        // eviction stops as soon as the insert fits.
        let id2 = store.add(vec![0u8; 6]).unwrap();
        assert!(store.get(id0).is_none());
        assert!(store.get(id1).is_some());
        assert!(store.get(id2).is_some());
        assert_eq!(store.used_bytes(), 10);
    }

    #[test]
    fn test_ids_are_never_reused_for_live_entries() {
        let mut store = CacheStore::new(1024, 16);
        let id0 = store.add(vec![0]).unwrap();
        let id1 = store.add(vec![1]).unwrap();
        assert_ne!(id0, id1);
    }
}
