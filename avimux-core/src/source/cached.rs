//! Memoizing wrapper for expensive-to-produce sources.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{check_read_range, SharedSource, Source};
use crate::cache::{CacheId, CacheStore};
use crate::error::Result;

/// A source that memoizes its inner source's entire content in a
/// [`CacheStore`].
///
/// The first read decodes the whole inner source once and inserts the
/// buffer into the store; later reads copy straight out of the cached
/// buffer. If the entry has been evicted the inner source is decoded
/// again, transparently. The cache id is unset until first use.
pub struct CachedSource {
    store: Rc<RefCell<CacheStore>>,
    inner: SharedSource,
    len: u64,
    cache_id: Cell<Option<CacheId>>,
}

impl CachedSource {
    /// Wrap `inner`, memoizing into `store`.
    pub fn new(store: Rc<RefCell<CacheStore>>, inner: SharedSource) -> Self {
        let len = inner.len();
        Self {
            store,
            inner,
            len,
            cache_id: Cell::new(None),
        }
    }
}

impl Source for CachedSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        check_read_range(self.len, buf.len(), offset)?;
        let start = offset as usize;

        if let Some(id) = self.cache_id.get() {
            let mut store = self.store.borrow_mut();
            if let Some(data) = store.get(id) {
                log::trace!("cache hit for id {}", id);
                buf.copy_from_slice(&data[start..start + buf.len()]);
                return Ok(());
            }
        }

        // Miss (unset or evicted id): decode the whole inner source once.
        // The store borrow is released first; the inner source may itself
        // be cached in the same store.
        log::trace!("cache miss, decoding {} bytes", self.len);
        let mut data = vec![0u8; self.len as usize];
        self.inner.read_at(&mut data, 0)?;
        buf.copy_from_slice(&data[start..start + buf.len()]);
        let id = self.store.borrow_mut().add(data)?;
        self.cache_id.set(Some(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Source that counts how often it is read.
    struct CountingSource {
        data: Vec<u8>,
        reads: Cell<usize>,
    }

    impl CountingSource {
        fn new(data: Vec<u8>) -> Self {
            Self {
                data,
                reads: Cell::new(0),
            }
        }
    }

    impl Source for CountingSource {
        fn len(&self) -> u64 {
            self.data.len() as u64
        }

        fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
            check_read_range(self.len(), buf.len(), offset)?;
            self.reads.set(self.reads.get() + 1);
            let start = offset as usize;
            buf.copy_from_slice(&self.data[start..start + buf.len()]);
            Ok(())
        }
    }

    fn store(max_bytes: usize, max_entries: usize) -> Rc<RefCell<CacheStore>> {
        Rc::new(RefCell::new(CacheStore::new(max_bytes, max_entries)))
    }

    #[test]
    fn test_inner_read_at_most_once_without_eviction() {
        let inner = Rc::new(CountingSource::new(vec![1, 2, 3, 4]));
        let cached = CachedSource::new(store(1024, 16), inner.clone());

        let mut first = [0u8; 2];
        cached.read_at(&mut first, 0).unwrap();
        let mut second = [0u8; 2];
        cached.read_at(&mut second, 2).unwrap();

        assert_eq!(first, [1, 2]);
        assert_eq!(second, [3, 4]);
        assert_eq!(inner.reads.get(), 1);
    }

    #[test]
    fn test_redecodes_after_eviction() {
        let inner = Rc::new(CountingSource::new(vec![5, 6, 7, 8]));
        let cache = store(1024, 16);
        let cached = CachedSource::new(cache.clone(), inner.clone());

        let mut buf = [0u8; 4];
        cached.read_at(&mut buf, 0).unwrap();
        assert_eq!(buf, [5, 6, 7, 8]);

        while cache.borrow_mut().evict_lru().is_some() {}

        let mut again = [0u8; 4];
        cached.read_at(&mut again, 0).unwrap();
        assert_eq!(again, buf);
        assert_eq!(inner.reads.get(), 2);
    }

    #[test]
    fn test_id_unset_until_first_read() {
        let inner = Rc::new(CountingSource::new(vec![0u8; 8]));
        let cached = CachedSource::new(store(1024, 16), inner.clone());
        assert!(cached.cache_id.get().is_none());
        assert_eq!(inner.reads.get(), 0);

        let mut buf = [0u8; 1];
        cached.read_at(&mut buf, 0).unwrap();
        assert!(cached.cache_id.get().is_some());
    }
}
