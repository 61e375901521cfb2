//! Gapless concatenation of child sources.

use std::cell::Cell;

use super::{check_read_range, SharedSource, Source};
use crate::error::Result;

struct Segment {
    offset: u64,
    len: u64,
    source: SharedSource,
}

/// An ordered, gapless sequence of child sources presented as one
/// contiguous range.
///
/// Zero-length children are dropped at construction. Lookups remember
/// the last-used child, which short-circuits the binary search for the
/// sequential access pattern of a drain loop.
pub struct ConcatenatedSource {
    segments: Vec<Segment>,
    total: u64,
    last_index: Cell<usize>,
}

impl ConcatenatedSource {
    /// Concatenate `sources` in order.
    pub fn new<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = SharedSource>,
    {
        let mut segments = Vec::new();
        let mut offset = 0u64;
        for source in sources {
            let len = source.len();
            if len == 0 {
                continue;
            }
            segments.push(Segment {
                offset,
                len,
                source,
            });
            offset += len;
        }
        Self {
            segments,
            total: offset,
            last_index: Cell::new(0),
        }
    }

    /// Index of the child whose range contains `offset`.
    ///
    /// Requires `offset < total` and a non-empty child list.
    fn segment_index(&self, offset: u64) -> usize {
        let hint = self.last_index.get();
        if let Some(segment) = self.segments.get(hint) {
            if segment.offset <= offset && offset < segment.offset + segment.len {
                return hint;
            }
        }

        self.segments
            .partition_point(|segment| segment.offset + segment.len <= offset)
    }
}

impl Source for ConcatenatedSource {
    fn len(&self) -> u64 {
        self.total
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        check_read_range(self.total, buf.len(), offset)?;
        if buf.is_empty() {
            return Ok(());
        }

        let mut index = self.segment_index(offset);
        let mut current = offset;
        let end = offset + buf.len() as u64;
        let mut filled = 0usize;
        while current != end {
            let segment = &self.segments[index];
            let local = current - segment.offset;
            let take = (segment.len - local).min(end - current) as usize;
            segment
                .source
                .read_at(&mut buf[filled..filled + take], local)?;
            current += take as u64;
            filled += take;
            index += 1;
        }

        // Remember where a sequential read would continue.
        let mut last = index - 1;
        if index < self.segments.len() && current == self.segments[index].offset {
            last = index;
        }
        self.last_index.set(last);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, NullSource};
    use std::rc::Rc;

    fn concat() -> ConcatenatedSource {
        ConcatenatedSource::new([
            Rc::new(MemorySource::from_vec(vec![0, 1, 2])) as SharedSource,
            Rc::new(MemorySource::from_vec(Vec::new())) as SharedSource,
            Rc::new(MemorySource::from_vec(vec![3, 4])) as SharedSource,
            Rc::new(NullSource::new(2)) as SharedSource,
            Rc::new(MemorySource::from_vec(vec![7])) as SharedSource,
        ])
    }

    #[test]
    fn test_total_len_skips_empty_children() {
        let c = concat();
        assert_eq!(c.len(), 8);
        assert_eq!(c.segments.len(), 4);
    }

    #[test]
    fn test_read_across_boundaries() {
        let c = concat();
        let mut buf = [0xAAu8; 8];
        c.read_at(&mut buf, 0).unwrap();
        assert_eq!(buf, [0, 1, 2, 3, 4, 0, 0, 7]);
    }

    #[test]
    fn test_read_inside_one_child() {
        let c = concat();
        let mut buf = [0u8; 2];
        c.read_at(&mut buf, 3).unwrap();
        assert_eq!(buf, [3, 4]);
    }

    #[test]
    fn test_read_partial_overlap() {
        let c = concat();
        let mut buf = [0u8; 4];
        c.read_at(&mut buf, 2).unwrap();
        assert_eq!(buf, [2, 3, 4, 0]);
    }

    #[test]
    fn test_sequential_reads_match_bulk_read() {
        let c = concat();
        let mut bulk = vec![0u8; 8];
        c.read_at(&mut bulk, 0).unwrap();

        let mut pieced = Vec::new();
        let mut offset = 0u64;
        while offset < c.len() {
            let take = 3.min((c.len() - offset) as usize);
            let mut buf = vec![0u8; take];
            c.read_at(&mut buf, offset).unwrap();
            pieced.extend_from_slice(&buf);
            offset += take as u64;
        }
        assert_eq!(pieced, bulk);
    }

    #[test]
    fn test_random_offsets_after_sequential() {
        let c = concat();
        let mut buf = [0u8; 1];
        c.read_at(&mut buf, 7).unwrap();
        assert_eq!(buf, [7]);
        c.read_at(&mut buf, 0).unwrap();
        assert_eq!(buf, [0]);
    }

    #[test]
    fn test_out_of_bounds() {
        let c = concat();
        let mut buf = [0u8; 2];
        assert!(c.read_at(&mut buf, 7).is_err());
    }
}
