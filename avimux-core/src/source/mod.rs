//! Lazy, composable, randomly-readable byte ranges.
//!
//! A [`Source`] is a capability, not an owned buffer: its size is fixed
//! at construction and it can be read repeatedly at arbitrary offsets.
//! Sources compose — a finalized RIFF tree is one big
//! [`ConcatenatedSource`] whose leaves are header buffers, zero ranges
//! and lazily-decoded block data — and nothing is materialized until the
//! caller drains the composed source with bounded reads.
//!
//! Implementations are not required to be thread-safe; the whole build
//! is single-threaded and shared state uses `Cell`/`RefCell`.

mod cached;
mod concat;
mod memory;
mod null;
mod partial;

pub use cached::CachedSource;
pub use concat::ConcatenatedSource;
pub use memory::MemorySource;
pub use null::NullSource;
pub use partial::{PartialSource, SpanLen, SpanStart};

use std::rc::Rc;

use crate::error::{Error, Result};

/// A fixed-size byte range readable at arbitrary offsets.
pub trait Source {
    /// Size in bytes, fixed at construction.
    fn len(&self) -> u64;

    /// Fill `buf` from the range starting at `offset`.
    ///
    /// The window `[offset, offset + buf.len())` must lie inside
    /// `[0, len())`, otherwise [`Error::ReadOutOfBounds`] is returned.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<()>;

    /// Whether the source is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared-ownership handle to a source.
///
/// Several header buffers stay mutable through their own handles after
/// being embedded into parent sources, so everything is reference
/// counted rather than copied.
pub type SharedSource = Rc<dyn Source>;

/// Validate a read window against a source size.
pub(crate) fn check_read_range(size: u64, buf_len: usize, offset: u64) -> Result<()> {
    if offset > size || buf_len as u64 > size - offset {
        return Err(Error::ReadOutOfBounds {
            offset,
            len: buf_len,
            size,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_read_range() {
        assert!(check_read_range(10, 10, 0).is_ok());
        assert!(check_read_range(10, 0, 10).is_ok());
        assert!(check_read_range(10, 5, 5).is_ok());
        assert!(check_read_range(10, 6, 5).is_err());
        assert!(check_read_range(10, 0, 11).is_err());
    }
}
