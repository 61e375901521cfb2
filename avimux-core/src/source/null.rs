//! Virtual zero-filled source.

use super::{check_read_range, Source};
use crate::error::Result;

/// A zero-filled byte range with no backing storage.
///
/// Used for chunk padding bytes and JUNK regions.
pub struct NullSource {
    len: u64,
}

impl NullSource {
    /// Create a zero range of `len` bytes.
    pub fn new(len: u64) -> Self {
        Self { len }
    }
}

impl Source for NullSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        check_read_range(self.len, buf.len(), offset)?;
        buf.fill(0);
        Ok(())
    }
}
