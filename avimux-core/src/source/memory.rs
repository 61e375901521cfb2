//! In-memory source with shared, patchable backing storage.

use std::cell::RefCell;
use std::rc::Rc;

use byteorder::{ByteOrder, LittleEndian};

use super::{check_read_range, Source};
use crate::error::Result;

/// A source backed by an owned byte buffer.
///
/// Cloning shares the backing buffer, and the buffer stays writable
/// through any holder after the source has been embedded into a parent
/// [`ConcatenatedSource`](super::ConcatenatedSource). The builder relies
/// on this to patch index offsets and header fields once the tree shape
/// is fixed. The buffer's length never changes after construction.
#[derive(Clone)]
pub struct MemorySource {
    data: Rc<RefCell<Vec<u8>>>,
}

impl MemorySource {
    /// Create a source owning `data`.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data: Rc::new(RefCell::new(data)),
        }
    }

    /// Create a zero-filled source of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![0u8; len])
    }

    /// Create a source holding a full copy of `source`.
    pub fn copy_of(source: &dyn Source) -> Result<Self> {
        let mut data = vec![0u8; source.len() as usize];
        source.read_at(&mut data, 0)?;
        Ok(Self::from_vec(data))
    }

    /// Shared handle to the backing buffer.
    pub fn buffer(&self) -> Rc<RefCell<Vec<u8>>> {
        Rc::clone(&self.data)
    }

    /// Overwrite a little-endian u32 at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the field does not lie inside the buffer.
    pub fn patch_u32_le(&self, offset: usize, value: u32) {
        let mut data = self.data.borrow_mut();
        LittleEndian::write_u32(&mut data[offset..offset + 4], value);
    }

    /// Overwrite a little-endian u64 at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the field does not lie inside the buffer.
    pub fn patch_u64_le(&self, offset: usize, value: u64) {
        let mut data = self.data.borrow_mut();
        LittleEndian::write_u64(&mut data[offset..offset + 8], value);
    }
}

impl Source for MemorySource {
    fn len(&self) -> u64 {
        self.data.borrow().len() as u64
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        let data = self.data.borrow();
        check_read_range(data.len() as u64, buf.len(), offset)?;
        let start = offset as usize;
        buf.copy_from_slice(&data[start..start + buf.len()]);
        Ok(())
    }
}
