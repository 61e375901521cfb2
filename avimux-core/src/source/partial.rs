//! Fixed window into an inner source.

use super::{check_read_range, SharedSource, Source};
use crate::error::{Error, Result};

/// Where a [`PartialSource`] window starts.
#[derive(Debug, Clone, Copy)]
pub enum SpanStart {
    /// Absolute offset from the start of the inner source.
    FromStart(u64),
    /// Offset counted back from the end of the inner source.
    FromEnd(u64),
}

/// How long a [`PartialSource`] window is.
#[derive(Debug, Clone, Copy)]
pub enum SpanLen {
    /// Exact length in bytes.
    Bytes(u64),
    /// Everything from the window start to the end of the inner source.
    Remaining,
    /// Everything from the window start except the trailing `n` bytes.
    AllButTrailing(u64),
}

/// An immutable window into an inner source.
///
/// End-relative start/length sentinels are resolved once, at
/// construction; reads forward to the inner source with the window
/// offset added.
pub struct PartialSource {
    inner: SharedSource,
    offset: u64,
    len: u64,
}

impl PartialSource {
    /// Create a window over `inner`, failing if it exceeds the inner bounds.
    pub fn new(inner: SharedSource, start: SpanStart, len: SpanLen) -> Result<Self> {
        let inner_len = inner.len();

        let offset = match start {
            SpanStart::FromStart(offset) => offset,
            SpanStart::FromEnd(back) => inner_len.checked_sub(back).ok_or(
                Error::WindowOutOfRange {
                    offset: 0,
                    len: back,
                    size: inner_len,
                },
            )?,
        };
        if offset > inner_len {
            return Err(Error::WindowOutOfRange {
                offset,
                len: 0,
                size: inner_len,
            });
        }

        let remaining = inner_len - offset;
        let len = match len {
            SpanLen::Bytes(len) => len,
            SpanLen::Remaining => remaining,
            SpanLen::AllButTrailing(tail) => {
                remaining.checked_sub(tail).ok_or(Error::WindowOutOfRange {
                    offset,
                    len: tail,
                    size: inner_len,
                })?
            }
        };
        if len > remaining {
            return Err(Error::WindowOutOfRange {
                offset,
                len,
                size: inner_len,
            });
        }

        Ok(Self { inner, offset, len })
    }
}

impl Source for PartialSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        check_read_range(self.len, buf.len(), offset)?;
        self.inner.read_at(buf, self.offset + offset)
    }
}
