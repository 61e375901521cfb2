//! The stream adapter contract consumed by the builder.

use std::rc::Rc;

use avimux_core::{Result, SharedSource};

use crate::fourcc::FourCc;
use crate::layout::StreamHeader;
use crate::riff::RiffList;

/// Metadata for one block (a video frame or an audio sample group).
#[derive(Debug, Clone, Copy)]
pub struct BlockInfo {
    /// Raw data size in bytes.
    pub size: u32,
    /// Start time in the stream's own rate/scale units.
    pub start_time: u64,
    /// Duration in the stream's own rate/scale units.
    pub duration: u64,
    /// Flags copied into the legacy index entry for this block,
    /// e.g. [`AVIIF_KEYFRAME`](crate::layout::AVIIF_KEYFRAME).
    pub index_flags: u32,
}

/// One media stream feeding the builder.
///
/// Implemented per media kind outside this crate; the builder never
/// inspects block bytes, it only positions the sources the adapter
/// hands out. Blocks must be ordered by start time. `block_info` and
/// `stream_header` may be called repeatedly and must be cheap;
/// `block_data` may decode lazily and is called exactly once per block.
pub trait AviStream {
    /// Data chunk tag suffix for this stream, e.g.
    /// [`tags::VIDEO_COMPRESSED`](crate::fourcc::tags::VIDEO_COMPRESSED).
    /// The two leading bytes are replaced with the stream index digits.
    fn chunk_id(&self) -> FourCc;

    /// Number of blocks this stream contributes.
    fn block_count(&self) -> usize;

    /// Metadata for block `index`.
    fn block_info(&self, index: usize) -> BlockInfo;

    /// Raw data for block `index`. Its length must match
    /// `block_info(index).size`.
    fn block_data(&self, index: usize) -> Result<SharedSource>;

    /// The `strh` record. The rate and scale fields must be non-zero.
    fn stream_header(&self) -> StreamHeader;

    /// The format-specific `strf` blob (bitmap-info or wave-format
    /// record).
    fn format_data(&self) -> Result<SharedSource>;

    /// Optional human-readable stream name for a `strn` chunk.
    fn stream_name(&self) -> Option<SharedSource> {
        None
    }

    /// Whether the builder should patch this stream's suggested buffer
    /// size to the observed maximum block size.
    fn wants_buffer_size_patch(&self) -> bool {
        true
    }

    /// Whether block data sources should be wrapped in a caching layer.
    /// Only meaningful when the builder has a cache store attached.
    fn cache_block_data(&self) -> bool {
        false
    }

    /// Called once the stream's `strl` list has been assembled, before
    /// interleaving starts.
    fn on_stream_list_built(&self, _list: &Rc<RiffList>) {}
}
