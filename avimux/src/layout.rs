//! Persisted AVI/OpenDML record layouts.
//!
//! Every record is packed with explicit little-endian routines at fixed
//! byte offsets; nothing relies on in-memory struct layout. Records that
//! get fields patched after the tree shape is fixed expose the byte
//! offsets of those fields as constants.

use byteorder::{ByteOrder, LittleEndian};

use crate::fourcc::FourCc;

/// Main AVI header flags (`avih.dwFlags`).
pub const AVIF_HASINDEX: u32 = 0x0000_0010;
pub const AVIF_MUSTUSEINDEX: u32 = 0x0000_0020;
pub const AVIF_ISINTERLEAVED: u32 = 0x0000_0100;
pub const AVIF_TRUSTCKTYPE: u32 = 0x0000_0800;
pub const AVIF_WASCAPTUREFILE: u32 = 0x0001_0000;
pub const AVIF_COPYRIGHTED: u32 = 0x0002_0000;

/// Legacy index entry flags (`idx1` entries).
pub const AVIIF_LIST: u32 = 0x0000_0001;
pub const AVIIF_KEYFRAME: u32 = 0x0000_0010;
pub const AVIIF_NO_TIME: u32 = 0x0000_0100;

/// The `avih` record (56 bytes).
#[derive(Debug, Clone, Default)]
pub struct MainAviHeader {
    pub micro_sec_per_frame: u32,
    pub max_bytes_per_sec: u32,
    pub padding_granularity: u32,
    pub flags: u32,
    pub total_frames: u32,
    pub initial_frames: u32,
    pub streams: u32,
    pub suggested_buffer_size: u32,
    pub width: u32,
    pub height: u32,
}

impl MainAviHeader {
    pub const LEN: usize = 56;
    /// Patched at first-segment close.
    pub const TOTAL_FRAMES_OFFSET: usize = 16;
    /// Patched during header fixup.
    pub const MAX_BYTES_PER_SEC_OFFSET: usize = 4;
    /// Patched during header fixup.
    pub const SUGGESTED_BUFFER_SIZE_OFFSET: usize = 28;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        LittleEndian::write_u32(&mut buf[0..4], self.micro_sec_per_frame);
        LittleEndian::write_u32(&mut buf[4..8], self.max_bytes_per_sec);
        LittleEndian::write_u32(&mut buf[8..12], self.padding_granularity);
        LittleEndian::write_u32(&mut buf[12..16], self.flags);
        LittleEndian::write_u32(&mut buf[16..20], self.total_frames);
        LittleEndian::write_u32(&mut buf[20..24], self.initial_frames);
        LittleEndian::write_u32(&mut buf[24..28], self.streams);
        LittleEndian::write_u32(&mut buf[28..32], self.suggested_buffer_size);
        LittleEndian::write_u32(&mut buf[32..36], self.width);
        LittleEndian::write_u32(&mut buf[36..40], self.height);
        // bytes 40..56 reserved
        buf
    }
}

/// Display rectangle in the stream header (four u16 fields).
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameRect {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

impl FrameRect {
    pub fn width(&self) -> u32 {
        u32::from(self.right) - u32::from(self.left)
    }

    pub fn height(&self) -> u32 {
        u32::from(self.bottom) - u32::from(self.top)
    }
}

/// The `strh` record (56 bytes).
#[derive(Debug, Clone)]
pub struct StreamHeader {
    pub stream_type: FourCc,
    pub handler: FourCc,
    pub flags: u32,
    pub priority: u16,
    pub language: u16,
    pub initial_frames: u32,
    /// `rate / scale` is blocks (or samples) per second; both must be
    /// non-zero.
    pub scale: u32,
    pub rate: u32,
    pub start: u32,
    pub length: u32,
    pub suggested_buffer_size: u32,
    pub quality: u32,
    pub sample_size: u32,
    pub frame: FrameRect,
}

impl StreamHeader {
    pub const LEN: usize = 56;
    /// Patched during header fixup unless the stream opts out.
    pub const SUGGESTED_BUFFER_SIZE_OFFSET: usize = 36;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..4].copy_from_slice(self.stream_type.as_bytes());
        buf[4..8].copy_from_slice(self.handler.as_bytes());
        LittleEndian::write_u32(&mut buf[8..12], self.flags);
        LittleEndian::write_u16(&mut buf[12..14], self.priority);
        LittleEndian::write_u16(&mut buf[14..16], self.language);
        LittleEndian::write_u32(&mut buf[16..20], self.initial_frames);
        LittleEndian::write_u32(&mut buf[20..24], self.scale);
        LittleEndian::write_u32(&mut buf[24..28], self.rate);
        LittleEndian::write_u32(&mut buf[28..32], self.start);
        LittleEndian::write_u32(&mut buf[32..36], self.length);
        LittleEndian::write_u32(&mut buf[36..40], self.suggested_buffer_size);
        LittleEndian::write_u32(&mut buf[40..44], self.quality);
        LittleEndian::write_u32(&mut buf[44..48], self.sample_size);
        LittleEndian::write_u16(&mut buf[48..50], self.frame.left);
        LittleEndian::write_u16(&mut buf[50..52], self.frame.top);
        LittleEndian::write_u16(&mut buf[52..54], self.frame.right);
        LittleEndian::write_u16(&mut buf[54..56], self.frame.bottom);
        buf
    }
}

/// The OpenDML `dmlh` record (248 bytes): grand total frame count across
/// all RIFF segments, plus reserved space.
#[derive(Debug, Clone, Copy)]
pub struct OdmlHeader {
    pub total_frames: u32,
}

impl OdmlHeader {
    pub const LEN: usize = 248;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        LittleEndian::write_u32(&mut buf[0..4], self.total_frames);
        buf
    }
}

/// One legacy `idx1` entry (16 bytes).
#[derive(Debug, Clone, Copy)]
pub struct Idx1Entry {
    pub chunk_id: FourCc,
    pub flags: u32,
    /// Relative to the movi list start plus 8.
    pub offset: u32,
    /// Chunk size minus the 8-byte header.
    pub size: u32,
}

impl Idx1Entry {
    pub const LEN: usize = 16;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..4].copy_from_slice(self.chunk_id.as_bytes());
        LittleEndian::write_u32(&mut buf[4..8], self.flags);
        LittleEndian::write_u32(&mut buf[8..12], self.offset);
        LittleEndian::write_u32(&mut buf[12..16], self.size);
        buf
    }
}

/// Pack a full `idx1` chunk body.
pub fn idx1_to_bytes(entries: &[Idx1Entry]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(entries.len() * Idx1Entry::LEN);
    for entry in entries {
        buf.extend_from_slice(&entry.to_bytes());
    }
    buf
}

/// One OpenDML standard-index entry (8 bytes).
#[derive(Debug, Clone, Copy)]
pub struct StdIndexEntry {
    /// Block data offset relative to the index's base offset.
    pub offset: u32,
    /// Block data size without the chunk header.
    pub size: u32,
}

/// An OpenDML standard index (`ixNN` chunk body): per-segment list of one
/// stream's block locations.
#[derive(Debug, Clone)]
pub struct StdIndex {
    pub chunk_id: FourCc,
    pub entries: Vec<StdIndexEntry>,
}

impl StdIndex {
    pub const HEADER_LEN: usize = 24;
    pub const ENTRY_LEN: usize = 8;
    /// `qwBaseOffset`, patched to the movi list's absolute offset once
    /// the tree's sizes are final.
    pub const BASE_OFFSET_OFFSET: usize = 12;

    const INDEX_OF_CHUNKS: u8 = 1;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::HEADER_LEN + self.entries.len() * Self::ENTRY_LEN];
        LittleEndian::write_u16(&mut buf[0..2], 2); // longs per entry
        buf[2] = 0; // index sub type
        buf[3] = Self::INDEX_OF_CHUNKS;
        LittleEndian::write_u32(&mut buf[4..8], self.entries.len() as u32);
        buf[8..12].copy_from_slice(self.chunk_id.as_bytes());
        // bytes 12..20: base offset, filled later; 20..24 reserved
        for (i, entry) in self.entries.iter().enumerate() {
            let at = Self::HEADER_LEN + i * Self::ENTRY_LEN;
            LittleEndian::write_u32(&mut buf[at..at + 4], entry.offset);
            LittleEndian::write_u32(&mut buf[at + 4..at + 8], entry.size);
        }
        buf
    }
}

/// One OpenDML super-index entry (16 bytes).
#[derive(Debug, Clone, Copy)]
pub struct SuperIndexEntry {
    /// Absolute offset of the segment's standard-index chunk; patched
    /// after sizes are final.
    pub offset: u64,
    /// Standard-index chunk size, including its chunk header.
    pub size: u32,
    /// Duration units the stream contributed in that segment.
    pub duration: u32,
}

/// An OpenDML super index (`indx` chunk body): one entry per RIFF
/// segment the stream appeared in.
#[derive(Debug, Clone)]
pub struct SuperIndex {
    pub chunk_id: FourCc,
    pub entries: Vec<SuperIndexEntry>,
}

impl SuperIndex {
    pub const HEADER_LEN: usize = 24;
    pub const ENTRY_LEN: usize = 16;

    const INDEX_OF_INDEXES: u8 = 0;

    /// Byte offset of entry `i`'s `qwOffset` field.
    pub const fn entry_offset_offset(i: usize) -> usize {
        Self::HEADER_LEN + i * Self::ENTRY_LEN
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::HEADER_LEN + self.entries.len() * Self::ENTRY_LEN];
        LittleEndian::write_u16(&mut buf[0..2], 4); // longs per entry
        buf[2] = 0; // index sub type
        buf[3] = Self::INDEX_OF_INDEXES;
        LittleEndian::write_u32(&mut buf[4..8], self.entries.len() as u32);
        buf[8..12].copy_from_slice(self.chunk_id.as_bytes());
        // bytes 12..24 reserved
        for (i, entry) in self.entries.iter().enumerate() {
            let at = Self::entry_offset_offset(i);
            LittleEndian::write_u64(&mut buf[at..at + 8], entry.offset);
            LittleEndian::write_u32(&mut buf[at + 8..at + 12], entry.size);
            LittleEndian::write_u32(&mut buf[at + 12..at + 16], entry.duration);
        }
        buf
    }
}
