//! Four-character codes for RIFF tags.

use std::fmt;

/// FourCC (Four Character Code) identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 4]) -> Self {
        FourCc(bytes)
    }

    /// Raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Replace the two leading digit bytes with a stream index.
    ///
    /// Stream data tags are two ASCII digits followed by a type suffix,
    /// e.g. index 1 with suffix `\0\0dc` becomes `01dc`. The builder
    /// validates `index < 100` before calling this.
    pub fn with_stream_index(self, index: usize) -> Self {
        debug_assert!(index < 100);
        let [_, _, c, d] = self.0;
        FourCc([
            b'0' + (index / 10) as u8,
            b'0' + (index % 10) as u8,
            c,
            d,
        ])
    }

    /// Standard-index chunk tag for a stream: `ix00`, `ix01`, ...
    pub fn stream_index_chunk(index: usize) -> Self {
        debug_assert!(index < 100);
        FourCc([
            b'i',
            b'x',
            b'0' + (index / 10) as u8,
            b'0' + (index % 10) as u8,
        ])
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc(\"{}\")", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl From<[u8; 4]> for FourCc {
    fn from(bytes: [u8; 4]) -> Self {
        FourCc(bytes)
    }
}

impl From<&[u8; 4]> for FourCc {
    fn from(bytes: &[u8; 4]) -> Self {
        FourCc(*bytes)
    }
}

/// Well-known tags.
pub mod tags {
    use super::FourCc;

    pub const RIFF: FourCc = FourCc(*b"RIFF");
    pub const AVI: FourCc = FourCc(*b"AVI ");
    pub const AVIX: FourCc = FourCc(*b"AVIX");
    pub const LIST: FourCc = FourCc(*b"LIST");
    pub const HDRL: FourCc = FourCc(*b"hdrl");
    pub const AVIH: FourCc = FourCc(*b"avih");
    pub const STRL: FourCc = FourCc(*b"strl");
    pub const STRH: FourCc = FourCc(*b"strh");
    pub const STRF: FourCc = FourCc(*b"strf");
    pub const STRN: FourCc = FourCc(*b"strn");
    pub const INDX: FourCc = FourCc(*b"indx");
    pub const ODML: FourCc = FourCc(*b"odml");
    pub const DMLH: FourCc = FourCc(*b"dmlh");
    pub const MOVI: FourCc = FourCc(*b"movi");
    pub const IDX1: FourCc = FourCc(*b"idx1");
    pub const JUNK: FourCc = FourCc(*b"JUNK");
    pub const INFO: FourCc = FourCc(*b"INFO");

    /// Stream types for the stream header's `fcc_type` field.
    pub const VIDS: FourCc = FourCc(*b"vids");
    pub const AUDS: FourCc = FourCc(*b"auds");
    pub const TXTS: FourCc = FourCc(*b"txts");

    /// Data chunk suffixes; the two leading bytes are replaced with the
    /// stream index digits.
    pub const VIDEO_UNCOMPRESSED: FourCc = FourCc(*b"\0\0db");
    pub const VIDEO_COMPRESSED: FourCc = FourCc(*b"\0\0dc");
    pub const TEXT: FourCc = FourCc(*b"\0\0tx");
    pub const AUDIO: FourCc = FourCc(*b"\0\0wb");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_stream_index() {
        assert_eq!(
            tags::VIDEO_COMPRESSED.with_stream_index(0).as_bytes(),
            b"00dc"
        );
        assert_eq!(tags::AUDIO.with_stream_index(1).as_bytes(), b"01wb");
        assert_eq!(tags::AUDIO.with_stream_index(57).as_bytes(), b"57wb");
    }

    #[test]
    fn test_stream_index_chunk() {
        assert_eq!(FourCc::stream_index_chunk(0).as_bytes(), b"ix00");
        assert_eq!(FourCc::stream_index_chunk(23).as_bytes(), b"ix23");
    }

    #[test]
    fn test_display() {
        assert_eq!(tags::RIFF.to_string(), "RIFF");
        assert_eq!(tags::AVI.to_string(), "AVI ");
    }
}
