//! RIFF node model: chunks, lists and the unframed root.
//!
//! Nodes form a tree built once per AVI construction. A node's absolute
//! offset is computed by chaining parent offsets, bottoming out at the
//! root (offset 0); it is meaningful only once sibling sizes are stable.
//! Chunk content may still be swapped afterwards as long as the eventual
//! size does not change — the builder uses this for index chunks filled
//! in late. `finalize` runs strictly bottom-up and turns each node into
//! a lazily-readable [`Source`](avimux_core::Source) without copying any
//! content.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use byteorder::{ByteOrder, LittleEndian};

use avimux_core::error::{Error, Result};
use avimux_core::source::{ConcatenatedSource, MemorySource, NullSource, SharedSource, Source};

use crate::fourcc::FourCc;

/// Chunk header: tag plus 32-bit size field.
const CHUNK_HEADER_LEN: u64 = 8;
/// List header: framing tag, 32-bit size field, list-type tag.
const LIST_HEADER_LEN: u64 = 12;

/// A node in the RIFF tree.
///
/// Child identity in `offset_of` is the `Rc` data pointer, thinned to
/// `*const ()`; nodes are only ever held through `Rc`, so the pointer a
/// node sees for itself matches the pointer its parent stores.
pub trait RiffNode {
    /// Total encoded size of this node in bytes (header included).
    fn size(&self) -> u64;

    /// Absolute offset of this node in the final output.
    fn offset(&self) -> u64;

    /// Offset of `child` within this node.
    fn offset_of(&self, child: *const ()) -> u64;

    /// Record this node's parent; called once, when the node is added
    /// as a child.
    fn attach_parent(&self, parent: Weak<dyn RiffNode>);

    /// Build this node's source, children first.
    fn finalize(&self) -> Result<()>;

    /// The finalized source; [`Error::NotFinalized`] before `finalize`.
    fn source(&self) -> Result<SharedSource>;
}

fn offset_via_parent(parent: &RefCell<Weak<dyn RiffNode>>, node: *const ()) -> u64 {
    match parent.borrow().upgrade() {
        Some(parent) => parent.offset() + parent.offset_of(node),
        None => 0,
    }
}

/// A tagged, length-prefixed, even-padded record.
pub struct RiffChunk {
    parent: RefCell<Weak<dyn RiffNode>>,
    id: FourCc,
    content: RefCell<SharedSource>,
    source: RefCell<Option<SharedSource>>,
}

impl RiffChunk {
    /// Create a chunk over `content`.
    pub fn new(id: FourCc, content: SharedSource) -> Rc<Self> {
        Rc::new(Self {
            parent: RefCell::new(Weak::<RiffRoot>::new()),
            id,
            content: RefCell::new(content),
            source: RefCell::new(None),
        })
    }

    /// Create a chunk with empty content, to be filled in later.
    pub fn empty(id: FourCc) -> Rc<Self> {
        Self::new(id, Rc::new(MemorySource::from_vec(Vec::new())))
    }

    /// The chunk tag.
    pub fn id(&self) -> FourCc {
        self.id
    }

    /// Content size, without header or padding.
    pub fn content_size(&self) -> u64 {
        self.content.borrow().len()
    }

    /// Replace the chunk content.
    ///
    /// Once sibling offsets have been consumed the replacement must keep
    /// the eventual size unchanged; any previously finalized source is
    /// discarded.
    pub fn set_content(&self, content: SharedSource) {
        *self.content.borrow_mut() = content;
        *self.source.borrow_mut() = None;
    }
}

impl RiffNode for RiffChunk {
    fn size(&self) -> u64 {
        let content = self.content.borrow().len();
        CHUNK_HEADER_LEN + content + (content & 1)
    }

    fn offset(&self) -> u64 {
        offset_via_parent(&self.parent, self as *const Self as *const ())
    }

    fn offset_of(&self, _child: *const ()) -> u64 {
        unreachable!("chunk nodes have no children")
    }

    fn attach_parent(&self, parent: Weak<dyn RiffNode>) {
        *self.parent.borrow_mut() = parent;
    }

    fn finalize(&self) -> Result<()> {
        let content = Rc::clone(&*self.content.borrow());
        let content_size = content.len();
        if content_size > u64::from(u32::MAX) {
            return Err(Error::ChunkTooLarge { size: content_size });
        }

        let mut header = [0u8; CHUNK_HEADER_LEN as usize];
        header[0..4].copy_from_slice(self.id.as_bytes());
        LittleEndian::write_u32(&mut header[4..8], content_size as u32);

        let mut parts: Vec<SharedSource> =
            vec![Rc::new(MemorySource::from_vec(header.to_vec())), content];
        if content_size & 1 == 1 {
            parts.push(Rc::new(NullSource::new(1)));
        }

        *self.source.borrow_mut() = Some(Rc::new(ConcatenatedSource::new(parts)));
        Ok(())
    }

    fn source(&self) -> Result<SharedSource> {
        self.source
            .borrow()
            .as_ref()
            .map(Rc::clone)
            .ok_or(Error::NotFinalized)
    }
}

/// A LIST (or RIFF) node: framing tag, size field, type tag, children.
pub struct RiffList {
    weak_self: Weak<RiffList>,
    parent: RefCell<Weak<dyn RiffNode>>,
    frame_id: FourCc,
    type_id: FourCc,
    children: RefCell<Vec<Rc<dyn RiffNode>>>,
    source: RefCell<Option<SharedSource>>,
}

impl RiffList {
    /// Create an empty list with the given framing tag (`LIST` or
    /// `RIFF`) and list-type tag.
    pub fn new(frame_id: FourCc, type_id: FourCc) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            weak_self: weak.clone(),
            parent: RefCell::new(Weak::<RiffRoot>::new()),
            frame_id,
            type_id,
            children: RefCell::new(Vec::new()),
            source: RefCell::new(None),
        })
    }

    /// The list-type tag (`hdrl`, `movi`, ...).
    pub fn type_id(&self) -> FourCc {
        self.type_id
    }

    /// Append a child, wiring its parent back-reference.
    pub fn add_child(&self, child: Rc<dyn RiffNode>) {
        let parent: Weak<dyn RiffNode> = self.weak_self.clone();
        child.attach_parent(parent);
        self.children.borrow_mut().push(child);
    }

    /// Number of children.
    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    fn content_size(&self) -> u64 {
        self.children.borrow().iter().map(|c| c.size()).sum()
    }
}

impl RiffNode for RiffList {
    fn size(&self) -> u64 {
        LIST_HEADER_LEN + self.content_size()
    }

    fn offset(&self) -> u64 {
        offset_via_parent(&self.parent, self as *const Self as *const ())
    }

    fn offset_of(&self, child: *const ()) -> u64 {
        let mut offset = LIST_HEADER_LEN;
        for c in self.children.borrow().iter() {
            if Rc::as_ptr(c) as *const () == child {
                return offset;
            }
            offset += c.size();
        }
        unreachable!("offset_of: node is not a child of this list")
    }

    fn attach_parent(&self, parent: Weak<dyn RiffNode>) {
        *self.parent.borrow_mut() = parent;
    }

    fn finalize(&self) -> Result<()> {
        let children = self.children.borrow();

        let mut parts: Vec<SharedSource> = Vec::with_capacity(children.len() + 1);
        for child in children.iter() {
            child.finalize()?;
        }

        // The size field covers the type tag plus all children.
        let content_size = self.content_size();
        if content_size + 4 > u64::from(u32::MAX) {
            return Err(Error::ListTooLarge { size: content_size });
        }

        let mut header = [0u8; LIST_HEADER_LEN as usize];
        header[0..4].copy_from_slice(self.frame_id.as_bytes());
        LittleEndian::write_u32(&mut header[4..8], content_size as u32 + 4);
        header[8..12].copy_from_slice(self.type_id.as_bytes());
        parts.push(Rc::new(MemorySource::from_vec(header.to_vec())));

        for child in children.iter() {
            parts.push(child.source()?);
        }

        *self.source.borrow_mut() = Some(Rc::new(ConcatenatedSource::new(parts)));
        Ok(())
    }

    fn source(&self) -> Result<SharedSource> {
        self.source
            .borrow()
            .as_ref()
            .map(Rc::clone)
            .ok_or(Error::NotFinalized)
    }
}

/// The unframed container of top-level RIFF lists (the primary AVI RIFF
/// plus any AVIX continuation RIFFs). Always at offset 0.
pub struct RiffRoot {
    weak_self: Weak<RiffRoot>,
    children: RefCell<Vec<Rc<dyn RiffNode>>>,
    source: RefCell<Option<SharedSource>>,
}

impl RiffRoot {
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            weak_self: weak.clone(),
            children: RefCell::new(Vec::new()),
            source: RefCell::new(None),
        })
    }

    /// Append a top-level list, wiring its parent back-reference.
    pub fn add_child(&self, child: Rc<dyn RiffNode>) {
        let parent: Weak<dyn RiffNode> = self.weak_self.clone();
        child.attach_parent(parent);
        self.children.borrow_mut().push(child);
    }

    /// Number of top-level lists.
    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }
}

impl RiffNode for RiffRoot {
    fn size(&self) -> u64 {
        self.children.borrow().iter().map(|c| c.size()).sum()
    }

    fn offset(&self) -> u64 {
        0
    }

    fn offset_of(&self, child: *const ()) -> u64 {
        let mut offset = 0;
        for c in self.children.borrow().iter() {
            if Rc::as_ptr(c) as *const () == child {
                return offset;
            }
            offset += c.size();
        }
        unreachable!("offset_of: node is not a child of the root")
    }

    fn attach_parent(&self, _parent: Weak<dyn RiffNode>) {
        unreachable!("the root cannot have a parent")
    }

    fn finalize(&self) -> Result<()> {
        let children = self.children.borrow();
        let mut parts: Vec<SharedSource> = Vec::with_capacity(children.len());
        for child in children.iter() {
            child.finalize()?;
            parts.push(child.source()?);
        }
        *self.source.borrow_mut() = Some(Rc::new(ConcatenatedSource::new(parts)));
        Ok(())
    }

    fn source(&self) -> Result<SharedSource> {
        self.source
            .borrow()
            .as_ref()
            .map(Rc::clone)
            .ok_or(Error::NotFinalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fourcc::tags;

    fn memory(data: &[u8]) -> SharedSource {
        Rc::new(MemorySource::from_vec(data.to_vec()))
    }

    fn drain(source: &SharedSource) -> Vec<u8> {
        let mut out = vec![0u8; source.len() as usize];
        source.read_at(&mut out, 0).unwrap();
        out
    }

    #[test]
    fn test_chunk_size_even_content() {
        let chunk = RiffChunk::new(FourCc(*b"test"), memory(&[1, 2, 3, 4]));
        assert_eq!(chunk.size(), 8 + 4);
    }

    #[test]
    fn test_chunk_size_odd_content_padded() {
        let chunk = RiffChunk::new(FourCc(*b"test"), memory(&[1, 2, 3]));
        assert_eq!(chunk.size(), 8 + 3 + 1);

        chunk.finalize().unwrap();
        let bytes = drain(&chunk.source().unwrap());
        assert_eq!(&bytes[0..4], b"test");
        assert_eq!(&bytes[4..8], &3u32.to_le_bytes());
        assert_eq!(&bytes[8..11], &[1, 2, 3]);
        assert_eq!(bytes[11], 0);
    }

    #[test]
    fn test_chunk_source_before_finalize_fails() {
        let chunk = RiffChunk::new(FourCc(*b"test"), memory(&[1]));
        assert!(matches!(chunk.source(), Err(Error::NotFinalized)));
    }

    #[test]
    fn test_set_content_resets_finalized_source() {
        let chunk = RiffChunk::empty(FourCc(*b"idx1"));
        chunk.finalize().unwrap();
        chunk.set_content(memory(&[1, 2]));
        assert!(chunk.source().is_err());
        assert_eq!(chunk.content_size(), 2);
    }

    #[test]
    fn test_list_size() {
        let list = RiffList::new(tags::LIST, tags::HDRL);
        list.add_child(RiffChunk::new(FourCc(*b"aaaa"), memory(&[0u8; 4])));
        list.add_child(RiffChunk::new(FourCc(*b"bbbb"), memory(&[0u8; 6])));
        // 12-byte header + (8 + 4) + (8 + 6)
        assert_eq!(list.size(), 12 + 12 + 14);
    }

    #[test]
    fn test_list_header_bytes() {
        let list = RiffList::new(tags::LIST, tags::MOVI);
        list.add_child(RiffChunk::new(FourCc(*b"00dc"), memory(&[9u8; 2])));
        list.finalize().unwrap();
        let bytes = drain(&list.source().unwrap());
        assert_eq!(&bytes[0..4], b"LIST");
        // Size field covers the type tag plus children: 4 + 10.
        assert_eq!(&bytes[4..8], &14u32.to_le_bytes());
        assert_eq!(&bytes[8..12], b"movi");
        assert_eq!(&bytes[12..16], b"00dc");
    }

    #[test]
    fn test_offsets_chain_through_parents() {
        let root = RiffRoot::new();
        let riff = RiffList::new(tags::RIFF, tags::AVI);
        root.add_child(riff.clone());

        let first = RiffChunk::new(FourCc(*b"aaaa"), memory(&[0u8; 4]));
        let second = RiffChunk::new(FourCc(*b"bbbb"), memory(&[0u8; 6]));
        riff.add_child(first.clone());
        riff.add_child(second.clone());

        assert_eq!(riff.offset(), 0);
        assert_eq!(first.offset(), 12);
        assert_eq!(second.offset(), 12 + 12);
        // Sibling contiguity: end of one node is the start of the next.
        assert_eq!(first.offset() + first.size(), second.offset());
        assert_eq!(second.offset() + second.size(), root.size());
    }

    #[test]
    fn test_nested_list_offsets() {
        let root = RiffRoot::new();
        let riff = RiffList::new(tags::RIFF, tags::AVI);
        root.add_child(riff.clone());
        let inner = RiffList::new(tags::LIST, tags::HDRL);
        riff.add_child(inner.clone());
        let chunk = RiffChunk::new(FourCc(*b"avih"), memory(&[0u8; 8]));
        inner.add_child(chunk.clone());

        assert_eq!(inner.offset(), 12);
        assert_eq!(chunk.offset(), 24);
    }

    #[test]
    fn test_second_top_level_list_offset() {
        let root = RiffRoot::new();
        let avi = RiffList::new(tags::RIFF, tags::AVI);
        let avix = RiffList::new(tags::RIFF, tags::AVIX);
        root.add_child(avi.clone());
        root.add_child(avix.clone());
        avi.add_child(RiffChunk::new(FourCc(*b"cccc"), memory(&[0u8; 10])));

        assert_eq!(avix.offset(), avi.size());
    }

    #[test]
    fn test_root_finalize_concatenates_lists() {
        let root = RiffRoot::new();
        let riff = RiffList::new(tags::RIFF, tags::AVI);
        root.add_child(riff.clone());
        riff.add_child(RiffChunk::new(FourCc(*b"data"), memory(&[7u8; 4])));

        root.finalize().unwrap();
        let bytes = drain(&root.source().unwrap());
        assert_eq!(bytes.len() as u64, root.size());
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"AVI ");
        assert_eq!(&bytes[12..16], b"data");
    }

    #[test]
    fn test_patched_content_visible_after_finalize() {
        // Header buffers stay mutable through their own handles after
        // the tree is finalized.
        let buffer = MemorySource::zeroed(8);
        let chunk = RiffChunk::new(FourCc(*b"avih"), Rc::new(buffer.clone()));
        chunk.finalize().unwrap();
        buffer.patch_u32_le(4, 0xDEADBEEF);
        let bytes = drain(&chunk.source().unwrap());
        assert_eq!(&bytes[12..16], &0xDEADBEEFu32.to_le_bytes());
    }
}
