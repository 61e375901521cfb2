//! Two-pass AVI construction.
//!
//! The builder assembles a static skeleton first (headers, stream lists,
//! empty movi list, placeholder index chunks), then interleaves stream
//! blocks by presentation time, splitting into OpenDML AVIX segments
//! when a RIFF would outgrow its configured limits. Index chunks and
//! patched header fields are filled in afterwards; absolute offsets are
//! written last, once every chunk has its final content and the tree's
//! sizes can no longer change. The result is a single lazy source over
//! the whole file; no block data is copied during construction.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use avimux_core::cache::CacheStore;
use avimux_core::error::{Error, Result};
use avimux_core::rational::Rational;
use avimux_core::source::{CachedSource, MemorySource, NullSource, SharedSource};

use crate::fourcc::{tags, FourCc};
use crate::layout::{
    idx1_to_bytes, Idx1Entry, MainAviHeader, OdmlHeader, StdIndex, StdIndexEntry, StreamHeader,
    SuperIndex, SuperIndexEntry, AVIF_HASINDEX,
};
use crate::riff::{RiffChunk, RiffList, RiffNode, RiffRoot};
use crate::stream::AviStream;

/// Default per-RIFF size limit (1 GiB), for the primary and each AVIX
/// segment alike.
pub const DEFAULT_MAX_RIFF_SIZE: u64 = 0x4000_0000;

/// Build options.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Emit the legacy flat `idx1` index.
    pub write_idx1: bool,
    /// Emit OpenDML structures (`indx`/`ixNN` indices, `odml` list) and
    /// split oversized output into AVIX segments. When disabled the
    /// whole file is a single RIFF regardless of size.
    pub write_odml: bool,
    /// Main header flags.
    pub avih_flags: u32,
    /// Size of a zero-filled JUNK padding chunk; 0 omits it.
    pub junk_size: u32,
    /// Place the JUNK chunk before the INFO list instead of after it.
    pub junk_before_info: bool,
    /// Byte limit for the primary RIFF segment.
    pub max_riff_size: u64,
    /// Byte limit for each AVIX continuation segment.
    pub max_avix_riff_size: u64,
    /// Block-count limit for the primary RIFF segment.
    pub max_riff_blocks: u32,
    /// Block-count limit for each AVIX continuation segment.
    pub max_avix_riff_blocks: u32,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            write_idx1: true,
            write_odml: true,
            avih_flags: AVIF_HASINDEX,
            junk_size: 0,
            junk_before_info: false,
            max_riff_size: DEFAULT_MAX_RIFF_SIZE,
            max_avix_riff_size: DEFAULT_MAX_RIFF_SIZE,
            max_riff_blocks: u32::MAX,
            max_avix_riff_blocks: u32::MAX,
        }
    }
}

/// Synchronous notification hooks fired at structural milestones. All
/// callbacks run on the builder's own stack.
pub trait BuildObserver {
    /// The static skeleton is complete; interleaving is about to start.
    /// `hdrl` is the assembled header list.
    fn on_headers_built(&mut self, _hdrl: &Rc<RiffList>) {}

    /// A RIFF segment was closed (indices emitted, counters patched).
    fn on_segment_closed(&mut self, _riff: &Rc<RiffList>, _is_avix: bool) {}

    /// The tree has been finalized into the output source.
    fn on_finalized(&mut self) {}
}

/// Per-stream bookkeeping for one closed segment.
struct SegmentRecord {
    movi: Rc<RiffList>,
    index_chunk: Rc<RiffChunk>,
    index_buffer: MemorySource,
    duration: u64,
}

struct StreamState {
    stream: Rc<dyn AviStream>,
    data_tag: FourCc,
    /// Seconds per start-time unit (`scale / rate`).
    time_coef: Rational,
    block_count: usize,
    next_block: usize,
    header_buffer: MemorySource,
    /// The `indx` placeholder in this stream's strl list.
    super_chunk: Option<Rc<RiffChunk>>,
    super_buffer: Option<MemorySource>,
    /// Standard-index entries for the currently open segment.
    entries: Vec<StdIndexEntry>,
    segment_duration: u64,
    max_block_size: u32,
    /// Rolling window length, `ceil(rate / scale)` blocks.
    window_limit: usize,
    window_sizes: VecDeque<u64>,
    window_bytes: u64,
    max_window_bytes: u64,
    segments: Vec<SegmentRecord>,
}

/// Assembles one AVI file from a set of streams.
///
/// ```no_run
/// # use std::rc::Rc;
/// # use avimux::{AviBuilder, AviStream, BuilderConfig};
/// # fn video() -> Rc<dyn AviStream> { unimplemented!() }
/// let mut builder = AviBuilder::new(BuilderConfig::default());
/// builder.add_stream(video(), true)?;
/// let output = builder.build()?;
/// let mut buf = vec![0u8; 64 * 1024];
/// let mut written = 0u64;
/// while written < output.len() {
///     let n = buf.len().min((output.len() - written) as usize);
///     output.read_at(&mut buf[..n], written)?;
///     written += n as u64;
/// }
/// # Ok::<(), avimux::Error>(())
/// ```
pub struct AviBuilder {
    streams: Vec<Rc<dyn AviStream>>,
    primary: Option<usize>,
    info_list: Option<Rc<RiffList>>,
    config: BuilderConfig,
    cache: Option<Rc<RefCell<CacheStore>>>,
    observer: Option<Box<dyn BuildObserver>>,
}

impl AviBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            streams: Vec::new(),
            primary: None,
            info_list: None,
            config,
            cache: None,
            observer: None,
        }
    }

    /// Append a stream. Exactly one stream must be added with
    /// `primary` set; it supplies the global frame rate, dimensions and
    /// frame count.
    pub fn add_stream(&mut self, stream: Rc<dyn AviStream>, primary: bool) -> Result<()> {
        if primary {
            if self.primary.is_some() {
                return Err(Error::config("primary stream designated twice"));
            }
            self.primary = Some(self.streams.len());
        }
        self.streams.push(stream);
        Ok(())
    }

    /// Attach a prebuilt LIST("INFO") node, emitted under the primary
    /// RIFF.
    pub fn set_info_list(&mut self, list: Rc<RiffList>) {
        self.info_list = Some(list);
    }

    /// Attach a cache store; streams opting in via
    /// [`AviStream::cache_block_data`] get their block sources wrapped
    /// in a memoizing layer backed by it.
    pub fn set_cache(&mut self, cache: Rc<RefCell<CacheStore>>) {
        self.cache = Some(cache);
    }

    pub fn set_observer(&mut self, observer: Box<dyn BuildObserver>) {
        self.observer = Some(observer);
    }

    /// Run the full build and return the composed output source.
    ///
    /// Any error is terminal: no partial output exists and the builder
    /// should be discarded.
    pub fn build(&mut self) -> Result<SharedSource> {
        let primary_index = self.validate()?;
        let primary_header = self.streams[primary_index].stream_header();

        log::info!(
            "building AVI with {} streams, {} primary blocks",
            self.streams.len(),
            self.streams[primary_index].block_count()
        );

        // Static skeleton.
        let root = RiffRoot::new();
        let riff = RiffList::new(tags::RIFF, tags::AVI);
        root.add_child(riff.clone());

        let hdrl = RiffList::new(tags::LIST, tags::HDRL);
        riff.add_child(hdrl.clone());

        let micro_sec_per_frame = (1_000_000f64 * f64::from(primary_header.scale)
            / f64::from(primary_header.rate)
            + 0.5) as u32;
        let avih = MainAviHeader {
            micro_sec_per_frame,
            flags: self.config.avih_flags,
            streams: self.streams.len() as u32,
            width: primary_header.frame.width(),
            height: primary_header.frame.height(),
            ..Default::default()
        };
        let avih_buffer = MemorySource::from_vec(avih.to_bytes().to_vec());
        hdrl.add_child(RiffChunk::new(tags::AVIH, Rc::new(avih_buffer.clone())));

        let mut states = Vec::with_capacity(self.streams.len());
        for (i, stream) in self.streams.iter().enumerate() {
            let header = stream.stream_header();
            let strl = RiffList::new(tags::LIST, tags::STRL);
            hdrl.add_child(strl.clone());

            let header_buffer = MemorySource::from_vec(header.to_bytes().to_vec());
            strl.add_child(RiffChunk::new(tags::STRH, Rc::new(header_buffer.clone())));
            strl.add_child(RiffChunk::new(tags::STRF, stream.format_data()?));
            if let Some(name) = stream.stream_name() {
                strl.add_child(RiffChunk::new(tags::STRN, name));
            }
            let super_chunk = if self.config.write_odml {
                let chunk = RiffChunk::empty(tags::INDX);
                strl.add_child(chunk.clone());
                Some(chunk)
            } else {
                None
            };
            stream.on_stream_list_built(&strl);

            let rate = u64::from(header.rate);
            let scale = u64::from(header.scale);
            states.push(StreamState {
                stream: Rc::clone(stream),
                data_tag: stream.chunk_id().with_stream_index(i),
                time_coef: Rational::new(scale, rate),
                block_count: stream.block_count(),
                next_block: 0,
                header_buffer,
                super_chunk,
                super_buffer: None,
                entries: Vec::new(),
                segment_duration: 0,
                max_block_size: 0,
                window_limit: ((rate + scale - 1) / scale).max(1) as usize,
                window_sizes: VecDeque::new(),
                window_bytes: 0,
                max_window_bytes: 0,
                segments: Vec::new(),
            });
        }

        let dmlh_buffer = if self.config.write_odml {
            let odml = RiffList::new(tags::LIST, tags::ODML);
            hdrl.add_child(odml.clone());
            let buffer =
                MemorySource::from_vec(OdmlHeader { total_frames: 0 }.to_bytes().to_vec());
            odml.add_child(RiffChunk::new(tags::DMLH, Rc::new(buffer.clone())));
            Some(buffer)
        } else {
            None
        };

        let info_list = self.info_list.clone();
        let junk_chunk = if self.config.junk_size > 0 {
            let pad = Rc::new(NullSource::new(u64::from(self.config.junk_size)));
            Some(RiffChunk::new(tags::JUNK, pad))
        } else {
            None
        };
        if self.config.junk_before_info {
            if let Some(junk) = junk_chunk {
                riff.add_child(junk);
            }
            if let Some(info) = info_list {
                riff.add_child(info);
            }
        } else {
            if let Some(info) = info_list {
                riff.add_child(info);
            }
            if let Some(junk) = junk_chunk {
                riff.add_child(junk);
            }
        }

        let movi = RiffList::new(tags::LIST, tags::MOVI);
        riff.add_child(movi.clone());

        let idx1_chunk = if self.config.write_idx1 {
            let chunk = RiffChunk::empty(tags::IDX1);
            riff.add_child(chunk.clone());
            Some(chunk)
        } else {
            None
        };

        if let Some(observer) = self.observer.as_mut() {
            observer.on_headers_built(&hdrl);
        }

        // Interleave, splitting into AVIX segments as limits are hit.
        let mut current_riff = riff;
        let mut current_movi = movi;
        let mut size_count = current_riff.size();
        let mut segment_blocks: u64 = 0;
        let mut segment_index = 0usize;
        // Every segment, the primary one included, takes at least one
        // block before it may close.
        let mut initialize_riff = true;
        let mut idx1_entries: Vec<Idx1Entry> = Vec::new();
        let mut max_chunk_size: u64 = 0;

        loop {
            // Earliest next block wins; ties go to the lower stream
            // index via the strict comparison.
            let mut pick: Option<(usize, Rational)> = None;
            for (i, st) in states.iter().enumerate() {
                if st.next_block >= st.block_count {
                    continue;
                }
                let start = st.stream.block_info(st.next_block).start_time;
                let time = st.time_coef.mul_int(start);
                let earlier = match pick {
                    Some((_, best)) => time < best,
                    None => true,
                };
                if earlier {
                    pick = Some((i, time));
                }
            }

            let next = pick.map(|(i, _)| {
                let info = states[i].stream.block_info(states[i].next_block);
                let padded = u64::from(info.size) + u64::from(info.size & 1);
                (i, info, 8 + padded)
            });

            let (max_size, max_blocks) = if segment_index == 0 {
                (self.config.max_riff_size, self.config.max_riff_blocks)
            } else {
                (self.config.max_avix_riff_size, self.config.max_avix_riff_blocks)
            };
            let close = match &next {
                None => true,
                Some((_, _, chunk_total)) => {
                    !initialize_riff
                        && self.config.write_odml
                        && (segment_blocks >= u64::from(max_blocks)
                            || size_count + chunk_total >= max_size)
                }
            };

            if close {
                Self::close_segment(&mut states, &current_movi, self.config.write_odml);
                if segment_index == 0 {
                    if let Some(chunk) = &idx1_chunk {
                        let body = idx1_to_bytes(&idx1_entries);
                        chunk.set_content(Rc::new(MemorySource::from_vec(body)));
                    }
                    // Last appended primary block's index plus one,
                    // matching what reference encoders write.
                    avih_buffer.patch_u32_le(
                        MainAviHeader::TOTAL_FRAMES_OFFSET,
                        states[primary_index].next_block as u32 + 1,
                    );
                }
                log::debug!(
                    "closed segment {} after {} blocks, {} bytes",
                    segment_index,
                    segment_blocks,
                    size_count
                );
                if let Some(observer) = self.observer.as_mut() {
                    observer.on_segment_closed(&current_riff, segment_index != 0);
                }
                if next.is_none() {
                    break;
                }

                let avix = RiffList::new(tags::RIFF, tags::AVIX);
                let new_movi = RiffList::new(tags::LIST, tags::MOVI);
                avix.add_child(new_movi.clone());
                root.add_child(avix.clone());
                current_riff = avix;
                current_movi = new_movi;
                size_count = current_riff.size();
                segment_blocks = 0;
                segment_index += 1;
                initialize_riff = true;
            }

            let Some((i, info, chunk_total)) = next else {
                break;
            };

            let st = &mut states[i];
            let mut data = st.stream.block_data(st.next_block)?;
            if st.stream.cache_block_data() {
                if let Some(cache) = &self.cache {
                    data = Rc::new(CachedSource::new(Rc::clone(cache), data));
                }
            }
            // The new chunk lands exactly at the movi list's current
            // end; that relative position stays valid even though the
            // header lists above may still grow.
            let rel = current_movi.size();
            current_movi.add_child(RiffChunk::new(st.data_tag, data));

            st.entries.push(StdIndexEntry {
                offset: (rel + 8) as u32,
                size: (chunk_total - 8) as u32,
            });
            if segment_index == 0 && self.config.write_idx1 {
                idx1_entries.push(Idx1Entry {
                    chunk_id: st.data_tag,
                    flags: info.index_flags,
                    offset: (rel - 8) as u32,
                    size: (chunk_total - 8) as u32,
                });
            }
            st.segment_duration += info.duration;
            // Buffer-size statistics count framed chunk bytes, not raw
            // block data.
            st.max_block_size = st.max_block_size.max((chunk_total - 8) as u32);
            st.window_sizes.push_back(chunk_total);
            st.window_bytes += chunk_total;
            if st.window_sizes.len() > st.window_limit {
                if let Some(old) = st.window_sizes.pop_front() {
                    st.window_bytes -= old;
                }
            }
            st.max_window_bytes = st.max_window_bytes.max(st.window_bytes);
            st.next_block += 1;

            max_chunk_size = max_chunk_size.max(chunk_total);
            size_count += chunk_total;
            segment_blocks += 1;
            initialize_riff = false;
        }

        // Super indices: one entry per segment each stream appeared in.
        // Filling the indx placeholders grows the header lists, so this
        // must precede every absolute-offset computation.
        for st in &mut states {
            if let Some(super_chunk) = &st.super_chunk {
                let entries = st
                    .segments
                    .iter()
                    .map(|seg| SuperIndexEntry {
                        offset: 0,
                        size: seg.index_chunk.size() as u32,
                        duration: seg.duration as u32,
                    })
                    .collect();
                let body = SuperIndex {
                    chunk_id: st.data_tag,
                    entries,
                }
                .to_bytes();
                let buffer = MemorySource::from_vec(body);
                super_chunk.set_content(Rc::new(buffer.clone()));
                st.super_buffer = Some(buffer);
            }
        }
        if let Some(buffer) = &dmlh_buffer {
            buffer.patch_u32_le(0, states[primary_index].next_block as u32);
        }

        // Offset fixup: every chunk now has final content, so absolute
        // offsets are stable.
        for st in &states {
            for (k, seg) in st.segments.iter().enumerate() {
                seg.index_buffer
                    .patch_u64_le(StdIndex::BASE_OFFSET_OFFSET, seg.movi.offset());
                if let Some(buffer) = &st.super_buffer {
                    buffer.patch_u64_le(
                        SuperIndex::entry_offset_offset(k),
                        seg.index_chunk.offset(),
                    );
                }
            }
        }

        // Header fixup from observed block statistics.
        for st in &states {
            if st.stream.wants_buffer_size_patch() {
                st.header_buffer
                    .patch_u32_le(StreamHeader::SUGGESTED_BUFFER_SIZE_OFFSET, st.max_block_size);
            }
        }
        avih_buffer.patch_u32_le(
            MainAviHeader::SUGGESTED_BUFFER_SIZE_OFFSET,
            max_chunk_size.min(u64::from(u32::MAX)) as u32,
        );
        let max_bytes_per_sec: u64 = states.iter().map(|st| st.max_window_bytes).sum();
        avih_buffer.patch_u32_le(
            MainAviHeader::MAX_BYTES_PER_SEC_OFFSET,
            max_bytes_per_sec.min(u64::from(u32::MAX)) as u32,
        );

        root.finalize()?;
        if let Some(observer) = self.observer.as_mut() {
            observer.on_finalized();
        }
        let output = root.source()?;
        log::info!("AVI build complete, {} bytes", output.len());
        Ok(output)
    }

    fn validate(&self) -> Result<usize> {
        let primary = self
            .primary
            .ok_or_else(|| Error::config("no primary video stream designated"))?;
        if self.streams.len() >= 100 {
            return Err(Error::validation(format!(
                "{} streams exceed the two-digit stream id space",
                self.streams.len()
            )));
        }
        for (i, stream) in self.streams.iter().enumerate() {
            let header = stream.stream_header();
            if header.rate == 0 || header.scale == 0 {
                return Err(Error::validation(format!(
                    "stream {} has a zero rate or scale",
                    i
                )));
            }
        }
        Ok(primary)
    }

    /// Emit each stream's standard index for the closing segment into
    /// its movi list. Every stream gets one, empty entry tables
    /// included, so each super index holds one entry per segment.
    /// Entry offsets were recorded relative to the movi list at append
    /// time; only the base-offset field waits for the final fixup pass.
    fn close_segment(states: &mut [StreamState], movi: &Rc<RiffList>, write_odml: bool) {
        for (i, st) in states.iter_mut().enumerate() {
            if write_odml {
                let body = StdIndex {
                    chunk_id: st.data_tag,
                    entries: std::mem::take(&mut st.entries),
                }
                .to_bytes();
                let buffer = MemorySource::from_vec(body);
                let chunk =
                    RiffChunk::new(FourCc::stream_index_chunk(i), Rc::new(buffer.clone()));
                movi.add_child(chunk.clone());
                st.segments.push(SegmentRecord {
                    movi: Rc::clone(movi),
                    index_chunk: chunk,
                    index_buffer: buffer,
                    duration: st.segment_duration,
                });
            }
            st.entries.clear();
            st.segment_duration = 0;
        }
    }
}
