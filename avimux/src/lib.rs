//! AVI/OpenDML container writer.
//!
//! Builds a byte-exact AVI file from a set of media streams without
//! materializing the output in memory. Files past the classic 1 GiB
//! limit are split into OpenDML AVIX continuation segments with
//! two-level (super/standard) indices; the legacy flat `idx1` index is
//! emitted alongside for older players.
//!
//! Implement [`AviStream`] for each media source, feed the streams to
//! an [`AviBuilder`], and drain the returned
//! [`Source`](avimux_core::Source) with bounded reads:
//!
//! ```no_run
//! # use std::rc::Rc;
//! # use avimux::{AviBuilder, AviStream, BuilderConfig};
//! # fn my_streams() -> Vec<Rc<dyn AviStream>> { unimplemented!() }
//! let mut builder = AviBuilder::new(BuilderConfig::default());
//! for (i, stream) in my_streams().into_iter().enumerate() {
//!     builder.add_stream(stream, i == 0)?;
//! }
//! let output = builder.build()?;
//! # Ok::<(), avimux::Error>(())
//! ```
//!
//! Construction is single-threaded and one-shot; every error is
//! terminal for the build and the caller never sees partial output.

pub mod builder;
pub mod fourcc;
pub mod layout;
pub mod riff;
pub mod stream;

pub use avimux_core::{CacheStore, Error, Rational, Result, SharedSource, Source};
pub use builder::{AviBuilder, BuildObserver, BuilderConfig, DEFAULT_MAX_RIFF_SIZE};
pub use fourcc::FourCc;
pub use stream::{AviStream, BlockInfo};
