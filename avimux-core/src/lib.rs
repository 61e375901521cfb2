//! Core building blocks for the avimux AVI writer.
//!
//! This crate provides the domain-independent pieces the container
//! layer is assembled from:
//!
//! - [`source`] — lazy, composable, randomly-readable byte ranges
//! - [`cache`] — a bounded LRU store for decoded block buffers
//! - [`rational`] — exact rational arithmetic for time ordering
//! - [`error`] — the shared error type
//!
//! Everything here is single-threaded by design; shared state uses
//! `Rc`/`RefCell` rather than locks.

pub mod cache;
pub mod error;
pub mod rational;
pub mod source;

pub use cache::{CacheId, CacheStore};
pub use error::{Error, Result};
pub use rational::Rational;
pub use source::{
    CachedSource, ConcatenatedSource, MemorySource, NullSource, PartialSource, SharedSource,
    Source, SpanLen, SpanStart,
};
