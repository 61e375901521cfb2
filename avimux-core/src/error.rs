//! Error types shared across the avimux crates.

use thiserror::Error;

/// Result type alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assembling an AVI file.
///
/// Every error is terminal for the current build: there are no retry
/// paths anywhere in this core, and no partial output is ever produced.
#[derive(Error, Debug)]
pub enum Error {
    /// Builder configuration error (missing or duplicate primary stream).
    #[error("configuration error: {0}")]
    Config(String),

    /// Stream validation error (too many streams, zero rate/scale).
    #[error("validation error: {0}")]
    Validation(String),

    /// A chunk's content does not fit the 32-bit RIFF size field.
    #[error("chunk content of {size} bytes exceeds the 32-bit size field")]
    ChunkTooLarge { size: u64 },

    /// A list's content does not fit the 32-bit RIFF size field.
    #[error("list content of {size} bytes exceeds the 32-bit size field")]
    ListTooLarge { size: u64 },

    /// A single cache item is larger than the whole cache.
    #[error("cache item of {size} bytes exceeds cache capacity of {capacity} bytes")]
    CacheItemTooLarge { size: usize, capacity: usize },

    /// A read window lies outside a source's bounds.
    #[error("read of {len} bytes at offset {offset} is outside a source of {size} bytes")]
    ReadOutOfBounds { offset: u64, len: usize, size: u64 },

    /// A partial-source window does not fit the inner source.
    #[error("window of {len} bytes at offset {offset} exceeds inner source of {size} bytes")]
    WindowOutOfRange { offset: u64, len: u64, size: u64 },

    /// A node's source was requested before `finalize` ran.
    #[error("node source requested before finalize")]
    NotFinalized,
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
