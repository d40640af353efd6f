//! Error type shared by every layer of the crate.
//!
//! Only usage mistakes are reported through `Error`. Broken internal
//! invariants (an entry whose position no longer matches its key column,
//! a secondary index longer than the primary, a frame slot with neither a
//! parent nor a child side) panic instead, since they mean the structure
//! itself is corrupt.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Initial table capacity must be at least one bucket.
    #[error("invalid capacity {0}: a table needs at least one bucket")]
    InvalidCapacity(usize),

    /// Load factor must lie strictly between zero and one.
    #[error("invalid load factor {0}: expected 0 < load < 1")]
    InvalidLoadFactor(f32),

    /// The reserved "no key" value cannot be stored.
    #[error("nil key cannot be stored")]
    NilKey,

    /// Positional access outside the live range.
    #[error("position {pos} out of bounds for length {len}")]
    OutOfBounds { pos: usize, len: usize },

    /// Unknown secondary index selector.
    #[error("no index {0}")]
    NoSuchIndex(usize),

    /// Unknown value column selector.
    #[error("no value column {0}")]
    NoSuchColumn(usize),

    /// A caller-chosen position already holds another entry.
    #[error("position {pos} already holds an entry")]
    SlotOccupied { pos: usize },

    /// Attaching the parent would make a frame inherit from itself.
    #[error("a frame cannot be its own ancestor")]
    CyclicParent,
}
