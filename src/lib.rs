//! hasharray: an insertion-ordered associative array with positional
//! access, parallel value columns, secondary indices and parent/child
//! frame overlays.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a map whose entries also have a dense position (0..len) that
//!   survives lookups, and which can carry several indices and value
//!   columns over the same rows.
//! - Layers:
//!   - Values<T>: growable, position-addressed column; grows by a fixed
//!     increment and closes gaps on removal.
//!   - Index<K, H>: separate-chaining hash table over a key column. Each
//!     chain node (`Entry`) records the position of its key; that
//!     position is the only link between a key and its row.
//!   - Hasharray<K, V, H>: primary index + primary value column, plus any
//!     number of sparse secondary indices and optional value columns, all
//!     kept in lock-step by position.
//!   - FrameMap<K, V, H>: a child Hasharray layered over a shared parent
//!     frame; its merged view (`FrameList`) is rebuilt lazily after every
//!     mutation.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (no atomics, no locks).
//! - Positions are dense in the primary: removing a row shifts every
//!   later row down by one in every index and column.
//! - Keys may occur more than once (`append`); `put` is find-or-create.
//!   Lookups return the most recently created occurrence.
//! - Integer maps reserve [`NIL`] as "no key"; it is never stored.
//!
//! Hashing
//! - Object keys hash through a deterministic FNV-1a hasher masked to 63
//!   bits; integer keys hash to themselves (low 31 bits). Each entry
//!   stores its hash, so rehashing never calls `K: Hash`.
//! - Capacity is always odd; the table grows when the entry count reaches
//!   `floor(capacity * load_factor)`.
//!
//! Reentrancy policy
//! - Index methods take a debug-only guard on entry. They call user code
//!   only through `K: Eq` / `K: Hash` while probing; re-entering the same
//!   index from there panics in debug builds.
//!
//! Failure modes
//! - Misuse (nil keys, out-of-range positions, unknown selectors, cyclic
//!   frame parents, invalid options) returns [`Error`].
//! - Internal inconsistencies (a column out of step with its index, a
//!   chain that lost an entry) panic; continuing would corrupt data.
//! - Not found is `None`.
//!
//! Notes and non-goals
//! - No thread safety and no persistence format beyond the optional
//!   `serde` feature.
//! - Frames share parents through `Rc`; a parent is read-only while any
//!   child holds it.

mod entry;
pub mod error;
pub mod frame;
mod guard;
pub mod hasharray;
pub mod hashing;
pub mod index;
mod index_proptest;
pub mod options;
#[cfg(feature = "serde")]
mod serde_impls;
pub mod values;

// Public surface
pub use entry::Placement;
pub use error::{Error, Result};
pub use frame::{FrameList, FrameMap, FrameState, Slot, LINK};
pub use hasharray::{Hasharray, Iter, LongMap, ObjectMap, PRIMARY};
pub use hashing::{IntHashing, KeyHashing, ObjectHashing, StableHasher, StableState, NIL};
pub use index::{Index, LongIndex, ObjectIndex};
pub use options::Options;
pub use values::{
    BooleanValues, ByteValues, CharValues, DoubleValues, FloatValues, IntValues, LongValues,
    ObjectValues, ShortValues, Values,
};
