//! Chain nodes of an [`Index`](crate::Index).

slotmap::new_key_type! {
    /// Arena key of an [`Entry`]; chains link through these.
    pub(crate) struct EntryKey;
}

/// One stored key occurrence.
///
/// `aryix` is the position of the key in the index's key column and of
/// its row in every value column. Every structural mutation keeps it in
/// step. `next` is the only link to the following node of the chain, so
/// an entry belongs to exactly one chain at a time.
#[derive(Clone, Debug)]
pub(crate) struct Entry {
    pub(crate) hash: u64,
    pub(crate) aryix: usize,
    pub(crate) next: Option<EntryKey>,
}

impl Entry {
    pub(crate) fn new(hash: u64, aryix: usize, next: Option<EntryKey>) -> Self {
        Self { hash, aryix, next }
    }
}

/// Where an index placed a key.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Placement {
    /// A new entry was created at this position.
    Created(usize),
    /// The key was already present at this position; only its stored key was refreshed.
    Existing(usize),
}

impl Placement {
    pub fn position(self) -> usize {
        match self {
            Placement::Created(p) | Placement::Existing(p) => p,
        }
    }

    pub fn is_new(self) -> bool {
        matches!(self, Placement::Created(_))
    }
}
