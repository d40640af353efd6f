//! Debug-only exclusive-access guard.
//!
//! Index operations call back into user code only through `K: Eq` and
//! `K: Hash` while probing chains. If such a callback reaches back into
//! the same index, chains and positions may be half-updated. In debug
//! builds every guarded operation records its name and a nested entry
//! panics naming both operations; release builds compile this away.

use core::cell::Cell;
use core::marker::PhantomData;

#[derive(Debug)]
pub(crate) struct Exclusive {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
    // Single-threaded structure: keep the owner !Send + !Sync.
    _local: PhantomData<*mut ()>,
}

impl Exclusive {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _local: PhantomData,
        }
    }

    /// Mark `op` as running until the returned guard is dropped.
    #[inline]
    pub(crate) fn enter(&self, op: &'static str) -> Held<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(running) = self.active.get() {
                panic!("reentrant call to `{op}` while `{running}` is in progress");
            }
            self.active.set(Some(op));
            return Held { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            return Held { _z: PhantomData };
        }
    }
}

impl Default for Exclusive {
    fn default() -> Self {
        Self::new()
    }
}

// Clones get their own idle guard.
impl Clone for Exclusive {
    fn clone(&self) -> Self {
        Self::new()
    }
}

pub(crate) struct Held<'a> {
    #[cfg(debug_assertions)]
    owner: &'a Exclusive,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.active.set(None);
    }
}
