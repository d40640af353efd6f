//! Frame overlay: a child [`Hasharray`] layered over a shared parent.
//!
//! The merged view lists the parent's entries in parent order, each
//! possibly overridden in place by a child row linked to it, followed by
//! the child rows that override nothing, in child order. The mapping
//! from merged positions to parent and child positions is a
//! [`FrameList`]; it is cached, dropped by every mutation and rebuilt in
//! full on the next read.
//!
//! A child row declares its parent link in secondary index [`LINK`] of
//! the child map: the link is a key of the parent's merged view. When the
//! parent shows that key more than once, the row takes the first
//! occurrence not already claimed. Rows created by [`FrameMap::set_value`]
//! are also pinned to the exact parent slot they were written through.

use crate::entry::EntryKey;
use crate::error::{Error, Result};
use crate::hasharray::Hasharray;
use crate::hashing::{KeyHashing, ObjectHashing};
use crate::options::Options;
use core::borrow::Borrow;
use core::cell::OnceCell;
use core::fmt;
use slotmap::SecondaryMap;
use std::rc::Rc;

/// Selector of the child index holding parent links.
pub const LINK: usize = 1;

/// Where one merged position is satisfied from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Slot {
    pub parent: Option<usize>,
    pub child: Option<usize>,
}

impl Slot {
    /// Child row shadowing a parent entry.
    pub fn is_override(&self) -> bool {
        self.parent.is_some() && self.child.is_some()
    }
}

/// Merged position space of one frame.
#[derive(Clone, Debug, Default)]
pub struct FrameList {
    slots: Vec<Slot>,
    from_child: Vec<Option<usize>>,
    overrides: usize,
    collisions: usize,
}

impl FrameList {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, pos: usize) -> Option<Slot> {
        self.slots.get(pos).copied()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Merged position of child row `child`.
    pub fn slot_of_child(&self, child: usize) -> Option<usize> {
        self.from_child.get(child).copied().flatten()
    }

    /// Child rows that took over a parent slot.
    pub fn overrides(&self) -> usize {
        self.overrides
    }

    /// Linked child rows whose parent slot was already taken.
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// Parent slot not yet overridden by a child row.
    fn is_free(&self, pos: usize) -> bool {
        matches!(self.slots.get(pos), Some(Slot { parent: Some(_), child: None }))
    }

    fn claim(&mut self, pos: usize, child: usize) {
        self.slots[pos].child = Some(child);
        self.from_child[child] = Some(pos);
        self.overrides += 1;
    }

    fn add(&mut self, child: usize) {
        self.from_child[child] = Some(self.slots.len());
        self.slots.push(Slot {
            parent: None,
            child: Some(child),
        });
    }

    fn traced(self) -> Self {
        tracing::trace!(
            slots = self.slots.len(),
            overrides = self.overrides,
            collisions = self.collisions,
            "rebuilt frame list"
        );
        self
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FrameState {
    /// Never had a parent attached.
    Fresh,
    /// The merged view must be rebuilt before use.
    Stale,
    /// The cached merged view is current.
    Valid,
}

#[derive(Clone)]
pub struct FrameMap<K, V, H = ObjectHashing> {
    child: Hasharray<K, V, H>,
    parent: Option<Rc<FrameMap<K, V, H>>>,
    linked: bool,
    /// Child rows bound to one parent slot, by primary entry.
    pins: SecondaryMap<EntryKey, usize>,
    list: OnceCell<FrameList>,
}

impl<K, V, H: Default + Clone> FrameMap<K, V, H> {
    pub fn new() -> Self {
        Self::from_child(Hasharray::new())
    }

    pub fn with_options(options: Options) -> Result<Self> {
        Ok(Self::from_child(Hasharray::with_options(options)?))
    }
}

impl<K, V, H: Default + Clone> Default for FrameMap<K, V, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> FrameMap<K, V, H> {
    fn from_child(mut child: Hasharray<K, V, H>) -> Self
    where
        H: Clone,
    {
        let link = child.add_index();
        debug_assert_eq!(link, LINK);
        Self {
            child,
            parent: None,
            linked: false,
            pins: SecondaryMap::new(),
            list: OnceCell::new(),
        }
    }

    pub fn state(&self) -> FrameState {
        if !self.linked {
            FrameState::Fresh
        } else if self.list.get().is_some() {
            FrameState::Valid
        } else {
            FrameState::Stale
        }
    }

    /// Drop the cached merged view.
    pub fn invalidate(&mut self) {
        self.list.take();
    }

    pub fn child(&self) -> &Hasharray<K, V, H> {
        &self.child
    }

    /// Direct access to the child map; the merged view is rebuilt afterwards.
    pub fn child_mut(&mut self) -> &mut Hasharray<K, V, H> {
        self.invalidate();
        &mut self.child
    }

    pub fn parent(&self) -> Option<&Rc<FrameMap<K, V, H>>> {
        self.parent.as_ref()
    }

    /// Attach `parent`, replacing any previous one.
    ///
    /// Fails with [`Error::CyclicParent`] if `parent` is this frame or has
    /// it among its ancestors.
    pub fn set_parent(&mut self, parent: Rc<FrameMap<K, V, H>>) -> Result<()> {
        let mut depth = 0usize;
        let mut cur: Option<&FrameMap<K, V, H>> = Some(&*parent);
        while let Some(f) = cur {
            if core::ptr::eq(f, self) {
                return Err(Error::CyclicParent);
            }
            depth += 1;
            cur = f.parent.as_deref();
        }
        tracing::trace!(depth, "attached frame parent");
        self.parent = Some(parent);
        self.linked = true;
        self.pins.clear();
        self.invalidate();
        Ok(())
    }

    pub fn detach_parent(&mut self) -> Option<Rc<FrameMap<K, V, H>>> {
        let old = self.parent.take();
        if old.is_some() {
            tracing::trace!("detached frame parent");
            self.pins.clear();
            self.invalidate();
        }
        old
    }

    /// Parent link declared by child row `child`.
    pub fn link(&self, child: usize) -> Option<&K> {
        self.child.key_in(LINK, child)
    }
}

impl<K, V, H> FrameMap<K, V, H>
where
    K: Eq,
    H: KeyHashing<K>,
{
    /// Merged view, rebuilt if stale.
    pub fn frame_list(&self) -> &FrameList {
        self.list.get_or_init(|| self.build())
    }

    /// Rebuild the merged view now.
    pub fn frame_init(&mut self) -> &FrameList {
        self.invalidate();
        self.frame_list()
    }

    fn build(&self) -> FrameList {
        let parent_len = self.parent.as_ref().map_or(0, |p| p.len());
        let mut list = FrameList {
            slots: (0..parent_len)
                .map(|p| Slot {
                    parent: Some(p),
                    child: None,
                })
                .collect(),
            from_child: vec![None; self.child.len()],
            overrides: 0,
            collisions: 0,
        };
        let Some(parent) = &self.parent else {
            for c in 0..self.child.len() {
                list.add(c);
            }
            return list.traced();
        };
        // Pinned rows first, so key links cannot take their slots.
        for c in 0..self.child.len() {
            let pinned = self.child.row_key(c).and_then(|k| self.pins.get(k)).copied();
            if let (Some(p), Some(link)) = (pinned, self.link(c)) {
                if parent.key(p) == Some(link) && list.is_free(p) {
                    list.claim(p, c);
                }
            }
        }
        for c in 0..self.child.len() {
            if list.from_child[c].is_some() {
                continue;
            }
            let candidates = match self.link(c) {
                Some(link) => parent.positions_of(link),
                None => Vec::new(),
            };
            match candidates.iter().copied().find(|&p| list.is_free(p)) {
                Some(p) => list.claim(p, c),
                None => {
                    if !candidates.is_empty() {
                        list.collisions += 1;
                    }
                    list.add(c);
                }
            }
        }
        list.traced()
    }

    /// Every merged position at which `q` is visible, ascending.
    pub fn positions_of<Q>(&self, q: &Q) -> Vec<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        let list = self.frame_list();
        let mut found: Vec<usize> = self
            .child
            .lookup_list(q)
            .into_iter()
            .filter_map(|c| list.slot_of_child(c))
            .collect();
        if let Some(parent) = &self.parent {
            found.extend(
                parent
                    .positions_of(q)
                    .into_iter()
                    .filter(|&p| list.is_free(p)),
            );
        }
        found.sort_unstable();
        found
    }

    pub fn len(&self) -> usize {
        self.frame_list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn slot(&self, pos: usize) -> Option<Slot> {
        self.frame_list().slot(pos)
    }

    pub fn is_override(&self, pos: usize) -> bool {
        self.slot(pos).is_some_and(|s| s.is_override())
    }

    /// Key and value visible at merged position `pos`.
    pub fn entry(&self, pos: usize) -> Option<(&K, &V)> {
        let slot = self.slot(pos)?;
        let resolved = match (slot.child, slot.parent, &self.parent) {
            (Some(c), _, _) => self.child.key(c).zip(self.child.value(c)),
            (None, Some(p), Some(parent)) => parent.entry(p),
            _ => None,
        };
        match resolved {
            Some(kv) => Some(kv),
            None => panic!("frame slot {pos} resolves to no entry"),
        }
    }

    pub fn key(&self, pos: usize) -> Option<&K> {
        self.entry(pos).map(|(k, _)| k)
    }

    pub fn value(&self, pos: usize) -> Option<&V> {
        self.entry(pos).map(|(_, v)| v)
    }

    /// Merged position at which `q` is visible.
    ///
    /// A child row wins; a parent entry counts only while no child row
    /// overrides its slot.
    pub fn index_of<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        let list = self.frame_list();
        if let Some(c) = self.child.lookup(q) {
            return list.slot_of_child(c);
        }
        self.parent
            .as_ref()?
            .positions_of(q)
            .into_iter()
            .find(|&p| list.is_free(p))
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        self.value(self.index_of(q)?)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        self.index_of(q).is_some()
    }

    /// Merged entries in merged order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        (0..self.len()).filter_map(move |pos| self.entry(pos))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// True if the attached parent currently exposes `key`.
    fn parent_exposes(&self, key: &K) -> bool {
        self.parent
            .as_ref()
            .is_some_and(|p| p.contains_key(key))
    }

    /// Put into the child; a new key the parent exposes overrides it.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>>
    where
        K: Clone,
    {
        self.invalidate();
        let link = self.parent_exposes(&key).then(|| key.clone());
        let (pos, old) = self.child.put_full(key, value)?;
        if old.is_none() {
            if let Some(link) = link {
                self.child.index_key(LINK, pos, link)?;
            }
        }
        Ok(old)
    }

    /// Put into the child, linking the row to parent key `link`.
    pub fn put_linked(&mut self, key: K, value: V, link: K) -> Result<Option<V>> {
        self.invalidate();
        let (pos, old) = self.child.put_full(key, value)?;
        self.unpin(pos);
        self.child.index_key(LINK, pos, link)?;
        Ok(old)
    }

    fn unpin(&mut self, child: usize) {
        if let Some(k) = self.child.row_key(child) {
            self.pins.remove(k);
        }
    }

    /// Insert at child position `pos`; see [`Hasharray::insert`].
    pub fn insert(&mut self, pos: usize, key: K, value: V) -> Result<()>
    where
        K: Clone,
    {
        self.invalidate();
        let link = self.parent_exposes(&key).then(|| key.clone());
        let placed = self.child.insert(pos, key, value)?;
        if let (true, Some(link)) = (placed.is_new(), link) {
            self.child.index_key(LINK, placed.position(), link)?;
        }
        Ok(())
    }

    /// Drop the parent link of child row `child`; the row becomes an addition.
    pub fn unlink(&mut self, child: usize) -> Result<Option<K>> {
        self.invalidate();
        self.unpin(child);
        self.child.unindex_key(LINK, child)
    }

    /// Remove `q` from the child. A parent entry it overrode shows through again.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        self.invalidate();
        self.child.remove(q)
    }

    /// Overwrite the value at merged position `pos`.
    ///
    /// A slot served only by the parent gets a new overriding child row,
    /// pinned to that slot; the parent is never written.
    pub fn set_value(&mut self, pos: usize, value: V) -> Result<Option<V>>
    where
        K: Clone,
    {
        let len = self.len();
        let slot = self.slot(pos).ok_or(Error::OutOfBounds { pos, len })?;
        self.invalidate();
        if let Some(c) = slot.child {
            return self.child.set_value(c, value).map(Some);
        }
        let key = match self.parent.as_ref().zip(slot.parent) {
            Some((parent, p)) => parent.key(p).cloned(),
            None => None,
        };
        let key = match key {
            Some(k) => k,
            None => panic!("frame slot {pos} resolves to no entry"),
        };
        let c = self.child.append(key.clone(), value)?;
        self.child.index_key(LINK, c, key)?;
        if let (Some(k), Some(p)) = (self.child.row_key(c), slot.parent) {
            self.pins.insert(k, p);
        }
        Ok(None)
    }
}

impl<K, V, H> fmt::Debug for FrameMap<K, V, H>
where
    K: Eq + fmt::Debug,
    V: fmt::Debug,
    H: KeyHashing<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
