//! Index: separate-chaining hash table over a positional key column.
//!
//! The table holds chain heads; chain nodes ([`Entry`]) live in a slot
//! arena and carry the position (`aryix`) of their key in `keys`. The
//! key column may contain holes (`None`) for positions that exist in the
//! position space but carry no key in this index; a primary index never
//! has holes, a secondary one usually does.
//!
//! New entries are linked at the head of their chain, so lookups find
//! the most recently created occurrence of a key first. Rehashing keeps
//! the relative order of nodes that share a bucket.

use crate::entry::{Entry, EntryKey, Placement};
use crate::error::{Error, Result};
use crate::guard::Exclusive;
use crate::hashing::{IntHashing, KeyHashing, ObjectHashing};
use crate::options::Options;
use crate::values::Values;
use core::borrow::Borrow;
use core::fmt;
use slotmap::SlotMap;

#[derive(Clone)]
pub struct Index<K, H = ObjectHashing> {
    hashing: H,
    options: Options,
    buckets: Buckets,
    keys: Values<Option<K>>,
    guard: Exclusive,
}

/// Index over arbitrary hashable keys.
pub type ObjectIndex<K> = Index<K, ObjectHashing>;
/// Index over `i64` keys with [`NIL`](crate::NIL) as the absent key.
pub type LongIndex = Index<i64, IntHashing>;

/// Chain heads and the entry arena.
///
/// Kept apart from the key column and the guard so guarded index methods
/// can restructure chains while the guard is held.
#[derive(Clone)]
struct Buckets {
    heads: Vec<Option<EntryKey>>,
    entries: SlotMap<EntryKey, Entry>,
    threshold: usize,
    rehashes: usize,
}

/// Walks one chain from its head.
struct Chain<'a> {
    entries: &'a SlotMap<EntryKey, Entry>,
    cur: Option<EntryKey>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = (EntryKey, &'a Entry);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cur?;
        let e = &self.entries[k];
        self.cur = e.next;
        Some((k, e))
    }
}

impl Buckets {
    fn new(capacity: usize, load_factor: f32) -> Self {
        Self {
            heads: vec![None; capacity],
            entries: SlotMap::with_key(),
            threshold: Options::threshold(capacity, load_factor),
            rehashes: 0,
        }
    }

    #[inline]
    fn bucket(&self, hash: u64) -> usize {
        (hash % self.heads.len() as u64) as usize
    }

    fn chain(&self, bucket: usize) -> Chain<'_> {
        Chain {
            entries: &self.entries,
            cur: self.heads[bucket],
        }
    }

    fn clear(&mut self) {
        self.heads.iter_mut().for_each(|head| *head = None);
        self.entries.clear();
    }

    fn grow(&mut self, options: &Options) {
        let from = self.heads.len();
        let to = options.next_capacity(from);
        let old = std::mem::replace(&mut self.heads, vec![None; to]);
        let mut tails: Vec<Option<EntryKey>> = vec![None; to];
        for head in old {
            let mut cur = head;
            while let Some(k) = cur {
                let e = &mut self.entries[k];
                cur = e.next.take();
                let b = (e.hash % to as u64) as usize;
                match tails[b] {
                    Some(t) => self.entries[t].next = Some(k),
                    None => self.heads[b] = Some(k),
                }
                tails[b] = Some(k);
            }
        }
        self.threshold = Options::threshold(to, options.load_factor);
        self.rehashes += 1;
        tracing::debug!(
            from,
            to,
            count = self.entries.len(),
            threshold = self.threshold,
            "rehashed index"
        );
    }

    /// Create an entry for `pos` at the head of its chain, growing first if due.
    fn link_new(&mut self, hash: u64, pos: usize, options: &Options) -> EntryKey {
        if self.entries.len() >= self.threshold {
            self.grow(options);
        }
        let b = self.bucket(hash);
        let k = self.entries.insert(Entry::new(hash, pos, self.heads[b]));
        self.heads[b] = Some(k);
        k
    }

    /// Detach `k` from its chain without freeing it.
    fn unlink(&mut self, k: EntryKey) {
        let b = self.bucket(self.entries[k].hash);
        let next = self.entries[k].next.take();
        if self.heads[b] == Some(k) {
            self.heads[b] = next;
            return;
        }
        let prev = self
            .chain(b)
            .find(|(_, e)| e.next == Some(k))
            .map(|(p, _)| p);
        match prev {
            Some(p) => self.entries[p].next = next,
            None => panic!("index corrupted: entry missing from its chain"),
        }
    }

    /// Give `k` a new hash, moving it to another chain only when the bucket changes.
    fn rehome(&mut self, k: EntryKey, hash: u64) {
        let old_bucket = self.bucket(self.entries[k].hash);
        let new_bucket = self.bucket(hash);
        if old_bucket != new_bucket {
            self.unlink(k);
            self.entries[k].next = self.heads[new_bucket];
            self.heads[new_bucket] = Some(k);
        }
        self.entries[k].hash = hash;
    }

    fn free(&mut self, k: EntryKey) {
        self.unlink(k);
        self.entries.remove(k);
    }

    fn shift_up(&mut self, from: usize) {
        for e in self.entries.values_mut() {
            if e.aryix >= from {
                e.aryix += 1;
            }
        }
    }

    fn shift_down(&mut self, removed: usize) {
        for e in self.entries.values_mut() {
            if e.aryix > removed {
                e.aryix -= 1;
            }
        }
    }
}

impl<K, H: Default> Index<K, H> {
    pub fn new() -> Self {
        Self::build(Options::default(), H::default())
    }

    pub fn with_options(options: Options) -> Result<Self> {
        Self::with_options_and_hashing(options, H::default())
    }
}

impl<K, H: Default> Default for Index<K, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, H> Index<K, H> {
    pub fn with_options_and_hashing(options: Options, hashing: H) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(options, hashing))
    }

    fn build(options: Options, hashing: H) -> Self {
        Self {
            hashing,
            options,
            buckets: Buckets::new(Options::odd(options.capacity), options.load_factor),
            keys: Values::with_increment(options.column_increment),
            guard: Exclusive::new(),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.buckets.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.entries.is_empty()
    }

    /// Length of the position space, holes included.
    pub fn positions(&self) -> usize {
        self.keys.len()
    }

    /// Number of buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.heads.len()
    }

    /// Entry count at which the next insertion rehashes.
    pub fn threshold(&self) -> usize {
        self.buckets.threshold
    }

    /// How many times the table has grown.
    pub fn rehash_count(&self) -> usize {
        self.buckets.rehashes
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Key at `pos`, or `None` for holes and positions past the end.
    pub fn key(&self, pos: usize) -> Option<&K> {
        self.keys.get(pos).and_then(Option::as_ref)
    }

    /// Present keys with their positions, in position order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &K)> + '_ {
        self.keys
            .iter()
            .enumerate()
            .filter_map(|(pos, k)| k.as_ref().map(|k| (pos, k)))
    }

    /// Empty index sharing this one's options and hashing.
    pub(crate) fn sibling(&self) -> Self
    where
        H: Clone,
    {
        Self::build(self.options, self.hashing.clone())
    }

    /// Raw key column, holes included.
    pub(crate) fn key_slots(&self) -> &[Option<K>] {
        self.keys.as_slice()
    }

    /// Empty every chain and the key column; capacity is kept.
    pub fn clear(&mut self) {
        let _g = self.guard.enter("clear");
        self.buckets.clear();
        self.keys.clear();
    }

    /// Grow the table by the configured increment and re-bucket every entry.
    pub fn rehash(&mut self) {
        let _g = self.guard.enter("rehash");
        self.buckets.grow(&self.options);
    }

    /// Open a hole at `pos`, shifting later positions up. Used to keep a
    /// secondary index aligned when a row is inserted into the primary.
    pub(crate) fn insert_hole(&mut self, pos: usize) {
        let _g = self.guard.enter("insert_hole");
        if pos > self.keys.len() {
            return;
        }
        self.buckets.shift_up(pos);
        // pos <= len, cannot fail
        let _ = self.keys.insert(pos, None);
    }
}

impl<K, H> Index<K, H>
where
    K: Eq,
{
    fn matches<Q>(&self, pos: usize, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        matches!(self.keys.get(pos), Some(Some(k)) if k.borrow() == q)
    }

    /// First entry in chain order holding `q` whose position passes `keep`.
    fn find_where<Q>(&self, hash: u64, q: &Q, keep: impl Fn(usize) -> bool) -> Option<EntryKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.buckets
            .chain(self.buckets.bucket(hash))
            .find(|(_, e)| e.hash == hash && keep(e.aryix) && self.matches(e.aryix, q))
            .map(|(k, _)| k)
    }

    fn find<Q>(&self, hash: u64, q: &Q) -> Option<EntryKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.find_where(hash, q, |_| true)
    }

    /// Position of the most recently created occurrence of `q`.
    pub fn lookup<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        let _g = self.guard.enter("lookup");
        if self.hashing.is_nil(q) {
            return None;
        }
        let hash = self.hashing.hash_key(q);
        self.find(hash, q).map(|k| self.buckets.entries[k].aryix)
    }

    /// First occurrence of `q` in chain order whose position is `>= from`.
    pub fn lookup_from<Q>(&self, q: &Q, from: usize) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        let _g = self.guard.enter("lookup_from");
        if self.hashing.is_nil(q) {
            return None;
        }
        let hash = self.hashing.hash_key(q);
        self.find_where(hash, q, |pos| pos >= from)
            .map(|k| self.buckets.entries[k].aryix)
    }

    /// Every position holding `q`, in chain order.
    pub fn lookup_list<Q>(&self, q: &Q) -> Vec<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        let _g = self.guard.enter("lookup_list");
        if self.hashing.is_nil(q) {
            return Vec::new();
        }
        let hash = self.hashing.hash_key(q);
        self.buckets
            .chain(self.buckets.bucket(hash))
            .filter(|(_, e)| e.hash == hash && self.matches(e.aryix, q))
            .map(|(_, e)| e.aryix)
            .collect()
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        self.lookup(q).is_some()
    }

    /// Remove the occurrence `lookup(q)` would find, closing its gap.
    pub fn remove_key<Q>(&mut self, q: &Q) -> Option<(usize, K)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        let _g = self.guard.enter("remove_key");
        if self.hashing.is_nil(q) {
            return None;
        }
        let hash = self.hashing.hash_key(q);
        let k = self.find(hash, q)?;
        let pos = self.buckets.entries[k].aryix;
        self.buckets.free(k);
        self.buckets.shift_down(pos);
        match self.keys.remove(pos) {
            Ok(Some(key)) => Some((pos, key)),
            _ => panic!("index corrupted: entry at {pos} has no key"),
        }
    }
}

impl<K, H> Index<K, H>
where
    K: Eq,
    H: KeyHashing<K>,
{
    fn hash_of(&self, key: &K) -> Result<u64> {
        if self.hashing.is_nil(key) {
            return Err(Error::NilKey);
        }
        Ok(self.hashing.hash_key(key))
    }

    /// Entry currently holding `pos`, if the position is not a hole.
    fn entry_at(&self, pos: usize) -> Option<EntryKey> {
        let key = self.key(pos)?;
        let hash = self.hashing.hash_key(key);
        let b = self.buckets.bucket(hash);
        match self.buckets.chain(b).find(|(_, e)| e.aryix == pos) {
            Some((k, _)) => Some(k),
            None => panic!("index corrupted: no entry for position {pos}"),
        }
    }

    /// Arena key of the entry at `pos`; stable while the entry lives,
    /// whatever shifts its position.
    pub(crate) fn entry_key(&self, pos: usize) -> Option<EntryKey> {
        let _g = self.guard.enter("entry_key");
        self.entry_at(pos)
    }

    /// Find-or-create `key`; new keys take the tail position.
    pub fn put(&mut self, key: K) -> Result<Placement> {
        let pos = self.keys.len();
        self.put_at(pos, key)
    }

    /// Find-or-create `key`; a new key is installed at `pos`.
    ///
    /// `pos` must be a hole or at/after the end of the key column; the
    /// gap up to `pos` is filled with holes.
    pub fn put_at(&mut self, pos: usize, key: K) -> Result<Placement> {
        let _g = self.guard.enter("put");
        let hash = self.hash_of(&key)?;
        if let Some(k) = self.find(hash, &key) {
            let at = self.buckets.entries[k].aryix;
            self.keys.set(at, Some(key))?;
            return Ok(Placement::Existing(at));
        }
        install(&mut self.buckets, &mut self.keys, &self.options, pos, hash, key)?;
        Ok(Placement::Created(pos))
    }

    /// Always create a fresh entry at the tail, even for a known key.
    pub fn append(&mut self, key: K) -> Result<usize> {
        let pos = self.keys.len();
        self.append_at(pos, key)
    }

    /// Always create a fresh entry at `pos` (a hole or past the end).
    pub fn append_at(&mut self, pos: usize, key: K) -> Result<usize> {
        let _g = self.guard.enter("append");
        let hash = self.hash_of(&key)?;
        install(&mut self.buckets, &mut self.keys, &self.options, pos, hash, key)?;
        Ok(pos)
    }

    /// Insert `key` at `pos`, shifting every later position up by one.
    ///
    /// If `key` already occurs at or before `pos`, that occurrence is
    /// refreshed instead and nothing moves; occurrences after `pos` do
    /// not count.
    pub fn insert(&mut self, pos: usize, key: K) -> Result<Placement> {
        let _g = self.guard.enter("insert");
        let len = self.keys.len();
        if pos > len {
            return Err(Error::OutOfBounds { pos, len });
        }
        let hash = self.hash_of(&key)?;
        if let Some(k) = self.find_where(hash, &key, |at| at <= pos) {
            let at = self.buckets.entries[k].aryix;
            self.keys.set(at, Some(key))?;
            return Ok(Placement::Existing(at));
        }
        self.buckets.shift_up(pos);
        self.buckets.link_new(hash, pos, &self.options);
        self.keys.insert(pos, Some(key))?;
        Ok(Placement::Created(pos))
    }

    /// Put `key` at an existing position, returning the key it displaced.
    ///
    /// The entry only moves to another chain when the bucket changes.
    pub fn replace(&mut self, pos: usize, key: K) -> Result<Option<K>> {
        let _g = self.guard.enter("replace");
        let len = self.keys.len();
        if pos >= len {
            return Err(Error::OutOfBounds { pos, len });
        }
        let hash = self.hash_of(&key)?;
        match self.entry_at(pos) {
            Some(k) => self.buckets.rehome(k, hash),
            None => {
                self.buckets.link_new(hash, pos, &self.options);
            }
        }
        Ok(self.keys.set(pos, Some(key))?.flatten())
    }

    /// Remove whatever sits at `pos` (entry or hole), closing the gap.
    pub fn remove_at(&mut self, pos: usize) -> Result<Option<K>> {
        let _g = self.guard.enter("remove_at");
        let len = self.keys.len();
        if pos >= len {
            return Err(Error::OutOfBounds { pos, len });
        }
        if let Some(k) = self.entry_at(pos) {
            self.buckets.free(k);
        }
        self.buckets.shift_down(pos);
        self.keys.remove(pos)
    }

    /// Drop the entry at `pos` but keep the position as a hole.
    pub fn vacate(&mut self, pos: usize) -> Result<Option<K>> {
        let _g = self.guard.enter("vacate");
        let len = self.keys.len();
        if pos >= len {
            return Err(Error::OutOfBounds { pos, len });
        }
        if let Some(k) = self.entry_at(pos) {
            self.buckets.free(k);
        }
        Ok(self.keys.set(pos, None)?.flatten())
    }

    /// Panic unless chains, positions and the key column agree.
    #[doc(hidden)]
    pub fn assert_consistent(&self) {
        let buckets = &self.buckets;
        let mut seen = vec![false; self.keys.len()];
        let mut linked = 0;
        for b in 0..buckets.heads.len() {
            for (_, e) in buckets.chain(b) {
                linked += 1;
                assert!(linked <= buckets.entries.len(), "chain cycle detected");
                assert_eq!(buckets.bucket(e.hash), b, "entry in wrong bucket");
                let key = self
                    .key(e.aryix)
                    .unwrap_or_else(|| panic!("entry points at hole {}", e.aryix));
                assert_eq!(self.hashing.hash_key(key), e.hash, "stale hash");
                assert!(!seen[e.aryix], "position {} held twice", e.aryix);
                seen[e.aryix] = true;
            }
        }
        assert_eq!(linked, buckets.entries.len(), "count != sum of chain lengths");
        for (pos, k) in self.keys.iter().enumerate() {
            assert_eq!(k.is_some(), seen[pos], "key column out of step at {pos}");
        }
        assert_eq!(buckets.heads.len() % 2, 1, "capacity must stay odd");
        assert!(buckets.entries.len() <= buckets.threshold, "overdue rehash");
    }
}

/// Link a new entry for `key` at `pos`, padding the key column with holes.
fn install<K>(
    buckets: &mut Buckets,
    keys: &mut Values<Option<K>>,
    options: &Options,
    pos: usize,
    hash: u64,
    key: K,
) -> Result<()> {
    if matches!(keys.get(pos), Some(Some(_))) {
        return Err(Error::SlotOccupied { pos });
    }
    while keys.len() < pos {
        keys.append(None);
    }
    buckets.link_new(hash, pos, options);
    keys.set(pos, Some(key))?;
    Ok(())
}

impl<K: fmt::Debug, H> fmt::Debug for Index<K, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("keys", &self.keys)
            .finish()
    }
}
