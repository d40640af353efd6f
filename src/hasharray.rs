//! Hasharray: one or more indices over one shared row space of values.
//!
//! Rows are addressed by position. Index 0 (the primary) owns the
//! canonical key of every row and defines `len()`. Secondary indices
//! label some rows with additional keys; extra value columns hold
//! optional per-row values. Every structural change goes through the
//! primary first and then applies to each column and secondary index at
//! the position the primary reported, which is what keeps them aligned.

use crate::entry::{EntryKey, Placement};
use crate::error::{Error, Result};
use crate::hashing::{IntHashing, KeyHashing, ObjectHashing};
use crate::index::Index;
use crate::options::Options;
use crate::values::Values;
use core::borrow::Borrow;
use core::fmt;

/// Selector of the primary index and the primary value column.
pub const PRIMARY: usize = 0;

#[derive(Clone)]
pub struct Hasharray<K, V, H = ObjectHashing> {
    tables: Vec<Index<K, H>>,
    values: Values<V>,
    columns: Vec<Values<Option<V>>>,
}

/// Map with arbitrary hashable keys.
pub type ObjectMap<K, V> = Hasharray<K, V, ObjectHashing>;
/// Map with `i64` keys.
pub type LongMap<V> = Hasharray<i64, V, IntHashing>;

impl<K, V, H: Default> Hasharray<K, V, H> {
    pub fn new() -> Self {
        Self::from_primary(Index::new(), Options::default())
    }

    pub fn with_options(options: Options) -> Result<Self> {
        Self::with_options_and_hashing(options, H::default())
    }

    pub fn with_capacity_and_load(capacity: usize, load_factor: f32) -> Result<Self> {
        Self::with_options(
            Options::new()
                .capacity(capacity)
                .load_factor(load_factor),
        )
    }
}

impl<K, V, H: Default> Default for Hasharray<K, V, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> Hasharray<K, V, H> {
    pub fn with_options_and_hashing(options: Options, hashing: H) -> Result<Self> {
        let primary = Index::with_options_and_hashing(options, hashing)?;
        Ok(Self::from_primary(primary, options))
    }

    fn from_primary(primary: Index<K, H>, options: Options) -> Self {
        Self {
            tables: vec![primary],
            values: Values::with_increment(options.column_increment),
            columns: Vec::new(),
        }
    }

    #[inline]
    fn primary(&self) -> &Index<K, H> {
        &self.tables[PRIMARY]
    }

    pub fn len(&self) -> usize {
        self.primary().len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary().is_empty()
    }

    /// Bucket count of the primary index.
    pub fn capacity(&self) -> usize {
        self.primary().capacity()
    }

    pub fn rehash_count(&self) -> usize {
        self.primary().rehash_count()
    }

    /// Index by selector; `PRIMARY` is always present.
    pub fn index(&self, which: usize) -> Option<&Index<K, H>> {
        self.tables.get(which)
    }

    /// Number of indices, primary included.
    pub fn index_count(&self) -> usize {
        self.tables.len()
    }

    /// Key of row `pos` in index `which`; `None` for holes.
    pub fn key_in(&self, which: usize, pos: usize) -> Option<&K> {
        self.tables.get(which)?.key(pos)
    }

    /// Number of value columns, primary included.
    pub fn column_count(&self) -> usize {
        self.columns.len() + 1
    }

    pub fn key(&self, pos: usize) -> Option<&K> {
        self.primary().key(pos)
    }

    pub fn value(&self, pos: usize) -> Option<&V> {
        self.values.get(pos)
    }

    pub fn value_mut(&mut self, pos: usize) -> Option<&mut V> {
        self.values.get_mut(pos)
    }

    /// Value of column `which` at `pos`; `None` when that row has none.
    pub fn value_in(&self, which: usize, pos: usize) -> Option<&V> {
        match which {
            PRIMARY => self.values.get(pos),
            _ => self.columns.get(which - 1)?.get(pos)?.as_ref(),
        }
    }

    /// Add an empty secondary index and return its selector.
    pub fn add_index(&mut self) -> usize
    where
        H: Clone,
    {
        let index = self.primary().sibling();
        self.tables.push(index);
        self.tables.len() - 1
    }

    /// Add an empty value column and return its selector.
    pub fn add_values(&mut self) -> usize {
        self.columns.push(Values::new());
        self.columns.len()
    }

    /// Store `value` in column `which` at row `pos`, returning the old value.
    pub fn set_value_in(&mut self, which: usize, pos: usize, value: V) -> Result<Option<V>> {
        let len = self.len();
        if pos >= len {
            return Err(Error::OutOfBounds { pos, len });
        }
        if which == PRIMARY {
            return self.values.set(pos, value);
        }
        let column = self
            .columns
            .get_mut(which - 1)
            .ok_or(Error::NoSuchColumn(which))?;
        while column.len() < pos {
            column.append(None);
        }
        Ok(column.set(pos, Some(value))?.flatten())
    }

    /// Overwrite the value at an existing row.
    pub fn set_value(&mut self, pos: usize, value: V) -> Result<V> {
        let len = self.len();
        if pos >= len {
            return Err(Error::OutOfBounds { pos, len });
        }
        Ok(self.store(pos, value).unwrap_or_else(|| unreachable!()))
    }

    /// Pairs in position order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            keys: self.primary().key_slots().iter(),
            values: self.values.iter(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> core::slice::Iter<'_, V> {
        self.values.iter()
    }

    pub fn key_list(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.keys().cloned().collect()
    }

    pub fn value_list(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.values.snapshot()
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values.contains(value)
    }

    /// Reset every index and every column to empty.
    pub fn clear(&mut self) {
        for t in &mut self.tables {
            t.clear();
        }
        self.values.clear();
        for c in &mut self.columns {
            c.clear();
        }
    }

    /// Write into the primary column at a row the primary index reported.
    fn store(&mut self, pos: usize, value: V) -> Option<V> {
        match self.values.set(pos, value) {
            Ok(old) => old,
            Err(_) => panic!("value column out of step with index at {pos}"),
        }
    }

    /// Open row `pos` in every secondary index and extra column.
    fn open_row(&mut self, pos: usize) {
        for t in &mut self.tables[1..] {
            if t.positions() > pos {
                t.insert_hole(pos);
            }
        }
        for c in &mut self.columns {
            if c.len() > pos {
                let _ = c.insert(pos, None);
            }
        }
    }
}

impl<K, V, H> Hasharray<K, V, H>
where
    K: Eq,
    H: KeyHashing<K>,
{
    /// Stable handle of row `pos` in the primary index.
    pub(crate) fn row_key(&self, pos: usize) -> Option<EntryKey> {
        self.primary().entry_key(pos)
    }

    /// Find-or-create `key`, returning its position and the value it replaced.
    pub fn put_full(&mut self, key: K, value: V) -> Result<(usize, Option<V>)> {
        let placed = self.tables[PRIMARY].put(key)?;
        let pos = placed.position();
        Ok((pos, self.store(pos, value)))
    }

    /// Dictionary insert: updates an existing key in place, appends a new one.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.put_full(key, value).map(|(_, old)| old)
    }

    /// Multi-instance insert: always adds a new row at the tail.
    pub fn append(&mut self, key: K, value: V) -> Result<usize> {
        let pos = self.tables[PRIMARY].append(key)?;
        self.store(pos, value);
        Ok(pos)
    }

    /// Insert a row at `pos`, shifting later rows up.
    ///
    /// When `key` already occurs at or before `pos`, that row's value is
    /// overwritten instead and the returned placement is `Existing`.
    pub fn insert(&mut self, pos: usize, key: K, value: V) -> Result<Placement> {
        let placed = self.tables[PRIMARY].insert(pos, key)?;
        match placed {
            Placement::Existing(at) => {
                self.store(at, value);
            }
            Placement::Created(at) => {
                if self.values.insert(at, value).is_err() {
                    panic!("value column out of step with index at {at}");
                }
                self.open_row(at);
            }
        }
        Ok(placed)
    }

    /// Put a new key and value at an existing row, returning the old pair.
    pub fn replace(&mut self, pos: usize, key: K, value: V) -> Result<(K, V)> {
        let old_key = match self.tables[PRIMARY].replace(pos, key)? {
            Some(k) => k,
            None => panic!("primary index has a hole at {pos}"),
        };
        let old_value = self.store(pos, value).unwrap_or_else(|| unreachable!());
        Ok((old_key, old_value))
    }

    /// Remove row `pos`, closing the gap in every index and column.
    pub fn remove_at(&mut self, pos: usize) -> Result<(K, V)> {
        let key = match self.tables[PRIMARY].remove_at(pos)? {
            Some(k) => k,
            None => panic!("primary index has a hole at {pos}"),
        };
        Ok((key, self.close_row(pos)))
    }

    fn close_row(&mut self, pos: usize) -> V {
        let value = match self.values.remove(pos) {
            Ok(v) => v,
            Err(_) => panic!("value column out of step with index at {pos}"),
        };
        for t in &mut self.tables[1..] {
            if t.positions() > pos {
                let _ = t.remove_at(pos);
            }
        }
        for c in &mut self.columns {
            if c.len() > pos {
                let _ = c.remove(pos);
            }
        }
        value
    }

    /// Label row `pos` with `key` in secondary index `which`.
    pub fn index_key(&mut self, which: usize, pos: usize, key: K) -> Result<()> {
        let len = self.len();
        if which == PRIMARY {
            return Err(Error::NoSuchIndex(which));
        }
        let table = self
            .tables
            .get_mut(which)
            .ok_or(Error::NoSuchIndex(which))?;
        if pos >= len {
            return Err(Error::OutOfBounds { pos, len });
        }
        if table.key(pos).is_some() {
            table.replace(pos, key)?;
        } else {
            table.append_at(pos, key)?;
        }
        assert!(
            table.positions() <= len,
            "secondary index {which} longer than the primary"
        );
        Ok(())
    }

    /// Remove the label of row `pos` from secondary index `which`.
    pub fn unindex_key(&mut self, which: usize, pos: usize) -> Result<Option<K>> {
        if which == PRIMARY {
            return Err(Error::NoSuchIndex(which));
        }
        let table = self
            .tables
            .get_mut(which)
            .ok_or(Error::NoSuchIndex(which))?;
        if pos >= table.positions() {
            return Ok(None);
        }
        table.vacate(pos)
    }

    /// Panic unless every index and column lines up with the primary.
    #[doc(hidden)]
    pub fn assert_consistent(&self) {
        let primary = self.primary();
        primary.assert_consistent();
        assert_eq!(primary.positions(), primary.len(), "primary index has holes");
        assert_eq!(self.values.len(), primary.len(), "value column out of step");
        for (which, t) in self.tables.iter().enumerate().skip(1) {
            t.assert_consistent();
            assert!(t.positions() <= primary.len(), "index {which} too long");
        }
        for c in &self.columns {
            assert!(c.len() <= primary.len(), "extra column too long");
        }
    }
}

impl<K, V, H> Hasharray<K, V, H>
where
    K: Eq,
{
    /// Position of the most recent occurrence of `q`; the row `get` reads.
    pub fn lookup<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        self.primary().lookup(q)
    }

    /// Every row holding `q`, most recent first.
    pub fn lookup_list<Q>(&self, q: &Q) -> Vec<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        self.primary().lookup_list(q)
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        self.lookup(q).and_then(|pos| self.values.get(pos))
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        let pos = self.lookup(q)?;
        self.values.get_mut(pos)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        self.lookup(q).is_some()
    }

    /// Lowest row holding `q`.
    pub fn index_of<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        self.lookup_list(q).into_iter().min()
    }

    /// Lowest row `>= from` holding `q`.
    pub fn index_of_from<Q>(&self, q: &Q, from: usize) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        self.lookup_list(q).into_iter().filter(|&p| p >= from).min()
    }

    /// Highest row holding `q`.
    pub fn last_index_of<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        self.lookup_list(q).into_iter().max()
    }

    /// Highest row `<= from` holding `q`.
    pub fn last_index_of_from<Q>(&self, q: &Q, from: usize) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        self.lookup_list(q).into_iter().filter(|&p| p <= from).max()
    }

    /// Row labelled `q` in secondary index `which`.
    pub fn lookup_in<Q>(&self, which: usize, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        self.tables.get(which)?.lookup(q)
    }

    /// Primary value of the row labelled `q` in index `which`.
    pub fn get_in<Q>(&self, which: usize, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q>,
    {
        self.lookup_in(which, q).and_then(|pos| self.values.get(pos))
    }

    /// Remove the row `get(q)` would read, returning its value.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q> + KeyHashing<K>,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHashing<Q> + KeyHashing<K>,
    {
        let (pos, key) = self.tables[PRIMARY].remove_key(q)?;
        Some((key, self.close_row(pos)))
    }
}

/// Iterator over `(key, value)` pairs in position order.
pub struct Iter<'a, K, V> {
    keys: core::slice::Iter<'a, Option<K>>,
    values: core::slice::Iter<'a, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let key = match self.keys.next()? {
            Some(k) => k,
            None => panic!("primary index has a hole"),
        };
        Some((key, self.values.next()?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl<'a, K, V, H> IntoIterator for &'a Hasharray<K, V, H> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, H> Extend<(K, V)> for Hasharray<K, V, H>
where
    K: Eq,
    H: KeyHashing<K>,
{
    /// Dictionary-inserts every pair; pairs carrying the nil key are skipped.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            if let Err(error) = self.put(k, v) {
                tracing::debug!(%error, len = self.len(), "skipped pair while extending");
            }
        }
    }
}

impl<K, V, H> FromIterator<(K, V)> for Hasharray<K, V, H>
where
    K: Eq,
    H: KeyHashing<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Hasharray::new();
        map.extend(iter);
        map
    }
}

impl<K: fmt::Debug, V: fmt::Debug, H> fmt::Debug for Hasharray<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Equal when both hold the same pairs in the same order.
impl<K: PartialEq, V: PartialEq, H> PartialEq for Hasharray<K, V, H> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ObjectMap<String, i32> {
        ["a", "b", "c", "d"]
            .iter()
            .enumerate()
            .map(|(i, k)| (k.to_string(), i as i32))
            .collect()
    }

    /// Invariant: every live key sits at the position its value does.
    #[test]
    fn key_and_value_stay_aligned() {
        let mut m = sample();
        for k in ["a", "b", "c", "d"] {
            let pos = m.lookup(k).unwrap();
            assert_eq!(m.key(pos).map(String::as_str), Some(k));
        }
        assert_eq!(m.remove("b"), Some(1));
        assert_eq!(m.key(1).map(String::as_str), Some("c"));
        assert_eq!(m.value(1), Some(&2));
        m.assert_consistent();
    }

    /// Invariant: construction rejects invalid sizing and builds nothing.
    #[test]
    fn construction_validates_options() {
        assert_eq!(
            LongMap::<i64>::with_capacity_and_load(0, 0.75).err(),
            Some(Error::InvalidCapacity(0))
        );
        assert_eq!(
            LongMap::<i64>::with_capacity_and_load(11, 1.0).err(),
            Some(Error::InvalidLoadFactor(1.0))
        );
        let m = LongMap::<i64>::with_capacity_and_load(10, 0.5).unwrap();
        assert_eq!(m.capacity(), 11);
    }

    /// Invariant: set_value and replace only address live rows.
    #[test]
    fn positional_writes_are_bounds_checked() {
        let mut m = sample();
        assert_eq!(m.set_value(0, 10), Ok(0));
        assert_eq!(m.get("a"), Some(&10));
        assert_eq!(
            m.set_value(4, 1),
            Err(Error::OutOfBounds { pos: 4, len: 4 })
        );
        assert_eq!(
            m.replace(2, "z".to_string(), 99),
            Ok(("c".to_string(), 2))
        );
        assert_eq!(m.get("z"), Some(&99));
        assert!(!m.contains_key("c"));
        assert!(m.replace(9, "q".to_string(), 0).is_err());
        assert!(m.remove_at(9).is_err());
        m.assert_consistent();
    }

    /// Invariant: inserting a row shifts extra columns and secondary indices with it.
    #[test]
    fn insert_and_remove_keep_secondaries_aligned() {
        let mut m = sample();
        let alias = m.add_index();
        let notes = m.add_values();
        m.index_key(alias, 1, "bee".to_string()).unwrap();
        m.index_key(alias, 3, "dee".to_string()).unwrap();
        m.set_value_in(notes, 2, 200).unwrap();

        m.insert(0, "first".to_string(), -1).unwrap();
        assert_eq!(m.lookup_in(alias, "bee"), Some(2));
        assert_eq!(m.get_in(alias, "dee"), Some(&3));
        assert_eq!(m.value_in(notes, 3), Some(&200));
        assert_eq!(m.value_in(notes, 2), None);

        assert_eq!(m.remove_at(2), Ok(("b".to_string(), 1)));
        assert_eq!(m.lookup_in(alias, "bee"), None);
        assert_eq!(m.lookup_in(alias, "dee"), Some(3));
        assert_eq!(m.value_in(notes, 2), Some(&200));
        m.assert_consistent();
    }

    #[test]
    fn secondary_selectors_are_checked() {
        let mut m = sample();
        assert_eq!(
            m.index_key(PRIMARY, 0, "x".to_string()),
            Err(Error::NoSuchIndex(PRIMARY))
        );
        assert_eq!(m.index_key(3, 0, "x".to_string()), Err(Error::NoSuchIndex(3)));
        assert_eq!(m.set_value_in(5, 0, 1), Err(Error::NoSuchColumn(5)));
        let ix = m.add_index();
        assert_eq!(
            m.index_key(ix, 4, "x".to_string()),
            Err(Error::OutOfBounds { pos: 4, len: 4 })
        );
        m.index_key(ix, 0, "x".to_string()).unwrap();
        m.index_key(ix, 0, "y".to_string()).unwrap();
        assert_eq!(m.lookup_in(ix, "x"), None);
        assert_eq!(m.key_in(ix, 0).map(String::as_str), Some("y"));
        assert_eq!(m.unindex_key(ix, 0), Ok(Some("y".to_string())));
        assert_eq!(m.unindex_key(ix, 3), Ok(None));
        assert_eq!(m.index_count(), 2);
        assert_eq!(m.column_count(), 1);
    }

    /// Invariant: index_of/last_index_of report the extremes among occurrences.
    #[test]
    fn first_and_last_occurrence() {
        let mut m: LongMap<&'static str> = Hasharray::new();
        m.append(1, "a").unwrap();
        m.append(2, "b").unwrap();
        m.append(1, "c").unwrap();
        m.append(1, "d").unwrap();
        assert_eq!(m.index_of(&1), Some(0));
        assert_eq!(m.index_of_from(&1, 1), Some(2));
        assert_eq!(m.last_index_of(&1), Some(3));
        assert_eq!(m.last_index_of_from(&1, 2), Some(2));
        assert_eq!(m.last_index_of_from(&2, 0), None);
        assert_eq!(m.get(&1), Some(&"d"));
        assert!(m.contains_value(&"b"));
        assert!(!m.contains_value(&"z"));
    }

    /// Invariant: a clone shares no storage with the original.
    #[test]
    fn clone_is_deep() {
        let mut a = sample();
        let extra = a.add_values();
        a.set_value_in(extra, 0, 5).unwrap();
        let b = a.clone();
        a.put("a".to_string(), 100).unwrap();
        a.set_value_in(extra, 0, 6).unwrap();
        a.remove("d");
        assert_eq!(b.get("a"), Some(&0));
        assert_eq!(b.value_in(extra, 0), Some(&5));
        assert_eq!(b.len(), 4);
        assert_ne!(a, b);
    }

    #[test]
    fn clear_empties_everything() {
        let mut m = sample();
        let ix = m.add_index();
        m.index_key(ix, 0, "x".to_string()).unwrap();
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.iter().count(), 0);
        assert_eq!(m.lookup_in(ix, "x"), None);
        m.put("a".to_string(), 1).unwrap();
        assert_eq!(m.lookup("a"), Some(0));
        m.assert_consistent();
    }

    #[test]
    fn debug_lists_pairs_in_order() {
        let m: LongMap<char> = [(3, 'c'), (1, 'a')].into_iter().collect();
        assert_eq!(format!("{m:?}"), "{3: 'c', 1: 'a'}");
        assert_eq!(m.key_list(), vec![3, 1]);
        assert_eq!(m.value_list(), vec!['c', 'a']);
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut m = sample();
        *m.get_mut("c").unwrap() += 40;
        *m.value_mut(0).unwrap() -= 1;
        assert_eq!(m.get("c"), Some(&42));
        assert_eq!(m.get("a"), Some(&-1));
        assert!(m.get_mut("zz").is_none());
    }
}
