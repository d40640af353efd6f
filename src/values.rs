//! Values: growable, position-addressed columns.
//!
//! One generic column type covers every admitted value kind; the aliases
//! at the bottom name the kinds a map is usually built with. A column
//! grows by a fixed increment rather than doubling, and `remove` closes
//! the gap so positions stay dense.

use crate::error::{Error, Result};
use crate::options::DEFAULT_COLUMN_INCREMENT;
use core::fmt;
use core::ops;

#[derive(Clone)]
pub struct Values<T> {
    items: Vec<T>,
    increment: usize,
}

impl<T> Values<T> {
    pub fn new() -> Self {
        Self::with_increment(DEFAULT_COLUMN_INCREMENT)
    }

    /// Column growing `increment` slots at a time (at least one).
    pub fn with_increment(increment: usize) -> Self {
        Self {
            items: Vec::new(),
            increment: increment.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Allocated slots.
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    #[inline]
    fn make_room(&mut self) {
        if self.items.len() == self.items.capacity() {
            self.items.reserve_exact(self.increment);
        }
    }

    pub fn get(&self, pos: usize) -> Option<&T> {
        self.items.get(pos)
    }

    pub fn get_mut(&mut self, pos: usize) -> Option<&mut T> {
        self.items.get_mut(pos)
    }

    /// Store `value` at `pos`, returning the previous occupant.
    ///
    /// Writing at exactly `len()` appends and returns `None`; anything
    /// further out is a bounds error.
    pub fn set(&mut self, pos: usize, value: T) -> Result<Option<T>> {
        let len = self.items.len();
        if pos < len {
            Ok(Some(core::mem::replace(&mut self.items[pos], value)))
        } else if pos == len {
            self.append(value);
            Ok(None)
        } else {
            Err(Error::OutOfBounds { pos, len })
        }
    }

    /// Push at the tail and return the new position.
    pub fn append(&mut self, value: T) -> usize {
        self.make_room();
        self.items.push(value);
        self.items.len() - 1
    }

    /// Insert at `pos`, shifting later elements up by one.
    pub fn insert(&mut self, pos: usize, value: T) -> Result<()> {
        let len = self.items.len();
        if pos > len {
            return Err(Error::OutOfBounds { pos, len });
        }
        self.make_room();
        self.items.insert(pos, value);
        Ok(())
    }

    /// Remove `pos`, shifting later elements down by one.
    pub fn remove(&mut self, pos: usize) -> Result<T> {
        let len = self.items.len();
        if pos >= len {
            return Err(Error::OutOfBounds { pos, len });
        }
        Ok(self.items.remove(pos))
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Overwrite the last element, or append to an empty column.
    pub fn set_last(&mut self, value: T) -> Option<T> {
        match self.items.last_mut() {
            Some(slot) => Some(core::mem::replace(slot, value)),
            None => {
                self.append(value);
                None
            }
        }
    }

    /// Drop every element, keeping the allocation.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Exact-length copy of the live elements.
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.to_vec()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }
}

impl<T: PartialEq> Values<T> {
    pub fn contains(&self, value: &T) -> bool {
        self.items.contains(value)
    }

    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.index_of_from(value, 0)
    }

    /// First position `>= from` holding `value`.
    pub fn index_of_from(&self, value: &T, from: usize) -> Option<usize> {
        self.items
            .get(from..)?
            .iter()
            .position(|v| v == value)
            .map(|p| p + from)
    }

    pub fn last_index_of(&self, value: &T) -> Option<usize> {
        self.items.iter().rposition(|v| v == value)
    }

    /// Last position `<= from` holding `value`.
    pub fn last_index_of_from(&self, value: &T, from: usize) -> Option<usize> {
        let end = from.saturating_add(1).min(self.items.len());
        self.items[..end].iter().rposition(|v| v == value)
    }
}

impl<T> Default for Values<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Values<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T> ops::Index<usize> for Values<T> {
    type Output = T;

    fn index(&self, pos: usize) -> &T {
        match self.items.get(pos) {
            Some(v) => v,
            None => panic!("position {pos} out of bounds for length {}", self.items.len()),
        }
    }
}

impl<T> FromIterator<T> for Values<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut column = Values::new();
        for v in iter {
            column.append(v);
        }
        column
    }
}

impl<'a, T> IntoIterator for &'a Values<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

pub type ObjectValues<T> = Values<T>;
pub type LongValues = Values<i64>;
pub type IntValues = Values<i32>;
pub type ShortValues = Values<i16>;
pub type ByteValues = Values<i8>;
pub type DoubleValues = Values<f64>;
pub type FloatValues = Values<f32>;
pub type BooleanValues = Values<bool>;
pub type CharValues = Values<char>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: capacity grows by the fixed increment, not geometrically.
    #[test]
    fn grows_by_increment() {
        let mut v: LongValues = Values::with_increment(4);
        assert_eq!(v.capacity(), 0);
        v.append(1);
        assert_eq!(v.capacity(), 4);
        for i in 2..=4 {
            v.append(i);
        }
        assert_eq!(v.capacity(), 4);
        v.append(5);
        assert_eq!(v.capacity(), 8);
    }

    /// Invariant: `set` at `len` appends; beyond `len` is a bounds error.
    #[test]
    fn set_appends_at_len_only() {
        let mut v: IntValues = Values::new();
        assert_eq!(v.set(0, 7), Ok(None));
        assert_eq!(v.set(0, 8), Ok(Some(7)));
        assert_eq!(v.set(1, 9), Ok(None));
        assert_eq!(v.len(), 2);
        assert_eq!(v.set(3, 1), Err(Error::OutOfBounds { pos: 3, len: 2 }));
        assert_eq!(v.as_slice(), &[8, 9]);
    }

    /// Invariant: insert shifts later elements up, remove closes the gap.
    #[test]
    fn insert_and_remove_shift() {
        let mut v: CharValues = "abd".chars().collect();
        v.insert(2, 'c').unwrap();
        assert_eq!(v.snapshot(), vec!['a', 'b', 'c', 'd']);
        assert_eq!(v.remove(0), Ok('a'));
        assert_eq!(v.snapshot(), vec!['b', 'c', 'd']);
        assert!(v.get(3).is_none());
        assert_eq!(v.remove(3), Err(Error::OutOfBounds { pos: 3, len: 3 }));
        assert_eq!(v.insert(5, 'z'), Err(Error::OutOfBounds { pos: 5, len: 3 }));
        v.insert(3, 'e').unwrap();
        assert_eq!(v.last(), Some(&'e'));
    }

    #[test]
    fn search_with_and_without_start() {
        let v: BooleanValues = [true, false, true, false].into_iter().collect();
        assert!(v.contains(&false));
        assert_eq!(v.index_of(&false), Some(1));
        assert_eq!(v.index_of_from(&false, 2), Some(3));
        assert_eq!(v.index_of_from(&true, 3), None);
        assert_eq!(v.index_of_from(&true, 10), None);
        assert_eq!(v.last_index_of(&true), Some(2));
        assert_eq!(v.last_index_of_from(&true, 1), Some(0));
        assert_eq!(v.last_index_of_from(&false, 100), Some(3));
    }

    #[test]
    fn last_on_empty_appends() {
        let mut v: DoubleValues = Values::new();
        assert_eq!(v.last(), None);
        assert_eq!(v.set_last(1.5), None);
        assert_eq!(v.set_last(2.5), Some(1.5));
        assert_eq!(v.len(), 1);
    }

    /// Invariant: a clone owns its storage; later writes do not leak across.
    #[test]
    fn clone_is_independent() {
        let mut a: ObjectValues<String> = ["x".to_string()].into_iter().collect();
        let b = a.clone();
        a.set(0, "y".to_string()).unwrap();
        assert_eq!(b[0], "x");
        assert_eq!(a[0], "y");
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn index_operator_panics_past_end() {
        let v: ShortValues = Values::new();
        let _ = v[0];
    }

    #[test]
    fn iteration_is_in_position_order() {
        let mut v: ByteValues = (1..=3).collect();
        for x in v.iter_mut() {
            *x *= 2;
        }
        let seen: Vec<i8> = (&v).into_iter().copied().collect();
        assert_eq!(seen, vec![2, 4, 6]);
    }
}
