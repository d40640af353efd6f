//! Construction options for indices, columns and whole arrays.

use crate::error::{Error, Result};

/// Default number of hash buckets.
pub const DEFAULT_CAPACITY: usize = 11;
/// Default fraction of capacity at which the table is rehashed.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;
/// Default number of slots a value column grows by when full.
pub const DEFAULT_COLUMN_INCREMENT: usize = 11;

/// Sizing policy for a [`Hasharray`](crate::Hasharray) and its parts.
///
/// `grow` is the bucket increment applied on every rehash; zero means
/// "double plus one". Capacities are always rounded up to an odd number.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Options {
    pub capacity: usize,
    pub load_factor: f32,
    pub grow: usize,
    pub column_increment: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
            grow: 0,
            column_increment: DEFAULT_COLUMN_INCREMENT,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    pub fn grow(mut self, grow: usize) -> Self {
        self.grow = grow;
        self
    }

    pub fn column_increment(mut self, increment: usize) -> Self {
        self.column_increment = increment;
        self
    }

    /// Reject settings no table can be built from.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity(self.capacity));
        }
        // Written so that NaN fails too.
        if !(self.load_factor > 0.0 && self.load_factor < 1.0) {
            return Err(Error::InvalidLoadFactor(self.load_factor));
        }
        Ok(())
    }

    /// Bucket count actually used for a requested capacity.
    pub(crate) fn odd(capacity: usize) -> usize {
        if capacity % 2 == 0 {
            capacity + 1
        } else {
            capacity
        }
    }

    pub(crate) fn threshold(capacity: usize, load: f32) -> usize {
        ((capacity as f64 * load as f64) as usize).max(1)
    }

    pub(crate) fn next_capacity(&self, capacity: usize) -> usize {
        let grown = if self.grow == 0 {
            capacity * 2 + 1
        } else {
            capacity + self.grow
        };
        Self::odd(grown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let o = Options::default();
        assert_eq!(o.capacity, 11);
        assert!(o.validate().is_ok());
    }

    /// Invariant: zero capacity and out-of-range load factors are rejected.
    #[test]
    fn rejects_bad_settings() {
        assert_eq!(
            Options::new().capacity(0).validate(),
            Err(Error::InvalidCapacity(0))
        );
        for bad in [0.0, 1.0, -0.5, 1.5] {
            assert_eq!(
                Options::new().load_factor(bad).validate(),
                Err(Error::InvalidLoadFactor(bad))
            );
        }
        assert!(Options::new().load_factor(f32::NAN).validate().is_err());
    }

    #[test]
    fn growth_keeps_capacity_odd() {
        let doubling = Options::new();
        assert_eq!(doubling.next_capacity(11), 23);
        let stepped = Options::new().grow(10);
        assert_eq!(stepped.next_capacity(11), 21);
        assert_eq!(stepped.next_capacity(21), 31);
        let even_step = Options::new().grow(4);
        assert_eq!(even_step.next_capacity(11), 15);
        assert_eq!(Options::odd(10), 11);
        assert_eq!(Options::odd(1), 1);
    }

    #[test]
    fn threshold_never_zero() {
        assert_eq!(Options::threshold(1, 0.5), 1);
        assert_eq!(Options::threshold(11, 0.75), 8);
        assert_eq!(Options::threshold(23, 0.75), 17);
    }
}
