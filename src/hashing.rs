//! Key hashing strategies.
//!
//! An index never calls `K: Hash` through a randomly seeded hasher: equal
//! keys must land in the same bucket across process runs. Object keys go
//! through [`StableHasher`] (FNV-1a over the bytes `Hash` feeds it);
//! integer keys hash to themselves.

use core::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};

/// Reserved integer key meaning "no key". Never stored.
pub const NIL: i64 = i64::MIN;

const HASH_MASK: u64 = u64::MAX >> 1;
const INT_MASK: i64 = 0x7fff_ffff;

/// Deterministic FNV-1a 64-bit hasher.
#[derive(Clone, Debug)]
pub struct StableHasher(u64);

impl StableHasher {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
}

impl Default for StableHasher {
    fn default() -> Self {
        StableHasher(Self::OFFSET)
    }
}

impl Hasher for StableHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }
}

/// `BuildHasher` producing [`StableHasher`]s.
pub type StableState = BuildHasherDefault<StableHasher>;

/// How an index turns a key (or a borrowed form of it) into a bucket hash.
///
/// Implementations must hash `K` and every `Q` that `K` borrows as to the
/// same value, and the result must fit in 63 bits.
pub trait KeyHashing<Q: ?Sized> {
    fn hash_key(&self, key: &Q) -> u64;

    /// True for the sentinel meaning "no key".
    fn is_nil(&self, _key: &Q) -> bool {
        false
    }
}

/// Hashing for arbitrary `Hash` keys through a `BuildHasher`.
#[derive(Clone, Debug, Default)]
pub struct ObjectHashing<S = StableState> {
    state: S,
}

impl<S> ObjectHashing<S> {
    pub fn with_state(state: S) -> Self {
        Self { state }
    }
}

impl<Q, S> KeyHashing<Q> for ObjectHashing<S>
where
    Q: ?Sized + Hash,
    S: BuildHasher,
{
    #[inline]
    fn hash_key(&self, key: &Q) -> u64 {
        self.state.hash_one(key) & HASH_MASK
    }
}

/// Hashing for `i64` keys: the key masked into the non-negative 31-bit
/// range, with [`NIL`] reserved as the absent key.
#[derive(Copy, Clone, Debug, Default)]
pub struct IntHashing;

impl KeyHashing<i64> for IntHashing {
    #[inline]
    fn hash_key(&self, key: &i64) -> u64 {
        (key & INT_MASK) as u64
    }

    #[inline]
    fn is_nil(&self, key: &i64) -> bool {
        *key == NIL
    }
}
