//! Bitset over kind indices.

use std::fmt;

/// A set of kind indices, usable in `const` contexts.
///
/// Receive and emit declarations are `KindSet` constants, usually written
/// with [`kinds!`](crate::kinds). The engine builds its routing tables and
/// producer counts from them once, at assembly time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindSet {
    bits: u128,
}

impl KindSet {
    /// Largest number of kinds a set can index.
    pub const CAPACITY: usize = 128;

    /// The empty set.
    pub const EMPTY: Self = Self { bits: 0 };

    /// Builds a set from kind indices.
    ///
    /// # Panics
    ///
    /// Panics (at compile time in `const` contexts) if an index is not
    /// below [`CAPACITY`](Self::CAPACITY).
    #[must_use]
    pub const fn from_indices(indices: &[usize]) -> Self {
        let mut set = Self::EMPTY;
        let mut i = 0;
        while i < indices.len() {
            set = set.with(indices[i]);
            i += 1;
        }
        set
    }

    /// Returns this set with `kind` added.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is not below [`CAPACITY`](Self::CAPACITY).
    #[must_use]
    pub const fn with(self, kind: usize) -> Self {
        assert!(kind < Self::CAPACITY, "kind index out of range");
        Self {
            bits: self.bits | (1u128 << kind),
        }
    }

    /// Returns true if `kind` is in the set.
    #[inline]
    #[must_use]
    pub const fn contains(self, kind: usize) -> bool {
        kind < Self::CAPACITY && self.bits & (1u128 << kind) != 0
    }

    /// Returns true if the two sets share a kind.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.bits & other.bits != 0
    }

    /// Returns the union of both sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Number of kinds in the set.
    #[must_use]
    pub const fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Returns true if the set has no kinds.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Iterates kind indices in ascending order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        let mut bits = self.bits;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let kind = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            Some(kind)
        })
    }
}

impl fmt::Debug for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
