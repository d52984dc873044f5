use bitvec::prelude::*;
use std::fmt;

/// Fixed-size bitset over interned tag indices
///
/// Every set in one catalog shares the same capacity, so membership tests
/// and unions are plain bit operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagSet {
    bits: BitVec,
}

impl TagSet {
    /// Create a set with no tags present
    pub fn new(tag_count: usize) -> Self {
        Self {
            bits: bitvec![0; tag_count],
        }
    }

    /// Create a set from interned tag indices
    ///
    /// Indices outside the capacity are ignored.
    pub fn from_indices(indices: impl IntoIterator<Item = usize>, tag_count: usize) -> Self {
        let mut set = Self::new(tag_count);
        for tag in indices {
            set.insert(tag);
        }
        set
    }

    /// Insert a tag index
    pub fn insert(&mut self, tag: usize) {
        if tag < self.bits.len() {
            self.bits.set(tag, true);
        }
    }

    /// Test tag membership
    pub fn contains(&self, tag: usize) -> bool {
        self.bits.get(tag).as_deref() == Some(&true)
    }

    /// Add every tag of `other` to this set
    pub fn union_with(&mut self, other: &Self) {
        self.bits |= &other.bits;
    }

    /// Test whether the two sets share at least one tag
    pub fn intersects(&self, other: &Self) -> bool {
        self.bits.iter_ones().any(|tag| other.contains(tag))
    }

    /// Remove every tag, keeping the capacity
    pub fn clear(&mut self) {
        self.bits.fill(false);
    }

    /// Test if no tags are present
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Count tags in the set
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Number of distinct tags the set can hold
    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    /// Extract all tag indices in ascending order
    pub fn to_vec(&self) -> Vec<usize> {
        self.bits.iter_ones().collect()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagSet({} tags: {:?})", self.count(), self.to_vec())
    }
}
