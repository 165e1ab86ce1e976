//! Sparse set of state indices with O(1) clear.
//!
//! See https://research.swtch.com/sparse. Used when sealing an automaton:
//! one epsilon-closure walk per state, each needing an empty "seen" set, so
//! clearing has to be free.

#[derive(Clone, Debug)]
pub struct SparseSet {
    len: usize,
    /// Members in insertion order.
    dense: Vec<usize>,
    /// `sparse[id]` is the position of `id` in `dense`, if it is a member.
    sparse: Vec<usize>,
}

impl SparseSet {
    /// Create a set able to hold indices in `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        SparseSet {
            len: 0,
            dense: vec![0; capacity],
            sparse: vec![0; capacity],
        }
    }

    /// Insert `id`, returning false if it was already a member.
    ///
    /// Panics if `id >= capacity`.
    #[inline]
    pub fn insert(&mut self, id: usize) -> bool {
        if self.contains(id) {
            return false;
        }
        self.dense[self.len] = id;
        self.sparse[id] = self.len;
        self.len += 1;
        true
    }

    #[inline]
    pub fn contains(&self, id: usize) -> bool {
        let pos = self.sparse[id];
        pos < self.len && self.dense[pos] == id
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut set = SparseSet::new(8);
        assert!(set.insert(5));
        assert!(set.insert(2));
        assert!(!set.insert(5));
        assert!(set.contains(2));
        assert!(!set.contains(3));
    }

    #[test]
    fn test_clear_forgets_members() {
        let mut set = SparseSet::new(4);
        set.insert(0);
        set.insert(3);
        set.clear();
        assert!(!set.contains(0));
        assert!(!set.contains(3));
        assert!(set.insert(3));
    }
}
