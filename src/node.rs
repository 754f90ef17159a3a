pub(crate) mod codec;

use crate::{MAX_DEGREE, MIN_DEGREE};

/// In-memory copy of a single B-tree node.
///
/// The key, value and child arrays always have the full capacity for the
/// degree of the tree (`2t-1`, `2t-1` and `2t`), only the first `len()`
/// keys and values (and `len() + 1` children of an inner node) are meaningful.
/// Child nodes are only referenced by their block position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub(crate) position: i64,
    pub(crate) leaf: bool,
    pub(crate) size: u8,
    pub(crate) keys: Box<[i32]>,
    pub(crate) values: Box<[i32]>,
    pub(crate) children: Box<[i64]>,
}

impl Node {
    /// Create an empty node that is not yet allocated in any block store.
    ///
    /// The degree must be in `MIN_DEGREE..=MAX_DEGREE`, otherwise the key count overflows.
    pub fn new(degree: u8, leaf: bool) -> Node {
        debug_assert!((MIN_DEGREE..=MAX_DEGREE).contains(&degree));
        let max_keys = 2 * usize::from(degree) - 1;
        Node {
            position: 0,
            leaf,
            size: 0,
            keys: vec![0; max_keys].into_boxed_slice(),
            values: vec![0; max_keys].into_boxed_slice(),
            children: vec![0; max_keys + 1].into_boxed_slice(),
        }
    }

    /// Offset of the block of this node in the backing store.
    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn set_position(&mut self, position: i64) {
        self.position = position;
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    /// Number of keys stored in this node.
    pub fn len(&self) -> usize {
        usize::from(self.size)
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Maximum number of keys this node can hold.
    pub fn capacity(&self) -> usize {
        self.keys.len()
    }

    /// The minimum degree of the tree this node was created for.
    pub fn degree(&self) -> u8 {
        // Capacity is at most 255, so this always fits
        ((self.capacity() + 1) / 2) as u8
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    pub fn keys(&self) -> &[i32] {
        &self.keys[..self.len()]
    }

    pub fn values(&self) -> &[i32] {
        &self.values[..self.len()]
    }

    /// Positions of the child nodes, empty for a leaf.
    pub fn children(&self) -> &[i64] {
        if self.leaf {
            &[]
        } else {
            &self.children[..=self.len()]
        }
    }

    pub fn key(&self, i: usize) -> Option<i32> {
        self.keys().get(i).copied()
    }

    pub fn value(&self, i: usize) -> Option<i32> {
        self.values().get(i).copied()
    }

    /// Index of the first key that is not smaller than the given key.
    ///
    /// For an inner node, this is also the index of the child the key belongs to.
    pub fn position_for(&self, key: i32) -> usize {
        self.keys().partition_point(|k| *k < key)
    }

    /// Insert a key and its value at the given index, moving all larger entries to the right.
    ///
    /// The node must not be full and `index` must be at most `len()`.
    pub fn insert_at(&mut self, index: usize, key: i32, value: i32) {
        debug_assert!(!self.is_full());
        let size = self.len();
        self.keys.copy_within(index..size, index + 1);
        self.values.copy_within(index..size, index + 1);
        self.keys[index] = key;
        self.values[index] = value;
        self.size += 1;
    }

    /// Insert a separator key at `index` and the position of its right subtree at `index + 1`.
    ///
    /// The child at `index` stays in place and becomes the left subtree of the separator.
    pub(crate) fn insert_separator(&mut self, index: usize, key: i32, value: i32, right: i64) {
        let size = self.len();
        self.insert_at(index, key, value);
        self.children.copy_within((index + 1)..=size, index + 2);
        self.children[index + 1] = right;
    }
}

#[cfg(test)]
mod tests;
