use std::{
    ops::{Bound, RangeBounds},
    path::Path,
};

use crate::{
    error::Result,
    file::{BlockFile, BlockStore},
    node::codec::node_block_size,
    check_degree, BtreeConfig, Node,
};

/// B-tree index with `i32` keys and values, persisted in a [`BlockStore`].
///
/// Only the root node is kept in memory. Every other node is read from the
/// store when needed and dropped afterwards, so nodes refer to each other only
/// by their block position.
///
/// Inserting a key that already exists does not replace the existing entry,
/// but adds a second entry with the same key.
/// Deleting entries is not supported.
///
/// Changes to the root position are only persisted when the index is closed with
/// [`BtreeIndex::close`]. If an operation fails, you should assume that the whole
/// index is corrupted.
pub struct BtreeIndex<S = BlockFile>
where
    S: BlockStore,
{
    store: S,
    root: Node,
    config: BtreeConfig,
}

impl BtreeIndex<BlockFile> {
    /// Create a new file at the given path, containing an empty tree.
    ///
    /// An existing file at this path is overwritten.
    pub fn create(path: &Path, config: BtreeConfig) -> Result<BtreeIndex<BlockFile>> {
        let degree = check_degree(config.degree())?;
        let page_size = node_block_size(degree).try_into()?;
        let store = BlockFile::create(path, degree, page_size)?;
        BtreeIndex::with_store(store, config)
    }

    /// Open a tree from an existing file.
    ///
    /// The degree of the tree is always read from the file.
    pub fn open(path: &Path, config: BtreeConfig) -> Result<BtreeIndex<BlockFile>> {
        let store = BlockFile::open(path)?;
        BtreeIndex::from_store(store, config)
    }
}

impl<S> BtreeIndex<S>
where
    S: BlockStore,
{
    /// Initialize a new tree with an empty root leaf in a freshly created store.
    pub fn with_store(mut store: S, config: BtreeConfig) -> Result<BtreeIndex<S>> {
        let config = config.with_degree(store.tree_degree());
        let mut root = Node::new(store.tree_degree(), true);
        root.position = store.allocate_block()?;
        store.write_node(&root)?;
        store.update_root_position(root.position);
        log::debug!(
            "Created tree with degree {} and root at position {}",
            config.degree(),
            root.position
        );

        Ok(BtreeIndex {
            store,
            root,
            config,
        })
    }

    /// Load an existing tree from a store, starting at the root recorded in its descriptor.
    pub fn from_store(store: S, config: BtreeConfig) -> Result<BtreeIndex<S>> {
        if config.degree() != store.tree_degree() {
            log::debug!(
                "Using stored degree {} instead of configured degree {}",
                store.tree_degree(),
                config.degree()
            );
        }
        let config = config.with_degree(store.tree_degree());
        let root = store.load_node(store.root_block())?;
        log::debug!(
            "Opened tree with degree {} and root at position {}",
            config.degree(),
            root.position
        );

        Ok(BtreeIndex {
            store,
            root,
            config,
        })
    }

    pub fn degree(&self) -> u8 {
        self.config.degree()
    }

    /// The root node, which is always held in memory.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Read the node stored at the given block position.
    pub fn read_node(&self, position: i64) -> Result<Node> {
        self.store.load_node(position)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Searches for a key and returns the node containing it and the index of the key in that node.
    pub fn find(&self, key: i32) -> Result<Option<(Node, usize)>> {
        self.find_in(&self.root, key)
    }

    fn find_in(&self, node: &Node, key: i32) -> Result<Option<(Node, usize)>> {
        let i = node.position_for(key);
        if node.key(i) == Some(key) {
            Ok(Some((node.clone(), i)))
        } else if node.is_leaf() {
            Ok(None)
        } else {
            // search in the matching child node
            let child = self.store.load_node(node.children[i])?;
            self.find_in(&child, key)
        }
    }

    /// Searches for a key in the index and returns the value if found.
    pub fn get(&self, key: i32) -> Result<Option<i32>> {
        Ok(self.find(key)?.and_then(|(node, i)| node.value(i)))
    }

    /// Returns whether the index contains the given key.
    pub fn contains_key(&self, key: i32) -> Result<bool> {
        Ok(self.find(key)?.is_some())
    }

    /// Number of levels in the tree, which is 1 if the root is a leaf.
    pub fn height(&self) -> Result<usize> {
        let mut height = 1;
        if self.root.is_leaf() {
            return Ok(height);
        }
        let mut node = self.store.load_node(self.root.children[0])?;
        height += 1;
        while !node.is_leaf() {
            node = self.store.load_node(node.children[0])?;
            height += 1;
        }
        Ok(height)
    }

    /// Insert a new entry into the index.
    pub fn insert(&mut self, key: i32, value: i32) -> Result<()> {
        if self.root.is_full() {
            // Create a new root node, because the current will become full
            let mut new_root = Node::new(self.degree(), false);
            new_root.position = self.store.allocate_block()?;
            new_root.children[0] = self.root.position;

            let mut old_root = std::mem::replace(&mut self.root, new_root);
            self.store.update_root_position(self.root.position);
            split_child(&mut self.store, &mut self.root, &mut old_root, 0)?;
            log::debug!("Tree grew to a new root at position {}", self.root.position);
        }
        insert_nonfull(&mut self.store, &mut self.root, key, value)
    }

    /// Return an iterator over a range of keys, in ascending order.
    ///
    /// If you want to iterate over all entries of the index, use the unbounded `..` range.
    ///
    /// # Example
    ///
    /// ```rust
    /// use disk_btree_index::{BtreeConfig, BtreeIndex, Error, MemoryBlockFile};
    ///
    /// fn main() -> std::result::Result<(), Error> {
    ///     let store = MemoryBlockFile::create(2, 58)?;
    ///     let mut b = BtreeIndex::with_store(store, BtreeConfig::default())?;
    ///     b.insert(1, 2)?;
    ///     b.insert(200, 4)?;
    ///     b.insert(20, 3)?;
    ///
    ///     let entries: Vec<_> = b.range(10..)?.collect::<Result<_, _>>()?;
    ///     assert_eq!(vec![(20, 3), (200, 4)], entries);
    ///     Ok(())
    /// }
    /// ```
    pub fn range<R>(&self, range: R) -> Result<Range<'_, S>>
    where
        R: RangeBounds<i32>,
    {
        let start = range.start_bound().cloned();
        let end = range.end_bound().cloned();
        let mut stack = find_range(&self.root, (start, end));
        // The range is sorted by smallest first, but popping values from the end of the
        // stack is more effective
        stack.reverse();

        Ok(Range {
            stack,
            start,
            end,
            store: &self.store,
        })
    }

    /// Persist the descriptor and release the store.
    pub fn close(mut self) -> Result<()> {
        self.store.update_descriptor()?;
        if self.config.sync_on_close {
            self.store.sync()?;
        }
        log::debug!("Closing tree with root at position {}", self.root.position);
        self.store.close()
    }
}

fn insert_nonfull<S: BlockStore>(
    store: &mut S,
    node: &mut Node,
    key: i32,
    value: i32,
) -> Result<()> {
    let mut i = node.position_for(key);
    if node.is_leaf() {
        node.insert_at(i, key, value);
        store.write_node(node)
    } else {
        let mut child = store.load_node(node.children[i])?;
        // If the child is full, we need to split it
        if child.is_full() {
            split_child(store, node, &mut child, i)?;
            if key > node.keys[i] {
                // Key is now larger than the promoted separator, use the newly created right child
                i += 1;
                child = store.load_node(node.children[i])?;
            }
        }
        insert_nonfull(store, &mut child, key, value)
    }
}

/// Split the full node `child`, which is the child of `parent` at the given index.
///
/// The upper half of the entries moves to a new sibling node right of `child`,
/// the middle entry moves up into `parent`.
fn split_child<S: BlockStore>(
    store: &mut S,
    parent: &mut Node,
    child: &mut Node,
    index: usize,
) -> Result<()> {
    let t = usize::from(child.degree());

    let mut sibling = Node::new(child.degree(), child.leaf);
    sibling.position = store.allocate_block()?;
    sibling.keys[..(t - 1)].copy_from_slice(&child.keys[t..(2 * t - 1)]);
    sibling.values[..(t - 1)].copy_from_slice(&child.values[t..(2 * t - 1)]);
    if !child.leaf {
        sibling.children[..t].copy_from_slice(&child.children[t..(2 * t)]);
    }
    sibling.size = child.degree() - 1;

    parent.insert_separator(
        index,
        child.keys[t - 1],
        child.values[t - 1],
        sibling.position,
    );
    child.size = child.degree() - 1;

    log::trace!(
        "Split node {} at index {} of parent {}, new sibling at {}",
        child.position,
        index,
        parent.position,
        sibling.position
    );

    store.write_node(parent)?;
    store.write_node(&sibling)?;
    store.write_node(child)?;
    Ok(())
}

enum StackEntry {
    Child(i64),
    Entry(i32, i32),
}

/// Returns the entries and children of a node that can overlap the range, in ascending order.
fn find_range(node: &Node, (start, end): (Bound<i32>, Bound<i32>)) -> Vec<StackEntry> {
    let below_start = |k: i32| match start {
        Bound::Included(s) => k < s,
        Bound::Excluded(s) => k <= s,
        Bound::Unbounded => false,
    };
    let above_end = |k: i32| match end {
        Bound::Included(e) => k > e,
        Bound::Excluded(e) => k >= e,
        Bound::Unbounded => false,
    };

    let mut result = Vec::new();
    for i in 0..=node.len() {
        // Child i only contains keys between the keys at i-1 and i
        if !node.is_leaf() {
            let upper = node.key(i);
            let lower = if i > 0 { node.key(i - 1) } else { None };
            if !upper.map_or(false, below_start) && !lower.map_or(false, above_end) {
                result.push(StackEntry::Child(node.children[i]));
            }
        }
        if let Some(k) = node.key(i) {
            if !below_start(k) && !above_end(k) {
                result.push(StackEntry::Entry(k, node.values[i]));
            }
        }
    }
    result
}

/// Iterator over the entries of a [`BtreeIndex`] in ascending key order.
pub struct Range<'a, S> {
    start: Bound<i32>,
    end: Bound<i32>,
    store: &'a S,
    stack: Vec<StackEntry>,
}

impl<'a, S> Iterator for Range<'a, S>
where
    S: BlockStore,
{
    type Item = Result<(i32, i32)>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(e) = self.stack.pop() {
            match e {
                StackEntry::Child(position) => match self.store.load_node(position) {
                    Ok(c) => {
                        // Add all entries for this child node on the stack
                        let mut new_elements = find_range(&c, (self.start, self.end));
                        new_elements.reverse();
                        self.stack.extend(new_elements);
                    }
                    Err(e) => return Some(Err(e)),
                },
                StackEntry::Entry(key, value) => return Some(Ok((key, value))),
            }
        }

        None
    }
}
