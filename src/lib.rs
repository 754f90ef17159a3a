//! An ordered index from `i32` keys to `i32` values, stored as a B-tree in a single file.
//!
//! Each node of the tree occupies one fixed-size block of the file.
//! Only the root node is held in memory, all other nodes are read from the
//! [`BlockStore`] when an operation descends into them.
//!
//! ```rust
//! use disk_btree_index::{BtreeConfig, BtreeIndex, Error};
//!
//! fn main() -> std::result::Result<(), Error> {
//!     let dir = tempfile::tempdir()?;
//!     let path = dir.path().join("example.db");
//!
//!     let mut t = BtreeIndex::create(&path, BtreeConfig::default().with_degree(2))?;
//!     t.insert(4, 40)?;
//!     t.insert(1, 10)?;
//!     t.close()?;
//!
//!     let t = BtreeIndex::open(&path, BtreeConfig::default())?;
//!     assert_eq!(Some(40), t.get(4)?);
//!     Ok(())
//! }
//! ```

mod btree;
mod error;
mod file;
mod node;

pub use btree::{BtreeIndex, Range};
pub use error::{Error, Result};
pub use file::{BlockFile, BlockStore, Descriptor, MemoryBlockFile, HEADER_SIZE, MAGIC};
pub use node::codec::{decode, decode_into, encode, node_block_size};
pub use node::Node;

/// Smallest allowed minimum degree of a tree.
pub const MIN_DEGREE: u8 = 2;
/// Largest allowed minimum degree, since the number of keys in a node is stored in a single byte.
pub const MAX_DEGREE: u8 = 128;

/// Configuration for creating and opening a B-tree index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BtreeConfig {
    degree: u8,
    sync_on_close: bool,
}

impl Default for BtreeConfig {
    fn default() -> Self {
        Self {
            degree: 16,
            sync_on_close: true,
        }
    }
}

impl BtreeConfig {
    /// Set the minimum degree `t` of a newly created tree.
    ///
    /// Every node except the root holds between `t-1` and `2t-1` keys.
    /// When opening an existing tree, the degree stored in the file is used instead.
    pub fn with_degree(mut self, degree: u8) -> Self {
        self.degree = degree;
        self
    }

    /// Whether closing the tree also synchronizes the backing file to disk.
    pub fn sync_on_close(mut self, sync_on_close: bool) -> Self {
        self.sync_on_close = sync_on_close;
        self
    }

    pub fn degree(&self) -> u8 {
        self.degree
    }
}

pub(crate) fn check_degree(degree: u8) -> Result<u8> {
    if degree < MIN_DEGREE {
        Err(Error::DegreeTooSmall(degree))
    } else if degree > MAX_DEGREE {
        Err(Error::DegreeTooLarge(degree))
    } else {
        Ok(degree)
    }
}
