use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
};

use binary_layout::prelude::*;

use crate::{
    error::Result,
    node::codec::{decode_into, encode, node_block_size},
    check_degree, Error, Node, MAX_DEGREE, MIN_DEGREE,
};

mod memory;

pub use memory::MemoryBlockFile;

/// Two bytes at the start of every file that identify the format.
pub const MAGIC: [u8; 2] = [64, 62];

/// Size of the magic bytes and the descriptor.
/// The first node block starts directly after it.
pub const HEADER_SIZE: usize = MAGIC.len() + DESCRIPTOR_SIZE;

const DESCRIPTOR_SIZE: usize = 20;

define_layout!(descriptor_layout, LittleEndian, {
    tree_degree: i16,
    page_size: i16,
    root_block_position: i64,
    first_free_block: i64,
});

/// Small record after the magic bytes, needed to open an existing tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    pub tree_degree: i16,
    pub page_size: i16,
    pub root_block_position: i64,
    /// Offset of the next block to allocate. This is only ever increased.
    pub first_free_block: i64,
}

impl Descriptor {
    fn new(degree: u8, page_size: i16) -> Descriptor {
        Descriptor {
            tree_degree: i16::from(degree),
            page_size,
            root_block_position: 0,
            first_free_block: HEADER_SIZE as i64,
        }
    }

    /// Parse the magic bytes and the descriptor from the beginning of a file.
    pub fn read_header(buffer: &[u8]) -> Result<Descriptor> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::BlockTooSmall {
                expected: HEADER_SIZE,
                actual: buffer.len(),
            });
        }
        if buffer[0..MAGIC.len()] != MAGIC {
            return Err(Error::InvalidFormat {
                found: buffer[0..MAGIC.len()].try_into()?,
            });
        }

        let view = descriptor_layout::View::new(&buffer[MAGIC.len()..HEADER_SIZE]);
        Ok(Descriptor {
            tree_degree: view.tree_degree().read(),
            page_size: view.page_size().read(),
            root_block_position: view.root_block_position().read(),
            first_free_block: view.first_free_block().read(),
        })
    }

    /// Serialize the magic bytes and the descriptor.
    pub fn to_header(&self) -> [u8; HEADER_SIZE] {
        let mut buffer = [0; HEADER_SIZE];
        buffer[0..MAGIC.len()].copy_from_slice(&MAGIC);
        self.write(&mut buffer[MAGIC.len()..]);
        buffer
    }

    /// Serialize only the descriptor, without the magic bytes.
    fn write(&self, buffer: &mut [u8]) {
        let mut view = descriptor_layout::View::new(buffer);
        view.tree_degree_mut().write(self.tree_degree);
        view.page_size_mut().write(self.page_size);
        view.root_block_position_mut()
            .write(self.root_block_position);
        view.first_free_block_mut().write(self.first_free_block);
    }

    /// The degree of the tree, if it is in the supported range.
    pub fn degree(&self) -> Result<u8> {
        match u8::try_from(self.tree_degree) {
            Ok(degree) if (MIN_DEGREE..=MAX_DEGREE).contains(&degree) => Ok(degree),
            _ => Err(Error::InvalidStoredDegree(self.tree_degree)),
        }
    }

    fn check_page_size(&self, degree: u8) {
        let block_size = node_block_size(degree);
        if usize::try_from(self.page_size).ok() != Some(block_size) {
            log::warn!(
                "Page size {} in descriptor does not match the node block size {} for degree {}",
                self.page_size,
                block_size,
                degree
            );
        }
    }

    /// Move the allocation pointer by one block and return the old value.
    fn bump(&mut self, block_size: usize) -> Result<i64> {
        let position = self.first_free_block;
        let block_size: i64 = block_size.try_into()?;
        self.first_free_block += block_size;
        log::trace!("Allocated block at position {}", position);
        Ok(position)
    }
}

/// Positional storage for the blocks of a single tree.
///
/// Implementations own the descriptor and a bump allocator for new blocks.
/// Blocks are never freed or reused.
pub trait BlockStore {
    /// Reserve space for a new node and return its position.
    ///
    /// Nothing is written, the caller is expected to write the node afterwards.
    fn allocate_block(&mut self) -> Result<i64>;

    /// Read the block at the position of the given node into its arrays.
    fn read_node(&self, node: &mut Node) -> Result<()>;

    /// Write the node to the block at its position, replacing whatever was stored there.
    fn write_node(&mut self, node: &Node) -> Result<()>;

    /// Change the root position in the in-memory descriptor.
    ///
    /// The change is only persisted by [`BlockStore::update_descriptor`].
    fn update_root_position(&mut self, position: i64);

    fn tree_degree(&self) -> u8;

    fn root_block(&self) -> i64;

    /// Persist the in-memory descriptor.
    fn update_descriptor(&mut self) -> Result<()>;

    /// Make sure all written data is durable.
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release the underlying resources.
    fn close(self) -> Result<()>
    where
        Self: Sized;

    /// Read the node stored at the given position.
    fn load_node(&self, position: i64) -> Result<Node> {
        let mut node = Node::new(self.tree_degree(), false);
        node.position = position;
        self.read_node(&mut node)?;
        Ok(node)
    }
}

/// Block store backed by a file on disk.
pub struct BlockFile {
    file: File,
    descriptor: Descriptor,
    degree: u8,
    block_size: usize,
}

impl BlockFile {
    /// Create (or truncate) the file and write the header to it.
    pub fn create(path: &Path, degree: u8, page_size: i16) -> Result<BlockFile> {
        let degree = check_degree(degree)?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let descriptor = Descriptor::new(degree, page_size);
        file.write_all(&descriptor.to_header())?;
        log::debug!(
            "Created block file {} with degree {}",
            path.display(),
            degree
        );

        Ok(BlockFile {
            file,
            descriptor,
            degree,
            block_size: node_block_size(degree),
        })
    }

    /// Open an existing file and read its header.
    pub fn open(path: &Path) -> Result<BlockFile> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let mut header = [0; HEADER_SIZE];
        file.read_exact(&mut header)?;
        let descriptor = Descriptor::read_header(&header)?;
        let degree = descriptor.degree()?;
        descriptor.check_page_size(degree);
        log::debug!(
            "Opened block file {} with degree {} and root at position {}",
            path.display(),
            degree,
            descriptor.root_block_position
        );

        Ok(BlockFile {
            file,
            descriptor,
            degree,
            block_size: node_block_size(degree),
        })
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

impl BlockStore for BlockFile {
    fn allocate_block(&mut self) -> Result<i64> {
        self.descriptor.bump(self.block_size)
    }

    fn read_node(&self, node: &mut Node) -> Result<()> {
        let mut block = vec![0; self.block_size];
        // Reading and seeking only need a shared reference to the file
        let mut file = &self.file;
        file.seek(SeekFrom::Start(node.position.try_into()?))?;
        file.read_exact(&mut block)?;
        decode_into(&block, node)
    }

    fn write_node(&mut self, node: &Node) -> Result<()> {
        self.file.seek(SeekFrom::Start(node.position.try_into()?))?;
        self.file.write_all(&encode(node))?;
        Ok(())
    }

    fn update_root_position(&mut self, position: i64) {
        self.descriptor.root_block_position = position;
    }

    fn tree_degree(&self) -> u8 {
        self.degree
    }

    fn root_block(&self) -> i64 {
        self.descriptor.root_block_position
    }

    fn update_descriptor(&mut self) -> Result<()> {
        let header = self.descriptor.to_header();
        self.file.seek(SeekFrom::Start(MAGIC.len() as u64))?;
        self.file.write_all(&header[MAGIC.len()..])?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    fn close(mut self) -> Result<()> {
        self.file.flush()?;
        log::debug!(
            "Closed block file with {} bytes allocated",
            self.descriptor.first_free_block
        );
        Ok(())
    }
}
