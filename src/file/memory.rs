use memmap2::MmapMut;

use super::{BlockStore, Descriptor, HEADER_SIZE, MAGIC};
use crate::{
    error::Result,
    node::codec::{decode_into, encode, node_block_size},
    check_degree, Error, Node,
};

/// Number of node blocks reserved when creating a new in-memory store.
pub(super) const INITIAL_BLOCKS: usize = 16;

/// Block store backed by an anonymous memory map.
///
/// The content has the same layout as a [`super::BlockFile`], so an image
/// returned by [`MemoryBlockFile::to_bytes`] can be written to disk and opened
/// as a file, and vice versa.
pub struct MemoryBlockFile {
    mmap: MmapMut,
    /// End of the written content
    len: usize,
    descriptor: Descriptor,
    degree: u8,
    block_size: usize,
}

impl MemoryBlockFile {
    pub fn create(degree: u8, page_size: i16) -> Result<MemoryBlockFile> {
        let degree = check_degree(degree)?;
        let block_size = node_block_size(degree);
        let mut mmap = MmapMut::map_anon(HEADER_SIZE + INITIAL_BLOCKS * block_size)?;

        let descriptor = Descriptor::new(degree, page_size);
        mmap[0..HEADER_SIZE].copy_from_slice(&descriptor.to_header());

        Ok(MemoryBlockFile {
            mmap,
            len: HEADER_SIZE,
            descriptor,
            degree,
            block_size,
        })
    }

    /// Open a copy of an existing image, e.g. the content of a [`super::BlockFile`].
    pub fn from_bytes(image: &[u8]) -> Result<MemoryBlockFile> {
        let descriptor = Descriptor::read_header(image)?;
        let degree = descriptor.degree()?;
        descriptor.check_page_size(degree);

        let mut mmap = MmapMut::map_anon(image.len().max(1))?;
        mmap[0..image.len()].copy_from_slice(image);

        Ok(MemoryBlockFile {
            mmap,
            len: image.len(),
            descriptor,
            degree,
            block_size: node_block_size(degree),
        })
    }

    /// Copy of the stored content, with the descriptor as it was last persisted.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.mmap[0..self.len].to_vec()
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    #[cfg(test)]
    pub(super) fn mapped_len(&self) -> usize {
        self.mmap.len()
    }

    /// Grows the map to contain at least the requested number of bytes.
    /// To avoid copying the content too often, the size is at least doubled.
    fn grow(&mut self, requested_size: usize) -> Result<()> {
        if requested_size <= self.mmap.len() {
            return Ok(());
        }

        let new_size = requested_size.max(self.mmap.len() * 2);
        let mut new_mmap = MmapMut::map_anon(new_size)?;
        new_mmap[0..self.mmap.len()].copy_from_slice(&self.mmap);

        self.mmap = new_mmap;
        Ok(())
    }
}

impl BlockStore for MemoryBlockFile {
    fn allocate_block(&mut self) -> Result<i64> {
        let position = self.descriptor.bump(self.block_size)?;
        self.grow(self.descriptor.first_free_block.try_into()?)?;
        Ok(position)
    }

    fn read_node(&self, node: &mut Node) -> Result<()> {
        let start: usize = node.position.try_into()?;
        let end = (start + self.block_size).min(self.len);
        let block = self.mmap.get(start..end).unwrap_or_default();
        if block.len() < self.block_size {
            return Err(Error::BlockTooSmall {
                expected: self.block_size,
                actual: block.len(),
            });
        }
        decode_into(block, node)
    }

    fn write_node(&mut self, node: &Node) -> Result<()> {
        let block = encode(node);
        let start: usize = node.position.try_into()?;
        let end = start + block.len();
        self.grow(end)?;
        self.mmap[start..end].copy_from_slice(&block);
        self.len = self.len.max(end);
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
        self.mmap[MAGIC.len()..HEADER_SIZE].copy_from_slice(&header[MAGIC.len()..]);
        Ok(())
    }

    fn close(self) -> Result<()> {
        log::debug!(
            "Closed in-memory block file with {} bytes allocated",
            self.descriptor.first_free_block
        );
        Ok(())
    }
}
