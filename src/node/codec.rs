//! Binary encoding of a node into a fixed-size block.
//!
//! The layout is little endian: leaf flag (1 byte), number of keys (1 byte),
//! all `2t-1` keys (4 bytes each), all `2t-1` values (4 bytes each) and all
//! `2t` child positions (8 bytes each). The whole capacity is always written,
//! so every node of a tree has the same block size.

use std::mem::size_of;

use crate::{check_degree, error::Result, Error, Node, MAX_DEGREE, MIN_DEGREE};

const FLAGS_SIZE: usize = 2;

/// Size in bytes of an encoded node for a tree of the given degree.
///
/// The degree must be in `MIN_DEGREE..=MAX_DEGREE`.
pub fn node_block_size(degree: u8) -> usize {
    debug_assert!((MIN_DEGREE..=MAX_DEGREE).contains(&degree));
    let max_keys = 2 * usize::from(degree) - 1;
    FLAGS_SIZE
        + max_keys * (size_of::<i32>() + size_of::<i32>())
        + (max_keys + 1) * size_of::<i64>()
}

/// Encode the node into a new byte block.
pub fn encode(node: &Node) -> Vec<u8> {
    let mut block = Vec::with_capacity(node_block_size(node.degree()));
    block.push(u8::from(node.leaf));
    block.push(node.size);
    for k in node.keys.iter() {
        block.extend_from_slice(&k.to_le_bytes());
    }
    for v in node.values.iter() {
        block.extend_from_slice(&v.to_le_bytes());
    }
    for c in node.children.iter() {
        block.extend_from_slice(&c.to_le_bytes());
    }
    block
}

/// Decode a node of a tree with the given degree from the start of `block`.
///
/// The position of the returned node is 0 and must be set by the caller.
/// Degrees outside of `MIN_DEGREE..=MAX_DEGREE` are rejected.
pub fn decode(block: &[u8], degree: u8) -> Result<Node> {
    let degree = check_degree(degree)?;
    let mut node = Node::new(degree, false);
    decode_into(block, &mut node)?;
    Ok(node)
}

/// Decode a block into the already allocated arrays of an existing node.
///
/// Only the size is checked against the capacity of the node, neither the
/// order of the keys nor the child positions are validated.
pub fn decode_into(block: &[u8], node: &mut Node) -> Result<()> {
    let expected = node_block_size(node.degree());
    if block.len() < expected {
        return Err(Error::BlockTooSmall {
            expected,
            actual: block.len(),
        });
    }

    let size = usize::from(block[1]);
    if size > node.capacity() {
        return Err(Error::CorruptNode {
            position: node.position,
            size,
            capacity: node.capacity(),
        });
    }
    node.leaf = block[0] != 0;
    node.size = block[1];

    let mut offset = FLAGS_SIZE;
    for k in node.keys.iter_mut() {
        *k = i32::from_le_bytes(block[offset..(offset + 4)].try_into()?);
        offset += 4;
    }
    for v in node.values.iter_mut() {
        *v = i32::from_le_bytes(block[offset..(offset + 4)].try_into()?);
        offset += 4;
    }
    for c in node.children.iter_mut() {
        *c = i64::from_le_bytes(block[offset..(offset + 8)].try_into()?);
        offset += 8;
    }
    Ok(())
}
