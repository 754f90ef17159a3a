use rand::{Rng, SeedableRng};

use super::codec::{decode, decode_into, encode, node_block_size};
use super::*;
use crate::Error;

fn node_with_keys(degree: u8, leaf: bool, keys: &[i32]) -> Node {
    let mut n = Node::new(degree, leaf);
    for (i, k) in keys.iter().enumerate() {
        n.insert_at(i, *k, k * 10);
    }
    n
}

#[test]
fn new_node_has_full_capacity() {
    let n = Node::new(2, true);
    assert_eq!(3, n.capacity());
    assert_eq!(4, n.children.len());
    assert_eq!(2, n.degree());
    assert_eq!(0, n.len());
    assert_eq!(true, n.is_empty());
    assert_eq!(true, n.children().is_empty());

    let n = Node::new(128, false);
    assert_eq!(255, n.capacity());
    assert_eq!(128, n.degree());
    // An inner node always has one more child than keys
    assert_eq!(1, n.children().len());
}

#[test]
fn insert_keeps_order() {
    let mut n = Node::new(3, true);
    for k in [4, 1, 2, 9] {
        let i = n.position_for(k);
        n.insert_at(i, k, -k);
    }
    assert_eq!(&[1, 2, 4, 9], n.keys());
    assert_eq!(&[-1, -2, -4, -9], n.values());
    assert_eq!(Some(4), n.key(2));
    assert_eq!(None, n.key(4));
    assert_eq!(false, n.is_full());

    n.insert_at(n.position_for(3), 3, -3);
    assert_eq!(&[1, 2, 3, 4, 9], n.keys());
    assert_eq!(true, n.is_full());
}

#[test]
fn position_for_finds_first_not_smaller_key() {
    let n = node_with_keys(3, true, &[10, 20, 30]);
    assert_eq!(0, n.position_for(-5));
    assert_eq!(0, n.position_for(10));
    assert_eq!(1, n.position_for(11));
    assert_eq!(2, n.position_for(30));
    assert_eq!(3, n.position_for(31));
}

#[test]
fn insert_separator_moves_children() {
    let mut n = node_with_keys(3, false, &[10, 30]);
    n.children[0] = 100;
    n.children[1] = 200;
    n.children[2] = 300;

    // The child at 200 was split and 20 promoted, the new right half lives at 250
    n.insert_separator(1, 20, 2, 250);

    assert_eq!(&[10, 20, 30], n.keys());
    assert_eq!(&[100, 200, 250, 300], n.children());
    assert_eq!(Some(2), n.value(1));
}

#[test]
fn block_size_depends_on_degree() {
    assert_eq!(2 + 8 * 3 + 8 * 4, node_block_size(2));
    assert_eq!(58, node_block_size(2));
    assert_eq!(4090, node_block_size(128));
    for degree in [2, 3, 16, 100] {
        assert_eq!(
            node_block_size(degree),
            encode(&Node::new(degree, true)).len()
        );
    }
}

#[test]
fn encoded_layout() {
    let mut n = node_with_keys(2, false, &[1, 2]);
    n.children[0] = 22;
    n.children[1] = 80;
    n.children[2] = -1;
    let block = encode(&n);

    assert_eq!(0, block[0]);
    assert_eq!(2, block[1]);
    assert_eq!(&1i32.to_le_bytes(), &block[2..6]);
    assert_eq!(&2i32.to_le_bytes(), &block[6..10]);
    // First value follows the complete key array
    assert_eq!(&10i32.to_le_bytes(), &block[14..18]);
    // First child follows the complete value array
    assert_eq!(&22i64.to_le_bytes(), &block[26..34]);
    assert_eq!(&(-1i64).to_le_bytes(), &block[42..50]);
}

#[test]
fn decode_encoded_random_nodes() {
    let mut rng = rand::rngs::SmallRng::seed_from_u64(4711);

    for degree in [2, 3, 7, 64, 128] {
        let mut n = Node::new(degree, rng.gen());
        let size = rng.gen_range(0..=n.capacity());
        let mut keys: Vec<i32> = (0..size).map(|_| rng.gen()).collect();
        keys.sort_unstable();
        for (i, k) in keys.into_iter().enumerate() {
            n.insert_at(i, k, rng.gen());
        }
        if !n.is_leaf() {
            for c in n.children.iter_mut().take(size + 1) {
                *c = rng.gen_range(0..i64::MAX);
            }
        }

        let decoded = decode(&encode(&n), degree).unwrap();
        assert_eq!(n.is_leaf(), decoded.is_leaf());
        assert_eq!(n.len(), decoded.len());
        assert_eq!(n.keys(), decoded.keys());
        assert_eq!(n.values(), decoded.values());
        assert_eq!(n.children(), decoded.children());
    }
}

#[test]
fn decode_into_existing_node() {
    let n = node_with_keys(2, true, &[5, 6, 7]);
    let mut target = node_with_keys(2, false, &[1]);
    target.position = 80;

    decode_into(&encode(&n), &mut target).unwrap();
    assert_eq!(80, target.position());
    assert_eq!(true, target.is_leaf());
    assert_eq!(&[5, 6, 7], target.keys());
}

#[test]
fn decode_rejects_short_block() {
    let block = encode(&Node::new(3, true));
    let result = decode(&block, 4);
    assert!(matches!(
        result,
        Err(Error::BlockTooSmall {
            expected: 122,
            actual: 90
        })
    ));
}

#[test]
fn decode_rejects_oversized_node() {
    let mut block = encode(&Node::new(2, true));
    block[1] = 4;
    assert!(matches!(
        decode(&block, 2),
        Err(Error::CorruptNode {
            size: 4,
            capacity: 3,
            ..
        })
    ));
}

#[test]
fn decode_rejects_invalid_degree() {
    let block = encode(&Node::new(2, true));
    assert!(matches!(decode(&block, 0), Err(Error::DegreeTooSmall(0))));
    assert!(matches!(decode(&block, 1), Err(Error::DegreeTooSmall(1))));
    assert!(matches!(decode(&block, 129), Err(Error::DegreeTooLarge(129))));
}

#[test]
fn decode_does_not_validate_key_order() {
    let mut n = Node::new(2, true);
    n.keys[0] = 9;
    n.keys[1] = 3;
    n.size = 2;
    let decoded = decode(&encode(&n), 2).unwrap();
    assert_eq!(&[9, 3], decoded.keys());
}
