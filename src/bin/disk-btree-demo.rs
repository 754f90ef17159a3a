use std::path::PathBuf;

use disk_btree_index::{BtreeConfig, BtreeIndex, Error};

fn main() -> std::result::Result<(), Error> {
    env_logger::init();

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("test.db"));

    let mut tree = BtreeIndex::create(&path, BtreeConfig::default().with_degree(2))?;
    for i in 1..100 {
        tree.insert(i, i)?;
    }
    tree.close()?;

    let tree = BtreeIndex::open(&path, BtreeConfig::default())?;
    match tree.find(53)? {
        Some((node, i)) => {
            println!("{:?}", node);
            println!("Position: {}", i);
        }
        None => println!("Key 53 not found"),
    }
    Ok(())
}
