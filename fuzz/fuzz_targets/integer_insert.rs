#![no_main]
use libfuzzer_sys::fuzz_target;

use disk_btree_index::{node_block_size, BtreeConfig, BtreeIndex, Error, MemoryBlockFile};
use std::collections::BTreeMap;

fuzz_target!(|data: (Vec<(i32, i32)>, u8)| {
    let degree = data.1.clamp(2, 128);
    let mut m = BTreeMap::default();
    let store = MemoryBlockFile::create(degree, node_block_size(degree) as i16).unwrap();
    let mut fixture = BtreeIndex::with_store(store, BtreeConfig::default()).unwrap();

    // Duplicate keys would be stored twice, only insert the first occurrence
    for (key, value) in data.0 {
        if !m.contains_key(&key) {
            m.insert(key, value);
            fixture.insert(key, value).unwrap();
        }
    }

    // get query for each entry
    for (k, v1) in m.iter() {
        assert!(fixture.contains_key(*k).unwrap());
        let v2 = fixture.get(*k).unwrap();
        assert_eq!(Some(*v1), v2);
    }

    // Check that the maps are equal when iterating over all entries
    let m: Vec<_> = m.into_iter().collect();
    let fixture_result: Result<Vec<_>, Error> = fixture.range(..).unwrap().collect();
    let fixture_result = fixture_result.unwrap();

    assert_eq!(m, fixture_result);
});
