use criterion::{criterion_group, criterion_main, Criterion};
use disk_btree_index::{node_block_size, BtreeConfig, BtreeIndex, MemoryBlockFile};
use fake::{Fake, Faker};

fn memory_index(degree: u8, n_entries: usize) -> BtreeIndex<MemoryBlockFile> {
    let store = MemoryBlockFile::create(degree, node_block_size(degree) as i16).unwrap();
    let mut btree = BtreeIndex::with_store(store, BtreeConfig::default()).unwrap();
    for _ in 0..n_entries {
        btree.insert(Faker.fake(), Faker.fake()).unwrap();
    }
    btree
}

fn insertion(c: &mut Criterion) {
    let mut g = c.benchmark_group("insert into 10.000 entries");

    for degree in [2, 16, 128] {
        g.bench_function(format!("memory, degree {}", degree), |b| {
            let mut btree = memory_index(degree, 10_000);
            let key: i32 = Faker.fake();
            b.iter(|| {
                btree.insert(key, 42).unwrap();
            })
        });
    }

    g.bench_function("file, degree 16", |b| {
        let dir = tempfile::tempdir().unwrap();
        let mut btree = BtreeIndex::create(
            &dir.path().join("bench.db"),
            BtreeConfig::default().with_degree(16),
        )
        .unwrap();
        for _ in 0..10_000 {
            btree.insert(Faker.fake(), Faker.fake()).unwrap();
        }
        let key: i32 = Faker.fake();
        b.iter(|| {
            btree.insert(key, 42).unwrap();
        })
    });

    g.finish()
}

fn search(c: &mut Criterion) {
    let mut g = c.benchmark_group("search in 10.000 entries");

    for degree in [2, 16, 128] {
        g.bench_function(format!("existing key, degree {}", degree), |b| {
            let mut btree = memory_index(degree, 10_000);
            let mut search_key: i32 = Faker.fake();
            while btree.contains_key(search_key).unwrap() {
                search_key = Faker.fake();
            }
            let search_value: i32 = Faker.fake();
            btree.insert(search_key, search_value).unwrap();

            b.iter(|| {
                let found = btree.get(search_key).unwrap().unwrap();
                assert_eq!(search_value, found);
            })
        });
    }

    g.finish()
}

criterion_group!(benches, insertion, search);
criterion_main!(benches);
