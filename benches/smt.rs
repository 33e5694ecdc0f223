//! Tree operation benchmarks.
//!
//! Measures bulk insertion, point reads, proof generation plus
//! verification, and deletion against the in-memory store, all with
//! deterministic seeding.
//!
//! ```bash
//! cargo bench --bench smt
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use merklemap::{verify_proof, MemStore, SparseMerkleTree};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::Sha256;
use std::hint::black_box;

type Tree = SparseMerkleTree<MemStore, MemStore, Sha256>;

/// Generates `count` random key-value pairs with realistic sizes.
fn gen_pairs(count: usize, rng: &mut StdRng) -> Vec<(Vec<u8>, Vec<u8>)> {
    (0..count)
        .map(|_| {
            let mut key = vec![0u8; 16 + rng.gen_range(0..32)];
            rng.fill(&mut key[..]);
            let mut value = vec![0u8; 1 + rng.gen_range(0..64)];
            rng.fill(&mut value[..]);
            (key, value)
        })
        .collect()
}

/// Builds a tree holding the given pairs.
fn build_tree(pairs: &[(Vec<u8>, Vec<u8>)]) -> Tree {
    let mut tree = Tree::new(MemStore::new(), MemStore::new());
    for (key, value) in pairs {
        tree.update(key, value).expect("update failed");
    }
    tree
}

fn benchmark_updates(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);

    c.bench_function("smt insert 1k keys", |b| {
        b.iter_batched(
            || gen_pairs(1_000, &mut rng),
            |pairs| black_box(build_tree(&pairs)),
            BatchSize::SmallInput,
        );
    });

    let pairs = gen_pairs(10_000, &mut rng);
    let tree = build_tree(&pairs);
    c.bench_function("smt get from 10k-key tree", |b| {
        let mut i = 0;
        b.iter(|| {
            let (key, _) = &pairs[i % pairs.len()];
            i += 1;
            black_box(tree.get(key).expect("get failed"))
        });
    });

    c.bench_function("smt delete 1k keys", |b| {
        b.iter_batched(
            || {
                let pairs = gen_pairs(1_000, &mut rng);
                (build_tree(&pairs), pairs)
            },
            |(mut tree, pairs)| {
                for (key, _) in &pairs {
                    tree.delete(key).expect("delete failed");
                }
                black_box(tree)
            },
            BatchSize::SmallInput,
        );
    });
}

fn benchmark_proofs(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let pairs = gen_pairs(10_000, &mut rng);
    let tree = build_tree(&pairs);

    c.bench_function("smt prove and verify", |b| {
        let mut i = 0;
        b.iter(|| {
            let (key, value) = &pairs[i % pairs.len()];
            i += 1;
            let proof = tree.prove(key).expect("prove failed");
            assert!(verify_proof::<Sha256>(&proof, tree.root(), key, value));
            black_box(proof)
        });
    });
}

criterion_group!(benches, benchmark_updates, benchmark_proofs);
criterion_main!(benches);
