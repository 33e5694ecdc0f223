//! Block-workload harness used by the bulk tests (and the fuzz target's
//! sibling in `fuzz/`): random insert/update/delete blocks applied to a
//! tree and a reference oracle side by side, with per-block root
//! retention and interleaved retraction of superseded intermediate
//! roots.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::Sha256;

use crate::{verify_proof, MemStore, SparseMerkleTree};

type Tree = SparseMerkleTree<MemStore, MemStore, Sha256>;
type Oracle = BTreeMap<Vec<u8>, Vec<u8>>;

const OPS_PER_BLOCK: usize = 10;

/// Runs `blocks` blocks of ten operations each, drawn with the given
/// insert:update:delete ratio weights.
///
/// Each operation retires the intermediate root it supersedes: against
/// the previous block's root once one exists, unconditionally otherwise.
/// After every block the whole oracle is checked against the tree, and
/// at the end every retained block root must still serve the exact
/// mapping it was committed with.
fn bulk_operations(blocks: usize, insert: u32, update: u32, delete: u32, seed: u64) {
    let mut tree = Tree::new(MemStore::new(), MemStore::new());
    let mut rng = StdRng::seed_from_u64(seed);
    let max = insert + update + delete;

    let mut live: Oracle = Oracle::new();
    let mut snapshots: Vec<(Vec<u8>, Oracle)> = Vec::with_capacity(blocks);

    for block in 0..blocks {
        for op in 0..OPS_PER_BLOCK {
            let n = rng.gen_range(0..max);
            let old_root = tree.root().to_vec();
            if n < insert {
                let key_len = 16 + rng.gen_range(0..32);
                let key = random_bytes(&mut rng, key_len);
                let value_len = 1 + rng.gen_range(0..64);
                let value = random_bytes(&mut rng, value_len);
                live.insert(key.clone(), value.clone());
                tree.update(&key, &value).expect("insert failed");
                retract(&tree, &key, &old_root, block, op, &snapshots);
            } else if n < insert + update {
                let Some(key) = random_live_key(&mut rng, &live) else {
                    continue;
                };
                let value_len = 1 + rng.gen_range(0..64);
                let value = random_bytes(&mut rng, value_len);
                live.insert(key.clone(), value.clone());
                tree.update(&key, &value).expect("update failed");
                retract(&tree, &key, &old_root, block, op, &snapshots);
            } else {
                let Some(key) = random_live_key(&mut rng, &live) else {
                    continue;
                };
                live.remove(&key);
                tree.delete(&key).expect("delete failed");
                retract(&tree, &key, &old_root, block, op, &snapshots);
            }
        }

        snapshots.push((tree.root().to_vec(), live.clone()));
        check_block(&tree, &live);
    }

    // The root is the placeholder exactly when the mapping is empty.
    assert_eq!(live.is_empty(), tree.root().iter().all(|&b| b == 0));

    check_history(&tree, &snapshots);
}

/// Retires the root superseded by the operation that just ran.
///
/// The first operation of a block supersedes the previous block's
/// retained root, which must stay alive, so it retracts nothing. An
/// operation that left the root unchanged retracts nothing either.
fn retract(
    tree: &Tree,
    key: &[u8],
    old_root: &[u8],
    block: usize,
    op: usize,
    snapshots: &[(Vec<u8>, Oracle)],
) {
    if op == 0 || tree.root() == old_root {
        return;
    }
    if block > 0 {
        tree.remove_path(key, old_root, &snapshots[block - 1].0)
            .expect("remove_path failed");
    } else {
        tree.remove_path_for_root(key, old_root)
            .expect("remove_path_for_root failed");
    }
}

/// Checks the current block: every oracle entry reads back, absent keys
/// read as default, and a few sampled proofs verify.
fn check_block(tree: &Tree, live: &Oracle) {
    for (key, value) in live {
        assert_eq!(&tree.get(key).expect("get failed"), value);
    }
    assert_eq!(
        tree.get(b"never-written-key").expect("get failed"),
        Vec::<u8>::new()
    );

    for (key, value) in live.iter().take(3) {
        let proof = tree.prove(key).expect("prove failed");
        assert!(verify_proof::<Sha256>(&proof, tree.root(), key, value));
    }
    let absent = tree.prove(b"never-written-key").expect("prove failed");
    assert!(verify_proof::<Sha256>(
        &absent,
        tree.root(),
        b"never-written-key",
        b""
    ));
}

/// Checks every retained block root against its mapping snapshot.
fn check_history(tree: &Tree, snapshots: &[(Vec<u8>, Oracle)]) {
    for (root, mapping) in snapshots {
        for (key, value) in mapping {
            assert_eq!(
                &tree.get_from_root(key, root).expect("historical get failed"),
                value,
                "stale read under root {}",
                hex::encode(root)
            );
        }
    }
}

fn random_bytes(rng: &mut StdRng, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf[..]);
    buf
}

fn random_live_key(rng: &mut StdRng, live: &Oracle) -> Option<Vec<u8>> {
    if live.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..live.len());
    live.keys().nth(index).cloned()
}

#[test]
fn bulk_blocks_insert_heavy() {
    // More inserts and updates than deletions.
    for seed in 0..3 {
        bulk_operations(100, 200, 200, 50, 0x517e_ed00 + seed);
    }
}

#[test]
fn bulk_blocks_delete_heavy() {
    // Deletion-heavy traffic keeps collapsing the tree back toward the
    // placeholder.
    for seed in 0..3 {
        bulk_operations(200, 100, 100, 500, 0xde1e_7e00 + seed);
    }
}
