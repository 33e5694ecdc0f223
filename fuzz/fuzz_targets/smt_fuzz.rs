#![no_main]

//! Fuzzes the tree against a reference oracle.
//!
//! Each input byte is one operation on a small pooled key space:
//! low values insert or update, mid values delete, high values prove
//! and verify. Operations are grouped into blocks; each block's root is
//! retained and superseded intermediate roots are retracted, so the
//! multi-version paths get fuzzed alongside the mutation engine.

use std::collections::BTreeMap;

use libfuzzer_sys::fuzz_target;
use merklemap::{verify_proof, MemStore, SparseMerkleTree};
use sha2::Sha256;

type Tree = SparseMerkleTree<MemStore, MemStore, Sha256>;
type Oracle = BTreeMap<Vec<u8>, Vec<u8>>;

const KEY_POOL_SIZE: u8 = 64;
const OPS_PER_BLOCK: usize = 10;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let mut tree = Tree::new(MemStore::new(), MemStore::new());
    let mut oracle = Oracle::new();
    let mut snapshots: Vec<(Vec<u8>, Oracle)> = Vec::new();

    for (block, ops) in data.chunks(OPS_PER_BLOCK).enumerate() {
        for (op_index, &op) in ops.iter().enumerate() {
            let key = format!("key_{:02x}", op % KEY_POOL_SIZE).into_bytes();
            let old_root = tree.root().to_vec();

            match op {
                0..=159 => {
                    let value = vec![op, op_index as u8 + 1];
                    oracle.insert(key.clone(), value.clone());
                    tree.update(&key, &value).expect("update failed");
                }
                160..=223 => {
                    oracle.remove(&key);
                    tree.delete(&key).expect("delete failed");
                }
                _ => {
                    let proof = tree.prove(&key).expect("prove failed");
                    let expected = oracle.get(&key).cloned().unwrap_or_default();
                    assert!(verify_proof::<Sha256>(
                        &proof,
                        tree.root(),
                        &key,
                        &expected
                    ));
                    continue;
                }
            }

            // Retire the superseded intermediate root, keeping the
            // previous block's retained root intact.
            if op_index > 0 && tree.root() != old_root.as_slice() {
                if let Some((keep, _)) = snapshots.last() {
                    tree.remove_path(&key, &old_root, keep)
                        .expect("remove_path failed");
                } else {
                    tree.remove_path_for_root(&key, &old_root)
                        .expect("remove_path_for_root failed");
                }
            }
        }
        snapshots.push((tree.root().to_vec(), oracle.clone()));
    }

    // Every oracle entry reads back under the final root...
    for (key, value) in &oracle {
        assert_eq!(&tree.get(key).expect("get failed"), value);
    }
    assert_eq!(oracle.is_empty(), tree.root().iter().all(|&b| b == 0));

    // ...and every retained block root still serves its own snapshot.
    for (root, mapping) in &snapshots {
        for (key, value) in mapping {
            assert_eq!(
                &tree.get_from_root(key, root).expect("historical get failed"),
                value
            );
        }
    }
});
