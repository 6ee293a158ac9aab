#![cfg(test)]

// Property tests for ByteTable kept inside the crate so they can check the
// chunk layout through internal accessors as well as the public API.

use crate::byte_table::{ByteTable, SetOutcome, TableBuilder};
use crate::hash::Fnv1aBuildHasher;
use proptest::prelude::*;
use std::collections::HashMap;

const KEY_SIZE: usize = 3;
const VALUE_SIZE: usize = 5;

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// keys, pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Set(usize, [u8; VALUE_SIZE]),
    Find(usize),
    Overwrite(usize, [u8; VALUE_SIZE]),
    Query([u8; KEY_SIZE]),
    Stats,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<[u8; KEY_SIZE]>, Vec<OpI>)> {
    proptest::collection::vec(any::<[u8; KEY_SIZE]>(), 1..=24).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            4 => (idx.clone(), any::<[u8; VALUE_SIZE]>()).prop_map(|(i, v)| OpI::Set(i, v)),
            2 => idx.clone().prop_map(OpI::Find),
            1 => (idx.clone(), any::<[u8; VALUE_SIZE]>()).prop_map(|(i, v)| OpI::Overwrite(i, v)),
            1 => any::<[u8; KEY_SIZE]>().prop_map(OpI::Query),
            1 => Just(OpI::Stats),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

type Model = HashMap<[u8; KEY_SIZE], [u8; VALUE_SIZE], Fnv1aBuildHasher>;

// Runs one scenario against `sut`, checking it op by op against a std
// HashMap. Returns the model so callers can check teardown accounting.
fn run(sut: &ByteTable, pool: &[[u8; KEY_SIZE]], ops: Vec<OpI>) -> Result<Model, TestCaseError> {
    let mut model = Model::default();
    for op in ops {
        match op {
            OpI::Set(i, v) => {
                let k = pool[i];
                let expected = if model.insert(k, v).is_some() {
                    SetOutcome::Updated
                } else {
                    SetOutcome::Inserted
                };
                prop_assert_eq!(sut.set(&k, &v).expect("sizes match"), expected);
            }
            OpI::Find(i) => {
                let k = pool[i];
                let found = sut.find(&k).expect("sizes match").map(|v| v.to_vec());
                prop_assert_eq!(found, model.get(&k).map(|v| v.to_vec()));
            }
            OpI::Overwrite(i, v) => {
                let k = pool[i];
                match sut.find_mut(&k).expect("sizes match") {
                    Some(mut slot) => {
                        prop_assert!(model.contains_key(&k), "find_mut hit on absent key");
                        slot.copy_from_slice(&v);
                        model.insert(k, v);
                    }
                    None => prop_assert!(!model.contains_key(&k)),
                }
            }
            OpI::Query(k) => {
                prop_assert_eq!(sut.contains_key(&k).expect("sizes match"), model.contains_key(&k));
            }
            OpI::Stats => {
                let stats = sut.chain_stats();
                let capacity = sut.chunk_capacity();
                // Every chunk but a chain's tail is full, so chunks are bounded
                // by entries / capacity plus one partial tail per bucket.
                prop_assert!(stats.chunks <= model.len() / capacity + stats.occupied_buckets);
                prop_assert!(stats.occupied_buckets <= sut.directory_size());
                prop_assert!(stats.longest_chain <= stats.chunks);
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(model)
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - `set` reports Inserted exactly when the key was absent, Updated otherwise.
// - `find`/`contains_key` agree with the model, including for random queries.
// - Writes through `find_mut` are observed by later finds.
// - `len` never counts duplicates; `free` reports the model's size.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let sut = ByteTable::new(KEY_SIZE, VALUE_SIZE).unwrap();
        let model = run(&sut, &pool, ops)?;
        prop_assert_eq!(sut.free(), model.len());
    }
}

// Property: Same state-machine invariants as above, with every key in one
// bucket and two slots per chunk. This stresses chunk linking and the
// hash-then-bytes comparison along long chains.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_single_bucket((pool, ops) in arb_scenario()) {
        let sut = TableBuilder::new(KEY_SIZE, VALUE_SIZE)
            .directory_size(1)
            .chunk_capacity(2)
            .build()
            .unwrap();
        let model = run(&sut, &pool, ops)?;
        let stats = sut.chain_stats();
        prop_assert_eq!(stats.chunks, (model.len() + 1) / 2);
        prop_assert_eq!(sut.free(), model.len());
    }
}

// Property: directory size and chunk capacity change layout, never contents.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_geometry_is_invisible(
        (pool, ops) in arb_scenario(),
        directory_size in 1usize..64,
        chunk_capacity in 1usize..8,
    ) {
        let sut = TableBuilder::new(KEY_SIZE, VALUE_SIZE)
            .directory_size(directory_size)
            .chunk_capacity(chunk_capacity)
            .build()
            .unwrap();
        let model = run(&sut, &pool, ops)?;
        for (k, v) in &model {
            let found = sut.find(k).unwrap().map(|slot| slot.to_vec());
            prop_assert_eq!(found, Some(v.to_vec()));
        }
        prop_assert_eq!(sut.free(), model.len());
    }
}
