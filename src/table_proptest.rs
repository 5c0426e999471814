#![cfg(test)]

// Property tests for both table families kept inside the crate so they can
// check internal layout after every operation.

use crate::primitive::PrimitiveHashTable;
use crate::strategy::{BuildHasherStrategy, DefaultStrategy, HashingStrategy};
use crate::table::HashTable;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, i32),
    GetOrInsert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    RetainEven,
    Reserve(u8),
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=40).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Put(i, v)),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::GetOrInsert(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            1 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::RetainEven),
            1 => any::<u8>().prop_map(OpI::Reserve),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against std::collections::HashMap, for any
// strategy whose equality is the key's own `Eq`.
fn run_object_ops<S>(
    mut sut: HashTable<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    S: HashingStrategy<Key> + HashingStrategy<str>,
{
    let mut model: HashMap<Key, i32> = HashMap::new();
    for op in ops {
        match op {
            OpI::Put(i, v) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.put(k.clone(), v).unwrap(), model.insert(k, v));
            }
            OpI::GetOrInsert(i, v) => {
                let k = key_from(pool, i);
                let mut ran = false;
                let got = *sut
                    .get_or_insert_with(k.clone(), || {
                        ran = true;
                        v
                    })
                    .unwrap();
                let already = model.contains_key(&k);
                prop_assert_eq!(ran, !already, "default runs only for absent keys");
                prop_assert_eq!(got, *model.entry(k).or_insert(v));
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove(k.0.as_str()), model.remove(&k));
            }
            OpI::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            OpI::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                match (sut.get_mut(&k), model.get_mut(&k)) {
                    (Some(sv), Some(mv)) => {
                        *sv = sv.saturating_add(d);
                        *mv = mv.saturating_add(d);
                    }
                    (None, None) => {}
                    (s, m) => prop_assert!(false, "presence mismatch {:?} vs {:?}", s, m),
                }
            }
            OpI::RetainEven => {
                sut.retain(|_, v| *v % 2 == 0);
                model.retain(|_, v| *v % 2 == 0);
            }
            OpI::Reserve(n) => {
                sut.reserve(usize::from(n)).unwrap();
                let wanted = sut.len() + usize::from(n);
                prop_assert!(wanted <= sut.policy().threshold(sut.capacity()));
            }
            OpI::Iterate => {
                let s: BTreeMap<_, _> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let m: BTreeMap<_, _> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(s, m);
            }
        }
        sut.assert_consistent();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    let drained: BTreeSet<_> = sut.into_iter().map(|(k, _)| k).collect();
    let expected: BTreeSet<_> = model.into_keys().collect();
    prop_assert_eq!(drained, expected);
    Ok(())
}

// Collision variant using a constant hasher to stress chaining.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Few distinct hash values: many chains that split and collapse on resize.
#[derive(Clone, Default)]
struct NarrowBuildHasher;
struct NarrowHasher(u64);
impl BuildHasher for NarrowBuildHasher {
    type Hasher = NarrowHasher;
    fn build_hasher(&self) -> Self::Hasher {
        NarrowHasher(0)
    }
}
impl Hasher for NarrowHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_mul(31).wrapping_add(u64::from(b));
        }
    }
    fn finish(&self) -> u64 {
        self.0 % 5
    }
}

// Property: state-machine equivalence with std HashMap.
// Invariants exercised across random operation sequences:
// - `put` returns the replaced value exactly when the model does.
// - `get_or_insert_with` runs its default only for absent keys.
// - `get`/`contains_key`/borrowed `remove` parity with the model.
// - `retain` and `reserve` keep the table consistent with the model.
// - Every entry sits in the slot its cached hash selects, chains never hold
//   fewer than two entries, and `len` parity holds after each op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_object_ops(HashTable::<Key, i32, DefaultStrategy>::new(), &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_object_ops(HashTable::with_strategy(BuildHasherStrategy(ConstBuildHasher)), &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_narrow_hashes((pool, ops) in arb_scenario()) {
        run_object_ops(HashTable::with_strategy(BuildHasherStrategy(NarrowBuildHasher)), &pool, ops)?;
    }
}

#[derive(Clone, Debug)]
enum PrimOp {
    Put(i64, i32),
    Remove(i64),
    Get(i64),
    Bump(i64),
    Clear,
}

fn arb_prim_ops() -> impl Strategy<Value = Vec<PrimOp>> {
    // Small key range so puts, removes and gets hit the same keys.
    let key = -64i64..64;
    let op = prop_oneof![
        6 => (key.clone(), any::<i32>()).prop_map(|(k, v)| PrimOp::Put(k, v)),
        3 => key.clone().prop_map(PrimOp::Remove),
        2 => key.clone().prop_map(PrimOp::Get),
        2 => key.prop_map(PrimOp::Bump),
        1 => Just(PrimOp::Clear),
    ];
    proptest::collection::vec(op, 1..300)
}

// Property: the primitive table matches a HashMap model, and its chained
// bitmap, overflow side table and occupancy stay in agreement.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_primitive_state_machine(ops in arb_prim_ops()) {
        let mut sut: PrimitiveHashTable<i64, i32> = PrimitiveHashTable::new();
        let mut model: HashMap<i64, i32> = HashMap::new();
        for op in ops {
            match op {
                PrimOp::Put(k, v) => prop_assert_eq!(sut.put(k, v).unwrap(), model.insert(k, v)),
                PrimOp::Remove(k) => prop_assert_eq!(sut.remove(k), model.remove(&k)),
                PrimOp::Get(k) => prop_assert_eq!(sut.get(k), model.get(&k)),
                PrimOp::Bump(k) => {
                    *sut.get_or_insert_with(k, || 0).unwrap() += 1;
                    *model.entry(k).or_insert(0) += 1;
                }
                PrimOp::Clear => {
                    sut.clear();
                    model.clear();
                }
            }
            sut.assert_consistent();
            prop_assert_eq!(sut.len(), model.len());
        }
        let s: BTreeMap<_, _> = sut.iter().map(|(k, v)| (k, *v)).collect();
        let m: BTreeMap<_, _> = model.into_iter().collect();
        prop_assert_eq!(s, m);
    }
}
