// Property tests over the public API.
//
// Property 1: resize equivalence.
//  - Model: std HashMap fed the same puts and removes.
//  - Invariant: after each op the table answers get/len like the model;
//    at the end iteration yields exactly the model's pairs.
//  - Sequences are long enough to force at least three resizes from the
//    minimum capacity.
//
// Property 2: bag counting.
//  - Model: HashMap of counts with zero counts removed.
//  - Invariant: occurrences_of, size and size_distinct match the model;
//    negative counts are rejected without changing anything.
use proptest::prelude::*;
use slot_table::{Error, HashTable, PrimitiveHashBag};
use std::collections::HashMap;

proptest! {
    #![proptest_config(ProptestConfig { cases: 48, .. ProptestConfig::default() })]
    #[test]
    fn prop_resize_equivalence(ops in proptest::collection::vec((any::<bool>(), 0u64..512, any::<u32>()), 64..400)) {
        let mut t: HashTable<u64, u32> = HashTable::with_capacity(0).unwrap();
        let mut model: HashMap<u64, u32> = HashMap::new();
        let mut capacities = vec![t.capacity()];
        for (is_put, k, v) in ops {
            if is_put {
                prop_assert_eq!(t.put(k, v).unwrap(), model.insert(k, v));
            } else {
                prop_assert_eq!(t.remove(&k), model.remove(&k));
            }
            prop_assert_eq!(t.len(), model.len());
            prop_assert_eq!(t.get(&k), model.get(&k));
            if capacities.last() != Some(&t.capacity()) {
                capacities.push(t.capacity());
            }
        }
        let mut pairs: Vec<(u64, u32)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        let mut expected: Vec<(u64, u32)> = model.into_iter().collect();
        pairs.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(pairs, expected);
        prop_assert!(capacities.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn prop_three_resizes_keep_every_key(keys in proptest::collection::hash_set(any::<u64>(), 40..200)) {
        let mut t: HashTable<u64, u64> = HashTable::with_capacity(1).unwrap();
        let start = t.capacity();
        for &k in &keys {
            t.put(k, !k).unwrap();
        }
        prop_assert!(t.capacity() >= start * 8, "fewer than three doublings");
        for &k in &keys {
            prop_assert_eq!(t.get(&k), Some(&!k));
        }
    }

    #[test]
    fn prop_bag_counting(ops in proptest::collection::vec((0u8..16, -3i64..6, any::<bool>()), 1..200)) {
        let mut bag: PrimitiveHashBag<u8> = PrimitiveHashBag::new();
        let mut model: HashMap<u8, usize> = HashMap::new();
        for (k, n, adding) in ops {
            let result = if adding {
                bag.add_occurrences(k, n).map(|_| ())
            } else {
                bag.remove_occurrences(&k, n).map(|_| ())
            };
            if n < 0 {
                prop_assert!(matches!(result, Err(Error::IllegalArgument(_))));
            } else {
                prop_assert!(result.is_ok());
                let n = n as usize;
                if adding {
                    if n > 0 {
                        *model.entry(k).or_insert(0) += n;
                    }
                } else if let Some(c) = model.get_mut(&k) {
                    if *c <= n && n > 0 {
                        model.remove(&k);
                    } else {
                        *c -= n;
                    }
                }
            }
            prop_assert_eq!(bag.occurrences_of(&k), model.get(&k).copied().unwrap_or(0));
            prop_assert_eq!(bag.size_distinct(), model.len());
            prop_assert_eq!(bag.size(), model.values().sum::<usize>());
        }
    }
}
