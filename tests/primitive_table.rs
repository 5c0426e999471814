// PrimitiveHashTable integration suite.
//
// Core invariants exercised:
// - Float keys follow bit-pattern identity: NaN is retrievable, 0.0 and
//   -0.0 are distinct keys.
// - Every key kind, including the all-zero key, is storable.
// - Resize keeps every entry, checked against a reference model.
// - Chains collapse back into the primitive arrays without losing entries.
use slot_table::primitive::{DoubleTable, FloatTable, IntTable, LongTable};
use slot_table::policy::MAX_CAPACITY;
use slot_table::{Error, PrimitiveHashTable};
use std::collections::HashMap;
use test_log::test;

// Test: NaN as a key.
// Verifies: get(NaN) after put(NaN, v) returns v.
#[test]
fn nan_key_is_retrievable() {
    let mut t: DoubleTable<&str> = PrimitiveHashTable::new();
    t.put(f64::NAN, "nan").unwrap();
    assert_eq!(t.get(f64::NAN), Some(&"nan"));
    assert!(t.contains_key(f64::NAN));
    assert_eq!(t.remove(f64::NAN), Some("nan"));
}

// Test: signed zeros.
// Verifies: 0.0 and -0.0 are stored under separate keys.
#[test]
fn signed_zeros_are_distinct() {
    let mut t: FloatTable<i32> = PrimitiveHashTable::new();
    t.put(0.0, 1).unwrap();
    t.put(-0.0, 2).unwrap();
    assert_eq!(t.len(), 2);
    assert_eq!(t.get(0.0), Some(&1));
    assert_eq!(t.get(-0.0), Some(&2));
}

// Test: resize correctness for integer keys.
// Verifies: the table matches a HashMap after thousands of puts and removes
// spanning several doublings.
#[test]
fn matches_reference_across_resizes() {
    let mut t: LongTable<u64> = PrimitiveHashTable::with_capacity(2).unwrap();
    let mut model = HashMap::new();
    let start = t.capacity();
    let mut x: u64 = 0x9E37_79B9_7F4A_7C15;
    for i in 0..4000u64 {
        x = x.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        let k = (x >> 40) as i64 - (1 << 23);
        if i % 5 == 4 {
            assert_eq!(t.remove(k), model.remove(&k));
        } else {
            assert_eq!(t.put(k, i).unwrap(), model.insert(k, i));
        }
    }
    assert!(t.capacity() >= start * 8);
    assert_eq!(t.len(), model.len());
    for (k, v) in &model {
        assert_eq!(t.get(*k), Some(v));
    }
    let seen: HashMap<i64, u64> = t.iter().map(|(k, v)| (k, *v)).collect();
    assert_eq!(seen, model);
}

// Test: every key kind stores its zero value.
#[test]
fn zero_keys_for_every_kind() {
    let mut bytes = PrimitiveHashTable::<i8, u8>::new();
    bytes.put(0, 1).unwrap();
    let mut chars = PrimitiveHashTable::<char, u8>::new();
    chars.put('\0', 2).unwrap();
    let mut flags = PrimitiveHashTable::<bool, u8>::new();
    flags.put(false, 3).unwrap();
    let mut words = PrimitiveHashTable::<usize, u8>::new();
    words.put(0, 4).unwrap();
    assert_eq!(bytes.get(0), Some(&1));
    assert_eq!(chars.get('\0'), Some(&2));
    assert_eq!(flags.get(false), Some(&3));
    assert_eq!(words.get(0), Some(&4));
}

// Test: value mutation and lazy insertion.
#[test]
fn counting_with_get_or_insert() {
    let mut t: IntTable<u32> = PrimitiveHashTable::new();
    for k in [1, 2, 1, 3, 1, 2] {
        *t.get_or_insert_with(k, || 0).unwrap() += 1;
    }
    assert_eq!(t.get(1), Some(&3));
    assert_eq!(t.get(2), Some(&2));
    if let Some(v) = t.get_mut(3) {
        *v = 30;
    }
    let mut values: Vec<u32> = t.values().copied().collect();
    values.sort_unstable();
    assert_eq!(values, vec![2, 3, 30]);
}

// Test: clear keeps capacity and empties the table.
#[test]
fn clear_then_reuse() {
    let mut t: IntTable<String> = PrimitiveHashTable::new();
    for k in 0..100 {
        t.put(k, k.to_string()).unwrap();
    }
    let capacity = t.capacity();
    t.clear();
    assert!(t.is_empty());
    assert_eq!(t.capacity(), capacity);
    assert_eq!(t.get(5), None);
    t.put(5, "five".to_string()).unwrap();
    assert_eq!(t.keys().collect::<Vec<_>>(), vec![5]);
}

// Test: unrepresentable capacities.
#[test]
fn impossible_capacity_is_rejected() {
    let err = PrimitiveHashTable::<i64, u64>::with_capacity(usize::MAX).unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded { .. }));
    let mut t = PrimitiveHashTable::<i64, u64>::new();
    assert!(t.reserve(usize::MAX).is_err());
    assert_eq!(t.capacity(), 0);
    t.reserve(100).unwrap();
    let capacity = t.capacity();
    for k in 0..100 {
        t.put(k, 0).unwrap();
    }
    assert_eq!(t.capacity(), capacity);
}

// Test: growth that cannot be allocated.
// Assumes: the policy accepts the capacity but the slot arrays do not fit in
// memory.
// Verifies: CapacityExceeded, same capacity, every entry still present.
#[test]
fn failed_resize_keeps_prior_table() {
    let mut t: LongTable<[u8; 64]> = PrimitiveHashTable::new();
    let keys: Vec<i64> = (0..20).map(|k| k << 40).chain(0..20).collect();
    for &k in &keys {
        t.put(k, [k as u8; 64]).unwrap();
    }
    let before = t.capacity();
    assert!(matches!(
        t.reserve(MAX_CAPACITY / 2),
        Err(Error::CapacityExceeded { .. })
    ));
    assert_eq!(t.capacity(), before);
    assert_eq!(t.len(), 39);
    for &k in &keys {
        assert_eq!(t.get(k), Some(&[k as u8; 64]));
    }
    t.put(-1, [0; 64]).unwrap();
    assert_eq!(t.len(), 40);
}
