//! PrimitiveHashTable: the unboxed twin of [`HashTable`](crate::HashTable).
//!
//! Storage
//! - Keys live in a primitive array and values in a parallel array; a
//!   per-slot occupancy bitmap says which slots hold a pair, since no key
//!   value is free to serve as an "empty" marker.
//! - Slots that overflow move their keys into a [`ChainedBucket`] kept in a
//!   side table keyed by slot index, with a second bitmap marking chained
//!   slots. Chains are rare, so the primary arrays stay purely primitive.
//!
//! Key identity is [`BitPatternStrategy`]: floats compare by bit pattern,
//! so NaN is a stable key and `0.0`/`-0.0` are different keys.
//!
//! Resize follows the same two-pass, build-then-swap discipline as the
//! object table.

mod bitmap;
mod key;
mod slots;

pub use key::{BitPatternStrategy, PrimitiveKey};

use self::bitmap::OccupancyBitmap;
use self::slots::PrimitiveSlots;
use crate::chain::{ChainedBucket, Entry, INITIAL_CHAIN_CAPACITY};
use crate::error::{Error, Result};
use crate::policy::{slot_index, ResizePolicy};
use crate::strategy::HashingStrategy;
use core::fmt;
use core::iter::FusedIterator;
use core::mem;
use rustc_hash::FxBuildHasher;

const STRATEGY: BitPatternStrategy = BitPatternStrategy;

type OverflowMap<K, V> = hashbrown::HashMap<usize, ChainedBucket<K, V>, FxBuildHasher>;

#[derive(Clone, Copy, Debug)]
enum Location {
    Direct(usize),
    Chained(usize, usize),
}

/// Hash table with unboxed primitive keys.
pub struct PrimitiveHashTable<K, V> {
    policy: ResizePolicy,
    slots: PrimitiveSlots<K, V>,
    chained: OccupancyBitmap,
    overflow: OverflowMap<K, V>,
    len: usize,
    threshold: usize,
}

/// `i8` keys.
pub type ByteTable<V> = PrimitiveHashTable<i8, V>;
/// `i16` keys.
pub type ShortTable<V> = PrimitiveHashTable<i16, V>;
/// `i32` keys.
pub type IntTable<V> = PrimitiveHashTable<i32, V>;
/// `i64` keys.
pub type LongTable<V> = PrimitiveHashTable<i64, V>;
/// `f32` keys, compared by bit pattern.
pub type FloatTable<V> = PrimitiveHashTable<f32, V>;
/// `f64` keys, compared by bit pattern.
pub type DoubleTable<V> = PrimitiveHashTable<f64, V>;
/// `bool` keys.
pub type BooleanTable<V> = PrimitiveHashTable<bool, V>;
/// `char` keys.
pub type CharTable<V> = PrimitiveHashTable<char, V>;

impl<K: PrimitiveKey, V> Default for PrimitiveHashTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PrimitiveKey, V> PrimitiveHashTable<K, V> {
    /// Empty table. Allocates on first put.
    pub fn new() -> Self {
        Self {
            policy: ResizePolicy::DEFAULT,
            slots: PrimitiveSlots::unallocated(),
            chained: OccupancyBitmap::empty(),
            overflow: OverflowMap::default(),
            len: 0,
            threshold: 0,
        }
    }

    /// Table pre-sized for `expected` keys.
    pub fn with_capacity(expected: usize) -> Result<Self> {
        Self::with_policy(ResizePolicy::DEFAULT, expected)
    }

    pub fn with_policy(policy: ResizePolicy, expected: usize) -> Result<Self> {
        let capacity = policy.capacity_for(expected)?;
        Ok(Self {
            policy,
            slots: PrimitiveSlots::try_with_capacity(capacity)?,
            chained: OccupancyBitmap::try_with_len(capacity)?,
            overflow: OverflowMap::default(),
            len: 0,
            threshold: policy.threshold(capacity),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn policy(&self) -> ResizePolicy {
        self.policy
    }

    #[inline]
    fn mask(&self) -> usize {
        self.slots.capacity() - 1
    }

    #[inline]
    fn chain(&self, idx: usize) -> Option<&ChainedBucket<K, V>> {
        if self.chained.get(idx) {
            self.overflow.get(&idx)
        } else {
            None
        }
    }

    fn locate(&self, hash: u64, key: K) -> Option<Location> {
        if self.len == 0 {
            return None;
        }
        let idx = slot_index(hash, self.mask());
        if let Some(chain) = self.chain(idx) {
            return chain
                .find_equal(hash, &key, &STRATEGY)
                .map(|pos| Location::Chained(idx, pos));
        }
        let stored = self.slots.key(idx)?;
        STRATEGY
            .equals(&stored, &key)
            .then_some(Location::Direct(idx))
    }

    fn value_at(&self, loc: Location) -> Option<&V> {
        match loc {
            Location::Direct(idx) => self.slots.get(idx).map(|(_, v)| v),
            Location::Chained(idx, pos) => self.chain(idx)?.get(pos).map(|e| &e.value),
        }
    }

    fn value_at_mut(&mut self, loc: Location) -> Option<&mut V> {
        match loc {
            Location::Direct(idx) => self.slots.get_mut(idx).map(|(_, v)| v),
            Location::Chained(idx, pos) => self
                .overflow
                .get_mut(&idx)?
                .get_mut(pos)
                .map(|e| &mut e.value),
        }
    }

    pub fn get(&self, key: K) -> Option<&V> {
        let loc = self.locate(STRATEGY.hash_code(&key), key)?;
        self.value_at(loc)
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        let loc = self.locate(STRATEGY.hash_code(&key), key)?;
        self.value_at_mut(loc)
    }

    pub fn contains_key(&self, key: K) -> bool {
        self.locate(STRATEGY.hash_code(&key), key).is_some()
    }

    /// Store `value` under `key`, returning the value it replaced.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>> {
        let hash = STRATEGY.hash_code(&key);
        if let Some(loc) = self.locate(hash, key) {
            if let Some(slot) = self.value_at_mut(loc) {
                return Ok(Some(mem::replace(slot, value)));
            }
        }
        self.insert_absent(hash, key, value)?;
        Ok(None)
    }

    /// Value for `key`, inserting `default()` first when the key is absent.
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> Result<&mut V>
    where
        F: FnOnce() -> V,
    {
        let hash = STRATEGY.hash_code(&key);
        let loc = match self.locate(hash, key) {
            Some(loc) => loc,
            None => self.insert_absent(hash, key, default())?,
        };
        Ok(self.value_at_mut(loc).expect("located entry must exist"))
    }

    fn insert_absent(&mut self, hash: u64, key: K, value: V) -> Result<Location> {
        if self.len >= self.threshold {
            let capacity = self.policy.grow(self.capacity(), self.len + 1)?;
            self.rehash(capacity)?;
        }
        let idx = slot_index(hash, self.mask());
        let loc = if self.chained.get(idx) {
            let chain = self
                .overflow
                .get_mut(&idx)
                .expect("chained slot has an overflow bucket");
            chain.append(Entry { hash, key, value })?;
            Location::Chained(idx, chain.len() - 1)
        } else if self.slots.is_occupied(idx) {
            self.overflow
                .try_reserve(1)
                .map_err(|_| Error::capacity(self.overflow.len() + 1))?;
            let mut chain = ChainedBucket::try_with_capacity(INITIAL_CHAIN_CAPACITY)?;
            if let Some((k, v)) = self.slots.take(idx) {
                chain.push_reserved(Entry {
                    hash: STRATEGY.hash_code(&k),
                    key: k,
                    value: v,
                });
            }
            chain.push_reserved(Entry { hash, key, value });
            self.overflow.insert(idx, chain);
            self.chained.set(idx);
            Location::Chained(idx, 1)
        } else {
            self.slots.insert(idx, key, value);
            Location::Direct(idx)
        };
        self.len += 1;
        Ok(loc)
    }

    pub fn remove(&mut self, key: K) -> Option<V> {
        let hash = STRATEGY.hash_code(&key);
        let value = match self.locate(hash, key)? {
            Location::Direct(idx) => self.slots.take(idx)?.1,
            Location::Chained(idx, pos) => {
                let chain = self.overflow.get_mut(&idx)?;
                let removed = chain.remove_compact(pos);
                if let Some(survivor) = chain.try_collapse() {
                    self.overflow.remove(&idx);
                    self.chained.unset(idx);
                    self.slots.insert(idx, survivor.key, survivor.value);
                }
                removed.value
            }
        };
        self.len -= 1;
        Some(value)
    }

    /// Make room for `additional` more keys without further growth.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let required = self
            .len
            .checked_add(additional)
            .ok_or_else(|| Error::capacity(usize::MAX))?;
        if required <= self.threshold && self.capacity() > 0 {
            return Ok(());
        }
        let capacity = self.policy.capacity_for(required)?.max(self.capacity());
        if capacity == self.capacity() {
            return Ok(());
        }
        self.rehash(capacity)
    }

    /// Remove every entry, keeping the allocated slots.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.chained.clear();
        self.overflow.clear();
        self.len = 0;
    }

    /// Apply `f` to every `(key, value)` pair, in the same order as
    /// [`iter`](Self::iter).
    pub fn for_each_value_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(K, &mut V),
    {
        for idx in 0..self.slots.capacity() {
            if let Some((k, v)) = self.slots.get_mut(idx) {
                f(k, v);
            } else if self.chained.get(idx) {
                if let Some(chain) = self.overflow.get_mut(&idx) {
                    for e in chain.entries_mut() {
                        f(e.key, &mut e.value);
                    }
                }
            }
        }
    }

    /// Re-slot every pair into arrays of `new_capacity` slots. See
    /// `HashTable::rehash` for why only old chains can produce new chains.
    fn rehash(&mut self, new_capacity: usize) -> Result<()> {
        debug_assert!(new_capacity.is_power_of_two());
        debug_assert!(new_capacity >= self.capacity());
        let new_mask = new_capacity - 1;
        let slots = PrimitiveSlots::try_with_capacity(new_capacity)?;
        let mut chained = OccupancyBitmap::try_with_len(new_capacity)?;
        let mut overflow = OverflowMap::default();

        let chained_entries: usize = self.overflow.values().map(ChainedBucket::len).sum();
        overflow
            .try_reserve(chained_entries / 2)
            .map_err(|_| Error::capacity(chained_entries / 2))?;
        for chain in self.overflow.values() {
            for entry in chain.entries() {
                let idx = slot_index(entry.hash, new_mask);
                if chained.get(idx) {
                    continue;
                }
                let group = chain
                    .entries()
                    .iter()
                    .filter(|e| slot_index(e.hash, new_mask) == idx)
                    .count();
                if group > 1 {
                    let split = ChainedBucket::try_with_capacity(group.max(INITIAL_CHAIN_CAPACITY))?;
                    overflow.insert(idx, split);
                    chained.set(idx);
                }
            }
        }

        log::trace!(
            "rehashing {} primitive entries: {} -> {} slots",
            self.len,
            self.capacity(),
            new_capacity
        );
        let mut old_slots = mem::replace(&mut self.slots, slots);
        let old_overflow = mem::replace(&mut self.overflow, overflow);
        self.chained = chained;
        for (key, value) in old_slots.drain() {
            let hash = STRATEGY.hash_code(&key);
            self.place(Entry { hash, key, value });
        }
        for (_, chain) in old_overflow {
            for entry in chain.into_entries() {
                self.place(entry);
            }
        }
        self.threshold = self.policy.threshold(new_capacity);
        Ok(())
    }

    /// Rehash placement into slots prepared by the first pass of `rehash`.
    fn place(&mut self, entry: Entry<K, V>) {
        let idx = slot_index(entry.hash, self.mask());
        if self.chained.get(idx) {
            if let Some(chain) = self.overflow.get_mut(&idx) {
                chain.push_reserved(entry);
                return;
            }
        }
        self.slots.insert(idx, entry.key, entry.value);
    }

    /// Iterate `(key, value)` pairs; a slot's chain is exhausted before the
    /// next slot.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            table: self,
            next_slot: 0,
            chain: Default::default(),
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }
}

impl<K: PrimitiveKey, V: Clone> Clone for PrimitiveHashTable<K, V> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy,
            slots: self.slots.clone(),
            chained: self.chained.clone(),
            overflow: self.overflow.clone(),
            len: self.len,
            threshold: self.threshold,
        }
    }
}

impl<K: PrimitiveKey, V: fmt::Debug> fmt::Debug for PrimitiveHashTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over `(K, &V)` pairs of a [`PrimitiveHashTable`].
pub struct Iter<'a, K, V> {
    table: &'a PrimitiveHashTable<K, V>,
    next_slot: usize,
    chain: core::slice::Iter<'a, Entry<K, V>>,
    remaining: usize,
}

impl<'a, K: PrimitiveKey, V> Iterator for Iter<'a, K, V> {
    type Item = (K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.chain.next() {
                self.remaining -= 1;
                return Some((e.key, &e.value));
            }
            if self.remaining == 0 || self.next_slot >= self.table.capacity() {
                return None;
            }
            let idx = self.next_slot;
            self.next_slot += 1;
            if let Some(pair) = self.table.slots.get(idx) {
                self.remaining -= 1;
                return Some(pair);
            }
            if let Some(chain) = self.table.chain(idx) {
                self.chain = chain.entries().iter();
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: PrimitiveKey, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K: PrimitiveKey, V> FusedIterator for Iter<'_, K, V> {}

impl<'a, K: PrimitiveKey, V> IntoIterator for &'a PrimitiveHashTable<K, V> {
    type Item = (K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
impl<K: PrimitiveKey, V> PrimitiveHashTable<K, V> {
    pub(crate) fn chained_slots(&self) -> usize {
        self.overflow.len()
    }

    /// Panics unless chained slots and direct slots are disjoint, every
    /// chain has at least two entries in the right slot, and `len` matches.
    pub(crate) fn assert_consistent(&self) {
        let mut counted = 0;
        for idx in 0..self.capacity() {
            let chained = self.chained.get(idx);
            assert_eq!(chained, self.overflow.contains_key(&idx));
            if chained {
                assert!(!self.slots.is_occupied(idx));
            }
            if let Some(key) = self.slots.key(idx) {
                assert_eq!(slot_index(STRATEGY.hash_code(&key), self.mask()), idx);
                counted += 1;
            }
        }
        for (&idx, chain) in &self.overflow {
            assert!(chain.len() >= 2, "chain at {idx} should have collapsed");
            for e in chain.entries() {
                assert_eq!(slot_index(e.hash, self.mask()), idx);
            }
            counted += chain.len();
        }
        assert_eq!(counted, self.len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    /// Invariant: read-your-write for integer keys, including zero, which
    /// is also the filler of empty key slots.
    #[test]
    fn zero_key_is_not_empty() {
        let mut t: IntTable<&str> = PrimitiveHashTable::new();
        assert_eq!(t.get(0), None);
        t.put(0, "zero").unwrap();
        assert_eq!(t.get(0), Some(&"zero"));
        assert!(t.contains_key(0));
        assert_eq!(t.remove(0), Some("zero"));
        assert!(!t.contains_key(0));
        assert!(t.is_empty());
    }

    /// Invariant: NaN is a retrievable key and signed zeros are two keys.
    #[test]
    fn float_bit_pattern_keys() {
        let mut t: DoubleTable<i32> = PrimitiveHashTable::new();
        t.put(f64::NAN, 1).unwrap();
        assert_eq!(t.get(f64::NAN), Some(&1));
        t.put(0.0, 1).unwrap();
        t.put(-0.0, 2).unwrap();
        assert_eq!(t.get(0.0), Some(&1));
        assert_eq!(t.get(-0.0), Some(&2));
        assert_eq!(t.len(), 3);

        let mut f: FloatTable<u8> = PrimitiveHashTable::new();
        f.put(f32::NAN, 9).unwrap();
        assert_eq!(f.put(f32::NAN, 10).unwrap(), Some(9));
        assert_eq!(f.len(), 1);
    }

    /// Invariant: bool tables hold at most two keys.
    #[test]
    fn boolean_keys() {
        let mut t: BooleanTable<u32> = PrimitiveHashTable::new();
        t.put(true, 1).unwrap();
        t.put(false, 2).unwrap();
        t.put(true, 3).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(true), Some(&3));
        assert_eq!(t.get(false), Some(&2));
    }

    /// Invariant: every key survives many resizes, and chains created along
    /// the way stay consistent with the chained bitmap.
    #[test]
    fn survives_resizes() {
        let mut t: LongTable<i64> = PrimitiveHashTable::new();
        for i in 0..5000i64 {
            t.put(i * 7919, -i).unwrap();
        }
        assert_eq!(t.len(), 5000);
        for i in 0..5000i64 {
            assert_eq!(t.get(i * 7919), Some(&-i));
        }
        assert_eq!(t.iter().count(), 5000);
        let marked = (0..t.capacity()).filter(|&i| t.chained.get(i)).count();
        assert_eq!(t.chained_slots(), marked);
        assert!((0..t.capacity()).all(|i| !(t.chained.get(i) && t.slots.is_occupied(i))));
    }

    /// Invariant: collisions chain, and removing down to one key collapses
    /// the chain back into the primitive arrays.
    #[test]
    fn chain_collapse_restores_direct_slot() {
        let mut t: LongTable<u8> = PrimitiveHashTable::with_capacity(4).unwrap();
        let mask = t.mask();
        let base = STRATEGY.hash_code(&1i64);
        // Find a second key landing on the same slot as 1.
        let other = (2i64..)
            .find(|k| slot_index(STRATEGY.hash_code(k), mask) == slot_index(base, mask))
            .unwrap();
        t.put(1, 10).unwrap();
        t.put(other, 20).unwrap();
        assert_eq!(t.chained_slots(), 1);

        assert_eq!(t.remove(1), Some(10));
        assert_eq!(t.chained_slots(), 0);
        assert_eq!(t.get(other), Some(&20));
        assert_eq!(t.len(), 1);
    }

    /// Invariant: iteration yields each pair once with an exact length.
    #[test]
    fn iteration_is_exact() {
        let mut t: CharTable<usize> = PrimitiveHashTable::new();
        for (i, c) in "hashing".chars().enumerate() {
            t.put(c, i).unwrap();
        }
        let it = t.iter();
        assert_eq!(it.len(), 6);
        let mut keys: Vec<char> = t.keys().collect();
        keys.sort();
        assert_eq!(keys, vec!['a', 'g', 'h', 'i', 'n', 's']);
    }

    /// Invariant: for_each_value_mut reaches direct and chained entries.
    #[test]
    fn for_each_value_mut_reaches_all() {
        let mut t: ShortTable<i32> = PrimitiveHashTable::new();
        for k in 0..200i16 {
            t.put(k, 1).unwrap();
        }
        t.for_each_value_mut(|k, v| *v += i32::from(k));
        for k in 0..200i16 {
            assert_eq!(t.get(k), Some(&(1 + i32::from(k))));
        }
    }

    /// Invariant: for_each_value_mut walks pairs in iteration order, a
    /// slot's chain before the next slot.
    #[test]
    fn for_each_value_mut_follows_iter_order() {
        let mut t: LongTable<u32> = PrimitiveHashTable::with_capacity(4).unwrap();
        let mask = t.mask();
        let slot_of = |k: &i64| slot_index(STRATEGY.hash_code(k), mask);
        let target = slot_of(&1);
        let partners: Vec<i64> = (2i64..).filter(|k| slot_of(k) == target).take(2).collect();
        for k in [0i64, 1].into_iter().chain(partners) {
            t.put(k, 0).unwrap();
        }
        assert_eq!(t.chained_slots(), 1);
        let expected: Vec<i64> = t.keys().collect();
        let mut visited = Vec::new();
        t.for_each_value_mut(|k, _| visited.push(k));
        assert_eq!(visited, expected);
    }

    /// Invariant: get_or_insert_with only inserts absent keys.
    #[test]
    fn get_or_insert_with_counts() {
        let mut t: ByteTable<u32> = PrimitiveHashTable::new();
        for b in [3i8, -3, 3, 3] {
            *t.get_or_insert_with(b, || 0).unwrap() += 1;
        }
        assert_eq!(t.get(3), Some(&3));
        assert_eq!(t.get(-3), Some(&1));
    }

    /// Invariant: values are dropped on remove, clear, and table drop.
    #[test]
    fn owned_values_are_released() {
        let marker = std::rc::Rc::new(());
        let mut t: IntTable<std::rc::Rc<()>> = PrimitiveHashTable::new();
        for k in 0..100 {
            t.put(k, marker.clone()).unwrap();
        }
        assert_eq!(std::rc::Rc::strong_count(&marker), 101);
        drop(t.remove(5));
        assert_eq!(std::rc::Rc::strong_count(&marker), 100);
        let copy = t.clone();
        t.clear();
        assert_eq!(std::rc::Rc::strong_count(&marker), 100);
        drop(copy);
        assert_eq!(std::rc::Rc::strong_count(&marker), 1);
        drop(t);
    }
}
