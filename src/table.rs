//! HashTable: object-keyed engine with flat slots and chained overflow.
//!
//! Layout
//! - `slots` is a power-of-two array. Each slot is empty, holds one entry
//!   directly, or holds a [`ChainedBucket`] when several keys share it.
//! - The empty state is its own variant, so every key value (including
//!   `None` in a `HashTable<Option<K>, V>`) is storable.
//! - Removal clears a slot or compacts its chain; there are no tombstones.
//!
//! Growth
//! - A put of a new key that would exceed the policy threshold first grows
//!   the table by doubling and re-slots every entry by its cached hash.
//! - Growth is build-new-then-swap. Every fallible allocation (the new slot
//!   array and the chains the new layout needs) happens before any entry
//!   moves, so `CapacityExceeded` leaves the table untouched.
//!
//! Iteration borrows the table, so structural mutation while iterating is
//! rejected at compile time.

use crate::chain::{ChainedBucket, Entry, INITIAL_CHAIN_CAPACITY};
use crate::error::{Error, Result};
use crate::policy::{slot_index, try_filled_vec, ResizePolicy};
use crate::strategy::{DefaultStrategy, HashingStrategy};
use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;
use core::mem;

#[derive(Clone, Debug)]
enum Slot<K, V> {
    Empty,
    Occupied(Entry<K, V>),
    Chained(ChainedBucket<K, V>),
}

impl<K, V> Slot<K, V> {
    fn entry(&self, pos: usize) -> Option<&Entry<K, V>> {
        match self {
            Slot::Empty => None,
            Slot::Occupied(e) => (pos == 0).then_some(e),
            Slot::Chained(chain) => chain.get(pos),
        }
    }

    fn entry_mut(&mut self, pos: usize) -> Option<&mut Entry<K, V>> {
        match self {
            Slot::Empty => None,
            Slot::Occupied(e) => (pos == 0).then_some(e),
            Slot::Chained(chain) => chain.get_mut(pos),
        }
    }
}

/// Position of a live entry: its slot and, for chains, its chain position.
#[derive(Clone, Copy, Debug)]
struct Location {
    slot: usize,
    pos: usize,
}

/// Hash table with pluggable key identity.
pub struct HashTable<K, V, S = DefaultStrategy> {
    strategy: S,
    policy: ResizePolicy,
    slots: Vec<Slot<K, V>>,
    len: usize,
    threshold: usize,
}

impl<K, V> HashTable<K, V>
where
    DefaultStrategy: HashingStrategy<K>,
{
    /// Empty table using the key's own `Hash`/`Eq`. Allocates on first put.
    pub fn new() -> Self {
        Self::with_strategy(DefaultStrategy)
    }

    /// Table pre-sized for `expected` keys.
    pub fn with_capacity(expected: usize) -> Result<Self> {
        Self::with_capacity_and_strategy(expected, DefaultStrategy)
    }
}

impl<K, V> Default for HashTable<K, V>
where
    DefaultStrategy: HashingStrategy<K>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> HashTable<K, V, S>
where
    S: HashingStrategy<K>,
{
    /// Empty table keyed by `strategy`. Allocates on first put.
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            strategy,
            policy: ResizePolicy::DEFAULT,
            slots: Vec::new(),
            len: 0,
            threshold: 0,
        }
    }

    pub fn with_capacity_and_strategy(expected: usize, strategy: S) -> Result<Self> {
        Self::with_policy(ResizePolicy::DEFAULT, expected, strategy)
    }

    /// Table with an explicit load-factor policy, pre-sized for `expected`
    /// keys (rounded up to a power-of-two slot count).
    pub fn with_policy(policy: ResizePolicy, expected: usize, strategy: S) -> Result<Self> {
        let capacity = policy.capacity_for(expected)?;
        Ok(Self {
            strategy,
            policy,
            slots: try_filled_vec(capacity, || Slot::Empty)?,
            len: 0,
            threshold: policy.threshold(capacity),
        })
    }

    /// Rebuild a table from a logical pair sequence by repeated `put`.
    pub fn try_from_pairs<I>(pairs: I, strategy: S) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let pairs = pairs.into_iter();
        let mut table = Self::with_capacity_and_strategy(pairs.size_hint().0, strategy)?;
        for (key, value) in pairs {
            table.put(key, value)?;
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn policy(&self) -> ResizePolicy {
        self.policy
    }

    #[inline]
    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    fn locate<Q>(&self, hash: u64, key: &Q) -> Option<Location>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashingStrategy<Q>,
    {
        if self.len == 0 {
            return None;
        }
        let slot = slot_index(hash, self.mask());
        match &self.slots[slot] {
            Slot::Empty => None,
            Slot::Occupied(e) => (e.hash == hash && self.strategy.equals(e.key.borrow(), key))
                .then_some(Location { slot, pos: 0 }),
            Slot::Chained(chain) => chain
                .find_equal(hash, key, &self.strategy)
                .map(|pos| Location { slot, pos }),
        }
    }

    fn find<Q>(&self, key: &Q) -> Option<&Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashingStrategy<Q>,
    {
        let hash = self.strategy.hash_code(key);
        let loc = self.locate(hash, key)?;
        self.slots[loc.slot].entry(loc.pos)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashingStrategy<Q>,
    {
        self.find(key).map(|e| &e.value)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashingStrategy<Q>,
    {
        self.find(key).map(|e| (&e.key, &e.value))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashingStrategy<Q>,
    {
        let hash = self.strategy.hash_code(key);
        let loc = self.locate(hash, key)?;
        self.slots[loc.slot].entry_mut(loc.pos).map(|e| &mut e.value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashingStrategy<Q>,
    {
        self.find(key).is_some()
    }

    /// Store `value` under `key`, returning the value it replaced.
    ///
    /// Replacing an existing key keeps the originally stored key.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>> {
        let hash = self.strategy.hash_code(&key);
        if let Some(loc) = self.locate(hash, &key) {
            if let Some(e) = self.slots[loc.slot].entry_mut(loc.pos) {
                return Ok(Some(mem::replace(&mut e.value, value)));
            }
        }
        self.insert_absent(Entry { hash, key, value })?;
        Ok(None)
    }

    /// Value for `key`, inserting `default()` first when the key is absent.
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> Result<&mut V>
    where
        F: FnOnce() -> V,
    {
        let hash = self.strategy.hash_code(&key);
        let loc = match self.locate(hash, &key) {
            Some(loc) => loc,
            None => self.insert_absent(Entry {
                hash,
                key,
                value: default(),
            })?,
        };
        let entry = self.slots[loc.slot]
            .entry_mut(loc.pos)
            .expect("located entry must exist");
        Ok(&mut entry.value)
    }

    /// Store an entry whose key is known to be absent.
    fn insert_absent(&mut self, entry: Entry<K, V>) -> Result<Location> {
        if self.len >= self.threshold {
            let capacity = self.policy.grow(self.capacity(), self.len + 1)?;
            self.rehash(capacity)?;
        }
        let slot_idx = slot_index(entry.hash, self.mask());
        let slot = &mut self.slots[slot_idx];
        let pos = match slot {
            Slot::Empty => {
                *slot = Slot::Occupied(entry);
                0
            }
            Slot::Occupied(_) => {
                let mut chain = ChainedBucket::try_with_capacity(INITIAL_CHAIN_CAPACITY)?;
                if let Slot::Occupied(existing) = mem::replace(slot, Slot::Empty) {
                    chain.push_reserved(existing);
                }
                chain.push_reserved(entry);
                *slot = Slot::Chained(chain);
                1
            }
            Slot::Chained(chain) => {
                chain.append(entry)?;
                chain.len() - 1
            }
        };
        self.len += 1;
        Ok(Location {
            slot: slot_idx,
            pos,
        })
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashingStrategy<Q>,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Remove `key`, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashingStrategy<Q>,
    {
        if self.len == 0 {
            return None;
        }
        let hash = self.strategy.hash_code(key);
        let slot_idx = slot_index(hash, self.mask());
        let slot = &mut self.slots[slot_idx];
        let removed = match slot {
            Slot::Empty => None,
            Slot::Occupied(e) => {
                if e.hash == hash && self.strategy.equals(e.key.borrow(), key) {
                    match mem::replace(slot, Slot::Empty) {
                        Slot::Occupied(e) => Some(e),
                        _ => None,
                    }
                } else {
                    None
                }
            }
            Slot::Chained(chain) => {
                let removed = chain.remove_equal(hash, key, &self.strategy);
                if let Some(survivor) = chain.try_collapse() {
                    *slot = Slot::Occupied(survivor);
                }
                removed
            }
        }?;
        self.len -= 1;
        Some((removed.key, removed.value))
    }

    /// Keep only the entries for which `f` returns true.
    ///
    /// If `f` panics, the entries it already rejected stay removed and the
    /// table is left consistent.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut guard = RetainGuard {
            slots: &mut self.slots,
            len: &mut self.len,
        };
        for slot in guard.slots.iter_mut() {
            match slot {
                Slot::Empty => {}
                Slot::Occupied(e) => {
                    if !f(&e.key, &mut e.value) {
                        *slot = Slot::Empty;
                    }
                }
                Slot::Chained(chain) => chain.retain(&mut f),
            }
        }
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
        for slot in &mut self.slots {
            *slot = Slot::Empty;
        }
        self.len = 0;
    }

    /// Re-slot every entry into a fresh array of `new_capacity` slots.
    ///
    /// `new_capacity` is a power of two no smaller than the current one, so
    /// the entries of one old slot land only on new slots congruent to it:
    /// direct entries never collide, and every chain of the new layout is a
    /// split of an old chain. Those chains are allocated in the first pass,
    /// which is the only fallible one.
    fn rehash(&mut self, new_capacity: usize) -> Result<()> {
        debug_assert!(new_capacity.is_power_of_two());
        debug_assert!(new_capacity >= self.capacity());
        let new_mask = new_capacity - 1;
        let mut slots = try_filled_vec(new_capacity, || Slot::Empty)?;

        for slot in &self.slots {
            let Slot::Chained(chain) = slot else { continue };
            for entry in chain.entries() {
                let idx = slot_index(entry.hash, new_mask);
                if !matches!(slots[idx], Slot::Empty) {
                    continue;
                }
                let group = chain
                    .entries()
                    .iter()
                    .filter(|e| slot_index(e.hash, new_mask) == idx)
                    .count();
                if group > 1 {
                    let split = ChainedBucket::try_with_capacity(group.max(INITIAL_CHAIN_CAPACITY))?;
                    slots[idx] = Slot::Chained(split);
                }
            }
        }

        log::trace!(
            "rehashing {} entries: {} -> {} slots",
            self.len,
            self.slots.len(),
            new_capacity
        );
        let old = mem::replace(&mut self.slots, slots);
        for slot in old {
            match slot {
                Slot::Empty => {}
                Slot::Occupied(entry) => self.place(entry),
                Slot::Chained(chain) => {
                    for entry in chain.into_entries() {
                        self.place(entry);
                    }
                }
            }
        }
        self.threshold = self.policy.threshold(new_capacity);
        Ok(())
    }

    /// Rehash placement into slots prepared by the first pass of `rehash`.
    fn place(&mut self, entry: Entry<K, V>) {
        let idx = slot_index(entry.hash, self.mask());
        let slot = &mut self.slots[idx];
        match slot {
            Slot::Empty => *slot = Slot::Occupied(entry),
            Slot::Chained(chain) => chain.push_reserved(entry),
            Slot::Occupied(_) => unreachable!("rehash groups never share a slot"),
        }
    }
}

impl<K, V, S> HashTable<K, V, S> {
    /// Iterate `(key, value)` pairs. A slot's chain is exhausted before the
    /// next slot; the order is otherwise unspecified and changes on resize.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.slots.iter(),
            chain: Default::default(),
            remaining: self.len,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            slots: self.slots.iter_mut(),
            chain: Default::default(),
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl ExactSizeIterator<Item = &mut V> + '_ {
        self.iter_mut().map(|(_, v)| v)
    }
}

impl<K: Clone, V: Clone, S: Clone> Clone for HashTable<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy.clone(),
            policy: self.policy,
            slots: self.slots.clone(),
            len: self.len,
            threshold: self.threshold,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for HashTable<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Restores the shape and size of a table being filtered by `retain`,
/// whether the filter finished or unwound.
struct RetainGuard<'a, K, V> {
    slots: &'a mut Vec<Slot<K, V>>,
    len: &'a mut usize,
}

impl<K, V> Drop for RetainGuard<'_, K, V> {
    fn drop(&mut self) {
        let mut len = 0;
        for slot in self.slots.iter_mut() {
            if let Slot::Chained(chain) = slot {
                if chain.len() == 0 {
                    *slot = Slot::Empty;
                } else if let Some(survivor) = chain.try_collapse() {
                    *slot = Slot::Occupied(survivor);
                }
            }
            len += match slot {
                Slot::Empty => 0,
                Slot::Occupied(_) => 1,
                Slot::Chained(chain) => chain.len(),
            };
        }
        *self.len = len;
    }
}

/// Iterator over `(&K, &V)` pairs of a [`HashTable`].
pub struct Iter<'a, K, V> {
    slots: core::slice::Iter<'a, Slot<K, V>>,
    chain: core::slice::Iter<'a, Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.chain.next() {
                self.remaining -= 1;
                return Some((&e.key, &e.value));
            }
            if self.remaining == 0 {
                return None;
            }
            match self.slots.next()? {
                Slot::Empty => {}
                Slot::Occupied(e) => {
                    self.remaining -= 1;
                    return Some((&e.key, &e.value));
                }
                Slot::Chained(chain) => self.chain = chain.entries().iter(),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over `(&K, &mut V)` pairs of a [`HashTable`].
pub struct IterMut<'a, K, V> {
    slots: core::slice::IterMut<'a, Slot<K, V>>,
    chain: core::slice::IterMut<'a, Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.chain.next() {
                self.remaining -= 1;
                return Some((&e.key, &mut e.value));
            }
            if self.remaining == 0 {
                return None;
            }
            match self.slots.next()? {
                Slot::Empty => {}
                Slot::Occupied(e) => {
                    self.remaining -= 1;
                    return Some((&e.key, &mut e.value));
                }
                Slot::Chained(chain) => self.chain = chain.entries_mut().iter_mut(),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Owning iterator over the pairs of a [`HashTable`].
pub struct IntoIter<K, V> {
    slots: std::vec::IntoIter<Slot<K, V>>,
    chain: std::vec::IntoIter<Entry<K, V>>,
    remaining: usize,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.chain.next() {
                self.remaining -= 1;
                return Some((e.key, e.value));
            }
            if self.remaining == 0 {
                return None;
            }
            match self.slots.next()? {
                Slot::Empty => {}
                Slot::Occupied(e) => {
                    self.remaining -= 1;
                    return Some((e.key, e.value));
                }
                Slot::Chained(chain) => self.chain = chain.into_entries(),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K, V, S> IntoIterator for HashTable<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            slots: self.slots.into_iter(),
            chain: Vec::new().into_iter(),
            remaining: self.len,
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashTable<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut HashTable<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
impl<K, V, S> HashTable<K, V, S> {
    /// Number of slots currently holding a chained bucket.
    pub(crate) fn chained_slots(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Chained(_)))
            .count()
    }

    /// Panics unless every entry sits in the slot its cached hash selects,
    /// every chain holds at least two entries, and `len` matches.
    pub(crate) fn assert_consistent(&self) {
        let mut counted = 0;
        for (idx, slot) in self.slots.iter().enumerate() {
            let entries: &[Entry<K, V>] = match slot {
                Slot::Empty => &[],
                Slot::Occupied(e) => core::slice::from_ref(e),
                Slot::Chained(chain) => {
                    assert!(chain.len() >= 2, "chain at {idx} should have collapsed");
                    chain.entries()
                }
            };
            for e in entries {
                assert_eq!(slot_index(e.hash, self.slots.len() - 1), idx);
            }
            counted += entries.len();
        }
        assert_eq!(counted, self.len);
        assert!(self.slots.is_empty() || self.slots.len().is_power_of_two());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::CaseInsensitive;
    use std::cell::Cell;
    use test_log::test;

    /// Every key hashes to 0: all keys share slot 0.
    #[derive(Clone, Copy, Default)]
    struct ConstStrategy;

    impl HashingStrategy<String> for ConstStrategy {
        fn hash_code(&self, _key: &String) -> u64 {
            0
        }
        fn equals(&self, a: &String, b: &String) -> bool {
            a == b
        }
    }

    impl HashingStrategy<str> for ConstStrategy {
        fn hash_code(&self, _key: &str) -> u64 {
            0
        }
        fn equals(&self, a: &str, b: &str) -> bool {
            a == b
        }
    }

    /// Invariant: put returns the previous value and never changes len when
    /// the key already exists.
    #[test]
    fn put_overwrites_and_returns_previous() {
        let mut t: HashTable<String, i32> = HashTable::new();
        assert_eq!(t.put("a".to_string(), 1).unwrap(), None);
        assert_eq!(t.put("a".to_string(), 2).unwrap(), Some(1));
        assert_eq!(t.len(), 1);
        assert_eq!(t.get("a"), Some(&2));
    }

    /// Invariant: a new table allocates nothing until the first put, and
    /// lookups on it answer "absent".
    #[test]
    fn new_table_is_unallocated() {
        let mut t: HashTable<String, i32> = HashTable::new();
        assert_eq!(t.capacity(), 0);
        assert_eq!(t.get("x"), None);
        assert_eq!(t.remove("x"), None);
        assert_eq!(t.iter().count(), 0);
        t.put("x".to_string(), 1).unwrap();
        assert!(t.capacity().is_power_of_two());
    }

    /// Invariant: a second key on an occupied slot materialises a chain, and
    /// removing down to one key collapses it back into the slot.
    #[test]
    fn chain_materialises_and_collapses() {
        let mut t = HashTable::with_strategy(ConstStrategy);
        t.put("a".to_string(), 1).unwrap();
        assert_eq!(t.chained_slots(), 0);
        t.put("b".to_string(), 2).unwrap();
        assert_eq!(t.chained_slots(), 1);

        assert_eq!(t.remove("a"), Some(1));
        assert_eq!(t.chained_slots(), 0);
        assert_eq!(t.get("b"), Some(&2));
        assert_eq!(t.len(), 1);
    }

    /// Invariant: chains survive resizes intact, including chains that the
    /// larger table cannot split.
    #[test]
    fn chains_survive_rehash() {
        let mut t = HashTable::with_strategy(ConstStrategy);
        for i in 0..50 {
            t.put(format!("k{i}"), i).unwrap();
        }
        assert!(t.capacity() >= 64);
        assert_eq!(t.chained_slots(), 1);
        for i in 0..50 {
            assert_eq!(t.get(format!("k{i}").as_str()), Some(&i));
        }
    }

    /// Invariant: resize re-slots by the cached hash and never calls the
    /// strategy again for stored keys.
    #[test]
    fn rehash_does_not_call_strategy() {
        struct Counting<'a>(&'a Cell<usize>);
        impl HashingStrategy<u32> for Counting<'_> {
            fn hash_code(&self, key: &u32) -> u64 {
                self.0.set(self.0.get() + 1);
                u64::from(*key).wrapping_mul(0x9e37_79b9_7f4a_7c15)
            }
            fn equals(&self, a: &u32, b: &u32) -> bool {
                a == b
            }
        }

        let calls = Cell::new(0);
        let mut t = HashTable::with_strategy(Counting(&calls));
        for i in 0..1000u32 {
            t.put(i, i).unwrap();
        }
        assert_eq!(calls.get(), 1000, "one hash per put, none on resize");
    }

    /// Invariant: iteration visits each live entry exactly once and reports
    /// an exact length.
    #[test]
    fn iteration_visits_each_entry_once() {
        let mut t = HashTable::with_strategy(ConstStrategy);
        for i in 0..5 {
            t.put(format!("c{i}"), i).unwrap();
        }
        let mut u: HashTable<String, i32> = HashTable::new();
        for i in 0..20 {
            u.put(format!("u{i}"), i).unwrap();
        }
        let it = t.iter();
        assert_eq!(it.len(), 5);
        let mut seen: Vec<i32> = it.map(|(_, v)| *v).collect();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);

        let mut seen: Vec<i32> = u.values().copied().collect();
        seen.sort();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    /// Invariant: iter_mut and values_mut write through to the table.
    #[test]
    fn iter_mut_updates_values() {
        let mut t = HashTable::with_strategy(ConstStrategy);
        t.put("a".to_string(), 1).unwrap();
        t.put("b".to_string(), 2).unwrap();
        let mut u: HashTable<String, i32> = HashTable::new();
        u.put("c".to_string(), 3).unwrap();

        for (_, v) in t.iter_mut() {
            *v *= 10;
        }
        for v in u.values_mut() {
            *v += 1;
        }
        assert_eq!(t.get("a"), Some(&10));
        assert_eq!(t.get("b"), Some(&20));
        assert_eq!(u.get("c"), Some(&4));
    }

    /// Invariant: retain removes failing entries, fixes len, and collapses
    /// chains that drop to one entry.
    #[test]
    fn retain_filters_and_collapses() {
        let mut t = HashTable::with_strategy(ConstStrategy);
        for i in 0..4 {
            t.put(format!("k{i}"), i).unwrap();
        }
        t.retain(|_, v| *v == 2);
        assert_eq!(t.len(), 1);
        assert_eq!(t.chained_slots(), 0);
        assert_eq!(t.get("k2"), Some(&2));

        t.retain(|_, _| false);
        assert!(t.is_empty());
        assert_eq!(t.get("k2"), None);
    }

    /// Invariant: a predicate that panics part way leaves len equal to the
    /// entries still stored and no chain below two entries.
    #[test]
    fn retain_unwinding_keeps_table_consistent() {
        use std::panic::{catch_unwind, AssertUnwindSafe};

        let mut chained = HashTable::with_strategy(ConstStrategy);
        for i in 0..6 {
            chained.put(format!("k{i}"), i).unwrap();
        }
        let mut calls = 0;
        let result = catch_unwind(AssertUnwindSafe(|| {
            chained.retain(|_, _| {
                calls += 1;
                assert!(calls < 6, "filter gave up");
                false
            })
        }));
        assert!(result.is_err());
        assert_eq!(chained.len(), 1);
        assert_eq!(chained.chained_slots(), 0);
        assert_eq!(chained.iter().count(), 1);
        chained.assert_consistent();

        let mut t: HashTable<u32, u32> = HashTable::new();
        for i in 0..64 {
            t.put(i, i).unwrap();
        }
        let mut calls = 0;
        let result = catch_unwind(AssertUnwindSafe(|| {
            t.retain(|_, v| {
                calls += 1;
                assert!(calls < 40, "filter gave up");
                *v % 2 == 0
            })
        }));
        assert!(result.is_err());
        assert_eq!(t.len(), t.iter().count());
        assert_eq!(t.iter().len(), t.len());
        assert!(t.len() < 64);
        t.assert_consistent();
        for i in (0..64).step_by(2) {
            assert_eq!(t.get(&i), Some(&i));
        }
    }

    /// Invariant: get_or_insert_with only runs the default for absent keys.
    #[test]
    fn get_or_insert_with_is_lazy() {
        let mut t: HashTable<String, i32> = HashTable::new();
        let calls = Cell::new(0);
        *t.get_or_insert_with("k".to_string(), || {
            calls.set(calls.get() + 1);
            1
        })
        .unwrap() += 5;
        let v = t
            .get_or_insert_with("k".to_string(), || {
                calls.set(calls.get() + 1);
                100
            })
            .unwrap();
        assert_eq!(*v, 6);
        assert_eq!(calls.get(), 1);
    }

    /// Invariant: get_or_insert_with returns the new entry even when it lands
    /// in a chain.
    #[test]
    fn get_or_insert_with_into_chain() {
        let mut t = HashTable::with_strategy(ConstStrategy);
        t.put("a".to_string(), 1).unwrap();
        *t.get_or_insert_with("b".to_string(), || 2).unwrap() += 40;
        assert_eq!(t.get("b"), Some(&42));
        assert_eq!(t.get("a"), Some(&1));
    }

    /// Invariant: reserve grows once up front; later puts within the
    /// reservation do not resize.
    #[test]
    fn reserve_pre_grows() {
        let mut t: HashTable<u64, u64> = HashTable::new();
        t.reserve(1000).unwrap();
        let capacity = t.capacity();
        assert!(t.policy().threshold(capacity) >= 1000);
        for i in 0..1000 {
            t.put(i, i).unwrap();
        }
        assert_eq!(t.capacity(), capacity);
    }

    /// Invariant: clear empties the table but keeps its slots.
    #[test]
    fn clear_keeps_capacity() {
        let mut t = HashTable::with_capacity_and_strategy(100, CaseInsensitive).unwrap();
        t.put("A".to_string(), 1).unwrap();
        let capacity = t.capacity();
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.capacity(), capacity);
        assert_eq!(t.get("a"), None);
    }

    /// Invariant: replacing a value keeps the originally stored key.
    #[test]
    fn put_keeps_original_key() {
        let mut t = HashTable::with_strategy(CaseInsensitive);
        t.put("Key".to_string(), 1).unwrap();
        t.put("KEY".to_string(), 2).unwrap();
        assert_eq!(t.get_key_value("key"), Some((&"Key".to_string(), &2)));
    }
}
