//! Bag: a multiset overlay that pairs each distinct key with an occurrence
//! counter instead of storing duplicates.
//!
//! The counter transitions are the only bag-specific logic; key storage is
//! whichever table family backs the bag, reached through [`CountingStore`].
//! Negative occurrence counts are rejected before anything changes.

use crate::error::{Error, Result};
use crate::primitive::{PrimitiveHashTable, PrimitiveKey};
use crate::strategy::{DefaultStrategy, HashingStrategy};
use crate::table::HashTable;

/// Key storage that can back a [`Bag`]: a table of `key -> count` with no
/// zero counts stored.
pub trait CountingStore {
    type Key;

    /// Current count of `key`, zero when absent.
    fn occurrences(&self, key: &Self::Key) -> usize;

    fn counter_mut(&mut self, key: &Self::Key) -> Option<&mut usize>;

    /// Counter for `key`, created at zero when absent.
    fn counter_or_insert(&mut self, key: Self::Key) -> Result<&mut usize>;

    fn remove_counter(&mut self, key: &Self::Key) -> Option<usize>;

    /// Number of distinct keys.
    fn distinct(&self) -> usize;

    fn clear_counters(&mut self);

    fn for_each_counter(&self, f: &mut dyn FnMut(&Self::Key, usize));
}

impl<K, S> CountingStore for HashTable<K, usize, S>
where
    S: HashingStrategy<K>,
{
    type Key = K;

    fn occurrences(&self, key: &K) -> usize {
        self.get(key).copied().unwrap_or(0)
    }

    fn counter_mut(&mut self, key: &K) -> Option<&mut usize> {
        self.get_mut(key)
    }

    fn counter_or_insert(&mut self, key: K) -> Result<&mut usize> {
        self.get_or_insert_with(key, || 0)
    }

    fn remove_counter(&mut self, key: &K) -> Option<usize> {
        self.remove(key)
    }

    fn distinct(&self) -> usize {
        self.len()
    }

    fn clear_counters(&mut self) {
        self.clear();
    }

    fn for_each_counter(&self, f: &mut dyn FnMut(&K, usize)) {
        for (k, n) in self {
            f(k, *n);
        }
    }
}

impl<K: PrimitiveKey> CountingStore for PrimitiveHashTable<K, usize> {
    type Key = K;

    fn occurrences(&self, key: &K) -> usize {
        self.get(*key).copied().unwrap_or(0)
    }

    fn counter_mut(&mut self, key: &K) -> Option<&mut usize> {
        self.get_mut(*key)
    }

    fn counter_or_insert(&mut self, key: K) -> Result<&mut usize> {
        self.get_or_insert_with(key, || 0)
    }

    fn remove_counter(&mut self, key: &K) -> Option<usize> {
        self.remove(*key)
    }

    fn distinct(&self) -> usize {
        self.len()
    }

    fn clear_counters(&mut self) {
        self.clear();
    }

    fn for_each_counter(&self, f: &mut dyn FnMut(&K, usize)) {
        for (k, n) in self {
            f(&k, *n);
        }
    }
}

/// Multiset over a [`CountingStore`].
#[derive(Clone, Debug, Default)]
pub struct Bag<T> {
    counters: T,
    total: usize,
}

/// Bag of object keys.
pub type HashBag<K, S = DefaultStrategy> = Bag<HashTable<K, usize, S>>;

/// Bag of primitive keys.
pub type PrimitiveHashBag<K> = Bag<PrimitiveHashTable<K, usize>>;

impl<K> HashBag<K>
where
    DefaultStrategy: HashingStrategy<K>,
{
    pub fn new() -> Self {
        Self::empty(HashTable::new())
    }
}

impl<K, S: HashingStrategy<K>> HashBag<K, S> {
    /// Bag whose key identity is `strategy`.
    pub fn with_strategy(strategy: S) -> Self {
        Self::empty(HashTable::with_strategy(strategy))
    }
}

impl<K: PrimitiveKey> PrimitiveHashBag<K> {
    pub fn new() -> Self {
        Self::empty(PrimitiveHashTable::new())
    }
}

fn checked_count(n: i64) -> Result<usize> {
    if n < 0 {
        return Err(Error::IllegalArgument(format!(
            "occurrences must be non-negative, got {n}"
        )));
    }
    usize::try_from(n)
        .map_err(|_| Error::IllegalArgument(format!("occurrences {n} exceed the counter range")))
}

fn counter_overflow() -> Error {
    Error::IllegalArgument("occurrence counter overflow".to_string())
}

impl<T: CountingStore> Bag<T> {
    fn empty(counters: T) -> Self {
        Self { counters, total: 0 }
    }

    /// Wrap an existing store, totalling its counters.
    ///
    /// Fails with [`Error::IllegalArgument`] if the store holds a zero count
    /// or its counts overflow the total.
    pub fn from_store(counters: T) -> Result<Self> {
        let mut total = Some(0usize);
        let mut zeros = 0usize;
        counters.for_each_counter(&mut |_, n| {
            if n == 0 {
                zeros += 1;
            }
            total = total.and_then(|t| t.checked_add(n));
        });
        if zeros > 0 {
            return Err(Error::IllegalArgument(format!(
                "store holds {zeros} zero counters"
            )));
        }
        let total = total.ok_or_else(counter_overflow)?;
        Ok(Self { counters, total })
    }

    /// Add `n` occurrences of `key` and return its new count.
    ///
    /// `n == 0` reports the current count without storing the key.
    pub fn add_occurrences(&mut self, key: T::Key, n: i64) -> Result<usize> {
        let n = checked_count(n)?;
        let current = self.counters.occurrences(&key);
        if n == 0 {
            return Ok(current);
        }
        let updated = current.checked_add(n).ok_or_else(counter_overflow)?;
        let total = self.total.checked_add(n).ok_or_else(counter_overflow)?;
        *self.counters.counter_or_insert(key)? = updated;
        self.total = total;
        Ok(updated)
    }

    /// Remove up to `n` occurrences of `key`; the key disappears when its
    /// count reaches zero. Returns whether any occurrence was removed.
    pub fn remove_occurrences(&mut self, key: &T::Key, n: i64) -> Result<bool> {
        let n = checked_count(n)?;
        if n == 0 {
            return Ok(false);
        }
        Ok(self.take(key, n))
    }

    fn take(&mut self, key: &T::Key, n: usize) -> bool {
        let Some(count) = self.counters.counter_mut(key) else {
            return false;
        };
        if *count > n {
            *count -= n;
            self.total -= n;
        } else if let Some(removed) = self.counters.remove_counter(key) {
            self.total -= removed;
        }
        true
    }

    /// Set the count of `key` to exactly `n`, returning the previous count.
    pub fn set_occurrences(&mut self, key: T::Key, n: i64) -> Result<usize> {
        let n = checked_count(n)?;
        let previous = self.counters.occurrences(&key);
        if n == 0 {
            if previous > 0 {
                self.counters.remove_counter(&key);
                self.total -= previous;
            }
            return Ok(previous);
        }
        let total = (self.total - previous)
            .checked_add(n)
            .ok_or_else(counter_overflow)?;
        *self.counters.counter_or_insert(key)? = n;
        self.total = total;
        Ok(previous)
    }

    /// Add one occurrence, returning the new count.
    pub fn add(&mut self, key: T::Key) -> Result<usize> {
        self.add_occurrences(key, 1)
    }

    /// Remove one occurrence, returning whether `key` was present.
    pub fn remove(&mut self, key: &T::Key) -> bool {
        self.take(key, 1)
    }

    pub fn occurrences_of(&self, key: &T::Key) -> usize {
        self.counters.occurrences(key)
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.occurrences_of(key) > 0
    }

    /// Total occurrences across all keys.
    pub fn size(&self) -> usize {
        self.total
    }

    pub fn size_distinct(&self) -> usize {
        self.counters.distinct()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn clear(&mut self) {
        self.counters.clear_counters();
        self.total = 0;
    }

    pub fn for_each_with_occurrences<F>(&self, mut f: F)
    where
        F: FnMut(&T::Key, usize),
    {
        self.counters.for_each_counter(&mut f);
    }

    /// The underlying `key -> count` table.
    pub fn counters(&self) -> &T {
        &self.counters
    }

    pub fn into_counters(self) -> T {
        self.counters
    }
}
