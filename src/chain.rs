//! ChainedBucket: the overflow array for keys sharing one slot.
//!
//! A bucket exists only while two or more keys occupy its slot. It is a
//! plain value array of entries; removal shifts the tail left so there are
//! never holes, and once a single entry remains the owning table moves it
//! back into the slot (`try_collapse`).

use crate::error::{Error, Result};
use crate::strategy::HashingStrategy;
use core::borrow::Borrow;

/// Entries a bucket holds before its first growth.
pub(crate) const INITIAL_CHAIN_CAPACITY: usize = 4;

/// A stored key/value pair with the strategy hash computed at insertion.
///
/// Tables re-slot entries by `hash` on resize and never call back into the
/// strategy for keys already stored.
#[derive(Clone, Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) value: V,
}

#[derive(Clone, Debug)]
pub(crate) struct ChainedBucket<K, V> {
    entries: Vec<Entry<K, V>>,
}

impl<K, V> ChainedBucket<K, V> {
    pub(crate) fn try_with_capacity(capacity: usize) -> Result<Self> {
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(capacity)
            .map_err(|e| Error::from_reserve(capacity, e))?;
        Ok(Self { entries })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entries(&self) -> &[Entry<K, V>] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [Entry<K, V>] {
        &mut self.entries
    }

    pub(crate) fn get(&self, pos: usize) -> Option<&Entry<K, V>> {
        self.entries.get(pos)
    }

    pub(crate) fn get_mut(&mut self, pos: usize) -> Option<&mut Entry<K, V>> {
        self.entries.get_mut(pos)
    }

    /// Make room for one more entry, doubling the backing array when full.
    pub(crate) fn reserve_one(&mut self) -> Result<()> {
        let capacity = self.entries.capacity();
        if self.entries.len() < capacity {
            return Ok(());
        }
        let additional = capacity.max(INITIAL_CHAIN_CAPACITY);
        self.entries
            .try_reserve_exact(additional)
            .map_err(|e| Error::from_reserve(capacity.saturating_add(additional), e))
    }

    /// Append a new entry. On allocation failure the bucket is unchanged.
    pub(crate) fn append(&mut self, entry: Entry<K, V>) -> Result<()> {
        self.reserve_one()?;
        self.entries.push(entry);
        Ok(())
    }

    /// Push into capacity reserved beforehand; never reallocates.
    pub(crate) fn push_reserved(&mut self, entry: Entry<K, V>) {
        debug_assert!(self.entries.len() < self.entries.capacity());
        self.entries.push(entry);
    }

    /// Position of the entry equal to `key` under `strategy`.
    pub(crate) fn find_equal<Q, S>(&self, hash: u64, key: &Q, strategy: &S) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashingStrategy<Q> + ?Sized,
    {
        self.entries
            .iter()
            .position(|e| e.hash == hash && strategy.equals(e.key.borrow(), key))
    }

    /// Remove the entry at `pos`, shifting later entries left.
    pub(crate) fn remove_compact(&mut self, pos: usize) -> Entry<K, V> {
        self.entries.remove(pos)
    }

    /// Remove the entry equal to `key`, shifting later entries left.
    pub(crate) fn remove_equal<Q, S>(&mut self, hash: u64, key: &Q, strategy: &S) -> Option<Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashingStrategy<Q> + ?Sized,
    {
        let pos = self.find_equal(hash, key, strategy)?;
        Some(self.remove_compact(pos))
    }

    /// When exactly one entry is left, take it out so the caller can store it
    /// directly in the slot.
    pub(crate) fn try_collapse(&mut self) -> Option<Entry<K, V>> {
        if self.entries.len() == 1 {
            self.entries.pop()
        } else {
            None
        }
    }

    pub(crate) fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.entries.retain_mut(|e| f(&e.key, &mut e.value));
    }

    pub(crate) fn into_entries(self) -> std::vec::IntoIter<Entry<K, V>> {
        self.entries.into_iter()
    }
}
