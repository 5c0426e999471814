//! Unboxed key/value slot arrays with bitmap occupancy.
//!
//! This is the only module with `unsafe`. Invariant: `values[i]` is
//! initialized exactly when bit `i` of `occupied` is set. Every method below
//! preserves it, and the bit is always cleared before a value is moved out
//! or dropped, so a panic can leak a value but never drop one twice.

use super::bitmap::OccupancyBitmap;
use super::key::PrimitiveKey;
use crate::error::Result;
use crate::policy::try_filled_vec;
use core::mem::MaybeUninit;

pub(crate) struct PrimitiveSlots<K, V> {
    keys: Vec<K>,
    values: Vec<MaybeUninit<V>>,
    occupied: OccupancyBitmap,
}

impl<K, V> PrimitiveSlots<K, V> {
    /// Zero-capacity slots; nothing is allocated.
    pub(crate) const fn unallocated() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            occupied: OccupancyBitmap::empty(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub(crate) fn is_occupied(&self, i: usize) -> bool {
        self.occupied.get(i)
    }

    /// Drop every stored value, keeping the allocation.
    pub(crate) fn clear(&mut self) {
        for w in 0..self.occupied.word_count() {
            let mut bits = self.occupied.take_word(w);
            while bits != 0 {
                let i = w * 64 + bits.trailing_zeros() as usize;
                bits &= bits - 1;
                // SAFETY: bit `i` was set, so `values[i]` is initialized; the
                // bit is already cleared so it will not be dropped again.
                unsafe { self.values[i].assume_init_drop() };
            }
        }
    }
}

impl<K: PrimitiveKey, V> PrimitiveSlots<K, V> {
    pub(crate) fn try_with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            keys: try_filled_vec(capacity, || K::ZERO)?,
            values: try_filled_vec(capacity, MaybeUninit::uninit)?,
            occupied: OccupancyBitmap::try_with_len(capacity)?,
        })
    }

    #[inline]
    pub(crate) fn key(&self, i: usize) -> Option<K> {
        self.is_occupied(i).then(|| self.keys[i])
    }

    #[inline]
    pub(crate) fn get(&self, i: usize) -> Option<(K, &V)> {
        if !self.is_occupied(i) {
            return None;
        }
        // SAFETY: occupied slots hold an initialized value.
        let value = unsafe { self.values[i].assume_init_ref() };
        Some((self.keys[i], value))
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, i: usize) -> Option<(K, &mut V)> {
        if !self.is_occupied(i) {
            return None;
        }
        // SAFETY: occupied slots hold an initialized value.
        let value = unsafe { self.values[i].assume_init_mut() };
        Some((self.keys[i], value))
    }

    /// Store into an unoccupied slot.
    pub(crate) fn insert(&mut self, i: usize, key: K, value: V) {
        debug_assert!(!self.is_occupied(i), "slot {i} already occupied");
        self.keys[i] = key;
        self.values[i].write(value);
        self.occupied.set(i);
    }

    /// Move the pair out of slot `i`, leaving it unoccupied.
    pub(crate) fn take(&mut self, i: usize) -> Option<(K, V)> {
        if !self.is_occupied(i) {
            return None;
        }
        self.occupied.unset(i);
        // SAFETY: the bit was set, so the value is initialized; clearing it
        // first hands ownership to the caller.
        let value = unsafe { self.values[i].assume_init_read() };
        Some((self.keys[i], value))
    }

    /// Move every pair out in slot order. Pairs not yet yielded when the
    /// iterator is dropped stay in place.
    pub(crate) fn drain(&mut self) -> Drain<'_, K, V> {
        Drain {
            slots: self,
            word: 0,
        }
    }
}

impl<K, V> Drop for PrimitiveSlots<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: PrimitiveKey, V: Clone> Clone for PrimitiveSlots<K, V> {
    fn clone(&self) -> Self {
        let values = (0..self.capacity())
            .map(|i| match self.get(i) {
                Some((_, v)) => MaybeUninit::new(v.clone()),
                None => MaybeUninit::uninit(),
            })
            .collect();
        Self {
            keys: self.keys.clone(),
            values,
            occupied: self.occupied.clone(),
        }
    }
}

pub(crate) struct Drain<'a, K, V> {
    slots: &'a mut PrimitiveSlots<K, V>,
    word: usize,
}

impl<K: PrimitiveKey, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.slots.occupied.next_set(&mut self.word)?;
        self.slots.take(i)
    }
}
