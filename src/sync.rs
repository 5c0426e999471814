//! Synchronized: a table behind one mutex.
//!
//! Tables do no locking of their own. This wrapper runs every operation,
//! including whole-table iteration, inside a single critical section. A
//! panic inside a strategy or callback can poison the lock; a table is left
//! consistent by a panicking operation, so the guard is recovered.

use crate::error::Result;
use crate::primitive::{PrimitiveHashTable, PrimitiveKey};
use crate::strategy::HashingStrategy;
use crate::table::HashTable;
use core::borrow::Borrow;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct Synchronized<T> {
    inner: Mutex<T>,
}

impl<T> Synchronized<T> {
    pub fn new(table: T) -> Self {
        Self {
            inner: Mutex::new(table),
        }
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the table under the lock.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock())
    }

    /// Run `f` against the table under the lock, with mutable access.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V, S> Synchronized<HashTable<K, V, S>>
where
    S: HashingStrategy<K>,
{
    pub fn put(&self, key: K, value: V) -> Result<Option<V>> {
        self.lock().put(key, value)
    }

    /// Copy of the value for `key`; references cannot outlive the lock.
    pub fn get_cloned<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashingStrategy<Q>,
        V: Clone,
    {
        self.lock().get(key).cloned()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashingStrategy<Q>,
    {
        self.lock().contains_key(key)
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        S: HashingStrategy<Q>,
    {
        self.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Visit every pair while holding the lock for the whole walk.
    pub fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        for (k, v) in self.lock().iter() {
            f(k, v);
        }
    }

    /// Point-in-time copy of all pairs.
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<K: PrimitiveKey, V> Synchronized<PrimitiveHashTable<K, V>> {
    pub fn put(&self, key: K, value: V) -> Result<Option<V>> {
        self.lock().put(key, value)
    }

    pub fn get_cloned(&self, key: K) -> Option<V>
    where
        V: Clone,
    {
        self.lock().get(key).cloned()
    }

    pub fn contains_key(&self, key: K) -> bool {
        self.lock().contains_key(key)
    }

    pub fn remove(&self, key: K) -> Option<V> {
        self.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn for_each(&self, mut f: impl FnMut(K, &V)) {
        for (k, v) in self.lock().iter() {
            f(k, v);
        }
    }

    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        self.lock().iter().map(|(k, v)| (k, v.clone())).collect()
    }
}
