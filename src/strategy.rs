//! Hashing strategies: the pluggable definition of "same key".
//!
//! Both table families route every hash and every key comparison through a
//! [`HashingStrategy`]. The tables never branch on which strategy they hold,
//! so case-insensitive, attribute-derived, or identity keys need no support
//! inside the table code.
//!
//! Contract for implementors:
//! - `equals(a, b)` implies `hash_code(a) == hash_code(b)`.
//! - Both functions are pure. A strategy whose answers change over time
//!   corrupts every table that uses it.
//! - When a table is queried through a borrowed form `Q` of its key type `K`
//!   (for example `str` for `String`), `HashingStrategy<Q>` must hash and
//!   compare `k.borrow()` exactly as `HashingStrategy<K>` treats `k`.
//!
//! A panic inside a strategy propagates to the caller unchanged.

use core::hash::{BuildHasher, Hash, Hasher};
use rustc_hash::{FxBuildHasher, FxHasher};
use std::rc::Rc;
use std::sync::Arc;

/// A pair of hash and equality functions defining key identity.
pub trait HashingStrategy<K: ?Sized> {
    /// Hash of `key`. Equal keys must produce equal hashes.
    fn hash_code(&self, key: &K) -> u64;

    /// Whether `a` and `b` denote the same key.
    fn equals(&self, a: &K, b: &K) -> bool;
}

impl<K: ?Sized, S: HashingStrategy<K> + ?Sized> HashingStrategy<K> for &S {
    #[inline]
    fn hash_code(&self, key: &K) -> u64 {
        (**self).hash_code(key)
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        (**self).equals(a, b)
    }
}

impl<K: ?Sized, S: HashingStrategy<K> + ?Sized> HashingStrategy<K> for Arc<S> {
    #[inline]
    fn hash_code(&self, key: &K) -> u64 {
        (**self).hash_code(key)
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        (**self).equals(a, b)
    }
}

/// Forwards to the key's own `Hash` and `Eq`.
///
/// Hashing uses a fixed-seed Fx hasher, so the strategy carries no state
/// and every instance behaves identically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultStrategy;

/// Shared instance of [`DefaultStrategy`].
pub const DEFAULT_STRATEGY: DefaultStrategy = DefaultStrategy;

impl<K: ?Sized + Hash + Eq> HashingStrategy<K> for DefaultStrategy {
    #[inline]
    fn hash_code(&self, key: &K) -> u64 {
        FxBuildHasher.hash_one(key)
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// Adapts any [`BuildHasher`] (for example std's `RandomState`) into a
/// strategy that uses the key's `Hash` and `Eq`.
#[derive(Clone, Debug, Default)]
pub struct BuildHasherStrategy<S>(pub S);

impl<K: ?Sized + Hash + Eq, S: BuildHasher> HashingStrategy<K> for BuildHasherStrategy<S> {
    #[inline]
    fn hash_code(&self, key: &K) -> u64 {
        self.0.hash_one(key)
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// ASCII case-insensitive string keys: `"Key"`, `"KEY"` and `"key"` are one key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaseInsensitive;

impl HashingStrategy<str> for CaseInsensitive {
    fn hash_code(&self, key: &str) -> u64 {
        let mut hasher = FxHasher::default();
        for b in key.bytes() {
            hasher.write_u8(b.to_ascii_lowercase());
        }
        // Terminator, as `str`'s own Hash impl writes one.
        hasher.write_u8(0xff);
        hasher.finish()
    }

    #[inline]
    fn equals(&self, a: &str, b: &str) -> bool {
        a.eq_ignore_ascii_case(b)
    }
}

impl HashingStrategy<String> for CaseInsensitive {
    #[inline]
    fn hash_code(&self, key: &String) -> u64 {
        HashingStrategy::<str>::hash_code(self, key)
    }

    #[inline]
    fn equals(&self, a: &String, b: &String) -> bool {
        HashingStrategy::<str>::equals(self, a, b)
    }
}

impl HashingStrategy<&str> for CaseInsensitive {
    #[inline]
    fn hash_code(&self, key: &&str) -> u64 {
        HashingStrategy::<str>::hash_code(self, key)
    }

    #[inline]
    fn equals(&self, a: &&str, b: &&str) -> bool {
        HashingStrategy::<str>::equals(self, a, b)
    }
}

/// Identity keys: two keys are equal only if they point at the same object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdentityStrategy;

#[inline]
fn address_hash<T: ?Sized>(ptr: *const T) -> u64 {
    FxBuildHasher.hash_one(ptr.cast::<()>() as usize)
}

impl<T: ?Sized> HashingStrategy<&T> for IdentityStrategy {
    #[inline]
    fn hash_code(&self, key: &&T) -> u64 {
        address_hash(*key as *const T)
    }

    #[inline]
    fn equals(&self, a: &&T, b: &&T) -> bool {
        core::ptr::addr_eq(*a as *const T, *b as *const T)
    }
}

impl<T: ?Sized> HashingStrategy<Rc<T>> for IdentityStrategy {
    #[inline]
    fn hash_code(&self, key: &Rc<T>) -> u64 {
        address_hash(Rc::as_ptr(key))
    }

    #[inline]
    fn equals(&self, a: &Rc<T>, b: &Rc<T>) -> bool {
        Rc::ptr_eq(a, b)
    }
}

/// Keys compared through a derived attribute, e.g. a record keyed by its id.
///
/// The extractor should be a plain function or a non-capturing closure so
/// the strategy stays stateless.
#[derive(Clone, Copy, Debug)]
pub struct AttributeStrategy<F> {
    extract: F,
}

impl<F> AttributeStrategy<F> {
    /// Strategy keying on `extract(key)`.
    pub const fn new(extract: F) -> Self {
        Self { extract }
    }
}

impl<K, A, F> HashingStrategy<K> for AttributeStrategy<F>
where
    F: Fn(&K) -> A,
    A: Hash + Eq,
{
    #[inline]
    fn hash_code(&self, key: &K) -> u64 {
        FxBuildHasher.hash_one((self.extract)(key))
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        (self.extract)(a) == (self.extract)(b)
    }
}
