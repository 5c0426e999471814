//! Primitive key kinds and their bit-pattern identity.

use crate::strategy::HashingStrategy;
use core::hash::BuildHasher;
use rustc_hash::FxBuildHasher;

/// A key stored unboxed in a [`PrimitiveHashTable`](super::PrimitiveHashTable).
///
/// Identity is the key's bit pattern: `key_bits` must be injective over the
/// values of the type.
pub trait PrimitiveKey: Copy + core::fmt::Debug + 'static {
    /// Filler for key slots that hold no key.
    const ZERO: Self;

    /// The key's bit pattern, zero- or sign-extended to 64 bits.
    fn key_bits(self) -> u64;
}

macro_rules! integer_keys {
    ($($t:ty),* $(,)?) => {
        $(
            impl PrimitiveKey for $t {
                const ZERO: Self = 0;

                #[inline]
                fn key_bits(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

integer_keys!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl PrimitiveKey for f32 {
    const ZERO: Self = 0.0;

    #[inline]
    fn key_bits(self) -> u64 {
        u64::from(self.to_bits())
    }
}

impl PrimitiveKey for f64 {
    const ZERO: Self = 0.0;

    #[inline]
    fn key_bits(self) -> u64 {
        self.to_bits()
    }
}

impl PrimitiveKey for bool {
    const ZERO: Self = false;

    #[inline]
    fn key_bits(self) -> u64 {
        u64::from(self)
    }
}

impl PrimitiveKey for char {
    const ZERO: Self = '\0';

    #[inline]
    fn key_bits(self) -> u64 {
        u64::from(u32::from(self))
    }
}

/// Bit-pattern hash and equality for primitive keys.
///
/// For floats this deliberately departs from IEEE comparison: every NaN
/// payload equals itself and is a stable key, while `0.0` and `-0.0` are
/// two distinct keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BitPatternStrategy;

impl<K: PrimitiveKey> HashingStrategy<K> for BitPatternStrategy {
    #[inline]
    fn hash_code(&self, key: &K) -> u64 {
        FxBuildHasher.hash_one(key.key_bits())
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        a.key_bits() == b.key_bits()
    }
}
