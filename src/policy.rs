//! ResizePolicy: capacity and load-factor rules shared by both table families.
//!
//! Capacities are always powers of two so a slot index is a mask of the
//! hash. Growth always doubles (possibly several times at once when a batch
//! is reserved) and is followed by a full rehash.

use crate::error::{Error, Result};

/// Occupancy ratio above which a table grows.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Slot count of the first allocation made by a table created with `new()`.
pub const DEFAULT_INITIAL_CAPACITY: usize = 8;

/// Smallest slot count a pre-sized table allocates.
pub const MIN_CAPACITY: usize = 2;

/// Largest slot count any table may request.
pub const MAX_CAPACITY: usize = 1 << (usize::BITS - 2);

/// Load-factor configuration of a table.
///
/// Load factors above `1.0` are legal: slots that overflow are absorbed by
/// chained buckets, trading lookup cost for memory.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizePolicy {
    load_factor: f32,
}

impl Default for ResizePolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl ResizePolicy {
    /// The policy used by every constructor that does not take one.
    pub const DEFAULT: Self = Self {
        load_factor: DEFAULT_LOAD_FACTOR,
    };

    /// Policy with a custom load factor; it must be finite and positive.
    pub fn new(load_factor: f32) -> Result<Self> {
        if !(load_factor.is_finite() && load_factor > 0.0) {
            return Err(Error::IllegalArgument(format!(
                "load factor must be finite and positive, got {load_factor}"
            )));
        }
        Ok(Self { load_factor })
    }

    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Maximum number of live keys a table of `capacity` slots may hold.
    pub fn threshold(&self, capacity: usize) -> usize {
        // Float-to-int `as` saturates, so huge load factors clamp to usize::MAX.
        (capacity as f64 * f64::from(self.load_factor)) as usize
    }

    /// Smallest power-of-two capacity whose threshold admits `expected` keys.
    pub fn capacity_for(&self, expected: usize) -> Result<usize> {
        let raw = (expected as f64 / f64::from(self.load_factor)).ceil();
        if raw > MAX_CAPACITY as f64 {
            return Err(Error::capacity(expected));
        }
        let mut capacity = (raw as usize).max(MIN_CAPACITY).next_power_of_two();
        while self.threshold(capacity) < expected {
            capacity = Self::doubled(capacity, expected)?;
        }
        Ok(capacity)
    }

    /// Capacity after growing a table of `capacity` slots until it admits
    /// `required` keys. An unallocated table (`capacity == 0`) starts at
    /// [`DEFAULT_INITIAL_CAPACITY`].
    pub fn grow(&self, capacity: usize, required: usize) -> Result<usize> {
        let mut next = if capacity == 0 {
            DEFAULT_INITIAL_CAPACITY
        } else {
            Self::doubled(capacity, required)?
        };
        while self.threshold(next) < required {
            next = Self::doubled(next, required)?;
        }
        Ok(next)
    }

    fn doubled(capacity: usize, required: usize) -> Result<usize> {
        match capacity.checked_mul(2) {
            Some(next) if next <= MAX_CAPACITY => Ok(next),
            _ => Err(Error::capacity(required)),
        }
    }
}

/// Slot index of `hash` in a table whose capacity is `mask + 1`.
///
/// The high half is folded into the low bits before masking. The folded
/// value does not depend on the mask, so the keys of one slot can only move
/// to slots congruent to it when the table grows.
#[inline]
pub(crate) fn slot_index(hash: u64, mask: usize) -> usize {
    let h = hash ^ (hash >> 32);
    ((h ^ (h >> 16)) as usize) & mask
}

/// `Vec` of `len` elements produced by `fill`, allocated fallibly.
pub(crate) fn try_filled_vec<T>(len: usize, fill: impl FnMut() -> T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|e| Error::from_reserve(len, e))?;
    v.resize_with(len, fill);
    Ok(v)
}
