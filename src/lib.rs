//! slot-table: a flat-array hash table engine with pluggable key identity,
//! chained overflow only where keys collide, and unboxed twins for
//! primitive keys.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one storage engine that map, set and bag facades can share,
//!   with no per-entry node allocation in the common case.
//! - Layers:
//!   - HashingStrategy<K>: the notion of "equal key" (hash + equality),
//!     injected at construction. The default defers to `Hash`/`Eq`.
//!   - HashTable<K, V, S>: power-of-two slot array. A slot is empty, holds
//!     one entry inline, or holds a ChainedBucket when keys collide.
//!   - PrimitiveHashTable<K, V>: the same engine specialised for
//!     primitive keys, with parallel key/value arrays, occupancy bitmaps
//!     and a side table for the rare chained slots.
//!   - Bag<T>: occurrence counters over either table family.
//!   - Synchronized<T>: a table behind one mutex for shared use.
//!
//! Constraints
//! - Single writer: mutation takes `&mut self`; no internal locking.
//! - Capacities are powers of two; growth doubles and re-slots everything.
//! - Every entry caches its strategy hash, so resize never calls back into
//!   the strategy.
//! - Operations either fully succeed or leave the table as it was. Growth
//!   builds the new layout completely before moving any entry.
//! - No tombstones: removal clears a slot or compacts a chain, and a chain
//!   left with one entry collapses back into its slot.
//!
//! Null keys
//! - The empty slot is an enum variant rather than a reserved key, so a
//!   `HashTable<Option<K>, V>` stores `None` like any other key.
//!
//! Float keys
//! - Primitive tables compare keys by bit pattern: NaN is a stable key and
//!   `0.0` and `-0.0` are distinct.
//!
//! Unsafe
//! - Confined to `primitive::slots`, which keeps uninitialised value slots
//!   behind an occupancy bitmap.
//!
//! Notes and non-goals
//! - Iteration order is unspecified.
//! - Persisted forms are the logical pair sequence from `iter()`, rebuilt
//!   with `HashTable::try_from_pairs`; the slot layout is never exposed.

pub mod bag;
mod chain;
pub mod error;
pub mod policy;
pub mod primitive;
pub mod strategy;
pub mod sync;
pub mod table;
mod table_proptest;

// Public surface
pub use bag::{Bag, CountingStore, HashBag, PrimitiveHashBag};
pub use error::{Error, Result};
pub use policy::ResizePolicy;
pub use primitive::{BitPatternStrategy, PrimitiveHashTable, PrimitiveKey};
pub use strategy::{
    AttributeStrategy, BuildHasherStrategy, CaseInsensitive, DefaultStrategy, HashingStrategy,
    IdentityStrategy, DEFAULT_STRATEGY,
};
pub use sync::Synchronized;
pub use table::HashTable;
