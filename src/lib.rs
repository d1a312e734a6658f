//! # persimmon
//!
//! Persistent (immutable) collection types with structural sharing, each
//! paired with a mutable "transient" builder counterpart.
//!
//! ## Overview
//!
//! - [`PersistentHashMap`] / [`PersistentHashSet`]: hash-based map and set
//!   built on a CHAMP trie (Compressed Hash-Array Mapped Prefix-tree).
//! - [`PersistentSequencedMap`] / [`PersistentSequencedSet`]: hash-based
//!   map and set that additionally preserve insertion order.
//! - [`PersistentVector`]: indexed sequence built on a 32-way bit-mapped
//!   trie with efficient operations at both ends.
//! - [`PersistentTreeMap`] / [`PersistentTreeSet`]: sorted map and set
//!   built on a persistent red-black tree, parameterized by a
//!   [`Comparator`].
//!
//! Every "mutating" operation on a persistent collection returns a new
//! value and leaves the original untouched; unmodified sub-structures are
//! shared between the two versions. Each persistent type converts to its
//! transient counterpart (`TransientHashMap`, `TransientVector`, ...) in
//! O(1); transients support efficient in-place batch updates and convert
//! back with `persistent()` in O(1). Freezing consumes the builder, so a
//! frozen transient can never be touched again.
//!
//! ## Structural Sharing
//!
//! ```rust
//! use persimmon::PersistentHashMap;
//!
//! let map = PersistentHashMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2);
//!
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));       // Original unchanged
//! assert_eq!(updated.get("one"), Some(&100)); // New version
//! ```
//!
//! ## Transients
//!
//! ```rust
//! use persimmon::PersistentHashSet;
//!
//! let persistent: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
//!
//! let mut transient = persistent.transient();
//! transient.insert(4);
//! transient.remove(&1);
//!
//! let rebuilt = transient.persistent();
//! assert_eq!(rebuilt.len(), 3);
//! assert!(rebuilt.contains(&4));
//! ```
//!
//! ## Feature Flags
//!
//! - `arc`: use `Arc` instead of `Rc` for node sharing, making the
//!   persistent types `Send + Sync` when their contents are.
//! - `serde`: serialization of logical entries/elements only; the
//!   internal trie or tree is rebuilt on deserialization.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod champ;
mod hashmap;
mod hashset;
mod sequenced_map;
mod sequenced_set;
mod treemap;
mod treeset;
mod vector;

pub use hashmap::PersistentHashMap;
pub use hashmap::PersistentHashMapIntoIterator;
pub use hashmap::PersistentHashMapIterator;
pub use hashmap::TransientHashMap;
pub use hashset::PersistentHashSet;
pub use hashset::PersistentHashSetIntoIterator;
pub use hashset::PersistentHashSetIterator;
pub use hashset::TransientHashSet;
pub use sequenced_map::PersistentSequencedMap;
pub use sequenced_map::PersistentSequencedMapIntoIterator;
pub use sequenced_map::PersistentSequencedMapIterator;
pub use sequenced_map::TransientSequencedMap;
pub use sequenced_set::PersistentSequencedSet;
pub use sequenced_set::PersistentSequencedSetIntoIterator;
pub use sequenced_set::PersistentSequencedSetIterator;
pub use sequenced_set::TransientSequencedSet;
pub use treemap::Comparator;
pub use treemap::NaturalOrder;
pub use treemap::PersistentTreeMap;
pub use treemap::PersistentTreeMapIntoIterator;
pub use treemap::PersistentTreeMapIterator;
pub use treemap::TransientTreeMap;
pub use treeset::PersistentTreeSet;
pub use treeset::PersistentTreeSetIntoIterator;
pub use treeset::PersistentTreeSetIterator;
pub use treeset::TransientTreeSet;
pub use vector::PersistentVector;
pub use vector::PersistentVectorIntoIterator;
pub use vector::PersistentVectorIterator;
pub use vector::TransientVector;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod reference_counter_tests {
    use super::ReferenceCounter;
    use rstest::rstest;

    #[rstest]
    fn test_reference_counter_clone_shares() {
        let reference_counter: ReferenceCounter<i32> = ReferenceCounter::new(42);
        let reference_counter_clone = reference_counter.clone();
        assert!(ReferenceCounter::ptr_eq(
            &reference_counter,
            &reference_counter_clone
        ));
    }

    #[rstest]
    fn test_make_mut_copies_shared_value() {
        let mut reference_counter: ReferenceCounter<i32> = ReferenceCounter::new(1);
        let snapshot = reference_counter.clone();
        *ReferenceCounter::make_mut(&mut reference_counter) = 2;
        assert_eq!(*snapshot, 1);
        assert_eq!(*reference_counter, 2);
    }
}
