//! Persistent (immutable) insertion-ordered hash map.
//!
//! This module provides [`PersistentSequencedMap`], which composes the
//! CHAMP trie (membership in O(log32 N)) with an order vector (ordered
//! iteration in amortized O(1) per entry), and its mutable builder
//! counterpart [`TransientSequencedMap`].
//!
//! # How ordering works
//!
//! Every entry carries a sequence number on the trie's value side, so
//! trie lookups stay order-independent. The order vector maps
//! `sequence_number + offset` to a slot holding the entry. Appending at
//! either end picks `min - 1` or `max + 1` as the new sequence number;
//! moving an entry (`insert_first`/`insert_last` on an existing key)
//! turns its old slot into a tombstone and appends a fresh one.
//! Tombstones at either end of the vector are trimmed immediately;
//! interior tombstones record the length of their run at both run
//! boundaries and are skipped during iteration.
//!
//! Once tombstones outnumber live entries the whole structure is rebuilt
//! with dense sequence numbers, which is why mutation costs are amortized
//! rather than worst-case logarithmic. Renumbering changes only the
//! internal layout, never the observable order or membership.
//!
//! # Examples
//!
//! ```rust
//! use persimmon::PersistentSequencedMap;
//!
//! let map = PersistentSequencedMap::new()
//!     .insert("b".to_string(), 2)
//!     .insert("c".to_string(), 3)
//!     .insert_first("a".to_string(), 1);
//!
//! let keys: Vec<&String> = map.keys().collect();
//! assert_eq!(keys, ["a", "b", "c"]);
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::OnceLock;

use crate::ReferenceCounter;
use crate::champ::{self, ChangeEvent, Node};
use crate::vector::{PersistentVector, PersistentVectorIterator};

// =============================================================================
// Family Hashing
// =============================================================================

/// Hash salt shared by every sequenced map and sequenced set in this
/// process. Kept separate from the plain hash-map family so the two
/// families' tries stay decorrelated.
static SEQUENCED_FAMILY_SALT: OnceLock<u32> = OnceLock::new();

/// Computes the salted hash of a key for the sequenced family.
pub(crate) fn hash_key<K: Hash + ?Sized>(key: &K) -> u32 {
    let salt = *SEQUENCED_FAMILY_SALT.get_or_init(champ::initialize_family_salt);
    champ::salted_hash(salt, key)
}

// =============================================================================
// Internal Types
// =============================================================================

/// Number of tombstones below which renumbering is never considered.
const MIN_RENUMBER_THRESHOLD: usize = 8;

/// Trie value: the caller's value plus the entry's sequence number.
///
/// Equality and hashing of trie entries are keyed purely on `K`, so the
/// sequence number riding along here never influences lookups.
#[derive(Clone)]
struct SequencedValue<V> {
    value: V,
    sequence_number: i64,
}

/// One slot of the order vector.
#[derive(Clone)]
enum Slot<K, V> {
    /// A live entry
    Live { key: K, value: V },
    /// A removed entry; `run_length` is the length of the maximal
    /// tombstone run this slot belongs to, maintained at both run
    /// boundaries
    Tombstone { run_length: usize },
}

// =============================================================================
// PersistentSequencedMap Definition
// =============================================================================

/// A persistent (immutable) hash map that preserves insertion order.
///
/// # Time Complexity
///
/// | Operation      | Complexity             |
/// |----------------|------------------------|
/// | `get`          | O(log32 N)             |
/// | `insert`       | amortized O(log32 N)   |
/// | `insert_first` | amortized O(log32 N)   |
/// | `insert_last`  | amortized O(log32 N)   |
/// | `remove`       | amortized O(log32 N)   |
/// | `iter`         | amortized O(1) / entry |
/// | `len`          | O(1)                   |
/// | `transient`    | O(1)                   |
///
/// # Examples
///
/// ```rust
/// use persimmon::PersistentSequencedMap;
///
/// let map = PersistentSequencedMap::new()
///     .insert(1, "one")
///     .insert(2, "two");
///
/// let entries: Vec<(&i32, &&str)> = map.iter().collect();
/// assert_eq!(entries, vec![(&1, &"one"), (&2, &"two")]);
/// ```
#[derive(Clone)]
pub struct PersistentSequencedMap<K, V> {
    /// Root node of the trie; values carry sequence numbers
    root: ReferenceCounter<Node<K, SequencedValue<V>>>,
    /// Slots in insertion order, including tombstones
    order: PersistentVector<Slot<K, V>>,
    /// Number of live entries
    length: usize,
    /// `vector_index = sequence_number + offset`
    offset: i64,
    /// Number of tombstone slots currently in the vector
    tombstone_count: usize,
}

impl<K, V> PersistentSequencedMap<K, V> {
    /// Creates a new empty map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentSequencedMap;
    ///
    /// let map: PersistentSequencedMap<String, i32> = PersistentSequencedMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: champ::empty_root(),
            order: PersistentVector::new(),
            length: 0,
            offset: 0,
            tombstone_count: 0,
        }
    }

    /// Returns the number of entries in the map.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns an iterator over key-value pairs in insertion order.
    ///
    /// Tombstones never surface.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentSequencedMap;
    ///
    /// let map = PersistentSequencedMap::new().insert(1, "one").insert(2, "two");
    /// let keys: Vec<&i32> = map.iter().map(|(key, _)| key).collect();
    /// assert_eq!(keys, vec![&1, &2]);
    /// ```
    #[must_use]
    pub fn iter(&self) -> PersistentSequencedMapIterator<'_, K, V> {
        PersistentSequencedMapIterator {
            slots: self.order.iter(),
            remaining: self.length,
        }
    }

    /// Returns an iterator over key-value pairs in reverse insertion
    /// order, walking the order vector tail-to-head.
    #[must_use]
    pub fn iter_reversed(&self) -> std::iter::Rev<PersistentSequencedMapIterator<'_, K, V>> {
        self.iter().rev()
    }

    /// Returns an iterator over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Returns the first entry in insertion order.
    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.iter().next()
    }

    /// Returns the last entry in insertion order.
    #[must_use]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.iter().next_back()
    }
}

impl<K: Clone + Hash + Eq, V: Clone> PersistentSequencedMap<K, V> {
    /// Creates a map containing a single key-value pair.
    #[inline]
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        Self::new().insert(key, value)
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_key(key);
        champ::find(&self.root, key, hash, 0).map(|(_, sequenced)| &sequenced.value)
    }

    /// Returns `true` if the map contains a value for the specified key.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Inserts a key-value pair.
    ///
    /// A new key is appended at the back of the iteration order. An
    /// existing key keeps its position; only its value is replaced.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentSequencedMap;
    ///
    /// let map = PersistentSequencedMap::new()
    ///     .insert(1, "one")
    ///     .insert(2, "two")
    ///     .insert(1, "ONE"); // replaced in place, order unchanged
    ///
    /// let keys: Vec<&i32> = map.keys().collect();
    /// assert_eq!(keys, vec![&1, &2]);
    /// assert_eq!(map.get(&1), Some(&"ONE"));
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let mut next = self.clone();
        next.insert_in_place(key, value);
        next
    }

    /// Inserts a key-value pair at the front of the iteration order.
    ///
    /// An existing key is moved to the front.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentSequencedMap;
    ///
    /// let map = PersistentSequencedMap::new()
    ///     .insert(1, "one")
    ///     .insert_first(0, "zero");
    ///
    /// let keys: Vec<&i32> = map.keys().collect();
    /// assert_eq!(keys, vec![&0, &1]);
    /// ```
    #[must_use]
    pub fn insert_first(&self, key: K, value: V) -> Self {
        let mut next = self.clone();
        next.insert_first_in_place(key, value);
        next
    }

    /// Inserts a key-value pair at the back of the iteration order.
    ///
    /// An existing key is moved to the back.
    #[must_use]
    pub fn insert_last(&self, key: K, value: V) -> Self {
        let mut next = self.clone();
        next.insert_last_in_place(key, value);
        next
    }

    /// Removes a key from the map.
    ///
    /// If the key doesn't exist, returns a clone of the original map.
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut next = self.clone();
        next.remove_in_place(key);
        next
    }

    /// Removes the first entry in insertion order.
    ///
    /// Returns `None` if the map is empty, otherwise the new map and the
    /// removed entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentSequencedMap;
    ///
    /// let map = PersistentSequencedMap::new().insert(1, "one").insert(2, "two");
    /// let (rest, (key, _)) = map.remove_first().unwrap();
    /// assert_eq!(key, 1);
    /// assert_eq!(rest.len(), 1);
    /// ```
    #[must_use]
    pub fn remove_first(&self) -> Option<(Self, (K, V))> {
        let (key, value) = self
            .first()
            .map(|(key, value)| (key.clone(), value.clone()))?;
        let next = self.remove(&key);
        Some((next, (key, value)))
    }

    /// Removes the last entry in insertion order.
    #[must_use]
    pub fn remove_last(&self) -> Option<(Self, (K, V))> {
        let (key, value) = self
            .last()
            .map(|(key, value)| (key.clone(), value.clone()))?;
        let next = self.remove(&key);
        Some((next, (key, value)))
    }

    /// Merges two maps.
    ///
    /// Entries of `other` are inserted in `other`'s iteration order;
    /// values from `other` take precedence on key conflicts, with
    /// conflicting keys keeping their position in `self`.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut transient = self.clone().transient();
        for (key, value) in other.iter() {
            transient.insert(key.clone(), value.clone());
        }
        transient.persistent()
    }

    /// Removes every key yielded by `keys`.
    #[must_use]
    pub fn remove_all<'a, Q, I>(&self, keys: I) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        let mut transient = self.clone().transient();
        for key in keys {
            transient.remove(key);
        }
        transient.persistent()
    }

    /// Keeps only the entries whose keys are yielded by `keys`,
    /// preserving the iteration order of the survivors.
    #[must_use]
    pub fn retain_all<'a, Q, I>(&self, keys: I) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        let keep: std::collections::HashSet<&Q> = keys.into_iter().collect();
        let doomed: Vec<K> = self
            .iter()
            .filter(|(key, _)| {
                let borrowed: &Q = (*key).borrow();
                !keep.contains(borrowed)
            })
            .map(|(key, _)| key.clone())
            .collect();
        let mut transient = self.clone().transient();
        for key in &doomed {
            let borrowed: &Q = key.borrow();
            transient.remove(borrowed);
        }
        transient.persistent()
    }

    /// Converts this persistent map into a transient map in O(1).
    #[must_use]
    pub fn transient(self) -> TransientSequencedMap<K, V> {
        TransientSequencedMap {
            inner: self,
            _marker: PhantomData,
        }
    }

    // -------------------------------------------------------------------------
    // In-place cores shared with TransientSequencedMap
    // -------------------------------------------------------------------------

    /// Vector index of the slot holding `sequence_number`.
    fn slot_index(&self, sequence_number: i64) -> usize {
        let index = sequence_number + self.offset;
        debug_assert!(index >= 0);
        usize::try_from(index).unwrap_or_default()
    }

    /// Sequence number a slot appended at the back will receive.
    fn back_sequence_number(&self) -> i64 {
        self.order.len() as i64 - self.offset
    }

    fn insert_in_place(&mut self, key: K, value: V) -> Option<V> {
        let hash = hash_key(&key);
        let existing_sequence = champ::find(&self.root, &key, hash, 0)
            .map(|(_, sequenced)| sequenced.sequence_number);

        match existing_sequence {
            Some(sequence_number) => {
                // Replace without moving: overwrite both the trie value
                // and the vector slot.
                let index = self.slot_index(sequence_number);
                let slot_key = key.clone();
                let event = champ::insert(
                    &mut self.root,
                    key,
                    SequencedValue {
                        value: value.clone(),
                        sequence_number,
                    },
                    hash,
                    0,
                    &hash_key::<K>,
                );
                self.order.set_at(index, Slot::Live {
                    key: slot_key,
                    value,
                });
                match event {
                    ChangeEvent::Replaced(old) => Some(old.value),
                    _ => None,
                }
            }
            None => {
                let sequence_number = self.back_sequence_number();
                champ::insert(
                    &mut self.root,
                    key.clone(),
                    SequencedValue {
                        value: value.clone(),
                        sequence_number,
                    },
                    hash,
                    0,
                    &hash_key::<K>,
                );
                self.order.push_back_in_place(Slot::Live { key, value });
                self.length += 1;
                None
            }
        }
    }

    fn insert_first_in_place(&mut self, key: K, value: V) -> Option<V> {
        let hash = hash_key(&key);
        let old_value = self.unlink_in_place(&key, hash);
        let sequence_number = -(self.offset + 1);
        champ::insert(
            &mut self.root,
            key.clone(),
            SequencedValue {
                value: value.clone(),
                sequence_number,
            },
            hash,
            0,
            &hash_key::<K>,
        );
        self.order.push_front_in_place(Slot::Live { key, value });
        self.offset += 1;
        if old_value.is_none() {
            self.length += 1;
        }
        self.renumber_if_needed();
        old_value
    }

    fn insert_last_in_place(&mut self, key: K, value: V) -> Option<V> {
        let hash = hash_key(&key);
        let old_value = self.unlink_in_place(&key, hash);
        let sequence_number = self.back_sequence_number();
        champ::insert(
            &mut self.root,
            key.clone(),
            SequencedValue {
                value: value.clone(),
                sequence_number,
            },
            hash,
            0,
            &hash_key::<K>,
        );
        self.order.push_back_in_place(Slot::Live { key, value });
        if old_value.is_none() {
            self.length += 1;
        }
        self.renumber_if_needed();
        old_value
    }

    fn remove_in_place<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_key(key);
        if champ::find(&self.root, key, hash, 0).is_none() {
            return None;
        }
        match champ::remove(&mut self.root, key, hash, 0) {
            ChangeEvent::Removed(sequenced) => {
                self.detach_slot_in_place(sequenced.sequence_number);
                self.length -= 1;
                self.renumber_if_needed();
                Some(sequenced.value)
            }
            _ => None,
        }
    }

    /// Detaches the vector slot of an existing key without touching the
    /// trie, returning the old value. Used by the moving insertions.
    fn unlink_in_place(&mut self, key: &K, hash: u32) -> Option<V> {
        let existing = champ::find(&self.root, key, hash, 0)
            .map(|(_, sequenced)| (sequenced.sequence_number, sequenced.value.clone()));
        let (sequence_number, old_value) = existing?;
        self.detach_slot_in_place(sequence_number);
        Some(old_value)
    }

    /// Removes the slot at `sequence_number` from the order vector:
    /// boundary slots are trimmed off together with any adjacent
    /// tombstone run, interior slots become tombstones with merged run
    /// lengths.
    fn detach_slot_in_place(&mut self, sequence_number: i64) {
        let index = self.slot_index(sequence_number);
        let last_index = self.order.len() - 1;

        if index == 0 {
            self.order.pop_front_in_place();
            let run = match self.order.first() {
                Some(Slot::Tombstone { run_length }) => *run_length,
                _ => 0,
            };
            for _ in 0..run {
                self.order.pop_front_in_place();
            }
            self.tombstone_count -= run;
            self.offset -= 1 + run as i64;
        } else if index == last_index {
            self.order.pop_back_in_place();
            let run = match self.order.last() {
                Some(Slot::Tombstone { run_length }) => *run_length,
                _ => 0,
            };
            for _ in 0..run {
                self.order.pop_back_in_place();
            }
            self.tombstone_count -= run;
        } else {
            let left_run = match self.order.get(index - 1) {
                Some(Slot::Tombstone { run_length }) => *run_length,
                _ => 0,
            };
            let right_run = match self.order.get(index + 1) {
                Some(Slot::Tombstone { run_length }) => *run_length,
                _ => 0,
            };
            let merged = left_run + 1 + right_run;
            let run_start = index - left_run;
            let run_end = index + right_run;
            self.order.set_at(index, Slot::Tombstone { run_length: merged });
            if run_start != index {
                self.order
                    .set_at(run_start, Slot::Tombstone { run_length: merged });
            }
            if run_end != index {
                self.order
                    .set_at(run_end, Slot::Tombstone { run_length: merged });
            }
            self.tombstone_count += 1;
        }

        if self.order.is_empty() {
            self.offset = 0;
            debug_assert_eq!(self.tombstone_count, 0);
        }
    }

    /// Rebuilds the trie and the order vector densely once tombstones
    /// outnumber live entries. The trigger is a tunable internal, not a
    /// behavioral contract: order and membership are unaffected.
    fn renumber_if_needed(&mut self) {
        if self.tombstone_count <= self.length.max(MIN_RENUMBER_THRESHOLD) {
            return;
        }
        let entries: Vec<(K, V)> = self
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut root = champ::empty_root();
        let mut order = PersistentVector::new();
        for (position, (key, value)) in entries.into_iter().enumerate() {
            let hash = hash_key(&key);
            champ::insert(
                &mut root,
                key.clone(),
                SequencedValue {
                    value: value.clone(),
                    sequence_number: position as i64,
                },
                hash,
                0,
                &hash_key::<K>,
            );
            order.push_back_in_place(Slot::Live { key, value });
        }
        self.root = root;
        self.order = order;
        self.offset = 0;
        self.tombstone_count = 0;
    }
}

// =============================================================================
// Iterator Implementations
// =============================================================================

/// A double-ended iterator over the entries of a
/// [`PersistentSequencedMap`] in insertion order.
pub struct PersistentSequencedMapIterator<'a, K, V> {
    slots: PersistentVectorIterator<'a, Slot<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for PersistentSequencedMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.slots.next()? {
                Slot::Live { key, value } => {
                    self.remaining -= 1;
                    return Some((key, value));
                }
                Slot::Tombstone { .. } => {}
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for PersistentSequencedMapIterator<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        loop {
            match self.slots.next_back()? {
                Slot::Live { key, value } => {
                    self.remaining -= 1;
                    return Some((key, value));
                }
                Slot::Tombstone { .. } => {}
            }
        }
    }
}

impl<K, V> ExactSizeIterator for PersistentSequencedMapIterator<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

/// An owning iterator over the entries of a [`PersistentSequencedMap`]
/// in insertion order.
pub struct PersistentSequencedMapIntoIterator<K, V> {
    entries: std::vec::IntoIter<(K, V)>,
}

impl<K, V> Iterator for PersistentSequencedMapIntoIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for PersistentSequencedMapIntoIterator<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.entries.next_back()
    }
}

impl<K, V> ExactSizeIterator for PersistentSequencedMapIntoIterator<K, V> {
    fn len(&self) -> usize {
        self.entries.len()
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V> Default for PersistentSequencedMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Hash + Eq, V: Clone> FromIterator<(K, V)> for PersistentSequencedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut transient = TransientSequencedMap::new();
        for (key, value) in iter {
            transient.insert(key, value);
        }
        transient.persistent()
    }
}

impl<K: Clone, V: Clone> IntoIterator for PersistentSequencedMap<K, V> {
    type Item = (K, V);
    type IntoIter = PersistentSequencedMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        let entries: Vec<(K, V)> = self
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        PersistentSequencedMapIntoIterator {
            entries: entries.into_iter(),
        }
    }
}

impl<'a, K, V> IntoIterator for &'a PersistentSequencedMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = PersistentSequencedMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Clone + Hash + Eq, V: Clone + PartialEq> PartialEq for PersistentSequencedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        // Content equality: sequence numbers are internal layout, so two
        // maps with the same entries are equal regardless of how their
        // histories arranged them internally.
        self.length == other.length
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K: Clone + Hash + Eq, V: Clone + Eq> Eq for PersistentSequencedMap<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PersistentSequencedMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// TransientSequencedMap Definition
// =============================================================================

/// A mutable builder for [`PersistentSequencedMap`].
///
/// Shares trie nodes and order-vector nodes with the snapshot it was
/// derived from; every structure is copied lazily on first write and
/// mutated in place afterwards. Freezing with
/// [`persistent`](TransientSequencedMap::persistent) consumes the builder
/// in O(1).
///
/// # Examples
///
/// ```rust
/// use persimmon::TransientSequencedMap;
///
/// let mut transient = TransientSequencedMap::new();
/// transient.insert(1, "one");
/// transient.insert_first(0, "zero");
///
/// let persistent = transient.persistent();
/// let keys: Vec<&i32> = persistent.keys().collect();
/// assert_eq!(keys, vec![&0, &1]);
/// ```
pub struct TransientSequencedMap<K, V> {
    inner: PersistentSequencedMap<K, V>,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

// Static assertions to verify TransientSequencedMap is not Send/Sync
static_assertions::assert_not_impl_any!(TransientSequencedMap<i32, i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientSequencedMap<String, String>: Send, Sync);

impl<K, V> TransientSequencedMap<K, V> {
    /// Returns the number of entries in the map.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over key-value pairs in insertion order.
    #[must_use]
    pub fn iter(&self) -> PersistentSequencedMapIterator<'_, K, V> {
        self.inner.iter()
    }

    /// Returns the first entry in insertion order.
    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.inner.first()
    }

    /// Returns the last entry in insertion order.
    #[must_use]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.inner.last()
    }
}

impl<K: Clone + Hash + Eq, V: Clone> TransientSequencedMap<K, V> {
    /// Creates a new empty transient map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: PersistentSequencedMap::new(),
            _marker: PhantomData,
        }
    }

    /// Returns a reference to the value corresponding to the key.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get(key)
    }

    /// Returns `true` if the map contains a value for the specified key.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(key)
    }

    /// Inserts a key-value pair, returning the previous value if any.
    ///
    /// A new key is appended at the back; an existing key keeps its
    /// position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.inner.insert_in_place(key, value)
    }

    /// Inserts at the front of the iteration order, moving an existing
    /// key there. Returns the previous value if any.
    pub fn insert_first(&mut self, key: K, value: V) -> Option<V> {
        self.inner.insert_first_in_place(key, value)
    }

    /// Inserts at the back of the iteration order, moving an existing
    /// key there. Returns the previous value if any.
    pub fn insert_last(&mut self, key: K, value: V) -> Option<V> {
        self.inner.insert_last_in_place(key, value)
    }

    /// Removes a key, returning its value if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.remove_in_place(key)
    }

    /// Removes and returns the first entry in insertion order.
    pub fn remove_first(&mut self) -> Option<(K, V)> {
        let key = self.inner.first().map(|(key, _)| key.clone())?;
        let value = self.inner.remove_in_place(&key)?;
        Some((key, value))
    }

    /// Removes and returns the last entry in insertion order.
    pub fn remove_last(&mut self) -> Option<(K, V)> {
        let key = self.inner.last().map(|(key, _)| key.clone())?;
        let value = self.inner.remove_in_place(&key)?;
        Some((key, value))
    }

    /// Converts this transient map into a persistent map in O(1).
    #[must_use]
    pub fn persistent(self) -> PersistentSequencedMap<K, V> {
        self.inner
    }
}

impl<K: Clone + Hash + Eq, V: Clone> Default for TransientSequencedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Hash + Eq, V: Clone> Extend<(K, V)> for TransientSequencedMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone> FromIterator<(K, V)> for TransientSequencedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut transient = Self::new();
        transient.extend(iter);
        transient
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K: serde::Serialize, V: serde::Serialize> serde::Serialize for PersistentSequencedMap<K, V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentSequencedMapVisitor<K, V> {
    key_marker: PhantomData<K>,
    value_marker: PhantomData<V>,
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for PersistentSequencedMapVisitor<K, V>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    type Value = PersistentSequencedMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        // Entries were serialized in insertion order, so sequential
        // appends reproduce it.
        let mut transient = TransientSequencedMap::new();
        while let Some((key, value)) = access.next_entry()? {
            transient.insert(key, value);
        }
        Ok(transient.persistent())
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for PersistentSequencedMap<K, V>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentSequencedMapVisitor {
            key_marker: PhantomData,
            value_marker: PhantomData,
        })
    }
}

#[cfg(feature = "serde")]
impl<K: serde::Serialize, V: serde::Serialize> serde::Serialize for TransientSequencedMap<K, V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.inner.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for TransientSequencedMap<K, V>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        PersistentSequencedMap::deserialize(deserializer).map(PersistentSequencedMap::transient)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn collect_keys(map: &PersistentSequencedMap<i32, i32>) -> Vec<i32> {
        map.keys().copied().collect()
    }

    #[rstest]
    fn test_insert_appends_at_back() {
        let map = PersistentSequencedMap::new()
            .insert(1, 10)
            .insert(2, 20)
            .insert(3, 30);
        assert_eq!(collect_keys(&map), vec![1, 2, 3]);
    }

    #[rstest]
    fn test_insert_existing_key_keeps_position() {
        let map = PersistentSequencedMap::new()
            .insert(1, 10)
            .insert(2, 20)
            .insert(1, 100);
        assert_eq!(collect_keys(&map), vec![1, 2]);
        assert_eq!(map.get(&1), Some(&100));
        assert_eq!(map.len(), 2);
    }

    #[rstest]
    fn test_insert_first_prepends_and_moves() {
        let map = PersistentSequencedMap::new()
            .insert(1, 10)
            .insert(2, 20)
            .insert_first(0, 0);
        assert_eq!(collect_keys(&map), vec![0, 1, 2]);

        let moved = map.insert_first(2, 200);
        assert_eq!(collect_keys(&moved), vec![2, 0, 1]);
        assert_eq!(moved.get(&2), Some(&200));
        assert_eq!(moved.len(), 3);
    }

    #[rstest]
    fn test_insert_last_moves_to_back() {
        let map = PersistentSequencedMap::new()
            .insert(1, 10)
            .insert(2, 20)
            .insert(3, 30)
            .insert_last(1, 100);
        assert_eq!(collect_keys(&map), vec![2, 3, 1]);
        assert_eq!(map.len(), 3);
    }

    #[rstest]
    fn test_remove_interior_leaves_no_visible_hole() {
        let map = PersistentSequencedMap::new()
            .insert(1, 10)
            .insert(2, 20)
            .insert(3, 30)
            .remove(&2);
        assert_eq!(collect_keys(&map), vec![1, 3]);
        assert_eq!(map.len(), 2);
        assert!(!map.contains_key(&2));
    }

    #[rstest]
    fn test_remove_boundaries() {
        let map: PersistentSequencedMap<i32, i32> = (0..5).map(|i| (i, i)).collect();
        let without_first = map.remove(&0);
        assert_eq!(collect_keys(&without_first), vec![1, 2, 3, 4]);
        let without_last = without_first.remove(&4);
        assert_eq!(collect_keys(&without_last), vec![1, 2, 3]);
    }

    #[rstest]
    fn test_reverse_iteration() {
        let map: PersistentSequencedMap<i32, i32> = (0..10).map(|i| (i, i)).collect();
        let reversed: Vec<i32> = map.iter_reversed().map(|(key, _)| *key).collect();
        let expected: Vec<i32> = (0..10).rev().collect();
        assert_eq!(reversed, expected);
    }

    #[rstest]
    fn test_reverse_iteration_skips_tombstones() {
        let map: PersistentSequencedMap<i32, i32> = (0..10).map(|i| (i, i)).collect();
        let holed = map.remove(&3).remove(&4).remove(&7);
        let reversed: Vec<i32> = holed.iter_reversed().map(|(key, _)| *key).collect();
        assert_eq!(reversed, vec![9, 8, 6, 5, 2, 1, 0]);
    }

    #[rstest]
    fn test_adjacent_tombstone_runs_merge() {
        let mut map: PersistentSequencedMap<i32, i32> = (0..9).map(|i| (i, i)).collect();
        // Carve one interior run out of positions 1..=7, removing in an
        // order that exercises left-merge, right-merge, and both-merge.
        for key in [3, 5, 4, 2, 6, 1, 7] {
            map = map.remove(&key);
        }
        assert_eq!(collect_keys(&map), vec![0, 8]);
        assert_eq!(map.len(), 2);
    }

    #[rstest]
    fn test_renumbering_preserves_order_and_membership() {
        let mut map: PersistentSequencedMap<i32, i32> = (0..4).map(|i| (i, i * 10)).collect();
        let mut model: Vec<i32> = (0..4).collect();

        // Repeatedly move the second entry to the back. Each move leaves
        // an interior tombstone, so the renumber threshold is crossed
        // several times over; the observable order must match a plain
        // list model throughout.
        for _ in 0..30 {
            let moved = model.remove(1);
            model.push(moved);
            map = map.insert_last(moved, moved * 10);
            assert_eq!(collect_keys(&map), model);
        }

        assert_eq!(map.len(), 4);
        for key in 0..4 {
            assert_eq!(map.get(&key), Some(&(key * 10)));
        }
    }

    #[rstest]
    fn test_remove_first_and_last() {
        let map: PersistentSequencedMap<i32, i32> = (0..3).map(|i| (i, i * 10)).collect();

        let (rest, (key, value)) = map.remove_first().expect("non-empty");
        assert_eq!((key, value), (0, 0));
        assert_eq!(collect_keys(&rest), vec![1, 2]);

        let (rest, (key, _)) = rest.remove_last().expect("non-empty");
        assert_eq!(key, 2);
        assert_eq!(collect_keys(&rest), vec![1]);
    }

    #[rstest]
    fn test_transient_round_trip_preserves_order() {
        let persistent: PersistentSequencedMap<i32, i32> = (0..20).map(|i| (i, i)).collect();
        let snapshot = persistent.clone();

        let mut transient = persistent.transient();
        transient.insert_first(-1, -1);
        transient.remove(&10);
        let rebuilt = transient.persistent();

        assert_eq!(snapshot.len(), 20);
        let mut expected: Vec<i32> = vec![-1];
        expected.extend((0..20).filter(|key| *key != 10));
        assert_eq!(collect_keys(&rebuilt), expected);
    }

    #[rstest]
    fn test_equality_ignores_insertion_history() {
        let left = PersistentSequencedMap::new().insert(1, 10).insert(2, 20);
        let right = PersistentSequencedMap::new().insert(2, 20).insert(1, 10);
        assert_eq!(left, right);
    }

    #[rstest]
    fn test_empty_after_removals_accepts_new_entries() {
        let map = PersistentSequencedMap::new()
            .insert(1, 1)
            .insert(2, 2)
            .remove(&1)
            .remove(&2)
            .insert(5, 5);
        assert_eq!(collect_keys(&map), vec![5]);
    }
}
