//! Persistent (immutable) hash map based on a CHAMP trie.
//!
//! This module provides [`PersistentHashMap`], an immutable hash map that
//! uses structural sharing for efficient operations, and its mutable
//! builder counterpart [`TransientHashMap`].
//!
//! # Overview
//!
//! `PersistentHashMap` navigates a 32-way branching trie by key hash:
//!
//! - O(log32 N) get (effectively O(1) for practical sizes)
//! - O(log32 N) insert
//! - O(log32 N) remove
//! - O(1) len and `is_empty`
//! - O(1) conversion to and from [`TransientHashMap`]
//!
//! All operations return new maps without modifying the original, and
//! structural sharing ensures memory efficiency.
//!
//! # Hashing
//!
//! Key hashes are scrambled with a process-wide random salt shared by the
//! whole hash-map family (including [`PersistentHashSet`]), which defeats
//! hash-flooding while keeping equal-content maps structurally identical
//! within one process.
//!
//! [`PersistentHashSet`]: crate::PersistentHashSet
//!
//! # Examples
//!
//! ```rust
//! use persimmon::PersistentHashMap;
//!
//! let map = PersistentHashMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2);
//!
//! assert_eq!(map.get("one"), Some(&1));
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));       // Original unchanged
//! assert_eq!(updated.get("one"), Some(&100)); // New version
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::OnceLock;

use crate::ReferenceCounter;
use crate::champ::{self, ChampIterator, ChangeEvent, Node};

// =============================================================================
// Family Hashing
// =============================================================================

/// Hash salt shared by every hash map and hash set in this process.
static HASH_FAMILY_SALT: OnceLock<u32> = OnceLock::new();

/// Computes the salted hash of a key for the hash-map family.
pub(crate) fn hash_key<K: Hash + ?Sized>(key: &K) -> u32 {
    let salt = *HASH_FAMILY_SALT.get_or_init(champ::initialize_family_salt);
    champ::salted_hash(salt, key)
}

// =============================================================================
// PersistentHashMap Definition
// =============================================================================

/// A persistent (immutable) hash map based on a CHAMP trie.
///
/// `PersistentHashMap` is an immutable data structure that uses structural
/// sharing to efficiently support functional programming patterns.
///
/// # Time Complexity
///
/// | Operation      | Complexity        |
/// |----------------|-------------------|
/// | `new`          | O(1)              |
/// | `get`          | O(log32 N)        |
/// | `insert`       | O(log32 N)        |
/// | `remove`       | O(log32 N)        |
/// | `contains_key` | O(log32 N)        |
/// | `len`          | O(1)              |
/// | `is_empty`     | O(1)              |
/// | `transient`    | O(1)              |
///
/// # Examples
///
/// ```rust
/// use persimmon::PersistentHashMap;
///
/// let map = PersistentHashMap::singleton("key".to_string(), 42);
/// assert_eq!(map.get("key"), Some(&42));
/// ```
#[derive(Clone)]
pub struct PersistentHashMap<K, V> {
    /// Root node of the trie
    root: ReferenceCounter<Node<K, V>>,
    /// Number of entries
    length: usize,
}

impl<K, V> PersistentHashMap<K, V> {
    /// Creates a new empty map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentHashMap;
    ///
    /// let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: champ::empty_root(),
            length: 0,
        }
    }

    /// Returns the number of entries in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
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

    /// Returns an iterator over key-value pairs.
    ///
    /// The iteration order is unspecified but stable for a given map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    ///
    /// let total: i32 = map.iter().map(|(_, value)| value).sum();
    /// assert_eq!(total, 3);
    /// ```
    #[must_use]
    pub fn iter(&self) -> PersistentHashMapIterator<'_, K, V> {
        PersistentHashMapIterator {
            inner: ChampIterator::new(&self.root, self.length),
        }
    }

    /// Returns an iterator over keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }
}

impl<K: Clone + Hash + Eq, V: Clone> PersistentHashMap<K, V> {
    /// Creates a map containing a single key-value pair.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::singleton("key".to_string(), 42);
    /// assert_eq!(map.len(), 1);
    /// ```
    #[inline]
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        Self::new().insert(key, value)
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash`
    /// and `Eq` on the borrowed form must match those for the key type.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert("hello".to_string(), 42);
    ///
    /// // Can use &str to look up String keys
    /// assert_eq!(map.get("hello"), Some(&42));
    /// assert_eq!(map.get("world"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_key(key);
        champ::find(&self.root, key, hash, 0).map(|(_, value)| value)
    }

    /// Returns `true` if the map contains a value for the specified key.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already contains the key, the value is replaced.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentHashMap;
    ///
    /// let map1 = PersistentHashMap::new().insert("key".to_string(), 1);
    /// let map2 = map1.insert("key".to_string(), 2);
    ///
    /// assert_eq!(map1.get("key"), Some(&1)); // Original unchanged
    /// assert_eq!(map2.get("key"), Some(&2)); // New version
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let hash = hash_key(&key);
        let mut root = self.root.clone();
        let event = champ::insert(&mut root, key, value, hash, 0, &hash_key::<K>);
        let length = match event {
            ChangeEvent::Inserted => self.length + 1,
            _ => self.length,
        };
        Self { root, length }
    }

    /// Removes a key from the map.
    ///
    /// Returns a new map without the key. If the key doesn't exist,
    /// returns a clone of the original map.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// let removed = map.remove("a");
    ///
    /// assert_eq!(map.len(), 2);     // Original unchanged
    /// assert_eq!(removed.len(), 1); // New version
    /// ```
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_key(key);
        if champ::find(&self.root, key, hash, 0).is_none() {
            return self.clone();
        }
        let mut root = self.root.clone();
        let event = champ::remove(&mut root, key, hash, 0);
        debug_assert!(matches!(event, ChangeEvent::Removed(_)));
        Self {
            root,
            length: self.length - 1,
        }
    }

    /// Updates or removes a value for a key using an updater function.
    ///
    /// The updater receives `Some(&V)` if the key exists, or `None` if it
    /// doesn't. Returning `Some(V)` inserts or updates; returning `None`
    /// removes the key (if it exists).
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert("count".to_string(), 10);
    ///
    /// let updated = map.update_with("count", |value| value.map(|v| v + 1));
    /// assert_eq!(updated.get("count"), Some(&11));
    ///
    /// let removed = map.update_with("count", |_| None);
    /// assert_eq!(removed.get("count"), None);
    /// ```
    #[must_use]
    pub fn update_with<Q, F>(&self, key: &Q, updater: F) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        match (self.get(key), updater(self.get(key))) {
            (_, Some(value)) => self.insert(key.to_owned(), value),
            (Some(_), None) => self.remove(key),
            (None, None) => self.clone(),
        }
    }

    /// Merges two maps, with values from `other` taking precedence on key
    /// conflicts.
    ///
    /// # Complexity
    ///
    /// O(M log32 N) where M is the size of `other`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentHashMap;
    ///
    /// let left = PersistentHashMap::new().insert("a".to_string(), 1);
    /// let right = PersistentHashMap::new().insert("b".to_string(), 2);
    ///
    /// let merged = left.merge(&right);
    /// assert_eq!(merged.len(), 2);
    /// ```
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut transient = self.clone().transient();
        for (key, value) in other.iter() {
            transient.insert(key.clone(), value.clone());
        }
        transient.persistent()
    }

    /// Removes every key yielded by `keys`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2)
    ///     .insert("c".to_string(), 3);
    ///
    /// let trimmed = map.remove_all(["a", "c"]);
    /// assert_eq!(trimmed.len(), 1);
    /// assert!(trimmed.contains_key("b"));
    /// ```
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

    /// Keeps only the entries whose keys are yielded by `keys`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2)
    ///     .insert("c".to_string(), 3);
    ///
    /// let kept = map.retain_all(["a", "c"]);
    /// assert_eq!(kept.len(), 2);
    /// assert!(!kept.contains_key("b"));
    /// ```
    #[must_use]
    pub fn retain_all<'a, Q, I>(&self, keys: I) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        let keep: std::collections::HashSet<&Q> = keys.into_iter().collect();
        let mut transient = self.clone().transient();
        let doomed: Vec<K> = self
            .iter()
            .filter(|(key, _)| {
                let borrowed: &Q = (*key).borrow();
                !keep.contains(borrowed)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            let borrowed: &Q = key.borrow();
            transient.remove(borrowed);
        }
        transient.persistent()
    }

    /// Converts this persistent map into a transient map in O(1).
    ///
    /// The transient shares every trie node with this snapshot until its
    /// first write through each of them.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentHashMap;
    ///
    /// let persistent = PersistentHashMap::new().insert(1, "one");
    ///
    /// let mut transient = persistent.transient();
    /// transient.insert(2, "two");
    ///
    /// let rebuilt = transient.persistent();
    /// assert_eq!(rebuilt.len(), 2);
    /// ```
    #[must_use]
    pub fn transient(self) -> TransientHashMap<K, V> {
        TransientHashMap {
            root: self.root,
            length: self.length,
            _marker: PhantomData,
        }
    }
}

// =============================================================================
// Iterator Implementations
// =============================================================================

/// An iterator over key-value pairs of a [`PersistentHashMap`].
pub struct PersistentHashMapIterator<'a, K, V> {
    inner: ChampIterator<'a, K, V>,
}

impl<'a, K, V> Iterator for PersistentHashMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for PersistentHashMapIterator<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// An owning iterator over key-value pairs of a [`PersistentHashMap`].
pub struct PersistentHashMapIntoIterator<K, V> {
    entries: std::vec::IntoIter<(K, V)>,
}

impl<K, V> Iterator for PersistentHashMapIntoIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> ExactSizeIterator for PersistentHashMapIntoIterator<K, V> {
    fn len(&self) -> usize {
        self.entries.len()
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V> Default for PersistentHashMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Hash + Eq, V: Clone> FromIterator<(K, V)> for PersistentHashMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut transient = TransientHashMap::new();
        for (key, value) in iter {
            transient.insert(key, value);
        }
        transient.persistent()
    }
}

impl<K: Clone, V: Clone> IntoIterator for PersistentHashMap<K, V> {
    type Item = (K, V);
    type IntoIter = PersistentHashMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        let entries: Vec<(K, V)> = self
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        PersistentHashMapIntoIterator {
            entries: entries.into_iter(),
        }
    }
}

impl<'a, K, V> IntoIterator for &'a PersistentHashMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = PersistentHashMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Eq, V: PartialEq> PartialEq for PersistentHashMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        // Same salt + canonical trie form make equal content structurally
        // identical, so no per-key lookups are needed.
        self.length == other.length && champ::node_equals(&self.root, &other.root)
    }
}

impl<K: Eq, V: Eq> Eq for PersistentHashMap<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PersistentHashMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// TransientHashMap Definition
// =============================================================================

/// A mutable builder for [`PersistentHashMap`].
///
/// A transient shares trie nodes with the persistent snapshot it was
/// derived from; the first write through a shared node copies it, and
/// subsequent writes through exclusively-owned nodes happen in place.
/// Converting back with [`persistent`](TransientHashMap::persistent)
/// consumes the transient in O(1), so a frozen builder can never be
/// mutated again.
///
/// Iterators borrow the transient, so mutating it while an iterator is
/// live is rejected at compile time.
///
/// # Examples
///
/// ```rust
/// use persimmon::{PersistentHashMap, TransientHashMap};
///
/// let mut transient = TransientHashMap::new();
/// transient.insert("one".to_string(), 1);
/// transient.insert("two".to_string(), 2);
///
/// let persistent = transient.persistent();
/// assert_eq!(persistent.len(), 2);
/// ```
pub struct TransientHashMap<K, V> {
    root: ReferenceCounter<Node<K, V>>,
    length: usize,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

// Static assertions to verify TransientHashMap is not Send/Sync
static_assertions::assert_not_impl_any!(TransientHashMap<i32, i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientHashMap<String, String>: Send, Sync);

impl<K, V> TransientHashMap<K, V> {
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

    /// Returns an iterator over key-value pairs.
    #[must_use]
    pub fn iter(&self) -> PersistentHashMapIterator<'_, K, V> {
        PersistentHashMapIterator {
            inner: ChampIterator::new(&self.root, self.length),
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone> TransientHashMap<K, V> {
    /// Creates a new empty transient map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: champ::empty_root(),
            length: 0,
            _marker: PhantomData,
        }
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
        champ::find(&self.root, key, hash, 0).map(|(_, value)| value)
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

    /// Inserts a key-value pair, returning the previous value if the key
    /// was already present.
    ///
    /// # Complexity
    ///
    /// O(log32 N), amortized in place once the touched path is owned
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = hash_key(&key);
        match champ::insert(&mut self.root, key, value, hash, 0, &hash_key::<K>) {
            ChangeEvent::Inserted => {
                self.length += 1;
                None
            }
            ChangeEvent::Replaced(old) => Some(old),
            _ => None,
        }
    }

    /// Removes a key, returning its value if it was present.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_key(key);
        if champ::find(&self.root, key, hash, 0).is_none() {
            return None;
        }
        match champ::remove(&mut self.root, key, hash, 0) {
            ChangeEvent::Removed(value) => {
                self.length -= 1;
                Some(value)
            }
            _ => None,
        }
    }

    /// Converts this transient map into a persistent map in O(1).
    #[must_use]
    pub fn persistent(self) -> PersistentHashMap<K, V> {
        PersistentHashMap {
            root: self.root,
            length: self.length,
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone> Default for TransientHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Hash + Eq, V: Clone> Extend<(K, V)> for TransientHashMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone> FromIterator<(K, V)> for TransientHashMap<K, V> {
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
impl<K: serde::Serialize, V: serde::Serialize> serde::Serialize for PersistentHashMap<K, V> {
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
struct PersistentHashMapVisitor<K, V> {
    key_marker: PhantomData<K>,
    value_marker: PhantomData<V>,
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for PersistentHashMapVisitor<K, V>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    type Value = PersistentHashMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut transient = TransientHashMap::new();
        while let Some((key, value)) = access.next_entry()? {
            transient.insert(key, value);
        }
        Ok(transient.persistent())
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for PersistentHashMap<K, V>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentHashMapVisitor {
            key_marker: PhantomData,
            value_marker: PhantomData,
        })
    }
}

#[cfg(feature = "serde")]
impl<K: serde::Serialize, V: serde::Serialize> serde::Serialize for TransientHashMap<K, V> {
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
impl<'de, K, V> serde::Deserialize<'de> for TransientHashMap<K, V>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        PersistentHashMap::deserialize(deserializer).map(PersistentHashMap::transient)
    }
}

// =============================================================================
// Tests
// =============================================================================
