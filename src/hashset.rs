//! Persistent (immutable) hash set based on the CHAMP hash map.
//!
//! This module provides [`PersistentHashSet`] and its mutable builder
//! counterpart [`TransientHashSet`]. Both are thin wrappers over the
//! hash-map family with `()` values, so they share the family's trie
//! engine, hash salt, and complexity bounds.
//!
//! # Examples
//!
//! ```rust
//! use persimmon::PersistentHashSet;
//!
//! let set = PersistentHashSet::new().insert(1).insert(2).insert(3);
//! assert!(set.contains(&1));
//!
//! // Structural sharing: the original set is preserved
//! let updated = set.insert(4);
//! assert_eq!(set.len(), 3);
//! assert_eq!(updated.len(), 4);
//!
//! // Set operations
//! let other: PersistentHashSet<i32> = [2, 3, 4].into_iter().collect();
//! assert_eq!(set.union(&other).len(), 4);
//! assert_eq!(set.intersection(&other).len(), 2);
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::hashmap::{
    PersistentHashMap, PersistentHashMapIntoIterator, PersistentHashMapIterator, TransientHashMap,
};

// =============================================================================
// PersistentHashSet Definition
// =============================================================================

/// A persistent (immutable) hash set based on a CHAMP trie.
///
/// # Time Complexity
///
/// | Operation   | Complexity |
/// |-------------|------------|
/// | `contains`  | O(log32 N) |
/// | `insert`    | O(log32 N) |
/// | `remove`    | O(log32 N) |
/// | `len`       | O(1)       |
/// | `transient` | O(1)       |
///
/// # Examples
///
/// ```rust
/// use persimmon::PersistentHashSet;
///
/// let set = PersistentHashSet::singleton(42);
/// assert!(set.contains(&42));
/// ```
#[derive(Clone)]
pub struct PersistentHashSet<T> {
    inner: PersistentHashMap<T, ()>,
}

impl<T> PersistentHashSet<T> {
    /// Creates a new empty set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: PersistentHashMap::new(),
        }
    }

    /// Returns the number of elements in the set.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over the elements.
    ///
    /// The iteration order is unspecified but stable for a given set.
    #[must_use]
    pub fn iter(&self) -> PersistentHashSetIterator<'_, T> {
        PersistentHashSetIterator {
            inner: self.inner.iter(),
        }
    }
}

impl<T: Clone + Hash + Eq> PersistentHashSet<T> {
    /// Creates a set containing a single element.
    #[inline]
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self::new().insert(element)
    }

    /// Returns `true` if the set contains the specified element.
    ///
    /// The element may be any borrowed form of the set's element type,
    /// but `Hash` and `Eq` on the borrowed form must match those for the
    /// element type.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentHashSet;
    ///
    /// let set = PersistentHashSet::singleton("hello".to_string());
    /// assert!(set.contains("hello"));
    /// assert!(!set.contains("world"));
    /// ```
    #[must_use]
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(element)
    }

    /// Inserts an element, returning a new set.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    #[must_use]
    pub fn insert(&self, element: T) -> Self {
        Self {
            inner: self.inner.insert(element, ()),
        }
    }

    /// Removes an element, returning a new set.
    ///
    /// If the element is absent, returns a clone of the original set.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    #[must_use]
    pub fn remove<Q>(&self, element: &Q) -> Self
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Self {
            inner: self.inner.remove(element),
        }
    }

    /// Returns the union of `self` and `other`.
    ///
    /// # Complexity
    ///
    /// O(M log32 N) where M is the size of `other`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentHashSet;
    ///
    /// let left: PersistentHashSet<i32> = [1, 2].into_iter().collect();
    /// let right: PersistentHashSet<i32> = [2, 3].into_iter().collect();
    /// assert_eq!(left.union(&right).len(), 3);
    /// ```
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            inner: self.inner.merge(&other.inner),
        }
    }

    /// Returns the intersection of `self` and `other`.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let mut transient = TransientHashSet::new();
        for element in self.iter() {
            if other.contains(element) {
                transient.insert(element.clone());
            }
        }
        transient.persistent()
    }

    /// Returns the elements of `self` that are not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        let mut transient = TransientHashSet::new();
        for element in self.iter() {
            if !other.contains(element) {
                transient.insert(element.clone());
            }
        }
        transient.persistent()
    }

    /// Returns `true` if every element of `self` is in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().all(|element| other.contains(element))
    }

    /// Removes every element yielded by `elements`.
    #[must_use]
    pub fn remove_all<'a, Q, I>(&self, elements: I) -> Self
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        Self {
            inner: self.inner.remove_all(elements),
        }
    }

    /// Keeps only the elements yielded by `elements`.
    #[must_use]
    pub fn retain_all<'a, Q, I>(&self, elements: I) -> Self
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        Self {
            inner: self.inner.retain_all(elements),
        }
    }

    /// Converts this persistent set into a transient set in O(1).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentHashSet;
    ///
    /// let persistent: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
    ///
    /// let mut transient = persistent.transient();
    /// transient.insert(4);
    /// transient.remove(&1);
    ///
    /// let rebuilt = transient.persistent();
    /// assert_eq!(rebuilt.len(), 3);
    /// ```
    #[must_use]
    pub fn transient(self) -> TransientHashSet<T> {
        TransientHashSet {
            inner: self.inner.transient(),
            _marker: PhantomData,
        }
    }
}

// =============================================================================
// Iterator Implementations
// =============================================================================

/// An iterator over the elements of a [`PersistentHashSet`].
pub struct PersistentHashSetIterator<'a, T> {
    inner: PersistentHashMapIterator<'a, T, ()>,
}

impl<'a, T> Iterator for PersistentHashSetIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for PersistentHashSetIterator<'_, T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// An owning iterator over the elements of a [`PersistentHashSet`].
pub struct PersistentHashSetIntoIterator<T> {
    inner: PersistentHashMapIntoIterator<T, ()>,
}

impl<T> Iterator for PersistentHashSetIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for PersistentHashSetIntoIterator<T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for PersistentHashSet<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Hash + Eq> FromIterator<T> for PersistentHashSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut transient = TransientHashSet::new();
        for element in iter {
            transient.insert(element);
        }
        transient.persistent()
    }
}

impl<T: Clone> IntoIterator for PersistentHashSet<T> {
    type Item = T;
    type IntoIter = PersistentHashSetIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentHashSetIntoIterator {
            inner: self.inner.into_iter(),
        }
    }
}

impl<'a, T> IntoIterator for &'a PersistentHashSet<T> {
    type Item = &'a T;
    type IntoIter = PersistentHashSetIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Eq> PartialEq for PersistentHashSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T: Eq> Eq for PersistentHashSet<T> {}

impl<T: fmt::Debug> fmt::Debug for PersistentHashSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

// =============================================================================
// TransientHashSet Definition
// =============================================================================

/// A mutable builder for [`PersistentHashSet`].
///
/// See [`TransientHashMap`] for the sharing and freezing rules; the set
/// builder wraps that type with `()` values.
///
/// # Examples
///
/// ```rust
/// use persimmon::TransientHashSet;
///
/// let mut transient = TransientHashSet::new();
/// transient.insert(1);
/// transient.insert(2);
///
/// let persistent = transient.persistent();
/// assert_eq!(persistent.len(), 2);
/// ```
pub struct TransientHashSet<T> {
    inner: TransientHashMap<T, ()>,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

// Static assertions to verify TransientHashSet is not Send/Sync
static_assertions::assert_not_impl_any!(TransientHashSet<i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientHashSet<String>: Send, Sync);

impl<T> TransientHashSet<T> {
    /// Returns the number of elements in the set.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over the elements.
    #[must_use]
    pub fn iter(&self) -> PersistentHashSetIterator<'_, T> {
        PersistentHashSetIterator {
            inner: self.inner.iter(),
        }
    }
}

impl<T: Clone + Hash + Eq> TransientHashSet<T> {
    /// Creates a new empty transient set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: TransientHashMap::new(),
            _marker: PhantomData,
        }
    }

    /// Returns `true` if the set contains the specified element.
    #[must_use]
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(element)
    }

    /// Inserts an element.
    ///
    /// Returns `true` if the element was newly inserted, `false` if it
    /// was already present.
    pub fn insert(&mut self, element: T) -> bool {
        self.inner.insert(element, ()).is_none()
    }

    /// Removes an element.
    ///
    /// Returns `true` if the element was present and removed.
    pub fn remove<Q>(&mut self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.remove(element).is_some()
    }

    /// Converts this transient set into a persistent set in O(1).
    #[must_use]
    pub fn persistent(self) -> PersistentHashSet<T> {
        PersistentHashSet {
            inner: self.inner.persistent(),
        }
    }
}

impl<T: Clone + Hash + Eq> Default for TransientHashSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Hash + Eq> Extend<T> for TransientHashSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for element in iter {
            self.insert(element);
        }
    }
}

impl<T: Clone + Hash + Eq> FromIterator<T> for TransientHashSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut transient = Self::new();
        transient.extend(iter);
        transient
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for PersistentHashSet<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
struct PersistentHashSetVisitor<T> {
    marker: PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for PersistentHashSetVisitor<T>
where
    T: serde::Deserialize<'de> + Clone + Hash + Eq,
{
    type Value = PersistentHashSet<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence of elements")
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut transient = TransientHashSet::new();
        while let Some(element) = access.next_element()? {
            transient.insert(element);
        }
        Ok(transient.persistent())
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for PersistentHashSet<T>
where
    T: serde::Deserialize<'de> + Clone + Hash + Eq,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentHashSetVisitor {
            marker: PhantomData,
        })
    }
}

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for TransientHashSet<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for TransientHashSet<T>
where
    T: serde::Deserialize<'de> + Clone + Hash + Eq,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        PersistentHashSet::deserialize(deserializer).map(PersistentHashSet::transient)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_insert_and_contains() {
        let set = PersistentHashSet::new().insert(1).insert(2);
        assert!(set.contains(&1));
        assert!(set.contains(&2));
        assert!(!set.contains(&3));
    }

    #[rstest]
    fn test_insert_is_idempotent() {
        let set = PersistentHashSet::new().insert(1).insert(1);
        assert_eq!(set.len(), 1);
    }

    #[rstest]
    fn test_remove() {
        let set: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
        let removed = set.remove(&2);
        assert_eq!(set.len(), 3);
        assert_eq!(removed.len(), 2);
        assert!(!removed.contains(&2));
    }

    #[rstest]
    fn test_set_operations() {
        let left: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
        let right: PersistentHashSet<i32> = [2, 3, 4].into_iter().collect();

        assert_eq!(left.union(&right).len(), 4);
        assert_eq!(left.intersection(&right).len(), 2);
        assert_eq!(left.difference(&right).len(), 1);
        assert!(left.difference(&right).contains(&1));
        assert!(left.intersection(&right).is_subset(&left));
    }

    #[rstest]
    fn test_equality() {
        let left: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
        let right: PersistentHashSet<i32> = [3, 2, 1].into_iter().collect();
        assert_eq!(left, right);
    }

    #[rstest]
    fn test_transient_round_trip() {
        let persistent: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
        let rebuilt = persistent.clone().transient().persistent();
        assert_eq!(persistent, rebuilt);
    }

    #[rstest]
    fn test_retain_all() {
        let set: PersistentHashSet<String> = ["a", "b", "c"]
            .into_iter()
            .map(str::to_string)
            .collect();
        let kept = set.retain_all(["a", "c"]);
        assert_eq!(kept.len(), 2);
        assert!(!kept.contains("b"));
    }
}
