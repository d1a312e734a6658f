//! Persistent (immutable) insertion-ordered hash set.
//!
//! This module provides [`PersistentSequencedSet`] and its mutable
//! builder counterpart [`TransientSequencedSet`], thin wrappers over the
//! sequenced map family with `()` values.
//!
//! # Examples
//!
//! ```rust
//! use persimmon::PersistentSequencedSet;
//!
//! let set = PersistentSequencedSet::new()
//!     .insert_last(1)
//!     .insert_last(2)
//!     .insert_first(0);
//!
//! let elements: Vec<&i32> = set.iter().collect();
//! assert_eq!(elements, vec![&0, &1, &2]);
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::sequenced_map::{
    PersistentSequencedMap, PersistentSequencedMapIntoIterator, PersistentSequencedMapIterator,
    TransientSequencedMap,
};

// =============================================================================
// PersistentSequencedSet Definition
// =============================================================================

/// A persistent (immutable) hash set that preserves insertion order.
///
/// # Time Complexity
///
/// | Operation      | Complexity             |
/// |----------------|------------------------|
/// | `contains`     | O(log32 N)             |
/// | `insert`       | amortized O(log32 N)   |
/// | `remove`       | amortized O(log32 N)   |
/// | `iter`         | amortized O(1) / entry |
/// | `len`          | O(1)                   |
///
/// # Examples
///
/// ```rust
/// use persimmon::PersistentSequencedSet;
///
/// let set = PersistentSequencedSet::new().insert(3).insert(1).insert(2);
/// let elements: Vec<&i32> = set.iter().collect();
/// assert_eq!(elements, vec![&3, &1, &2]); // insertion order, not sorted
/// ```
#[derive(Clone)]
pub struct PersistentSequencedSet<T> {
    inner: PersistentSequencedMap<T, ()>,
}

impl<T> PersistentSequencedSet<T> {
    /// Creates a new empty set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: PersistentSequencedMap::new(),
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

    /// Returns an iterator over the elements in insertion order.
    #[must_use]
    pub fn iter(&self) -> PersistentSequencedSetIterator<'_, T> {
        PersistentSequencedSetIterator {
            inner: self.inner.iter(),
        }
    }

    /// Returns an iterator over the elements in reverse insertion order.
    #[must_use]
    pub fn iter_reversed(&self) -> std::iter::Rev<PersistentSequencedSetIterator<'_, T>> {
        self.iter().rev()
    }

    /// Returns the first element in insertion order.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.inner.first().map(|(element, ())| element)
    }

    /// Returns the last element in insertion order.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.inner.last().map(|(element, ())| element)
    }
}

impl<T: Clone + Hash + Eq> PersistentSequencedSet<T> {
    /// Creates a set containing a single element.
    #[inline]
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self::new().insert(element)
    }

    /// Returns `true` if the set contains the specified element.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
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
    /// A new element is appended at the back of the iteration order; an
    /// existing element keeps its position.
    #[must_use]
    pub fn insert(&self, element: T) -> Self {
        Self {
            inner: self.inner.insert(element, ()),
        }
    }

    /// Inserts an element at the front of the iteration order, moving it
    /// there if it is already present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentSequencedSet;
    ///
    /// let set = PersistentSequencedSet::new()
    ///     .insert_last(1)
    ///     .insert_last(2)
    ///     .insert_first(0);
    ///
    /// let elements: Vec<&i32> = set.iter().collect();
    /// assert_eq!(elements, vec![&0, &1, &2]);
    /// ```
    #[must_use]
    pub fn insert_first(&self, element: T) -> Self {
        Self {
            inner: self.inner.insert_first(element, ()),
        }
    }

    /// Inserts an element at the back of the iteration order, moving it
    /// there if it is already present.
    #[must_use]
    pub fn insert_last(&self, element: T) -> Self {
        Self {
            inner: self.inner.insert_last(element, ()),
        }
    }

    /// Removes an element.
    ///
    /// If the element is absent, returns a clone of the original set.
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

    /// Removes the first element in insertion order.
    ///
    /// Returns `None` if the set is empty, otherwise the new set and the
    /// removed element.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentSequencedSet;
    ///
    /// let set = PersistentSequencedSet::new().insert_last(1).insert_last(2);
    /// let (rest, element) = set.remove_first().unwrap();
    /// assert_eq!(element, 1);
    /// assert_eq!(rest.len(), 1);
    /// ```
    #[must_use]
    pub fn remove_first(&self) -> Option<(Self, T)> {
        let (rest, (element, ())) = self.inner.remove_first()?;
        Some((Self { inner: rest }, element))
    }

    /// Removes the last element in insertion order.
    #[must_use]
    pub fn remove_last(&self) -> Option<(Self, T)> {
        let (rest, (element, ())) = self.inner.remove_last()?;
        Some((Self { inner: rest }, element))
    }

    /// Returns the union of `self` and `other`.
    ///
    /// Elements of `other` that are new are appended in `other`'s order.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            inner: self.inner.merge(&other.inner),
        }
    }

    /// Returns the intersection of `self` and `other`, keeping `self`'s
    /// order.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let mut transient = TransientSequencedSet::new();
        for element in self.iter() {
            if other.contains(element) {
                transient.insert(element.clone());
            }
        }
        transient.persistent()
    }

    /// Returns the elements of `self` that are not in `other`, keeping
    /// `self`'s order.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        let mut transient = TransientSequencedSet::new();
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

    /// Keeps only the elements yielded by `elements`, preserving the
    /// iteration order of the survivors.
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
    #[must_use]
    pub fn transient(self) -> TransientSequencedSet<T> {
        TransientSequencedSet {
            inner: self.inner.transient(),
            _marker: PhantomData,
        }
    }
}

// =============================================================================
// Iterator Implementations
// =============================================================================

/// A double-ended iterator over the elements of a
/// [`PersistentSequencedSet`] in insertion order.
pub struct PersistentSequencedSetIterator<'a, T> {
    inner: PersistentSequencedMapIterator<'a, T, ()>,
}

impl<'a, T> Iterator for PersistentSequencedSetIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for PersistentSequencedSetIterator<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(element, ())| element)
    }
}

impl<T> ExactSizeIterator for PersistentSequencedSetIterator<'_, T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// An owning iterator over the elements of a [`PersistentSequencedSet`]
/// in insertion order.
pub struct PersistentSequencedSetIntoIterator<T> {
    inner: PersistentSequencedMapIntoIterator<T, ()>,
}

impl<T> Iterator for PersistentSequencedSetIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for PersistentSequencedSetIntoIterator<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(element, ())| element)
    }
}

impl<T> ExactSizeIterator for PersistentSequencedSetIntoIterator<T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for PersistentSequencedSet<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Hash + Eq> FromIterator<T> for PersistentSequencedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut transient = TransientSequencedSet::new();
        for element in iter {
            transient.insert(element);
        }
        transient.persistent()
    }
}

impl<T: Clone> IntoIterator for PersistentSequencedSet<T> {
    type Item = T;
    type IntoIter = PersistentSequencedSetIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentSequencedSetIntoIterator {
            inner: self.inner.into_iter(),
        }
    }
}

impl<'a, T> IntoIterator for &'a PersistentSequencedSet<T> {
    type Item = &'a T;
    type IntoIter = PersistentSequencedSetIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone + Hash + Eq> PartialEq for PersistentSequencedSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T: Clone + Hash + Eq> Eq for PersistentSequencedSet<T> {}

impl<T: fmt::Debug> fmt::Debug for PersistentSequencedSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

// =============================================================================
// TransientSequencedSet Definition
// =============================================================================

/// A mutable builder for [`PersistentSequencedSet`].
///
/// # Examples
///
/// ```rust
/// use persimmon::TransientSequencedSet;
///
/// let mut transient = TransientSequencedSet::new();
/// transient.insert_last(1);
/// transient.insert_last(2);
/// transient.insert_first(0);
///
/// let persistent = transient.persistent();
/// let elements: Vec<&i32> = persistent.iter().collect();
/// assert_eq!(elements, vec![&0, &1, &2]);
/// ```
pub struct TransientSequencedSet<T> {
    inner: TransientSequencedMap<T, ()>,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

// Static assertions to verify TransientSequencedSet is not Send/Sync
static_assertions::assert_not_impl_any!(TransientSequencedSet<i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientSequencedSet<String>: Send, Sync);

impl<T> TransientSequencedSet<T> {
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

    /// Returns an iterator over the elements in insertion order.
    #[must_use]
    pub fn iter(&self) -> PersistentSequencedSetIterator<'_, T> {
        PersistentSequencedSetIterator {
            inner: self.inner.iter(),
        }
    }
}

impl<T: Clone + Hash + Eq> TransientSequencedSet<T> {
    /// Creates a new empty transient set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: TransientSequencedMap::new(),
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

    /// Inserts an element at the back of the iteration order if absent.
    ///
    /// Returns `true` if the element was newly inserted.
    pub fn insert(&mut self, element: T) -> bool {
        self.inner.insert(element, ()).is_none()
    }

    /// Inserts an element at the front, moving it there if present.
    ///
    /// Returns `true` if the element was newly inserted.
    pub fn insert_first(&mut self, element: T) -> bool {
        self.inner.insert_first(element, ()).is_none()
    }

    /// Inserts an element at the back, moving it there if present.
    ///
    /// Returns `true` if the element was newly inserted.
    pub fn insert_last(&mut self, element: T) -> bool {
        self.inner.insert_last(element, ()).is_none()
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

    /// Removes and returns the first element in insertion order.
    pub fn remove_first(&mut self) -> Option<T> {
        self.inner.remove_first().map(|(element, ())| element)
    }

    /// Removes and returns the last element in insertion order.
    pub fn remove_last(&mut self) -> Option<T> {
        self.inner.remove_last().map(|(element, ())| element)
    }

    /// Converts this transient set into a persistent set in O(1).
    #[must_use]
    pub fn persistent(self) -> PersistentSequencedSet<T> {
        PersistentSequencedSet {
            inner: self.inner.persistent(),
        }
    }
}

impl<T: Clone + Hash + Eq> Default for TransientSequencedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Hash + Eq> Extend<T> for TransientSequencedSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for element in iter {
            self.insert(element);
        }
    }
}

impl<T: Clone + Hash + Eq> FromIterator<T> for TransientSequencedSet<T> {
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
impl<T: serde::Serialize> serde::Serialize for PersistentSequencedSet<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
struct PersistentSequencedSetVisitor<T> {
    marker: PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for PersistentSequencedSetVisitor<T>
where
    T: serde::Deserialize<'de> + Clone + Hash + Eq,
{
    type Value = PersistentSequencedSet<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence of elements")
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut transient = TransientSequencedSet::new();
        while let Some(element) = access.next_element()? {
            transient.insert(element);
        }
        Ok(transient.persistent())
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for PersistentSequencedSet<T>
where
    T: serde::Deserialize<'de> + Clone + Hash + Eq,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentSequencedSetVisitor {
            marker: PhantomData,
        })
    }
}

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for TransientSequencedSet<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for TransientSequencedSet<T>
where
    T: serde::Deserialize<'de> + Clone + Hash + Eq,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        PersistentSequencedSet::deserialize(deserializer).map(PersistentSequencedSet::transient)
    }
}

// =============================================================================
// Tests
// =============================================================================
