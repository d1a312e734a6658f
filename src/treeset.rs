//! Persistent (immutable) sorted set based on the red-black tree map.
//!
//! This module provides [`PersistentTreeSet`] and its mutable facade
//! [`TransientTreeSet`], thin wrappers over the tree-map family with `()`
//! values. The element order is injected through the same
//! [`Comparator`] mechanism.
//!
//! # Examples
//!
//! ```rust
//! use persimmon::PersistentTreeSet;
//!
//! let set = PersistentTreeSet::new().insert(3).insert(1).insert(2);
//! let elements: Vec<&i32> = set.iter().collect();
//! assert_eq!(elements, vec![&1, &2, &3]);
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::treemap::{
    Comparator, NaturalOrder, PersistentTreeMap, PersistentTreeMapIntoIterator,
    PersistentTreeMapIterator, TransientTreeMap,
};

// =============================================================================
// PersistentTreeSet Definition
// =============================================================================

/// A persistent (immutable) sorted set based on a red-black tree.
///
/// # Time Complexity
///
/// | Operation     | Complexity |
/// |---------------|------------|
/// | `contains`    | O(log N)   |
/// | `insert`      | O(log N)   |
/// | `remove`      | O(log N)   |
/// | `min` / `max` | O(log N)   |
/// | `len`         | O(1)       |
///
/// # Examples
///
/// ```rust
/// use persimmon::PersistentTreeSet;
///
/// let set: PersistentTreeSet<i32> = PersistentTreeSet::singleton(42);
/// assert!(set.contains(&42));
/// ```
#[derive(Clone)]
pub struct PersistentTreeSet<T, C = NaturalOrder> {
    inner: PersistentTreeMap<T, (), C>,
}

impl<T> PersistentTreeSet<T> {
    /// Creates a new empty set ordered by [`NaturalOrder`].
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: PersistentTreeMap::new(),
        }
    }
}

impl<T, C> PersistentTreeSet<T, C> {
    /// Creates a new empty set ordered by the given comparator.
    #[inline]
    #[must_use]
    pub const fn with_comparator(comparator: C) -> Self {
        Self {
            inner: PersistentTreeMap::with_comparator(comparator),
        }
    }

    /// Returns the comparator ordering this set.
    #[inline]
    #[must_use]
    pub const fn comparator(&self) -> &C {
        self.inner.comparator()
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

    /// Returns the smallest element.
    #[must_use]
    pub fn min(&self) -> Option<&T> {
        self.inner.min().map(|(element, ())| element)
    }

    /// Returns the largest element.
    #[must_use]
    pub fn max(&self) -> Option<&T> {
        self.inner.max().map(|(element, ())| element)
    }

    /// Returns an iterator over the elements in ascending order.
    #[must_use]
    pub fn iter(&self) -> PersistentTreeSetIterator<'_, T> {
        PersistentTreeSetIterator {
            inner: self.inner.iter(),
        }
    }

    /// Returns an iterator over the elements in descending order.
    #[must_use]
    pub fn iter_descending(&self) -> std::iter::Rev<PersistentTreeSetIterator<'_, T>> {
        self.iter().rev()
    }
}

impl<T, C> PersistentTreeSet<T, C>
where
    C: Comparator<T>,
{
    /// Returns `true` if the set contains the specified element.
    ///
    /// # Complexity
    ///
    /// O(log N)
    #[must_use]
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.inner.contains_key(element)
    }

    /// Returns the smallest element greater than or equal to `element`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentTreeSet;
    ///
    /// let set: PersistentTreeSet<i32> = [10, 20, 30].into_iter().collect();
    /// assert_eq!(set.ceiling(&15), Some(&20));
    /// assert_eq!(set.ceiling(&31), None);
    /// ```
    #[must_use]
    pub fn ceiling<Q>(&self, element: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.inner.ceiling_key(element)
    }

    /// Returns the largest element less than or equal to `element`.
    #[must_use]
    pub fn floor<Q>(&self, element: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.inner.floor_key(element)
    }

    /// Returns the smallest element strictly greater than `element`.
    #[must_use]
    pub fn higher<Q>(&self, element: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.inner.higher_key(element)
    }

    /// Returns the largest element strictly less than `element`.
    #[must_use]
    pub fn lower<Q>(&self, element: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.inner.lower_key(element)
    }
}

impl<T, C> PersistentTreeSet<T, C>
where
    T: Clone,
    C: Comparator<T> + Clone,
{
    /// Creates a set containing a single element.
    #[inline]
    #[must_use]
    pub fn singleton(element: T) -> Self
    where
        C: Default,
    {
        Self::with_comparator(C::default()).insert(element)
    }

    /// Inserts an element, returning a new set.
    ///
    /// # Complexity
    ///
    /// O(log N)
    #[must_use]
    pub fn insert(&self, element: T) -> Self {
        Self {
            inner: self.inner.insert(element, ()),
        }
    }

    /// Removes an element, returning a new set.
    ///
    /// If the element is absent, returns a clone of the original set.
    #[must_use]
    pub fn remove<Q>(&self, element: &Q) -> Self
    where
        T: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        Self {
            inner: self.inner.remove(element),
        }
    }

    /// Returns the union of `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            inner: self.inner.merge(&other.inner),
        }
    }

    /// Returns the intersection of `self` and `other`.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let mut result = Self::with_comparator(self.comparator().clone());
        for element in self.iter() {
            if other.contains(element) {
                result = result.insert(element.clone());
            }
        }
        result
    }

    /// Returns the elements of `self` that are not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        let mut result = Self::with_comparator(self.comparator().clone());
        for element in self.iter() {
            if !other.contains(element) {
                result = result.insert(element.clone());
            }
        }
        result
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
        C: Comparator<Q>,
        Q: ?Sized + 'a,
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
        C: Comparator<Q>,
        Q: ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        Self {
            inner: self.inner.retain_all(elements),
        }
    }

    /// Converts this persistent set into a transient set in O(1).
    #[must_use]
    pub fn transient(self) -> TransientTreeSet<T, C> {
        TransientTreeSet {
            inner: self.inner.transient(),
            _marker: PhantomData,
        }
    }
}

// =============================================================================
// Iterator Implementations
// =============================================================================

/// A double-ended iterator over the elements of a [`PersistentTreeSet`]
/// in ascending order.
pub struct PersistentTreeSetIterator<'a, T> {
    inner: PersistentTreeMapIterator<'a, T, ()>,
}

impl<'a, T> Iterator for PersistentTreeSetIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for PersistentTreeSetIterator<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(element, ())| element)
    }
}

impl<T> ExactSizeIterator for PersistentTreeSetIterator<'_, T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// An owning iterator over the elements of a [`PersistentTreeSet`] in
/// ascending order.
pub struct PersistentTreeSetIntoIterator<T> {
    inner: PersistentTreeMapIntoIterator<T, ()>,
}

impl<T> Iterator for PersistentTreeSetIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for PersistentTreeSetIntoIterator<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(element, ())| element)
    }
}

impl<T> ExactSizeIterator for PersistentTreeSetIntoIterator<T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T, C: Default> Default for PersistentTreeSet<T, C> {
    #[inline]
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<T, C> FromIterator<T> for PersistentTreeSet<T, C>
where
    T: Clone,
    C: Comparator<T> + Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
        for element in iter {
            set = set.insert(element);
        }
        set
    }
}

impl<T: Clone, C> IntoIterator for PersistentTreeSet<T, C> {
    type Item = T;
    type IntoIter = PersistentTreeSetIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentTreeSetIntoIterator {
            inner: self.inner.into_iter(),
        }
    }
}

impl<'a, T, C> IntoIterator for &'a PersistentTreeSet<T, C> {
    type Item = &'a T;
    type IntoIter = PersistentTreeSetIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq, C> PartialEq for PersistentTreeSet<T, C> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T: Eq, C> Eq for PersistentTreeSet<T, C> {}

impl<T: fmt::Debug, C> fmt::Debug for PersistentTreeSet<T, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

// =============================================================================
// TransientTreeSet Definition
// =============================================================================

/// A mutable facade for [`PersistentTreeSet`].
///
/// Mutations replace the underlying root directly; see
/// [`TransientTreeMap`] for the rationale.
///
/// # Examples
///
/// ```rust
/// use persimmon::TransientTreeSet;
///
/// let mut transient: TransientTreeSet<i32> = TransientTreeSet::new();
/// transient.insert(2);
/// transient.insert(1);
///
/// let persistent = transient.persistent();
/// let elements: Vec<&i32> = persistent.iter().collect();
/// assert_eq!(elements, vec![&1, &2]);
/// ```
pub struct TransientTreeSet<T, C = NaturalOrder> {
    inner: TransientTreeMap<T, (), C>,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

// Static assertions to verify TransientTreeSet is not Send/Sync
static_assertions::assert_not_impl_any!(TransientTreeSet<i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientTreeSet<String>: Send, Sync);

impl<T> TransientTreeSet<T> {
    /// Creates a new empty transient set ordered by [`NaturalOrder`].
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: TransientTreeMap::new(),
            _marker: PhantomData,
        }
    }
}

impl<T, C> TransientTreeSet<T, C> {
    /// Creates a new empty transient set ordered by the given comparator.
    #[inline]
    #[must_use]
    pub const fn with_comparator(comparator: C) -> Self {
        Self {
            inner: TransientTreeMap::with_comparator(comparator),
            _marker: PhantomData,
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

    /// Returns an iterator over the elements in ascending order.
    #[must_use]
    pub fn iter(&self) -> PersistentTreeSetIterator<'_, T> {
        PersistentTreeSetIterator {
            inner: self.inner.iter(),
        }
    }
}

impl<T, C> TransientTreeSet<T, C>
where
    T: Clone,
    C: Comparator<T> + Clone,
{
    /// Returns `true` if the set contains the specified element.
    #[must_use]
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.inner.contains_key(element)
    }

    /// Inserts an element.
    ///
    /// Returns `true` if the element was newly inserted.
    pub fn insert(&mut self, element: T) -> bool {
        self.inner.insert(element, ()).is_none()
    }

    /// Removes an element.
    ///
    /// Returns `true` if the element was present and removed.
    pub fn remove<Q>(&mut self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.inner.remove(element).is_some()
    }

    /// Converts this transient set into a persistent set in O(1).
    #[must_use]
    pub fn persistent(self) -> PersistentTreeSet<T, C> {
        PersistentTreeSet {
            inner: self.inner.persistent(),
        }
    }
}

impl<T> Default for TransientTreeSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> Extend<T> for TransientTreeSet<T, C>
where
    T: Clone,
    C: Comparator<T> + Clone,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for element in iter {
            self.insert(element);
        }
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize, C> serde::Serialize for PersistentTreeSet<T, C> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
struct PersistentTreeSetVisitor<T, C> {
    element_marker: PhantomData<T>,
    comparator_marker: PhantomData<C>,
}

#[cfg(feature = "serde")]
impl<'de, T, C> serde::de::Visitor<'de> for PersistentTreeSetVisitor<T, C>
where
    T: serde::Deserialize<'de> + Clone,
    C: Comparator<T> + Clone + Default,
{
    type Value = PersistentTreeSet<T, C>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence of elements")
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut set = PersistentTreeSet::with_comparator(C::default());
        while let Some(element) = access.next_element()? {
            set = set.insert(element);
        }
        Ok(set)
    }
}

#[cfg(feature = "serde")]
impl<'de, T, C> serde::Deserialize<'de> for PersistentTreeSet<T, C>
where
    T: serde::Deserialize<'de> + Clone,
    C: Comparator<T> + Clone + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentTreeSetVisitor {
            element_marker: PhantomData,
            comparator_marker: PhantomData,
        })
    }
}

#[cfg(feature = "serde")]
impl<T: serde::Serialize, C> serde::Serialize for TransientTreeSet<T, C> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de, T, C> serde::Deserialize<'de> for TransientTreeSet<T, C>
where
    T: serde::Deserialize<'de> + Clone,
    C: Comparator<T> + Clone + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        PersistentTreeSet::deserialize(deserializer).map(PersistentTreeSet::transient)
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
    fn test_sorted_iteration() {
        let set: PersistentTreeSet<i32> = [5, 1, 4, 2, 3].into_iter().collect();
        let elements: Vec<i32> = set.iter().copied().collect();
        assert_eq!(elements, vec![1, 2, 3, 4, 5]);

        let descending: Vec<i32> = set.iter_descending().copied().collect();
        assert_eq!(descending, vec![5, 4, 3, 2, 1]);
    }

    #[rstest]
    fn test_navigation() {
        let set: PersistentTreeSet<i32> = [10, 20, 30].into_iter().collect();
        assert_eq!(set.ceiling(&15), Some(&20));
        assert_eq!(set.floor(&15), Some(&10));
        assert_eq!(set.higher(&10), Some(&20));
        assert_eq!(set.lower(&10), None);
        assert_eq!(set.min(), Some(&10));
        assert_eq!(set.max(), Some(&30));
    }

    #[rstest]
    fn test_set_operations() {
        let left: PersistentTreeSet<i32> = [1, 2, 3].into_iter().collect();
        let right: PersistentTreeSet<i32> = [2, 3, 4].into_iter().collect();

        let union: Vec<i32> = left.union(&right).iter().copied().collect();
        assert_eq!(union, vec![1, 2, 3, 4]);

        let intersection: Vec<i32> = left.intersection(&right).iter().copied().collect();
        assert_eq!(intersection, vec![2, 3]);

        let difference: Vec<i32> = left.difference(&right).iter().copied().collect();
        assert_eq!(difference, vec![1]);
    }

    #[rstest]
    fn test_remove_preserves_order() {
        let set: PersistentTreeSet<i32> = (0..10).collect();
        let removed = set.remove(&5);
        let elements: Vec<i32> = removed.iter().copied().collect();
        assert_eq!(elements, vec![0, 1, 2, 3, 4, 6, 7, 8, 9]);
        assert_eq!(set.len(), 10);
    }

    #[rstest]
    fn test_transient_round_trip() {
        let persistent: PersistentTreeSet<i32> = (0..10).collect();
        let mut transient = persistent.clone().transient();
        transient.insert(10);
        transient.remove(&0);
        let rebuilt = transient.persistent();

        assert_eq!(persistent.len(), 10);
        assert_eq!(rebuilt.len(), 10);
        assert!(rebuilt.contains(&10));
        assert!(!rebuilt.contains(&0));
    }
}
