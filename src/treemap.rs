//! Persistent (immutable) sorted map based on a red-black tree.
//!
//! This module provides [`PersistentTreeMap`], an immutable ordered map
//! with structural sharing, its mutable facade [`TransientTreeMap`], and
//! the [`Comparator`] trait that injects the key order.
//!
//! # Overview
//!
//! - O(log N) get, insert, remove
//! - O(log N) navigation (`ceiling`, `floor`, `higher`, `lower`, min/max)
//! - O(log N + k) range queries where k is the number of results
//! - O(1) len and `is_empty`
//!
//! # Internal Structure
//!
//! The red-black tree maintains the standard invariants:
//!
//! 1. Every node is either red or black
//! 2. The root is black
//! 3. All leaves (nil) are black
//! 4. Red nodes have only black children
//! 5. Every path from root to leaf has the same number of black nodes
//!
//! Insertion rebalances with the classic four-case rotation/recolor
//! scheme; deletion uses the fuse/balance-left/balance-right scheme from
//! Kahrs' "Red-Black Trees with Types", so both invariants hold after
//! every operation.
//!
//! # Examples
//!
//! ```rust
//! use persimmon::PersistentTreeMap;
//!
//! let map = PersistentTreeMap::new()
//!     .insert(3, "three")
//!     .insert(1, "one")
//!     .insert(2, "two");
//!
//! // Entries are always in sorted order
//! let keys: Vec<&i32> = map.keys().collect();
//! assert_eq!(keys, vec![&1, &2, &3]);
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.insert(1, "ONE");
//! assert_eq!(map.get(&1), Some(&"one"));
//! assert_eq!(updated.get(&1), Some(&"ONE"));
//! ```

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::ops::{Bound, RangeBounds};
use std::rc::Rc;

use crate::ReferenceCounter;

// =============================================================================
// Comparator
// =============================================================================

/// A total order over keys, injected into the sorted collections.
///
/// Implementations must be consistent: for any `a`, `b`, `c`,
/// `compare(a, b)` reversed equals `compare(b, a)`, and the order must be
/// transitive. The sorted collections treat `Ordering::Equal` as key
/// identity.
pub trait Comparator<K: ?Sized> {
    /// Compares two keys.
    fn compare(&self, left: &K, right: &K) -> Ordering;
}

/// The default comparator: delegates to [`Ord`].
///
/// For optional keys this yields "absent first": `Option<K>` orders
/// `None` before every `Some` under its derived `Ord`.
///
/// # Examples
///
/// ```rust
/// use persimmon::PersistentTreeMap;
///
/// let map = PersistentTreeMap::new()
///     .insert(None, "absent")
///     .insert(Some(1), "one");
///
/// assert_eq!(map.min(), Some((&None, &"absent")));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Comparator<K> for NaturalOrder {
    #[inline]
    fn compare(&self, left: &K, right: &K) -> Ordering {
        left.cmp(right)
    }
}

// =============================================================================
// Node Definition
// =============================================================================

/// The color of a red-black tree node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Color {
    Red,
    Black,
}

/// Internal node structure for the red-black tree.
#[derive(Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    color: Color,
    left: Option<ReferenceCounter<Node<K, V>>>,
    right: Option<ReferenceCounter<Node<K, V>>>,
}

impl<K, V> Node<K, V> {
    /// Creates a new red node with no children.
    const fn new_red(key: K, value: V) -> Self {
        Self {
            key,
            value,
            color: Color::Red,
            left: None,
            right: None,
        }
    }
}

impl<K: Clone, V: Clone> Node<K, V> {
    /// Creates a copy of this node with a new color.
    fn with_color(&self, color: Color) -> Self {
        Self {
            key: self.key.clone(),
            value: self.value.clone(),
            color,
            left: self.left.clone(),
            right: self.right.clone(),
        }
    }

    /// Creates a copy of this node with new children.
    fn with_children(
        &self,
        left: Option<ReferenceCounter<Self>>,
        right: Option<ReferenceCounter<Self>>,
    ) -> Self {
        Self {
            key: self.key.clone(),
            value: self.value.clone(),
            color: self.color,
            left,
            right,
        }
    }
}

/// Color of an optional node; nil nodes count as black for the
/// invariants but are reported as `None` here.
fn color_of<K, V>(node: Option<&ReferenceCounter<Node<K, V>>>) -> Option<Color> {
    node.map(|node_ref| node_ref.color)
}

fn is_red<K, V>(node: Option<&ReferenceCounter<Node<K, V>>>) -> bool {
    color_of(node) == Some(Color::Red)
}

// =============================================================================
// Insert Balancing
// =============================================================================

/// Balances the tree after insertion, handling the four red-red cases.
fn balance<K: Clone, V: Clone>(node: Node<K, V>) -> Node<K, V> {
    // Left child red with red left grandchild
    if is_red(node.left.as_ref())
        && let Some(left) = &node.left
        && is_red(left.left.as_ref())
    {
        return rotate_right_and_recolor(node);
    }

    // Left child red with red right grandchild
    if is_red(node.left.as_ref())
        && let Some(left) = &node.left
        && is_red(left.right.as_ref())
    {
        let new_left = rotate_left((**left).clone());
        let new_node =
            node.with_children(Some(ReferenceCounter::new(new_left)), node.right.clone());
        return rotate_right_and_recolor(new_node);
    }

    // Right child red with red right grandchild
    if is_red(node.right.as_ref())
        && let Some(right) = &node.right
        && is_red(right.right.as_ref())
    {
        return rotate_left_and_recolor(node);
    }

    // Right child red with red left grandchild
    if is_red(node.right.as_ref())
        && let Some(right) = &node.right
        && is_red(right.left.as_ref())
    {
        let new_right = rotate_right((**right).clone());
        let new_node =
            node.with_children(node.left.clone(), Some(ReferenceCounter::new(new_right)));
        return rotate_left_and_recolor(new_node);
    }

    node
}

/// Rotates the tree to the right around the given node.
fn rotate_right<K: Clone, V: Clone>(node: Node<K, V>) -> Node<K, V> {
    if let Some(left) = node.left {
        let new_right = Node {
            key: node.key,
            value: node.value,
            color: node.color,
            left: left.right.clone(),
            right: node.right,
        };
        Node {
            key: left.key.clone(),
            value: left.value.clone(),
            color: left.color,
            left: left.left.clone(),
            right: Some(ReferenceCounter::new(new_right)),
        }
    } else {
        node
    }
}

/// Rotates the tree to the left around the given node.
fn rotate_left<K: Clone, V: Clone>(node: Node<K, V>) -> Node<K, V> {
    if let Some(right) = node.right {
        let new_left = Node {
            key: node.key,
            value: node.value,
            color: node.color,
            left: node.left,
            right: right.left.clone(),
        };
        Node {
            key: right.key.clone(),
            value: right.value.clone(),
            color: right.color,
            left: Some(ReferenceCounter::new(new_left)),
            right: right.right.clone(),
        }
    } else {
        node
    }
}

/// Rotates right and recolors for the left-leaning red-red cases.
fn rotate_right_and_recolor<K: Clone, V: Clone>(node: Node<K, V>) -> Node<K, V> {
    if let Some(left) = &node.left {
        let new_right = Node {
            key: node.key.clone(),
            value: node.value.clone(),
            color: Color::Red,
            left: left.right.clone(),
            right: node.right.clone(),
        };
        let new_left = left
            .left
            .as_ref()
            .map(|left_left| ReferenceCounter::new(left_left.with_color(Color::Black)));
        Node {
            key: left.key.clone(),
            value: left.value.clone(),
            color: Color::Black,
            left: new_left,
            right: Some(ReferenceCounter::new(new_right)),
        }
    } else {
        node
    }
}

/// Rotates left and recolors for the right-leaning red-red cases.
fn rotate_left_and_recolor<K: Clone, V: Clone>(node: Node<K, V>) -> Node<K, V> {
    if let Some(right) = &node.right {
        let new_left = Node {
            key: node.key.clone(),
            value: node.value.clone(),
            color: Color::Red,
            left: node.left.clone(),
            right: right.left.clone(),
        };
        let new_right = right
            .right
            .as_ref()
            .map(|right_right| ReferenceCounter::new(right_right.with_color(Color::Black)));
        Node {
            key: right.key.clone(),
            value: right.value.clone(),
            color: Color::Black,
            left: Some(ReferenceCounter::new(new_left)),
            right: new_right,
        }
    } else {
        node
    }
}

/// Recursive insert; returns the rebuilt node and whether a new key was
/// added.
fn insert_into_node<K, V, C>(
    comparator: &C,
    node: Option<&ReferenceCounter<Node<K, V>>>,
    key: K,
    value: V,
) -> (Node<K, V>, bool)
where
    K: Clone,
    V: Clone,
    C: Comparator<K>,
{
    match node {
        None => (Node::new_red(key, value), true),
        Some(node_ref) => match comparator.compare(&key, &node_ref.key) {
            Ordering::Less => {
                let (new_left, added) =
                    insert_into_node(comparator, node_ref.left.as_ref(), key, value);
                let rebuilt = node_ref
                    .with_children(Some(ReferenceCounter::new(new_left)), node_ref.right.clone());
                (if added { balance(rebuilt) } else { rebuilt }, added)
            }
            Ordering::Greater => {
                let (new_right, added) =
                    insert_into_node(comparator, node_ref.right.as_ref(), key, value);
                let rebuilt = node_ref
                    .with_children(node_ref.left.clone(), Some(ReferenceCounter::new(new_right)));
                (if added { balance(rebuilt) } else { rebuilt }, added)
            }
            Ordering::Equal => (
                Node {
                    key,
                    value,
                    color: node_ref.color,
                    left: node_ref.left.clone(),
                    right: node_ref.right.clone(),
                },
                false,
            ),
        },
    }
}

// =============================================================================
// Delete Rebalancing (Kahrs scheme)
// =============================================================================

/// Recolors both children black when both are red, otherwise falls back
/// to the four-case insert balance.
fn balance_children<K: Clone, V: Clone>(node: Node<K, V>) -> Node<K, V> {
    if is_red(node.left.as_ref()) && is_red(node.right.as_ref()) {
        let Node {
            key,
            value,
            left,
            right,
            ..
        } = node;
        let left = left.map(|child| ReferenceCounter::new(child.with_color(Color::Black)));
        let right = right.map(|child| ReferenceCounter::new(child.with_color(Color::Black)));
        return Node {
            key,
            value,
            color: Color::Red,
            left,
            right,
        };
    }
    balance(node)
}

/// Joins the two subtrees of a removed node into one tree with the same
/// black height.
fn fuse<K: Clone, V: Clone>(
    left: Option<&ReferenceCounter<Node<K, V>>>,
    right: Option<&ReferenceCounter<Node<K, V>>>,
) -> Option<Node<K, V>> {
    match (left, right) {
        (None, None) => None,
        (None, Some(right_node)) => Some((**right_node).clone()),
        (Some(left_node), None) => Some((**left_node).clone()),
        (Some(left_node), Some(right_node)) => {
            Some(match (left_node.color, right_node.color) {
                (Color::Black, Color::Red) => {
                    let new_left = fuse(Some(left_node), right_node.left.as_ref());
                    Node {
                        key: right_node.key.clone(),
                        value: right_node.value.clone(),
                        color: Color::Red,
                        left: new_left.map(ReferenceCounter::new),
                        right: right_node.right.clone(),
                    }
                }
                (Color::Red, Color::Black) => {
                    let new_right = fuse(left_node.right.as_ref(), Some(right_node));
                    Node {
                        key: left_node.key.clone(),
                        value: left_node.value.clone(),
                        color: Color::Red,
                        left: left_node.left.clone(),
                        right: new_right.map(ReferenceCounter::new),
                    }
                }
                (Color::Red, Color::Red) => {
                    let fused = fuse(left_node.right.as_ref(), right_node.left.as_ref());
                    match fused {
                        Some(Node {
                            color: Color::Red,
                            key: fused_key,
                            value: fused_value,
                            left: fused_left,
                            right: fused_right,
                        }) => {
                            let new_left = Node {
                                key: left_node.key.clone(),
                                value: left_node.value.clone(),
                                color: Color::Red,
                                left: left_node.left.clone(),
                                right: fused_left,
                            };
                            let new_right = Node {
                                key: right_node.key.clone(),
                                value: right_node.value.clone(),
                                color: Color::Red,
                                left: fused_right,
                                right: right_node.right.clone(),
                            };
                            Node {
                                key: fused_key,
                                value: fused_value,
                                color: Color::Red,
                                left: Some(ReferenceCounter::new(new_left)),
                                right: Some(ReferenceCounter::new(new_right)),
                            }
                        }
                        fused => Node {
                            key: left_node.key.clone(),
                            value: left_node.value.clone(),
                            color: Color::Red,
                            left: left_node.left.clone(),
                            right: Some(ReferenceCounter::new(Node {
                                key: right_node.key.clone(),
                                value: right_node.value.clone(),
                                color: Color::Red,
                                left: fused.map(ReferenceCounter::new),
                                right: right_node.right.clone(),
                            })),
                        },
                    }
                }
                (Color::Black, Color::Black) => {
                    let fused = fuse(left_node.right.as_ref(), right_node.left.as_ref());
                    match fused {
                        Some(Node {
                            color: Color::Red,
                            key: fused_key,
                            value: fused_value,
                            left: fused_left,
                            right: fused_right,
                        }) => {
                            let new_left = Node {
                                key: left_node.key.clone(),
                                value: left_node.value.clone(),
                                color: Color::Black,
                                left: left_node.left.clone(),
                                right: fused_left,
                            };
                            let new_right = Node {
                                key: right_node.key.clone(),
                                value: right_node.value.clone(),
                                color: Color::Black,
                                left: fused_right,
                                right: right_node.right.clone(),
                            };
                            Node {
                                key: fused_key,
                                value: fused_value,
                                color: Color::Red,
                                left: Some(ReferenceCounter::new(new_left)),
                                right: Some(ReferenceCounter::new(new_right)),
                            }
                        }
                        fused => balance_left(Node {
                            key: left_node.key.clone(),
                            value: left_node.value.clone(),
                            color: Color::Red,
                            left: left_node.left.clone(),
                            right: Some(ReferenceCounter::new(Node {
                                key: right_node.key.clone(),
                                value: right_node.value.clone(),
                                color: Color::Black,
                                left: fused.map(ReferenceCounter::new),
                                right: right_node.right.clone(),
                            })),
                        }),
                    }
                }
            })
        }
    }
}

/// Restores the invariants after the left subtree lost one black level.
fn balance_left<K: Clone, V: Clone>(node: Node<K, V>) -> Node<K, V> {
    let Node {
        key,
        value,
        left,
        right,
        ..
    } = node;
    match (left, right) {
        (Some(left_node), right) if left_node.color == Color::Red => Node {
            key,
            value,
            color: Color::Red,
            left: Some(ReferenceCounter::new(left_node.with_color(Color::Black))),
            right,
        },
        (left, Some(right_node)) if right_node.color == Color::Black => balance_children(Node {
            key,
            value,
            color: Color::Black,
            left,
            right: Some(ReferenceCounter::new(right_node.with_color(Color::Red))),
        }),
        (left, Some(right_node))
            if right_node.color == Color::Red
                && right_node
                    .left
                    .as_ref()
                    .is_some_and(|right_left| right_left.color == Color::Black) =>
        {
            let Some(right_left) = right_node.left.as_ref() else {
                unreachable!()
            };
            let reddened_tail = right_node
                .right
                .as_ref()
                .map(|right_right| ReferenceCounter::new(right_right.with_color(Color::Red)));
            let new_right = balance_children(Node {
                key: right_node.key.clone(),
                value: right_node.value.clone(),
                color: Color::Black,
                left: right_left.right.clone(),
                right: reddened_tail,
            });
            Node {
                key: right_left.key.clone(),
                value: right_left.value.clone(),
                color: Color::Red,
                left: Some(ReferenceCounter::new(Node {
                    key,
                    value,
                    color: Color::Black,
                    left,
                    right: right_left.left.clone(),
                })),
                right: Some(ReferenceCounter::new(new_right)),
            }
        }
        _ => unreachable!("red-black delete rebalancing saw an impossible shape"),
    }
}

/// Restores the invariants after the right subtree lost one black level.
fn balance_right<K: Clone, V: Clone>(node: Node<K, V>) -> Node<K, V> {
    let Node {
        key,
        value,
        left,
        right,
        ..
    } = node;
    match (left, right) {
        (left, Some(right_node)) if right_node.color == Color::Red => Node {
            key,
            value,
            color: Color::Red,
            left,
            right: Some(ReferenceCounter::new(right_node.with_color(Color::Black))),
        },
        (Some(left_node), right) if left_node.color == Color::Black => balance_children(Node {
            key,
            value,
            color: Color::Black,
            left: Some(ReferenceCounter::new(left_node.with_color(Color::Red))),
            right,
        }),
        (Some(left_node), right)
            if left_node.color == Color::Red
                && left_node
                    .right
                    .as_ref()
                    .is_some_and(|left_right| left_right.color == Color::Black) =>
        {
            let Some(left_right) = left_node.right.as_ref() else {
                unreachable!()
            };
            let reddened_head = left_node
                .left
                .as_ref()
                .map(|left_left| ReferenceCounter::new(left_left.with_color(Color::Red)));
            let new_left = balance_children(Node {
                key: left_node.key.clone(),
                value: left_node.value.clone(),
                color: Color::Black,
                left: reddened_head,
                right: left_right.left.clone(),
            });
            Node {
                key: left_right.key.clone(),
                value: left_right.value.clone(),
                color: Color::Red,
                left: Some(ReferenceCounter::new(new_left)),
                right: Some(ReferenceCounter::new(Node {
                    key,
                    value,
                    color: Color::Black,
                    left: left_right.right.clone(),
                    right,
                })),
            }
        }
        _ => unreachable!("red-black delete rebalancing saw an impossible shape"),
    }
}

fn remove_left<K, V, C, Q>(
    comparator: &C,
    node_ref: &ReferenceCounter<Node<K, V>>,
    key: &Q,
) -> (Option<Node<K, V>>, bool)
where
    K: Borrow<Q> + Clone,
    V: Clone,
    C: Comparator<Q>,
    Q: ?Sized,
{
    let old_left_color = color_of(node_ref.left.as_ref());
    let (new_left, removed) = remove_from_node(comparator, node_ref.left.as_ref(), key);
    // The interim color is irrelevant when rebalancing runs below.
    let rebuilt = Node {
        key: node_ref.key.clone(),
        value: node_ref.value.clone(),
        color: Color::Red,
        left: new_left.map(ReferenceCounter::new),
        right: node_ref.right.clone(),
    };
    let balanced = if old_left_color == Some(Color::Black) {
        balance_left(rebuilt)
    } else {
        rebuilt
    };
    (Some(balanced), removed)
}

fn remove_right<K, V, C, Q>(
    comparator: &C,
    node_ref: &ReferenceCounter<Node<K, V>>,
    key: &Q,
) -> (Option<Node<K, V>>, bool)
where
    K: Borrow<Q> + Clone,
    V: Clone,
    C: Comparator<Q>,
    Q: ?Sized,
{
    let old_right_color = color_of(node_ref.right.as_ref());
    let (new_right, removed) = remove_from_node(comparator, node_ref.right.as_ref(), key);
    let rebuilt = Node {
        key: node_ref.key.clone(),
        value: node_ref.value.clone(),
        color: Color::Red,
        left: node_ref.left.clone(),
        right: new_right.map(ReferenceCounter::new),
    };
    let balanced = if old_right_color == Some(Color::Black) {
        balance_right(rebuilt)
    } else {
        rebuilt
    };
    (Some(balanced), removed)
}

fn remove_from_node<K, V, C, Q>(
    comparator: &C,
    node: Option<&ReferenceCounter<Node<K, V>>>,
    key: &Q,
) -> (Option<Node<K, V>>, bool)
where
    K: Borrow<Q> + Clone,
    V: Clone,
    C: Comparator<Q>,
    Q: ?Sized,
{
    match node {
        None => (None, false),
        Some(node_ref) => match comparator.compare(key, node_ref.key.borrow()) {
            Ordering::Less => remove_left(comparator, node_ref, key),
            Ordering::Equal => (fuse(node_ref.left.as_ref(), node_ref.right.as_ref()), true),
            Ordering::Greater => remove_right(comparator, node_ref, key),
        },
    }
}

// =============================================================================
// PersistentTreeMap Definition
// =============================================================================

/// A persistent (immutable) sorted map based on a red-black tree.
///
/// The key order is supplied by the `C` type parameter, which defaults to
/// [`NaturalOrder`] (plain [`Ord`]).
///
/// # Time Complexity
///
/// | Operation       | Complexity     |
/// |-----------------|----------------|
/// | `get`           | O(log N)       |
/// | `insert`        | O(log N)       |
/// | `remove`        | O(log N)       |
/// | `min` / `max`   | O(log N)       |
/// | `ceiling_entry` | O(log N)       |
/// | `range`         | O(log N + k)   |
/// | `len`           | O(1)           |
///
/// # Examples
///
/// ```rust
/// use persimmon::PersistentTreeMap;
///
/// let map = PersistentTreeMap::new().insert(2, "two").insert(1, "one");
/// assert_eq!(map.min(), Some((&1, &"one")));
/// ```
///
/// With an injected comparator:
///
/// ```rust
/// use persimmon::{Comparator, PersistentTreeMap};
/// use std::cmp::Ordering;
///
/// #[derive(Clone, Default)]
/// struct Reverse;
///
/// impl Comparator<i32> for Reverse {
///     fn compare(&self, left: &i32, right: &i32) -> Ordering {
///         right.cmp(left)
///     }
/// }
///
/// let map = PersistentTreeMap::with_comparator(Reverse)
///     .insert(1, "one")
///     .insert(2, "two");
/// let keys: Vec<&i32> = map.keys().collect();
/// assert_eq!(keys, vec![&2, &1]);
/// ```
#[derive(Clone)]
pub struct PersistentTreeMap<K, V, C = NaturalOrder> {
    /// Root node; `None` for the empty map
    root: Option<ReferenceCounter<Node<K, V>>>,
    /// Number of entries
    length: usize,
    /// The injected key order
    comparator: C,
}

impl<K, V> PersistentTreeMap<K, V> {
    /// Creates a new empty map ordered by [`NaturalOrder`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentTreeMap;
    ///
    /// let map: PersistentTreeMap<i32, String> = PersistentTreeMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: None,
            length: 0,
            comparator: NaturalOrder,
        }
    }
}

impl<K, V, C> PersistentTreeMap<K, V, C> {
    /// Creates a new empty map ordered by the given comparator.
    #[inline]
    #[must_use]
    pub const fn with_comparator(comparator: C) -> Self {
        Self {
            root: None,
            length: 0,
            comparator,
        }
    }

    /// Returns the comparator ordering this map.
    #[inline]
    #[must_use]
    pub const fn comparator(&self) -> &C {
        &self.comparator
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

    /// Returns the entry with the smallest key.
    ///
    /// # Complexity
    ///
    /// O(log N)
    #[must_use]
    pub fn min(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some((&node.key, &node.value))
    }

    /// Returns the entry with the largest key.
    ///
    /// # Complexity
    ///
    /// O(log N)
    #[must_use]
    pub fn max(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        Some((&node.key, &node.value))
    }

    /// Returns an iterator over entries in ascending key order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentTreeMap;
    ///
    /// let map = PersistentTreeMap::new().insert(2, "two").insert(1, "one");
    /// let keys: Vec<&i32> = map.iter().map(|(key, _)| key).collect();
    /// assert_eq!(keys, vec![&1, &2]);
    /// ```
    #[must_use]
    pub fn iter(&self) -> PersistentTreeMapIterator<'_, K, V> {
        let mut entries = Vec::with_capacity(self.length);
        collect_ascending(self.root.as_ref(), &mut entries);
        PersistentTreeMapIterator {
            entries: entries.into_iter(),
        }
    }

    /// Returns an iterator over entries in descending key order.
    #[must_use]
    pub fn iter_descending(&self) -> std::iter::Rev<PersistentTreeMapIterator<'_, K, V>> {
        self.iter().rev()
    }

    /// Returns an iterator over keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values in ascending key order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }
}

/// In-order traversal into a vector of borrowed entries.
fn collect_ascending<'a, K, V>(
    node: Option<&'a ReferenceCounter<Node<K, V>>>,
    entries: &mut Vec<(&'a K, &'a V)>,
) {
    if let Some(node_ref) = node {
        collect_ascending(node_ref.left.as_ref(), entries);
        entries.push((&node_ref.key, &node_ref.value));
        collect_ascending(node_ref.right.as_ref(), entries);
    }
}

impl<K, V, C> PersistentTreeMap<K, V, C>
where
    C: Comparator<K>,
{
    /// Returns a reference to the value corresponding to the key.
    ///
    /// With the default comparator the key may be any borrowed form of
    /// the map's key type; a custom comparator must implement
    /// [`Comparator`] for the borrowed form as well.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentTreeMap;
    ///
    /// let map = PersistentTreeMap::new().insert("hello".to_string(), 42);
    /// assert_eq!(map.get("hello"), Some(&42));
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let mut node = self.root.as_deref();
        while let Some(node_ref) = node {
            match self.comparator.compare(key, node_ref.key.borrow()) {
                Ordering::Less => node = node_ref.left.as_deref(),
                Ordering::Equal => return Some(&node_ref.value),
                Ordering::Greater => node = node_ref.right.as_deref(),
            }
        }
        None
    }

    /// Returns `true` if the map contains a value for the specified key.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.get(key).is_some()
    }

    /// Returns the entry with the smallest key greater than or equal to
    /// `key`, or `None` past the end of the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentTreeMap;
    ///
    /// let map = PersistentTreeMap::new().insert(10, "ten").insert(20, "twenty");
    /// assert_eq!(map.ceiling_entry(&15), Some((&20, &"twenty")));
    /// assert_eq!(map.ceiling_entry(&20), Some((&20, &"twenty")));
    /// assert_eq!(map.ceiling_entry(&21), None);
    /// ```
    #[must_use]
    pub fn ceiling_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let mut node = self.root.as_deref();
        let mut candidate = None;
        while let Some(node_ref) = node {
            match self.comparator.compare(key, node_ref.key.borrow()) {
                Ordering::Less => {
                    candidate = Some((&node_ref.key, &node_ref.value));
                    node = node_ref.left.as_deref();
                }
                Ordering::Equal => return Some((&node_ref.key, &node_ref.value)),
                Ordering::Greater => node = node_ref.right.as_deref(),
            }
        }
        candidate
    }

    /// Returns the entry with the largest key less than or equal to
    /// `key`, or `None` before the start of the map.
    #[must_use]
    pub fn floor_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let mut node = self.root.as_deref();
        let mut candidate = None;
        while let Some(node_ref) = node {
            match self.comparator.compare(key, node_ref.key.borrow()) {
                Ordering::Greater => {
                    candidate = Some((&node_ref.key, &node_ref.value));
                    node = node_ref.right.as_deref();
                }
                Ordering::Equal => return Some((&node_ref.key, &node_ref.value)),
                Ordering::Less => node = node_ref.left.as_deref(),
            }
        }
        candidate
    }

    /// Returns the entry with the smallest key strictly greater than
    /// `key`.
    #[must_use]
    pub fn higher_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let mut node = self.root.as_deref();
        let mut candidate = None;
        while let Some(node_ref) = node {
            match self.comparator.compare(key, node_ref.key.borrow()) {
                Ordering::Less => {
                    candidate = Some((&node_ref.key, &node_ref.value));
                    node = node_ref.left.as_deref();
                }
                Ordering::Equal | Ordering::Greater => node = node_ref.right.as_deref(),
            }
        }
        candidate
    }

    /// Returns the entry with the largest key strictly less than `key`.
    #[must_use]
    pub fn lower_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let mut node = self.root.as_deref();
        let mut candidate = None;
        while let Some(node_ref) = node {
            match self.comparator.compare(key, node_ref.key.borrow()) {
                Ordering::Greater => {
                    candidate = Some((&node_ref.key, &node_ref.value));
                    node = node_ref.right.as_deref();
                }
                Ordering::Equal | Ordering::Less => node = node_ref.left.as_deref(),
            }
        }
        candidate
    }

    /// Key form of [`ceiling_entry`](Self::ceiling_entry).
    #[must_use]
    pub fn ceiling_key<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.ceiling_entry(key).map(|(found, _)| found)
    }

    /// Key form of [`floor_entry`](Self::floor_entry).
    #[must_use]
    pub fn floor_key<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.floor_entry(key).map(|(found, _)| found)
    }

    /// Key form of [`higher_entry`](Self::higher_entry).
    #[must_use]
    pub fn higher_key<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.higher_entry(key).map(|(found, _)| found)
    }

    /// Key form of [`lower_entry`](Self::lower_entry).
    #[must_use]
    pub fn lower_key<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.lower_entry(key).map(|(found, _)| found)
    }

    /// Returns an iterator over the entries whose keys fall within
    /// `range`, in ascending order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentTreeMap;
    ///
    /// let map: persimmon::PersistentTreeMap<i32, i32> =
    ///     (0..10).map(|key| (key, key)).collect();
    /// let selected: Vec<&i32> = map.range(3..7).map(|(key, _)| key).collect();
    /// assert_eq!(selected, vec![&3, &4, &5, &6]);
    /// ```
    #[must_use]
    pub fn range<R>(&self, range: R) -> PersistentTreeMapIterator<'_, K, V>
    where
        R: RangeBounds<K>,
    {
        let mut entries = Vec::new();
        collect_range(self.root.as_ref(), &range, &self.comparator, &mut entries);
        PersistentTreeMapIterator {
            entries: entries.into_iter(),
        }
    }
}

/// In-order traversal pruned to a key range.
fn collect_range<'a, K, V, C, R>(
    node: Option<&'a ReferenceCounter<Node<K, V>>>,
    range: &R,
    comparator: &C,
    entries: &mut Vec<(&'a K, &'a V)>,
) where
    C: Comparator<K>,
    R: RangeBounds<K>,
{
    let Some(node_ref) = node else {
        return;
    };
    let above_start = match range.start_bound() {
        Bound::Unbounded => true,
        Bound::Included(bound) => comparator.compare(&node_ref.key, bound) != Ordering::Less,
        Bound::Excluded(bound) => comparator.compare(&node_ref.key, bound) == Ordering::Greater,
    };
    let below_end = match range.end_bound() {
        Bound::Unbounded => true,
        Bound::Included(bound) => comparator.compare(&node_ref.key, bound) != Ordering::Greater,
        Bound::Excluded(bound) => comparator.compare(&node_ref.key, bound) == Ordering::Less,
    };
    if above_start {
        collect_range(node_ref.left.as_ref(), range, comparator, entries);
    }
    if above_start && below_end {
        entries.push((&node_ref.key, &node_ref.value));
    }
    if below_end {
        collect_range(node_ref.right.as_ref(), range, comparator, entries);
    }
}

impl<K, V, C> PersistentTreeMap<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparator<K> + Clone,
{
    /// Creates a map containing a single key-value pair, ordered by
    /// [`NaturalOrder`].
    #[inline]
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self
    where
        C: Default,
    {
        Self::with_comparator(C::default()).insert(key, value)
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already contains the key, the value is replaced.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentTreeMap;
    ///
    /// let map1 = PersistentTreeMap::new().insert(1, "one");
    /// let map2 = map1.insert(1, "ONE");
    ///
    /// assert_eq!(map1.get(&1), Some(&"one"));
    /// assert_eq!(map2.get(&1), Some(&"ONE"));
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let (mut new_root, added) =
            insert_into_node(&self.comparator, self.root.as_ref(), key, value);
        new_root.color = Color::Black;
        Self {
            root: Some(ReferenceCounter::new(new_root)),
            length: if added { self.length + 1 } else { self.length },
            comparator: self.comparator.clone(),
        }
    }

    /// Removes a key from the map.
    ///
    /// Returns a new map without the key. If the key doesn't exist,
    /// returns a clone of the original map.
    ///
    /// # Complexity
    ///
    /// O(log N)
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let (new_root, removed) = remove_from_node(&self.comparator, self.root.as_ref(), key);
        if !removed {
            return self.clone();
        }
        let black_root = new_root.map(|mut root| {
            root.color = Color::Black;
            ReferenceCounter::new(root)
        });
        Self {
            root: black_root,
            length: self.length - 1,
            comparator: self.comparator.clone(),
        }
    }

    /// Merges two maps, with values from `other` taking precedence on
    /// key conflicts.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut result = self.clone();
        for (key, value) in other.iter() {
            result = result.insert(key.clone(), value.clone());
        }
        result
    }

    /// Removes every key yielded by `keys`.
    #[must_use]
    pub fn remove_all<'a, Q, I>(&self, keys: I) -> Self
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        let mut result = self.clone();
        for key in keys {
            result = result.remove(key);
        }
        result
    }

    /// Keeps only the entries whose keys are yielded by `keys`.
    #[must_use]
    pub fn retain_all<'a, Q, I>(&self, keys: I) -> Self
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        let mut result = Self::with_comparator(self.comparator.clone());
        for key in keys {
            if let Some((found_key, value)) = self.entry_for(key) {
                result = result.insert(found_key.clone(), value.clone());
            }
        }
        result
    }

    /// Looks up the stored entry matching a borrowed key.
    fn entry_for<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let mut node = self.root.as_deref();
        while let Some(node_ref) = node {
            match self.comparator.compare(key, node_ref.key.borrow()) {
                Ordering::Less => node = node_ref.left.as_deref(),
                Ordering::Equal => return Some((&node_ref.key, &node_ref.value)),
                Ordering::Greater => node = node_ref.right.as_deref(),
            }
        }
        None
    }

    /// Converts this persistent map into a transient map in O(1).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persimmon::PersistentTreeMap;
    ///
    /// let persistent = PersistentTreeMap::new().insert(1, "one");
    ///
    /// let mut transient = persistent.transient();
    /// transient.insert(2, "two");
    ///
    /// assert_eq!(transient.persistent().len(), 2);
    /// ```
    #[must_use]
    pub fn transient(self) -> TransientTreeMap<K, V, C> {
        TransientTreeMap {
            inner: self,
            _marker: PhantomData,
        }
    }
}

// =============================================================================
// Iterator Implementations
// =============================================================================

/// A double-ended iterator over the entries of a [`PersistentTreeMap`]
/// in ascending key order.
pub struct PersistentTreeMapIterator<'a, K, V> {
    entries: std::vec::IntoIter<(&'a K, &'a V)>,
}

impl<'a, K, V> Iterator for PersistentTreeMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for PersistentTreeMapIterator<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.entries.next_back()
    }
}

impl<K, V> ExactSizeIterator for PersistentTreeMapIterator<'_, K, V> {
    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// An owning iterator over the entries of a [`PersistentTreeMap`] in
/// ascending key order.
pub struct PersistentTreeMapIntoIterator<K, V> {
    entries: std::vec::IntoIter<(K, V)>,
}

impl<K, V> Iterator for PersistentTreeMapIntoIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for PersistentTreeMapIntoIterator<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.entries.next_back()
    }
}

impl<K, V> ExactSizeIterator for PersistentTreeMapIntoIterator<K, V> {
    fn len(&self) -> usize {
        self.entries.len()
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V, C: Default> Default for PersistentTreeMap<K, V, C> {
    #[inline]
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K, V, C> FromIterator<(K, V)> for PersistentTreeMap<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparator<K> + Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (key, value) in iter {
            map = map.insert(key, value);
        }
        map
    }
}

impl<K: Clone, V: Clone, C> IntoIterator for PersistentTreeMap<K, V, C> {
    type Item = (K, V);
    type IntoIter = PersistentTreeMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        let entries: Vec<(K, V)> = self
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        PersistentTreeMapIntoIterator {
            entries: entries.into_iter(),
        }
    }
}

impl<'a, K, V, C> IntoIterator for &'a PersistentTreeMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = PersistentTreeMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: PartialEq, V: PartialEq, C> PartialEq for PersistentTreeMap<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, C> Eq for PersistentTreeMap<K, V, C> {}

impl<K: Hash, V: Hash, C> Hash for PersistentTreeMap<K, V, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for (key, value) in self.iter() {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for PersistentTreeMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display, C> fmt::Display for PersistentTreeMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("{")?;
        for (position, (key, value)) in self.iter().enumerate() {
            if position > 0 {
                formatter.write_str(", ")?;
            }
            write!(formatter, "{key}: {value}")?;
        }
        formatter.write_str("}")
    }
}

// =============================================================================
// TransientTreeMap Definition
// =============================================================================

/// A mutable facade for [`PersistentTreeMap`].
///
/// Unlike the hash-based transients, the tree needs no node-ownership
/// machinery: every mutation simply replaces the root reference. The
/// facade exists so batch updates read naturally and so freezing is an
/// explicit, consuming step.
///
/// # Examples
///
/// ```rust
/// use persimmon::TransientTreeMap;
///
/// let mut transient: TransientTreeMap<i32, &str> = TransientTreeMap::new();
/// transient.insert(2, "two");
/// transient.insert(1, "one");
///
/// let persistent = transient.persistent();
/// let keys: Vec<&i32> = persistent.keys().collect();
/// assert_eq!(keys, vec![&1, &2]);
/// ```
pub struct TransientTreeMap<K, V, C = NaturalOrder> {
    inner: PersistentTreeMap<K, V, C>,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

// Static assertions to verify TransientTreeMap is not Send/Sync
static_assertions::assert_not_impl_any!(TransientTreeMap<i32, i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientTreeMap<String, String>: Send, Sync);

impl<K, V> TransientTreeMap<K, V> {
    /// Creates a new empty transient map ordered by [`NaturalOrder`].
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: PersistentTreeMap::new(),
            _marker: PhantomData,
        }
    }
}

impl<K, V, C> TransientTreeMap<K, V, C> {
    /// Creates a new empty transient map ordered by the given comparator.
    #[inline]
    #[must_use]
    pub const fn with_comparator(comparator: C) -> Self {
        Self {
            inner: PersistentTreeMap::with_comparator(comparator),
            _marker: PhantomData,
        }
    }

    /// Returns the comparator ordering this map.
    #[inline]
    #[must_use]
    pub const fn comparator(&self) -> &C {
        self.inner.comparator()
    }

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

    /// Returns an iterator over entries in ascending key order.
    #[must_use]
    pub fn iter(&self) -> PersistentTreeMapIterator<'_, K, V> {
        self.inner.iter()
    }
}

impl<K, V, C> TransientTreeMap<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparator<K> + Clone,
{
    /// Returns a reference to the value corresponding to the key.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.inner.get(key)
    }

    /// Returns `true` if the map contains a value for the specified key.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.inner.contains_key(key)
    }

    /// Inserts a key-value pair, returning the previous value if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let old = self.inner.get(&key).cloned();
        self.inner = self.inner.insert(key, value);
        old
    }

    /// Removes a key, returning its value if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let old = self.inner.get(key).cloned();
        if old.is_some() {
            self.inner = self.inner.remove(key);
        }
        old
    }

    /// Converts this transient map into a persistent map in O(1).
    #[must_use]
    pub fn persistent(self) -> PersistentTreeMap<K, V, C> {
        self.inner
    }
}

impl<K, V> Default for TransientTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> Extend<(K, V)> for TransientTreeMap<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparator<K> + Clone,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K, V, C> serde::Serialize for PersistentTreeMap<K, V, C>
where
    K: serde::Serialize,
    V: serde::Serialize,
{
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
struct PersistentTreeMapVisitor<K, V, C> {
    key_marker: PhantomData<K>,
    value_marker: PhantomData<V>,
    comparator_marker: PhantomData<C>,
}

#[cfg(feature = "serde")]
impl<'de, K, V, C> serde::de::Visitor<'de> for PersistentTreeMapVisitor<K, V, C>
where
    K: serde::Deserialize<'de> + Clone,
    V: serde::Deserialize<'de> + Clone,
    C: Comparator<K> + Clone + Default,
{
    type Value = PersistentTreeMap<K, V, C>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut map = PersistentTreeMap::with_comparator(C::default());
        while let Some((key, value)) = access.next_entry()? {
            map = map.insert(key, value);
        }
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, C> serde::Deserialize<'de> for PersistentTreeMap<K, V, C>
where
    K: serde::Deserialize<'de> + Clone,
    V: serde::Deserialize<'de> + Clone,
    C: Comparator<K> + Clone + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentTreeMapVisitor {
            key_marker: PhantomData,
            value_marker: PhantomData,
            comparator_marker: PhantomData,
        })
    }
}

#[cfg(feature = "serde")]
impl<K, V, C> serde::Serialize for TransientTreeMap<K, V, C>
where
    K: serde::Serialize,
    V: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.inner.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, C> serde::Deserialize<'de> for TransientTreeMap<K, V, C>
where
    K: serde::Deserialize<'de> + Clone,
    V: serde::Deserialize<'de> + Clone,
    C: Comparator<K> + Clone + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        PersistentTreeMap::deserialize(deserializer).map(PersistentTreeMap::transient)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Checks invariants 4 and 5 and returns the black height.
    fn check_invariants<K, V>(node: Option<&ReferenceCounter<Node<K, V>>>) -> usize {
        match node {
            None => 1,
            Some(node_ref) => {
                if node_ref.color == Color::Red {
                    assert!(
                        !is_red(node_ref.left.as_ref()) && !is_red(node_ref.right.as_ref()),
                        "red node has a red child"
                    );
                }
                let left_height = check_invariants(node_ref.left.as_ref());
                let right_height = check_invariants(node_ref.right.as_ref());
                assert_eq!(left_height, right_height, "unequal black heights");
                left_height + usize::from(node_ref.color == Color::Black)
            }
        }
    }

    fn assert_valid(map: &PersistentTreeMap<i32, i32>) {
        assert!(!is_red(map.root.as_ref()), "root must be black");
        check_invariants(map.root.as_ref());
    }

    #[rstest]
    fn test_insert_keeps_sorted_order() {
        let map = PersistentTreeMap::new()
            .insert(3, 30)
            .insert(1, 10)
            .insert(2, 20);
        let keys: Vec<i32> = map.keys().copied().collect();
        assert_eq!(keys, vec![1, 2, 3]);
    }

    #[rstest]
    fn test_invariants_after_ascending_inserts() {
        let mut map = PersistentTreeMap::new();
        for key in 0..256 {
            map = map.insert(key, key);
            assert_valid(&map);
        }
        assert_eq!(map.len(), 256);
    }

    #[rstest]
    fn test_invariants_after_interleaved_removals() {
        let mut map: PersistentTreeMap<i32, i32> = (0..128).map(|key| (key, key)).collect();
        assert_valid(&map);
        for key in (0..128).filter(|key| key % 3 != 0) {
            map = map.remove(&key);
            assert_valid(&map);
        }
        let keys: Vec<i32> = map.keys().copied().collect();
        let expected: Vec<i32> = (0..128).filter(|key| key % 3 == 0).collect();
        assert_eq!(keys, expected);
    }

    #[rstest]
    fn test_remove_missing_key_is_noop() {
        let map = PersistentTreeMap::new().insert(1, 10);
        let removed = map.remove(&99);
        assert_eq!(removed, map);
    }

    #[rstest]
    fn test_min_and_max() {
        let map: PersistentTreeMap<i32, i32> = [5, 1, 9, 3].into_iter().map(|k| (k, k)).collect();
        assert_eq!(map.min(), Some((&1, &1)));
        assert_eq!(map.max(), Some((&9, &9)));

        let empty: PersistentTreeMap<i32, i32> = PersistentTreeMap::new();
        assert_eq!(empty.min(), None);
        assert_eq!(empty.max(), None);
    }

    #[rstest]
    fn test_navigation() {
        let map: PersistentTreeMap<i32, i32> =
            [10, 20, 30].into_iter().map(|k| (k, k)).collect();

        assert_eq!(map.ceiling_key(&15), Some(&20));
        assert_eq!(map.ceiling_key(&20), Some(&20));
        assert_eq!(map.ceiling_key(&31), None);

        assert_eq!(map.floor_key(&15), Some(&10));
        assert_eq!(map.floor_key(&10), Some(&10));
        assert_eq!(map.floor_key(&9), None);

        assert_eq!(map.higher_key(&20), Some(&30));
        assert_eq!(map.higher_key(&30), None);

        assert_eq!(map.lower_key(&20), Some(&10));
        assert_eq!(map.lower_key(&10), None);
    }

    #[rstest]
    fn test_descending_iteration() {
        let map: PersistentTreeMap<i32, i32> = (0..10).map(|k| (k, k)).collect();
        let keys: Vec<i32> = map.iter_descending().map(|(key, _)| *key).collect();
        let expected: Vec<i32> = (0..10).rev().collect();
        assert_eq!(keys, expected);
    }

    #[rstest]
    fn test_range_bounds() {
        let map: PersistentTreeMap<i32, i32> = (0..10).map(|k| (k, k)).collect();
        let selected: Vec<i32> = map.range(2..=5).map(|(key, _)| *key).collect();
        assert_eq!(selected, vec![2, 3, 4, 5]);
        let tail: Vec<i32> = map.range(7..).map(|(key, _)| *key).collect();
        assert_eq!(tail, vec![7, 8, 9]);
    }

    #[rstest]
    fn test_structural_sharing_on_insert() {
        let map: PersistentTreeMap<i32, i32> = (0..100).map(|k| (k, k)).collect();
        let updated = map.insert(100, 100);
        assert_eq!(map.len(), 100);
        assert_eq!(updated.len(), 101);
        assert_eq!(map.get(&100), None);
    }

    #[rstest]
    fn test_custom_comparator_reverses_order() {
        #[derive(Clone, Default)]
        struct Reverse;
        impl Comparator<i32> for Reverse {
            fn compare(&self, left: &i32, right: &i32) -> Ordering {
                right.cmp(left)
            }
        }

        let map = PersistentTreeMap::with_comparator(Reverse)
            .insert(1, 10)
            .insert(3, 30)
            .insert(2, 20);
        let keys: Vec<i32> = map.keys().copied().collect();
        assert_eq!(keys, vec![3, 2, 1]);
        assert_eq!(map.min(), Some((&3, &30)));
        assert_eq!(map.ceiling_key(&2), Some(&2));
    }

    #[rstest]
    fn test_option_keys_order_none_first() {
        let map = PersistentTreeMap::new()
            .insert(Some(2), "two")
            .insert(None, "absent")
            .insert(Some(1), "one");
        let keys: Vec<Option<i32>> = map.keys().copied().collect();
        assert_eq!(keys, vec![None, Some(1), Some(2)]);
    }

    #[rstest]
    fn test_transient_facade() {
        let mut transient: TransientTreeMap<i32, i32> = TransientTreeMap::new();
        assert_eq!(transient.insert(1, 10), None);
        assert_eq!(transient.insert(1, 11), Some(10));
        assert_eq!(transient.remove(&1), Some(11));
        assert_eq!(transient.remove(&1), None);
        transient.extend((0..50).map(|k| (k, k)));
        assert_eq!(transient.persistent().len(), 50);
    }

    #[rstest]
    fn test_display() {
        let empty: PersistentTreeMap<i32, String> = PersistentTreeMap::new();
        assert_eq!(format!("{empty}"), "{}");

        let map = PersistentTreeMap::new().insert(2, "two").insert(1, "one");
        assert_eq!(format!("{map}"), "{1: one, 2: two}");
    }
}
