//! CHAMP trie engine shared by the hash-based collection families.
//!
//! A CHAMP (Compressed Hash-Array Mapped Prefix-tree) node carries two
//! 32-bit bitmaps: `data_map` marks slots holding an inline entry and
//! `node_map` marks slots holding a sub-node. A bit position is set in at
//! most one of the two maps, and the slot index within the corresponding
//! compressed array is the population count of the map below that bit.
//! Five hash bits are consumed per level, so a 32-bit hash bottoms out
//! after seven levels; keys whose full hashes collide are gathered in a
//! hash-collision node below that.
//!
//! The trie is kept in canonical form: removal folds a sub-node holding a
//! single remaining entry back into its parent, so two tries with the same
//! logical content are structurally identical and can be compared without
//! iterating.
//!
//! In-place mutation goes through [`ReferenceCounter::make_mut`]: a node
//! is updated directly when the caller holds the only reference to it and
//! is copied first otherwise. Persistent wrappers clone their root handle
//! before writing, which forces path copying; transient builders own their
//! root and converge to in-place updates.

use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash, Hasher};

use arrayvec::ArrayVec;
use smallvec::SmallVec;

use crate::ReferenceCounter;

// =============================================================================
// Constants
// =============================================================================

/// Branching factor (2^5 = 32)
pub(crate) const BRANCHING_FACTOR: usize = 32;

/// Bits per level in the trie
pub(crate) const BITS_PER_LEVEL: u32 = 5;

/// Bit mask for extracting the slot index within a node
pub(crate) const LEVEL_MASK: u32 = (BRANCHING_FACTOR - 1) as u32;

/// Number of hash bits consumed over the full depth of the trie
pub(crate) const HASH_BITS: u32 = 32;

/// Deepest possible iterator stack: seven bitmap levels plus one
/// hash-collision level.
pub(crate) const MAX_ITERATOR_DEPTH: usize = 8;

// =============================================================================
// Hashing
// =============================================================================

/// Produces a process-random salt for one collection family.
///
/// Each family calls this at most once through a `OnceLock`, so all
/// instances of the family scramble key hashes identically and keep their
/// tries structurally comparable, while unrelated families (and unrelated
/// processes) see decorrelated hashes.
pub(crate) fn initialize_family_salt() -> u32 {
    let state = std::collections::hash_map::RandomState::new();
    let seed = state.hash_one(0x9e37_79b9_7f4a_7c15_u64);
    (seed as u32) ^ ((seed >> 32) as u32)
}

/// Computes the salted 32-bit hash of a key.
pub(crate) fn salted_hash<K: Hash + ?Sized>(salt: u32, key: &K) -> u32 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    let hash = hasher.finish();
    salt ^ ((hash as u32) ^ ((hash >> 32) as u32))
}

/// Extracts the 5-bit slot index for the level addressed by `shift`.
pub(crate) const fn mask(hash: u32, shift: u32) -> u32 {
    if shift >= HASH_BITS {
        0
    } else {
        (hash >> shift) & LEVEL_MASK
    }
}

/// Maps a 5-bit slot index to its bitmap bit.
pub(crate) const fn bit_position(mask: u32) -> u32 {
    1 << mask
}

// =============================================================================
// Node Definition
// =============================================================================

/// Internal node structure for the CHAMP trie.
#[derive(Clone)]
pub(crate) enum Node<K, V> {
    /// Bitmap-indexed node with inline entries and sub-node references
    Bitmap(BitmapNode<K, V>),
    /// Entries whose full 32-bit hashes collide
    Collision(CollisionNode<K, V>),
}

/// A bitmap-indexed trie node.
#[derive(Clone)]
pub(crate) struct BitmapNode<K, V> {
    /// Bits marking slots that hold an inline entry
    pub(crate) data_map: u32,
    /// Bits marking slots that hold a sub-node
    pub(crate) node_map: u32,
    /// Inline entries, ordered by bit position
    pub(crate) entries: Vec<(K, V)>,
    /// Sub-nodes, ordered by bit position
    pub(crate) children: Vec<ReferenceCounter<Node<K, V>>>,
}

/// A leaf holding entries that share one full hash.
#[derive(Clone)]
pub(crate) struct CollisionNode<K, V> {
    /// The hash shared by every entry in this node
    pub(crate) hash: u32,
    /// The colliding entries; two is the overwhelmingly common case
    pub(crate) entries: SmallVec<[(K, V); 2]>,
}

impl<K, V> BitmapNode<K, V> {
    /// Creates an empty bitmap node.
    pub(crate) const fn empty() -> Self {
        Self {
            data_map: 0,
            node_map: 0,
            entries: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Slot index of `bit` within the inline-entry array.
    fn data_index(&self, bit: u32) -> usize {
        (self.data_map & (bit - 1)).count_ones() as usize
    }

    /// Slot index of `bit` within the sub-node array.
    fn node_index(&self, bit: u32) -> usize {
        (self.node_map & (bit - 1)).count_ones() as usize
    }
}

/// Creates an empty trie root.
pub(crate) fn empty_root<K, V>() -> ReferenceCounter<Node<K, V>> {
    ReferenceCounter::new(Node::Bitmap(BitmapNode::empty()))
}

// =============================================================================
// Change Events
// =============================================================================

/// Outcome of a single trie operation.
///
/// The collection wrappers derive their size accounting from this, and the
/// sequenced hybrid additionally uses the old payload to locate the slot
/// it has to maintain in its order vector.
pub(crate) enum ChangeEvent<V> {
    /// The operation did not modify the trie
    Unchanged,
    /// A new entry was added
    Inserted,
    /// An existing entry's value was replaced
    Replaced(V),
    /// An entry was removed
    Removed(V),
}

// =============================================================================
// Lookup
// =============================================================================

/// Finds the entry stored under `key`, or `None` if the key is absent.
pub(crate) fn find<'a, K, V, Q>(
    node: &'a Node<K, V>,
    key: &Q,
    hash: u32,
    shift: u32,
) -> Option<&'a (K, V)>
where
    K: Borrow<Q>,
    Q: Eq + ?Sized,
{
    let mut node = node;
    let mut shift = shift;
    loop {
        match node {
            Node::Bitmap(bitmap) => {
                let bit = bit_position(mask(hash, shift));
                if bitmap.data_map & bit != 0 {
                    let entry = &bitmap.entries[bitmap.data_index(bit)];
                    return if entry.0.borrow() == key {
                        Some(entry)
                    } else {
                        None
                    };
                }
                if bitmap.node_map & bit != 0 {
                    node = &bitmap.children[bitmap.node_index(bit)];
                    shift += BITS_PER_LEVEL;
                    continue;
                }
                return None;
            }
            Node::Collision(collision) => {
                if collision.hash != hash {
                    return None;
                }
                return collision.entries.iter().find(|entry| entry.0.borrow() == key);
            }
        }
    }
}

// =============================================================================
// Insertion
// =============================================================================

/// Inserts `key`/`value`, replacing the value of an existing equal key.
///
/// `hash_of` recomputes the salted hash of a displaced inline entry when
/// two distinct keys have to be pushed one level deeper.
pub(crate) fn insert<K, V, F>(
    node: &mut ReferenceCounter<Node<K, V>>,
    key: K,
    value: V,
    hash: u32,
    shift: u32,
    hash_of: &F,
) -> ChangeEvent<V>
where
    K: Clone + Eq,
    V: Clone,
    F: Fn(&K) -> u32,
{
    // Splitting a collision node replaces it wholesale, so that case is
    // handled before taking the long-lived mutable borrow below.
    if let Node::Collision(collision) = &**node
        && collision.hash != hash
    {
        return split_collision(node, key, value, hash, shift, hash_of);
    }

    match ReferenceCounter::make_mut(node) {
        Node::Bitmap(bitmap) => {
            let bit = bit_position(mask(hash, shift));
            if bitmap.data_map & bit != 0 {
                let index = bitmap.data_index(bit);
                if bitmap.entries[index].0 == key {
                    let old = std::mem::replace(&mut bitmap.entries[index].1, value);
                    return ChangeEvent::Replaced(old);
                }
                // Two distinct keys share the slot: push both one level
                // deeper until their hashes diverge.
                let (existing_key, existing_value) = bitmap.entries.remove(index);
                let existing_hash = hash_of(&existing_key);
                let subnode = merge_entries(
                    existing_key,
                    existing_value,
                    existing_hash,
                    key,
                    value,
                    hash,
                    shift + BITS_PER_LEVEL,
                );
                bitmap.data_map &= !bit;
                bitmap.node_map |= bit;
                let node_index = bitmap.node_index(bit);
                bitmap
                    .children
                    .insert(node_index, ReferenceCounter::new(subnode));
                ChangeEvent::Inserted
            } else if bitmap.node_map & bit != 0 {
                let index = bitmap.node_index(bit);
                insert(
                    &mut bitmap.children[index],
                    key,
                    value,
                    hash,
                    shift + BITS_PER_LEVEL,
                    hash_of,
                )
            } else {
                let index = bitmap.data_index(bit);
                bitmap.data_map |= bit;
                bitmap.entries.insert(index, (key, value));
                ChangeEvent::Inserted
            }
        }
        Node::Collision(collision) => {
            if let Some(entry) = collision.entries.iter_mut().find(|entry| entry.0 == key) {
                let old = std::mem::replace(&mut entry.1, value);
                return ChangeEvent::Replaced(old);
            }
            collision.entries.push((key, value));
            ChangeEvent::Inserted
        }
    }
}

/// Merges two entries with distinct keys into a fresh sub-trie.
fn merge_entries<K, V>(
    existing_key: K,
    existing_value: V,
    existing_hash: u32,
    key: K,
    value: V,
    hash: u32,
    shift: u32,
) -> Node<K, V> {
    if existing_hash == hash {
        let mut entries = SmallVec::new();
        entries.push((existing_key, existing_value));
        entries.push((key, value));
        return Node::Collision(CollisionNode { hash, entries });
    }

    let existing_mask = mask(existing_hash, shift);
    let new_mask = mask(hash, shift);

    if existing_mask == new_mask {
        // Still sharing a slot at this level: recurse one level deeper.
        let child = merge_entries(
            existing_key,
            existing_value,
            existing_hash,
            key,
            value,
            hash,
            shift + BITS_PER_LEVEL,
        );
        Node::Bitmap(BitmapNode {
            data_map: 0,
            node_map: bit_position(existing_mask),
            entries: Vec::new(),
            children: vec![ReferenceCounter::new(child)],
        })
    } else {
        let (first, second) = if existing_mask < new_mask {
            ((existing_key, existing_value), (key, value))
        } else {
            ((key, value), (existing_key, existing_value))
        };
        Node::Bitmap(BitmapNode {
            data_map: bit_position(existing_mask) | bit_position(new_mask),
            node_map: 0,
            entries: vec![first, second],
            children: Vec::new(),
        })
    }
}

/// Replaces a collision node with a bitmap node when a differing hash
/// arrives, pushing the collision entries deeper as needed.
fn split_collision<K, V, F>(
    node: &mut ReferenceCounter<Node<K, V>>,
    key: K,
    value: V,
    hash: u32,
    shift: u32,
    hash_of: &F,
) -> ChangeEvent<V>
where
    K: Clone + Eq,
    V: Clone,
    F: Fn(&K) -> u32,
{
    let collision_hash = match &**node {
        Node::Collision(collision) => collision.hash,
        Node::Bitmap(_) => return insert(node, key, value, hash, shift, hash_of),
    };

    let collision_mask = mask(collision_hash, shift);
    let new_mask = mask(hash, shift);
    let mut collision_child = std::mem::replace(node, empty_root());

    let replacement = if collision_mask == new_mask {
        let event = insert(
            &mut collision_child,
            key,
            value,
            hash,
            shift + BITS_PER_LEVEL,
            hash_of,
        );
        debug_assert!(matches!(event, ChangeEvent::Inserted));
        BitmapNode {
            data_map: 0,
            node_map: bit_position(collision_mask),
            entries: Vec::new(),
            children: vec![collision_child],
        }
    } else {
        BitmapNode {
            data_map: bit_position(new_mask),
            node_map: bit_position(collision_mask),
            entries: vec![(key, value)],
            children: vec![collision_child],
        }
    };

    *node = ReferenceCounter::new(Node::Bitmap(replacement));
    ChangeEvent::Inserted
}

// =============================================================================
// Removal
// =============================================================================

/// Removes `key` from the trie, keeping the structure canonical.
pub(crate) fn remove<K, V, Q>(
    node: &mut ReferenceCounter<Node<K, V>>,
    key: &Q,
    hash: u32,
    shift: u32,
) -> ChangeEvent<V>
where
    K: Borrow<Q> + Clone,
    V: Clone,
    Q: Eq + ?Sized,
{
    match ReferenceCounter::make_mut(node) {
        Node::Bitmap(bitmap) => {
            let bit = bit_position(mask(hash, shift));
            if bitmap.data_map & bit != 0 {
                let index = bitmap.data_index(bit);
                if bitmap.entries[index].0.borrow() == key {
                    let (_, old_value) = bitmap.entries.remove(index);
                    bitmap.data_map &= !bit;
                    ChangeEvent::Removed(old_value)
                } else {
                    ChangeEvent::Unchanged
                }
            } else if bitmap.node_map & bit != 0 {
                let index = bitmap.node_index(bit);
                let event = remove(&mut bitmap.children[index], key, hash, shift + BITS_PER_LEVEL);
                if matches!(event, ChangeEvent::Removed(_))
                    && let Some(entry) = take_single_entry(&mut bitmap.children[index])
                {
                    // Canonical form: a child left with a single inline
                    // entry is folded back into this node.
                    bitmap.children.remove(index);
                    bitmap.node_map &= !bit;
                    bitmap.data_map |= bit;
                    let data_index = bitmap.data_index(bit);
                    bitmap.entries.insert(data_index, entry);
                }
                event
            } else {
                ChangeEvent::Unchanged
            }
        }
        Node::Collision(collision) => {
            if collision.hash != hash {
                return ChangeEvent::Unchanged;
            }
            match collision
                .entries
                .iter()
                .position(|entry| entry.0.borrow() == key)
            {
                Some(index) => {
                    let (_, old_value) = collision.entries.remove(index);
                    ChangeEvent::Removed(old_value)
                }
                None => ChangeEvent::Unchanged,
            }
        }
    }
}

/// Extracts the entry of a node that holds exactly one entry and no
/// sub-nodes, leaving an empty shell for the caller to discard.
fn take_single_entry<K, V>(node: &mut ReferenceCounter<Node<K, V>>) -> Option<(K, V)>
where
    K: Clone,
    V: Clone,
{
    let is_single = match &**node {
        Node::Bitmap(bitmap) => bitmap.node_map == 0 && bitmap.entries.len() == 1,
        Node::Collision(collision) => collision.entries.len() == 1,
    };
    if !is_single {
        return None;
    }
    match ReferenceCounter::make_mut(node) {
        Node::Bitmap(bitmap) => {
            bitmap.data_map = 0;
            bitmap.entries.pop()
        }
        Node::Collision(collision) => collision.entries.pop(),
    }
}

// =============================================================================
// Structural Equality
// =============================================================================

/// Compares two tries structurally.
///
/// Because all instances of a family share one hash salt and the trie is
/// kept canonical, two tries with equal logical content have identical
/// structure; shared sub-trees short-circuit through pointer equality.
/// Collision entries are the one place where insertion order may differ,
/// so they are compared as unordered sets.
pub(crate) fn node_equals<K, V>(
    left: &ReferenceCounter<Node<K, V>>,
    right: &ReferenceCounter<Node<K, V>>,
) -> bool
where
    K: Eq,
    V: PartialEq,
{
    if ReferenceCounter::ptr_eq(left, right) {
        return true;
    }
    match (&**left, &**right) {
        (Node::Bitmap(first), Node::Bitmap(second)) => {
            first.data_map == second.data_map
                && first.node_map == second.node_map
                && first.entries == second.entries
                && first
                    .children
                    .iter()
                    .zip(second.children.iter())
                    .all(|(left_child, right_child)| node_equals(left_child, right_child))
        }
        (Node::Collision(first), Node::Collision(second)) => {
            first.hash == second.hash
                && first.entries.len() == second.entries.len()
                && first
                    .entries
                    .iter()
                    .all(|entry| second.entries.contains(entry))
        }
        _ => false,
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// A traversal frame: one node plus the progress made through its inline
/// entries and its sub-nodes.
struct Frame<'a, K, V> {
    node: &'a Node<K, V>,
    entry_index: usize,
    child_index: usize,
}

/// Depth-first trie iterator over borrowed entries.
///
/// The explicit stack is bounded by the trie depth, so it lives in an
/// [`ArrayVec`] and never allocates. A node's inline entries are yielded
/// before its sub-nodes are visited.
pub(crate) struct ChampIterator<'a, K, V> {
    stack: ArrayVec<Frame<'a, K, V>, MAX_ITERATOR_DEPTH>,
    remaining: usize,
}

impl<'a, K, V> ChampIterator<'a, K, V> {
    /// Creates an iterator over `root`, which holds `length` entries.
    pub(crate) fn new(root: &'a Node<K, V>, length: usize) -> Self {
        let mut stack = ArrayVec::new();
        stack.push(Frame {
            node: root,
            entry_index: 0,
            child_index: 0,
        });
        Self { stack, remaining: length }
    }
}

impl<'a, K, V> Iterator for ChampIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let node: &'a Node<K, V> = frame.node;
            let mut descend: Option<&'a Node<K, V>> = None;

            match node {
                Node::Bitmap(bitmap) => {
                    if frame.entry_index < bitmap.entries.len() {
                        let (key, value) = &bitmap.entries[frame.entry_index];
                        frame.entry_index += 1;
                        self.remaining -= 1;
                        return Some((key, value));
                    }
                    if frame.child_index < bitmap.children.len() {
                        descend = Some(&bitmap.children[frame.child_index]);
                        frame.child_index += 1;
                    }
                }
                Node::Collision(collision) => {
                    if frame.entry_index < collision.entries.len() {
                        let (key, value) = &collision.entries[frame.entry_index];
                        frame.entry_index += 1;
                        self.remaining -= 1;
                        return Some((key, value));
                    }
                }
            }

            match descend {
                Some(child) => self.stack.push(Frame {
                    node: child,
                    entry_index: 0,
                    child_index: 0,
                }),
                None => {
                    self.stack.pop();
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for ChampIterator<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn identity_hash(key: &u32) -> u32 {
        *key
    }

    fn insert_with_identity(
        node: &mut ReferenceCounter<Node<u32, i32>>,
        key: u32,
        value: i32,
    ) -> ChangeEvent<i32> {
        insert(node, key, value, key, 0, &identity_hash)
    }

    #[rstest]
    fn test_insert_and_find() {
        let mut root = empty_root();
        assert!(matches!(
            insert_with_identity(&mut root, 1, 10),
            ChangeEvent::Inserted
        ));
        assert!(matches!(
            insert_with_identity(&mut root, 33, 20),
            ChangeEvent::Inserted
        ));

        // 1 and 33 share the bottom five bits and must diverge one level
        // deeper.
        assert_eq!(find(&root, &1, 1, 0), Some(&(1, 10)));
        assert_eq!(find(&root, &33, 33, 0), Some(&(33, 20)));
        assert_eq!(find(&root, &65, 65, 0), None);
    }

    #[rstest]
    fn test_replace_reports_old_value() {
        let mut root = empty_root();
        insert_with_identity(&mut root, 7, 1);
        match insert_with_identity(&mut root, 7, 2) {
            ChangeEvent::Replaced(old) => assert_eq!(old, 1),
            _ => panic!("expected a replacement"),
        }
    }

    #[rstest]
    fn test_remove_restores_canonical_form() {
        let mut root = empty_root();
        insert_with_identity(&mut root, 1, 10);
        insert_with_identity(&mut root, 33, 20);

        let mut sibling = empty_root();
        insert_with_identity(&mut sibling, 1, 10);

        assert!(matches!(
            remove(&mut root, &33, 33, 0),
            ChangeEvent::Removed(20)
        ));

        // After folding the lone survivor back into the root, the trie is
        // indistinguishable from one that never saw the removed key.
        assert!(node_equals(&root, &sibling));
    }

    #[rstest]
    fn test_collision_node_round_trip() {
        let zero_hash = |_key: &u32| 0;
        let mut root: ReferenceCounter<Node<u32, i32>> = empty_root();
        insert(&mut root, 1, 10, 0, 0, &zero_hash);
        insert(&mut root, 2, 20, 0, 0, &zero_hash);

        assert_eq!(find(&root, &1, 0, 0), Some(&(1, 10)));
        assert_eq!(find(&root, &2, 0, 0), Some(&(2, 20)));

        assert!(matches!(remove(&mut root, &1, 0, 0), ChangeEvent::Removed(10)));
        assert_eq!(find(&root, &1, 0, 0), None);
        assert_eq!(find(&root, &2, 0, 0), Some(&(2, 20)));
    }

    #[rstest]
    fn test_iterator_visits_every_entry() {
        let mut root = empty_root();
        for key in 0..100_u32 {
            insert_with_identity(&mut root, key, i32::try_from(key).expect("fits"));
        }

        let mut seen: Vec<u32> = ChampIterator::new(&root, 100).map(|(key, _)| *key).collect();
        seen.sort_unstable();
        let expected: Vec<u32> = (0..100).collect();
        assert_eq!(seen, expected);
    }
}
