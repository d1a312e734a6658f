//! Unit tests for `PersistentHashMap` and `TransientHashMap`.

use persimmon::{PersistentHashMap, TransientHashMap};
use rstest::rstest;

// =============================================================================
// Basic Construction Tests
// =============================================================================

#[rstest]
fn test_new_creates_empty_map() {
    let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
    assert!(map.is_empty());
    assert_eq!(map.len(), 0);
}

#[rstest]
fn test_default_creates_empty_map() {
    let map: PersistentHashMap<String, i32> = PersistentHashMap::default();
    assert!(map.is_empty());
}

#[rstest]
fn test_singleton() {
    let map = PersistentHashMap::singleton(42, "answer".to_string());
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&42), Some(&"answer".to_string()));
}

// =============================================================================
// Insert and Get Tests
// =============================================================================

#[rstest]
fn test_insert_preserves_original() {
    let map1 = PersistentHashMap::new().insert("key".to_string(), 1);
    let map2 = map1.insert("key".to_string(), 2);
    let map3 = map2.insert("other".to_string(), 3);

    assert_eq!(map1.get("key"), Some(&1));
    assert_eq!(map2.get("key"), Some(&2));
    assert_eq!(map2.len(), 1);
    assert_eq!(map3.len(), 2);
}

#[rstest]
#[case(100)]
#[case(1_000)]
#[case(20_000)]
fn test_insert_many_entries(#[case] count: i64) {
    let map: PersistentHashMap<i64, i64> = (0..count).map(|key| (key, key * 3)).collect();
    assert_eq!(map.len(), usize::try_from(count).expect("fits"));
    for key in [0, count / 2, count - 1] {
        assert_eq!(map.get(&key), Some(&(key * 3)));
    }
    assert_eq!(map.get(&count), None);
}

#[rstest]
fn test_borrowed_key_lookup() {
    let map = PersistentHashMap::new().insert("hello".to_string(), 1);
    assert_eq!(map.get("hello"), Some(&1));
    assert!(map.contains_key("hello"));
    assert!(!map.contains_key("world"));
}

// =============================================================================
// Remove Tests
// =============================================================================

#[rstest]
fn test_remove_each_key_in_turn() {
    let full: PersistentHashMap<i32, i32> = (0..100).map(|key| (key, key)).collect();
    let mut map = full.clone();
    for key in 0..100 {
        map = map.remove(&key);
        assert!(!map.contains_key(&key));
        assert_eq!(map.len(), usize::try_from(99 - key).expect("fits"));
    }
    assert!(map.is_empty());
    assert_eq!(full.len(), 100);
}

#[rstest]
fn test_removal_restores_equality_with_never_inserted() {
    // A map that saw an insert-then-remove must be indistinguishable
    // from one that never contained the key.
    let pristine: PersistentHashMap<i32, i32> = (0..50).map(|key| (key, key)).collect();
    let detoured = pristine.insert(999, 999).remove(&999);
    assert_eq!(pristine, detoured);
}

// =============================================================================
// Bulk Operation Tests
// =============================================================================

#[rstest]
fn test_merge_and_remove_all_and_retain_all() {
    let base: PersistentHashMap<String, i32> = [("a", 1), ("b", 2), ("c", 3)]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
    let overlay: PersistentHashMap<String, i32> = [("c", 30), ("d", 40)]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();

    let merged = base.merge(&overlay);
    assert_eq!(merged.len(), 4);
    assert_eq!(merged.get("c"), Some(&30));

    let trimmed = merged.remove_all(["a", "d"]);
    assert_eq!(trimmed.len(), 2);

    let kept = merged.retain_all(["a", "d"]);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept.get("a"), Some(&1));
    assert_eq!(kept.get("d"), Some(&40));
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[rstest]
fn test_iterator_is_exact_and_complete() {
    let map: PersistentHashMap<i32, i32> = (0..500).map(|key| (key, key)).collect();
    let iterator = map.iter();
    assert_eq!(iterator.len(), 500);

    let mut keys: Vec<i32> = map.keys().copied().collect();
    keys.sort_unstable();
    assert_eq!(keys, (0..500).collect::<Vec<i32>>());
}

#[rstest]
fn test_into_iterator_owns_entries() {
    let map: PersistentHashMap<i32, String> = (0..10).map(|key| (key, key.to_string())).collect();
    let mut owned: Vec<(i32, String)> = map.into_iter().collect();
    owned.sort_by_key(|(key, _)| *key);
    assert_eq!(owned.len(), 10);
    assert_eq!(owned[3], (3, "3".to_string()));
}

// =============================================================================
// Transient Tests
// =============================================================================

#[rstest]
fn test_snapshot_is_isolated_from_transient_writes() {
    let persistent: PersistentHashMap<i32, i32> = (0..1_000).map(|key| (key, key)).collect();
    let snapshot = persistent.clone();

    let mut transient = persistent.transient();
    for key in 0..1_000 {
        transient.insert(key, key + 1);
    }
    for key in 500..1_000 {
        transient.remove(&key);
    }
    let rebuilt = transient.persistent();

    // The snapshot must be byte-for-byte what it was.
    assert_eq!(snapshot.len(), 1_000);
    for key in [0, 250, 999] {
        assert_eq!(snapshot.get(&key), Some(&key));
    }
    assert_eq!(rebuilt.len(), 500);
    assert_eq!(rebuilt.get(&250), Some(&251));
    assert_eq!(rebuilt.get(&750), None);
}

#[rstest]
fn test_transient_from_scratch() {
    let mut transient = TransientHashMap::new();
    assert!(transient.is_empty());
    transient.extend((0..100).map(|key| (key, key)));
    assert_eq!(transient.len(), 100);
    assert_eq!(transient.get(&42), Some(&42));
    assert!(transient.contains_key(&42));

    let persistent = transient.persistent();
    assert_eq!(persistent.len(), 100);
}

// =============================================================================
// Equality Tests
// =============================================================================

#[rstest]
fn test_equality_matches_final_content_not_history() {
    let forward: PersistentHashMap<i32, i32> = (0..64).map(|key| (key, key)).collect();
    let backward: PersistentHashMap<i32, i32> = (0..64).rev().map(|key| (key, key)).collect();
    let detoured = forward
        .insert(1_000, 0)
        .insert(2_000, 0)
        .remove(&1_000)
        .remove(&2_000);

    assert_eq!(forward, backward);
    assert_eq!(forward, detoured);
    assert_ne!(forward, forward.remove(&0));
}
