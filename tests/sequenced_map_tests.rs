//! Unit tests for `PersistentSequencedMap` and `TransientSequencedMap`.

use persimmon::{PersistentSequencedMap, TransientSequencedMap};
use rstest::rstest;

fn keys_of(map: &PersistentSequencedMap<i32, i32>) -> Vec<i32> {
    map.keys().copied().collect()
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[rstest]
fn test_iteration_follows_insertion_order() {
    let map = PersistentSequencedMap::new()
        .insert(5, 50)
        .insert(1, 10)
        .insert(9, 90)
        .insert(3, 30);
    assert_eq!(keys_of(&map), vec![5, 1, 9, 3]);
}

#[rstest]
fn test_order_survives_mixed_history() {
    // putLast / remove / putFirst in one history; the iterator must
    // replay exactly the implied order.
    let map = PersistentSequencedMap::new()
        .insert_last(1, 1)
        .insert_last(2, 2)
        .insert_first(0, 0)
        .insert_last(3, 3)
        .remove(&2)
        .insert_first(-1, -1)
        .insert_last(2, 22);
    assert_eq!(keys_of(&map), vec![-1, 0, 1, 3, 2]);
    assert_eq!(map.get(&2), Some(&22));
}

#[rstest]
fn test_plain_insert_never_moves() {
    let map = PersistentSequencedMap::new()
        .insert(1, 1)
        .insert(2, 2)
        .insert(3, 3)
        .insert(2, 22)
        .insert(1, 11);
    assert_eq!(keys_of(&map), vec![1, 2, 3]);
}

#[rstest]
fn test_moving_insertions_relocate() {
    let base: PersistentSequencedMap<i32, i32> = (0..5).map(|key| (key, key)).collect();
    assert_eq!(keys_of(&base.insert_first(3, 3)), vec![3, 0, 1, 2, 4]);
    assert_eq!(keys_of(&base.insert_last(0, 0)), vec![1, 2, 3, 4, 0]);
}

#[rstest]
fn test_first_and_last() {
    let map: PersistentSequencedMap<i32, i32> = (0..5).map(|key| (key, key * 2)).collect();
    assert_eq!(map.first(), Some((&0, &0)));
    assert_eq!(map.last(), Some((&4, &8)));

    let empty: PersistentSequencedMap<i32, i32> = PersistentSequencedMap::new();
    assert_eq!(empty.first(), None);
    assert_eq!(empty.last(), None);
}

// =============================================================================
// Tombstone Tests
// =============================================================================

#[rstest]
fn test_tombstones_never_surface() {
    let mut map: PersistentSequencedMap<i32, i32> = (0..32).map(|key| (key, key)).collect();
    for key in (0..32).step_by(2) {
        map = map.remove(&key);
    }
    let expected: Vec<i32> = (0..32).filter(|key| key % 2 == 1).collect();
    assert_eq!(keys_of(&map), expected);

    let reversed: Vec<i32> = map.iter_reversed().map(|(key, _)| *key).collect();
    let mut expected_reversed = expected;
    expected_reversed.reverse();
    assert_eq!(reversed, expected_reversed);
}

#[rstest]
fn test_renumbering_is_transparent() {
    // Force far more moves than the renumber threshold and verify only
    // order and membership, never internal layout.
    let mut map: PersistentSequencedMap<i32, i32> = (0..8).map(|key| (key, key)).collect();
    let mut model: Vec<i32> = (0..8).collect();

    for step in 0..100 {
        let position = 1 + (step % 5);
        let moved = model.remove(position);
        model.push(moved);
        map = map.insert_last(moved, moved);
        assert_eq!(keys_of(&map), model, "diverged at step {step}");
    }
    assert_eq!(map.len(), 8);
    for key in 0..8 {
        assert!(map.contains_key(&key));
    }
}

// =============================================================================
// Scenario Tests
// =============================================================================

#[rstest]
fn test_remove_first_scenario() {
    let map = PersistentSequencedMap::new()
        .insert_last(1, 1)
        .insert_last(2, 2)
        .insert_first(0, 0);
    assert_eq!(keys_of(&map), vec![0, 1, 2]);

    let (rest, (removed, _)) = map.remove_first().expect("non-empty");
    assert_eq!(removed, 0);
    assert_eq!(keys_of(&rest), vec![1, 2]);
}

#[rstest]
fn test_drain_from_both_ends() {
    let mut map: PersistentSequencedMap<i32, i32> = (0..10).map(|key| (key, key)).collect();
    let mut drained = Vec::new();
    loop {
        let Some((rest, (key, _))) = map.remove_first() else {
            break;
        };
        drained.push(key);
        map = rest;
        let Some((rest, (key, _))) = map.remove_last() else {
            break;
        };
        drained.push(key);
        map = rest;
    }
    assert_eq!(drained, vec![0, 9, 1, 8, 2, 7, 3, 6, 4, 5]);
    assert!(map.is_empty());
}

// =============================================================================
// Transient Tests
// =============================================================================

#[rstest]
fn test_transient_preserves_order_and_isolation() {
    let persistent: PersistentSequencedMap<i32, i32> = (0..10).map(|key| (key, key)).collect();
    let snapshot = persistent.clone();

    let mut transient = persistent.transient();
    assert_eq!(transient.insert_last(0, 100), Some(0));
    assert_eq!(transient.remove_first(), Some((1, 1)));
    transient.insert_first(-1, -1);
    let rebuilt = transient.persistent();

    assert_eq!(keys_of(&snapshot), (0..10).collect::<Vec<i32>>());
    let mut expected = vec![-1];
    expected.extend(2..10);
    expected.push(0);
    assert_eq!(keys_of(&rebuilt), expected);
}

#[rstest]
fn test_transient_from_scratch() {
    let mut transient = TransientSequencedMap::new();
    for key in 0..100 {
        transient.insert(key, key);
    }
    assert_eq!(transient.len(), 100);
    assert_eq!(transient.first(), Some((&0, &0)));
    assert_eq!(transient.last(), Some((&99, &99)));

    let persistent = transient.persistent();
    assert_eq!(keys_of(&persistent), (0..100).collect::<Vec<i32>>());
}

// =============================================================================
// Bulk Operation Tests
// =============================================================================

#[rstest]
fn test_merge_appends_new_keys_in_other_order() {
    let left: PersistentSequencedMap<i32, i32> = [(1, 1), (2, 2)].into_iter().collect();
    let right: PersistentSequencedMap<i32, i32> = [(4, 4), (2, 22), (3, 3)].into_iter().collect();
    let merged = left.merge(&right);
    assert_eq!(keys_of(&merged), vec![1, 2, 4, 3]);
    assert_eq!(merged.get(&2), Some(&22));
}

#[rstest]
fn test_retain_all_preserves_survivor_order() {
    let map: PersistentSequencedMap<i32, i32> = (0..10).map(|key| (key, key)).collect();
    let doomed: Vec<i32> = (0..10).filter(|key| key % 3 != 0).collect();
    let doomed_refs: Vec<&i32> = doomed.iter().collect();
    let kept = map.retain_all([&0, &3, &6, &9]);
    let removed = map.remove_all(doomed_refs);

    assert_eq!(keys_of(&kept), vec![0, 3, 6, 9]);
    assert_eq!(kept, removed);
}
