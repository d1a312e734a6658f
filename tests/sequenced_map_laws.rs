//! Property-based tests for the sequenced (insertion-ordered) map.
//!
//! The reference model is a plain `Vec` of key-value pairs with the same
//! move semantics, so any divergence in observable order or membership
//! fails the property.

use persimmon::PersistentSequencedMap;
use proptest::prelude::*;

// =============================================================================
// Operation Model
// =============================================================================

#[derive(Clone, Debug)]
enum Operation {
    Insert(u8, i32),
    InsertFirst(u8, i32),
    InsertLast(u8, i32),
    Remove(u8),
    RemoveFirst,
    RemoveLast,
}

fn arbitrary_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (any::<u8>(), any::<i32>()).prop_map(|(key, value)| Operation::Insert(key % 32, value)),
        (any::<u8>(), any::<i32>())
            .prop_map(|(key, value)| Operation::InsertFirst(key % 32, value)),
        (any::<u8>(), any::<i32>()).prop_map(|(key, value)| Operation::InsertLast(key % 32, value)),
        any::<u8>().prop_map(|key| Operation::Remove(key % 32)),
        Just(Operation::RemoveFirst),
        Just(Operation::RemoveLast),
    ]
}

/// Applies one operation to the `Vec` model.
fn apply_to_model(model: &mut Vec<(u8, i32)>, operation: &Operation) {
    match operation {
        Operation::Insert(key, value) => {
            if let Some(entry) = model.iter_mut().find(|(existing, _)| existing == key) {
                entry.1 = *value;
            } else {
                model.push((*key, *value));
            }
        }
        Operation::InsertFirst(key, value) => {
            model.retain(|(existing, _)| existing != key);
            model.insert(0, (*key, *value));
        }
        Operation::InsertLast(key, value) => {
            model.retain(|(existing, _)| existing != key);
            model.push((*key, *value));
        }
        Operation::Remove(key) => {
            model.retain(|(existing, _)| existing != key);
        }
        Operation::RemoveFirst => {
            if !model.is_empty() {
                model.remove(0);
            }
        }
        Operation::RemoveLast => {
            model.pop();
        }
    }
}

/// Applies one operation to the map under test.
fn apply_to_map(
    map: PersistentSequencedMap<u8, i32>,
    operation: &Operation,
) -> PersistentSequencedMap<u8, i32> {
    match operation {
        Operation::Insert(key, value) => map.insert(*key, *value),
        Operation::InsertFirst(key, value) => map.insert_first(*key, *value),
        Operation::InsertLast(key, value) => map.insert_last(*key, *value),
        Operation::Remove(key) => map.remove(key),
        Operation::RemoveFirst => map.remove_first().map_or(map, |(rest, _)| rest),
        Operation::RemoveLast => map.remove_last().map_or(map, |(rest, _)| rest),
    }
}

// =============================================================================
// Order Preservation Law
// =============================================================================

proptest! {
    #[test]
    fn prop_order_matches_list_model(
        operations in prop::collection::vec(arbitrary_operation(), 0..120)
    ) {
        let mut map = PersistentSequencedMap::new();
        let mut model: Vec<(u8, i32)> = Vec::new();

        for operation in &operations {
            map = apply_to_map(map, operation);
            apply_to_model(&mut model, operation);

            let observed: Vec<(u8, i32)> =
                map.iter().map(|(key, value)| (*key, *value)).collect();
            prop_assert_eq!(&observed, &model);

            let reversed: Vec<(u8, i32)> =
                map.iter_reversed().map(|(key, value)| (*key, *value)).collect();
            let mut expected_reversed = model.clone();
            expected_reversed.reverse();
            prop_assert_eq!(&reversed, &expected_reversed);

            prop_assert_eq!(map.len(), model.len());
        }
    }
}

// =============================================================================
// Membership Law
// =============================================================================

proptest! {
    #[test]
    fn prop_membership_matches_model(
        operations in prop::collection::vec(arbitrary_operation(), 0..120)
    ) {
        let mut map = PersistentSequencedMap::new();
        let mut model: Vec<(u8, i32)> = Vec::new();
        for operation in &operations {
            map = apply_to_map(map, operation);
            apply_to_model(&mut model, operation);
        }

        for key in 0..32_u8 {
            let expected = model
                .iter()
                .find(|(existing, _)| *existing == key)
                .map(|(_, value)| value);
            prop_assert_eq!(map.get(&key), expected);
        }
    }
}

// =============================================================================
// Round-Trip Law
// =============================================================================

proptest! {
    #[test]
    fn prop_transient_round_trip_preserves_order(
        operations in prop::collection::vec(arbitrary_operation(), 0..80)
    ) {
        let mut map = PersistentSequencedMap::new();
        for operation in &operations {
            map = apply_to_map(map, operation);
        }

        let before: Vec<(u8, i32)> = map.iter().map(|(key, value)| (*key, *value)).collect();
        let round_tripped = map.clone().transient().persistent();
        let after: Vec<(u8, i32)> =
            round_tripped.iter().map(|(key, value)| (*key, *value)).collect();

        prop_assert_eq!(before, after);
        prop_assert_eq!(map, round_tripped);
    }
}
