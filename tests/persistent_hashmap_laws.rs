//! Property-based tests for `PersistentHashMap`.
//!
//! Verifies the structural and behavioral laws of the hash map against
//! randomly generated operation sequences.

use persimmon::PersistentHashMap;
use proptest::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Strategies
// =============================================================================

fn arbitrary_key() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn arbitrary_entries() -> impl Strategy<Value = Vec<(String, i32)>> {
    prop::collection::vec((arbitrary_key(), any::<i32>()), 0..60)
}

// =============================================================================
// Get-Insert Law: map.insert(k, v).get(&k) == Some(&v)
// =============================================================================

proptest! {
    #[test]
    fn prop_get_insert_law(
        entries in arbitrary_entries(),
        key in arbitrary_key(),
        value in any::<i32>()
    ) {
        let map: PersistentHashMap<String, i32> = entries.into_iter().collect();
        let inserted = map.insert(key.clone(), value);

        prop_assert_eq!(inserted.get(&key), Some(&value));
    }
}

// =============================================================================
// Remove-Get Law: map.remove(&k).get(&k) == None
// =============================================================================

proptest! {
    #[test]
    fn prop_remove_get_law(entries in arbitrary_entries(), key in arbitrary_key()) {
        let map: PersistentHashMap<String, i32> = entries.into_iter().collect();
        let removed = map.remove(&key);

        prop_assert_eq!(removed.get(&key), None);
    }
}

// =============================================================================
// Model Law: the map agrees with std::collections::HashMap
// =============================================================================

proptest! {
    #[test]
    fn prop_agrees_with_std_hashmap(entries in arbitrary_entries()) {
        let map: PersistentHashMap<String, i32> = entries.clone().into_iter().collect();
        let model: HashMap<String, i32> = entries.into_iter().collect();

        prop_assert_eq!(map.len(), model.len());
        for (key, value) in &model {
            prop_assert_eq!(map.get(key), Some(value));
        }
        for (key, value) in map.iter() {
            prop_assert_eq!(model.get(key), Some(value));
        }
    }
}

// =============================================================================
// Persistence Law: older versions never observe newer writes
// =============================================================================

proptest! {
    #[test]
    fn prop_versions_are_independent(entries in arbitrary_entries()) {
        let mut versions: Vec<PersistentHashMap<String, i32>> = vec![PersistentHashMap::new()];
        for (key, value) in &entries {
            let next = versions.last().expect("non-empty").insert(key.clone(), *value);
            versions.push(next);
        }

        let mut model: HashMap<String, i32> = HashMap::new();
        for (version, (key, value)) in versions[1..].iter().zip(entries.iter()) {
            model.insert(key.clone(), *value);
            prop_assert_eq!(version.len(), model.len());
            prop_assert_eq!(version.get(key), Some(value));
        }
    }
}

// =============================================================================
// Round-Trip Law: persistent -> transient -> persistent is identity
// =============================================================================

proptest! {
    #[test]
    fn prop_transient_round_trip_is_identity(entries in arbitrary_entries()) {
        let map: PersistentHashMap<String, i32> = entries.into_iter().collect();
        let round_tripped = map.clone().transient().persistent();

        prop_assert_eq!(map, round_tripped);
    }
}

// =============================================================================
// Equality Law: insertion order never matters
// =============================================================================

proptest! {
    #[test]
    fn prop_equality_is_order_independent(entries in arbitrary_entries()) {
        // Deduplicate through the model so both insertion orders end at
        // the same final content.
        let model: HashMap<String, i32> = entries.into_iter().collect();
        let ordered: Vec<(String, i32)> = model.into_iter().collect();

        let forward: PersistentHashMap<String, i32> = ordered.clone().into_iter().collect();
        let backward: PersistentHashMap<String, i32> = ordered.into_iter().rev().collect();

        prop_assert_eq!(forward, backward);
    }
}
