//! # Store and Driver Tests
//!
//! Covers the in-memory store through the storage driver interface:
//! - Round trips, null-removal, absent-key failures
//! - Enumeration: keys, key-by-index, length
//! - Iteration early-stop semantics
//! - Initialization and optional operations

use serde_json::{json, Value};

use foreman::{ForemanError, MemoryDriver, MemoryStore, StorageDriver};

fn driver() -> MemoryDriver {
    MemoryDriver::new(MemoryStore::new())
}

// ============================================================================
// BASIC OPERATIONS
// ============================================================================

mod item_tests {
    use super::*;

    #[tokio::test]
    async fn test_set_item_round_trips_and_returns_the_value() {
        let driver = driver();
        let stored = driver.set_item("a", json!(1)).await.unwrap();
        assert_eq!(stored, json!(1));
        assert_eq!(driver.get_item("a").await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_get_item_of_absent_key_fails_with_key_invalid() {
        let driver = driver();
        let error = driver.get_item("missing").await.unwrap_err();
        assert_eq!(
            error,
            ForemanError::KeyInvalid {
                key: "missing".into()
            }
        );
        assert_eq!(error.code(), "key-invalid");
    }

    #[tokio::test]
    async fn test_null_set_item_removes_the_entry() {
        let driver = driver();
        driver.set_item("a", json!(1)).await.unwrap();
        driver.set_item("a", Value::Null).await.unwrap();

        assert!(!driver.store().is_set("a"));
        assert_eq!(driver.get_item("a").await.unwrap_err().code(), "key-invalid");
    }

    #[tokio::test]
    async fn test_remove_item_of_absent_key_is_a_noop() {
        let driver = driver();
        driver.remove_item("missing").await.unwrap();
        assert_eq!(driver.length().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_empties_the_store() {
        let driver = driver();
        driver.set_item("a", json!(1)).await.unwrap();
        driver.set_item("b", json!(2)).await.unwrap();
        driver.clear().await.unwrap();

        assert!(driver.store().is_empty());
        assert_eq!(driver.length().await.unwrap(), 0);
    }
}

// ============================================================================
// ENUMERATION
// ============================================================================

mod enumeration_tests {
    use super::*;

    #[tokio::test]
    async fn test_keys_reports_exactly_the_stored_keys() {
        let driver = driver();
        driver.set_item("a", json!(1)).await.unwrap();
        driver.set_item("b", json!(2)).await.unwrap();

        let mut keys = driver.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(driver.length().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_key_by_index_follows_enumeration_order() {
        let driver = driver();
        driver.set_item("only", json!(1)).await.unwrap();

        assert_eq!(driver.key(0).await.unwrap(), Some("only".to_string()));
        assert_eq!(driver.key(1).await.unwrap(), None);
    }
}

// ============================================================================
// ITERATION
// ============================================================================

mod iterate_tests {
    use super::*;

    #[tokio::test]
    async fn test_iterate_stops_at_the_first_defined_value() {
        let driver = driver();
        driver.set_item("a", json!(1)).await.unwrap();
        driver.set_item("b", json!(2)).await.unwrap();
        driver.set_item("c", json!(3)).await.unwrap();

        let mut calls = 0usize;
        let mut callback = |_key: &str, _value: &Value, index: usize| {
            calls += 1;
            (index == 1).then(|| json!("stopped"))
        };
        let result = driver.iterate(&mut callback).await.unwrap();

        assert_eq!(result, Some(json!("stopped")));
        assert_eq!(calls, 2, "iteration must stop after the defined value");
    }

    #[tokio::test]
    async fn test_iterate_returns_the_callback_value() {
        let driver = driver();
        driver.set_item("only", json!({"n": 7})).await.unwrap();

        let mut callback =
            |key: &str, value: &Value, _index: usize| Some(json!({ "key": key, "value": value }));
        let result = driver.iterate(&mut callback).await.unwrap();
        assert_eq!(result, Some(json!({"key": "only", "value": {"n": 7}})));
    }

    #[tokio::test]
    async fn test_iterate_over_empty_store_never_invokes_the_callback() {
        let driver = driver();

        let mut calls = 0usize;
        let mut callback = |_key: &str, _value: &Value, _index: usize| {
            calls += 1;
            Some(json!("never"))
        };
        let result = driver.iterate(&mut callback).await.unwrap();

        assert_eq!(result, None);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_iterate_without_defined_value_walks_everything() {
        let driver = driver();
        driver.set_item("a", json!(1)).await.unwrap();
        driver.set_item("b", json!(2)).await.unwrap();

        let mut calls = 0usize;
        let mut callback = |_key: &str, _value: &Value, _index: usize| {
            calls += 1;
            None
        };
        let result = driver.iterate(&mut callback).await.unwrap();

        assert_eq!(result, None);
        assert_eq!(calls, 2);
    }
}

// ============================================================================
// INITIALIZATION AND OPTIONAL OPERATIONS
// ============================================================================

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_clears_a_non_empty_store() {
        let store = MemoryStore::new();
        store.set("stale", json!(1));

        let driver = MemoryDriver::new(store.clone());
        driver.initialize().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_on_an_empty_store_is_a_noop() {
        let driver = driver();
        driver.initialize().await.unwrap();
        assert!(driver.store().is_empty());
    }

    #[tokio::test]
    async fn test_drop_instance_is_not_implemented() {
        let driver = driver();
        let error = driver.drop_instance().await.unwrap_err();
        assert_eq!(error, ForemanError::NotImplemented);
        assert_eq!(error.code(), "not-implemented");
    }

    #[tokio::test]
    async fn test_driver_name_is_stable() {
        assert_eq!(driver().name(), "memory-key-value-store");
    }
}
