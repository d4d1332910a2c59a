//! In-memory key-value store
//!
//! Last-resort storage backend for hosts with no persistent mechanism.
//! String keys, arbitrary JSON values, no eviction.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::ForemanError;

static SHARED: Lazy<MemoryStore> = Lazy::new(MemoryStore::new);

/// Associative store keyed by string identifiers.
///
/// Cloning is cheap and shares the underlying entries. Storing
/// `Value::Null` removes the entry instead. Mutating the store from inside
/// a driver iteration callback is not supported.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide default instance.
    ///
    /// Prefer constructing and injecting an owned store; the shared
    /// instance exists for callers that need the singleton behavior.
    pub fn shared() -> MemoryStore {
        SHARED.clone()
    }

    /// Value stored for `key`. Absent keys are an error, never a silent
    /// null.
    pub fn get(&self, key: &str) -> Result<Value, ForemanError> {
        self.entries
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ForemanError::KeyInvalid {
                key: key.to_string(),
            })
    }

    /// Store `value` under `key`. A null value removes the entry instead.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if value.is_null() {
            self.unset(&key);
        } else {
            self.entries.insert(key, value);
        }
    }

    /// Remove the entry for `key`. Absent keys are a no-op.
    pub fn unset(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Keys currently present, in enumeration order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// True when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `key` is present.
    pub fn is_set(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
