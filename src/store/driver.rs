//! Storage driver adapter over the in-memory store
//!
//! Exposes the conventional asynchronous key-value interface expected by
//! pluggable storage abstractions, backed by a [`MemoryStore`].

use async_trait::async_trait;
use serde_json::Value;

use super::MemoryStore;
use crate::error::ForemanError;

/// Callback invoked per entry during iteration: (key, value, index).
/// Returning a value stops the walk and yields that value to the caller.
pub type IterateCallback<'a> = &'a mut (dyn FnMut(&str, &Value, usize) -> Option<Value> + Send);

/// Asynchronous key-value interface of a pluggable storage backend.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Driver identifier used during backend selection.
    fn name(&self) -> &'static str;

    /// Prepare the backend for use.
    async fn initialize(&self) -> Result<(), ForemanError>;

    /// Value stored for `key`. Absent keys are an error.
    async fn get_item(&self, key: &str) -> Result<Value, ForemanError>;

    /// Store `value` under `key`, returning the stored value.
    async fn set_item(&self, key: &str, value: Value) -> Result<Value, ForemanError>;

    /// Remove the entry for `key`.
    async fn remove_item(&self, key: &str) -> Result<(), ForemanError>;

    /// Remove every entry.
    async fn clear(&self) -> Result<(), ForemanError>;

    /// All keys, in enumeration order.
    async fn keys(&self) -> Result<Vec<String>, ForemanError>;

    /// Key at `index` in enumeration order, `None` past the end.
    async fn key(&self, index: usize) -> Result<Option<String>, ForemanError>;

    /// Number of entries.
    async fn length(&self) -> Result<usize, ForemanError>;

    /// Walk entries in enumeration order until the callback returns a
    /// value; that value becomes the result. The store must not be mutated
    /// from inside the callback.
    async fn iterate(
        &self,
        callback: IterateCallback<'_>,
    ) -> Result<Option<Value>, ForemanError>;

    /// Remove the backing database entirely. Optional operation.
    async fn drop_instance(&self) -> Result<(), ForemanError> {
        Err(ForemanError::NotImplemented)
    }
}

/// Driver storing data in a [`MemoryStore`].
pub struct MemoryDriver {
    store: MemoryStore,
}

impl MemoryDriver {
    /// Driver over the given store.
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    /// The backing store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new(MemoryStore::shared())
    }
}

#[async_trait]
impl StorageDriver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory-key-value-store"
    }

    async fn initialize(&self) -> Result<(), ForemanError> {
        if !self.store.is_empty() {
            self.store.clear();
        }
        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Value, ForemanError> {
        self.store.get(key)
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<Value, ForemanError> {
        self.store.set(key, value.clone());
        Ok(value)
    }

    async fn remove_item(&self, key: &str) -> Result<(), ForemanError> {
        self.store.unset(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), ForemanError> {
        self.store.clear();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, ForemanError> {
        Ok(self.store.keys())
    }

    async fn key(&self, index: usize) -> Result<Option<String>, ForemanError> {
        Ok(self.store.keys().into_iter().nth(index))
    }

    async fn length(&self) -> Result<usize, ForemanError> {
        Ok(self.store.len())
    }

    async fn iterate(
        &self,
        callback: IterateCallback<'_>,
    ) -> Result<Option<Value>, ForemanError> {
        for (index, key) in self.store.keys().iter().enumerate() {
            let value = self.store.get(key)?;
            if let Some(result) = callback(key, &value, index) {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }
}
