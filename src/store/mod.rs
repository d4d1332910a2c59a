//! Store module - in-memory fallback storage
//!
//! Key types:
//! - `MemoryStore`: string-keyed in-memory value store
//! - `StorageDriver`: async pluggable-backend interface
//! - `MemoryDriver`: driver adapter over a `MemoryStore`

mod driver;
mod memory;

pub use driver::{IterateCallback, MemoryDriver, StorageDriver};
pub use memory::MemoryStore;
