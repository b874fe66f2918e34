//! Named response caches backed by persistent storage.
//!
//! This module provides the cache store primitive the interceptor consumes:
//! - Caches are namespaced by name and created on first open
//! - Entries are keyed by request identity (URL without fragment, plus `Vary`)
//! - Bulk population is all-or-nothing

mod key;
mod layer;
mod storage;

pub use key::request_key;
pub use layer::Cache;
pub use storage::{CacheStorage, CachedResponse, SqliteStorage, StoredEntry};
