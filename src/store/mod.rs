//! Key-value store boundary for state shared between clients.
//!
//! The shared rate governor backend and cached GET requests keep their
//! state in a [`Store`]. Two implementations are provided:
//!
//! - [`MemoryStore`]: process-local, shared by every client holding the
//!   same `Arc`
//! - [`RedisStore`]: cross-process, backed by a Redis connection manager
//!
//! # Example
//!
//! ```rust
//! use shopify_client::store::{MemoryStore, Store};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStore::new();
//! store.set("key", "value", Some(Duration::from_secs(60))).await.unwrap();
//! assert_eq!(store.get("key").await.unwrap().as_deref(), Some("value"));
//! # });
//! ```

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a [`Store`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The Redis server or connection failed.
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// A stored value could not be interpreted.
    #[error("Invalid value stored at '{key}': {reason}")]
    Decode {
        /// The key holding the value.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// A key-value store with string values and hashes.
///
/// Implementations must be safe to share between tasks. `hset_if_newer`
/// must be atomic with respect to concurrent callers of the same key.
#[async_trait]
pub trait Store: Send + Sync + fmt::Debug {
    /// Returns the string stored at `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` at `key`, expiring after `ttl` when given.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Removes `key`.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Returns every field of the hash stored at `key` (empty if absent).
    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    /// Writes `fields` and `order_field = order` to the hash at `key`,
    /// unless the hash already holds a larger `order_field`.
    ///
    /// Returns `true` if the fields were written.
    async fn hset_if_newer(
        &self,
        key: &str,
        order_field: &str,
        order: i64,
        fields: &[(&str, String)],
    ) -> Result<bool, StoreError>;
}
