//! Process-local [`Store`] implementation.

use super::{Store, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
enum Value {
    String(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

/// An in-memory [`Store`].
///
/// Expiry follows tokio's clock, so paused-time tests can advance past a
/// TTL. State is shared by cloning the `Arc` the store is wrapped in.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str) {
        let now = Instant::now();
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries();
        Self::purge_expired(&mut entries, key);
        match entries.get(key) {
            None => Ok(None),
            Some(Entry {
                value: Value::String(value),
                ..
            }) => Ok(Some(value.clone())),
            Some(_) => Err(StoreError::Decode {
                key: key.to_string(),
                reason: "expected a string, found a hash".to_string(),
            }),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl
            .filter(|ttl| !ttl.is_zero())
            .and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries().insert(
            key.to_string(),
            Entry {
                value: Value::String(value.to_string()),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut entries = self.entries();
        Self::purge_expired(&mut entries, key);
        match entries.get(key) {
            None => Ok(HashMap::new()),
            Some(Entry {
                value: Value::Hash(hash),
                ..
            }) => Ok(hash.clone()),
            Some(_) => Err(StoreError::Decode {
                key: key.to_string(),
                reason: "expected a hash, found a string".to_string(),
            }),
        }
    }

    async fn hset_if_newer(
        &self,
        key: &str,
        order_field: &str,
        order: i64,
        fields: &[(&str, String)],
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries();
        Self::purge_expired(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });

        let Value::Hash(hash) = &mut entry.value else {
            return Err(StoreError::Decode {
                key: key.to_string(),
                reason: "expected a hash, found a string".to_string(),
            });
        };

        let current = hash
            .get(order_field)
            .and_then(|value| value.parse::<i64>().ok());
        if current.is_some_and(|current| current > order) {
            return Ok(false);
        }

        hash.insert(order_field.to_string(), order.to_string());
        for (field, value) in fields {
            hash.insert((*field).to_string(), value.clone());
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);

        store.set("key", "value", None).await.unwrap();
        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("value"));

        store.delete("key").await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_values_expire_after_ttl() {
        let store = MemoryStore::new();
        store
            .set("key", "value", Some(Duration::from_secs(10)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.get("key").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_never_expires() {
        let store = MemoryStore::new();
        store.set("key", "value", Some(Duration::ZERO)).await.unwrap();
        assert!(store.get("key").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_never_expires() {
        let store = MemoryStore::new();
        store.set("key", "value", Some(Duration::MAX)).await.unwrap();
        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn test_hset_if_newer_rejects_older_observations() {
        let store = MemoryStore::new();

        assert!(store
            .hset_if_newer("bucket", "ts", 100, &[("num", "5".to_string())])
            .await
            .unwrap());
        assert!(!store
            .hset_if_newer("bucket", "ts", 99, &[("num", "1".to_string())])
            .await
            .unwrap());
        assert!(store
            .hset_if_newer("bucket", "ts", 100, &[("num", "6".to_string())])
            .await
            .unwrap());

        let hash = store.hget_all("bucket").await.unwrap();
        assert_eq!(hash["ts"], "100");
        assert_eq!(hash["num"], "6");
    }

    #[tokio::test]
    async fn test_type_mismatch_is_a_decode_error() {
        let store = MemoryStore::new();
        store.set("key", "value", None).await.unwrap();

        assert!(matches!(
            store.hget_all("key").await,
            Err(StoreError::Decode { .. })
        ));
        assert!(matches!(
            store.hset_if_newer("key", "ts", 1, &[]).await,
            Err(StoreError::Decode { .. })
        ));
    }
}
