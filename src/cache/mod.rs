//! Cached GET requests.
//!
//! Shop-level data such as the shop's plan or currency rarely changes but is
//! read often. A [`CachedRequest`] answers from a [`Store`] when it can and
//! performs the GET otherwise, keyed per shop, path and parameters.
//!
//! # Example
//!
//! ```rust,ignore
//! use shopify_client::cache::CachedRequest;
//! use shopify_client::store::MemoryStore;
//! use std::sync::Arc;
//!
//! let get_shop = CachedRequest::new("shop", [("fields", "domain,plan_name")], Arc::new(MemoryStore::new()));
//!
//! let shop = get_shop.call(&client).await?; // GET shop.json
//! let shop = get_shop.call(&client).await?; // cached
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::clients::{RestClient, RestError};
use crate::config::ShopDomain;
use crate::store::{Store, StoreError};

/// Default lifetime of a cached response.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Errors raised by cached requests.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The GET request failed.
    #[error(transparent)]
    Rest(#[from] RestError),

    /// The data could not be serialized for storage.
    #[error("Failed to encode cached data: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A GET request whose response body is cached per shop.
#[derive(Clone)]
pub struct CachedRequest {
    path: String,
    params: Vec<(String, String)>,
    store: Arc<dyn Store>,
    ttl: Duration,
}

impl CachedRequest {
    /// Creates a cached request for `path` with query `params`.
    pub fn new<I, K, V>(path: impl Into<String>, params: I, store: Arc<dyn Store>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params: Vec<(String, String)> = params
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        params.sort();

        Self {
            path: path.into(),
            params,
            store,
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Sets how long responses stay cached, usually
    /// [`ShopifyConfig::cache_ttl`](crate::ShopifyConfig::cache_ttl).
    #[must_use]
    pub const fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the store key for `shop`.
    ///
    /// The shop, path and sorted parameters are joined with the ASCII unit
    /// separator and hashed, so parameter order does not matter.
    ///
    /// ```rust
    /// use shopify_client::cache::CachedRequest;
    /// use shopify_client::store::MemoryStore;
    /// use shopify_client::ShopDomain;
    /// use std::sync::Arc;
    ///
    /// let store = Arc::new(MemoryStore::new());
    /// let a = CachedRequest::new("shop", [("a", "1"), ("b", "2")], store.clone());
    /// let b = CachedRequest::new("shop", [("b", "2"), ("a", "1")], store);
    ///
    /// let shop = ShopDomain::new("my-store").unwrap();
    /// assert_eq!(a.key(&shop), b.key(&shop));
    /// assert!(a.key(&shop).starts_with("shopify-client:cached_request:"));
    /// ```
    #[must_use]
    pub fn key(&self, shop: &ShopDomain) -> String {
        const SEPARATOR: &str = "\x1f";

        let params = self
            .params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        let material = [shop.as_ref(), self.path.as_str(), params.as_str()].join(SEPARATOR);

        format!(
            "shopify-client:cached_request:{:x}",
            Sha256::digest(material.as_bytes())
        )
    }

    /// Returns the cached body, or performs the GET and caches its body.
    ///
    /// A cached value that no longer decodes is treated as a miss.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Store`] if the store fails and
    /// [`CacheError::Rest`] if the request fails.
    pub async fn call(&self, client: &RestClient) -> Result<Value, CacheError> {
        let shop = client.http_client().shop();
        let key = self.key(shop);

        if let Some(cached) = self.store.get(&key).await? {
            match serde_json::from_str(&cached) {
                Ok(data) => return Ok(data),
                Err(error) => {
                    tracing::warn!(key = %key, %error, "Discarding undecodable cache entry");
                }
            }
        }

        let query = self.params.iter().cloned().collect();
        let response = client.get(&self.path, Some(query)).await?;
        self.store
            .set(&key, &serde_json::to_string(&response.body)?, Some(self.ttl))
            .await?;

        Ok(response.body)
    }

    /// Overwrites the cached data for `shop`, e.g. from a webhook payload.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if encoding or the store fails.
    pub async fn set(&self, shop: &ShopDomain, data: &Value) -> Result<(), CacheError> {
        self.store
            .set(&self.key(shop), &serde_json::to_string(data)?, Some(self.ttl))
            .await?;
        Ok(())
    }

    /// Removes the cached data for `shop`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Store`] if the store fails.
    pub async fn clear(&self, shop: &ShopDomain) -> Result<(), CacheError> {
        self.store.delete(&self.key(shop)).await?;
        Ok(())
    }
}

impl fmt::Debug for CachedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedRequest")
            .field("path", &self.path)
            .field("params", &self.params)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn shop(name: &str) -> ShopDomain {
        ShopDomain::new(name).unwrap()
    }

    #[test]
    fn test_key_depends_on_shop_path_and_params() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let request = CachedRequest::new("shop", [("fields", "domain")], store.clone());

        assert_ne!(request.key(&shop("a")), request.key(&shop("b")));

        let other_path = CachedRequest::new("locations", [("fields", "domain")], store.clone());
        assert_ne!(request.key(&shop("a")), other_path.key(&shop("a")));

        let other_params = CachedRequest::new("shop", [("fields", "plan_name")], store);
        assert_ne!(request.key(&shop("a")), other_params.key(&shop("a")));

        // 64 hex characters of SHA-256
        let key = request.key(&shop("a"));
        let digest = key.trim_start_matches("shopify-client:cached_request:");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_set_and_clear() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let request = CachedRequest::new("shop", Vec::<(String, String)>::new(), store.clone());
        let tenant = shop("a");

        request.set(&tenant, &json!({"shop": {"plan_name": "plus"}})).await.unwrap();
        let raw = store.get(&request.key(&tenant)).await.unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&raw).unwrap(),
            json!({"shop": {"plan_name": "plus"}})
        );

        request.clear(&tenant).await.unwrap();
        assert!(store.get(&request.key(&tenant)).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let request = CachedRequest::new("shop", Vec::<(String, String)>::new(), store.clone())
            .ttl(Duration::from_secs(60));
        let tenant = shop("a");

        request.set(&tenant, &json!({"shop": {}})).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(store.get(&request.key(&tenant)).await.unwrap().is_none());
    }
}
