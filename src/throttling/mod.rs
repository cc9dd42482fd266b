//! Request rate governor.
//!
//! Every request passes through a [`RateGovernor`] before it is sent, and
//! every response's `X-Shopify-Shop-Api-Call-Limit` header is fed back to
//! it. The governor delegates to a [`RateBackend`]:
//!
//! - [`LocalRateBackend`]: a fixed minimum spacing per tenant within this
//!   process, the default
//! - [`SharedRateBackend`]: a leaky bucket estimate kept in a shared
//!   [`Store`](crate::store::Store), following the server's own counters
//!
//! State is partitioned by tenant (shop domain); waiting for one shop never
//! delays another.
//!
//! # Example
//!
//! ```rust
//! use shopify_client::store::MemoryStore;
//! use shopify_client::throttling::RateGovernor;
//! use shopify_client::ThrottleSettings;
//! use std::sync::Arc;
//!
//! let local = RateGovernor::local(&ThrottleSettings::default());
//! let shared = RateGovernor::shared(Arc::new(MemoryStore::new()), &ThrottleSettings::default());
//! ```

mod bucket;
mod local;
mod shared;

pub use bucket::BucketState;
pub use local::LocalRateBackend;
pub use shared::SharedRateBackend;

use crate::clients::ApiCallLimit;
use crate::config::{ShopDomain, ThrottleSettings};
use crate::store::{Store, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Returns the store key of a tenant's throttling state.
#[must_use]
pub fn throttling_key(tenant: &ShopDomain) -> String {
    format!("shopify-client:throttling:{tenant}")
}

/// Where a [`RateGovernor`] keeps its state.
#[async_trait]
pub trait RateBackend: Send + Sync + fmt::Debug {
    /// Returns how long `tenant` must wait before its next request.
    async fn wait_interval(&self, tenant: &ShopDomain) -> Result<Duration, StoreError>;

    /// Records the call limit reported by a response for `tenant`.
    async fn record(&self, tenant: &ShopDomain, limit: ApiCallLimit) -> Result<(), StoreError>;
}

/// Per-tenant reservation times of the local backend.
#[derive(Debug, Default)]
struct LocalSlots(Mutex<HashMap<ShopDomain, tokio::time::Instant>>);

impl LocalSlots {
    fn lock(&self) -> MutexGuard<'_, HashMap<ShopDomain, tokio::time::Instant>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Delays requests to stay under Shopify's call limits.
///
/// Cheap to clone; clones share state. A failing backend never blocks
/// requests: errors are logged and the governor falls back to local
/// spacing by `min_interval` until the backend recovers.
#[derive(Clone, Debug)]
pub struct RateGovernor {
    backend: Arc<dyn RateBackend>,
    fallback: Arc<LocalRateBackend>,
}

impl RateGovernor {
    /// Creates a governor over any backend, falling back to the default
    /// minimum spacing when it fails.
    #[must_use]
    pub fn new(backend: Arc<dyn RateBackend>) -> Self {
        Self::with_fallback(backend, &ThrottleSettings::default())
    }

    /// Creates a governor with a process-local backend.
    #[must_use]
    pub fn local(settings: &ThrottleSettings) -> Self {
        Self::with_fallback(
            Arc::new(LocalRateBackend::new(settings.min_interval)),
            settings,
        )
    }

    /// Creates a governor keeping leaky bucket state in `store`.
    #[must_use]
    pub fn shared(store: Arc<dyn Store>, settings: &ThrottleSettings) -> Self {
        Self::with_fallback(Arc::new(SharedRateBackend::new(store, *settings)), settings)
    }

    fn with_fallback(backend: Arc<dyn RateBackend>, settings: &ThrottleSettings) -> Self {
        Self {
            backend,
            fallback: Arc::new(LocalRateBackend::new(settings.min_interval)),
        }
    }

    /// Returns the wait `tenant` needs now.
    ///
    /// When the backend fails, the wait comes from process-local spacing
    /// instead.
    pub async fn wait_interval(&self, tenant: &ShopDomain) -> Duration {
        match self.backend.wait_interval(tenant).await {
            Ok(interval) => interval,
            Err(error) => {
                tracing::warn!(
                    shop = %tenant,
                    %error,
                    "Rate governor store unavailable, falling back to local spacing"
                );
                self.fallback
                    .wait_interval(tenant)
                    .await
                    .unwrap_or(Duration::ZERO)
            }
        }
    }

    /// Sleeps until `tenant` may send its next request.
    pub async fn wait(&self, tenant: &ShopDomain) {
        let interval = self.wait_interval(tenant).await;
        if !interval.is_zero() {
            tracing::debug!(shop = %tenant, wait_ms = interval.as_millis(), "Throttling request");
            tokio::time::sleep(interval).await;
        }
    }

    /// Feeds a response's call limit back to the backend.
    pub async fn record(&self, tenant: &ShopDomain, limit: Option<ApiCallLimit>) {
        let Some(limit) = limit else {
            return;
        };
        if let Err(error) = self.backend.record(tenant, limit).await {
            tracing::warn!(shop = %tenant, %error, "Failed to record API call limit");
        }
    }
}

// Verify RateGovernor is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RateGovernor>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[derive(Debug)]
    struct FailingBackend;

    #[async_trait]
    impl RateBackend for FailingBackend {
        async fn wait_interval(&self, tenant: &ShopDomain) -> Result<Duration, StoreError> {
            Err(StoreError::Decode {
                key: throttling_key(tenant),
                reason: "unavailable".to_string(),
            })
        }

        async fn record(&self, tenant: &ShopDomain, _limit: ApiCallLimit) -> Result<(), StoreError> {
            Err(StoreError::Decode {
                key: throttling_key(tenant),
                reason: "unavailable".to_string(),
            })
        }
    }

    fn shop() -> ShopDomain {
        ShopDomain::new("governed").unwrap()
    }

    #[test]
    fn test_throttling_key_format() {
        assert_eq!(
            throttling_key(&shop()),
            "shopify-client:throttling:governed.myshopify.com"
        );
    }

    #[derive(Debug)]
    struct DownStore;

    fn down(key: &str) -> StoreError {
        StoreError::Decode {
            key: key.to_string(),
            reason: "connection refused".to_string(),
        }
    }

    #[async_trait]
    impl Store for DownStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Err(down(key))
        }

        async fn set(
            &self,
            key: &str,
            _value: &str,
            _ttl: Option<Duration>,
        ) -> Result<(), StoreError> {
            Err(down(key))
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            Err(down(key))
        }

        async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
            Err(down(key))
        }

        async fn hset_if_newer(
            &self,
            key: &str,
            _order_field: &str,
            _order: i64,
            _fields: &[(&str, String)],
        ) -> Result<bool, StoreError> {
            Err(down(key))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_backend_falls_back_to_default_spacing() {
        let governor = RateGovernor::new(Arc::new(FailingBackend));
        assert_eq!(governor.wait_interval(&shop()).await, Duration::ZERO);
        assert_eq!(
            governor.wait_interval(&shop()).await,
            Duration::from_millis(500)
        );
        governor
            .record(
                &shop(),
                Some(ApiCallLimit {
                    request_count: 1,
                    bucket_size: 40,
                }),
            )
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_store_keeps_min_interval_spacing() {
        let settings = ThrottleSettings::default().min_interval(Duration::from_millis(250));
        let governor = RateGovernor::shared(Arc::new(DownStore), &settings);

        let waits = [
            governor.wait_interval(&shop()).await,
            governor.wait_interval(&shop()).await,
            governor.wait_interval(&shop()).await,
        ];

        assert_eq!(
            waits,
            [
                Duration::ZERO,
                Duration::from_millis(250),
                Duration::from_millis(500)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_for_local_spacing() {
        let governor = RateGovernor::local(&ThrottleSettings::default());
        let start = tokio::time::Instant::now();

        governor.wait(&shop()).await;
        governor.wait(&shop()).await;

        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_shared_governor_records_limits() {
        let store = Arc::new(MemoryStore::new());
        let governor = RateGovernor::shared(store.clone(), &ThrottleSettings::default());

        governor.record(&shop(), None).await;
        assert!(store.hget_all(&throttling_key(&shop())).await.unwrap().is_empty());

        governor
            .record(
                &shop(),
                Some(ApiCallLimit {
                    request_count: 38,
                    bucket_size: 40,
                }),
            )
            .await;
        assert!(governor.wait_interval(&shop()).await > Duration::ZERO);
    }
}
