//! Store-backed rate backend following the call limit header.

use super::{throttling_key, BucketState, RateBackend};
use crate::clients::ApiCallLimit;
use crate::config::{ShopDomain, ThrottleSettings};
use crate::store::{Store, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Tracks each tenant's call limit bucket in a shared [`Store`].
///
/// Every response carrying `X-Shopify-Shop-Api-Call-Limit` updates the
/// tenant's [`BucketState`]; out-of-order observations never overwrite a
/// newer one. Before a request, elapsed time is leaked from the last
/// observation and the wait is derived from the estimated occupancy.
#[derive(Debug, Clone)]
pub struct SharedRateBackend {
    store: Arc<dyn Store>,
    settings: ThrottleSettings,
}

impl SharedRateBackend {
    /// Creates a backend keeping its state in `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, settings: ThrottleSettings) -> Self {
        Self { store, settings }
    }

    /// Reads the last observed bucket state of `tenant`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store fails.
    pub async fn state(&self, tenant: &ShopDomain) -> Result<BucketState, StoreError> {
        let fields = self.store.hget_all(&throttling_key(tenant)).await?;
        Ok(BucketState::from_fields(&fields))
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl RateBackend for SharedRateBackend {
    async fn wait_interval(&self, tenant: &ShopDomain) -> Result<Duration, StoreError> {
        let state = self.state(tenant).await?;
        Ok(state.wait_interval(Self::now_ms(), &self.settings))
    }

    async fn record(&self, tenant: &ShopDomain, limit: ApiCallLimit) -> Result<(), StoreError> {
        self.store
            .hset_if_newer(
                &throttling_key(tenant),
                BucketState::HEADER_TIMESTAMP,
                Self::now_ms(),
                &[
                    (BucketState::NUM_REQUESTS, limit.request_count.to_string()),
                    (BucketState::MAX_REQUESTS, limit.bucket_size.to_string()),
                ],
            )
            .await?;
        Ok(())
    }
}
