//! Process-local rate backend.

use super::{LocalSlots, RateBackend};
use crate::clients::ApiCallLimit;
use crate::config::ShopDomain;
use crate::store::StoreError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Keeps a minimum spacing between consecutive requests of each tenant.
///
/// Each call to [`wait_interval`](RateBackend::wait_interval) reserves the
/// next free slot, so concurrent callers are spread out rather than
/// released together. Call limit headers are ignored.
#[derive(Debug)]
pub struct LocalRateBackend {
    min_interval: Duration,
    slots: LocalSlots,
}

impl LocalRateBackend {
    /// Creates a backend spacing requests by `min_interval`.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            slots: LocalSlots::default(),
        }
    }
}

#[async_trait]
impl RateBackend for LocalRateBackend {
    async fn wait_interval(&self, tenant: &ShopDomain) -> Result<Duration, StoreError> {
        let now = Instant::now();
        let mut slots = self.slots.lock();

        let slot = slots
            .get(tenant)
            .map_or(now, |last| (*last + self.min_interval).max(now));
        slots.insert(tenant.clone(), slot);

        Ok(slot - now)
    }

    async fn record(&self, _tenant: &ShopDomain, _limit: ApiCallLimit) -> Result<(), StoreError> {
        Ok(())
    }
}
