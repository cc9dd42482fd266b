//! Leaky bucket approximation of the REST call limit.

use crate::config::ThrottleSettings;
use std::collections::HashMap;
use std::time::Duration;

/// The last observed call limit state of a tenant.
///
/// Shopify reports `<used>/<max>` after every REST call. Between two
/// observations the bucket drains one request credit per leak interval, so
/// the current occupancy can be estimated without asking the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BucketState {
    /// Requests in the bucket when the header was observed.
    pub num_requests: u32,
    /// Bucket capacity reported by the header.
    pub max_requests: u32,
    /// When the header was observed, in milliseconds since the UNIX epoch.
    pub header_timestamp: i64,
}

impl BucketState {
    pub(crate) const NUM_REQUESTS: &'static str = "num_requests";
    pub(crate) const MAX_REQUESTS: &'static str = "max_requests";
    pub(crate) const HEADER_TIMESTAMP: &'static str = "header_timestamp";

    /// Estimates the occupancy at `now_ms` after leaking elapsed time.
    ///
    /// Never negative, and never larger than the observed count.
    ///
    /// ```rust
    /// use shopify_client::throttling::BucketState;
    /// use std::time::Duration;
    ///
    /// let state = BucketState { num_requests: 10, max_requests: 40, header_timestamp: 0 };
    /// let leak_rate = Duration::from_millis(500);
    /// assert_eq!(state.occupancy(0, leak_rate), 10);
    /// assert_eq!(state.occupancy(1_999, leak_rate), 7);
    /// assert_eq!(state.occupancy(60_000, leak_rate), 0);
    /// ```
    #[must_use]
    pub fn occupancy(&self, now_ms: i64, leak_rate: Duration) -> u32 {
        let leak_ms = i64::try_from(leak_rate.as_millis()).unwrap_or(i64::MAX).max(1);
        let elapsed = now_ms.saturating_sub(self.header_timestamp).max(0);
        let leaked = u32::try_from(elapsed / leak_ms).unwrap_or(u32::MAX);
        self.num_requests.saturating_sub(leaked)
    }

    /// Computes how long to wait before the next request at `now_ms`.
    ///
    /// Zero while the estimated occupancy is at or below
    /// `max_requests * unthrottled_ratio`; above it, one leak interval per
    /// request over the threshold.
    #[must_use]
    pub fn wait_interval(&self, now_ms: i64, settings: &ThrottleSettings) -> Duration {
        let occupancy = f64::from(self.occupancy(now_ms, settings.leak_rate));
        let threshold = f64::from(self.max_requests) * settings.unthrottled_ratio;

        if occupancy > threshold {
            settings.leak_rate.mul_f64(occupancy - threshold)
        } else {
            Duration::ZERO
        }
    }

    /// Reads a state from stored hash fields; missing fields count as zero.
    #[must_use]
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let field = |name: &str| fields.get(name).and_then(|value| value.parse().ok());

        Self {
            num_requests: field(Self::NUM_REQUESTS).unwrap_or_default(),
            max_requests: field(Self::MAX_REQUESTS).unwrap_or_default(),
            header_timestamp: fields
                .get(Self::HEADER_TIMESTAMP)
                .and_then(|value| value.parse().ok())
                .unwrap_or_default(),
        }
    }
}
