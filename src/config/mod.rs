//! Configuration types for the Shopify client.
//!
//! # Overview
//!
//! - [`ShopifyConfig`]: all client settings, built once and shared
//! - [`ShopifyConfigBuilder`]: fluent, validating builder for [`ShopifyConfig`]
//! - [`RetrySettings`], [`ThrottleSettings`], [`BulkSettings`]: pipeline tunables
//! - [`ShopDomain`], [`AccessToken`], [`HostUrl`]: validated newtypes
//! - [`ApiVersion`]: the Shopify API version to use
//!
//! # Example
//!
//! ```rust
//! use shopify_client::{ApiVersion, RetrySettings, ShopifyConfig};
//!
//! let config = ShopifyConfig::builder()
//!     .api_version(ApiVersion::latest())
//!     .retry(RetrySettings::default().tries(5))
//!     .user_agent_prefix("MyApp/1.0")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.retry().tries, 5);
//! ```

mod newtypes;
mod version;

pub use newtypes::{AccessToken, HostUrl, ShopDomain};
pub use version::ApiVersion;

use crate::error::ConfigError;
use std::time::Duration;

/// Retry policy for transient failures (429, 5xx, transport errors).
///
/// The delay before attempt `n + 1` is `base_interval * backoff_factor^(n - 1)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetrySettings {
    /// Total number of attempts, including the first one.
    pub tries: u32,
    /// Delay before the first retry.
    pub base_interval: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: f64,
}

impl RetrySettings {
    /// Sets the total number of attempts.
    #[must_use]
    pub const fn tries(mut self, tries: u32) -> Self {
        self.tries = tries;
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub const fn base_interval(mut self, interval: Duration) -> Self {
        self.base_interval = interval;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub const fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Returns the backoff delay after `attempt` failed attempts (1-based).
    ///
    /// ```rust
    /// use shopify_client::RetrySettings;
    /// use std::time::Duration;
    ///
    /// let retry = RetrySettings::default();
    /// assert_eq!(retry.backoff(1), Duration::from_millis(500));
    /// assert_eq!(retry.backoff(2), Duration::from_millis(1000));
    /// assert_eq!(retry.backoff(3), Duration::from_millis(2000));
    /// ```
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        self.base_interval
            .mul_f64(self.backoff_factor.powi(exponent).min(f64::from(u32::MAX)))
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            tries: 3,
            base_interval: Duration::from_millis(500),
            backoff_factor: 2.0,
        }
    }
}

/// Rate governor tunables.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThrottleSettings {
    /// Minimum spacing between requests for the process-local backend.
    pub min_interval: Duration,
    /// Time for the leaky bucket to drain one request credit.
    pub leak_rate: Duration,
    /// Fraction of the bucket that may be used before the governor waits.
    pub unthrottled_ratio: f64,
}

impl ThrottleSettings {
    /// Sets the minimum spacing used by the process-local backend and by
    /// the fallback of a failing shared backend.
    #[must_use]
    pub const fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Sets the leak rate of the shared backend's bucket.
    #[must_use]
    pub const fn leak_rate(mut self, rate: Duration) -> Self {
        self.leak_rate = rate;
        self
    }

    /// Sets the bucket fill ratio below which requests are not delayed.
    #[must_use]
    pub const fn unthrottled_ratio(mut self, ratio: f64) -> Self {
        self.unthrottled_ratio = ratio;
        self
    }
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(500),
            leak_rate: Duration::from_millis(500),
            unthrottled_ratio: 0.5,
        }
    }
}

/// Bulk operation polling tunables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BulkSettings {
    /// Delay between two status polls.
    pub poll_delay: Duration,
    /// Upper bound for bounded waits such as cancellation.
    pub poll_timeout: Duration,
}

impl BulkSettings {
    /// Sets the delay between two status polls.
    #[must_use]
    pub const fn poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    /// Sets the bound for cancellation waits.
    #[must_use]
    pub const fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }
}

impl Default for BulkSettings {
    fn default() -> Self {
        Self {
            poll_delay: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(60),
        }
    }
}

/// Configuration for the Shopify client.
///
/// There is no global configuration: build one `ShopifyConfig` and hand it
/// to every client that should share it.
///
/// # Thread Safety
///
/// `ShopifyConfig` is `Clone`, `Send`, and `Sync`.
#[derive(Clone, Debug)]
pub struct ShopifyConfig {
    api_version: ApiVersion,
    api_host: Option<HostUrl>,
    user_agent_prefix: Option<String>,
    webhook_uri: Option<HostUrl>,
    cache_ttl: Duration,
    retry: RetrySettings,
    throttle: ThrottleSettings,
    bulk: BulkSettings,
}

impl ShopifyConfig {
    /// Creates a new builder for constructing a `ShopifyConfig`.
    #[must_use]
    pub fn builder() -> ShopifyConfigBuilder {
        ShopifyConfigBuilder::new()
    }

    /// Returns the API version.
    #[must_use]
    pub const fn api_version(&self) -> &ApiVersion {
        &self.api_version
    }

    /// Returns the API origin override, if configured.
    ///
    /// When set, requests go to this origin instead of `https://<shop>`.
    #[must_use]
    pub const fn api_host(&self) -> Option<&HostUrl> {
        self.api_host.as_ref()
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns the webhook callback address, if configured.
    #[must_use]
    pub const fn webhook_uri(&self) -> Option<&HostUrl> {
        self.webhook_uri.as_ref()
    }

    /// Returns how long cached GET responses are kept.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry(&self) -> &RetrySettings {
        &self.retry
    }

    /// Returns the rate governor tunables.
    #[must_use]
    pub const fn throttle(&self) -> &ThrottleSettings {
        &self.throttle
    }

    /// Returns the bulk operation polling tunables.
    #[must_use]
    pub const fn bulk(&self) -> &BulkSettings {
        &self.bulk
    }
}

impl Default for ShopifyConfig {
    fn default() -> Self {
        Self {
            api_version: ApiVersion::latest(),
            api_host: None,
            user_agent_prefix: None,
            webhook_uri: None,
            cache_ttl: Duration::from_secs(3600),
            retry: RetrySettings::default(),
            throttle: ThrottleSettings::default(),
            bulk: BulkSettings::default(),
        }
    }
}

// Verify ShopifyConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ShopifyConfig>();
};

/// Builder for constructing [`ShopifyConfig`] instances.
///
/// Every field has a default; `build()` only validates the tunables.
///
/// # Defaults
///
/// - `api_version`: Latest stable version
/// - `api_host`, `webhook_uri`, `user_agent_prefix`: `None`
/// - `cache_ttl`: one hour
/// - `retry`: 3 tries, 500ms base interval, factor 2
/// - `throttle`: 500ms spacing, 500ms leak rate, 0.5 ratio
/// - `bulk`: 1s poll delay, 60s poll timeout
///
/// # Example
///
/// ```rust
/// use shopify_client::{HostUrl, ShopifyConfig, ThrottleSettings};
/// use std::time::Duration;
///
/// let config = ShopifyConfig::builder()
///     .api_host(HostUrl::new("http://localhost:8080").unwrap())
///     .throttle(ThrottleSettings::default().min_interval(Duration::ZERO))
///     .cache_ttl(Duration::from_secs(60))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.api_host().unwrap().origin(), "http://localhost:8080");
/// ```
#[derive(Debug, Default)]
pub struct ShopifyConfigBuilder {
    api_version: Option<ApiVersion>,
    api_host: Option<HostUrl>,
    user_agent_prefix: Option<String>,
    webhook_uri: Option<HostUrl>,
    cache_ttl: Option<Duration>,
    retry: Option<RetrySettings>,
    throttle: Option<ThrottleSettings>,
    bulk: Option<BulkSettings>,
}

impl ShopifyConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API version.
    #[must_use]
    pub const fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = Some(version);
        self
    }

    /// Overrides the scheme and host requests are sent to.
    #[must_use]
    pub fn api_host(mut self, host: HostUrl) -> Self {
        self.api_host = Some(host);
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets the webhook callback address.
    #[must_use]
    pub fn webhook_uri(mut self, uri: HostUrl) -> Self {
        self.webhook_uri = Some(uri);
        self
    }

    /// Sets how long cached GET responses are kept.
    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn retry(mut self, retry: RetrySettings) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Sets the rate governor tunables.
    #[must_use]
    pub const fn throttle(mut self, throttle: ThrottleSettings) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// Sets the bulk operation polling tunables.
    #[must_use]
    pub const fn bulk(mut self, bulk: BulkSettings) -> Self {
        self.bulk = Some(bulk);
        self
    }

    /// Builds the [`ShopifyConfig`], validating the tunables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSetting`] if `retry.tries` is zero, the
    /// backoff factor is below 1, the leak rate is zero, or the unthrottled
    /// ratio lies outside `(0, 1]`.
    pub fn build(self) -> Result<ShopifyConfig, ConfigError> {
        let defaults = ShopifyConfig::default();
        let retry = self.retry.unwrap_or(defaults.retry);
        let throttle = self.throttle.unwrap_or(defaults.throttle);

        if retry.tries == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "retry.tries",
                reason: "must be at least 1".to_string(),
            });
        }
        if retry.backoff_factor.is_nan() || retry.backoff_factor < 1.0 {
            return Err(ConfigError::InvalidSetting {
                field: "retry.backoff_factor",
                reason: format!("must be at least 1, got {}", retry.backoff_factor),
            });
        }
        if throttle.leak_rate.is_zero() {
            return Err(ConfigError::InvalidSetting {
                field: "throttle.leak_rate",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(throttle.unthrottled_ratio > 0.0 && throttle.unthrottled_ratio <= 1.0) {
            return Err(ConfigError::InvalidSetting {
                field: "throttle.unthrottled_ratio",
                reason: format!(
                    "must be within (0, 1], got {}",
                    throttle.unthrottled_ratio
                ),
            });
        }

        Ok(ShopifyConfig {
            api_version: self.api_version.unwrap_or(defaults.api_version),
            api_host: self.api_host,
            user_agent_prefix: self.user_agent_prefix,
            webhook_uri: self.webhook_uri,
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            retry,
            throttle,
            bulk: self.bulk.unwrap_or(defaults.bulk),
        })
    }
}
