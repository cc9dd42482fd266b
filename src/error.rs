//! Configuration error types for the Shopify client.
//!
//! All configuration constructors return `Result<T, ConfigError>` so that
//! invalid settings fail fast, before any request is issued.
//!
//! # Example
//!
//! ```rust
//! use shopify_client::{ConfigError, ShopDomain};
//!
//! let result = ShopDomain::new("not a shop!");
//! assert!(matches!(result, Err(ConfigError::InvalidShopDomain { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur while building or validating configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Shop domain is invalid.
    #[error("Invalid shop domain '{domain}'. Expected format: 'shop-name' or 'shop-name.myshopify.com'.")]
    InvalidShopDomain {
        /// The invalid domain that was provided.
        domain: String,
    },

    /// API version is invalid.
    #[error("Invalid API version '{version}'. Expected format: 'YYYY-MM' (e.g., '2024-01') or 'unstable'.")]
    InvalidApiVersion {
        /// The invalid version string that was provided.
        version: String,
    },

    /// The configured API version is older than a feature requires.
    #[error("Requires API version >= {required}, but {configured} is configured.")]
    UnsupportedApiVersion {
        /// The minimum version the feature needs.
        required: String,
        /// The version the client is configured with.
        configured: String,
    },

    /// Host URL is invalid.
    #[error("Invalid host URL '{url}'. Please provide a valid URL with scheme (e.g., 'https://myapp.example.com').")]
    InvalidHostUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A tunable setting is out of range.
    #[error("Invalid setting '{field}': {reason}")]
    InvalidSetting {
        /// The name of the offending setting.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}
