//! # Shopify API client
//!
//! An async client for the Shopify Admin API with rate limit protection,
//! typed errors and bulk exports.
//!
//! ## Overview
//!
//! - Instance-based configuration via [`ShopifyConfig`] and [`ShopifyConfigBuilder`]
//! - A request pipeline ([`HttpClient`]) that waits on a [`RateGovernor`],
//!   retries transient failures and classifies every response
//! - [`RestClient`] with `Link` header pagination and [`GraphqlClient`]
//! - Bulk operations that stream their result file line by line ([`bulk`])
//! - Cached GET requests ([`cache`]) and webhook payloads ([`webhooks`])
//! - Pluggable key-value [`store`]s for state shared between processes
//!
//! ## Quick Start
//!
//! ```rust
//! use shopify_client::{AccessToken, RestClient, Session, ShopDomain, ShopifyConfig};
//!
//! let config = ShopifyConfig::builder()
//!     .user_agent_prefix("MyApp/1.0")
//!     .build()
//!     .unwrap();
//!
//! let session = Session::new(
//!     ShopDomain::new("my-store").unwrap(),
//!     Some(AccessToken::new("shpat_token")),
//! );
//!
//! let client = RestClient::new(&session, Some(&config));
//! assert_eq!(client.http_client().base_uri(), "https://my-store.myshopify.com");
//! ```
//!
//! ## Sharing rate limits between processes
//!
//! ```rust,ignore
//! use shopify_client::store::RedisStore;
//! use shopify_client::{RateGovernor, RestClient};
//! use std::sync::Arc;
//!
//! let store = Arc::new(RedisStore::connect("redis://127.0.0.1/").await?);
//! let governor = RateGovernor::shared(store, config.throttle());
//!
//! let client = RestClient::new(&session, Some(&config)).with_governor(governor);
//! ```
//!
//! ## Errors
//!
//! Every failed response surfaces as an [`HttpError`] variant chosen by
//! [`clients::classify`], carrying the request and response:
//!
//! ```rust,ignore
//! use shopify_client::HttpError;
//!
//! match client.get("orders", None).await {
//!     Err(RestError::Http(HttpError::InvalidAccessToken(_))) => reauthorize().await,
//!     Err(RestError::Http(HttpError::Shop { state, .. })) => tracing::warn!(%state, "Shop unusable"),
//!     other => other.map(drop)?,
//! }
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: configuration and rate state are passed explicitly
//! - **Fail-fast validation**: newtypes and settings validate on construction
//! - **Thread-safe**: clients are `Clone + Send + Sync`
//! - **Async-first**: designed for the Tokio runtime

pub mod auth;
pub mod bulk;
pub mod cache;
pub mod clients;
pub mod config;
pub mod error;
pub mod store;
pub mod throttling;
pub mod webhooks;

// Re-export public types at crate root for convenience
pub use auth::Session;
pub use config::{
    AccessToken, ApiVersion, BulkSettings, HostUrl, RetrySettings, ShopDomain, ShopifyConfig,
    ShopifyConfigBuilder, ThrottleSettings,
};
pub use error::ConfigError;

// Re-export client types
pub use clients::{
    ApiCallLimit, DataType, GraphqlClient, GraphqlError, HttpClient, HttpError, HttpMethod,
    HttpRequest, HttpRequestBuilder, HttpResponse, HttpResponseError, InvalidHttpRequestError,
    MessagePattern, Outcome, PaginationInfo, RestClient, RestError, ShopState,
};

pub use bulk::{BulkOperation, BulkOperationError, BulkOperationStatus};
pub use cache::{CacheError, CachedRequest};
pub use store::{MemoryStore, RedisStore, Store, StoreError};
pub use throttling::{RateBackend, RateGovernor};
pub use webhooks::Webhook;
