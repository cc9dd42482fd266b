//! REST API client for Shopify Admin API.
//!
//! - [`RestClient`]: `get()`, `post()`, `put()`, `delete()` and pagination
//! - [`RestError`]: error type for REST operations
//!
//! # Path Normalization
//!
//! - Leading slashes are stripped: `/products` -> `products.json`
//! - A trailing `.json` is kept once: `products.json` -> `products.json`
//!
//! # Pagination
//!
//! Collection endpoints answer with a `Link` header holding `next` and
//! `previous` cursors. [`RestClient::next_page`] and
//! [`RestClient::previous_page`] follow one link; [`RestClient::paginate`]
//! streams every page lazily.
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//!
//! let pages: Vec<_> = client.paginate("products", None).try_collect().await?;
//! ```

mod client;
mod errors;

pub use client::RestClient;
pub use errors::RestError;
