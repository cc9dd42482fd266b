//! GraphQL API client for Shopify Admin API.
//!
//! - [`GraphqlClient`]: POSTs `{query, variables}` to the `graphql.json` endpoint
//! - [`GraphqlError`]: error type for GraphQL operations
//!
//! # Example
//!
//! ```rust,ignore
//! use shopify_client::clients::graphql::GraphqlClient;
//!
//! let client = GraphqlClient::new(&session, Some(&config));
//! let data = client.data("query { shop { name } }", None).await?;
//! println!("Shop: {}", data["shop"]["name"]);
//! ```

mod client;
mod errors;

pub use client::GraphqlClient;
pub use errors::GraphqlError;
