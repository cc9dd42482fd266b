//! The request pipeline and API clients.
//!
//! # Overview
//!
//! - [`HttpClient`]: the pipeline (governor wait, retry, classification)
//! - [`HttpRequest`] / [`HttpResponse`]: request and response values
//! - [`classify`]: maps a status and body to an [`Outcome`]
//! - [`ResponseErrors`] / [`MessagePattern`]: rendered error messages and
//!   pattern matching against them
//! - [`PaginationInfo`]: `Link` header cursors
//! - [`rest::RestClient`]: REST verbs and pagination
//! - [`graphql::GraphqlClient`]: GraphQL queries
//!
//! # Example
//!
//! ```rust,ignore
//! use shopify_client::clients::{HttpClient, HttpMethod, HttpRequest};
//!
//! let client = HttpClient::new("/admin/api/2025-10", &session, Some(&config));
//!
//! let request = HttpRequest::builder(HttpMethod::Get, "products")
//!     .query_param("limit", "50")
//!     .build()
//!     .unwrap();
//!
//! let response = client.request(request).await?;
//! ```
//!
//! # Retry Behavior
//!
//! - **429** and **5xx**: retried with exponential backoff, or after
//!   `Retry-After` when the server asks for longer
//! - **Transport errors**: retried with exponential backoff
//! - **Other 4xx**: returned immediately as a classified error
//!
//! The number of attempts comes from [`RetrySettings`](crate::RetrySettings)
//! (3 by default) unless the request sets its own with `.tries(n)`.

mod classify;
mod errors;
pub mod graphql;
mod http_client;
mod http_request;
mod http_response;
mod response_errors;
pub mod rest;

pub use classify::{classify, Outcome, ShopState};
pub use errors::{HttpError, HttpResponseError, InvalidHttpRequestError};
pub use http_client::{HttpClient, SDK_VERSION};
pub use http_request::{
    normalize_path, DataType, HttpMethod, HttpRequest, HttpRequestBuilder, GRAPHQL_PATH,
};
pub use http_response::{ApiCallLimit, HttpResponse, PaginationInfo, API_CALL_LIMIT_HEADER};
pub use response_errors::{FieldError, MessagePattern, ResponseErrors};

pub use graphql::{GraphqlClient, GraphqlError};
pub use rest::{RestClient, RestError};
