//! HTTP-specific error types for the Shopify client.
//!
//! Every completed response passes through [`classify`](crate::clients::classify);
//! non-success outcomes surface as the matching [`HttpError`] variant, each
//! carrying the shop, request and response for diagnostics.
//!
//! # Example
//!
//! ```rust,ignore
//! use shopify_client::clients::{HttpError, MessagePattern};
//!
//! match client.request(request).await {
//!     Ok(response) => println!("Success: {}", response.body),
//!     Err(HttpError::InvalidAccessToken(e)) => println!("Reinstall needed for {}", e.shop),
//!     Err(HttpError::Shop { state, .. }) => println!("Shop is {state}"),
//!     Err(e) if e.message_matches(&["has already been taken [handle]".into()]) => {}
//!     Err(e) => return Err(e.into()),
//! }
//! ```

use crate::clients::classify::{Outcome, ShopState};
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::HttpResponse;
use crate::clients::response_errors::MessagePattern;
use crate::config::ShopDomain;
use std::fmt;
use thiserror::Error;

/// A classified, unsuccessful response together with its context.
#[derive(Clone, Debug)]
pub struct HttpResponseError {
    /// The shop the request was sent to.
    pub shop: ShopDomain,
    /// The response, including the originating request.
    pub response: HttpResponse,
}

impl HttpResponseError {
    /// Creates a response error.
    #[must_use]
    pub const fn new(shop: ShopDomain, response: HttpResponse) -> Self {
        Self { shop, response }
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.response.code
    }

    /// Returns the originating request.
    #[must_use]
    pub const fn request(&self) -> Option<&HttpRequest> {
        self.response.request.as_ref()
    }

    /// Returns the `X-Request-Id` of the response, for support requests.
    #[must_use]
    pub fn error_reference(&self) -> Option<&str> {
        self.response.request_id()
    }

    fn graphql_summary(&self) -> String {
        self.response
            .errors()
            .first_message()
            .or_else(|| self.response.user_errors().first_message())
            .map_or_else(|| "bad response".to_string(), |m| format!("bad response: {m}"))
    }
}

impl fmt::Display for HttpResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.response.errors().first_message() {
            Some(message) => write!(f, "bad response ({}): {message}", self.code()),
            None => write!(f, "bad response ({})", self.code()),
        }
    }
}

/// Error returned when an HTTP request fails validation.
///
/// This error is raised before a request is sent.
///
/// # Example
///
/// ```rust
/// use shopify_client::clients::InvalidHttpRequestError;
///
/// let error = InvalidHttpRequestError::MissingBody {
///     method: "post".to_string(),
/// };
///
/// assert_eq!(error.to_string(), "Cannot use post without specifying data.");
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// The path is empty once normalized.
    #[error("Cannot send a request without a path.")]
    EmptyPath,

    /// A request body was provided without specifying the body type.
    #[error("Cannot set a body without also setting body_type.")]
    MissingBodyType,

    /// A POST or PUT request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },
}

/// Unified error type for the request pipeline.
///
/// The response variants mirror [`Outcome`]. Transport failures surface as
/// [`HttpError::Network`] once retries are exhausted.
#[derive(Debug, Error)]
pub enum HttpError {
    /// A 4xx response without a more specific meaning.
    #[error("{0}")]
    Client(Box<HttpResponseError>),

    /// The access token was rejected (401).
    #[error("Invalid access token")]
    InvalidAccessToken(Box<HttpResponseError>),

    /// The shop is frozen, unavailable or locked.
    #[error("Shop is {state}")]
    Shop {
        /// Why the shop refused the request.
        state: ShopState,
        /// The response context.
        error: Box<HttpResponseError>,
    },

    /// Application-level over-use (430).
    #[error("Too many requests: {0}")]
    TooManyRequests(Box<HttpResponseError>),

    /// A 5xx response.
    #[error("{0}")]
    Server(Box<HttpResponseError>),

    /// A 200 GraphQL response that carries errors or user errors.
    #[error("{}", .0.graphql_summary())]
    GraphqlClient(Box<HttpResponseError>),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// Network or connection error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl HttpError {
    /// Builds the error for a non-success outcome.
    ///
    /// Returns `None` for [`Outcome::Success`].
    #[must_use]
    pub fn from_outcome(outcome: Outcome, error: HttpResponseError) -> Option<Self> {
        Self::wrap(outcome, Box::new(error)).ok()
    }

    /// Classifies `response`, returning it unchanged on success.
    ///
    /// # Errors
    ///
    /// Returns the [`HttpError`] variant matching the response's
    /// [`Outcome`] when it is not a success.
    pub fn check(shop: ShopDomain, response: HttpResponse) -> Result<HttpResponse, Self> {
        let outcome = response.outcome();
        match Self::wrap(outcome, Box::new(HttpResponseError::new(shop, response))) {
            Ok(error) => Err(error),
            Err(context) => Ok(context.response),
        }
    }

    fn wrap(outcome: Outcome, error: Box<HttpResponseError>) -> Result<Self, Box<HttpResponseError>> {
        Ok(match outcome {
            Outcome::Success => return Err(error),
            Outcome::Client => Self::Client(error),
            Outcome::InvalidAccessToken => Self::InvalidAccessToken(error),
            Outcome::Shop(state) => Self::Shop { state, error },
            Outcome::TooManyRequests => Self::TooManyRequests(error),
            Outcome::Server => Self::Server(error),
            Outcome::GraphqlClient => Self::GraphqlClient(error),
        })
    }

    /// Returns the response context for response-derived errors.
    #[must_use]
    pub fn response_error(&self) -> Option<&HttpResponseError> {
        match self {
            Self::Client(error)
            | Self::InvalidAccessToken(error)
            | Self::Shop { error, .. }
            | Self::TooManyRequests(error)
            | Self::Server(error)
            | Self::GraphqlClient(error) => Some(error),
            Self::InvalidRequest(_) | Self::Network(_) => None,
        }
    }

    /// Returns the response for response-derived errors.
    #[must_use]
    pub fn response(&self) -> Option<&HttpResponse> {
        self.response_error().map(|error| &error.response)
    }

    /// Returns the HTTP status code for response-derived errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response().map(|response| response.code)
    }

    /// Returns `true` for every 4xx error and GraphQL client errors.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Client(_)
                | Self::InvalidAccessToken(_)
                | Self::Shop { .. }
                | Self::TooManyRequests(_)
                | Self::GraphqlClient(_)
        )
    }

    /// Returns `true` if any error or user error message of the response
    /// matches any of `patterns`.
    ///
    /// Useful to treat benign conflicts such as "has already been taken" as
    /// success.
    #[must_use]
    pub fn message_matches(&self, patterns: &[MessagePattern]) -> bool {
        self.response()
            .is_some_and(|response| response.error_message_matches(patterns))
    }
}
