//! REST client implementation for Shopify Admin API.
//!
//! This module provides the [`RestClient`] type for making REST API requests
//! to the Shopify Admin API, and for following `Link` header pagination.

use std::collections::HashMap;

use futures::stream::{self, Stream};

use crate::auth::Session;
use crate::clients::rest::RestError;
use crate::clients::{
    normalize_path, DataType, HttpClient, HttpMethod, HttpRequest, HttpResponse,
};
use crate::config::{ApiVersion, ShopifyConfig};
use crate::throttling::RateGovernor;

/// Which pagination link to follow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Relation {
    Next,
    Previous,
}

/// REST API client for Shopify Admin API.
///
/// Provides `get`, `post`, `put` and `delete` over the request pipeline,
/// plus cursor pagination via [`next_page`](Self::next_page),
/// [`previous_page`](Self::previous_page) and [`paginate`](Self::paginate).
///
/// # Thread Safety
///
/// `RestClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust,ignore
/// use shopify_client::{AccessToken, Session, ShopDomain};
/// use shopify_client::clients::RestClient;
///
/// let session = Session::new(
///     ShopDomain::new("my-store").unwrap(),
///     Some(AccessToken::new("shpat_token")),
/// );
/// let client = RestClient::new(&session, None);
///
/// let response = client.get("products", None).await?;
///
/// let body = serde_json::json!({"product": {"title": "New Product"}});
/// let response = client.post("products", body, None).await?;
/// ```
#[derive(Debug, Clone)]
pub struct RestClient {
    http_client: HttpClient,
    api_version: ApiVersion,
}

// Verify RestClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RestClient>();
};

impl RestClient {
    /// Creates a new REST client for the given session.
    ///
    /// Uses the API version from the configuration, or the latest stable
    /// version without one.
    #[must_use]
    pub fn new(session: &Session, config: Option<&ShopifyConfig>) -> Self {
        let api_version = config.map_or_else(ApiVersion::latest, |c| *c.api_version());

        Self::create_client(session, config, api_version)
    }

    /// Creates a new REST client with a specific API version override.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shopify_client::{ApiVersion, Session, ShopDomain};
    /// use shopify_client::clients::RestClient;
    ///
    /// let session = Session::new(ShopDomain::new("my-store").unwrap(), None);
    /// let client = RestClient::with_version(&session, None, ApiVersion::stable(2024, 10));
    ///
    /// assert_eq!(client.http_client().base_path(), "/admin/api/2024-10");
    /// ```
    #[must_use]
    pub fn with_version(
        session: &Session,
        config: Option<&ShopifyConfig>,
        version: ApiVersion,
    ) -> Self {
        if let Some(cfg_version) = config.map(ShopifyConfig::api_version) {
            if &version == cfg_version {
                tracing::debug!(
                    "Rest client has a redundant API version override to the default {}",
                    cfg_version
                );
            } else {
                tracing::debug!(
                    "Rest client overriding default API version {} with {}",
                    cfg_version,
                    version
                );
            }
        }

        Self::create_client(session, config, version)
    }

    fn create_client(
        session: &Session,
        config: Option<&ShopifyConfig>,
        api_version: ApiVersion,
    ) -> Self {
        let base_path = format!("/admin/api/{api_version}");

        Self {
            http_client: HttpClient::new(base_path, session, config),
            api_version,
        }
    }

    /// Replaces the rate governor of the underlying pipeline.
    #[must_use]
    pub fn with_governor(mut self, governor: RateGovernor) -> Self {
        self.http_client = self.http_client.with_governor(governor);
        self
    }

    /// Returns the API version being used by this client.
    #[must_use]
    pub const fn api_version(&self) -> &ApiVersion {
        &self.api_version
    }

    /// Returns the underlying request pipeline.
    #[must_use]
    pub const fn http_client(&self) -> &HttpClient {
        &self.http_client
    }

    /// Sends a GET request to the specified path.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidPath`] if the path is invalid (e.g., empty).
    /// Returns [`RestError::Http`] for HTTP-level errors.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let response = client.get("products", None).await?;
    ///
    /// let query = HashMap::from([("limit".to_string(), "50".to_string())]);
    /// let response = client.get("products", Some(query)).await?;
    /// ```
    pub async fn get(
        &self,
        path: &str,
        query: Option<HashMap<String, String>>,
    ) -> Result<HttpResponse, RestError> {
        self.make_request(HttpMethod::Get, path, None, query, None)
            .await
    }

    /// Sends a GET request with an explicit number of tries.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidPath`] if the path is invalid.
    /// Returns [`RestError::Http`] for HTTP-level errors, after the last try.
    pub async fn get_with_tries(
        &self,
        path: &str,
        query: Option<HashMap<String, String>>,
        tries: u32,
    ) -> Result<HttpResponse, RestError> {
        self.make_request(HttpMethod::Get, path, None, query, Some(tries))
            .await
    }

    /// Sends a POST request to the specified path.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidPath`] if the path is invalid.
    /// Returns [`RestError::Http`] for HTTP-level errors.
    pub async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
        query: Option<HashMap<String, String>>,
    ) -> Result<HttpResponse, RestError> {
        self.make_request(HttpMethod::Post, path, Some(body), query, None)
            .await
    }

    /// Sends a POST request with an explicit number of tries.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidPath`] if the path is invalid.
    /// Returns [`RestError::Http`] for HTTP-level errors, after the last try.
    pub async fn post_with_tries(
        &self,
        path: &str,
        body: serde_json::Value,
        query: Option<HashMap<String, String>>,
        tries: u32,
    ) -> Result<HttpResponse, RestError> {
        self.make_request(HttpMethod::Post, path, Some(body), query, Some(tries))
            .await
    }

    /// Sends a PUT request to the specified path.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidPath`] if the path is invalid.
    /// Returns [`RestError::Http`] for HTTP-level errors.
    pub async fn put(
        &self,
        path: &str,
        body: serde_json::Value,
        query: Option<HashMap<String, String>>,
    ) -> Result<HttpResponse, RestError> {
        self.make_request(HttpMethod::Put, path, Some(body), query, None)
            .await
    }

    /// Sends a PUT request with an explicit number of tries.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidPath`] if the path is invalid.
    /// Returns [`RestError::Http`] for HTTP-level errors, after the last try.
    pub async fn put_with_tries(
        &self,
        path: &str,
        body: serde_json::Value,
        query: Option<HashMap<String, String>>,
        tries: u32,
    ) -> Result<HttpResponse, RestError> {
        self.make_request(HttpMethod::Put, path, Some(body), query, Some(tries))
            .await
    }

    /// Sends a DELETE request to the specified path.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidPath`] if the path is invalid.
    /// Returns [`RestError::Http`] for HTTP-level errors.
    pub async fn delete(
        &self,
        path: &str,
        query: Option<HashMap<String, String>>,
    ) -> Result<HttpResponse, RestError> {
        self.make_request(HttpMethod::Delete, path, None, query, None)
            .await
    }

    /// Sends a DELETE request with an explicit number of tries.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidPath`] if the path is invalid.
    /// Returns [`RestError::Http`] for HTTP-level errors, after the last try.
    pub async fn delete_with_tries(
        &self,
        path: &str,
        query: Option<HashMap<String, String>>,
        tries: u32,
    ) -> Result<HttpResponse, RestError> {
        self.make_request(HttpMethod::Delete, path, None, query, Some(tries))
            .await
    }

    /// Fetches the page after `response`.
    ///
    /// Re-issues the originating request's verb and path with the query
    /// parameters of the `rel="next"` link. Returns `Ok(None)` when there is
    /// no further page.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Http`] if the page request fails.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let mut page = client.get("products", None).await?;
    /// while let Some(next) = client.next_page(&page).await? {
    ///     page = next;
    /// }
    /// ```
    pub async fn next_page(&self, response: &HttpResponse) -> Result<Option<HttpResponse>, RestError> {
        self.follow(response, Relation::Next).await
    }

    /// Fetches the page before `response`, or `Ok(None)` on the first page.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Http`] if the page request fails.
    pub async fn previous_page(
        &self,
        response: &HttpResponse,
    ) -> Result<Option<HttpResponse>, RestError> {
        self.follow(response, Relation::Previous).await
    }

    /// Streams every page of a GET collection, starting at `path`.
    ///
    /// Pages are requested lazily, one request per pulled item; the stream
    /// ends after the first page without a `next` link and stops after the
    /// first error.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use futures::TryStreamExt;
    ///
    /// let pages = client.paginate("products", None);
    /// futures::pin_mut!(pages);
    /// while let Some(page) = pages.try_next().await? {
    ///     println!("{}", page.body["products"]);
    /// }
    /// ```
    pub fn paginate(
        &self,
        path: &str,
        query: Option<HashMap<String, String>>,
    ) -> impl Stream<Item = Result<HttpResponse, RestError>> + '_ {
        let first = Self::build_request(HttpMethod::Get, path, None, query, None);

        stream::try_unfold(Some(first), move |pending| async move {
            let Some(request) = pending else {
                return Ok(None);
            };
            let response = self.http_client.request(request?).await?;
            let next = Self::page_request(&response, Relation::Next).map(Ok);
            Ok(Some((response, next)))
        })
    }

    async fn follow(
        &self,
        response: &HttpResponse,
        relation: Relation,
    ) -> Result<Option<HttpResponse>, RestError> {
        match Self::page_request(response, relation) {
            Some(request) => Ok(Some(self.http_client.request(request).await?)),
            None => Ok(None),
        }
    }

    /// Builds the request for a linked page of `response`, if there is one.
    fn page_request(response: &HttpResponse, relation: Relation) -> Option<HttpRequest> {
        let pagination = response.pagination();
        let params = match relation {
            Relation::Next => pagination.next.as_ref(),
            Relation::Previous => pagination.previous.as_ref(),
        }?;
        let original = response.request.as_ref()?;

        Some(HttpRequest {
            query: Some(params.clone()),
            ..original.clone()
        })
    }

    async fn make_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
        query: Option<HashMap<String, String>>,
        tries: Option<u32>,
    ) -> Result<HttpResponse, RestError> {
        let request = Self::build_request(method, path, body, query, tries)?;

        self.http_client.request(request).await.map_err(Into::into)
    }

    fn build_request(
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
        query: Option<HashMap<String, String>>,
        tries: Option<u32>,
    ) -> Result<HttpRequest, RestError> {
        let normalized_path = normalize_path(path).map_err(|_| RestError::InvalidPath {
            path: path.to_string(),
        })?;

        let mut builder = HttpRequest::builder(method, normalized_path);

        if let Some(body_value) = body {
            builder = builder.body(body_value).body_type(DataType::Json);
        }
        if let Some(query_params) = query {
            builder = builder.query(query_params);
        }
        if let Some(t) = tries {
            builder = builder.tries(t);
        }

        builder.build().map_err(|e| RestError::Http(e.into()))
    }
}
