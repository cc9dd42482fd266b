//! GraphQL client implementation for Shopify Admin API.
//!
//! This module provides the [`GraphqlClient`] type for executing GraphQL queries
//! against the Shopify Admin API.

use std::collections::HashMap;

use crate::auth::Session;
use crate::clients::graphql::GraphqlError;
use crate::clients::{DataType, HttpClient, HttpMethod, HttpRequest, HttpResponse, GRAPHQL_PATH};
use crate::config::{ApiVersion, BulkSettings, ShopifyConfig};
use crate::throttling::RateGovernor;

/// GraphQL API client for Shopify Admin API.
///
/// Every query is POSTed to the fixed `graphql.json` endpoint with a
/// `{query, variables}` body. Responses that carry `errors` or `userErrors`
/// fail with [`HttpError::GraphqlClient`](crate::clients::HttpError::GraphqlClient)
/// even though Shopify answers them with a 200 status.
///
/// # Thread Safety
///
/// `GraphqlClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust,ignore
/// use shopify_client::{AccessToken, Session, ShopDomain};
/// use shopify_client::clients::GraphqlClient;
/// use serde_json::json;
///
/// let session = Session::new(
///     ShopDomain::new("my-store").unwrap(),
///     Some(AccessToken::new("shpat_token")),
/// );
/// let client = GraphqlClient::new(&session, None);
///
/// let response = client.query("query { shop { name } }", None, None, None).await?;
///
/// let product = client.data(
///     "query GetProduct($id: ID!) { product(id: $id) { title } }",
///     Some(json!({ "id": "gid://shopify/Product/123" })),
/// ).await?;
/// ```
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    http_client: HttpClient,
    api_version: ApiVersion,
    bulk: BulkSettings,
}

// Verify GraphqlClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<GraphqlClient>();
};

impl GraphqlClient {
    /// Creates a new GraphQL client for the given session.
    ///
    /// Uses the API version from the configuration, or the latest stable
    /// version without one.
    #[must_use]
    pub fn new(session: &Session, config: Option<&ShopifyConfig>) -> Self {
        let api_version = config.map_or_else(ApiVersion::latest, |c| *c.api_version());
        Self::create_client(session, config, api_version)
    }

    /// Creates a new GraphQL client with a specific API version override.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shopify_client::{ApiVersion, Session, ShopDomain};
    /// use shopify_client::clients::GraphqlClient;
    ///
    /// let session = Session::new(ShopDomain::new("my-store").unwrap(), None);
    /// let client = GraphqlClient::with_version(&session, None, ApiVersion::stable(2019, 7));
    ///
    /// assert_eq!(client.api_version().to_string(), "2019-07");
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
                    "GraphQL client has a redundant API version override to the default {}",
                    cfg_version
                );
            } else {
                tracing::debug!(
                    "GraphQL client overriding default API version {} with {}",
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
            bulk: config.map(|c| *c.bulk()).unwrap_or_default(),
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

    /// Returns the bulk operation polling settings.
    #[must_use]
    pub const fn bulk_settings(&self) -> &BulkSettings {
        &self.bulk
    }

    /// Returns the underlying request pipeline.
    #[must_use]
    pub const fn http_client(&self) -> &HttpClient {
        &self.http_client
    }

    /// Executes a GraphQL query against the Admin API.
    ///
    /// `tries` overrides the configured number of attempts.
    ///
    /// # Errors
    ///
    /// Returns [`GraphqlError::Http`] for transport failures, non-2xx
    /// responses, and 200 responses carrying `errors` or `userErrors`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let response = client.query("query { shop { name } }", None, None, None).await?;
    /// println!("Shop: {}", response.body["data"]["shop"]["name"]);
    /// ```
    pub async fn query(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
        headers: Option<HashMap<String, String>>,
        tries: Option<u32>,
    ) -> Result<HttpResponse, GraphqlError> {
        self.execute_query(query, variables, headers, tries, false)
            .await
    }

    /// Executes a GraphQL query with `?debug=true`.
    ///
    /// Shopify then includes query cost details in the response's
    /// `extensions` field.
    ///
    /// # Errors
    ///
    /// Same as [`query`](Self::query).
    pub async fn query_with_debug(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
        headers: Option<HashMap<String, String>>,
        tries: Option<u32>,
    ) -> Result<HttpResponse, GraphqlError> {
        self.execute_query(query, variables, headers, tries, true)
            .await
    }

    /// Executes a query and returns its `data` object.
    ///
    /// # Errors
    ///
    /// Returns [`GraphqlError::Http`] like [`query`](Self::query), and
    /// [`GraphqlError::UnexpectedShape`] if the body has no `data` object.
    pub async fn data(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, GraphqlError> {
        let response = self.query(query, variables, None, None).await?;
        match response.body {
            serde_json::Value::Object(mut body) => match body.remove("data") {
                Some(data @ serde_json::Value::Object(_)) => Ok(data),
                _ => Err(GraphqlError::UnexpectedShape {
                    reason: "response has no data object".to_string(),
                }),
            },
            _ => Err(GraphqlError::UnexpectedShape {
                reason: "response body is not an object".to_string(),
            }),
        }
    }

    async fn execute_query(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
        headers: Option<HashMap<String, String>>,
        tries: Option<u32>,
        debug: bool,
    ) -> Result<HttpResponse, GraphqlError> {
        let request = Self::build_request(query, variables, headers, tries, debug)?;
        self.http_client.request(request).await.map_err(Into::into)
    }

    fn build_request(
        query: &str,
        variables: Option<serde_json::Value>,
        headers: Option<HashMap<String, String>>,
        tries: Option<u32>,
        debug: bool,
    ) -> Result<HttpRequest, GraphqlError> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables.unwrap_or_else(|| serde_json::json!({}))
        });

        let mut builder = HttpRequest::builder(HttpMethod::Post, GRAPHQL_PATH)
            .body(body)
            .body_type(DataType::Json);

        if let Some(tries) = tries {
            builder = builder.tries(tries);
        }
        if debug {
            builder = builder.query_param("debug", "true");
        }
        if let Some(extra_headers) = headers {
            builder = builder.extra_headers(extra_headers);
        }

        builder.build().map_err(|e| GraphqlError::Http(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AccessToken, ShopDomain};
    use serde_json::json;
    use std::time::Duration;

    fn create_test_session() -> Session {
        Session::new(
            ShopDomain::new("test-shop").unwrap(),
            Some(AccessToken::new("test-access-token")),
        )
    }

    #[test]
    fn test_graphql_client_new_uses_latest_version() {
        let client = GraphqlClient::new(&create_test_session(), None);

        assert_eq!(client.api_version(), &ApiVersion::latest());
        assert_eq!(client.bulk_settings(), &BulkSettings::default());
    }

    #[test]
    fn test_graphql_client_takes_bulk_settings_from_config() {
        let config = ShopifyConfig::builder()
            .bulk(BulkSettings::default().poll_delay(Duration::from_millis(10)))
            .build()
            .unwrap();
        let client = GraphqlClient::new(&create_test_session(), Some(&config));

        assert_eq!(client.bulk_settings().poll_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_build_request_posts_query_and_variables() {
        let request = GraphqlClient::build_request(
            "query($id: ID!) { node(id: $id) { id } }",
            Some(json!({"id": "gid://shopify/Product/1"})),
            None,
            None,
            false,
        )
        .unwrap();

        assert_eq!(request.http_method, HttpMethod::Post);
        assert_eq!(request.path, GRAPHQL_PATH);
        assert!(request.is_graphql());
        assert_eq!(request.tries, None);
        let body = request.body.unwrap();
        assert_eq!(body["variables"]["id"], "gid://shopify/Product/1");
        assert!(body["query"].as_str().unwrap().contains("node"));
    }

    #[test]
    fn test_build_request_debug_and_tries() {
        let request = GraphqlClient::build_request(
            "{ shop { name } }",
            None,
            Some(HashMap::from([("X-Test".to_string(), "1".to_string())])),
            Some(4),
            true,
        )
        .unwrap();

        assert_eq!(request.tries, Some(4));
        assert_eq!(request.query.unwrap()["debug"], "true");
        assert_eq!(request.extra_headers.unwrap()["X-Test"], "1");
        assert_eq!(request.body.unwrap()["variables"], serde_json::json!({}));
    }
}
