//! The request pipeline.
//!
//! [`HttpClient`] turns an [`HttpRequest`] into a classified
//! [`HttpResponse`]: it waits for the rate governor, transmits, records the
//! call limit, retries transient failures with exponential backoff and
//! finally classifies the result.

use std::collections::HashMap;
use std::time::Duration;

use crate::auth::Session;
use crate::clients::errors::HttpError;
use crate::clients::http_request::{normalize_path, HttpMethod, HttpRequest};
use crate::clients::http_response::{HttpResponse, API_CALL_LIMIT_HEADER};
use crate::config::{RetrySettings, ShopDomain, ShopifyConfig};
use crate::throttling::RateGovernor;

/// SDK version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP client for making requests to the Shopify API.
///
/// The client handles:
/// - Base URI construction from the session's shop domain or `api_host`
/// - Default headers including User-Agent and access token
/// - Rate governor waits before every attempt
/// - Retries with exponential backoff for 429, 5xx and transport failures
/// - Classification of every completed response
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust,ignore
/// use shopify_client::{AccessToken, Session, ShopDomain};
/// use shopify_client::clients::{HttpClient, HttpMethod, HttpRequest};
///
/// let session = Session::new(
///     ShopDomain::new("my-store").unwrap(),
///     Some(AccessToken::new("shpat_token")),
/// );
/// let client = HttpClient::new("/admin/api/2025-10", &session, None);
///
/// let request = HttpRequest::builder(HttpMethod::Get, "products").build().unwrap();
/// let response = client.request(request).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_uri: String,
    base_path: String,
    shop: ShopDomain,
    default_headers: HashMap<String, String>,
    retry: RetrySettings,
    governor: RateGovernor,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates a new HTTP client for the given session.
    ///
    /// Without a configuration, defaults apply and requests are throttled by
    /// a process-local governor. Use [`with_governor`](Self::with_governor)
    /// to share a governor between clients or to use a shared store.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shopify_client::{AccessToken, Session, ShopDomain};
    /// use shopify_client::clients::HttpClient;
    ///
    /// let session = Session::new(
    ///     ShopDomain::new("my-store").unwrap(),
    ///     Some(AccessToken::new("shpat_token")),
    /// );
    ///
    /// let client = HttpClient::new("/admin/api/2025-10", &session, None);
    /// assert_eq!(client.base_uri(), "https://my-store.myshopify.com");
    /// ```
    #[must_use]
    pub fn new(
        base_path: impl Into<String>,
        session: &Session,
        config: Option<&ShopifyConfig>,
    ) -> Self {
        let base_path = base_path.into();
        let defaults = ShopifyConfig::default();
        let config = config.unwrap_or(&defaults);

        let base_uri = config.api_host().map_or_else(
            || format!("https://{}", session.shop),
            |host| host.origin().to_string(),
        );

        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent =
            format!("{user_agent_prefix}Shopify API Library v{SDK_VERSION} | Rust {rust_version}");

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);
        default_headers.insert("Accept".to_string(), "application/json".to_string());

        if let Some(token) = &session.access_token {
            default_headers.insert(
                "X-Shopify-Access-Token".to_string(),
                token.as_ref().to_string(),
            );
        }

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_uri,
            base_path,
            shop: session.shop.clone(),
            default_headers,
            retry: *config.retry(),
            governor: RateGovernor::local(config.throttle()),
        }
    }

    /// Replaces the rate governor.
    #[must_use]
    pub fn with_governor(mut self, governor: RateGovernor) -> Self {
        self.governor = governor;
        self
    }

    /// Returns the base URI for this client.
    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Returns the base path for this client.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns the tenant this client sends requests for.
    #[must_use]
    pub const fn shop(&self) -> &ShopDomain {
        &self.shop
    }

    /// Returns the default headers for this client.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Returns the rate governor.
    #[must_use]
    pub const fn governor(&self) -> &RateGovernor {
        &self.governor
    }

    /// Sends an HTTP request to the Shopify API.
    ///
    /// The path is normalized to the `.json` convention. Each attempt first
    /// waits for the rate governor; 429, 5xx and transport failures are
    /// retried until the request's (or the configured) number of tries is
    /// used up, then surface as their classified error.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if:
    /// - request validation fails (`InvalidRequest`)
    /// - the transport keeps failing (`Network`)
    /// - the final response is not a success (every other variant)
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let request = HttpRequest::builder(HttpMethod::Get, "products")
    ///     .tries(5)
    ///     .build()
    ///     .unwrap();
    ///
    /// let response = client.request(request).await?;
    /// println!("Products: {}", response.body);
    /// ```
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        request.verify()?;

        let path = normalize_path(&request.path)?;
        let url = format!("{}{}/{path}", self.base_uri, self.base_path);

        let mut headers = self.default_headers.clone();
        if let Some(body_type) = &request.body_type {
            headers.insert(
                "Content-Type".to_string(),
                body_type.as_content_type().to_string(),
            );
        }
        if let Some(extra) = &request.extra_headers {
            for (key, value) in extra {
                headers.insert(key.clone(), value.clone());
            }
        }

        let tries = request.tries.unwrap_or(self.retry.tries).max(1);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            self.governor.wait(&self.shop).await;

            let transaction_id = format!("{:016x}", rand::random::<u64>());
            tracing::info!(
                transaction_id = %transaction_id,
                method = %request.http_method,
                url = %url,
                "Shopify API request"
            );

            let mut req_builder = match request.http_method {
                HttpMethod::Get => self.client.get(&url),
                HttpMethod::Post => self.client.post(&url),
                HttpMethod::Put => self.client.put(&url),
                HttpMethod::Delete => self.client.delete(&url),
            };
            for (key, value) in &headers {
                req_builder = req_builder.header(key, value);
            }
            if let Some(query) = &request.query {
                req_builder = req_builder.query(query);
            }
            if let Some(body) = &request.body {
                req_builder = req_builder.body(body.to_string());
            }

            let read = match req_builder.send().await {
                Ok(res) => Self::read_response(res).await,
                Err(error) => Err(error),
            };
            let response = match read {
                Ok(response) => response.with_request(request.clone()),
                Err(error) if attempt < tries => {
                    let delay = self.retry.backoff(attempt);
                    tracing::warn!(
                        transaction_id = %transaction_id,
                        attempt,
                        delay_ms = delay.as_millis(),
                        %error,
                        "Transport error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(error) => return Err(HttpError::Network(error)),
            };

            tracing::info!(
                transaction_id = %transaction_id,
                status = response.code,
                api_call_limit = response
                    .headers
                    .get(API_CALL_LIMIT_HEADER)
                    .and_then(|values| values.first())
                    .map(String::as_str),
                "Shopify API response"
            );

            self.governor.record(&self.shop, response.api_call_limit).await;

            if let Some(reason) = response.deprecation_reason() {
                tracing::warn!(
                    "Deprecated request to Shopify API at {}, received reason: {}",
                    request.path,
                    reason
                );
            }

            let code = response.code;
            if attempt < tries && (code == 429 || (500..=599).contains(&code)) {
                let delay = Self::retry_delay(&self.retry, attempt, &response);
                tracing::warn!(
                    transaction_id = %transaction_id,
                    status = code,
                    attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying request"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return HttpError::check(self.shop.clone(), response);
        }
    }

    /// Starts a GET of an absolute URL, such as a bulk operation result.
    ///
    /// No Shopify headers are sent and the governor is bypassed: result
    /// files live on a storage host with a pre-signed URL.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the request fails or the status is not
    /// a success.
    pub async fn download(&self, url: &str) -> Result<reqwest::Response, reqwest::Error> {
        tracing::debug!("Downloading pre-signed result file");
        self.client.get(url).send().await?.error_for_status()
    }

    /// Reads a response body. A body cut short by the connection is a
    /// transport error, not an empty body.
    async fn read_response(res: reqwest::Response) -> Result<HttpResponse, reqwest::Error> {
        let code = res.status().as_u16();
        let headers = Self::parse_response_headers(res.headers());
        let body_text = res.text().await?;

        let body = if body_text.is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&body_text).unwrap_or_else(|_| {
                if code >= 500 {
                    serde_json::json!({ "raw_body": body_text })
                } else {
                    serde_json::json!({})
                }
            })
        };

        Ok(HttpResponse::new(code, headers, body))
    }

    /// Parses response headers into a `HashMap`.
    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }

    /// The backoff for `attempt`, or the server's `Retry-After` if longer.
    fn retry_delay(retry: &RetrySettings, attempt: u32, response: &HttpResponse) -> Duration {
        let backoff = retry.backoff(attempt);
        response
            .retry_request_after
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
            .map_or(backoff, |retry_after| retry_after.max(backoff))
    }
}
