//! HTTP response types for the Shopify client.
//!
//! This module provides the [`HttpResponse`] type and related types for
//! parsing and accessing API response data.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::clients::classify::{classify, Outcome};
use crate::clients::http_request::HttpRequest;
use crate::clients::response_errors::{MessagePattern, ResponseErrors};

/// Header carrying the REST call limit bucket state.
pub const API_CALL_LIMIT_HEADER: &str = "x-shopify-shop-api-call-limit";

/// Rate limit information parsed from the `X-Shopify-Shop-Api-Call-Limit` header.
///
/// The header format is "X/Y" where X is the current request count and Y is
/// the bucket size.
///
/// # Example
///
/// ```rust
/// use shopify_client::clients::ApiCallLimit;
///
/// let limit = ApiCallLimit::parse("40/80").unwrap();
/// assert_eq!(limit.request_count, 40);
/// assert_eq!(limit.bucket_size, 80);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApiCallLimit {
    /// The current number of requests made in this bucket.
    pub request_count: u32,
    /// The maximum number of requests allowed in this bucket.
    pub bucket_size: u32,
}

impl ApiCallLimit {
    /// Parses the rate limit header value.
    ///
    /// Returns `None` unless the value is two unsigned integers separated by `/`.
    #[must_use]
    pub fn parse(header_value: &str) -> Option<Self> {
        let (request_count, bucket_size) = header_value.trim().split_once('/')?;

        Some(Self {
            request_count: request_count.trim().parse().ok()?,
            bucket_size: bucket_size.trim().parse().ok()?,
        })
    }
}

/// Query parameters of the `next` and `previous` links of a `Link` header.
///
/// Shopify paginates REST collections with `page_info` cursors, but the
/// whole query of each link is kept so that follow-up requests reproduce
/// it exactly (`limit`, `fields`, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaginationInfo {
    /// Query parameters of the `previous` link, if present.
    pub previous: Option<HashMap<String, String>>,
    /// Query parameters of the `next` link, if present.
    pub next: Option<HashMap<String, String>>,
}

impl PaginationInfo {
    /// Parses a Link header value.
    ///
    /// The format is a comma separated list of `<url>; rel="name"` entries.
    /// Only the `next` and `previous` relations are kept; query values are
    /// percent-decoded.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shopify_client::clients::PaginationInfo;
    ///
    /// let info = PaginationInfo::parse_link_header(
    ///     r#"<https://shop.myshopify.com/admin/api/2024-10/products.json?limit=2&page_info=abc>; rel="next""#,
    /// );
    /// let next = info.next.unwrap();
    /// assert_eq!(next["page_info"], "abc");
    /// assert_eq!(next["limit"], "2");
    /// assert!(info.previous.is_none());
    /// ```
    #[must_use]
    pub fn parse_link_header(header_value: &str) -> Self {
        let mut result = Self::default();
        let mut rest = header_value;

        while let Some(start) = rest.find('<') {
            let Some(end) = rest[start..].find('>').map(|i| start + i) else {
                break;
            };
            let url = &rest[start + 1..end];
            rest = &rest[end + 1..];

            let params_end = rest.find('<').unwrap_or(rest.len());
            let rel = rest[..params_end].split(';').find_map(|part| {
                part.trim()
                    .trim_end_matches(',')
                    .trim()
                    .strip_prefix("rel=")
                    .map(|rel| rel.trim_matches('"'))
            });

            match rel {
                Some("next") => result.next = Some(Self::query_params(url)),
                Some("previous") => result.previous = Some(Self::query_params(url)),
                _ => {}
            }
        }

        result
    }

    /// Returns the `page_info` cursor of the next page, if any.
    #[must_use]
    pub fn next_page_info(&self) -> Option<&str> {
        self.next
            .as_ref()
            .and_then(|params| params.get("page_info"))
            .map(String::as_str)
    }

    /// Returns the `page_info` cursor of the previous page, if any.
    #[must_use]
    pub fn previous_page_info(&self) -> Option<&str> {
        self.previous
            .as_ref()
            .and_then(|params| params.get("page_info"))
            .map(String::as_str)
    }

    fn query_params(url: &str) -> HashMap<String, String> {
        let Some((_, query)) = url.split_once('?') else {
            return HashMap::new();
        };
        let query = query.split('#').next().unwrap_or_default();

        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect()
    }
}

fn decode_component(component: &str) -> String {
    let component = component.replace('+', " ");
    urlencoding::decode(&component).map_or_else(|_| component.clone(), |decoded| decoded.into_owned())
}

/// An HTTP response from the Shopify API.
///
/// Contains the response status code, headers, decoded body, the request
/// that produced it, and parsed Shopify-specific header values. Error lists
/// and pagination links are derived on first use and cached for the
/// lifetime of the response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers, keyed by lowercase name (headers may repeat).
    pub headers: HashMap<String, Vec<String>>,
    /// The decoded response body.
    pub body: serde_json::Value,
    /// Rate limit information (from `X-Shopify-Shop-Api-Call-Limit` header).
    pub api_call_limit: Option<ApiCallLimit>,
    /// Seconds to wait before retrying (from `Retry-After` header).
    pub retry_request_after: Option<f64>,
    /// The request this response answers, when sent through a client.
    pub request: Option<HttpRequest>,
    errors: OnceLock<ResponseErrors>,
    user_errors: OnceLock<ResponseErrors>,
    pagination: OnceLock<PaginationInfo>,
}

impl HttpResponse {
    /// Creates a new `HttpResponse`, parsing the call limit and `Retry-After` headers.
    #[must_use]
    pub fn new(code: u16, headers: HashMap<String, Vec<String>>, body: serde_json::Value) -> Self {
        let api_call_limit = first_header(&headers, API_CALL_LIMIT_HEADER)
            .and_then(ApiCallLimit::parse);

        let retry_request_after = first_header(&headers, "retry-after")
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|seconds| seconds.is_finite() && *seconds >= 0.0);

        Self {
            code,
            headers,
            body,
            api_call_limit,
            retry_request_after,
            request: None,
            errors: OnceLock::new(),
            user_errors: OnceLock::new(),
            pagination: OnceLock::new(),
        }
    }

    /// Attaches the originating request.
    #[must_use]
    pub fn with_request(mut self, request: HttpRequest) -> Self {
        self.request = Some(request);
        self.user_errors = OnceLock::new();
        self
    }

    /// Returns `true` if the response status code is in the 2xx range.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns `true` if the originating request targeted the GraphQL endpoint.
    #[must_use]
    pub fn is_graphql(&self) -> bool {
        self.request.as_ref().is_some_and(HttpRequest::is_graphql)
    }

    /// Classifies this response.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        classify(self.code, &self.body, self.is_graphql())
    }

    /// Returns the top-level `errors` of the body.
    pub fn errors(&self) -> &ResponseErrors {
        self.errors
            .get_or_init(|| ResponseErrors::from_body(&self.body))
    }

    /// Returns the GraphQL `userErrors` of the body.
    ///
    /// Always empty for responses to non-GraphQL requests.
    pub fn user_errors(&self) -> &ResponseErrors {
        self.user_errors.get_or_init(|| {
            if self.is_graphql() {
                ResponseErrors::user_errors_from_body(&self.body)
            } else {
                ResponseErrors::default()
            }
        })
    }

    /// Returns `true` if any error or user error message matches any of `patterns`.
    #[must_use]
    pub fn error_message_matches(&self, patterns: &[MessagePattern]) -> bool {
        self.errors().matches(patterns) || self.user_errors().matches(patterns)
    }

    /// Returns the pagination links of the `Link` header.
    pub fn pagination(&self) -> &PaginationInfo {
        self.pagination.get_or_init(|| {
            first_header(&self.headers, "link")
                .map(PaginationInfo::parse_link_header)
                .unwrap_or_default()
        })
    }

    /// Returns the `X-Request-Id` header value, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        first_header(&self.headers, "x-request-id")
    }

    /// Returns the `X-Shopify-API-Deprecated-Reason` header value, if present.
    #[must_use]
    pub fn deprecation_reason(&self) -> Option<&str> {
        first_header(&self.headers, "x-shopify-api-deprecated-reason")
    }

    /// Returns `true` if the response indicates a deprecated API endpoint.
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.deprecation_reason().is_some()
    }
}

fn first_header<'a>(headers: &'a HashMap<String, Vec<String>>, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|values| values.first())
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::http_request::{DataType, HttpMethod};
    use serde_json::json;

    fn headers(name: &str, value: &str) -> HashMap<String, Vec<String>> {
        HashMap::from([(name.to_string(), vec![value.to_string()])])
    }

    fn graphql_request() -> HttpRequest {
        HttpRequest::builder(HttpMethod::Post, "graphql")
            .body(json!({"query": "{ shop { id } }"}))
            .body_type(DataType::Json)
            .build()
            .unwrap()
    }

    #[test]
    fn test_is_ok_returns_true_for_2xx() {
        for code in 200..=299 {
            let response = HttpResponse::new(code, HashMap::new(), json!({}));
            assert!(response.is_ok(), "Expected is_ok() to be true for code {code}");
        }
        for code in [400, 404, 429, 500] {
            assert!(!HttpResponse::new(code, HashMap::new(), json!({})).is_ok());
        }
    }

    #[test]
    fn test_api_call_limit_parsing() {
        let limit = ApiCallLimit::parse("40/80").unwrap();
        assert_eq!(limit.request_count, 40);
        assert_eq!(limit.bucket_size, 80);

        assert_eq!(
            ApiCallLimit::parse(" 1/40 "),
            Some(ApiCallLimit {
                request_count: 1,
                bucket_size: 40
            })
        );

        assert!(ApiCallLimit::parse("invalid").is_none());
        assert!(ApiCallLimit::parse("40").is_none());
        assert!(ApiCallLimit::parse("40/").is_none());
        assert!(ApiCallLimit::parse("/80").is_none());
        assert!(ApiCallLimit::parse("abc/def").is_none());
        assert!(ApiCallLimit::parse("1/2/3").is_none());
    }

    #[test]
    fn test_link_header_with_both_relations() {
        let link = r#"<https://shop.myshopify.com/admin/api/2024-10/products.json?limit=50&page_info=abc123>; rel="next", <https://shop.myshopify.com/admin/api/2024-10/products.json?limit=50&page_info=xyz789>; rel="previous""#;
        let info = PaginationInfo::parse_link_header(link);

        let next = info.next.as_ref().unwrap();
        assert_eq!(next.len(), 2);
        assert_eq!(next["page_info"], "abc123");
        assert_eq!(next["limit"], "50");

        let previous = info.previous.as_ref().unwrap();
        assert_eq!(previous["page_info"], "xyz789");

        assert_eq!(info.next_page_info(), Some("abc123"));
        assert_eq!(info.previous_page_info(), Some("xyz789"));
    }

    #[test]
    fn test_link_header_with_single_relation() {
        let link = r#"<https://shop.myshopify.com/admin/api/2024-10/products.json?page_info=abc123>; rel="next""#;
        let info = PaginationInfo::parse_link_header(link);
        assert_eq!(info.next_page_info(), Some("abc123"));
        assert!(info.previous.is_none());
    }

    #[test]
    fn test_link_header_decodes_params_and_tolerates_commas() {
        let link = r#"<https://shop.myshopify.com/admin/api/2024-10/products.json?fields=id,title&page_info=a%3Db%2Bc>; rel="next""#;
        let info = PaginationInfo::parse_link_header(link);
        let next = info.next.unwrap();
        assert_eq!(next["fields"], "id,title");
        assert_eq!(next["page_info"], "a=b+c");
    }

    #[test]
    fn test_link_header_ignores_unknown_relations() {
        let info = PaginationInfo::parse_link_header(r#"<https://example.com/?a=1>; rel="last""#);
        assert_eq!(info, PaginationInfo::default());
        assert_eq!(PaginationInfo::parse_link_header(""), PaginationInfo::default());
    }

    #[test]
    fn test_pagination_from_response_headers() {
        let response = HttpResponse::new(
            200,
            headers(
                "link",
                r#"<https://shop.myshopify.com/admin/api/2024-10/orders.json?page_info=p2>; rel="next""#,
            ),
            json!({"orders": []}),
        );
        assert_eq!(response.pagination().next_page_info(), Some("p2"));

        let response = HttpResponse::new(200, HashMap::new(), json!({}));
        assert!(response.pagination().next.is_none());
    }

    #[test]
    fn test_retry_after_parsing() {
        let response = HttpResponse::new(429, headers("retry-after", "2.5"), json!({}));
        assert!((response.retry_request_after.unwrap() - 2.5).abs() < f64::EPSILON);

        let response = HttpResponse::new(429, headers("retry-after", "soon"), json!({}));
        assert!(response.retry_request_after.is_none());
    }

    #[test]
    fn test_api_call_limit_from_headers() {
        let response = HttpResponse::new(200, headers(API_CALL_LIMIT_HEADER, "12/40"), json!({}));
        assert_eq!(
            response.api_call_limit,
            Some(ApiCallLimit {
                request_count: 12,
                bucket_size: 40
            })
        );
    }

    #[test]
    fn test_user_errors_only_for_graphql_requests() {
        let body = json!({"data": {"x": {"userErrors": [{"field": ["a"], "message": "bad"}]}}});

        let rest = HttpResponse::new(200, HashMap::new(), body.clone());
        assert!(rest.user_errors().is_empty());
        assert_eq!(rest.outcome(), Outcome::Success);

        let graphql = HttpResponse::new(200, HashMap::new(), body).with_request(graphql_request());
        assert_eq!(graphql.user_errors().messages(), vec!["bad [a]"]);
        assert_eq!(graphql.outcome(), Outcome::GraphqlClient);
    }

    #[test]
    fn test_error_message_matches_errors_and_user_errors() {
        let response = HttpResponse::new(
            200,
            HashMap::new(),
            json!({"data": {"webhookSubscriptionCreate": {"userErrors": [
                {"field": ["address"], "message": "Address for this topic has already been taken"}
            ]}}}),
        )
        .with_request(graphql_request());

        let patterns = [MessagePattern::regex("already been taken").unwrap()];
        assert!(response.error_message_matches(&patterns));

        let rest = HttpResponse::new(422, HashMap::new(), json!({"errors": {"handle": "is invalid"}}));
        assert!(rest.error_message_matches(&["is invalid [handle]".into()]));
        assert!(!rest.error_message_matches(&patterns));
    }

    #[test]
    fn test_request_id_and_deprecation_headers() {
        let response = HttpResponse::new(200, headers("x-request-id", "abc-123-xyz"), json!({}));
        assert_eq!(response.request_id(), Some("abc-123-xyz"));
        assert!(!response.is_deprecated());

        let response = HttpResponse::new(
            200,
            headers("x-shopify-api-deprecated-reason", "This endpoint is deprecated"),
            json!({}),
        );
        assert_eq!(
            response.deprecation_reason(),
            Some("This endpoint is deprecated")
        );
        assert!(response.is_deprecated());
    }
}
