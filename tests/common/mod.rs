//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use shopify_client::{
    AccessToken, ApiVersion, BulkSettings, HostUrl, RetrySettings, Session, ShopDomain,
    ShopifyConfig, ThrottleSettings,
};
use std::time::Duration;
use wiremock::MockServer;

pub const SHOP: &str = "test-shop";
pub const TOKEN: &str = "shpat_test_token";

pub fn session() -> Session {
    Session::new(
        ShopDomain::new(SHOP).unwrap(),
        Some(AccessToken::new(TOKEN)),
    )
}

/// A configuration pointing at `server`, with delays shrunk so tests run
/// in milliseconds.
pub fn config(server: &MockServer) -> ShopifyConfig {
    ShopifyConfig::builder()
        .api_host(HostUrl::new(server.uri()).unwrap())
        .retry(RetrySettings::default().base_interval(Duration::from_millis(5)))
        .throttle(ThrottleSettings::default().min_interval(Duration::ZERO))
        .bulk(
            BulkSettings::default()
                .poll_delay(Duration::from_millis(5))
                .poll_timeout(Duration::from_secs(2)),
        )
        .build()
        .unwrap()
}

/// Path of a REST resource under the default API version.
pub fn rest_path(resource: &str) -> String {
    format!("/admin/api/{}/{resource}.json", ApiVersion::latest())
}

pub fn graphql_path() -> String {
    rest_path("graphql")
}
