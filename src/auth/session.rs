//! Tenant sessions for Shopify API calls.

use crate::config::{AccessToken, ShopDomain};
use chrono::{DateTime, Utc};

/// The tenant and credential a client issues requests for.
///
/// The access token is optional: public endpoints and some test setups need
/// no credential. When present it is sent as `X-Shopify-Access-Token`.
///
/// # Thread Safety
///
/// `Session` is `Send + Sync`, making it safe to share across threads.
#[derive(Clone, Debug)]
pub struct Session {
    /// The shop this session is for. Also the tenant key for rate limiting.
    pub shop: ShopDomain,

    /// The access token for API authentication.
    pub access_token: Option<AccessToken>,

    /// When the access token expires, if applicable.
    pub expires: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates a session that never expires.
    #[must_use]
    pub const fn new(shop: ShopDomain, access_token: Option<AccessToken>) -> Self {
        Self {
            shop,
            access_token,
            expires: None,
        }
    }

    /// Sets the expiry of the access token.
    #[must_use]
    pub const fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Returns `true` if this session has expired.
    ///
    /// Sessions without an expiration time are considered never expired.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.expires.is_some_and(|expires| Utc::now() > expires)
    }

    /// Returns `true` if this session has a non-empty token and is not expired.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.access_token
            .as_ref()
            .is_some_and(|token| !token.as_ref().is_empty())
            && !self.expired()
    }
}

// Verify Session is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Session>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn shop() -> ShopDomain {
        ShopDomain::new("shop").unwrap()
    }

    #[test]
    fn test_session_expired() {
        let expired = Session::new(shop(), Some(AccessToken::new("token")))
            .with_expires(Utc::now() - Duration::hours(1));
        assert!(expired.expired());
        assert!(!expired.is_active());

        let valid = Session::new(shop(), Some(AccessToken::new("token")))
            .with_expires(Utc::now() + Duration::hours(1));
        assert!(!valid.expired());
        assert!(valid.is_active());
    }

    #[test]
    fn test_session_without_token_is_inactive() {
        assert!(!Session::new(shop(), None).is_active());
        assert!(!Session::new(shop(), Some(AccessToken::new(""))).is_active());
    }

    #[test]
    fn test_session_debug_masks_token() {
        let session = Session::new(shop(), Some(AccessToken::new("shpat_secret")));
        let debug = format!("{session:?}");
        assert!(debug.contains("shop.myshopify.com"));
        assert!(!debug.contains("shpat_secret"));
    }
}
