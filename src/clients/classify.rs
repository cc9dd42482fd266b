//! Response classification.
//!
//! [`classify`] maps a status code and decoded body to an [`Outcome`]. It is
//! a pure function: the pipeline turns non-success outcomes into the
//! matching [`HttpError`](crate::clients::HttpError) variant.
//!
//! | Status | Outcome |
//! |---|---|
//! | 401 with an "access token" message | [`Outcome::InvalidAccessToken`] |
//! | 402 | [`Outcome::Shop`] ([`ShopState::Frozen`]) |
//! | 403 with an "unavailable shop" message | [`Outcome::Shop`] ([`ShopState::Unavailable`]) |
//! | 423 | [`Outcome::Shop`] ([`ShopState::Locked`]) |
//! | 430 | [`Outcome::TooManyRequests`] |
//! | other 4xx | [`Outcome::Client`] |
//! | 5xx | [`Outcome::Server`] |
//! | 200 GraphQL with `errors` or `userErrors` | [`Outcome::GraphqlClient`] |

use crate::clients::response_errors::ResponseErrors;
use serde_json::Value;
use std::fmt;

/// Why a shop refused a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShopState {
    /// The shop is frozen, awaiting payment (402).
    Frozen,
    /// The shop is unavailable (403).
    Unavailable,
    /// The shop is locked (423).
    Locked,
}

impl fmt::Display for ShopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frozen => f.write_str("frozen, awaiting payment"),
            Self::Unavailable => f.write_str("unavailable"),
            Self::Locked => f.write_str("locked"),
        }
    }
}

/// The classified result of a completed HTTP exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The request succeeded.
    Success,
    /// A 4xx response without a more specific meaning.
    Client,
    /// The access token was rejected (401).
    InvalidAccessToken,
    /// The shop cannot serve requests.
    Shop(ShopState),
    /// Application-level over-use (430).
    TooManyRequests,
    /// A 5xx response.
    Server,
    /// A successful GraphQL response that carries errors.
    GraphqlClient,
}

impl Outcome {
    /// Returns `true` for [`Outcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns `true` for every 4xx outcome and GraphQL client errors.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Client
                | Self::InvalidAccessToken
                | Self::Shop(_)
                | Self::TooManyRequests
                | Self::GraphqlClient
        )
    }
}

/// Classifies a response.
///
/// `graphql` marks responses to GraphQL requests, which report logical
/// failures with a 200 status.
///
/// # Example
///
/// ```rust
/// use shopify_client::clients::{classify, Outcome, ShopState};
/// use serde_json::json;
///
/// assert_eq!(classify(200, &json!({"shop": {}}), false), Outcome::Success);
/// assert_eq!(classify(423, &json!({}), false), Outcome::Shop(ShopState::Locked));
/// assert_eq!(
///     classify(200, &json!({"errors": [{"message": "boom"}]}), true),
///     Outcome::GraphqlClient
/// );
/// ```
#[must_use]
pub fn classify(status: u16, body: &Value, graphql: bool) -> Outcome {
    match status {
        401 if any_message_contains(body, graphql, "access token") => Outcome::InvalidAccessToken,
        402 => Outcome::Shop(ShopState::Frozen),
        403 if any_message_contains(body, graphql, "unavailable shop") => {
            Outcome::Shop(ShopState::Unavailable)
        }
        423 => Outcome::Shop(ShopState::Locked),
        430 => Outcome::TooManyRequests,
        400..=499 => Outcome::Client,
        500..=599 => Outcome::Server,
        _ if graphql
            && (!ResponseErrors::from_body(body).is_empty()
                || !ResponseErrors::user_errors_from_body(body).is_empty()) =>
        {
            Outcome::GraphqlClient
        }
        _ => Outcome::Success,
    }
}

fn any_message_contains(body: &Value, graphql: bool, needle: &str) -> bool {
    let errors = ResponseErrors::from_body(body);
    let user_errors = if graphql {
        ResponseErrors::user_errors_from_body(body)
    } else {
        ResponseErrors::default()
    };

    let contains = |list: &ResponseErrors| {
        list.iter()
            .any(|error| error.to_string().to_lowercase().contains(needle))
    };
    contains(&errors) || contains(&user_errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_error_status_has_exactly_one_outcome() {
        let body = json!({});
        for status in 400..=599_u16 {
            let outcome = classify(status, &body, false);
            let expected = match status {
                402 => Outcome::Shop(ShopState::Frozen),
                423 => Outcome::Shop(ShopState::Locked),
                430 => Outcome::TooManyRequests,
                400..=499 => Outcome::Client,
                _ => Outcome::Server,
            };
            assert_eq!(outcome, expected, "status {status}");
        }
    }

    #[test]
    fn test_401_depends_on_access_token_message() {
        let matching = json!({"errors": "[API] Invalid API key or Access Token (unrecognized login)"});
        assert_eq!(classify(401, &matching, false), Outcome::InvalidAccessToken);

        let other = json!({"errors": "Unauthorized"});
        assert_eq!(classify(401, &other, false), Outcome::Client);
    }

    #[test]
    fn test_403_depends_on_unavailable_shop_message() {
        let matching = json!({"errors": "Unavailable Shop"});
        assert_eq!(
            classify(403, &matching, false),
            Outcome::Shop(ShopState::Unavailable)
        );

        let other = json!({"errors": "Forbidden"});
        assert_eq!(classify(403, &other, false), Outcome::Client);
    }

    #[test]
    fn test_402_and_423_ignore_body() {
        let body = json!({"errors": "anything"});
        assert_eq!(classify(402, &body, false), Outcome::Shop(ShopState::Frozen));
        assert_eq!(classify(423, &body, true), Outcome::Shop(ShopState::Locked));
    }

    #[test]
    fn test_graphql_errors_reclassify_success() {
        let top_level = json!({"errors": [{"message": "Throttled"}]});
        assert_eq!(classify(200, &top_level, true), Outcome::GraphqlClient);

        let user_errors = json!({"data": {"productCreate": {
            "product": null,
            "userErrors": [{"field": ["title"], "message": "can't be blank"}]
        }}});
        assert_eq!(classify(200, &user_errors, true), Outcome::GraphqlClient);
    }

    #[test]
    fn test_graphql_without_errors_is_success() {
        let empty_user_errors = json!({"data": {"productCreate": {"userErrors": []}}});
        assert_eq!(classify(200, &empty_user_errors, true), Outcome::Success);

        let plain = json!({"data": {"shop": {"name": "Test"}}});
        assert_eq!(classify(200, &plain, true), Outcome::Success);
    }

    #[test]
    fn test_rest_success_with_errors_key_is_not_reclassified() {
        let body = json!({"errors": "ignored for REST"});
        assert_eq!(classify(200, &body, false), Outcome::Success);
        assert_eq!(classify(201, &body, false), Outcome::Success);
    }

    #[test]
    fn test_outcome_is_client_error() {
        assert!(Outcome::Client.is_client_error());
        assert!(Outcome::InvalidAccessToken.is_client_error());
        assert!(Outcome::Shop(ShopState::Locked).is_client_error());
        assert!(Outcome::TooManyRequests.is_client_error());
        assert!(Outcome::GraphqlClient.is_client_error());
        assert!(!Outcome::Server.is_client_error());
        assert!(!Outcome::Success.is_client_error());
        assert!(Outcome::Success.is_success());
    }

    #[test]
    fn test_shop_state_display() {
        assert_eq!(ShopState::Frozen.to_string(), "frozen, awaiting payment");
        assert_eq!(ShopState::Unavailable.to_string(), "unavailable");
        assert_eq!(ShopState::Locked.to_string(), "locked");
    }
}
