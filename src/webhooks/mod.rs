//! Incoming webhook payloads and webhook subscription helpers.
//!
//! A [`Webhook`] wraps the raw body of a delivery together with the shop and
//! topic taken from the request headers. The body is decoded on first access
//! and cached; a body that is not valid JSON decodes to an empty object.
//!
//! # Example
//!
//! ```rust
//! use shopify_client::webhooks::Webhook;
//! use shopify_client::ShopDomain;
//!
//! let shop = ShopDomain::new("my-store").unwrap();
//! let webhook = Webhook::new(shop, "orders/create", r#"{"id": 1}"#);
//!
//! assert_eq!(webhook.data()["id"], 1);
//! assert_eq!(webhook.topic(), "orders/create");
//! ```

use std::fmt;
use std::sync::OnceLock;

use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use thiserror::Error;

use crate::clients::{MessagePattern, RestClient, RestError};
use crate::config::{ShopDomain, ShopifyConfig};

/// Header carrying the shop domain of a delivery.
pub const SHOP_DOMAIN_HEADER: &str = "X-Shopify-Shop-Domain";

/// Header carrying the topic of a delivery.
pub const TOPIC_HEADER: &str = "X-Shopify-Topic";

/// A received webhook delivery.
#[derive(Clone)]
pub struct Webhook {
    shop: ShopDomain,
    topic: String,
    raw_data: String,
    data: OnceLock<Value>,
}

impl Webhook {
    /// Creates a webhook from its shop, topic and raw body.
    pub fn new(shop: ShopDomain, topic: impl Into<String>, raw_data: impl Into<String>) -> Self {
        Self {
            shop,
            topic: topic.into(),
            raw_data: raw_data.into(),
            data: OnceLock::new(),
        }
    }

    /// The shop the delivery belongs to.
    #[must_use]
    pub const fn shop(&self) -> &ShopDomain {
        &self.shop
    }

    /// The topic, e.g. `orders/create`.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The body as received.
    #[must_use]
    pub fn raw_data(&self) -> &str {
        &self.raw_data
    }

    /// The decoded body, or an empty object if the body is not valid JSON.
    pub fn data(&self) -> &Value {
        self.data.get_or_init(|| {
            serde_json::from_str(&self.raw_data).unwrap_or_else(|error| {
                tracing::warn!(
                    shop = %self.shop,
                    topic = %self.topic,
                    %error,
                    "Webhook body is not valid JSON"
                );
                json!({})
            })
        })
    }

    /// Returns the webhook as a JSON object with `shop`, `topic` and `data`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "shop": self.shop.as_ref(),
            "topic": self.topic,
            "data": self.data(),
        })
    }
}

impl Serialize for Webhook {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Debug for Webhook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Webhook")
            .field("shop", &self.shop)
            .field("topic", &self.topic)
            .field("raw_data", &self.raw_data)
            .finish_non_exhaustive()
    }
}

/// Errors raised by webhook subscription helpers.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No `webhook_uri` is configured.
    #[error("Webhook URI is not configured")]
    MissingWebhookUri,

    /// The request failed.
    #[error(transparent)]
    Rest(#[from] RestError),
}

fn already_taken() -> &'static [MessagePattern] {
    static PATTERNS: OnceLock<Vec<MessagePattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        MessagePattern::regex("has already been taken")
            .map(|pattern| vec![pattern])
            .unwrap_or_default()
    })
}

/// Subscribes the shop to `topic`, delivering to the configured
/// `webhook_uri`.
///
/// An existing subscription for the same topic and address is not an error.
/// `fields` restricts the delivered payload when not empty.
///
/// # Errors
///
/// Returns [`WebhookError::MissingWebhookUri`] without a configured URI and
/// [`WebhookError::Rest`] if the request fails.
pub async fn create_webhook(
    client: &RestClient,
    config: &ShopifyConfig,
    topic: &str,
    fields: &[&str],
) -> Result<(), WebhookError> {
    let address = config
        .webhook_uri()
        .ok_or(WebhookError::MissingWebhookUri)?;

    let mut webhook = json!({ "topic": topic, "address": address.as_ref() });
    if !fields.is_empty() {
        webhook["fields"] = json!(fields);
    }

    match client.post("webhooks", json!({ "webhook": webhook }), None).await {
        Ok(_) => Ok(()),
        Err(RestError::Http(error)) if error.message_matches(already_taken()) => {
            tracing::debug!(shop = %client.http_client().shop(), topic, "Webhook already exists");
            Ok(())
        }
        Err(error) => Err(error.into()),
    }
}

/// Deletes the webhook subscription `id`.
///
/// # Errors
///
/// Returns [`WebhookError::Rest`] if the request fails.
pub async fn delete_webhook(client: &RestClient, id: u64) -> Result<(), WebhookError> {
    client
        .delete(&format!("webhooks/{id}"), None)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop() -> ShopDomain {
        ShopDomain::new("my-store").unwrap()
    }

    #[test]
    fn test_data_decodes_lazily() {
        let webhook = Webhook::new(shop(), "products/update", r#"{"id": 7, "title": "Hat"}"#);
        assert!(webhook.data.get().is_none());

        assert_eq!(webhook.data()["title"], "Hat");
        assert!(webhook.data.get().is_some());
    }

    #[test]
    fn test_invalid_body_decodes_to_empty_object() {
        let webhook = Webhook::new(shop(), "orders/create", "not json");

        assert_eq!(webhook.data(), &json!({}));
        assert_eq!(webhook.raw_data(), "not json");
    }

    #[test]
    fn test_to_json_and_serialize() {
        let webhook = Webhook::new(shop(), "app/uninstalled", r#"{"id": 1}"#);
        let expected = json!({
            "shop": "my-store.myshopify.com",
            "topic": "app/uninstalled",
            "data": {"id": 1},
        });

        assert_eq!(webhook.to_json(), expected);
        assert_eq!(serde_json::to_value(&webhook).unwrap(), expected);
    }

    #[test]
    fn test_already_taken_pattern() {
        assert!(already_taken()
            .iter()
            .any(|pattern| pattern.is_match("has already been taken [address]")));
    }
}
