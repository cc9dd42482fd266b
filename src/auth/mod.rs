//! Authentication types for the Shopify client.
//!
//! A [`Session`] names the tenant (shop) every request is scoped to and
//! carries the optional Admin API access token sent with it. Obtaining a
//! token (OAuth, token exchange) happens outside this crate.
//!
//! # Example
//!
//! ```rust
//! use shopify_client::{AccessToken, Session, ShopDomain};
//!
//! let session = Session::new(
//!     ShopDomain::new("my-store").unwrap(),
//!     Some(AccessToken::new("shpat_token")),
//! );
//!
//! assert!(session.is_active());
//! assert_eq!(session.shop.as_ref(), "my-store.myshopify.com");
//! ```

pub mod session;

pub use session::Session;
