//! Bulk operations: server-side exports of large query results.
//!
//! A bulk query runs asynchronously on Shopify's side. [`BulkOperation`]
//! drives its lifecycle:
//!
//! ```text
//! CREATED -> RUNNING -> COMPLETED | FAILED | CANCELED | EXPIRED
//!                 \-> CANCELING -> CANCELED
//! ```
//!
//! 1. [`BulkOperation::submit`] clears any operation still in progress for
//!    the shop, then starts the query.
//! 2. [`BulkOperation::wait`] polls until a terminal status.
//! 3. [`BulkOperation::call`] additionally downloads the result file and
//!    returns a [`BulkRecords`] stream decoding it one line at a time.
//!
//! Terminal failures are never retried; they surface as
//! [`BulkOperationError`] variants.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//! use shopify_client::bulk;
//!
//! let mut products = bulk::run(&client, "{ products { edges { node { id } } } }").await?;
//! while let Some(product) = products.try_next().await? {
//!     println!("{}", product["id"]);
//! }
//! ```

mod errors;
mod jsonl;
mod operation;

pub use errors::{AwaitedStatuses, BulkOperationError};
pub use jsonl::BulkRecords;
pub use operation::{BulkOperation, BulkOperationSnapshot, BulkOperationStatus};

use crate::clients::GraphqlClient;

/// Submits `query` and streams its result records once it completes.
///
/// # Errors
///
/// Any error of [`BulkOperation::submit`] or [`BulkOperation::call`].
pub async fn run(client: &GraphqlClient, query: &str) -> Result<BulkRecords, BulkOperationError> {
    BulkOperation::submit(client, query).await?.call().await
}
