//! Bulk operation error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::bulk::BulkOperationStatus;
use crate::clients::GraphqlError;
use crate::error::ConfigError;

/// Statuses a bounded poll was waiting for, rendered comma separated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AwaitedStatuses(pub Vec<BulkOperationStatus>);

impl fmt::Display for AwaitedStatuses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, status) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{status}")?;
        }
        Ok(())
    }
}

/// Errors raised while running a bulk operation.
///
/// Terminal failure statuses are never retried: `Canceled`, `Expired` and
/// `Failed` reach the caller as-is.
#[derive(Debug, Error)]
pub enum BulkOperationError {
    /// The operation was canceled.
    #[error("Bulk operation {id} was canceled")]
    Canceled {
        /// The operation id.
        id: String,
    },

    /// The operation's result expired before it was downloaded.
    #[error("Bulk operation {id} expired")]
    Expired {
        /// The operation id.
        id: String,
    },

    /// The operation failed on the server.
    #[error("Bulk operation {id} failed ({})", .error_code.as_deref().unwrap_or("unknown error"))]
    Failed {
        /// The operation id.
        id: String,
        /// Shopify's `errorCode`, e.g. `TIMEOUT` or `ACCESS_DENIED`.
        error_code: Option<String>,
    },

    /// Another operation replaced this one as the tenant's current operation.
    #[error("Bulk operation {expected} is obsolete, current operation is {}", .actual.as_deref().unwrap_or("none"))]
    Obsolete {
        /// The id of this operation.
        expected: String,
        /// The id of the current operation, if any.
        actual: Option<String>,
    },

    /// A bounded poll did not observe any of the awaited statuses in time.
    #[error("Exceeded {timeout:?} polling for status {statuses}")]
    Timeout {
        /// The configured bound.
        timeout: Duration,
        /// The awaited statuses.
        statuses: AwaitedStatuses,
    },

    /// A GraphQL request failed.
    #[error(transparent)]
    Graphql(#[from] GraphqlError),

    /// Downloading the result file failed.
    #[error("Failed to download bulk operation result: {0}")]
    Download(#[from] reqwest::Error),

    /// The temporary result file could not be written or read.
    #[error("Bulk operation result I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A result line is not valid JSON.
    #[error("Invalid JSON on line {line} of bulk operation result: {source}")]
    Decode {
        /// 1-based line number in the result file.
        line: usize,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The configured API version does not support bulk operations.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
