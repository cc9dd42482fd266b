//! GraphQL-specific error types.

use crate::clients::HttpError;
use thiserror::Error;

/// Error type for GraphQL API operations.
///
/// GraphQL-level failures (top-level `errors`, mutation `userErrors`) are
/// classified by the pipeline and arrive as
/// [`HttpError::GraphqlClient`] inside [`GraphqlError::Http`].
///
/// # Example
///
/// ```rust
/// use shopify_client::clients::graphql::GraphqlError;
///
/// let error = GraphqlError::UnexpectedShape {
///     reason: "response has no data object".to_string(),
/// };
/// assert_eq!(
///     error.to_string(),
///     "Unexpected GraphQL response: response has no data object"
/// );
/// ```
#[derive(Debug, Error)]
pub enum GraphqlError {
    /// The request failed or was classified as an error.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The response body does not have the expected structure.
    #[error("Unexpected GraphQL response: {reason}")]
    UnexpectedShape {
        /// What was missing or malformed.
        reason: String,
    },
}

impl GraphqlError {
    /// Returns the wrapped pipeline error, if any.
    #[must_use]
    pub const fn http_error(&self) -> Option<&HttpError> {
        match self {
            Self::Http(error) => Some(error),
            Self::UnexpectedShape { .. } => None,
        }
    }
}
