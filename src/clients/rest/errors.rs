//! REST-specific error types.

use crate::clients::HttpError;
use thiserror::Error;

/// Error type for REST API operations.
///
/// # Example
///
/// ```rust
/// use shopify_client::clients::rest::RestError;
///
/// let error = RestError::InvalidPath { path: "/.json".to_string() };
/// assert_eq!(error.to_string(), "Invalid REST API path: /.json");
/// ```
#[derive(Debug, Error)]
pub enum RestError {
    /// The path is empty once normalized.
    #[error("Invalid REST API path: {path}")]
    InvalidPath {
        /// The invalid path that was provided.
        path: String,
    },

    /// The request failed or was classified as an error.
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl RestError {
    /// Returns the wrapped pipeline error, if any.
    #[must_use]
    pub const fn http_error(&self) -> Option<&HttpError> {
        match self {
            Self::Http(error) => Some(error),
            Self::InvalidPath { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InvalidHttpRequestError;

    #[test]
    fn test_invalid_path_error_includes_path_in_message() {
        let error = RestError::InvalidPath {
            path: String::new(),
        };
        assert_eq!(error.to_string(), "Invalid REST API path: ");
        assert!(error.http_error().is_none());
    }

    #[test]
    fn test_from_http_error_conversion() {
        let error: RestError = HttpError::from(InvalidHttpRequestError::MissingBodyType).into();

        assert!(matches!(error, RestError::Http(_)));
        assert_eq!(
            error.to_string(),
            "Cannot set a body without also setting body_type."
        );
    }
}
