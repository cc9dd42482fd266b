//! Shopify API version definitions.
//!
//! Shopify releases API versions quarterly (January, April, July, October).
//! Versions are ordered chronologically, with `unstable` sorting after every
//! stable release, which lets features declare a minimum version.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Shopify API version.
///
/// # Example
///
/// ```rust
/// use shopify_client::ApiVersion;
///
/// let version: ApiVersion = "2024-10".parse().unwrap();
/// assert_eq!(version.to_string(), "2024-10");
/// assert!(version >= ApiVersion::stable(2019, 10));
/// assert!(ApiVersion::Unstable > ApiVersion::latest());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiVersion {
    /// A stable quarterly release.
    Stable {
        /// Release year, e.g. `2024`.
        year: u16,
        /// Release month: 1, 4, 7 or 10.
        month: u8,
    },
    /// Unstable API version for development and testing.
    Unstable,
}

impl ApiVersion {
    /// The first version that supports bulk operations.
    pub const BULK_OPERATIONS: Self = Self::stable(2019, 10);

    /// Creates a stable version without validating the month.
    #[must_use]
    pub const fn stable(year: u16, month: u8) -> Self {
        Self::Stable { year, month }
    }

    /// Returns the latest stable API version known to this crate.
    #[must_use]
    pub const fn latest() -> Self {
        Self::stable(2025, 10)
    }

    /// Returns `true` for stable releases.
    #[must_use]
    pub const fn is_stable(&self) -> bool {
        matches!(self, Self::Stable { .. })
    }

    /// Fails unless this version is at least `minimum`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedApiVersion`] when `self < minimum`.
    ///
    /// ```rust
    /// use shopify_client::ApiVersion;
    ///
    /// assert!(ApiVersion::stable(2019, 7).require(ApiVersion::BULK_OPERATIONS).is_err());
    /// assert!(ApiVersion::latest().require(ApiVersion::BULK_OPERATIONS).is_ok());
    /// ```
    pub fn require(&self, minimum: Self) -> Result<(), ConfigError> {
        if *self < minimum {
            return Err(ConfigError::UnsupportedApiVersion {
                required: minimum.to_string(),
                configured: self.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::latest()
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable { year, month } => write!(f, "{year:04}-{month:02}"),
            Self::Unstable => f.write_str("unstable"),
        }
    }
}

impl FromStr for ApiVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "unstable" {
            return Ok(Self::Unstable);
        }

        let invalid = || ConfigError::InvalidApiVersion { version: s.clone() };

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let year: u16 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;

        // Quarterly releases only
        if !matches!(month, 1 | 4 | 7 | 10) {
            return Err(invalid());
        }

        Ok(Self::Stable { year, month })
    }
}
