//! Mobile number type.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Indian mobile numbers: ten digits, leading 6-9.
static MOBILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Static pattern, covered by tests
    Regex::new(r"^[6-9]\d{9}$").expect("mobile pattern is valid")
});

/// Errors that can occur when parsing a [`Mobile`].
///
/// The display strings are shown to the customer as-is.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MobileError {
    /// The input is empty or not exactly ten characters long.
    #[error("Please enter a valid 10-digit mobile number")]
    InvalidLength,
    /// Ten characters, but not an Indian mobile number.
    #[error("Please enter a valid Indian mobile number")]
    InvalidFormat,
}

/// A validated Indian mobile number.
///
/// ## Constraints
///
/// - Exactly 10 characters
/// - All ASCII digits
/// - First digit is 6, 7, 8 or 9
///
/// ## Examples
///
/// ```
/// use flow_hydration_core::Mobile;
///
/// assert!(Mobile::parse("9876543210").is_ok());
/// assert!(Mobile::parse(" 9876543210 ").is_ok()); // surrounding whitespace is trimmed
///
/// assert!(Mobile::parse("").is_err());           // empty
/// assert!(Mobile::parse("98765").is_err());      // too short
/// assert!(Mobile::parse("1234567890").is_err()); // wrong leading digit
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Mobile(String);

impl Mobile {
    /// Required length of a mobile number.
    pub const LENGTH: usize = 10;

    /// Parse a `Mobile` from user input, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`MobileError::InvalidLength`] if the trimmed input is not ten
    /// characters, and [`MobileError::InvalidFormat`] if it does not match
    /// `[6-9]` followed by nine digits.
    pub fn parse(s: &str) -> Result<Self, MobileError> {
        let s = s.trim();

        if s.chars().count() != Self::LENGTH {
            return Err(MobileError::InvalidLength);
        }

        if !MOBILE_PATTERN.is_match(s) {
            return Err(MobileError::InvalidFormat);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the mobile number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Mobile` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the number with all but the last four digits masked, for logs.
    #[must_use]
    pub fn masked(&self) -> String {
        let visible = self.0.get(Self::LENGTH - 4..).unwrap_or_default();
        format!("******{visible}")
    }
}

impl fmt::Display for Mobile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Mobile {
    type Err = MobileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Mobile {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
