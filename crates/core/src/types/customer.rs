//! Customer profile types.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::CustomerId;
use super::mobile::Mobile;

/// Errors that can occur when parsing a [`CustomerName`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// Blank after trimming.
    #[error("Please enter your name")]
    Empty,
}

/// A customer's display name as entered during sign-up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CustomerName(String);

impl CustomerName {
    /// Parse a `CustomerName`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::Empty`] for blank input.
    pub fn parse(s: &str) -> Result<Self, NameError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(NameError::Empty);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A customer profile as returned by the customer API and cached locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "CustomerWire")]
pub struct Customer {
    /// Backend identifier.
    pub id: CustomerId,
    /// Full name; absent until the customer completes the name step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Registered mobile number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<Mobile>,
}

// The backend may send `_id`, `id`, or both.
#[derive(Deserialize)]
struct CustomerWire {
    #[serde(rename = "_id")]
    object_id: Option<CustomerId>,
    id: Option<CustomerId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    mobile: Option<Mobile>,
}

impl TryFrom<CustomerWire> for Customer {
    type Error = &'static str;

    fn try_from(wire: CustomerWire) -> Result<Self, Self::Error> {
        let id = wire.object_id.or(wire.id).ok_or("missing field `_id`")?;
        Ok(Self {
            id,
            name: wire.name,
            mobile: wire.mobile,
        })
    }
}

impl Customer {
    /// The name, if present and not blank.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }

    /// First word of the name.
    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.display_name()?.split_whitespace().next()
    }

    /// Upper-cased first letter of the name, for avatars.
    #[must_use]
    pub fn initial(&self) -> Option<String> {
        self.display_name()?
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
    }

    /// Welcome message shown after login.
    #[must_use]
    pub fn greeting(&self) -> String {
        self.display_name()
            .map_or_else(|| "Welcome!".to_string(), |name| format!("Welcome, {name}!"))
    }
}
