//! One-time password types.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OtpCode`] or [`OtpChannel`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    /// Fewer or more than six digits, or a non-digit character.
    #[error("Please enter the complete 6-digit OTP")]
    Incomplete,
    /// Unknown delivery channel.
    #[error("unknown OTP channel: {0} (expected `whatsapp` or `sms`)")]
    UnknownChannel(String),
}

/// A six-digit one-time password.
///
/// `Debug` does not print the digits.
///
/// ```
/// use flow_hydration_core::OtpCode;
///
/// assert!(OtpCode::parse("123456").is_ok());
/// assert!(OtpCode::parse("12345").is_err());
/// assert!(OtpCode::parse("12a456").is_err());
/// ```
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct OtpCode(String);

impl OtpCode {
    /// Number of digits in an OTP.
    pub const LENGTH: usize = 6;

    /// Parse an `OtpCode`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Incomplete`] unless the input is exactly six ASCII digits.
    pub fn parse(s: &str) -> Result<Self, OtpError> {
        let s = s.trim();
        if s.len() != Self::LENGTH || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OtpError::Incomplete);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode([REDACTED])")
    }
}

impl std::str::FromStr for OtpCode {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Delivery channel for the OTP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
    #[default]
    WhatsApp,
    Sms,
}

impl OtpChannel {
    /// Wire value sent to the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WhatsApp => "whatsapp",
            Self::Sms => "sms",
        }
    }
}

impl fmt::Display for OtpChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OtpChannel {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whatsapp" => Ok(Self::WhatsApp),
            "sms" => Ok(Self::Sms),
            other => Err(OtpError::UnknownChannel(other.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_code() {
        let code = OtpCode::parse(" 012345 ").unwrap();
        assert_eq!(code.as_str(), "012345");
    }

    #[test]
    fn test_parse_invalid_codes() {
        for input in ["", "12345", "1234567", "12345a", "١٢٣٤٥٦"] {
            assert_eq!(OtpCode::parse(input), Err(OtpError::Incomplete), "{input}");
        }
    }

    #[test]
    fn test_debug_redacts_code() {
        let code = OtpCode::parse("424242").unwrap();
        assert!(!format!("{code:?}").contains("424242"));
    }

    #[test]
    fn test_channel_wire_format() {
        assert_eq!(
            serde_json::to_string(&OtpChannel::WhatsApp).unwrap(),
            "\"whatsapp\""
        );
        assert_eq!(serde_json::to_string(&OtpChannel::Sms).unwrap(), "\"sms\"");
        assert_eq!(OtpChannel::default(), OtpChannel::WhatsApp);
    }

    #[test]
    fn test_channel_from_str() {
        assert_eq!("SMS".parse::<OtpChannel>().unwrap(), OtpChannel::Sms);
        assert_eq!(
            "whatsapp".parse::<OtpChannel>().unwrap(),
            OtpChannel::WhatsApp
        );
        assert!(matches!(
            "email".parse::<OtpChannel>(),
            Err(OtpError::UnknownChannel(_))
        ));
    }
}
