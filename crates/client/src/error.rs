//! Client error types.

use flow_hydration_core::{MobileError, NameError, OtpError};
use thiserror::Error;

/// Errors from customer API operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// The API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Remote { status: u16, message: String },

    /// An authenticated call returned 401; the session has been cleared.
    #[error("session expired, please log in again")]
    AuthExpired,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An endpoint URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// Text suitable for showing to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Remote { message, .. } => message.clone(),
            Self::AuthExpired => "Your session has expired. Please log in again.".to_string(),
            Self::Http(_) | Self::Url(_) => {
                "Could not reach the server. Please check your connection.".to_string()
            }
        }
    }

    /// Whether this is a client-side validation failure.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<MobileError> for ClientError {
    fn from(err: MobileError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<OtpError> for ClientError {
    fn from(err: OtpError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<NameError> for ClientError {
    fn from(err: NameError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_keep_user_text() {
        let err = ClientError::from(MobileError::InvalidFormat);
        assert!(err.is_validation());
        assert_eq!(err.user_message(), "Please enter a valid Indian mobile number");
        assert_eq!(err.to_string(), "Please enter a valid Indian mobile number");
    }

    #[test]
    fn test_remote_error_user_message_is_server_text() {
        let err = ClientError::Remote {
            status: 400,
            message: "Invalid OTP".to_string(),
        };
        assert_eq!(err.user_message(), "Invalid OTP");
        assert_eq!(err.to_string(), "API error: 400 - Invalid OTP");
    }
}
