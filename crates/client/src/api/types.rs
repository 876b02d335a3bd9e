//! Request and response bodies for the customer API.

use flow_hydration_core::{Cart, Customer, Mobile, OtpChannel};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct SendOtpRequest<'a> {
    pub mobile: &'a str,
    pub channel: OtpChannel,
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifyOtpRequest<'a> {
    pub mobile: &'a str,
    pub otp: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateNameRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CartRequest<'a> {
    pub cart: &'a Cart,
}

/// Result of requesting an OTP.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpResponse {
    /// No account exists yet for this mobile.
    #[serde(default)]
    pub is_new_customer: bool,
    /// The code itself; only returned by non-production deployments.
    #[serde(default)]
    pub otp: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerifyOtpBody {
    pub token: String,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub needs_name: bool,
}

/// Result of a successful OTP verification.
#[derive(Debug, Clone)]
pub struct VerifiedLogin {
    /// Bearer token for subsequent calls.
    pub token: SecretString,
    /// Profile of the logged-in customer, when the API includes it.
    pub customer: Option<Customer>,
    /// The account has no name yet and the flow should ask for one.
    pub needs_name: bool,
    /// Mobile the code was verified for.
    pub mobile: Mobile,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CustomerEnvelope {
    #[serde(default)]
    pub customer: Option<Customer>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CartEnvelope {
    #[serde(default)]
    pub cart: Option<Cart>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_send_otp_request_shape() {
        let json = serde_json::to_value(SendOtpRequest {
            mobile: "9876543210",
            channel: OtpChannel::Sms,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"mobile": "9876543210", "channel": "sms"}));
    }

    #[test]
    fn test_verify_request_omits_missing_name() {
        let json = serde_json::to_value(VerifyOtpRequest {
            mobile: "9876543210",
            otp: "123456",
            name: None,
        })
        .unwrap();
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_send_otp_response_defaults() {
        let parsed: SendOtpResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(!parsed.is_new_customer);
        assert!(parsed.otp.is_none());

        let parsed: SendOtpResponse =
            serde_json::from_str(r#"{"isNewCustomer":true,"otp":"111222"}"#).unwrap();
        assert!(parsed.is_new_customer);
        assert_eq!(parsed.otp.as_deref(), Some("111222"));
    }

    #[test]
    fn test_cart_envelope_tolerates_missing_cart() {
        let parsed: CartEnvelope = serde_json::from_str("{}").unwrap();
        assert!(parsed.cart.is_none());
        let parsed: CartEnvelope = serde_json::from_str(r#"{"cart":[]}"#).unwrap();
        assert!(parsed.cart.unwrap().is_empty());
    }
}
