//! Flow Hydration customer API client.
//!
//! Covers OTP login, profile management and the server-side cart. Every call
//! attaches the stored bearer token when there is one. A 401 from any call
//! clears the session before returning [`ClientError::AuthExpired`], so the
//! caller drops to the anonymous state without further bookkeeping.
//!
//! # Example
//!
//! ```rust,ignore
//! use flow_hydration_client::{AuthClient, ClientConfig, SessionStore};
//!
//! let client = AuthClient::new(config, session.clone())?;
//!
//! let sent = client.send_otp("9876543210", OtpChannel::WhatsApp).await?;
//! let login = client.verify_otp(&mobile, "123456", None).await?;
//! session.set_token(&login.token);
//! ```

mod types;

pub use types::{SendOtpResponse, VerifiedLogin};

use std::sync::Arc;

use flow_hydration_core::{Cart, Customer, CustomerName, Mobile, OtpChannel, OtpCode};
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::instrument;

use self::types::{
    CartEnvelope, CartRequest, CustomerEnvelope, ErrorBody, SendOtpRequest, UpdateNameRequest,
    VerifyOtpBody, VerifyOtpRequest,
};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::session::SessionStore;

/// Client for the customer API.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<AuthClientInner>,
}

struct AuthClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    session: SessionStore,
}

impl AuthClient {
    /// Create a new customer API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: ClientConfig, session: SessionStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("flow-hydration-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(AuthClientInner {
                http,
                config,
                session,
            }),
        })
    }

    /// The session this client reads tokens from and clears on 401.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    // =========================================================================
    // OTP Login
    // =========================================================================

    /// Request an OTP for `mobile` over `channel`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` without touching the network if the
    /// mobile is not a valid Indian number, and `ClientError::Remote` if the
    /// API rejects the request.
    #[instrument(skip_all, fields(channel = %channel))]
    pub async fn send_otp(&self, mobile: &str, channel: OtpChannel) -> Result<SendOtpResponse> {
        let mobile = Mobile::parse(mobile)?;
        tracing::debug!(mobile = %mobile.masked(), "Requesting OTP");

        let request = self
            .inner
            .http
            .post(self.inner.config.endpoint("send-otp")?)
            .json(&SendOtpRequest {
                mobile: mobile.as_str(),
                channel,
            });

        let response = request.send().await?;
        let sent: SendOtpResponse = read_json(response, "Failed to send OTP").await?;

        if let Some(otp) = &sent.otp {
            tracing::debug!(otp = %otp, "Development OTP returned by API");
        }
        tracing::info!(
            mobile = %mobile.masked(),
            is_new_customer = sent.is_new_customer,
            "OTP sent"
        );
        Ok(sent)
    }

    /// Request a fresh OTP.
    ///
    /// Same request as [`send_otp`](Self::send_otp); the resend cooldown is
    /// tracked by the login flow.
    ///
    /// # Errors
    ///
    /// See [`send_otp`](Self::send_otp).
    pub async fn resend_otp(&self, mobile: &str, channel: OtpChannel) -> Result<SendOtpResponse> {
        tracing::debug!("Resending OTP");
        self.send_otp(mobile, channel).await
    }

    /// Verify a six-digit code, optionally registering the customer's name.
    ///
    /// Does not persist anything; the caller stores the returned token.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if `otp` is not six digits and
    /// `ClientError::Remote` carrying the server message if verification fails.
    #[instrument(skip_all, fields(mobile = %mobile.masked()))]
    pub async fn verify_otp(
        &self,
        mobile: &Mobile,
        otp: &str,
        name: Option<&str>,
    ) -> Result<VerifiedLogin> {
        let otp = OtpCode::parse(otp)?;
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        let response = self
            .inner
            .http
            .post(self.inner.config.endpoint("verify-otp")?)
            .json(&VerifyOtpRequest {
                mobile: mobile.as_str(),
                otp: otp.as_str(),
                name,
            })
            .send()
            .await?;

        let body: VerifyOtpBody = read_json(response, "Verification failed").await?;
        tracing::info!(needs_name = body.needs_name, "OTP verified");

        Ok(VerifiedLogin {
            token: SecretString::from(body.token),
            customer: body.customer,
            needs_name: body.needs_name,
            mobile: mobile.clone(),
        })
    }

    // =========================================================================
    // Session & Profile
    // =========================================================================

    /// Check whether the stored token is still valid.
    ///
    /// Never fails: without a token this returns `false` immediately, and a
    /// rejected token or unreachable server clears the session and returns
    /// `false`. On success the returned profile, if any, is cached.
    #[instrument(skip_all)]
    pub async fn check_auth(&self) -> bool {
        let Some(token) = self.inner.session.get_token() else {
            return false;
        };

        let endpoint = match self.inner.config.endpoint("check-auth") {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid check-auth URL");
                return false;
            }
        };

        let response = self
            .inner
            .http
            .get(endpoint)
            .bearer_auth(token.expose_secret())
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                let envelope: CustomerEnvelope = response.json().await.unwrap_or_default();
                if let Some(customer) = envelope.customer {
                    self.inner.session.set_customer(&customer);
                }
                true
            }
            Ok(response) => {
                tracing::info!(status = %response.status(), "Stored session rejected, clearing");
                self.inner.session.clear();
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Auth check failed, clearing session");
                self.inner.session.clear();
                false
            }
        }
    }

    /// Fetch and cache the customer's profile.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AuthExpired` (after clearing the session) on 401
    /// and `ClientError::Remote` on any other failure status.
    #[instrument(skip_all)]
    pub async fn get_profile(&self) -> Result<Customer> {
        let request = self.inner.http.get(self.inner.config.endpoint("profile")?);
        let response = self.send_authorized(request).await?;
        let status = response.status();

        let envelope: CustomerEnvelope = read_json(response, "Failed to load profile")
            .await
            .map_err(|err| match err {
                ClientError::Remote { status, .. } => ClientError::Remote {
                    status,
                    message: "Failed to load profile".to_string(),
                },
                other => other,
            })?;

        let customer = envelope.customer.ok_or_else(|| ClientError::Remote {
            status: status.as_u16(),
            message: "Failed to load profile".to_string(),
        })?;

        self.inner.session.set_customer(&customer);
        Ok(customer)
    }

    /// Set the customer's name and cache the updated profile.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a blank name,
    /// `ClientError::AuthExpired` on 401 and `ClientError::Remote` otherwise.
    #[instrument(skip_all)]
    pub async fn update_name(&self, name: &str) -> Result<Customer> {
        let name = CustomerName::parse(name)?;

        let request = self
            .inner
            .http
            .post(self.inner.config.endpoint("update-name")?)
            .json(&UpdateNameRequest {
                name: name.as_str(),
            });
        let response = self.send_authorized(request).await?;
        let status = response.status();
        let envelope: CustomerEnvelope = read_json(response, "Failed to update name").await?;

        // Older API builds answer with `{success: true}` only.
        let customer = envelope
            .customer
            .or_else(|| {
                self.inner.session.get_customer().map(|mut cached| {
                    cached.name = Some(name.as_str().to_string());
                    cached
                })
            })
            .ok_or_else(|| ClientError::Remote {
                status: status.as_u16(),
                message: "Failed to update name".to_string(),
            })?;

        self.inner.session.set_customer(&customer);
        tracing::info!("Customer name updated");
        Ok(customer)
    }

    // =========================================================================
    // Server Cart
    // =========================================================================

    /// Fetch the server-held cart; a response without a cart reads as empty.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AuthExpired` on 401, `ClientError::Remote` on any
    /// other failure status, and `ClientError::Http` on transport errors.
    #[instrument(skip_all)]
    pub async fn fetch_cart(&self) -> Result<Cart> {
        let request = self.inner.http.get(self.inner.config.endpoint("cart")?);
        let response = self.send_authorized(request).await?;
        let envelope: CartEnvelope = read_json(response, "Failed to load cart").await?;
        Ok(envelope.cart.unwrap_or_default())
    }

    /// Replace the server-held cart, returning the server's normalised copy.
    ///
    /// # Errors
    ///
    /// As [`fetch_cart`](Self::fetch_cart).
    #[instrument(skip_all, fields(lines = cart.len()))]
    pub async fn put_cart(&self, cart: &Cart) -> Result<Cart> {
        let request = self
            .inner
            .http
            .put(self.inner.config.endpoint("cart")?)
            .json(&CartRequest { cart });
        let response = self.send_authorized(request).await?;
        let envelope: CartEnvelope = read_json(response, "Failed to sync cart").await?;
        Ok(envelope.cart.unwrap_or_else(|| cart.clone()))
    }

    /// Delete the server-held cart.
    ///
    /// # Errors
    ///
    /// As [`fetch_cart`](Self::fetch_cart).
    #[instrument(skip_all)]
    pub async fn delete_cart(&self) -> Result<()> {
        let request = self.inner.http.delete(self.inner.config.endpoint("cart")?);
        let response = self.send_authorized(request).await?;
        ensure_success(response, "Failed to clear cart").await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Attach the bearer token, send, and turn a 401 into a cleared session.
    async fn send_authorized(&self, request: RequestBuilder) -> Result<Response> {
        let request = match self.inner.session.get_token() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };

        let response = request.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!("API rejected session token, clearing session");
            self.inner.session.clear();
            return Err(ClientError::AuthExpired);
        }

        Ok(response)
    }
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("api_base_url", &self.inner.config.api_base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Decode a success body, or map a failure status to `ClientError::Remote`
/// using the body's `message` (falling back to `fallback`).
async fn read_json<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(remote_error(status, &text, fallback));
    }

    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse customer API response"
        );
        ClientError::Remote {
            status: status.as_u16(),
            message: fallback.to_string(),
        }
    })
}

/// Like [`read_json`] for endpoints whose success body is irrelevant.
async fn ensure_success(response: Response, fallback: &str) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let text = response.text().await.unwrap_or_default();
    Err(remote_error(status, &text, fallback))
}

fn remote_error(status: StatusCode, body: &str, fallback: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());

    tracing::debug!(status = %status, message = %message, "Customer API returned an error");

    ClientError::Remote {
        status: status.as_u16(),
        message,
    }
}
