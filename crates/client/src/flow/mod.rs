//! Multi-step OTP login controller.
//!
//! ```text
//! MobileEntry ──send OTP──▶ OtpEntry ──verify──▶ Done
//!      ▲                      │  │
//!      └────────back──────────┘  └─verify (needs name)─▶ NameEntry ──save name──▶ Done
//! ```
//!
//! A [`LoginFlow`] owns all state for one login attempt and reports progress
//! as [`FlowEvent`]s; rendering is left to whoever subscribes. A failed step
//! emits [`FlowEvent::Error`] and leaves the flow where it was. Reaching
//! `Done` reconciles the cart, runs the caller's continuation and resets the
//! flow so the same instance can be reused.
//!
//! Methods take `&self` so one flow can be shared between UI handlers; a
//! second submit while a request is in flight fails with [`FlowError::Busy`].

mod cooldown;
mod otp_input;

pub use cooldown::ResendCooldown;
pub use otp_input::OtpInput;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use flow_hydration_core::{Customer, Mobile, OtpChannel, OtpCode, OtpError};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::api::AuthClient;
use crate::error::ClientError;
use crate::sync::CartSync;

const EVENT_CAPACITY: usize = 128;

/// Step of the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowStep {
    MobileEntry,
    OtpEntry,
    NameEntry,
    Done,
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MobileEntry => "mobile entry",
            Self::OtpEntry => "OTP entry",
            Self::NameEntry => "name entry",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Progress notifications for a rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    /// The flow moved to a new step.
    StepChanged(FlowStep),
    /// A step failed; the text is meant for the customer.
    Error(String),
    /// The API returned the OTP itself (non-production deployments only).
    DevOtp(String),
    /// Seconds left before "resend" is allowed.
    CooldownTick(u32),
    /// Resending is allowed again.
    ResendAvailable,
    /// Login finished.
    LoggedIn {
        customer: Option<Customer>,
        greeting: String,
    },
}

/// Errors from flow transitions.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The underlying API call or validation failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The action is not valid at the current step.
    #[error("cannot do that at {actual} (expected {expected})")]
    InvalidStep { expected: FlowStep, actual: FlowStep },

    /// Another request from this flow has not finished yet.
    #[error("another request is already in progress")]
    Busy,
}

impl FlowError {
    /// Text suitable for showing to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Client(err) => err.user_message(),
            Self::InvalidStep { .. } => "Please restart the login.".to_string(),
            Self::Busy => "Please wait…".to_string(),
        }
    }
}

/// Called with the logged-in customer when the flow completes.
pub type Continuation = Box<dyn FnOnce(Option<Customer>) + Send>;

struct FlowState {
    step: FlowStep,
    mobile: Option<Mobile>,
    channel: OtpChannel,
    is_new_customer: bool,
    otp: OtpInput,
    cooldown: ResendCooldown,
}

impl FlowState {
    fn new() -> Self {
        Self {
            step: FlowStep::MobileEntry,
            mobile: None,
            channel: OtpChannel::default(),
            is_new_customer: false,
            otp: OtpInput::new(),
            cooldown: ResendCooldown::new(),
        }
    }
}

/// Clears the in-flight flag when the request finishes or is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Controller for one OTP login.
pub struct LoginFlow {
    api: AuthClient,
    carts: CartSync,
    state: Mutex<FlowState>,
    in_flight: AtomicBool,
    events: broadcast::Sender<FlowEvent>,
    on_success: Mutex<Option<Continuation>>,
}

impl LoginFlow {
    /// Create a flow at [`FlowStep::MobileEntry`].
    #[must_use]
    pub fn new(api: AuthClient, carts: CartSync) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            api,
            carts,
            state: Mutex::new(FlowState::new()),
            in_flight: AtomicBool::new(false),
            events,
            on_success: Mutex::new(None),
        }
    }

    /// Run `continuation` with the customer once login completes.
    #[must_use]
    pub fn with_continuation(self, continuation: impl FnOnce(Option<Customer>) + Send + 'static) -> Self {
        self.set_continuation(continuation);
        self
    }

    /// Replace the completion continuation.
    pub fn set_continuation(&self, continuation: impl FnOnce(Option<Customer>) + Send + 'static) {
        *self.on_success.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(continuation));
    }

    /// Receive flow events from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    /// Current step.
    #[must_use]
    pub fn step(&self) -> FlowStep {
        self.state().step
    }

    /// Mobile the OTP was sent to, once past mobile entry.
    #[must_use]
    pub fn mobile(&self) -> Option<Mobile> {
        self.state().mobile.clone()
    }

    /// Whether the API reported no existing account for the mobile.
    #[must_use]
    pub fn is_new_customer(&self) -> bool {
        self.state().is_new_customer
    }

    /// Snapshot of the OTP boxes.
    #[must_use]
    pub fn otp_input(&self) -> OtpInput {
        self.state().otp.clone()
    }

    /// Seconds until resending is allowed.
    #[must_use]
    pub fn resend_cooldown(&self) -> u32 {
        self.state().cooldown.remaining()
    }

    /// Whether a request is awaiting the network.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    // =========================================================================
    // OTP boxes
    // =========================================================================

    /// Type into the focused OTP box; returns the code once all six are filled.
    pub fn enter_digit(&self, ch: char) -> Option<OtpCode> {
        self.state().otp.enter(ch)
    }

    /// Backspace in the OTP boxes.
    pub fn backspace(&self) {
        self.state().otp.backspace();
    }

    /// Paste into the OTP boxes; returns the code if six digits were pasted.
    pub fn paste_otp(&self, text: &str) -> Option<OtpCode> {
        self.state().otp.paste(text)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Validate the mobile and request an OTP. On success the flow moves to
    /// [`FlowStep::OtpEntry`] and the resend cooldown starts.
    ///
    /// # Errors
    ///
    /// Fails without a network call on an invalid mobile; otherwise fails if
    /// the API rejects the request. The flow stays at mobile entry.
    pub async fn submit_mobile(&self, input: &str, channel: OtpChannel) -> Result<FlowStep, FlowError> {
        self.expect_step(FlowStep::MobileEntry)?;
        let _busy = self.begin()?;

        let mobile = match Mobile::parse(input) {
            Ok(mobile) => mobile,
            Err(e) => return Err(self.fail(ClientError::from(e))),
        };

        let sent = match self.api.send_otp(mobile.as_str(), channel).await {
            Ok(sent) => sent,
            Err(e) => return Err(self.fail(e)),
        };

        if let Some(otp) = sent.otp {
            self.emit(FlowEvent::DevOtp(otp));
        }

        {
            let mut state = self.state();
            state.mobile = Some(mobile);
            state.channel = channel;
            state.is_new_customer = sent.is_new_customer;
            state.otp.clear();
            state.cooldown.start(self.events.clone());
        }

        Ok(self.transition(FlowStep::OtpEntry))
    }

    /// Verify the code in the OTP boxes.
    ///
    /// Moves to [`FlowStep::NameEntry`] when the account has no name yet,
    /// otherwise completes the login.
    ///
    /// # Errors
    ///
    /// Fails if fewer than six digits are entered or verification fails. A
    /// failed verification clears every box and focuses the first one.
    pub async fn submit_otp(&self) -> Result<FlowStep, FlowError> {
        self.expect_step(FlowStep::OtpEntry)?;
        let _busy = self.begin()?;

        let (mobile, code) = {
            let state = self.state();
            (state.mobile.clone(), state.otp.code())
        };
        let Some(code) = code else {
            return Err(self.fail(ClientError::from(OtpError::Incomplete)));
        };
        let Some(mobile) = mobile else {
            return Err(self.step_error(FlowStep::MobileEntry));
        };

        let login = match self.api.verify_otp(&mobile, code.as_str(), None).await {
            Ok(login) => login,
            Err(e) => {
                self.state().otp.clear();
                return Err(self.fail(e));
            }
        };

        let session = self.api.session();
        session.set_token(&login.token);
        if let Some(customer) = &login.customer {
            session.set_customer(customer);
        }

        if login.needs_name {
            self.state().cooldown.cancel();
            return Ok(self.transition(FlowStep::NameEntry));
        }

        self.complete(login.customer).await;
        Ok(FlowStep::Done)
    }

    /// Request a new OTP once the cooldown has expired.
    ///
    /// # Errors
    ///
    /// Fails while the cooldown is running or if the API rejects the request.
    pub async fn resend_otp(&self) -> Result<(), FlowError> {
        self.expect_step(FlowStep::OtpEntry)?;

        let (mobile, channel, remaining) = {
            let state = self.state();
            (state.mobile.clone(), state.channel, state.cooldown.remaining())
        };
        if remaining > 0 {
            return Err(self.fail(ClientError::Validation(format!(
                "Please wait {remaining} seconds before requesting a new OTP"
            ))));
        }
        let Some(mobile) = mobile else {
            return Err(self.step_error(FlowStep::MobileEntry));
        };

        let _busy = self.begin()?;
        let sent = match self.api.resend_otp(mobile.as_str(), channel).await {
            Ok(sent) => sent,
            Err(e) => return Err(self.fail(e)),
        };

        if let Some(otp) = sent.otp {
            self.emit(FlowEvent::DevOtp(otp));
        }

        let mut state = self.state();
        state.otp.clear();
        state.cooldown.start(self.events.clone());
        Ok(())
    }

    /// Go back from OTP entry to mobile entry, stopping the cooldown.
    ///
    /// # Errors
    ///
    /// Fails unless the flow is at OTP entry.
    pub fn back(&self) -> Result<FlowStep, FlowError> {
        self.expect_step(FlowStep::OtpEntry)?;
        {
            let mut state = self.state();
            state.cooldown.cancel();
            state.otp.clear();
        }
        Ok(self.transition(FlowStep::MobileEntry))
    }

    /// Save the customer's name and complete the login.
    ///
    /// # Errors
    ///
    /// Fails without a network call on a blank name, or if the API rejects it.
    pub async fn submit_name(&self, name: &str) -> Result<FlowStep, FlowError> {
        self.expect_step(FlowStep::NameEntry)?;
        let _busy = self.begin()?;

        match self.api.update_name(name).await {
            Ok(customer) => {
                self.complete(Some(customer)).await;
                Ok(FlowStep::Done)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Abandon the current attempt and return to mobile entry.
    pub fn reset(&self) {
        *self.state() = FlowState::new();
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn complete(&self, customer: Option<Customer>) {
        self.state().cooldown.cancel();
        self.transition(FlowStep::Done);

        let cart = self.carts.fetch_cart().await;
        tracing::info!(cart_lines = cart.len(), "Login complete");

        let customer = customer.or_else(|| self.api.session().get_customer());
        let continuation = self
            .on_success
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(continuation) = continuation {
            continuation(customer.clone());
        }

        let greeting = customer
            .as_ref()
            .map_or_else(|| "Welcome!".to_string(), Customer::greeting);
        self.emit(FlowEvent::LoggedIn { customer, greeting });

        self.reset();
    }

    fn state(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<InFlight<'_>, FlowError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| InFlight(&self.in_flight))
            .map_err(|_| FlowError::Busy)
    }

    fn expect_step(&self, expected: FlowStep) -> Result<(), FlowError> {
        let actual = self.step();
        if actual == expected {
            Ok(())
        } else {
            Err(FlowError::InvalidStep { expected, actual })
        }
    }

    fn step_error(&self, expected: FlowStep) -> FlowError {
        FlowError::InvalidStep {
            expected,
            actual: self.step(),
        }
    }

    fn transition(&self, step: FlowStep) -> FlowStep {
        self.state().step = step;
        tracing::debug!(%step, "Login flow step changed");
        self.emit(FlowEvent::StepChanged(step));
        step
    }

    fn fail(&self, err: ClientError) -> FlowError {
        tracing::debug!(error = %err, "Login step failed");
        self.emit(FlowEvent::Error(err.user_message()));
        FlowError::Client(err)
    }

    fn emit(&self, event: FlowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl fmt::Debug for LoginFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginFlow")
            .field("step", &self.step())
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use url::Url;

    use super::*;
    use crate::cart_store::CartStore;
    use crate::config::ClientConfig;
    use crate::session::SessionStore;
    use crate::storage::MemoryStore;

    fn offline_flow() -> LoginFlow {
        let store = Arc::new(MemoryStore::new());
        // Nothing listens here; tests below must fail before any request.
        let config = ClientConfig::new(Url::parse("http://127.0.0.1:9/api/customer").unwrap());
        let api = AuthClient::new(config, SessionStore::new(store.clone())).unwrap();
        let carts = CartSync::new(api.clone(), CartStore::new(store));
        LoginFlow::new(api, carts)
    }

    #[tokio::test]
    async fn test_invalid_mobile_stays_on_mobile_entry() {
        let flow = offline_flow();
        let mut events = flow.subscribe();

        let err = flow.submit_mobile("12345", OtpChannel::Sms).await.unwrap_err();
        assert_eq!(err.user_message(), "Please enter a valid 10-digit mobile number");
        assert_eq!(flow.step(), FlowStep::MobileEntry);
        assert_eq!(
            events.try_recv().unwrap(),
            FlowEvent::Error("Please enter a valid 10-digit mobile number".to_string())
        );
        assert!(!flow.is_busy());
    }

    #[tokio::test]
    async fn test_actions_at_wrong_step_are_rejected() {
        let flow = offline_flow();

        assert!(matches!(
            flow.back(),
            Err(FlowError::InvalidStep {
                expected: FlowStep::OtpEntry,
                actual: FlowStep::MobileEntry
            })
        ));
        assert!(matches!(flow.submit_otp().await, Err(FlowError::InvalidStep { .. })));
        assert!(matches!(
            flow.submit_name("Asha").await,
            Err(FlowError::InvalidStep { .. })
        ));
    }

    #[test]
    fn test_otp_boxes_are_driven_through_the_flow() {
        let flow = offline_flow();
        for ch in "12345".chars() {
            assert!(flow.enter_digit(ch).is_none());
        }
        flow.backspace();
        assert_eq!(flow.otp_input().value(), "1234");
        assert!(flow.paste_otp("654321").is_some());
    }

    #[test]
    fn test_step_display() {
        assert_eq!(FlowStep::OtpEntry.to_string(), "OTP entry");
        assert_eq!(FlowStep::Done.to_string(), "done");
    }
}
