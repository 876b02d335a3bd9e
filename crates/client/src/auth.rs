//! Entry point tying the session, cart and login flow together.

use std::sync::Arc;

use flow_hydration_core::Customer;
use secrecy::SecretString;
use tracing::instrument;

use crate::api::AuthClient;
use crate::cart_store::CartStore;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::flow::LoginFlow;
use crate::session::SessionStore;
use crate::storage::KeyValueStore;
use crate::sync::CartSync;

/// Customer-facing auth and cart operations over one store.
#[derive(Debug, Clone)]
pub struct CustomerAuth {
    api: AuthClient,
    carts: CartSync,
}

impl CustomerAuth {
    /// Build the client stack on top of `store`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let session = SessionStore::new(Arc::clone(&store));
        let api = AuthClient::new(config, session)?;
        let carts = CartSync::new(api.clone(), CartStore::new(store));
        Ok(Self { api, carts })
    }

    /// Validate any stored session and, if it is still valid, reconcile the cart.
    ///
    /// Returns whether the customer is logged in.
    #[instrument(skip_all)]
    pub async fn init(&self) -> bool {
        let authenticated = self.api.check_auth().await;
        if authenticated {
            self.carts.fetch_cart().await;
        }
        tracing::debug!(authenticated, "Customer auth initialised");
        authenticated
    }

    /// Whether a token is stored.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.api.session().is_authenticated()
    }

    /// Cached profile of the logged-in customer.
    #[must_use]
    pub fn customer(&self) -> Option<Customer> {
        self.api.session().get_customer()
    }

    /// Stored bearer token.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.api.session().get_token()
    }

    #[must_use]
    pub const fn client(&self) -> &AuthClient {
        &self.api
    }

    #[must_use]
    pub const fn cart(&self) -> &CartSync {
        &self.carts
    }

    /// A fresh login flow sharing this session and cart.
    #[must_use]
    pub fn login_flow(&self) -> LoginFlow {
        LoginFlow::new(self.api.clone(), self.carts.clone())
    }

    /// Run `on_ready` now if logged in, otherwise return a login flow that
    /// runs it on completion.
    pub fn require_auth(
        &self,
        on_ready: impl FnOnce(Option<Customer>) + Send + 'static,
    ) -> Option<LoginFlow> {
        if self.is_logged_in() {
            on_ready(self.customer());
            return None;
        }
        Some(self.login_flow().with_continuation(on_ready))
    }

    /// Forget the session. The local cart is kept.
    pub fn logout(&self) {
        self.api.session().clear();
        tracing::info!("Logged out");
    }
}
