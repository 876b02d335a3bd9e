//! Session store: bearer token and cached customer profile.
//!
//! Storage is treated as always available. Read failures are logged and read
//! as "absent"; write failures are logged and otherwise ignored.

use std::sync::Arc;

use flow_hydration_core::Customer;
use secrecy::{ExposeSecret, SecretString};

use crate::storage::{KeyValueStore, keys};

/// Persistent customer session.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create a session store over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The stored bearer token, if any.
    #[must_use]
    pub fn get_token(&self) -> Option<SecretString> {
        match self.store.get(keys::TOKEN) {
            Ok(token) => token.filter(|t| !t.is_empty()).map(SecretString::from),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session token");
                None
            }
        }
    }

    /// Store a bearer token.
    pub fn set_token(&self, token: &SecretString) {
        if let Err(e) = self.store.set(keys::TOKEN, token.expose_secret()) {
            tracing::warn!(error = %e, "Failed to persist session token");
        }
    }

    /// The cached customer profile, if any.
    #[must_use]
    pub fn get_customer(&self) -> Option<Customer> {
        let raw = match self.store.get(keys::CUSTOMER) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached customer");
                return None;
            }
        };

        serde_json::from_str(&raw)
            .inspect_err(|e| tracing::warn!(error = %e, "Discarding unreadable cached customer"))
            .ok()
    }

    /// Cache a customer profile.
    pub fn set_customer(&self, customer: &Customer) {
        let result = serde_json::to_string(customer)
            .map_err(crate::storage::StorageError::from)
            .and_then(|json| self.store.set(keys::CUSTOMER, &json));

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist customer profile");
        }
    }

    /// Remove both the token and the cached profile.
    pub fn clear(&self) {
        for key in [keys::TOKEN, keys::CUSTOMER] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(error = %e, key, "Failed to clear session entry");
            }
        }
    }

    /// True iff a token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.get_token().is_some()
    }

    /// `Authorization` header value for the stored token.
    #[must_use]
    pub fn auth_header(&self) -> Option<SecretString> {
        self.get_token()
            .map(|token| SecretString::from(format!("Bearer {}", token.expose_secret())))
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
