//! Flow Hydration customer client library.
//!
//! OTP login against the customer API, a persisted session, and a local-first
//! cart kept in sync with the server while logged in. [`CustomerAuth`] wires
//! the pieces together over a single [`KeyValueStore`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart_store;
pub mod config;
pub mod error;
pub mod flow;
pub mod session;
pub mod storage;
pub mod sync;

pub use api::{AuthClient, SendOtpResponse, VerifiedLogin};
pub use auth::CustomerAuth;
pub use cart_store::CartStore;
pub use config::{ApiBase, ClientConfig, ConfigError};
pub use error::ClientError;
pub use flow::{FlowError, FlowEvent, FlowStep, LoginFlow, OtpInput, ResendCooldown};
pub use session::SessionStore;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use sync::{CartSync, Reconciliation, reconcile};
