//! CLI command implementations.

pub mod cart;
pub mod login;
pub mod session;

use std::sync::Arc;

use flow_hydration_client::{
    ClientConfig, ClientError, ConfigError, CustomerAuth, FileStore, FlowError, StorageError,
};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The storage file could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A customer API call failed.
    #[error("{}", .0.user_message())]
    Client(#[from] ClientError),

    /// A login step failed.
    #[error("{}", .0.user_message())]
    Flow(#[from] FlowError),

    /// Reading from the terminal failed.
    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input ended before the command finished.
    #[error("Input closed before login finished")]
    InputClosed,

    /// A cart line number outside the cart.
    #[error("No cart line {line} (the cart has {len})")]
    NoSuchLine { line: usize, len: usize },
}

/// Load configuration and open the customer client over the storage file.
///
/// # Errors
///
/// Returns error if configuration is invalid or the storage file is unreadable.
pub fn open() -> Result<CustomerAuth, CliError> {
    let config = ClientConfig::from_env()?;
    tracing::debug!(
        api = %config.api_base_url,
        storage = %config.storage_path.display(),
        "Loaded configuration"
    );

    let store = FileStore::open(&config.storage_path)?;
    Ok(CustomerAuth::new(config, Arc::new(store))?)
}
