//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `FLOW_API_BASE_URL` - Customer API base (default: production API)
//! - `FLOW_STORAGE_PATH` - JSON file holding token, profile and cart
//!   (default: `.flow-hydration/storage.json`)
//! - `FLOW_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 15)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Production customer API base.
pub const PRODUCTION_API_URL: &str = "https://api.flowhydration.in/api/customer";

/// Path of the customer API on a same-origin development server.
const LOCAL_API_PATH: &str = "/api/customer";

/// Hosts treated as local development.
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

const DEFAULT_STORAGE_PATH: &str = ".flow-hydration/storage.json";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Customer client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Customer API base URL, without a trailing slash
    pub api_base_url: Url,
    /// Where `FileStore` keeps persisted state
    pub storage_path: PathBuf,
    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Configuration pointing at an explicit API base, with defaults elsewhere.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(
            "FLOW_API_BASE_URL",
            &get_env_or_default("FLOW_API_BASE_URL", PRODUCTION_API_URL),
        )?;
        let storage_path = PathBuf::from(get_env_or_default("FLOW_STORAGE_PATH", DEFAULT_STORAGE_PATH));
        let request_timeout = get_optional_env("FLOW_REQUEST_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidEnvVar("FLOW_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
                })
            })
            .transpose()?
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), Duration::from_secs);

        Ok(Self {
            api_base_url,
            storage_path,
            request_timeout,
        })
    }

    /// Build an endpoint URL such as `/send-otp` under the API base.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is not valid.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.api_base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{}", path.trim_start_matches('/')))
    }
}

/// Resolves the API base from the host a front end is served from.
pub struct ApiBase;

impl ApiBase {
    /// Local development hosts use the same-origin `/api/customer` path;
    /// every other host uses the production API.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` cannot form a valid URL.
    pub fn for_host(host: &str, port: Option<u16>) -> Result<Url, url::ParseError> {
        if LOCAL_HOSTS.contains(&host) {
            let origin = port.map_or_else(
                || format!("http://{host}"),
                |port| format!("http://{host}:{port}"),
            );
            Url::parse(&format!("{origin}{LOCAL_API_PATH}"))
        } else {
            Url::parse(PRODUCTION_API_URL)
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an absolute http(s) base URL.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    Ok(url)
}
