//! Console configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `REPAIR_DESK_API_BASE_URL` - Backend base URL
//!   (default: `https://my-shop-backend-g2k6.onrender.com/api`)
//! - `REPAIR_DESK_REQUEST_TIMEOUT_MS` - Per-request timeout in milliseconds (default: 10000)
//! - `REPAIR_DESK_STATE_DIR` - Directory holding the persisted session
//!   (default: `<data dir>/repair-desk`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Backend used when `REPAIR_DESK_API_BASE_URL` is not set.
pub const DEFAULT_API_BASE_URL: &str = "https://my-shop-backend-g2k6.onrender.com/api";

/// Per-request timeout used when `REPAIR_DESK_REQUEST_TIMEOUT_MS` is not set.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);

const STATE_DIR_NAME: &str = "repair-desk";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Console configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Backend connection settings
    pub api: ApiConfig,
    /// Directory holding `auth-storage.json`
    pub state_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
}

/// Backend connection settings used by the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL every request path is appended to (includes the `/api` prefix)
    pub base_url: Url,
    /// Fixed per-request timeout
    pub timeout: Duration,
}

impl ApiConfig {
    /// Settings pointing at `base_url` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not an absolute
    /// http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("REPAIR_DESK_API_BASE_URL", base_url)?,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("REPAIR_DESK_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let base_url = parse_base_url("REPAIR_DESK_API_BASE_URL", &base_url)?;

        let timeout = match lookup("REPAIR_DESK_REQUEST_TIMEOUT_MS") {
            Some(raw) => {
                let millis = raw.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "REPAIR_DESK_REQUEST_TIMEOUT_MS".to_string(),
                        e.to_string(),
                    )
                })?;
                if millis == 0 {
                    return Err(ConfigError::InvalidEnvVar(
                        "REPAIR_DESK_REQUEST_TIMEOUT_MS".to_string(),
                        "must be greater than zero".to_string(),
                    ));
                }
                Duration::from_millis(millis)
            }
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let state_dir = lookup("REPAIR_DESK_STATE_DIR")
            .map_or_else(default_state_dir, PathBuf::from);

        let sentry_sample_rate = match lookup("SENTRY_SAMPLE_RATE") {
            Some(raw) => parse_sample_rate(&raw)?,
            None => 1.0,
        };

        Ok(Self {
            api: ApiConfig { base_url, timeout },
            state_dir,
            sentry_dsn: lookup("SENTRY_DSN"),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
        })
    }

    /// Returns a reference to the backend connection settings.
    #[must_use]
    pub const fn api(&self) -> &ApiConfig {
        &self.api
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Default state directory.
/// - macOS: ~/Library/Application Support/repair-desk
/// - Linux: ~/.local/share/repair-desk
fn parse_sample_rate(raw: &str) -> Result<f32, ConfigError> {
    let invalid =
        |reason: String| ConfigError::InvalidEnvVar("SENTRY_SAMPLE_RATE".to_string(), reason);
    let rate: f32 = raw
        .trim()
        .parse()
        .map_err(|e: std::num::ParseFloatError| invalid(e.to_string()))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(invalid("must be between 0.0 and 1.0".to_string()));
    }
    Ok(rate)
}

fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STATE_DIR_NAME)
}

/// Parse a base URL, rejecting relative and non-http(s) values.
fn parse_base_url(var_name: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    Ok(url)
}
