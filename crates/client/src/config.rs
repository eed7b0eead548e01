//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `TABLESIDE_API_BASE_URL` - Backend base address (default: `http://127.0.0.1:8000`)
//! - `TABLESIDE_STATE_DIR` - Directory for durable and session state files (default: `.tableside`)
//! - `TABLESIDE_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `TABLESIDE_CATALOG_TTL_SECS` - How long the dish catalog is cached (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN (used by the CLI)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_STATE_DIR: &str = ".tableside";
const DEFAULT_TIMEOUT_SECS: &str = "30";
const DEFAULT_CATALOG_TTL_SECS: &str = "300";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Tableside client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base address; endpoint paths are joined onto it.
    pub base_url: Url,
    /// Directory holding `credentials.json` and `session.json`.
    pub state_dir: PathBuf,
    /// Timeout applied to every request, including token refresh.
    pub request_timeout: Duration,
    /// Lifetime of the cached dish catalog.
    pub catalog_ttl: Duration,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
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

        let base_url = parse_base_url(&get_env_or_default(
            "TABLESIDE_API_BASE_URL",
            DEFAULT_BASE_URL,
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("TABLESIDE_API_BASE_URL".to_string(), e))?;
        let state_dir = PathBuf::from(get_env_or_default("TABLESIDE_STATE_DIR", DEFAULT_STATE_DIR));
        let request_timeout = parse_secs("TABLESIDE_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let catalog_ttl = parse_secs("TABLESIDE_CATALOG_TTL_SECS", DEFAULT_CATALOG_TTL_SECS)?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            base_url,
            state_dir,
            request_timeout,
            catalog_ttl,
            sentry_dsn,
        })
    }

    /// Build a configuration pointing at `base_url` with all other defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `base_url` is not an absolute http(s) URL.
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("base_url".to_string(), e))?;
        Ok(Self::with_base_url(base_url))
    }

    fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            request_timeout: Duration::from_secs(30),
            catalog_ttl: Duration::from_secs(300),
            sentry_dsn: None,
        }
    }

    /// File holding the durable credential pair.
    #[must_use]
    pub fn credentials_path(&self) -> PathBuf {
        self.state_dir.join("credentials.json")
    }

    /// File holding session-scoped state (the cart).
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.state_dir.join("session.json")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a base URL, normalizing it to end in `/` so that joining relative
/// endpoint paths keeps any path prefix.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_secs(key: &str, default: &str) -> Result<Duration, ConfigError> {
    let secs = get_env_or_default(key, default)
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::for_base_url(DEFAULT_BASE_URL).unwrap();
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.catalog_ttl, Duration::from_secs(300));
        assert_eq!(
            config.credentials_path(),
            PathBuf::from(".tableside/credentials.json")
        );
        assert_eq!(config.session_path(), PathBuf::from(".tableside/session.json"));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let url = parse_base_url("https://api.example.com/v2").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v2/");
        assert_eq!(url.join("dishes").unwrap().as_str(), "https://api.example.com/v2/dishes");
    }

    #[test]
    fn test_base_url_rejects_other_schemes() {
        assert!(parse_base_url("ftp://example.com").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_for_base_url() {
        let config = ClientConfig::for_base_url("http://localhost:9000").unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:9000/");
        assert!(config.sentry_dsn.is_none());
    }
}
