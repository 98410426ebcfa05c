//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Backend (both required, otherwise the shop runs in guest-only mode)
//! - `ARIES_SUPABASE_URL` - Project URL (e.g., `https://abc.supabase.co`)
//! - `ARIES_SUPABASE_ANON_KEY` - Public anon key (a JWT)
//!
//! ## Optional
//! - `ARIES_DATA_DIR` - Directory for the local store file (default: `.aries`)
//! - `ARIES_SLIDE_INTERVAL_SECS` - Hero carousel auto-advance (default: 7)
//! - `ARIES_FILTER_DEBOUNCE_MS` - Category price filter debounce (default: 500)

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::warn;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),

    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend connection; `None` means guest-only mode
    pub backend: Option<SupabaseConfig>,
    /// Why the backend is unavailable, when it is
    pub backend_error: Option<String>,
    /// Directory holding the local store file
    pub data_dir: PathBuf,
    /// Hero carousel auto-advance interval
    pub slide_interval: Duration,
    /// Category page price filter debounce
    pub filter_debounce: Duration,
}

/// Hosted backend connection settings.
///
/// Implements `Debug` manually to redact the anon key.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL
    pub url: Url,
    /// Public anon key
    pub anon_key: SecretString,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            backend: None,
            backend_error: None,
            data_dir: PathBuf::from(".aries"),
            slide_interval: Duration::from_secs(7),
            filter_debounce: Duration::from_millis(500),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present. An
    /// unusable backend configuration is not an error: it is recorded in
    /// `backend_error` and the shop degrades to guest-only mode.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an optional variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let (backend, backend_error) = match SupabaseConfig::from_env() {
            Ok(cfg) => (Some(cfg), None),
            Err(e) => {
                warn!(error = %e, "Backend not configured; running in guest-only mode");
                (None, Some(e.to_string()))
            }
        };

        let data_dir = PathBuf::from(get_env_or_default("ARIES_DATA_DIR", ".aries"));
        let slide_interval = Duration::from_secs(parse_env("ARIES_SLIDE_INTERVAL_SECS", 7)?);
        let filter_debounce = Duration::from_millis(parse_env("ARIES_FILTER_DEBOUNCE_MS", 500)?);

        Ok(Self {
            backend,
            backend_error,
            data_dir,
            slide_interval,
            filter_debounce,
        })
    }
}

impl SupabaseConfig {
    /// Load backend settings from `ARIES_SUPABASE_URL` / `ARIES_SUPABASE_ANON_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if either is missing, the URL does not parse or
    /// looks like a placeholder, or the key fails the secret checks.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("ARIES_SUPABASE_URL")?;
        let url = parse_backend_url(&raw_url, "ARIES_SUPABASE_URL")?;
        let anon_key = get_validated_secret("ARIES_SUPABASE_ANON_KEY")?;
        Ok(Self { url, anon_key })
    }

    /// The anon key, for building a client.
    #[must_use]
    pub fn anon_key(&self) -> SecretString {
        SecretString::from(self.anon_key.expose_secret().to_owned())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
///
/// # Errors
///
/// Returns `MissingEnvVar` if the variable is unset or blank.
pub fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
#[must_use]
pub fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
#[must_use]
pub fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional numeric environment variable.
fn parse_env(key: &str, default: u64) -> Result<u64, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |v| {
        v.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

fn parse_backend_url(raw: &str, var_name: &str) -> Result<Url, ConfigError> {
    check_placeholder(raw, var_name)?;
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn check_placeholder(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
///
/// # Errors
///
/// Returns `InsecureSecret` describing the failed check.
pub fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    check_placeholder(secret, var_name)?;

    // Real keys (JWTs, API tokens) have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
