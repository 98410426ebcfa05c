//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Backend (both required, otherwise sign-in reports a system error)
//! - `ARIES_SUPABASE_URL` - Project URL (e.g., `https://abc.supabase.co`)
//! - `ARIES_SUPABASE_ANON_KEY` - Public anon key (a JWT)
//!
//! ## Optional
//! - `ARIES_ADMIN_EMAIL` - The one account allowed in (default: `admin@ariesmall.com`)
//! - `ARIES_DATA_DIR` - Directory for the local store file (default: `.aries`)
//!
//! Integration credentials (Cloudinary, `TinyPNG`, Replicate) are not read
//! from the environment; they live in the backend's `system_config` table.
//! See [`crate::settings`].

use std::path::PathBuf;
use std::time::Duration;

use aries_mall_core::Email;
use aries_mall_storefront::config::{ConfigError, SupabaseConfig, get_env_or_default};
use tracing::warn;
use url::Url;

/// Default administrator account.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@ariesmall.com";

const CLOUDINARY_API_URL: &str = "https://api.cloudinary.com/v1_1/";
const TINYPNG_API_URL: &str = "https://api.tinify.com/";
const REPLICATE_API_URL: &str = "https://api.replicate.com/v1/";

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Backend connection; `None` disables sign-in
    pub backend: Option<SupabaseConfig>,
    /// Why the backend is unavailable, when it is
    pub backend_error: Option<String>,
    /// Email of the administrator account
    pub admin_email: String,
    /// Directory holding the local store file
    pub data_dir: PathBuf,
    /// How long integration settings are cached
    pub settings_ttl: Duration,
    /// Third-party media API base URLs
    pub endpoints: Endpoints,
}

/// Base URLs of the media APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Cloudinary upload API; the cloud name is appended
    pub cloudinary: Url,
    /// `TinyPNG` API; `shrink` is appended
    pub tinypng: Url,
    /// Replicate API; `predictions` is appended
    pub replicate: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            cloudinary: fixed_url(CLOUDINARY_API_URL),
            tinypng: fixed_url(TINYPNG_API_URL),
            replicate: fixed_url(REPLICATE_API_URL),
        }
    }
}

impl Endpoints {
    /// All three APIs served from one base, for tests against a mock server.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEnvVar` if `base` does not parse.
    pub fn single(base: &str) -> Result<Self, ConfigError> {
        let parse = |path: &str| {
            Url::parse(&format!("{}/{path}", base.trim_end_matches('/')))
                .map_err(|e| ConfigError::InvalidEnvVar("endpoint".to_string(), e.to_string()))
        };
        Ok(Self {
            cloudinary: parse("v1_1/")?,
            tinypng: parse("")?,
            replicate: parse("v1/")?,
        })
    }
}

fn fixed_url(raw: &str) -> Url {
    Url::parse(raw).expect("Invalid endpoint constant")
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            backend: None,
            backend_error: None,
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            data_dir: PathBuf::from(".aries"),
            settings_ttl: Duration::from_secs(300),
            endpoints: Endpoints::default(),
        }
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEnvVar` if `ARIES_ADMIN_EMAIL` is not an email address.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let (backend, backend_error) = match SupabaseConfig::from_env() {
            Ok(cfg) => (Some(cfg), None),
            Err(e) => {
                warn!(error = %e, "Backend not configured; admin sign-in disabled");
                (None, Some(e.to_string()))
            }
        };

        let admin_email = get_env_or_default("ARIES_ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL);
        Email::parse(admin_email.trim()).map_err(|e| {
            ConfigError::InvalidEnvVar("ARIES_ADMIN_EMAIL".to_string(), e.to_string())
        })?;

        Ok(Self {
            backend,
            backend_error,
            admin_email: admin_email.trim().to_string(),
            data_dir: PathBuf::from(get_env_or_default("ARIES_DATA_DIR", ".aries")),
            ..Self::default()
        })
    }

    /// Whether `email` belongs to the administrator (case-insensitive).
    #[must_use]
    pub fn is_admin_email(&self, email: &str) -> bool {
        email.trim().eq_ignore_ascii_case(&self.admin_email)
    }
}
