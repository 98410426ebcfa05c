//! Unified error handling for admin.

use aries_mall_storefront::AppError;
use aries_mall_storefront::config::ConfigError;
use aries_mall_storefront::storage::StorageError;
use aries_mall_supabase::SupabaseError;
use thiserror::Error;

/// Failures of the media hub's third-party calls.
#[derive(Debug, Error)]
pub enum MediaError {
    /// `TinyPNG` rejected or failed the request.
    #[error("TinyPNG API Error: {0}")]
    Optimizer(String),

    /// Cloudinary rejected the upload.
    #[error("Cloudinary error: {0}")]
    Upload(String),

    /// Replicate rejected the prediction or its status check.
    #[error("API Error: {0}")]
    Upscale(String),

    /// The job was still running after the last poll attempt.
    #[error("Upscale did not finish after {attempts} status checks")]
    PollExhausted { attempts: u32 },

    /// Replicate reported `failed` or `canceled`.
    #[error("AI failed: {0}")]
    JobFailed(String),

    /// Only images can be staged.
    #[error("File \"{0}\" is not an image.")]
    InvalidFileType(String),

    /// A required integration setting is absent.
    #[error("{0} is not configured")]
    MissingConfig(&'static str),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading a local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Backend request failed.
    #[error("Backend error: {0}")]
    Backend(#[from] SupabaseError),

    /// A media API call failed.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local persistence failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A template failed to render.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// `system_config` could not be read.
    #[error("Could not load API keys from database.")]
    Settings,

    /// Form input was rejected.
    #[error("{0}")]
    Validation(String),

    /// The signed-in account is not the administrator.
    #[error("Access denied. This account is not an administrator.")]
    NotAdmin,

    /// A newer navigation replaced the page this work belonged to.
    #[error("Navigation superseded")]
    Stale,
}

impl From<AppError> for AdminError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Backend(e) => Self::Backend(e),
            AppError::Storage(e) => Self::Storage(e),
            AppError::Config(e) => Self::Config(e),
            AppError::Template(e) => Self::Template(e),
            AppError::Stale => Self::Stale,
        }
    }
}

impl AdminError {
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }

    /// Text safe to show in a toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(err) => err.user_message(),
            Self::Media(err) => err.to_string(),
            Self::Settings | Self::Validation(_) | Self::NotAdmin => self.to_string(),
            Self::Config(_) | Self::Storage(_) | Self::Template(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            Self::Stale => String::new(),
        }
    }
}

/// Result type alias for `AdminError`.
pub type Result<T> = std::result::Result<T, AdminError>;
