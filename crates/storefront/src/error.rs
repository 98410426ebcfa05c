//! Unified error handling.
//!
//! Provides the storefront's `AppError`. Page controllers return
//! `Result<T, AppError>`; the router logs failures and turns the ones a user
//! should see into toasts via [`AppError::user_message`].

use aries_mall_supabase::SupabaseError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend request failed.
    #[error("Backend error: {0}")]
    Backend(#[from] SupabaseError),

    /// Local persistence failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A template failed to render.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// A newer navigation replaced the page this work belonged to.
    #[error("Navigation superseded")]
    Stale,
}

impl AppError {
    /// Whether this only signals that the page went away.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }

    /// Text safe to show a shopper. Internal details stay in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(err) => err.user_message(),
            Self::Storage(_) | Self::Config(_) | Self::Template(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            Self::Stale => String::new(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Backend(SupabaseError::Auth("Invalid login credentials".into()));
        assert_eq!(err.to_string(), "Backend error: Invalid login credentials");
        assert_eq!(AppError::Stale.to_string(), "Navigation superseded");
    }

    #[test]
    fn test_internal_details_hidden_from_users() {
        let err = AppError::Config(ConfigError::MissingEnvVar("ARIES_DATA_DIR".into()));
        assert!(!err.user_message().contains("ARIES_DATA_DIR"));
        assert_eq!(
            AppError::Backend(SupabaseError::Auth("Email not confirmed".into())).user_message(),
            "Email not confirmed"
        );
        assert!(AppError::Stale.is_stale());
    }
}
